//! Mapping payload construction.
//!
//! Turns a classified [`FieldRecord`] into the [`MappingEntry`] emitted for it,
//! together with the provenance used for document annotations. A field whose
//! payload cannot be completed is skipped with one diagnostic; partial
//! payloads are never produced.

pub mod function;
pub mod priority;

use crate::classify::Classification;
use crate::config::Config;
use crate::error::Diagnostic;
use crate::graph::PROVIDER_DEPENDENCY_PREFIX;
use crate::types::{CalculationStyle, FieldRecord, MappingType};
use crate::units::{ConversionDecision, UnitTable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

pub use function::{
    Binding, ParameterBindings, bindings_from_dependencies, infer_function_name,
    parse_parameter_bindings,
};
pub use priority::{
    PrioritySource, RankedField, parse_priority_list, priority_order, provider_path,
};

/// One emitted mapping, tagged by its `type` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MappingEntry {
    Direct(DirectMapping),
    Prioritized(PrioritizedMapping),
    Calculated(CalculatedMapping),
    Transformed(TransformedMapping),
    IoMapped(IoMappedMapping),
}

impl MappingEntry {
    pub fn mapping_type(&self) -> MappingType {
        match self {
            MappingEntry::Direct(_) => MappingType::Direct,
            MappingEntry::Prioritized(_) => MappingType::Prioritized,
            MappingEntry::Calculated(_) => MappingType::Calculated,
            MappingEntry::Transformed(_) => MappingType::Transformed,
            MappingEntry::IoMapped(_) => MappingType::IoMapped,
        }
    }

    /// Schema-field dependencies; empty for everything but calculated entries.
    pub fn dependency_names(&self) -> &[String] {
        match self {
            MappingEntry::Calculated(calculated) => &calculated.dependency_names,
            _ => &[],
        }
    }

    pub fn error_handling(&self) -> &str {
        match self {
            MappingEntry::Direct(m) => &m.error_handling,
            MappingEntry::Prioritized(m) => &m.error_handling,
            MappingEntry::Calculated(m) => &m.error_handling,
            MappingEntry::Transformed(m) => &m.error_handling,
            MappingEntry::IoMapped(m) => &m.error_handling,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectMapping {
    pub source_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_conversion: Option<String>,
    pub error_handling: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrioritizedMapping {
    pub sources: Vec<PrioritySource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub error_handling: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedMapping {
    pub calculation_type: CalculationStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_bindings: Option<ParameterBindings>,
    #[serde(default)]
    pub dependency_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub error_handling: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedMapping {
    pub transformation: String,
    #[serde(default)]
    pub service_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub error_handling: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoMappedMapping {
    pub default_source: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_metadata: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub error_handling: String,
}

/// Where an entry came from. Rendered as comments, never as mapping keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Provenance {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documented_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// `manual (from -> to)` when units differ and no explicit conversion was given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_conversion: Option<String>,
}

impl Provenance {
    fn from_record(record: &FieldRecord) -> Self {
        Self {
            path: record.path.clone(),
            documented_path: record.documented_path.clone(),
            computation: record.computation().map(str::to_string),
            notes: record.notes.clone(),
            unit_conversion: None,
        }
    }
}

/// A compiled entry keyed by its stable field name.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledEntry {
    pub name: String,
    pub entry: MappingEntry,
    pub provenance: Provenance,
}

/// Builds payloads for classified records.
pub struct PayloadCompiler<'a> {
    config: &'a Config,
    units: UnitTable,
}

impl<'a> PayloadCompiler<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            units: UnitTable::with_config(&config.units),
        }
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    /// Compile one record. Returns `None` and pushes exactly one diagnostic when
    /// the payload cannot be completed. Non-fatal findings are pushed as well.
    pub fn compile(
        &self,
        record: &FieldRecord,
        classification: Classification,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<CompiledEntry> {
        let mut provenance = Provenance::from_record(record);
        let error_handling = self.error_handling(record, classification.mapping_type);

        let entry = match classification.mapping_type {
            MappingType::Direct => {
                MappingEntry::Direct(self.direct(record, error_handling, &mut provenance))
            }
            MappingType::Prioritized => MappingEntry::Prioritized(self.prioritized(
                record,
                error_handling,
                &mut provenance,
                diagnostics,
            )),
            MappingType::Calculated => {
                let style = classification
                    .calculation_style
                    .unwrap_or(CalculationStyle::FunctionReference);
                MappingEntry::Calculated(self.calculated(record, style, error_handling, diagnostics))
            }
            MappingType::Transformed => {
                let Some(transformation) = record
                    .transformation
                    .as_deref()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .or_else(|| record.computation())
                else {
                    diagnostics.push(Diagnostic::missing_computation(&record.name));
                    return None;
                };
                MappingEntry::Transformed(TransformedMapping {
                    transformation: transformation.to_string(),
                    service_fields: record.service_fields.clone(),
                    unit: clean(record.unit.as_deref()),
                    data_type: clean(record.data_type.as_deref()),
                    error_handling,
                })
            }
            MappingType::IoMapped => match parse_io_config(record.io_config.as_deref()) {
                Ok((default_source, installation_metadata)) => {
                    MappingEntry::IoMapped(IoMappedMapping {
                        default_source,
                        installation_metadata,
                        unit: clean(record.unit.as_deref()),
                        data_type: clean(record.data_type.as_deref()),
                        error_handling,
                    })
                }
                Err(reason) => {
                    diagnostics.push(Diagnostic::malformed_value(&record.name, reason));
                    return None;
                }
            },
        };

        Some(CompiledEntry {
            name: record.name.clone(),
            entry,
            provenance,
        })
    }

    fn error_handling(&self, record: &FieldRecord, mapping_type: MappingType) -> String {
        clean(record.error_handling.as_deref())
            .unwrap_or_else(|| self.config.error_handling.for_type(mapping_type).to_string())
    }

    /// Compare a provider unit against the field unit and note a manual conversion.
    fn check_units(&self, record: &FieldRecord, source_unit: Option<&str>) -> Option<String> {
        let decision = self.units.conversion(source_unit, record.unit.as_deref());
        if let ConversionDecision::ManualRequired { .. } = &decision {
            debug!(field = %record.name, conversion = %decision, "Unit conversion left for manual specification");
        }
        decision.note()
    }

    fn direct(
        &self,
        record: &FieldRecord,
        error_handling: String,
        provenance: &mut Provenance,
    ) -> DirectMapping {
        let field = record.provider_refs.first().map(String::as_str).unwrap_or_default();
        let unit_conversion = clean(record.unit_conversion.as_deref());
        if unit_conversion.is_none() {
            provenance.unit_conversion = self.check_units(record, record.provider_unit(0));
        }
        DirectMapping {
            source_path: provider_path(field, record.provider_path(0), &self.config.provider_paths),
            unit: clean(record.unit.as_deref()),
            data_type: clean(record.data_type.as_deref()),
            default: record.default_value.as_deref().and_then(parse_default),
            unit_conversion,
            error_handling,
        }
    }

    fn prioritized(
        &self,
        record: &FieldRecord,
        error_handling: String,
        provenance: &mut Provenance,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> PrioritizedMapping {
        let mut notes: Vec<String> = Vec::new();
        let sources = self
            .ranked_sources(record, diagnostics)
            .into_iter()
            .map(|(priority, field, index)| {
                let unit = index.and_then(|i| record.provider_unit(i));
                if let Some(note) = self.check_units(record, unit)
                    && !notes.contains(&note)
                {
                    notes.push(note);
                }
                let explicit_path = index.and_then(|i| record.provider_path(i));
                PrioritySource {
                    priority,
                    path: provider_path(&field, explicit_path, &self.config.provider_paths),
                    provider_field: field,
                    unit: unit.map(str::to_string),
                }
            })
            .collect();
        if clean(record.unit_conversion.as_deref()).is_none() && !notes.is_empty() {
            provenance.unit_conversion = Some(notes.join("; "));
        }

        PrioritizedMapping {
            sources,
            unit: clean(record.unit.as_deref()),
            data_type: clean(record.data_type.as_deref()),
            default: record.default_value.as_deref().and_then(parse_default),
            error_handling,
        }
    }

    /// `(priority, provider field, index into provider_refs)` in source order.
    ///
    /// An explicit ranking wins. When it is missing, empty or unparseable the
    /// `a > b` description heuristic ranks `provider_refs` instead.
    fn ranked_sources(
        &self,
        record: &FieldRecord,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<(u32, String, Option<usize>)> {
        if let Some(text) = clean(record.priority_sources.as_deref()) {
            match parse_priority_list(&text) {
                Ok(ranked) if !ranked.is_empty() => {
                    return ranked
                        .into_iter()
                        .map(|entry| {
                            let index =
                                record.provider_refs.iter().position(|f| *f == entry.field);
                            (entry.priority, entry.field, index)
                        })
                        .collect();
                }
                Ok(_) => {
                    debug!(field = %record.name, "Empty priority list, ranking by description");
                }
                Err(e) => diagnostics.push(Diagnostic::malformed_value(
                    &record.name,
                    format!("priority list ({}), ranking by description", e),
                )),
            }
        }

        priority_order(&record.provider_refs, record.computation())
            .into_iter()
            .zip(1u32..)
            .map(|(index, priority)| (priority, record.provider_refs[index].clone(), Some(index)))
            .collect()
    }

    fn calculated(
        &self,
        record: &FieldRecord,
        style: CalculationStyle,
        error_handling: String,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> CalculatedMapping {
        let dependencies: Vec<String> = record.dependencies().map(str::to_string).collect();

        let (function_name, parameter_bindings) = match style {
            CalculationStyle::Formula => (None, None),
            CalculationStyle::FunctionReference => {
                let name = clean(record.function_name.as_deref())
                    .unwrap_or_else(|| infer_function_name(&record.name, &self.config.functions));
                (Some(name), Some(self.bindings(record, &dependencies, diagnostics)))
            }
        };

        CalculatedMapping {
            calculation_type: style,
            function_name,
            parameter_bindings,
            dependency_names: dependencies
                .iter()
                .filter(|d| !d.starts_with(PROVIDER_DEPENDENCY_PREFIX))
                .cloned()
                .collect(),
            unit: clean(record.unit.as_deref()),
            data_type: clean(record.data_type.as_deref()),
            error_handling,
        }
    }

    fn bindings(
        &self,
        record: &FieldRecord,
        dependencies: &[String],
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ParameterBindings {
        if let Some(text) = clean(record.function_parameters.as_deref()) {
            if let Some(bindings) = parse_parameter_bindings(&text) {
                return bindings;
            }
            diagnostics.push(Diagnostic::malformed_value(
                &record.name,
                "function parameters could not be parsed, using dependencies",
            ));
        }
        bindings_from_dependencies(dependencies)
    }
}

/// Trimmed, non-empty copy of an optional attribute.
fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// A default value as a JSON scalar when it parses as one, otherwise as a string.
fn parse_default(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ (Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Null)) => {
            Some(value)
        }
        _ => Some(Value::String(raw.to_string())),
    }
}

fn parse_io_config(raw: Option<&str>) -> Result<(Value, Option<Value>), String> {
    let raw = raw.map(str::trim).filter(|r| !r.is_empty()).ok_or("missing I/O mapping config")?;
    let value: Value =
        serde_json::from_str(raw).map_err(|e| format!("I/O mapping config is not JSON: {}", e))?;
    let Value::Object(mut map) = value else {
        return Err("I/O mapping config must be a JSON object".to_string());
    };
    let default_source = map
        .remove("default_source")
        .filter(|v| !v.is_null())
        .ok_or("I/O mapping config has no default_source")?;
    Ok((default_source, map.remove("installation_metadata").filter(|v| !v.is_null())))
}

//! Field catalog.
//!
//! A [`FieldCatalog`] is built once per run from the documentation catalog and
//! the structural-example catalog, then passed by reference to every later
//! stage. Structural notation is authoritative for paths: documentation paths
//! are reconciled against the structural path set and rewritten when they resolve.

pub mod examples;
pub mod load;

use crate::error::Diagnostic;
use crate::reconcile::KnownPaths;
use crate::types::{FieldRecord, PriorityTier};
use std::collections::HashMap;
use tracing::debug;

pub use examples::{ParseStrategy, StructuralExample, parse_example};
pub use load::{CatalogFormat, find_latest_catalog, load_catalog, resolve_catalog_path};

/// Immutable, ordered collection of field records with lookup by stable name.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    records: Vec<FieldRecord>,
    index: HashMap<String, usize>,
    known_paths: KnownPaths,
    diagnostics: Vec<Diagnostic>,
}

impl FieldCatalog {
    /// Catalog from a single record list, without reconciliation.
    pub fn from_records(records: Vec<FieldRecord>) -> Self {
        let mut diagnostics = Vec::new();
        let records = dedup_by_name(records, "documentation", &mut diagnostics);
        Self::assemble(records, KnownPaths::new(), diagnostics)
    }

    /// Merge the documentation and structural catalogs.
    ///
    /// Order is documentation records in load order, then structural-only
    /// records in load order. A name present in both is merged with
    /// non-empty documentation values winning.
    pub fn from_sources(documentation: Vec<FieldRecord>, structural: Vec<FieldRecord>) -> Self {
        let mut diagnostics = Vec::new();
        let structural = dedup_by_name(structural, "structural", &mut diagnostics);
        let documentation = dedup_by_name(documentation, "documentation", &mut diagnostics);

        let mut known = KnownPaths::new();
        for record in &structural {
            known.insert(record.path.clone());
            if let Some(text) = record.json_structure.as_deref() {
                let example = parse_example(text);
                if example.is_malformed() {
                    diagnostics.push(Diagnostic::malformed_value(
                        &record.name,
                        "example is not valid JSON, paths read as text",
                    ));
                }
                for path in example.paths {
                    known.insert(path);
                }
            }
        }

        let mut structural_by_name: HashMap<String, usize> = structural
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        let mut structural_slots: Vec<Option<FieldRecord>> =
            structural.into_iter().map(Some).collect();

        let mut records = Vec::with_capacity(documentation.len() + structural_slots.len());
        for doc in documentation {
            let base = structural_by_name
                .remove(&doc.name)
                .and_then(|i| structural_slots[i].take());
            let record = match base {
                Some(base) => merge_records(base, doc, &known),
                None => reconcile_path(doc, &known, &mut diagnostics),
            };
            records.push(record);
        }
        records.extend(structural_slots.into_iter().flatten());

        Self::assemble(records, known, diagnostics)
    }

    fn assemble(
        records: Vec<FieldRecord>,
        known_paths: KnownPaths,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let index = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.clone(), i))
            .collect();
        Self {
            records,
            index,
            known_paths,
            diagnostics,
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldRecord> {
        self.index.get(name).map(|&i| &self.records[i])
    }

    /// Enumeration position of a field.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn records(&self) -> &[FieldRecord] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn known_paths(&self) -> &KnownPaths {
        &self.known_paths
    }

    /// Diagnostics raised while building the catalog.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

fn dedup_by_name(
    records: Vec<FieldRecord>,
    source: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<FieldRecord> {
    let mut seen = std::collections::HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            let first = seen.insert(r.name.clone());
            if !first {
                diagnostics.push(Diagnostic::duplicate_field(&r.name, source));
            }
            first
        })
        .collect()
}

/// Rewrite a documentation-only record's path to its structural form.
fn reconcile_path(
    mut record: FieldRecord,
    known: &KnownPaths,
    diagnostics: &mut Vec<Diagnostic>,
) -> FieldRecord {
    if known.is_empty() || record.path.is_empty() {
        return record;
    }
    match known.reconcile(&record.path) {
        Some(resolution) => {
            if resolution.path != record.path {
                debug!(
                    field = %record.name,
                    from = %record.path,
                    to = %resolution.path,
                    strategy = %resolution.strategy,
                    "Reconciled path"
                );
                let documented = std::mem::replace(&mut record.path, resolution.path);
                record.documented_path = Some(documented);
            }
        }
        None => diagnostics.push(Diagnostic::unresolved_path(&record.name, &record.path)),
    }
    record
}

/// Overlay a documentation record on its structural counterpart.
///
/// The documentation path is reconciled; when it does not resolve the
/// structural record's own path is kept.
fn merge_records(base: FieldRecord, doc: FieldRecord, known: &KnownPaths) -> FieldRecord {
    let path = if doc.path.is_empty() || doc.path == base.path {
        base.path.clone()
    } else {
        known
            .reconcile(&doc.path)
            .map(|r| r.path)
            .unwrap_or_else(|| base.path.clone())
    };
    let documented_path = (!doc.path.is_empty() && doc.path != path).then(|| doc.path.clone());

    fn pick<T>(doc: Vec<T>, base: Vec<T>) -> Vec<T> {
        if doc.is_empty() { base } else { doc }
    }

    FieldRecord {
        name: doc.name,
        path,
        documented_path,
        category: doc.category.or(base.category),
        priority: if doc.priority == PriorityTier::Unknown {
            base.priority
        } else {
            doc.priority
        },
        unit: doc.unit.or(base.unit),
        data_type: doc.data_type.or(base.data_type),
        status: doc.status,
        provider_refs: pick(doc.provider_refs, base.provider_refs),
        provider_paths: pick(doc.provider_paths, base.provider_paths),
        provider_units: pick(doc.provider_units, base.provider_units),
        priority_sources: doc.priority_sources.or(base.priority_sources),
        computation_description: doc.computation_description.or(base.computation_description),
        dependency_names: pick(doc.dependency_names, base.dependency_names),
        function_name: doc.function_name.or(base.function_name),
        function_parameters: doc.function_parameters.or(base.function_parameters),
        error_handling: doc.error_handling.or(base.error_handling),
        default_value: doc.default_value.or(base.default_value),
        unit_conversion: doc.unit_conversion.or(base.unit_conversion),
        mapping_type: doc.mapping_type.or(base.mapping_type),
        transformation: doc.transformation.or(base.transformation),
        service_fields: pick(doc.service_fields, base.service_fields),
        io_config: doc.io_config.or(base.io_config),
        json_structure: base.json_structure.or(doc.json_structure),
        notes: doc.notes.or(base.notes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticCode;

    fn record(name: &str, path: &str) -> FieldRecord {
        FieldRecord::new(name, path)
    }

    #[test]
    fn test_lookup_and_order() {
        let catalog = FieldCatalog::from_records(vec![record("b", "b"), record("a", "a")]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.position("a"), Some(1));
        assert_eq!(catalog.get("b").unwrap().path, "b");
        assert!(catalog.get("c").is_none());
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut second = record("a", "second");
        second.unit = Some("m".into());
        let catalog = FieldCatalog::from_records(vec![record("a", "first"), second]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("a").unwrap().path, "first");
        assert_eq!(catalog.diagnostics()[0].code, DiagnosticCode::DuplicateField);
    }

    #[test]
    fn test_documentation_path_is_reconciled() {
        let structural = vec![record("status_code", "status.statuses.code")];
        let documentation = vec![record("code", "status.statuses[].code")];
        let catalog = FieldCatalog::from_sources(documentation, structural);

        let code = catalog.get("code").unwrap();
        assert_eq!(code.path, "status.statuses.code");
        assert_eq!(code.documented_path.as_deref(), Some("status.statuses[].code"));
        // Structural-only record follows documentation records.
        assert_eq!(catalog.position("status_code"), Some(1));
        assert!(catalog.diagnostics().is_empty());
    }

    #[test]
    fn test_unresolved_path_kept_with_diagnostic() {
        let structural = vec![record("lat", "location.latitude")];
        let documentation = vec![record("fuel", "fuel.level")];
        let catalog = FieldCatalog::from_sources(documentation, structural);

        assert_eq!(catalog.get("fuel").unwrap().path, "fuel.level");
        let diag = &catalog.diagnostics()[0];
        assert_eq!(diag.code, DiagnosticCode::UnresolvedFieldPath);
        assert_eq!(diag.field.as_deref(), Some("fuel"));
    }

    #[test]
    fn test_merge_prefers_documentation_values() {
        let mut base = record("speed", "motion.speed");
        base.unit = Some("m/s".into());
        base.data_type = Some("float".into());
        base.priority = PriorityTier::P1;
        let mut doc = record("speed", "motion.speed[]");
        doc.unit = Some("km/h".into());
        doc.provider_refs = vec!["can_speed".into()];

        let catalog = FieldCatalog::from_sources(vec![doc], vec![base]);
        assert_eq!(catalog.len(), 1);
        let speed = catalog.get("speed").unwrap();
        assert_eq!(speed.unit.as_deref(), Some("km/h"));
        assert_eq!(speed.data_type.as_deref(), Some("float"));
        assert_eq!(speed.priority, PriorityTier::P1);
        assert_eq!(speed.path, "motion.speed");
        assert_eq!(speed.documented_path.as_deref(), Some("motion.speed[]"));
        assert_eq!(speed.provider_refs, vec!["can_speed"]);
    }

    #[test]
    fn test_example_paths_are_known() {
        let mut container = record("status", "status");
        container.json_structure =
            Some(r#"{"status": {"statuses": [{"code": 1}]}}"#.to_string());
        let doc = record("status_statuses_code", "status.statuses[].code");
        let catalog = FieldCatalog::from_sources(vec![doc], vec![container]);

        assert!(catalog.known_paths().contains("status.statuses[].code"));
        assert_eq!(
            catalog.get("status_statuses_code").unwrap().path,
            "status.statuses[].code"
        );
    }

    #[test]
    fn test_malformed_example_reported() {
        let mut container = record("fuel", "fuel");
        container.json_structure = Some(r#"{"fuel": {"level": "percent" "x": 1}"#.to_string());
        let catalog = FieldCatalog::from_sources(Vec::new(), vec![container]);

        assert!(catalog.known_paths().contains("fuel.level"));
        assert_eq!(
            catalog.diagnostics()[0].code,
            DiagnosticCode::MalformedStructuredValue
        );
    }
}

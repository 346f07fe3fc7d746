//! Core types for the mapping compiler.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal importance tier of a schema field.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum PriorityTier {
    P0,
    P1,
    P2,
    P3,
    T,
    BL,
    #[default]
    Unknown,
}

impl PriorityTier {
    /// Parse a tier label. Unrecognized labels map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "P0" => PriorityTier::P0,
            "P1" => PriorityTier::P1,
            "P2" => PriorityTier::P2,
            "P3" => PriorityTier::P3,
            "T" => PriorityTier::T,
            "BL" => PriorityTier::BL,
            _ => PriorityTier::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PriorityTier::P0 => "P0",
            PriorityTier::P1 => "P1",
            PriorityTier::P2 => "P2",
            PriorityTier::P3 => "P3",
            PriorityTier::T => "T",
            PriorityTier::BL => "BL",
            PriorityTier::Unknown => "unknown",
        }
    }
}

/// Lifecycle status of a schema field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldStatus {
    #[default]
    Active,
    Inactive,
    Planned,
}

impl FieldStatus {
    /// Parse a status label. Empty input is `Active`; anything unknown is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "active" => Some(FieldStatus::Active),
            "inactive" => Some(FieldStatus::Inactive),
            "planned" => Some(FieldStatus::Planned),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStatus::Active => "active",
            FieldStatus::Inactive => "inactive",
            FieldStatus::Planned => "planned",
        }
    }
}

/// Mapping strategy discriminant emitted as the `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingType {
    Direct,
    Prioritized,
    Calculated,
    Transformed,
    IoMapped,
}

impl MappingType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "direct" => Some(MappingType::Direct),
            "prioritized" => Some(MappingType::Prioritized),
            "calculated" => Some(MappingType::Calculated),
            "transformed" => Some(MappingType::Transformed),
            "io_mapped" => Some(MappingType::IoMapped),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MappingType::Direct => "direct",
            MappingType::Prioritized => "prioritized",
            MappingType::Calculated => "calculated",
            MappingType::Transformed => "transformed",
            MappingType::IoMapped => "io_mapped",
        }
    }

    /// Position of this type in the seed segment of the evaluation order.
    /// Calculated fields are ordered by the dependency sort instead.
    pub fn seed_rank(&self) -> Option<usize> {
        match self {
            MappingType::Direct => Some(0),
            MappingType::Prioritized => Some(1),
            MappingType::Transformed => Some(2),
            MappingType::IoMapped => Some(3),
            MappingType::Calculated => None,
        }
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a calculated field is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationStyle {
    Formula,
    FunctionReference,
}

impl CalculationStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationStyle::Formula => "formula",
            CalculationStyle::FunctionReference => "function_reference",
        }
    }
}

/// One schema field, merged from the structural and documentation catalogs.
///
/// Records are validated once when a catalog is loaded and are read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldRecord {
    /// Stable identifier, unique within a catalog.
    pub name: String,
    /// Structural path; may be rewritten by reconciliation.
    pub path: String,
    /// Path as written in the documentation catalog, kept when reconciliation changed it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documented_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub priority: PriorityTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    pub status: FieldStatus,

    // Provider associations, aligned by index
    pub provider_refs: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provider_paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub provider_units: Vec<String>,
    /// Explicit ranking as a JSON list of `{"field", "priority"}` objects.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_sources: Option<String>,

    // Derivation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub computation_description: Option<String>,
    pub dependency_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_parameters: Option<String>,

    // Explicit overrides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_handling: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_conversion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping_type: Option<MappingType>,

    // Transformed / io_mapped inputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformation: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub service_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub io_config: Option<String>,

    /// Embedded structural example, structural catalog only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_structure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FieldRecord {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// Non-empty computation description, if any.
    pub fn computation(&self) -> Option<&str> {
        self.computation_description
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Trimmed dependency names, without blanks or a bare `provider:` marker.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.dependency_names
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty() && *d != crate::graph::PROVIDER_DEPENDENCY_PREFIX)
    }

    /// Explicit provider path aligned with `provider_refs[index]`.
    pub fn provider_path(&self, index: usize) -> Option<&str> {
        self.provider_paths
            .get(index)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Explicit provider unit aligned with `provider_refs[index]`.
    pub fn provider_unit(&self, index: usize) -> Option<&str> {
        self.provider_units
            .get(index)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }
}

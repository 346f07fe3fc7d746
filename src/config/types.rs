//! Configuration types and structures.
//!
//! Every rule table the compiler consults (formula detection, function naming,
//! provider paths, unit aliases, error policies) lives here so it can be tuned
//! per project without code changes.

use crate::export::DocumentFormat;
use crate::types::{FieldStatus, MappingType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default format-version marker written into emitted documents.
pub const DEFAULT_FORMAT_VERSION: &str = "1.0.0";

/// Default provider identifier.
pub const DEFAULT_PROVIDER: &str = "navixy";

/// Top-level compiler configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub formula: FormulaRules,

    #[serde(default)]
    pub functions: FunctionNameRules,

    #[serde(default)]
    pub provider_paths: ProviderPathRules,

    #[serde(default)]
    pub units: UnitsConfig,

    #[serde(default)]
    pub error_handling: ErrorHandlingDefaults,
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }
}

/// Output document settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Provider identifier written at the top of the document.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Format-version marker written at the top of the document.
    #[serde(default = "default_format_version")]
    pub format_version: String,

    /// Document format when not given on the command line.
    #[serde(default)]
    pub format: DocumentFormat,

    /// Attach provenance comments (YAML only).
    #[serde(default = "default_true")]
    pub annotate: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            format_version: default_format_version(),
            format: DocumentFormat::default(),
            annotate: true,
        }
    }
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_format_version() -> String {
    DEFAULT_FORMAT_VERSION.to_string()
}

fn default_true() -> bool {
    true
}

/// Catalog filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Only fields with one of these statuses are compiled.
    #[serde(default = "default_statuses")]
    pub statuses: Vec<FieldStatus>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            statuses: default_statuses(),
        }
    }
}

fn default_statuses() -> Vec<FieldStatus> {
    vec![FieldStatus::Active, FieldStatus::Planned]
}

impl CatalogConfig {
    pub fn includes(&self, status: FieldStatus) -> bool {
        self.statuses.contains(&status)
    }
}

/// Rules deciding whether a computation description is a simple formula.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormulaRules {
    /// A formula has strictly fewer whitespace tokens than this.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Words that mark a description as prose rather than arithmetic.
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
}

impl Default for FormulaRules {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            stopwords: default_stopwords(),
        }
    }
}

fn default_max_tokens() -> usize {
    10
}

fn default_stopwords() -> Vec<String> {
    ["use", "convert", "from", "if", "api"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// One substring rule for function name inference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionNameRule {
    /// Substring of the field name that triggers the rule.
    pub contains: String,
    /// Function name to use when it matches.
    pub function: String,
}

impl FunctionNameRule {
    pub fn new(contains: &str, function: &str) -> Self {
        Self {
            contains: contains.to_string(),
            function: function.to_string(),
        }
    }
}

/// Rule table for inferring backend function names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionNameRules {
    /// Marker prepended to the stripped field name.
    #[serde(default = "default_function_prefix")]
    pub prefix: String,

    /// Category prefixes stripped from the field name, first match only.
    #[serde(default = "default_category_prefixes")]
    pub category_prefixes: Vec<String>,

    /// Special cases checked before prefix stripping, in order.
    #[serde(default = "default_function_rules")]
    pub rules: Vec<FunctionNameRule>,
}

impl Default for FunctionNameRules {
    fn default() -> Self {
        Self {
            prefix: default_function_prefix(),
            category_prefixes: default_category_prefixes(),
            rules: default_function_rules(),
        }
    }
}

fn default_function_prefix() -> String {
    "derive_".to_string()
}

fn default_category_prefixes() -> Vec<String> {
    ["location_", "motion_", "fuel_", "power_", "status_"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_function_rules() -> Vec<FunctionNameRule> {
    vec![
        FunctionNameRule::new("cardinal", "derive_cardinal_direction"),
        FunctionNameRule::new("geocoded", "geocode_location"),
        FunctionNameRule::new("address", "geocode_location"),
        FunctionNameRule::new("last_changed", "calculate_last_changed_at"),
    ]
}

/// Maps a provider field name prefix to a path prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderPathRule {
    /// Provider field name prefix, e.g. `avl_io_`.
    pub prefix: String,
    /// Prepended to the full field name, e.g. `params.`.
    pub path_prefix: String,
}

/// Rule table for inferring provider paths from provider field names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPathRules {
    #[serde(default = "default_provider_path_rules")]
    pub rules: Vec<ProviderPathRule>,
}

impl Default for ProviderPathRules {
    fn default() -> Self {
        Self {
            rules: default_provider_path_rules(),
        }
    }
}

fn default_provider_path_rules() -> Vec<ProviderPathRule> {
    vec![ProviderPathRule {
        prefix: "avl_io_".to_string(),
        path_prefix: "params.".to_string(),
    }]
}

/// Extra unit aliases layered over the built-in equivalence table.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UnitsConfig {
    /// Alias (case-insensitive) to canonical unit name.
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

/// Error policy applied when a record does not override it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingDefaults {
    #[serde(default = "default_return_null")]
    pub direct: String,
    #[serde(default = "default_use_fallback")]
    pub prioritized: String,
    #[serde(default = "default_return_null")]
    pub calculated: String,
    #[serde(default = "default_return_null")]
    pub transformed: String,
    #[serde(default = "default_return_null")]
    pub io_mapped: String,
}

impl Default for ErrorHandlingDefaults {
    fn default() -> Self {
        Self {
            direct: default_return_null(),
            prioritized: default_use_fallback(),
            calculated: default_return_null(),
            transformed: default_return_null(),
            io_mapped: default_return_null(),
        }
    }
}

impl ErrorHandlingDefaults {
    /// Default policy for a mapping type.
    pub fn for_type(&self, mapping_type: MappingType) -> &str {
        match mapping_type {
            MappingType::Direct => &self.direct,
            MappingType::Prioritized => &self.prioritized,
            MappingType::Calculated => &self.calculated,
            MappingType::Transformed => &self.transformed,
            MappingType::IoMapped => &self.io_mapped,
        }
    }
}

fn default_return_null() -> String {
    "return_null".to_string()
}

fn default_use_fallback() -> String {
    "use_fallback".to_string()
}

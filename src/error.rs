//! Diagnostics and error types.
//!
//! Field-scoped problems are reported as [`Diagnostic`] values and never abort a run.
//! Only catalog loading and document emission can fail a run, through [`CatalogError`]
//! and [`EmitError`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Diagnostic codes for programmatic handling of per-field problems.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Classification rejections (field skipped)
    MissingComputationApproach,
    MissingDependencies,

    // Reconciliation (field kept)
    UnresolvedFieldPath,

    // Ordering (fields appended in catalog order)
    CircularDependency,
    UnresolvedDependencyOrder,

    // Parsing (best-effort fallback used)
    MalformedStructuredValue,

    // Catalog hygiene
    DuplicateField,
    UnknownDependency,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::MissingComputationApproach => "MISSING_COMPUTATION_APPROACH",
            DiagnosticCode::MissingDependencies => "MISSING_DEPENDENCIES",
            DiagnosticCode::UnresolvedFieldPath => "UNRESOLVED_FIELD_PATH",
            DiagnosticCode::CircularDependency => "CIRCULAR_DEPENDENCY",
            DiagnosticCode::UnresolvedDependencyOrder => "UNRESOLVED_DEPENDENCY_ORDER",
            DiagnosticCode::MalformedStructuredValue => "MALFORMED_STRUCTURED_VALUE",
            DiagnosticCode::DuplicateField => "DUPLICATE_FIELD",
            DiagnosticCode::UnknownDependency => "UNKNOWN_DEPENDENCY",
        }
    }

    /// Whether a diagnostic with this code means the field was left out of the output.
    pub fn skips_field(&self) -> bool {
        matches!(
            self,
            DiagnosticCode::MissingComputationApproach | DiagnosticCode::MissingDependencies
        )
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured, field-scoped diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Other fields involved, e.g. the members of a dependency cycle.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            related: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related = related;
        self
    }

    // Convenience constructors

    pub fn missing_computation(field: &str) -> Self {
        Self::new(
            DiagnosticCode::MissingComputationApproach,
            format!("{} has no provider fields and no computation approach", field),
        )
        .with_field(field)
    }

    pub fn missing_dependencies(field: &str) -> Self {
        Self::new(
            DiagnosticCode::MissingDependencies,
            format!("{} references a function but lists no dependencies", field),
        )
        .with_field(field)
    }

    pub fn unresolved_path(field: &str, path: &str) -> Self {
        Self::new(
            DiagnosticCode::UnresolvedFieldPath,
            format!("Path {} matched no structural path; keeping it as written", path),
        )
        .with_field(field)
    }

    pub fn circular_dependency(members: Vec<String>) -> Self {
        Self::new(
            DiagnosticCode::CircularDependency,
            format!("Dependency cycle among: {}", members.join(", ")),
        )
        .with_related(members)
    }

    pub fn unresolved_order(blocked: Vec<String>) -> Self {
        Self::new(
            DiagnosticCode::UnresolvedDependencyOrder,
            format!(
                "Could not order fields blocked by a cycle: {}",
                blocked.join(", ")
            ),
        )
        .with_related(blocked)
    }

    pub fn malformed_value(field: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            DiagnosticCode::MalformedStructuredValue,
            format!("Structured value could not be parsed: {}", reason),
        )
        .with_field(field)
    }

    pub fn duplicate_field(field: &str, source: &str) -> Self {
        Self::new(
            DiagnosticCode::DuplicateField,
            format!("Duplicate field {} in {} catalog; keeping the first", field, source),
        )
        .with_field(field)
    }

    pub fn unknown_dependency(field: &str, dependency: &str) -> Self {
        Self::new(
            DiagnosticCode::UnknownDependency,
            format!("{} depends on {}, which is not in the catalog", field, dependency),
        )
        .with_field(field)
        .with_related(vec![dependency.to_string()])
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{}] {}: {}", self.code, field, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

/// Run-fatal failure while loading a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("catalog {0} contains no usable records")]
    Empty(PathBuf),

    #[error("unsupported catalog format: {0}")]
    UnsupportedFormat(PathBuf),
}

/// Failure while writing or reading a configuration document.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

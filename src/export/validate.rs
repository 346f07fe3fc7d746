//! Structural validation of emitted documents.

use super::ConfigDocument;
use crate::payload::MappingEntry;
use crate::types::CalculationStyle;
use serde::Serialize;
use std::fmt;

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    fn document(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    fn field(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub checked: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return writeln!(f, "OK: {} mappings checked", self.checked);
        }
        writeln!(
            f,
            "{} issue(s) in {} mappings:",
            self.issues.len(),
            self.checked
        )?;
        for issue in &self.issues {
            writeln!(f, "  - {}", issue)?;
        }
        Ok(())
    }
}

/// Check a document's header, per-type required keys, priority order and
/// dependency placement.
pub fn validate(document: &ConfigDocument) -> ValidationReport {
    let mut issues = Vec::new();
    if document.version.trim().is_empty() {
        issues.push(ValidationIssue::document("version is empty"));
    }
    if document.provider.trim().is_empty() {
        issues.push(ValidationIssue::document("provider is empty"));
    }

    for (position, (name, entry)) in document.mappings.iter().enumerate() {
        if entry.error_handling().trim().is_empty() {
            issues.push(ValidationIssue::field(name, "error_handling is empty"));
        }
        match entry {
            MappingEntry::Direct(direct) => {
                if direct.source_path.trim().is_empty() {
                    issues.push(ValidationIssue::field(name, "source_path is empty"));
                }
            }
            MappingEntry::Prioritized(prioritized) => {
                if prioritized.sources.is_empty() {
                    issues.push(ValidationIssue::field(name, "no sources"));
                }
                if prioritized
                    .sources
                    .windows(2)
                    .any(|pair| pair[0].priority > pair[1].priority)
                {
                    issues.push(ValidationIssue::field(name, "source priorities decrease"));
                }
            }
            MappingEntry::Calculated(calculated) => {
                if calculated.calculation_type == CalculationStyle::FunctionReference
                    && calculated
                        .function_name
                        .as_deref()
                        .is_none_or(|f| f.trim().is_empty())
                {
                    issues.push(ValidationIssue::field(name, "function_name is missing"));
                }
                for dependency in &calculated.dependency_names {
                    if let Some(at) = document.position(dependency)
                        && at >= position
                    {
                        issues.push(ValidationIssue::field(
                            name,
                            format!("dependency {} is placed after it", dependency),
                        ));
                    }
                }
            }
            MappingEntry::Transformed(transformed) => {
                if transformed.transformation.trim().is_empty() {
                    issues.push(ValidationIssue::field(name, "transformation is empty"));
                }
            }
            MappingEntry::IoMapped(io) => {
                if io.default_source.is_null() {
                    issues.push(ValidationIssue::field(name, "default_source is missing"));
                }
            }
        }
    }

    ValidationReport {
        checked: document.mappings.len(),
        issues,
    }
}

//! Configuration document emission.
//!
//! A [`ConfigDocument`] is the compiler's output: a format-version marker, the
//! provider id, and the ordered `mappings` map. YAML output carries provenance
//! comments after each entry; JSON output is plain. Nothing time-dependent is
//! written into the document, so unchanged input gives byte-identical output.

pub mod diff;
pub mod validate;

use crate::error::EmitError;
use crate::payload::{MappingEntry, Provenance};
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

pub use diff::{DocumentDiff, EntryChange, ModifiedEntry, diff_documents};
pub use validate::{ValidationIssue, ValidationReport, validate};

/// Output encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Yaml,
    Json,
}

impl DocumentFormat {
    /// Parse a format name. Accepts `yml` for YAML.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "yaml" | "yml" => Some(DocumentFormat::Yaml),
            "json" => Some(DocumentFormat::Json),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Yaml => "yaml",
            DocumentFormat::Json => "json",
        }
    }

    /// Guess the format of an existing document from its extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => DocumentFormat::Json,
            _ => DocumentFormat::Yaml,
        }
    }
}

/// The compiled mapping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    pub version: String,
    pub provider: String,
    #[serde(default)]
    pub mappings: IndexMap<String, MappingEntry>,
}

impl ConfigDocument {
    pub fn new(version: &str, provider: &str) -> Self {
        Self {
            version: version.to_string(),
            provider: provider.to_string(),
            mappings: IndexMap::new(),
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self, EmitError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_json(text: &str) -> Result<Self, EmitError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a document written by the emitter. Comments are ignored.
    pub fn from_file(path: &Path) -> Result<Self, EmitError> {
        let text = std::fs::read_to_string(path).map_err(|source| EmitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match DocumentFormat::from_path(path) {
            DocumentFormat::Json => Self::from_json(&text),
            DocumentFormat::Yaml => Self::from_yaml(&text),
        }
    }

    /// Position of a field in the evaluation order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.mappings.get_index_of(name)
    }
}

/// Renders documents in one format.
#[derive(Debug, Clone, Copy)]
pub struct DocumentWriter {
    pub format: DocumentFormat,
    /// Write provenance comments (YAML only).
    pub annotate: bool,
}

impl DocumentWriter {
    pub fn new(format: DocumentFormat, annotate: bool) -> Self {
        Self { format, annotate }
    }

    pub fn render(
        &self,
        document: &ConfigDocument,
        provenance: &IndexMap<String, Provenance>,
    ) -> Result<String, EmitError> {
        match self.format {
            DocumentFormat::Json => {
                let mut out = serde_json::to_string_pretty(document)?;
                out.push('\n');
                Ok(out)
            }
            DocumentFormat::Yaml => {
                let provenance = if self.annotate { Some(provenance) } else { None };
                render_yaml(document, provenance)
            }
        }
    }

    /// Render and write. A directory target gets a dated file name.
    pub fn write(
        &self,
        document: &ConfigDocument,
        provenance: &IndexMap<String, Provenance>,
        target: &Path,
    ) -> Result<PathBuf, EmitError> {
        let rendered = self.render(document, provenance)?;
        let path = if target.is_dir() {
            target.join(output_file_name(
                &document.provider,
                self.format,
                chrono::Local::now().date_naive(),
            ))
        } else {
            target.to_path_buf()
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| EmitError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&path, rendered).map_err(|source| EmitError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), mappings = document.mappings.len(), "Wrote mapping document");
        Ok(path)
    }
}

/// `{provider}-mapping-{YYYY-MM-DD}.{ext}`
pub fn output_file_name(provider: &str, format: DocumentFormat, date: NaiveDate) -> String {
    format!(
        "{}-mapping-{}.{}",
        provider,
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

#[derive(Serialize)]
struct Header<'a> {
    version: &'a str,
    provider: &'a str,
}

const ENTRY_INDENT: &str = "    ";

fn render_yaml(
    document: &ConfigDocument,
    provenance: Option<&IndexMap<String, Provenance>>,
) -> Result<String, EmitError> {
    let mut out = serde_yaml::to_string(&Header {
        version: &document.version,
        provider: &document.provider,
    })?;
    out.push('\n');

    if document.mappings.is_empty() {
        out.push_str("mappings: {}\n");
        return Ok(out);
    }

    out.push_str("mappings:\n");
    for (name, entry) in &document.mappings {
        let key = serde_yaml::to_string(name)?;
        out.push_str("  ");
        out.push_str(key.trim_end());
        out.push_str(":\n");

        for line in serde_yaml::to_string(entry)?.lines() {
            if !line.is_empty() {
                out.push_str(ENTRY_INDENT);
                out.push_str(line);
            }
            out.push('\n');
        }

        if let Some(source) = provenance.and_then(|p| p.get(name)) {
            push_annotations(&mut out, source);
        }
    }
    Ok(out)
}

fn push_annotations(out: &mut String, source: &Provenance) {
    let mut comment = |text: &str| {
        out.push_str(ENTRY_INDENT);
        out.push_str("# ");
        out.push_str(text.trim_end());
        out.push('\n');
    };

    comment(&format!("Field Path: {}", source.path));
    if let Some(computation) = source.computation.as_deref() {
        let mut lines = computation.lines().map(str::trim).filter(|l| !l.is_empty());
        if let Some(first) = lines.next() {
            comment(&format!("Computation Approach: {}", first));
        }
        for line in lines {
            comment(line);
        }
    }
    if let Some(conversion) = source.unit_conversion.as_deref() {
        comment(&format!("Unit Conversion: {}", conversion));
    }
}

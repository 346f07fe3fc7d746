//! Catalog file loading.
//!
//! Catalogs are tables of field rows in CSV, JSON or YAML, optionally gzipped.
//! Column headers are matched loosely so exports from different documentation
//! tools load without a mapping file.

use crate::error::CatalogError;
use crate::types::{FieldRecord, FieldStatus, MappingType, PriorityTier};
use heck::ToSnakeCase;
use regex_lite::Regex;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Supported catalog encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogFormat {
    Csv,
    Json,
    Yaml,
}

impl CatalogFormat {
    /// Detect the format from the file extension, looking through a `.gz` suffix.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_lowercase();
        let name = name.strip_suffix(".gz").unwrap_or(&name);
        let ext = Path::new(name).extension()?.to_str()?;
        match ext {
            "csv" => Some(CatalogFormat::Csv),
            "json" => Some(CatalogFormat::Json),
            "yaml" | "yml" => Some(CatalogFormat::Yaml),
            _ => None,
        }
    }
}

/// Record attribute a column header maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Name,
    Path,
    Category,
    Priority,
    Unit,
    DataType,
    Status,
    ProviderRefs,
    ProviderPaths,
    ProviderUnits,
    PrioritySources,
    Computation,
    Dependencies,
    FunctionName,
    FunctionParameters,
    ErrorHandling,
    DefaultValue,
    UnitConversion,
    MappingType,
    Transformation,
    ServiceFields,
    IoConfig,
    JsonStructure,
    Notes,
}

impl Column {
    fn from_header(header: &str) -> Option<Self> {
        let column = match normalize_header(header).as_str() {
            "name" | "field_name" | "fleeti_field" | "fleeti_field_name" | "stable_name" => {
                Column::Name
            }
            "path" | "field_path" | "fleeti_field_path" | "json_path" => Column::Path,
            "category" => Column::Category,
            "priority" => Column::Priority,
            "unit" | "fleeti_unit" => Column::Unit,
            "data_type" | "fleeti_data_type" => Column::DataType,
            "status" => Column::Status,
            "provider_refs" | "provider_fields" | "provider_field" | "provider_field_db" => {
                Column::ProviderRefs
            }
            "provider_paths" | "provider_path" => Column::ProviderPaths,
            "provider_units" | "provider_unit" => Column::ProviderUnits,
            "priority_json" | "priority_sources" => Column::PrioritySources,
            "computation_description" | "computation_approach" => Column::Computation,
            "dependency_names" | "dependencies" => Column::Dependencies,
            "function_name" | "backend_function_name" => Column::FunctionName,
            "function_parameters" | "parameters" => Column::FunctionParameters,
            "error_handling" => Column::ErrorHandling,
            "default_value" | "default" => Column::DefaultValue,
            "unit_conversion" => Column::UnitConversion,
            "mapping_type" => Column::MappingType,
            "transformation" => Column::Transformation,
            "service_fields" => Column::ServiceFields,
            "io_config" | "io_mapping_config" | "i_o_mapping_config" => Column::IoConfig,
            "json_structure" | "json_example" | "example" => Column::JsonStructure,
            "notes" => Column::Notes,
            _ => return None,
        };
        Some(column)
    }
}

/// Lowercase a header and collapse everything non-alphanumeric to `_`.
///
/// `💽 Provider Field (db)` becomes `provider_field_db`.
pub fn normalize_header(header: &str) -> String {
    let cleaned: String = header
        .trim_start_matches('\u{feff}')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join("_")
}

static LINK_NAME: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^([^(]+)").ok());

/// Take the display name from a link-style cell: `speed (https://...)` gives `speed`.
pub fn extract_link_name(cell: &str) -> String {
    let cell = cell.trim();
    LINK_NAME
        .as_ref()
        .and_then(|re| re.captures(cell))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| cell.to_string())
}

/// Split a comma-separated cell into non-empty, link-stripped names.
pub fn split_names(cell: &str) -> Vec<String> {
    cell.split(',')
        .map(extract_link_name)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split a comma-separated cell keeping empty slots, for index-aligned columns.
fn split_aligned(cell: &str) -> Vec<String> {
    if cell.trim().is_empty() {
        return Vec::new();
    }
    cell.split(',').map(|s| s.trim().to_string()).collect()
}

/// Derive a stable name from a path: `status.statuses[].family` gives `status_statuses_family`.
pub fn derive_name(path: &str) -> String {
    path.replace("[]", "").replace('.', "_").to_snake_case()
}

/// Resolve a catalog argument. Directories resolve to their most recently
/// modified catalog file.
pub fn resolve_catalog_path(path: &Path) -> Result<PathBuf, CatalogError> {
    if path.is_dir() {
        return find_latest_catalog(path);
    }
    if path.exists() {
        Ok(path.to_path_buf())
    } else {
        Err(CatalogError::NotFound(path.to_path_buf()))
    }
}

/// Most recently modified catalog file in `dir`. Ties break by file name.
pub fn find_latest_catalog(dir: &Path) -> Result<PathBuf, CatalogError> {
    let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() || CatalogFormat::from_path(&path).is_none() {
            continue;
        }
        let modified = entry
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let newer = match &best {
            None => true,
            Some((time, current)) => (modified, &path) > (*time, current),
        };
        if newer {
            best = Some((modified, path));
        }
    }

    match best {
        Some((_, path)) => {
            info!(dir = %dir.display(), selected = %path.display(), "Selected most recent catalog");
            Ok(path)
        }
        None => Err(CatalogError::NotFound(dir.to_path_buf())),
    }
}

/// Read a catalog file to text, decompressing gzip by magic bytes.
pub fn read_catalog_text(path: &Path) -> Result<String, CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    };
    let bytes = std::fs::read(path).map_err(io_err)?;

    if bytes.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = flate2::read::GzDecoder::new(bytes.as_slice());
        let mut text = String::new();
        decoder.read_to_string(&mut text).map_err(io_err)?;
        Ok(text)
    } else {
        String::from_utf8(bytes).map_err(|e| {
            io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

/// Load all usable records from a catalog file.
pub fn load_catalog(path: &Path) -> Result<Vec<FieldRecord>, CatalogError> {
    let path = resolve_catalog_path(path)?;
    let format =
        CatalogFormat::from_path(&path).ok_or_else(|| CatalogError::UnsupportedFormat(path.clone()))?;
    let text = read_catalog_text(&path)?;

    let rows = match format {
        CatalogFormat::Csv => parse_csv_rows(&text, &path)?,
        CatalogFormat::Json => {
            let value: Value = serde_json::from_str(&text).map_err(|source| CatalogError::Json {
                path: path.clone(),
                source,
            })?;
            value_rows(value)
        }
        CatalogFormat::Yaml => {
            let value: Value = serde_yaml::from_str(&text).map_err(|source| CatalogError::Yaml {
                path: path.clone(),
                source,
            })?;
            value_rows(value)
        }
    };

    let total = rows.len();
    let records: Vec<FieldRecord> = rows
        .into_iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let record = record_from_row(&row);
            if record.is_none() {
                warn!(path = %path.display(), row = idx + 1, "Skipping row without name or path");
            }
            record
        })
        .collect();

    if records.is_empty() {
        return Err(CatalogError::Empty(path));
    }
    debug!(path = %path.display(), rows = total, records = records.len(), "Loaded catalog");
    Ok(records)
}

/// One table row as (header, cell) pairs.
type Row = Vec<(String, String)>;

fn parse_csv_rows(text: &str, path: &Path) -> Result<Vec<Row>, CatalogError> {
    let csv_err = |source| CatalogError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers().map_err(csv_err)?.clone();

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => rows.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.to_string(), v.to_string()))
                    .collect(),
            ),
            Err(e) => warn!(path = %path.display(), row = idx + 1, error = %e, "Skipping malformed CSV row"),
        }
    }
    Ok(rows)
}

/// Rows from a JSON/YAML document: a top-level array, or an object holding
/// one under `fields` or `records`.
fn value_rows(value: Value) -> Vec<Row> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("fields").or_else(|| map.remove("records")) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(
                map.into_iter()
                    .map(|(k, v)| (k, cell_text(v)))
                    .collect(),
            ),
            _ => None,
        })
        .collect()
}

fn cell_text(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Array(items) if items.iter().any(|v| v.is_object() || v.is_array()) => {
            Value::Array(items).to_string()
        }
        Value::Array(items) => items
            .into_iter()
            .map(cell_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
        other => other.to_string(),
    }
}

fn non_empty(cell: &str) -> Option<String> {
    let cell = cell.trim();
    (!cell.is_empty()).then(|| cell.to_string())
}

/// Build a record from a row. Rows with neither name nor path yield `None`.
fn record_from_row(row: &Row) -> Option<FieldRecord> {
    let mut record = FieldRecord::default();

    for (header, cell) in row {
        let Some(column) = Column::from_header(header) else {
            continue;
        };
        match column {
            Column::Name => {
                let name = extract_link_name(cell);
                if !name.is_empty() {
                    record.name = name;
                }
            }
            Column::Path => {
                if let Some(path) = non_empty(cell) {
                    record.path = path;
                }
            }
            Column::Category => record.category = non_empty(cell),
            Column::Priority => record.priority = PriorityTier::parse(cell),
            Column::Unit => record.unit = non_empty(cell),
            Column::DataType => record.data_type = non_empty(cell),
            Column::Status => {
                record.status = FieldStatus::parse(cell).unwrap_or_else(|| {
                    warn!(status = %cell, "Unknown status, treating field as inactive");
                    FieldStatus::Inactive
                })
            }
            Column::ProviderRefs => record.provider_refs = split_names(cell),
            Column::ProviderPaths => record.provider_paths = split_aligned(cell),
            Column::ProviderUnits => record.provider_units = split_aligned(cell),
            Column::PrioritySources => record.priority_sources = non_empty(cell),
            Column::Computation => record.computation_description = non_empty(cell),
            Column::Dependencies => record.dependency_names = split_names(cell),
            Column::FunctionName => record.function_name = non_empty(cell),
            Column::FunctionParameters => record.function_parameters = non_empty(cell),
            Column::ErrorHandling => record.error_handling = non_empty(cell),
            Column::DefaultValue => record.default_value = non_empty(cell),
            Column::UnitConversion => record.unit_conversion = non_empty(cell),
            Column::MappingType => record.mapping_type = MappingType::parse(cell),
            Column::Transformation => record.transformation = non_empty(cell),
            Column::ServiceFields => record.service_fields = split_names(cell),
            Column::IoConfig => record.io_config = non_empty(cell),
            Column::JsonStructure => record.json_structure = non_empty(cell),
            Column::Notes => record.notes = non_empty(cell),
        }
    }

    if record.name.is_empty() && record.path.is_empty() {
        return None;
    }
    if record.name.is_empty() {
        record.name = derive_name(&record.path);
    }
    Some(record)
}

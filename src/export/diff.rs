//! Comparison of two mapping documents.
//!
//! Used to review a regenerated configuration against the previous one and to
//! confirm that recompiling unchanged catalogs changes nothing.

use super::ConfigDocument;
use crate::payload::MappingEntry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// A single key change within an entry (or the document header).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryChange {
    pub key: String,
    pub old_value: Value,
    pub new_value: Value,
}

/// A mapping present in both documents with different content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModifiedEntry {
    pub name: String,
    pub changes: Vec<EntryChange>,
}

/// Complete diff between two documents.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DocumentDiff {
    pub source_label: String,
    pub target_label: String,
    /// `version` and `provider` changes.
    pub header: Vec<EntryChange>,
    /// Mappings only in the target, in target order.
    pub added: Vec<String>,
    /// Mappings only in the source, in source order.
    pub removed: Vec<String>,
    pub modified: Vec<ModifiedEntry>,
    /// Whether the shared mappings appear in a different relative order.
    pub order_changed: bool,
}

impl DocumentDiff {
    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && !self.order_changed
    }

    pub fn total_changes(&self) -> usize {
        self.header.len()
            + self.added.len()
            + self.removed.len()
            + self.modified.len()
            + usize::from(self.order_changed)
    }
}

impl fmt::Display for DocumentDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            writeln!(f, "No differences found.")?;
            return Ok(());
        }

        writeln!(f, "Diff: {} -> {}", self.source_label, self.target_label)?;
        writeln!(f, "{}", "=".repeat(60))?;

        if !self.header.is_empty() {
            writeln!(f)?;
            writeln!(f, "Header")?;
            writeln!(f, "{}", "-".repeat(40))?;
            for change in &self.header {
                writeln!(
                    f,
                    "    {}: {} -> {}",
                    change.key, change.old_value, change.new_value
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Mappings")?;
        writeln!(f, "{}", "-".repeat(40))?;

        if !self.added.is_empty() {
            writeln!(f, "  Added ({}):", self.added.len())?;
            for name in &self.added {
                writeln!(f, "    + {}", name)?;
            }
        }

        if !self.removed.is_empty() {
            writeln!(f, "  Removed ({}):", self.removed.len())?;
            for name in &self.removed {
                writeln!(f, "    - {}", name)?;
            }
        }

        if !self.modified.is_empty() {
            writeln!(f, "  Modified ({}):", self.modified.len())?;
            for modified in &self.modified {
                writeln!(f, "    ~ {}", modified.name)?;
                for change in &modified.changes {
                    writeln!(
                        f,
                        "        {}: {} -> {}",
                        change.key, change.old_value, change.new_value
                    )?;
                }
            }
        }

        if self.order_changed {
            writeln!(f, "  Evaluation order changed")?;
        }

        writeln!(f)?;
        writeln!(f, "Summary: {} total changes", self.total_changes())?;

        Ok(())
    }
}

/// Compare two values, ignoring floating point precision issues.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(na), Value::Number(nb)) => {
            if let (Some(fa), Some(fb)) = (na.as_f64(), nb.as_f64()) {
                (fa - fb).abs() < 1e-10
            } else {
                na == nb
            }
        }
        _ => a == b,
    }
}

fn entry_value(entry: &MappingEntry) -> Value {
    serde_json::to_value(entry).unwrap_or(Value::Null)
}

/// Per-key differences between two serialized entries, in key order.
fn diff_entries(source: &Value, target: &Value) -> Vec<EntryChange> {
    let (Some(src), Some(tgt)) = (source.as_object(), target.as_object()) else {
        return if values_equal(source, target) {
            Vec::new()
        } else {
            vec![EntryChange {
                key: String::new(),
                old_value: source.clone(),
                new_value: target.clone(),
            }]
        };
    };

    let keys: BTreeSet<&str> = src.keys().chain(tgt.keys()).map(String::as_str).collect();
    keys.into_iter()
        .filter_map(|key| {
            let old = src.get(key).unwrap_or(&Value::Null);
            let new = tgt.get(key).unwrap_or(&Value::Null);
            (!values_equal(old, new)).then(|| EntryChange {
                key: key.to_string(),
                old_value: old.clone(),
                new_value: new.clone(),
            })
        })
        .collect()
}

fn header_change(key: &str, old: &str, new: &str) -> Option<EntryChange> {
    (old != new).then(|| EntryChange {
        key: key.to_string(),
        old_value: Value::String(old.to_string()),
        new_value: Value::String(new.to_string()),
    })
}

/// Compare two documents.
///
/// - "added" = mappings in target but not in source
/// - "removed" = mappings in source but not in target
/// - "modified" = same name, different content
pub fn diff_documents(source: &ConfigDocument, target: &ConfigDocument) -> DocumentDiff {
    let mut diff = DocumentDiff {
        source_label: "source".to_string(),
        target_label: "target".to_string(),
        ..Default::default()
    };

    diff.header.extend(header_change("version", &source.version, &target.version));
    diff.header.extend(header_change("provider", &source.provider, &target.provider));

    diff.added = target
        .mappings
        .keys()
        .filter(|name| !source.mappings.contains_key(*name))
        .cloned()
        .collect();
    diff.removed = source
        .mappings
        .keys()
        .filter(|name| !target.mappings.contains_key(*name))
        .cloned()
        .collect();

    for (name, source_entry) in &source.mappings {
        if let Some(target_entry) = target.mappings.get(name) {
            let changes = diff_entries(&entry_value(source_entry), &entry_value(target_entry));
            if !changes.is_empty() {
                diff.modified.push(ModifiedEntry {
                    name: name.clone(),
                    changes,
                });
            }
        }
    }

    let shared_in_source = source.mappings.keys().filter(|n| target.mappings.contains_key(*n));
    let shared_in_target = target.mappings.keys().filter(|n| source.mappings.contains_key(*n));
    diff.order_changed = !shared_in_source.eq(shared_in_target);

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::DirectMapping;
    use serde_json::json;

    fn direct(path: &str) -> MappingEntry {
        MappingEntry::Direct(DirectMapping {
            source_path: path.to_string(),
            unit: None,
            data_type: None,
            default: None,
            unit_conversion: None,
            error_handling: "return_null".into(),
        })
    }

    fn document(entries: &[(&str, &str)]) -> ConfigDocument {
        let mut doc = ConfigDocument::new("1.0.0", "navixy");
        for (name, path) in entries {
            doc.mappings.insert(name.to_string(), direct(path));
        }
        doc
    }

    #[test]
    fn test_identical_documents() {
        let a = document(&[("lat", "lat"), ("lng", "lng")]);
        let diff = diff_documents(&a, &a.clone());
        assert!(diff.is_empty());
        assert_eq!(diff.to_string(), "No differences found.\n");
    }

    #[test]
    fn test_added_removed_modified() {
        let a = document(&[("lat", "lat"), ("old", "x")]);
        let b = document(&[("lat", "gps.lat"), ("new", "y")]);
        let diff = diff_documents(&a, &b);

        assert_eq!(diff.added, vec!["new".to_string()]);
        assert_eq!(diff.removed, vec!["old".to_string()]);
        assert_eq!(diff.modified.len(), 1);
        assert_eq!(diff.modified[0].name, "lat");
        assert_eq!(
            diff.modified[0].changes,
            vec![EntryChange {
                key: "source_path".into(),
                old_value: json!("lat"),
                new_value: json!("gps.lat"),
            }]
        );
        assert!(!diff.order_changed);
        assert_eq!(diff.total_changes(), 3);
    }

    #[test]
    fn test_order_change_detected() {
        let a = document(&[("lat", "lat"), ("lng", "lng")]);
        let b = document(&[("lng", "lng"), ("lat", "lat")]);
        let diff = diff_documents(&a, &b);
        assert!(diff.order_changed);
        assert!(diff.modified.is_empty());
    }

    #[test]
    fn test_header_change() {
        let a = document(&[]);
        let mut b = document(&[]);
        b.provider = "teltonika".into();
        let diff = diff_documents(&a, &b);
        assert_eq!(diff.header.len(), 1);
        assert_eq!(diff.header[0].key, "provider");
    }

    #[test]
    fn test_values_equal() {
        assert!(values_equal(&json!(1), &json!(1.0)));
        assert!(!values_equal(&json!("a"), &json!("b")));
    }

    #[test]
    fn test_display() {
        let mut diff = diff_documents(&document(&[]), &document(&[("lat", "lat")]));
        diff.source_label = "old.yaml".into();
        diff.target_label = "new.yaml".into();
        let output = diff.to_string();
        assert!(output.contains("old.yaml -> new.yaml"));
        assert!(output.contains("Added (1)"));
        assert!(output.contains("+ lat"));
    }
}

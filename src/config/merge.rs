//! Field-by-field merging of configuration tiers.
//!
//! Tiers are parsed into `serde_json::Value` trees and folded together before
//! the result is deserialized into [`Config`](super::Config). Rule lists such as
//! `formula.stopwords` are replaced wholesale by a higher tier, never appended.

use serde_json::Value;

/// Merge `overlay` into `base`, with `overlay` winning.
///
/// - Objects merge key by key, recursively.
/// - Any other value in `overlay` replaces the base value.
/// - A null in `overlay` means "not specified" and keeps the base value.
///
/// # Example
/// ```
/// use serde_json::json;
/// use mapping_compiler::config::deep_merge;
///
/// let defaults = json!({
///     "output": { "provider": "navixy", "annotate": true },
///     "formula": { "stopwords": ["use", "if"] }
/// });
/// let project = json!({
///     "output": { "provider": "teltonika" },
///     "formula": { "stopwords": ["via"] }
/// });
/// let merged = deep_merge(defaults, project);
/// assert_eq!(merged["output"]["provider"], "teltonika");
/// assert_eq!(merged["output"]["annotate"], true);
/// assert_eq!(merged["formula"]["stopwords"], json!(["via"]));
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut merged), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let next = match merged.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Fold tiers from lowest to highest precedence.
pub fn deep_merge_all(tiers: impl IntoIterator<Item = Value>) -> Value {
    tiers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_override_keeps_siblings() {
        let base = json!({"output": {"provider": "navixy", "format_version": "1.0.0"}});
        let overlay = json!({"output": {"format_version": "2.0.0"}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"output": {"provider": "navixy", "format_version": "2.0.0"}})
        );
    }

    #[test]
    fn test_rule_lists_are_replaced() {
        let base = json!({"functions": {"category_prefixes": ["location_", "motion_"]}});
        let overlay = json!({"functions": {"category_prefixes": ["sensor_"]}});
        assert_eq!(
            deep_merge(base, overlay),
            json!({"functions": {"category_prefixes": ["sensor_"]}})
        );
    }

    #[test]
    fn test_null_keeps_lower_tier() {
        let base = json!({"output": {"annotate": true}});
        let overlay = json!({"output": {"annotate": null}});
        assert_eq!(deep_merge(base, overlay), json!({"output": {"annotate": true}}));
    }

    #[test]
    fn test_scalar_tier_replaces_object() {
        let base = json!({"units": {"aliases": {"kn": "knots"}}});
        let overlay = json!({"units": "none"});
        assert_eq!(deep_merge(base, overlay), json!({"units": "none"}));
    }

    #[test]
    fn test_merge_all_in_tier_order() {
        let tiers = vec![
            json!({"output": {"provider": "defaults"}}),
            json!({"output": {"provider": "project"}}),
            json!({"output": {"provider": "user"}}),
        ];
        assert_eq!(deep_merge_all(tiers), json!({"output": {"provider": "user"}}));
    }

    #[test]
    fn test_merge_all_empty_is_null() {
        assert_eq!(deep_merge_all(Vec::new()), Value::Null);
    }
}

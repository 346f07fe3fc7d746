//! Source ordering for prioritized mappings.

use crate::config::ProviderPathRules;
use serde::{Deserialize, Serialize};

/// One ranked provider source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrioritySource {
    pub priority: u32,
    pub provider_field: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// One entry of an explicit ranking.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RankedField {
    pub field: String,
    pub priority: u32,
}

/// Parse a `[{"field": ..., "priority": ...}]` ranking, sorted by priority.
/// Equal priorities keep list order; entries without a field name are dropped.
pub fn parse_priority_list(text: &str) -> Result<Vec<RankedField>, serde_json::Error> {
    let mut ranked: Vec<RankedField> = serde_json::from_str(text)?;
    ranked.retain_mut(|entry| {
        entry.field = entry.field.trim().to_string();
        !entry.field.is_empty()
    });
    ranked.sort_by_key(|entry| entry.priority);
    Ok(ranked)
}

/// Order provider fields by a `a > b > c` description.
///
/// Each token claims the first unclaimed field by exact match, then suffix
/// match, then substring match. Unclaimed fields follow in their original
/// order. Returns indices into `provider_refs`.
pub fn priority_order(provider_refs: &[String], description: Option<&str>) -> Vec<usize> {
    let mut claimed = vec![false; provider_refs.len()];
    let mut order = Vec::with_capacity(provider_refs.len());

    if let Some(description) = description.filter(|d| d.contains('>')) {
        let tokens = description
            .split('>')
            .map(|t| t.trim().trim_matches('`').trim())
            .filter(|t| !t.is_empty());

        for token in tokens {
            let passes: [&dyn Fn(&str) -> bool; 3] = [
                &|field: &str| field == token,
                &|field: &str| field.ends_with(token),
                &|field: &str| field.contains(token),
            ];
            let hit = passes.iter().find_map(|matches| {
                provider_refs
                    .iter()
                    .enumerate()
                    .find(|(i, field)| !claimed[*i] && matches(field.as_str()))
                    .map(|(i, _)| i)
            });
            if let Some(i) = hit {
                claimed[i] = true;
                order.push(i);
            }
        }
    }

    order.extend((0..provider_refs.len()).filter(|&i| !claimed[i]));
    order
}

/// Provider path for a field: the explicit path if given, otherwise the first
/// matching prefix rule, otherwise the field name itself.
pub fn provider_path(field: &str, explicit: Option<&str>, rules: &ProviderPathRules) -> String {
    if let Some(path) = explicit.map(str::trim).filter(|p| !p.is_empty()) {
        return path.to_string();
    }
    rules
        .rules
        .iter()
        .find(|rule| field.starts_with(rule.prefix.as_str()))
        .map(|rule| format!("{}{}", rule.path_prefix, field))
        .unwrap_or_else(|| field.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_description_keeps_order() {
        assert_eq!(priority_order(&refs(&["a", "b", "c"]), None), vec![0, 1, 2]);
        assert_eq!(
            priority_order(&refs(&["a", "b"]), Some("Prefer CAN data")),
            vec![0, 1]
        );
    }

    #[test]
    fn test_exact_then_suffix_then_substring() {
        let fields = refs(&["can_speed", "gps_speed", "avl_io_24_speed_raw"]);
        assert_eq!(
            priority_order(&fields, Some("io_24 > gps_speed > speed")),
            vec![2, 1, 0]
        );
    }

    #[test]
    fn test_exact_beats_earlier_substring() {
        let fields = refs(&["speed_raw", "speed"]);
        assert_eq!(priority_order(&fields, Some("speed")), vec![0, 1]);
        assert_eq!(priority_order(&fields, Some("speed > speed_raw")), vec![1, 0]);
    }

    #[test]
    fn test_unmatched_appended_in_original_order() {
        let fields = refs(&["a", "b", "c", "d"]);
        assert_eq!(priority_order(&fields, Some("`c` > zzz")), vec![2, 0, 1, 3]);
    }

    #[test]
    fn test_each_field_claimed_once() {
        let fields = refs(&["lat", "lat_alt"]);
        assert_eq!(priority_order(&fields, Some("lat > lat > lat")), vec![0, 1]);
    }

    #[test]
    fn test_priority_list_sorted_by_priority() {
        let ranked = parse_priority_list(
            r#"[{"field": "can_speed", "priority": 2}, {"field": " gps_speed ", "priority": 1}, {"field": "", "priority": 0}]"#,
        )
        .unwrap();
        let fields: Vec<(&str, u32)> = ranked
            .iter()
            .map(|r| (r.field.as_str(), r.priority))
            .collect();
        assert_eq!(fields, vec![("gps_speed", 1), ("can_speed", 2)]);
    }

    #[test]
    fn test_priority_list_ties_keep_list_order() {
        let ranked = parse_priority_list(
            r#"[{"field": "b", "priority": 1}, {"field": "a", "priority": 1}]"#,
        )
        .unwrap();
        assert_eq!(ranked[0].field, "b");
        assert_eq!(ranked[1].field, "a");
    }

    #[test]
    fn test_priority_list_rejects_bad_json() {
        assert!(parse_priority_list("gps > can").is_err());
        assert!(parse_priority_list(r#"[{"field": "a", "priority": -1}]"#).is_err());
        assert!(parse_priority_list(r#"{"field": "a", "priority": 1}"#).is_err());
    }

    #[test]
    fn test_provider_path_rules() {
        let rules = ProviderPathRules::default();
        assert_eq!(provider_path("avl_io_239", None, &rules), "params.avl_io_239");
        assert_eq!(provider_path("lat", None, &rules), "lat");
        assert_eq!(provider_path("lat", Some("gps.lat"), &rules), "gps.lat");
        assert_eq!(provider_path("avl_io_1", Some("  "), &rules), "params.avl_io_1");
    }
}

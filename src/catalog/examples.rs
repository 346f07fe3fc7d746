//! Structural example parsing.
//!
//! Examples are JSON-like snippets copied from documentation, often with
//! placeholder values (`"decimal degrees"`, `{ ... }`) and `//` comments.
//! Parsing tries an explicit list of strategies in order; the last one scans
//! the raw text for keys and never fails.

use regex_lite::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Nesting limit for the text fallback.
const MAX_TEXT_DEPTH: usize = 10;

/// Which strategy produced the paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStrategy {
    Strict,
    PlaceholderNormalized,
    TextFallback,
}

/// Paths extracted from one example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralExample {
    pub paths: Vec<String>,
    pub strategy: ParseStrategy,
}

impl StructuralExample {
    /// True when neither JSON strategy worked.
    pub fn is_malformed(&self) -> bool {
        self.strategy == ParseStrategy::TextFallback
    }
}

type ValueStrategy = fn(&str) -> Option<Value>;

const VALUE_STRATEGIES: [(ParseStrategy, ValueStrategy); 2] = [
    (ParseStrategy::Strict, parse_strict),
    (ParseStrategy::PlaceholderNormalized, parse_normalized),
];

/// Placeholder patterns and their JSON replacements, applied in order.
const PLACEHOLDER_RULES: &[(&str, &str)] = &[
    (r#""decimal degrees[^"]*""#, "0.0"),
    (r#""meters[^"]*""#, "0"),
    (r#""degrees[^"]*""#, "0"),
    (r#""string[^"]*""#, r#""""#),
    (r#""number""#, "0"),
    (r#""integer[^"]*""#, "0"),
    (r#""boolean""#, "true"),
    (r#""uuid""#, r#""""#),
    (r"\{\s*\.\.\.\s*\}", "{}"),
    (r#"(?m)//[^\n"]*$"#, ""),
    (r",(\s*[}\]])", "$1"),
];

static PLACEHOLDERS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    PLACEHOLDER_RULES
        .iter()
        .filter_map(|(pattern, replacement)| {
            Regex::new(pattern).ok().map(|re| (re, *replacement))
        })
        .collect()
});

static KEY_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#""([^"]+)":\s*(?:"([^"]*)"|(\{[^}]*\})|(\[[^\]]*\])|(-?[\w.]+))"#).ok()
});

/// Parse an example and extract its paths.
pub fn parse_example(text: &str) -> StructuralExample {
    let body = strip_code_fence(text);
    for (strategy, parse) in VALUE_STRATEGIES {
        if let Some(value) = parse(body) {
            let mut paths = Vec::new();
            collect_paths(&value, "", &mut paths);
            return StructuralExample { paths, strategy };
        }
    }
    let mut paths = Vec::new();
    collect_text_paths(body, "", 0, &mut paths);
    StructuralExample {
        paths,
        strategy: ParseStrategy::TextFallback,
    }
}

fn parse_strict(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

fn parse_normalized(text: &str) -> Option<Value> {
    serde_json::from_str(&normalize_placeholders(text)).ok()
}

/// Rewrite documentation placeholders into valid JSON values.
pub fn normalize_placeholders(text: &str) -> String {
    PLACEHOLDERS
        .iter()
        .fold(text.to_string(), |acc, (re, replacement)| {
            re.replace_all(&acc, *replacement).into_owned()
        })
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// Objects that hold a measured value are leaves, not containers.
fn is_leaf_object(map: &serde_json::Map<String, Value>) -> bool {
    (map.contains_key("value") && map.contains_key("unit"))
        || map.contains_key("last_changed_at")
        || map.contains_key("last_updated_at")
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn push_unique(paths: &mut Vec<String>, path: String) {
    if !paths.contains(&path) {
        paths.push(path);
    }
}

/// Walk a parsed example and record every path, object keys in sorted order.
pub fn collect_paths(value: &Value, prefix: &str, paths: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if !prefix.is_empty() && is_leaf_object(map) {
                return;
            }
            for (key, child) in map {
                let path = join(prefix, key);
                push_unique(paths, path.clone());
                collect_paths(child, &path, paths);
            }
        }
        Value::Array(items) => {
            if prefix.is_empty() {
                return;
            }
            let array_path = format!("{}[]", prefix);
            // The container is recorded as `a[]`; the bare `a` was already pushed by the parent.
            push_unique(paths, array_path.clone());
            if let Some(first) = items.first() {
                collect_paths(first, &array_path, paths);
            }
        }
        _ => {}
    }
}

fn collect_text_paths(text: &str, prefix: &str, depth: usize, paths: &mut Vec<String>) {
    if depth >= MAX_TEXT_DEPTH {
        return;
    }
    let Some(re) = KEY_PATTERN.as_ref() else {
        return;
    };
    for caps in re.captures_iter(text) {
        let Some(key) = caps.get(1) else { continue };
        let path = join(prefix, key.as_str());
        push_unique(paths, path.clone());
        if let Some(object) = caps.get(3) {
            let inner = object.as_str();
            collect_text_paths(&inner[1..inner.len() - 1], &path, depth + 1, paths);
        } else if let Some(array) = caps.get(4) {
            let array_path = format!("{}[]", path);
            push_unique(paths, array_path.clone());
            let inner = array.as_str();
            collect_text_paths(&inner[1..inner.len() - 1], &array_path, depth + 1, paths);
        }
    }
}

//! Function references for calculated fields: backend function names and
//! parameter bindings.

use crate::config::FunctionNameRules;
use crate::graph::PROVIDER_DEPENDENCY_PREFIX;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single binding or a list of bindings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binding {
    One(String),
    Many(Vec<String>),
}

impl Binding {
    /// Scalar for one item, list for several, nothing for none.
    pub fn from_list(mut items: Vec<String>) -> Option<Self> {
        match items.len() {
            0 => None,
            1 => items.pop().map(Binding::One),
            _ => Some(Binding::Many(items)),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Binding::One(name) => vec![name.as_str()],
            Binding::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Inputs of a backend function, split into schema-field and provider-field bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterBindings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Binding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<Binding>,
}

impl ParameterBindings {
    fn from_lists(schema: Vec<String>, provider: Vec<String>) -> Self {
        Self {
            schema: Binding::from_list(schema),
            provider: Binding::from_list(provider),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.schema.is_none() && self.provider.is_none()
    }
}

/// Infer the backend function for a field.
///
/// Special-case rules are checked first, in order. Otherwise the first matching
/// category prefix is stripped and the configured marker prepended:
/// `motion_heading` becomes `derive_heading`.
pub fn infer_function_name(field_name: &str, rules: &FunctionNameRules) -> String {
    if let Some(rule) = rules
        .rules
        .iter()
        .find(|rule| field_name.contains(rule.contains.as_str()))
    {
        return rule.function.clone();
    }

    let base = rules
        .category_prefixes
        .iter()
        .find_map(|prefix| field_name.strip_prefix(prefix.as_str()))
        .unwrap_or(field_name);
    format!("{}{}", rules.prefix, base)
}

/// Split dependency names into bindings.
pub fn bindings_from_dependencies(dependencies: &[String]) -> ParameterBindings {
    let (provider, schema): (Vec<&String>, Vec<&String>) = dependencies
        .iter()
        .partition(|d| d.starts_with(PROVIDER_DEPENDENCY_PREFIX));
    ParameterBindings::from_lists(
        schema.into_iter().map(|d| d.trim().to_string()).collect(),
        provider
            .into_iter()
            .map(|d| strip_provider(d).to_string())
            .collect(),
    )
}

fn strip_provider(reference: &str) -> &str {
    reference
        .strip_prefix(PROVIDER_DEPENDENCY_PREFIX)
        .unwrap_or(reference)
        .trim()
}

type BindingStrategy = fn(&str) -> Option<ParameterBindings>;

/// Parsing strategies for an explicit parameter specification, in order.
const BINDING_STRATEGIES: [BindingStrategy; 3] = [parse_grouped_json, parse_legacy_json, parse_lines];

/// Parse an explicit parameter specification, or `None` if no strategy accepts it.
pub fn parse_parameter_bindings(text: &str) -> Option<ParameterBindings> {
    BINDING_STRATEGIES
        .iter()
        .find_map(|parse| parse(text.trim()))
        .filter(|bindings| !bindings.is_empty())
}

fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.trim().to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// `{"schema": ..., "provider": ...}`; `fleeti` is accepted for `schema`.
fn parse_grouped_json(text: &str) -> Option<ParameterBindings> {
    let Value::Object(map) = serde_json::from_str::<Value>(text).ok()? else {
        return None;
    };
    let schema = map.get("schema").or_else(|| map.get("fleeti"));
    let provider = map.get("provider");
    if schema.is_none() && provider.is_none() {
        return None;
    }
    Some(ParameterBindings::from_lists(
        schema.map(string_list).unwrap_or_default(),
        provider.map(string_list).unwrap_or_default(),
    ))
}

/// `{"param": "field", "other": "provider:raw"}`.
fn parse_legacy_json(text: &str) -> Option<ParameterBindings> {
    let Value::Object(map) = serde_json::from_str::<Value>(text).ok()? else {
        return None;
    };
    let references: Vec<String> = map
        .values()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    (!references.is_empty()).then(|| bindings_from_dependencies(&references))
}

/// One `param: reference` per line. `schema:` and `provider:` lines take a
/// comma-separated list.
fn parse_lines(text: &str) -> Option<ParameterBindings> {
    let mut schema = Vec::new();
    let mut provider = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (key, value) = line.split_once(':')?;
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return None;
        }
        let value = value.trim();
        let items = value.split(',').map(str::trim).filter(|s| !s.is_empty());
        match key {
            "schema" | "fleeti" => schema.extend(items.map(str::to_string)),
            "provider" => provider.extend(items.map(str::to_string)),
            _ if value.starts_with(PROVIDER_DEPENDENCY_PREFIX) => {
                provider.push(strip_provider(value).to_string())
            }
            _ if !value.is_empty() => schema.push(value.to_string()),
            _ => {}
        }
    }
    Some(ParameterBindings::from_lists(schema, provider))
}

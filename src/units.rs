//! Unit normalization.
//!
//! Unit strings are folded into a small equivalence table before comparison.
//! The compiler never invents numeric conversions: when two units normalize to
//! different classes the conversion is flagged for manual specification.

use crate::config::UnitsConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Physical dimension of a unit class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Distance,
    Angle,
    Temperature,
    Speed,
    Other,
}

/// A normalized unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitClass {
    pub canonical: String,
    pub dimension: Dimension,
}

/// Outcome of comparing a source unit with a target unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionDecision {
    /// Both units normalize to the same class.
    NotNeeded,
    /// At least one side is absent or not in the table.
    Unknown,
    /// Both sides normalize and differ. Left for manual specification.
    ManualRequired { from: String, to: String },
}

impl ConversionDecision {
    /// Provenance note for a manual conversion.
    pub fn note(&self) -> Option<String> {
        match self {
            ConversionDecision::ManualRequired { from, to } => {
                Some(format!("manual ({} -> {})", from, to))
            }
            _ => None,
        }
    }
}

impl fmt::Display for ConversionDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionDecision::NotNeeded => write!(f, "not needed"),
            ConversionDecision::Unknown => write!(f, "unknown"),
            ConversionDecision::ManualRequired { from, to } => {
                write!(f, "manual ({} -> {})", from, to)
            }
        }
    }
}

const BUILTIN: &[(&str, Dimension, &[&str])] = &[
    (
        "meters",
        Dimension::Distance,
        &["m", "meter", "meters", "metre", "metres"],
    ),
    (
        "kilometers",
        Dimension::Distance,
        &["km", "kilometer", "kilometers"],
    ),
    ("degrees", Dimension::Angle, &["deg", "degree", "degrees"]),
    ("celsius", Dimension::Temperature, &["°c", "c", "celsius"]),
    ("fahrenheit", Dimension::Temperature, &["°f", "f", "fahrenheit"]),
    ("km/h", Dimension::Speed, &["km/h", "kmh", "kph"]),
    ("m/s", Dimension::Speed, &["m/s", "mps", "meters_per_second"]),
    ("mph", Dimension::Speed, &["mph", "miles_per_hour"]),
];

/// Alias lookup table.
#[derive(Debug, Clone)]
pub struct UnitTable {
    aliases: BTreeMap<String, UnitClass>,
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl UnitTable {
    /// The built-in equivalence table.
    pub fn builtin() -> Self {
        let mut aliases = BTreeMap::new();
        for (canonical, dimension, names) in BUILTIN {
            let class = UnitClass {
                canonical: canonical.to_string(),
                dimension: *dimension,
            };
            for name in *names {
                aliases.insert(name.to_string(), class.clone());
            }
        }
        Self { aliases }
    }

    /// Built-in table plus configured aliases. A configured alias pointing at a
    /// built-in canonical name inherits its dimension.
    pub fn with_config(config: &UnitsConfig) -> Self {
        let mut table = Self::builtin();
        for (alias, canonical) in &config.aliases {
            let canonical = canonical.trim().to_lowercase();
            let dimension = table
                .aliases
                .get(&canonical)
                .map(|c| c.dimension)
                .unwrap_or(Dimension::Other);
            table.aliases.insert(
                alias.trim().to_lowercase(),
                UnitClass {
                    canonical,
                    dimension,
                },
            );
        }
        table
    }

    /// Normalize a unit string. Empty, `-`, `none` and unknown units yield `None`.
    pub fn normalize(&self, unit: &str) -> Option<UnitClass> {
        let key = unit.trim().to_lowercase();
        if key.is_empty() || key == "-" || key == "none" {
            return None;
        }
        self.aliases.get(&key).cloned()
    }

    /// Decide whether a value in `source` units needs converting to `target`.
    pub fn conversion(&self, source: Option<&str>, target: Option<&str>) -> ConversionDecision {
        let from = source.and_then(|s| self.normalize(s));
        let to = target.and_then(|t| self.normalize(t));
        match (from, to) {
            (Some(from), Some(to)) if from == to => ConversionDecision::NotNeeded,
            (Some(from), Some(to)) => ConversionDecision::ManualRequired {
                from: from.canonical,
                to: to.canonical,
            },
            _ => ConversionDecision::Unknown,
        }
    }
}

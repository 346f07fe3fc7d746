//! Path reconciliation between the documentation and structural catalogs.
//!
//! The two catalogs note the same location differently: `a.items[].b`,
//! `a.items.b` and `items.b` can all mean one field. [`KnownPaths::reconcile`]
//! tries a fixed list of strategies in order and returns the first hit.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Marker used for array containers in paths.
pub const ARRAY_MARKER: &str = "[]";

/// Matching strategy, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Exact,
    TrimArraySuffix,
    CollapseArrayItem,
    Prefix,
    Normalized,
    ParentFallback,
    DropFirstSegment,
}

impl Strategy {
    pub const ALL: [Strategy; 7] = [
        Strategy::Exact,
        Strategy::TrimArraySuffix,
        Strategy::CollapseArrayItem,
        Strategy::Prefix,
        Strategy::Normalized,
        Strategy::ParentFallback,
        Strategy::DropFirstSegment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Exact => "exact",
            Strategy::TrimArraySuffix => "trim_array_suffix",
            Strategy::CollapseArrayItem => "collapse_array_item",
            Strategy::Prefix => "prefix",
            Strategy::Normalized => "normalized",
            Strategy::ParentFallback => "parent_fallback",
            Strategy::DropFirstSegment => "drop_first_segment",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: String,
    pub strategy: Strategy,
}

/// Ordered set of paths known to the structural catalog.
#[derive(Debug, Clone, Default)]
pub struct KnownPaths {
    ordered: Vec<String>,
    index: HashSet<String>,
}

impl KnownPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path, keeping first-seen order. Duplicates are ignored.
    pub fn insert(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !path.is_empty() && self.index.insert(path.clone()) {
            self.ordered.push(path);
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains(path)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }

    /// Resolve `candidate` to a known path, or `None` when every strategy fails.
    pub fn reconcile(&self, candidate: &str) -> Option<Resolution> {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return None;
        }
        Strategy::ALL.into_iter().find_map(|strategy| {
            self.apply(strategy, candidate).map(|path| Resolution {
                path: path.to_string(),
                strategy,
            })
        })
    }

    fn apply<'a>(&'a self, strategy: Strategy, candidate: &str) -> Option<&'a str> {
        match strategy {
            Strategy::Exact => self.lookup(candidate),
            Strategy::TrimArraySuffix => candidate
                .strip_suffix(ARRAY_MARKER)
                .and_then(|trimmed| self.lookup(trimmed)),
            Strategy::CollapseArrayItem => {
                let collapsed = candidate.replace("[].", ".");
                (collapsed != candidate)
                    .then(|| self.lookup(&collapsed))
                    .flatten()
            }
            Strategy::Prefix => {
                let stem = trim_array_suffix(candidate);
                let child_prefix = format!("{}.", stem);
                self.iter()
                    .find(|known| *known == stem || known.starts_with(&child_prefix))
            }
            Strategy::Normalized => {
                let normalized = strip_array_markers(candidate);
                self.iter()
                    .find(|known| strip_array_markers(known) == normalized)
            }
            Strategy::ParentFallback => candidate
                .split_once(ARRAY_MARKER)
                .and_then(|(parent, _)| self.lookup(parent)),
            Strategy::DropFirstSegment => candidate
                .split_once('.')
                .and_then(|(_, rest)| self.lookup(trim_array_suffix(rest))),
        }
    }

    fn lookup(&self, path: &str) -> Option<&str> {
        self.index.get(path).map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for KnownPaths {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut known = KnownPaths::new();
        for path in iter {
            known.insert(path);
        }
        known
    }
}

/// Remove one trailing array marker.
pub fn trim_array_suffix(path: &str) -> &str {
    path.strip_suffix(ARRAY_MARKER).unwrap_or(path)
}

/// Remove every array marker.
pub fn strip_array_markers(path: &str) -> String {
    path.replace(ARRAY_MARKER, "")
}

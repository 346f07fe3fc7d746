//! Diff subcommand for mapping-compiler
//!
//! Compares two mapping documents entry by entry. Typical use is checking that
//! a recompile of unchanged catalogs is a no-op.

use clap::{Args, ValueEnum};
use std::path::PathBuf;

/// Arguments for the diff subcommand
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Baseline mapping document (YAML or JSON)
    #[arg(value_name = "BASELINE")]
    pub source: PathBuf,

    /// Mapping document compared against the baseline
    #[arg(value_name = "CANDIDATE")]
    pub target: PathBuf,

    /// How to print added, removed and modified mappings
    #[arg(short, long, value_enum, default_value_t = DiffFormat::Text)]
    pub format: DiffFormat,

    /// Exit with status 1 when any mapping or header value changed
    #[arg(long)]
    pub exit_code: bool,
}

/// Rendering of a document diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DiffFormat {
    /// Per-mapping listing with changed keys
    #[default]
    Text,
    /// The full diff as pretty JSON
    Json,
    /// Added/removed/modified counts only
    Summary,
}

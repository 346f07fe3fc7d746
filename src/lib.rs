//! Field Mapping Compiler Library
//!
//! Compiles a catalog of telemetry field definitions into an ordered mapping
//! configuration: catalog merge and path reconciliation, mapping
//! classification, dependency ordering, payload construction, and emission.

pub mod catalog;
pub mod classify;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod export;
pub mod format;
pub mod graph;
pub mod logging;
pub mod payload;
pub mod reconcile;
pub mod types;
pub mod units;

pub use compiler::{CompileReport, Compiler};
pub use config::Config;
pub use export::ConfigDocument;

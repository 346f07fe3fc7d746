//! CLI command definitions for mapping-compiler
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod compile;
pub mod diff;

use clap::{Args, Parser, Subcommand};
use compile::CompileArgs;
use diff::DiffArgs;
use std::path::PathBuf;

/// Field mapping compiler
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile field catalogs into a mapping document
    Compile(CompileArgs),

    /// Check a mapping document for structural problems
    Validate(ValidateArgs),

    /// Compare two mapping documents
    Diff(DiffArgs),
}

/// Arguments for the validate subcommand
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Mapping document (YAML or JSON)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_compile_command() {
        let cli = Cli::try_parse_from([
            "mapping-compiler",
            "-v",
            "--log",
            "off",
            "compile",
            "--docs",
            "fields.csv",
            "--format",
            "json",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.log, "off");
        let Command::Compile(args) = cli.command else {
            panic!("expected compile");
        };
        assert_eq!(args.docs, PathBuf::from("fields.csv"));
        assert!(args.examples.is_none());
    }

    #[test]
    fn test_parse_validate_with_global_config() {
        let cli = Cli::try_parse_from([
            "mapping-compiler",
            "validate",
            "out.yaml",
            "--config",
            "custom.yaml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.yaml")));
        assert_eq!(cli.log, "2");
        assert!(matches!(cli.command, Command::Validate(ref a) if a.file == PathBuf::from("out.yaml")));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["mapping-compiler"]).is_err());
    }
}

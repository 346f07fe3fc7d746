//! Field Mapping Compiler
//!
//! Compiles telemetry field catalogs into an ordered mapping configuration.

use anyhow::{Context, Result};
use clap::Parser;
use mapping_compiler::cli::compile::CompileArgs;
use mapping_compiler::cli::diff::{DiffArgs, DiffFormat};
use mapping_compiler::cli::{Cli, Command, ValidateArgs};
use mapping_compiler::compiler::Compiler;
use mapping_compiler::config::ConfigLoader;
use mapping_compiler::export::{ConfigDocument, DocumentWriter, diff_documents, validate};
use mapping_compiler::format::format_report;
use mapping_compiler::logging;
use std::io::Write;
use std::process::ExitCode;
use tracing::{debug, info};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(&cli.log, cli.verbose)?;

    match &cli.command {
        Command::Compile(args) => run_compile(&cli, args),
        Command::Validate(args) => run_validate(args),
        Command::Diff(args) => run_diff(args),
    }
}

fn run_compile(cli: &Cli, args: &CompileArgs) -> Result<ExitCode> {
    let mut loader = ConfigLoader::load(cli.config.as_deref())?;
    for (tier, path) in loader.sources() {
        debug!(tier = %tier, path = %path.display(), "Config tier loaded");
    }
    args.apply_overrides(loader.config_mut());
    let config = loader.into_config();

    let writer = DocumentWriter::new(config.output.format, config.output.annotate);
    let compiler = Compiler::new(config);
    let report = compiler
        .compile_files(&args.docs, args.examples.as_deref())
        .context("Failed to load catalog")?;

    match &args.output {
        Some(target) => {
            let path = writer
                .write(&report.document, &report.provenance, target)
                .context("Failed to write mapping document")?;
            info!("Mapping document written to {}", path.display());
        }
        None => {
            let rendered = writer.render(&report.document, &report.provenance)?;
            std::io::stdout()
                .write_all(rendered.as_bytes())
                .context("Failed to write mapping document to stdout")?;
        }
    }

    eprint!("{}", format_report(&report, args.report));
    Ok(ExitCode::SUCCESS)
}

fn run_validate(args: &ValidateArgs) -> Result<ExitCode> {
    let document = ConfigDocument::from_file(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let report = validate(&document);
    print!("{}", report);
    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_diff(args: &DiffArgs) -> Result<ExitCode> {
    let source = ConfigDocument::from_file(&args.source)
        .with_context(|| format!("Failed to read {}", args.source.display()))?;
    let target = ConfigDocument::from_file(&args.target)
        .with_context(|| format!("Failed to read {}", args.target.display()))?;

    let mut diff = diff_documents(&source, &target);
    diff.source_label = args.source.display().to_string();
    diff.target_label = args.target.display().to_string();

    match args.format {
        DiffFormat::Text => print!("{}", diff),
        DiffFormat::Json => println!("{}", serde_json::to_string_pretty(&diff)?),
        DiffFormat::Summary => {
            println!("Diff: {} -> {}", diff.source_label, diff.target_label);
            if diff.is_empty() {
                println!("No differences found.");
            } else {
                println!(
                    "  mappings: +{} -{} ~{}{}",
                    diff.added.len(),
                    diff.removed.len(),
                    diff.modified.len(),
                    if diff.order_changed { " (reordered)" } else { "" }
                );
                println!("Total: {} changes", diff.total_changes());
            }
        }
    }

    Ok(if args.exit_code && !diff.is_empty() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

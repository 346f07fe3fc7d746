//! Compile subcommand for mapping-compiler
//!
//! Reads the documentation catalog (and optionally the structural-example
//! catalog) and writes one mapping document.

use crate::config::Config;
use crate::export::DocumentFormat;
use crate::format::ReportFormat;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the compile subcommand
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Documentation catalog file, or a directory holding catalog exports
    #[arg(long, value_name = "PATH")]
    pub docs: PathBuf,

    /// Structural-example catalog file or directory
    #[arg(long, value_name = "PATH")]
    pub examples: Option<PathBuf>,

    /// Output file or directory (default: stdout)
    ///
    /// A directory gets a `{provider}-mapping-{date}` file name.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Document format: yaml or json (overrides config)
    #[arg(short, long, value_name = "FORMAT", value_parser = parse_document_format)]
    pub format: Option<DocumentFormat>,

    /// Provider identifier written into the document (overrides config)
    #[arg(long, value_name = "ID")]
    pub provider: Option<String>,

    /// Omit provenance comments from YAML output
    #[arg(long)]
    pub no_annotations: bool,

    /// Run summary format: text (default), json, or markdown
    #[arg(long, default_value = "text", value_name = "FORMAT", value_parser = parse_report_format)]
    pub report: ReportFormat,
}

fn parse_document_format(s: &str) -> Result<DocumentFormat, String> {
    DocumentFormat::from_str(s)
        .ok_or_else(|| format!("Invalid format '{}'. Valid options: yaml, json", s))
}

fn parse_report_format(s: &str) -> Result<ReportFormat, String> {
    ReportFormat::from_str(s).ok_or_else(|| {
        format!(
            "Invalid report format '{}'. Valid options: text, json, markdown",
            s
        )
    })
}

impl CompileArgs {
    /// Apply command-line overrides, the last configuration tier.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(provider) = self.provider.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            config.output.provider = provider.to_string();
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.no_annotations {
            config.output.annotate = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CompileArgs {
        CompileArgs {
            docs: PathBuf::from("fields.csv"),
            examples: None,
            output: None,
            format: None,
            provider: None,
            no_annotations: false,
            report: ReportFormat::Text,
        }
    }

    #[test]
    fn test_format_parsers() {
        assert_eq!(parse_document_format("JSON"), Ok(DocumentFormat::Json));
        assert!(parse_document_format("toml").is_err());
        assert_eq!(parse_report_format("markdown"), Ok(ReportFormat::Markdown));
        assert!(parse_report_format("html").is_err());
    }

    #[test]
    fn test_no_overrides_keep_config() {
        let mut config = Config::default();
        args().apply_overrides(&mut config);
        assert_eq!(config.output.provider, "navixy");
        assert_eq!(config.output.format, DocumentFormat::Yaml);
        assert!(config.output.annotate);
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        let args = CompileArgs {
            format: Some(DocumentFormat::Json),
            provider: Some("teltonika".into()),
            no_annotations: true,
            ..args()
        };
        args.apply_overrides(&mut config);
        assert_eq!(config.output.provider, "teltonika");
        assert_eq!(config.output.format, DocumentFormat::Json);
        assert!(!config.output.annotate);
    }
}

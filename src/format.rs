//! End-of-run report formatting for text, JSON and markdown.

use crate::compiler::CompileReport;
use crate::error::{Diagnostic, DiagnosticCode};
use serde_json::json;
use std::collections::BTreeMap;

/// Output format for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

/// Render a run summary.
pub fn format_report(report: &CompileReport, format: ReportFormat) -> String {
    match format {
        ReportFormat::Text => format_report_text(report),
        ReportFormat::Json => format_report_json(report),
        ReportFormat::Markdown => format_report_markdown(report),
    }
}

fn counts_by_code(diagnostics: &[Diagnostic]) -> BTreeMap<DiagnosticCode, usize> {
    let mut counts = BTreeMap::new();
    for diagnostic in diagnostics {
        *counts.entry(diagnostic.code).or_insert(0) += 1;
    }
    counts
}

pub fn format_report_text(report: &CompileReport) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    out.push_str(&format!(
        "Compiled {} of {} fields ({} skipped, {} filtered by status)\n",
        stats.emitted, stats.catalog_fields, stats.skipped, stats.filtered_out
    ));
    for (mapping_type, count) in &stats.by_type {
        out.push_str(&format!("  {:<12} {}\n", mapping_type, count));
    }
    out.push_str(&format!("  max dependency depth: {}\n", stats.max_depth));

    if report.diagnostics.is_empty() {
        out.push_str("No diagnostics.\n");
        return out;
    }

    out.push_str(&format!("\nDiagnostics ({}):\n", report.diagnostics.len()));
    for diagnostic in &report.diagnostics {
        out.push_str(&format!("  {}\n", diagnostic));
    }
    out
}

pub fn format_report_json(report: &CompileReport) -> String {
    let counts: BTreeMap<String, usize> = counts_by_code(&report.diagnostics)
        .into_iter()
        .map(|(code, n)| (code.as_str().to_string(), n))
        .collect();
    let value = json!({
        "stats": report.stats,
        "skipped": report.skipped,
        "diagnostic_counts": counts,
        "diagnostics": report.diagnostics,
    });
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

pub fn format_report_markdown(report: &CompileReport) -> String {
    let stats = &report.stats;
    let mut md = String::new();

    md.push_str("# Compile Report\n\n");
    md.push_str(&format!("- **fields in catalog**: {}\n", stats.catalog_fields));
    md.push_str(&format!("- **emitted**: {}\n", stats.emitted));
    md.push_str(&format!("- **skipped**: {}\n", stats.skipped));
    md.push_str(&format!("- **filtered by status**: {}\n", stats.filtered_out));
    md.push_str(&format!("- **max dependency depth**: {}\n", stats.max_depth));

    if !stats.by_type.is_empty() {
        md.push_str("\n## Mapping Types\n\n| Type | Count |\n|---|---|\n");
        for (mapping_type, count) in &stats.by_type {
            md.push_str(&format!("| {} | {} |\n", mapping_type, count));
        }
    }

    if !report.diagnostics.is_empty() {
        md.push_str(&format!("\n## Diagnostics ({})\n\n", report.diagnostics.len()));
        for diagnostic in &report.diagnostics {
            match &diagnostic.field {
                Some(field) => md.push_str(&format!(
                    "- `{}` **{}**: {}\n",
                    diagnostic.code, field, diagnostic.message
                )),
                None => md.push_str(&format!("- `{}` {}\n", diagnostic.code, diagnostic.message)),
            }
        }
    }

    md
}

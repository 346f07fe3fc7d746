//! Compile run orchestration.
//!
//! A run loads both catalogs, reconciles them into one [`FieldCatalog`], then
//! classifies, compiles, and orders every in-scope field. Field-scoped problems
//! end up in [`CompileReport::diagnostics`]; only catalog loading can fail a run.

use crate::catalog::{FieldCatalog, load_catalog};
use crate::classify::classify;
use crate::config::Config;
use crate::error::{CatalogError, Diagnostic};
use crate::export::ConfigDocument;
use crate::graph::{DependencyGraph, GraphNode};
use crate::payload::{CompiledEntry, PayloadCompiler, Provenance};
use crate::types::{FieldRecord, MappingType};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Counts for the end-of-run summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileStats {
    /// Records in the merged catalog.
    pub catalog_fields: usize,
    /// Records left out by the status filter.
    pub filtered_out: usize,
    pub emitted: usize,
    pub skipped: usize,
    /// Emitted entries per mapping type.
    pub by_type: BTreeMap<String, usize>,
    /// Deepest calculated dependency chain.
    pub max_depth: usize,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub document: ConfigDocument,
    /// Annotation data per emitted field, in document order.
    pub provenance: IndexMap<String, Provenance>,
    pub diagnostics: Vec<Diagnostic>,
    /// Fields that were in scope but produced no entry.
    pub skipped: Vec<String>,
    pub stats: CompileStats,
}

impl CompileReport {
    pub fn has_diagnostics(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// The field mapping compiler.
pub struct Compiler {
    config: Config,
}

impl Compiler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load the catalogs from disk and run.
    ///
    /// `documentation` may be a file or a directory (the most recent catalog in
    /// it is used). Without `structural` no path reconciliation takes place.
    pub fn compile_files(
        &self,
        documentation: &Path,
        structural: Option<&Path>,
    ) -> Result<CompileReport, CatalogError> {
        let documentation = load_catalog(documentation)?;
        let structural = match structural {
            Some(path) => load_catalog(path)?,
            None => Vec::new(),
        };
        Ok(self.run(documentation, structural))
    }

    /// Merge the catalogs and compile.
    pub fn run(&self, documentation: Vec<FieldRecord>, structural: Vec<FieldRecord>) -> CompileReport {
        let catalog = if structural.is_empty() {
            FieldCatalog::from_records(documentation)
        } else {
            FieldCatalog::from_sources(documentation, structural)
        };
        self.compile_catalog(&catalog)
    }

    /// Compile an already merged catalog.
    pub fn compile_catalog(&self, catalog: &FieldCatalog) -> CompileReport {
        let mut diagnostics: Vec<Diagnostic> = catalog.diagnostics().to_vec();
        let mut stats = CompileStats {
            catalog_fields: catalog.len(),
            ..Default::default()
        };
        let payloads = PayloadCompiler::new(&self.config);

        let mut compiled: Vec<CompiledEntry> = Vec::new();
        let mut skipped: Vec<String> = Vec::new();
        for record in catalog.iter() {
            if !self.config.catalog.includes(record.status) {
                debug!(field = %record.name, status = record.status.as_str(), "Field filtered by status");
                stats.filtered_out += 1;
                continue;
            }

            let classification = match classify(record, &self.config.formula) {
                Ok(classification) => classification,
                Err(diagnostic) => {
                    warn!(field = %record.name, code = %diagnostic.code, "Field skipped");
                    diagnostics.push(diagnostic);
                    skipped.push(record.name.clone());
                    continue;
                }
            };

            match payloads.compile(record, classification, &mut diagnostics) {
                Some(entry) => compiled.push(entry),
                None => {
                    warn!(field = %record.name, "Field skipped, payload incomplete");
                    skipped.push(record.name.clone());
                }
            }
        }

        for entry in &compiled {
            for dependency in entry.entry.dependency_names() {
                if !catalog.contains(dependency) {
                    diagnostics.push(Diagnostic::unknown_dependency(&entry.name, dependency));
                }
            }
        }

        let nodes: Vec<GraphNode<'_>> = compiled
            .iter()
            .map(|entry| GraphNode {
                name: &entry.name,
                mapping_type: entry.entry.mapping_type(),
                dependencies: entry.entry.dependency_names(),
            })
            .collect();
        let graph = DependencyGraph::build(&nodes);
        let ordering = graph.order();
        stats.max_depth = graph.depths().into_iter().max().unwrap_or(0);
        diagnostics.extend(ordering.diagnostics);

        let mut slots: Vec<Option<CompiledEntry>> = compiled.into_iter().map(Some).collect();
        let mut document = ConfigDocument::new(
            &self.config.output.format_version,
            &self.config.output.provider,
        );
        let mut provenance = IndexMap::new();
        for index in ordering.order {
            let Some(entry) = slots.get_mut(index).and_then(Option::take) else {
                continue;
            };
            *stats
                .by_type
                .entry(entry.entry.mapping_type().as_str().to_string())
                .or_default() += 1;
            provenance.insert(entry.name.clone(), entry.provenance);
            document.mappings.insert(entry.name, entry.entry);
        }

        stats.emitted = document.mappings.len();
        stats.skipped = skipped.len();
        info!(
            emitted = stats.emitted,
            skipped = stats.skipped,
            filtered = stats.filtered_out,
            diagnostics = diagnostics.len(),
            "Compile finished"
        );

        CompileReport {
            document,
            provenance,
            diagnostics,
            skipped,
            stats,
        }
    }
}

/// Number of emitted entries of a given type.
pub fn count_of(report: &CompileReport, mapping_type: MappingType) -> usize {
    report
        .stats
        .by_type
        .get(mapping_type.as_str())
        .copied()
        .unwrap_or(0)
}

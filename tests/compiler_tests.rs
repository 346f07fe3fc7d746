//! End-to-end compile runs over in-memory catalogs.

use mapping_compiler::compiler::{CompileReport, Compiler};
use mapping_compiler::config::Config;
use mapping_compiler::error::DiagnosticCode;
use mapping_compiler::export::{DocumentFormat, DocumentWriter, validate};
use mapping_compiler::graph::{DependencyGraph, GraphNode};
use mapping_compiler::payload::MappingEntry;
use mapping_compiler::types::{FieldRecord, MappingType};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn provided(name: &str, refs: &[&str]) -> FieldRecord {
    let mut record = FieldRecord::new(name, format!("fields.{}", name));
    record.provider_refs = strings(refs);
    record
}

fn derived(name: &str, deps: &[&str]) -> FieldRecord {
    let mut record = FieldRecord::new(name, format!("fields.{}", name));
    record.computation_description = Some(format!("Use {} to derive the value", deps.join(", ")));
    record.dependency_names = strings(deps);
    record
}

fn formula(name: &str, expression: &str) -> FieldRecord {
    let mut record = FieldRecord::new(name, format!("fields.{}", name));
    record.computation_description = Some(expression.to_string());
    record
}

fn compile(records: Vec<FieldRecord>) -> CompileReport {
    Compiler::new(Config::default()).run(records, Vec::new())
}

fn keys(report: &CompileReport) -> Vec<&str> {
    report.document.mappings.keys().map(String::as_str).collect()
}

fn count(report: &CompileReport, code: DiagnosticCode) -> usize {
    report.diagnostics.iter().filter(|d| d.code == code).count()
}

#[test]
fn test_chain_is_ordered_dependencies_first() {
    let report = compile(vec![
        derived("a", &["b"]),
        derived("b", &["c"]),
        formula("c", "raw_x + raw_y"),
    ]);
    assert_eq!(keys(&report), vec!["c", "b", "a"]);
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    assert_eq!(report.stats.max_depth, 2);
}

#[test]
fn test_cycle_keeps_both_fields_with_one_diagnostic() {
    let report = compile(vec![derived("x", &["y"]), derived("y", &["x"])]);
    assert_eq!(keys(&report), vec!["x", "y"]);
    assert_eq!(count(&report, DiagnosticCode::CircularDependency), 1);
    assert_eq!(count(&report, DiagnosticCode::UnresolvedDependencyOrder), 0);

    let cycle = report
        .diagnostics
        .iter()
        .find(|d| d.code == DiagnosticCode::CircularDependency)
        .unwrap();
    assert_eq!(cycle.related, strings(&["x", "y"]));
}

#[test]
fn test_field_blocked_by_cycle_is_reported_separately() {
    let report = compile(vec![
        derived("x", &["y"]),
        derived("y", &["x"]),
        derived("z", &["x"]),
    ]);
    assert_eq!(keys(&report), vec!["x", "y", "z"]);
    assert_eq!(count(&report, DiagnosticCode::CircularDependency), 1);
    assert_eq!(count(&report, DiagnosticCode::UnresolvedDependencyOrder), 1);
}

#[test]
fn test_missing_computation_emits_nothing() {
    let mut record = FieldRecord::new("mystery", "fields.mystery");
    record.computation_description = Some("   ".into());
    let report = compile(vec![record]);
    assert!(report.document.mappings.is_empty());
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(
        report.diagnostics[0].code,
        DiagnosticCode::MissingComputationApproach
    );
    assert_eq!(report.diagnostics[0].field.as_deref(), Some("mystery"));
}

#[test]
fn test_provider_count_decides_mapping_type() {
    let report = compile(vec![
        provided("one", &["raw_one"]),
        provided("many", &["raw_a", "raw_b", "raw_c"]),
    ]);
    assert_eq!(
        report.document.mappings["one"].mapping_type(),
        MappingType::Direct
    );
    let MappingEntry::Prioritized(prioritized) = &report.document.mappings["many"] else {
        panic!("expected prioritized");
    };
    let priorities: Vec<u32> = prioritized.sources.iter().map(|s| s.priority).collect();
    assert!(priorities.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(priorities, vec![1, 2, 3]);
}

#[test]
fn test_seed_groups_precede_calculated() {
    let mut transformed = FieldRecord::new("address", "location.address");
    transformed.mapping_type = Some(MappingType::Transformed);
    transformed.transformation = Some("reverse_geocode".into());

    let report = compile(vec![
        derived("label", &["lat"]),
        transformed,
        provided("speed", &["gps_speed", "can_speed"]),
        provided("lat", &["lat"]),
    ]);
    assert_eq!(keys(&report), vec!["lat", "speed", "address", "label"]);
}

#[test]
fn test_output_passes_validation() {
    let report = compile(vec![
        derived("a", &["b"]),
        derived("b", &["c"]),
        formula("c", "raw_x * 2"),
        provided("lat", &["lat"]),
        provided("odometer", &["can_mileage", "avl_io_16"]),
    ]);
    let validation = validate(&report.document);
    assert!(validation.is_valid(), "{}", validation);
}

#[test]
fn test_recompiling_is_byte_identical() {
    let records = vec![
        derived("a", &["b"]),
        derived("b", &["c"]),
        formula("c", "raw_x + raw_y"),
        provided("speed", &["can_speed", "gps_speed"]),
        derived("x", &["y"]),
        derived("y", &["x"]),
    ];
    let writer = DocumentWriter::new(DocumentFormat::Yaml, true);

    let first = compile(records.clone());
    let second = compile(records);
    let first_text = writer.render(&first.document, &first.provenance).unwrap();
    let second_text = writer.render(&second.document, &second.provenance).unwrap();
    assert_eq!(first_text, second_text);
    assert_eq!(first.diagnostics, second.diagnostics);
}

#[test]
fn test_depth_of_independent_field_is_zero() {
    let no_deps: Vec<String> = Vec::new();
    let b_deps = strings(&["c"]);
    let nodes = [
        GraphNode {
            name: "c",
            mapping_type: MappingType::Calculated,
            dependencies: &no_deps,
        },
        GraphNode {
            name: "b",
            mapping_type: MappingType::Calculated,
            dependencies: &b_deps,
        },
    ];
    let graph = DependencyGraph::build(&nodes);
    assert_eq!(graph.dependency_depth("c"), Some(0));
    assert_eq!(graph.dependency_depth("b"), Some(1));
    assert_eq!(graph.dependency_depth("missing"), None);
}

#[test]
fn test_unit_mismatch_is_annotated_not_converted() {
    let mut record = provided("speed", &["speed_raw"]);
    record.provider_units = strings(&["km/h"]);
    record.unit = Some("celsius".into());
    let mut same = provided("altitude", &["alt"]);
    same.provider_units = strings(&["m"]);
    same.unit = Some("meters".into());

    let report = compile(vec![record, same]);
    assert_eq!(
        report.provenance["speed"].unit_conversion.as_deref(),
        Some("manual (km/h -> celsius)")
    );
    assert_eq!(report.provenance["altitude"].unit_conversion, None);

    let MappingEntry::Direct(direct) = &report.document.mappings["speed"] else {
        panic!("expected direct");
    };
    assert_eq!(direct.unit_conversion, None);

    let yaml = DocumentWriter::new(DocumentFormat::Yaml, true)
        .render(&report.document, &report.provenance)
        .unwrap();
    assert!(yaml.contains("# Unit Conversion: manual (km/h -> celsius)"));
}

#[test]
fn test_reconciled_path_from_structural_catalog() {
    let documentation = vec![{
        let mut record = FieldRecord::new("status_code", "status.statuses[].code");
        record.provider_refs = strings(&["status"]);
        record
    }];
    let structural = vec![FieldRecord::new("status_code", "status.statuses.code")];
    let report = Compiler::new(Config::default()).run(documentation, structural);

    assert_eq!(report.provenance["status_code"].path, "status.statuses.code");
    assert_eq!(
        report.provenance["status_code"].documented_path.as_deref(),
        Some("status.statuses[].code")
    );
    assert_eq!(count(&report, DiagnosticCode::UnresolvedFieldPath), 0);
}

#[test]
fn test_blank_dependencies_skip_function_reference() {
    let mut record = FieldRecord::new("location_cardinal", "location.cardinal");
    record.computation_description = Some("Use heading to pick a compass direction".into());
    record.dependency_names = strings(&["  "]);

    let report = compile(vec![record]);
    assert!(report.document.mappings.is_empty());
    assert_eq!(report.skipped, strings(&["location_cardinal"]));
    assert_eq!(count(&report, DiagnosticCode::MissingDependencies), 1);
}

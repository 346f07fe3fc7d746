//! Document emission, validation and diff through files, plus config tiers.

use mapping_compiler::compiler::{CompileReport, Compiler};
use mapping_compiler::config::{Config, ConfigLoader, ConfigPaths, ConfigTier};
use mapping_compiler::export::{
    ConfigDocument, DocumentFormat, DocumentWriter, diff_documents, validate,
};
use mapping_compiler::types::FieldRecord;
use std::fs;
use tempfile::TempDir;

fn sample_report(config: Config) -> CompileReport {
    let mut lat = FieldRecord::new("lat", "location.lat");
    lat.provider_refs = vec!["lat".into()];
    lat.unit = Some("degrees".into());

    let mut odometer = FieldRecord::new("odometer", "counters.odometer");
    odometer.provider_refs = vec!["can_mileage".into(), "avl_io_16".into()];
    odometer.computation_description = Some("avl_io_16 > can_mileage".into());

    let mut cardinal = FieldRecord::new("location_cardinal", "location.cardinal");
    cardinal.computation_description =
        Some("Use heading to pick one of eight\ncompass directions".into());
    cardinal.dependency_names = vec!["lat".into()];

    Compiler::new(config).run(vec![cardinal, odometer, lat], Vec::new())
}

#[test]
fn test_yaml_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let report = sample_report(Config::default());
    let path = DocumentWriter::new(DocumentFormat::Yaml, true)
        .write(&report.document, &report.provenance, &dir.path().join("out.yaml"))
        .unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("version: 1.0.0\nprovider: navixy\n\nmappings:\n"));
    assert!(text.contains("    # Field Path: location.cardinal\n"));
    assert!(text.contains("    # Computation Approach: Use heading to pick one of eight\n"));
    assert!(text.contains("    # compass directions\n"));
    assert!(text.contains("path: params.avl_io_16"));

    let loaded = ConfigDocument::from_file(&path).unwrap();
    assert_eq!(loaded, report.document);
    assert!(validate(&loaded).is_valid());
}

#[test]
fn test_json_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let report = sample_report(Config::default());
    let path = DocumentWriter::new(DocumentFormat::Json, true)
        .write(&report.document, &report.provenance, &dir.path().join("out.json"))
        .unwrap();
    let loaded = ConfigDocument::from_file(&path).unwrap();
    assert_eq!(loaded, report.document);
}

#[test]
fn test_recompile_diff_is_empty() {
    let first = sample_report(Config::default());
    let second = sample_report(Config::default());
    let diff = diff_documents(&first.document, &second.document);
    assert!(diff.is_empty(), "{}", diff);
}

#[test]
fn test_provider_change_shows_in_diff() {
    let first = sample_report(Config::default());
    let mut config = Config::default();
    config.output.provider = "teltonika".into();
    let second = sample_report(config);

    let diff = diff_documents(&first.document, &second.document);
    assert_eq!(diff.header.len(), 1);
    assert!(diff.modified.is_empty());
}

#[test]
fn test_config_tiers_merge_and_explicit_wins() {
    let project = TempDir::new().unwrap();
    let user = TempDir::new().unwrap();
    let explicit_dir = TempDir::new().unwrap();

    fs::write(
        project.path().join("config.yaml"),
        "output:\n  provider: project-provider\nformula:\n  max_tokens: 4\n",
    )
    .unwrap();
    fs::write(
        user.path().join("config.yaml"),
        "output:\n  provider: user-provider\n",
    )
    .unwrap();
    let explicit = explicit_dir.path().join("custom.yaml");
    fs::write(&explicit, "output:\n  format: json\n").unwrap();

    let paths = ConfigPaths::with_dirs(
        Some(project.path().to_path_buf()),
        Some(user.path().to_path_buf()),
    );
    let loader = ConfigLoader::load_with_paths(paths, Some(&explicit)).unwrap();
    let config = loader.config();

    assert_eq!(config.output.provider, "user-provider");
    assert_eq!(config.output.format, DocumentFormat::Json);
    assert_eq!(config.formula.max_tokens, 4);
    // Untouched sections keep their defaults.
    assert_eq!(config.error_handling.prioritized, "use_fallback");

    let tiers: Vec<ConfigTier> = loader.sources().iter().map(|(tier, _)| *tier).collect();
    assert_eq!(
        tiers,
        vec![ConfigTier::Project, ConfigTier::User, ConfigTier::Explicit]
    );
}

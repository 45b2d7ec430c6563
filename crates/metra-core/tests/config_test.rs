use std::path::PathBuf;

use metra_core::MetraConfig;
use tempfile::TempDir;

#[test]
fn defaults_are_complete() {
    let config = MetraConfig::default();
    assert_eq!(config.storage.database, PathBuf::from("metra.db"));
    assert_eq!(config.storage.table, "report");
    assert_eq!(config.mapping.spec_path, None);
    assert_eq!(config.report.select_limit, 10_000);
}

#[test]
fn toml_overrides_every_section() {
    let config = MetraConfig::from_toml(
        r#"
        [storage]
        database = "/var/lib/metra/results.db"
        table = "sessions"

        [mapping]
        spec_path = "mapping.json"

        [report]
        select_limit = 500
        "#,
    )
    .unwrap();

    assert_eq!(config.storage.database, PathBuf::from("/var/lib/metra/results.db"));
    assert_eq!(config.storage.table, "sessions");
    assert_eq!(config.mapping.spec_path, Some(PathBuf::from("mapping.json")));
    assert_eq!(config.report.select_limit, 500);
}

#[test]
fn partial_toml_keeps_defaults_elsewhere() {
    let config = MetraConfig::from_toml(
        r#"
        [storage]
        table = "sessions"
        "#,
    )
    .unwrap();

    assert_eq!(config.storage.database, PathBuf::from("metra.db"));
    assert_eq!(config.storage.table, "sessions");
    assert_eq!(config.report.select_limit, 10_000);
}

#[test]
fn validation_rejects_bad_values() {
    assert!(MetraConfig::from_toml("[storage]\ntable = \"\"").is_err());
    assert!(MetraConfig::from_toml("[report]\nselect_limit = 2000000").is_err());
    assert!(MetraConfig::from_toml("this is not toml").is_err());
}

#[test]
fn load_reads_the_project_file_when_present() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("metra.toml"),
        "[storage]\ntable = \"from_file\"\n",
    )
    .unwrap();

    let config = MetraConfig::load(dir.path()).unwrap();
    assert_eq!(config.storage.table, "from_file");
    assert_eq!(config.report.select_limit, 10_000);
}

#[test]
fn load_without_a_project_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let config = MetraConfig::load(dir.path()).unwrap();
    assert_eq!(config.storage.table, "report");
}

//! Integration tests for the realign CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use realign_model::{
    ColumnSpec, Engine, ForeignKeySpec, IndexSpec, MetadataModel, QualifiedName, TableData,
    TableEntity, Value, save_snapshot,
};

/// Get the realign binary
#[allow(deprecated)]
fn realign_cmd() -> Command {
    Command::cargo_bin("realign").unwrap()
}

fn sample_model(engine: Engine) -> MetadataModel {
    let schema = engine.default_schema();
    MetadataModel::new(engine)
        .with_table(
            TableEntity::new(QualifiedName::new(schema, "parent"))
                .with_column(ColumnSpec::new("id", "int").not_null())
                .with_column(ColumnSpec::new("name", "varchar").with_length(50))
                .with_index(IndexSpec::primary_key("pk_parent", &["id"])),
        )
        .with_table(
            TableEntity::new(QualifiedName::new(schema, "child"))
                .with_column(ColumnSpec::new("id", "int").not_null())
                .with_column(ColumnSpec::new("parent_id", "int"))
                .with_index(IndexSpec::primary_key("pk_child", &["id"]))
                .with_foreign_key(ForeignKeySpec::new(
                    "fk_child_parent",
                    QualifiedName::new(schema, "parent"),
                    &[("parent_id", "id")],
                )),
        )
        .with_data(
            TableData::new(QualifiedName::new(schema, "parent"), &["id", "name"])
                .with_row(vec![Value::from(1), Value::from("first")]),
        )
}

fn write_snapshot(dir: &TempDir, engine: Engine) -> PathBuf {
    let path = dir.path().join("snapshot.json");
    save_snapshot(&sample_model(engine), &path).unwrap();
    path
}

#[test]
fn test_help_command() {
    realign_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage: realign <COMMAND>"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("generate"))
        .stdout(predicate::str::contains("order"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_version_command() {
    realign_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_generate_help() {
    realign_cmd()
        .args(["generate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--snapshot"))
        .stdout(predicate::str::contains("--verbose-data"))
        .stdout(predicate::str::contains("--bulk-dir"));
}

#[test]
fn test_invalid_command() {
    realign_cmd()
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_init_writes_config() {
    let temp = TempDir::new().unwrap();

    realign_cmd()
        .args(["init", "--dialect", "postgres", "--yes"])
        .arg(temp.path())
        .assert()
        .success();

    let config = fs::read_to_string(temp.path().join("realign.toml")).unwrap();
    assert!(config.contains("dialect = \"postgres\""));
    assert!(config.contains("rows_per_insert = 500"));
}

#[test]
fn test_generate_to_stdout() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(&temp, Engine::Mssql);

    realign_cmd()
        .current_dir(temp.path())
        .arg("generate")
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("-- realign reconciliation script"))
        .stdout(predicate::str::contains("-- engine: mssql"))
        .stdout(predicate::str::contains("BEGIN TRY"));
}

#[test]
fn test_generate_to_file_for_postgres() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(&temp, Engine::Postgres);
    let script = temp.path().join("out").join("reconcile.sql");

    realign_cmd()
        .current_dir(temp.path())
        .arg("generate")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--output")
        .arg(&script)
        .args(["--no-exec", "--kinds", "all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote"));

    let text = fs::read_to_string(&script).unwrap();
    assert!(text.contains("-- engine: postgres"));
    assert!(text.contains("v_execcode BOOLEAN := FALSE;"));
    assert!(text.contains("DO $realign$"));
}

#[test]
fn test_generate_rejects_dialect_mismatch() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(&temp, Engine::Mssql);

    realign_cmd()
        .current_dir(temp.path())
        .arg("generate")
        .arg("--snapshot")
        .arg(&snapshot)
        .args(["--dialect", "postgres"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("captured from mssql"));
}

#[test]
fn test_retain_before_requires_verbose_data() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(&temp, Engine::Mssql);

    realign_cmd()
        .current_dir(temp.path())
        .arg("generate")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--retain-before")
        .assert()
        .failure();
}

#[test]
fn test_order_lists_parents_first() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(&temp, Engine::Mssql);

    let output = realign_cmd()
        .arg("order")
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).unwrap();

    let parent = text.find("dbo.parent (table)").unwrap();
    let child = text.find("dbo.child (table)").unwrap();
    assert!(parent < child);
}

#[test]
fn test_order_as_json() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(&temp, Engine::Postgres);

    let output = realign_cmd()
        .arg("order")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let listing: Vec<realign_model::EntityListing> = serde_json::from_slice(&output).unwrap();
    let ranks: Vec<(&str, u32)> = listing
        .iter()
        .map(|l| (l.name.as_str(), l.sort_order))
        .collect();
    assert_eq!(ranks, vec![("parent", 1), ("child", 2)]);
}

#[test]
fn test_validate_snapshot() {
    let temp = TempDir::new().unwrap();
    let snapshot = write_snapshot(&temp, Engine::Mssql);

    realign_cmd()
        .arg("validate")
        .arg("--snapshot")
        .arg(&snapshot)
        .assert()
        .success()
        .stdout(predicate::str::contains("Snapshot is valid"));
}

#[test]
fn test_validate_reports_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.json");
    let model = MetadataModel::new(Engine::Mssql).with_table(
        TableEntity::new(QualifiedName::new("dbo", "t"))
            .with_column(ColumnSpec::new("id", "int"))
            .with_index(IndexSpec::primary_key("pk_t", &["missing"])),
    );
    save_snapshot(&model, &path).unwrap();

    realign_cmd()
        .arg("validate")
        .arg("--snapshot")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation errors"));
}

#[test]
fn test_missing_snapshot_fails() {
    realign_cmd()
        .args(["validate", "--snapshot", "does-not-exist.json"])
        .assert()
        .failure();
}

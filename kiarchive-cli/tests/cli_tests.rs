//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Build command for the kiarchive-cli binary (finds it in target/debug when run via cargo test).
fn kiarchive_cli() -> Command {
    cargo_bin_cmd!("kiarchive-cli")
}

/// Path to kiarchive library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("kiarchive")
        .join("tests")
        .join("fixtures")
}

fn copy_tree(src: &Path, dest: &Path, root: &str) {
    fs::create_dir_all(dest).unwrap();
    for entry in fs::read_dir(src).unwrap() {
        let entry = entry.unwrap();
        let target = dest.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_tree(&entry.path(), &target, root);
        } else {
            let text = fs::read_to_string(entry.path()).unwrap();
            fs::write(&target, text.replace("@ROOT@", root)).unwrap();
        }
    }
}

/// Fixture tree staged into a temp dir with `@ROOT@` resolved.
fn stage_fixtures() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    let root = fs::canonicalize(temp.path()).unwrap();
    copy_tree(&fixtures_dir(), &root, &root.to_string_lossy());
    (temp, root)
}

#[test]
fn test_cli_help() {
    let mut cmd = kiarchive_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("KiCAD"));
}

#[test]
fn test_cli_version() {
    let mut cmd = kiarchive_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_archive_project() {
    let (_temp, root) = stage_fixtures();
    let mut cmd = kiarchive_cli();

    cmd.arg("archive")
        .arg(root.join("project"))
        .arg("--kicad-config")
        .arg(root.join("kicad"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Summary"))
        .stdout(predicate::str::contains("1 missing"));

    let schematic = fs::read_to_string(root.join("project").join("demo.sch")).unwrap();
    assert!(schematic.contains("F 2 \"lib_fp:R0805\""));
    assert!(root.join("project").join("3d_models").join("r0805.step").is_file());
    assert!(root.join("project").join("lib_sym").join("demo.lib").is_file());
}

#[test]
fn test_cli_quiet_prints_nothing() {
    let (_temp, root) = stage_fixtures();
    let mut cmd = kiarchive_cli();

    cmd.arg("archive")
        .arg(root.join("project"))
        .arg("--kicad-config")
        .arg(root.join("kicad"))
        .arg("--quiet")
        .env_remove("RUST_LOG");

    cmd.assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Copy all used").not());
}

#[test]
fn test_cli_debug_logs_copies() {
    let (_temp, root) = stage_fixtures();
    let mut cmd = kiarchive_cli();

    cmd.arg("archive")
        .arg(root.join("project"))
        .arg("--kicad-config")
        .arg(root.join("kicad"))
        .arg("--debug")
        .env_remove("RUST_LOG");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Copy "))
        .stderr(predicate::str::contains("not found!"));
}

#[test]
fn test_cli_rust_log_debug_dumps_tables() {
    let (_temp, root) = stage_fixtures();
    let mut cmd = kiarchive_cli();

    cmd.arg("scan")
        .arg(root.join("project"))
        .arg("--kicad-config")
        .arg(root.join("kicad"))
        .env("RUST_LOG", "debug");

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("FP_LIBS "))
        .stderr(predicate::str::contains("KIPRJMOD "))
        .stderr(predicate::str::contains("lib_fp "))
        .stderr(predicate::str::contains("R0805.kicad_mod"));
}

#[test]
fn test_cli_json_output() {
    let (_temp, root) = stage_fixtures();
    let mut cmd = kiarchive_cli();

    cmd.arg("archive")
        .arg(root.join("project"))
        .arg("--kicad-config")
        .arg(root.join("kicad"))
        .arg("--format")
        .arg("json");

    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["footprints"], 2);
    assert_eq!(json["summary"]["warnings"], 1);
    assert_eq!(json["report"]["dry_run"], false);
}

#[test]
fn test_cli_scan_changes_nothing() {
    let (_temp, root) = stage_fixtures();
    let before = fs::read_to_string(root.join("project").join("demo.sch")).unwrap();
    let mut cmd = kiarchive_cli();

    cmd.arg("scan")
        .arg(root.join("project"))
        .arg("--kicad-config")
        .arg(root.join("kicad"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("R0805.kicad_mod"))
        .stdout(predicate::str::contains("demo-cache.lib"));

    let after = fs::read_to_string(root.join("project").join("demo.sch")).unwrap();
    assert_eq!(before, after);
    assert!(!root.join("project").join("lib_fp.pretty").exists());
}

#[test]
fn test_cli_missing_symbol_cache_exits_1() {
    let (_temp, root) = stage_fixtures();
    fs::remove_file(root.join("project").join("demo-cache.lib")).unwrap();
    let mut cmd = kiarchive_cli();

    cmd.arg("archive")
        .arg(root.join("project"))
        .arg("--kicad-config")
        .arg(root.join("kicad"));

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Symbols cache not found"));
}

#[test]
fn test_cli_nonexistent_project() {
    let mut cmd = kiarchive_cli();

    cmd.arg("archive").arg("does_not_exist_project");

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_cli_missing_config_exits_1() {
    let (_temp, root) = stage_fixtures();
    let empty = TempDir::new().unwrap();
    let mut cmd = kiarchive_cli();

    cmd.arg("archive")
        .arg(root.join("project"))
        .arg("--kicad-config")
        .arg(empty.path());

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("kicad_common"));
    assert!(!root.join("project").join("fp-lib-table").exists());
}

#[test]
fn test_cli_usage_error_exits_1() {
    let mut cmd = kiarchive_cli();

    cmd.arg("archive");

    cmd.assert().code(1);
}

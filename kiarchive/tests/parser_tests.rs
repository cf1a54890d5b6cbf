//! Tests for reading KiCad configuration, library tables and references

use kiarchive::parser::{extract_footprints, extract_models};
use kiarchive::prelude::*;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn fixture_env() -> EnvironmentVariables {
    EnvironmentVariables::load(&fixture_path("kicad/kicad_common")).expect("Should load kicad_common")
}

#[test]
fn test_load_kicad_common() {
    let env = fixture_env();

    assert_eq!(env.len(), 2);
    assert_eq!(env.get("FP_LIBS"), Some("@ROOT@/libs/footprints"));
    assert_eq!(env.get("Editor"), None, "Keys before the section are not variables");
}

#[test]
fn test_read_fp_lib_table() {
    let table = LibraryTable::read(&fixture_path("kicad/fp-lib-table"), &fixture_env())
        .expect("Should read fp-lib-table");

    assert_eq!(table.len(), 2);
    assert_eq!(table.get("mylib"), Some("@ROOT@/libs/footprints/mylib.pretty"));
    assert_eq!(
        table.get("Capacitor_SMD"),
        Some("@ROOT@/libs/footprints/Capacitor_SMD.pretty")
    );
}

#[test]
fn test_extract_footprints_from_fixture() {
    let table = LibraryTable::read(&fixture_path("kicad/fp-lib-table"), &fixture_env()).unwrap();

    let demo = extract_footprints(&fixture_path("project/demo.sch"), &table).unwrap();
    assert_eq!(
        demo,
        vec![PathBuf::from("@ROOT@/libs/footprints/mylib.pretty/R0805.kicad_mod")]
    );

    let power = extract_footprints(&fixture_path("project/sheets/power.sch"), &table).unwrap();
    assert_eq!(
        power,
        vec![PathBuf::from("@ROOT@/libs/footprints/Capacitor_SMD.pretty/C_0603.kicad_mod")]
    );
}

#[test]
fn test_extract_models_from_fixture() {
    let env = fixture_env();

    let r0805 = extract_models(
        &fixture_path("libs/footprints/mylib.pretty/R0805.kicad_mod"),
        &env,
    )
    .unwrap();
    assert_eq!(r0805, vec![PathBuf::from("@ROOT@/libs/3d/r0805.step")]);

    let c0603 = extract_models(
        &fixture_path("libs/footprints/Capacitor_SMD.pretty/C_0603.kicad_mod"),
        &env,
    )
    .unwrap();
    assert_eq!(
        c0603,
        vec![PathBuf::from("@ROOT@/libs/3d/Capacitor_SMD.3dshapes/C_0603.wrl")]
    );
}

#[test]
fn test_extract_footprints_nonexistent_schematic() {
    let result = extract_footprints(&PathBuf::from("not_a_real_file.sch"), &LibraryTable::new());
    assert!(matches!(result, Err(ArchiveError::MissingResource(_))));
}

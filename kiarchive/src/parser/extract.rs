//! Reference extraction from schematics and footprints.

use std::path::{Path, PathBuf};

use crate::core::{read_text, ArchiveError};
use crate::env::EnvironmentVariables;
use crate::parser::kicad_legacy::{FootprintField, ModelField};
use crate::parser::lib_table::LibraryTable;

/// File extension of a single footprint inside a `.pretty` library.
pub const FOOTPRINT_EXTENSION: &str = "kicad_mod";

/// Footprint files assigned in a schematic, in order of appearance.
pub fn extract_footprints(
    schematic: &Path,
    libs: &LibraryTable,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let content = read_text(schematic)?;
    footprints_in(&content, schematic, libs)
}

/// Resolve every `F 2 "LIB:FP"` field of schematic text through `libs`.
///
/// An unknown nickname means the library table and the schematic disagree,
/// which is fatal.
pub fn footprints_in(
    content: &str,
    schematic: &Path,
    libs: &LibraryTable,
) -> Result<Vec<PathBuf>, ArchiveError> {
    content
        .lines()
        .filter_map(FootprintField::parse_schematic)
        .map(|field| {
            libs.footprint_path(field.library, field.footprint)
                .ok_or_else(|| ArchiveError::UnknownLibrary {
                    nickname: field.library.to_string(),
                    schematic: schematic.to_path_buf(),
                })
        })
        .collect()
}

/// 3D model files referenced by a footprint, placeholders expanded.
pub fn extract_models(
    footprint: &Path,
    env: &EnvironmentVariables,
) -> Result<Vec<PathBuf>, ArchiveError> {
    let content = read_text(footprint)?;
    Ok(models_in(&content, env))
}

pub fn models_in(content: &str, env: &EnvironmentVariables) -> Vec<PathBuf> {
    content
        .lines()
        .filter_map(ModelField::parse)
        .map(|model| {
            let path = env.expand(model.path());
            if EnvironmentVariables::has_placeholder(&path) {
                tracing::warn!("Unresolved variable in 3D model path: {}", path);
            }
            PathBuf::from(path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMATIC: &str = r#"EESchema Schematic File Version 4
$Comp
L Device:R R1
U 1 1 5F6A1B2C
P 3000 2000
F 0 "R1" H 3070 2046 50  0000 L CNN
F 1 "10k" H 3070 1955 50  0000 L CNN
F 2 "mylib:R0805" V 2930 2000 50  0001 C CNN
F 3 "~" H 3000 2000 50  0001 C CNN
$EndComp
$Comp
L Device:R R2
F 2 "mylib:R0805" V 2930 2000 50  0001 C CNN
$EndComp
$Comp
L power:GND #PWR01
F 2 "" H 4000 2800 50  0001 C CNN
$EndComp
"#;

    fn libs() -> LibraryTable {
        let mut libs = LibraryTable::new();
        libs.insert("mylib", "/libs/fp");
        libs
    }

    #[test]
    fn test_footprints_in_order_with_duplicates() {
        let refs = footprints_in(SCHEMATIC, Path::new("demo.sch"), &libs()).unwrap();
        assert_eq!(
            refs,
            vec![
                PathBuf::from("/libs/fp/R0805.kicad_mod"),
                PathBuf::from("/libs/fp/R0805.kicad_mod"),
            ]
        );
    }

    #[test]
    fn test_unknown_library_is_error() {
        let content = "F 2 \"other:C0603\" H 0 0 50  0001 C CNN\n";
        let err = footprints_in(content, Path::new("demo.sch"), &libs()).unwrap_err();
        match err {
            ArchiveError::UnknownLibrary { nickname, schematic } => {
                assert_eq!(nickname, "other");
                assert_eq!(schematic, PathBuf::from("demo.sch"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_models_in_expands_variables() {
        let mut env = EnvironmentVariables::new();
        env.insert("KISYS3DMOD", "/usr/share/kicad/3d");
        let content = "(module R0805 (layer F.Cu)\n  (model ${KISYS3DMOD}/R.3dshapes/R_0805.wrl\n    (at (xyz 0 0 0))\n  )\n  (model /libs/3d/r0805.step)\n)\n";
        assert_eq!(
            models_in(content, &env),
            vec![
                PathBuf::from("/usr/share/kicad/3d/R.3dshapes/R_0805.wrl"),
                PathBuf::from("/libs/3d/r0805.step"),
            ]
        );
    }

    #[test]
    fn test_models_in_without_models() {
        let env = EnvironmentVariables::new();
        assert!(models_in("(module X (layer F.Cu)\n)\n", &env).is_empty());
    }

    #[test]
    fn test_extract_models_missing_footprint() {
        let env = EnvironmentVariables::new();
        let result = extract_models(Path::new("/nonexistent/X.kicad_mod"), &env);
        assert!(matches!(result, Err(ArchiveError::MissingResource(_))));
    }
}

//! Footprint library table (`fp-lib-table`) reader.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::ArchiveError;
use crate::env::EnvironmentVariables;
use crate::parser::extract::FOOTPRINT_EXTENSION;
use crate::parser::kicad_legacy::LibTableEntry;

/// Library nickname to resolved directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LibraryTable {
    libs: BTreeMap<String, String>,
}

impl LibraryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a library table file, expanding `${VAR}` in every URI.
    pub fn read(path: &Path, env: &EnvironmentVariables) -> Result<Self, ArchiveError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArchiveError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content, env))
    }

    /// Parse table text. Lines that are not `(lib ...)` rows are ignored.
    pub fn parse(content: &str, env: &EnvironmentVariables) -> Self {
        let mut table = Self::new();
        for line in content.lines() {
            if let Some(entry) = LibTableEntry::parse(line) {
                let location = env.expand(entry.uri);
                if EnvironmentVariables::has_placeholder(&location) {
                    tracing::warn!(
                        "Library '{}' has an unresolved path: {}",
                        entry.name,
                        location
                    );
                }
                table.insert(entry.name, location);
            }
        }
        table
    }

    /// Add or replace a library. The last definition of a nickname wins.
    pub fn insert(&mut self, nickname: impl Into<String>, location: impl Into<String>) {
        let nickname = nickname.into();
        let location = location.into();
        if let Some(previous) = self.libs.get(&nickname) {
            if *previous != location {
                tracing::warn!(
                    "Library '{}' defined twice, using {} instead of {}",
                    nickname,
                    location,
                    previous
                );
            }
        }
        self.libs.insert(nickname, location);
    }

    pub fn get(&self, nickname: &str) -> Option<&str> {
        self.libs.get(nickname).map(String::as_str)
    }

    /// `<library dir>/<footprint>.kicad_mod`, if the nickname is known.
    pub fn footprint_path(&self, nickname: &str, footprint: &str) -> Option<PathBuf> {
        self.get(nickname)
            .map(|dir| PathBuf::from(format!("{}/{}.{}", dir, footprint, FOOTPRINT_EXTENSION)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.libs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.libs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FP_LIB_TABLE: &str = r#"(fp_lib_table
  (lib (name Resistor_SMD)(type KiCad)(uri ${KISYSMOD}/Resistor_SMD.pretty)(options "")(descr "Resistor SMD"))
  (lib (name mylib)(type KiCad)(uri /home/me/libs/mylib.pretty)(options "")(descr ""))
)
"#;

    fn env() -> EnvironmentVariables {
        let mut env = EnvironmentVariables::new();
        env.insert("KISYSMOD", "/usr/share/kicad/modules");
        env
    }

    #[test]
    fn test_parse_expands_uris() {
        let table = LibraryTable::parse(FP_LIB_TABLE, &env());
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("Resistor_SMD"),
            Some("/usr/share/kicad/modules/Resistor_SMD.pretty")
        );
        assert_eq!(table.get("mylib"), Some("/home/me/libs/mylib.pretty"));
    }

    #[test]
    fn test_duplicate_name_last_wins() {
        let content = "  (lib (name a)(type KiCad)(uri /first)(options \"\")(descr \"\"))\n  (lib (name a)(type KiCad)(uri /second)(options \"\")(descr \"\"))\n";
        let table = LibraryTable::parse(content, &env());
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("a"), Some("/second"));
    }

    #[test]
    fn test_footprint_path() {
        let table = LibraryTable::parse(FP_LIB_TABLE, &env());
        assert_eq!(
            table.footprint_path("mylib", "R0805"),
            Some(PathBuf::from("/home/me/libs/mylib.pretty/R0805.kicad_mod"))
        );
        assert_eq!(table.footprint_path("nope", "R0805"), None);
    }

    #[test]
    fn test_read_missing_table() {
        let result = LibraryTable::read(Path::new("/nonexistent/fp-lib-table"), &env());
        assert!(matches!(result, Err(ArchiveError::Config { .. })));
    }
}

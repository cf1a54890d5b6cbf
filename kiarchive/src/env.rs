//! KiCad environment variables and configuration location.
//!
//! KiCad resolves library paths through named variables such as
//! `${KICAD_SYMBOL_DIR}`. The values live in the global `kicad_common`
//! file, which is an INI-like text file in KiCad 5 and a JSON document in
//! KiCad 6. Both are accepted here.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::ArchiveError;

/// Variable KiCad substitutes with the project directory.
pub const PROJECT_VAR: &str = "KIPRJMOD";

/// Overrides the KiCad configuration directory, as KiCad itself does.
pub const CONFIG_HOME_VAR: &str = "KICAD_CONFIG_HOME";

const ENV_SECTION: &str = "[EnvironmentVariables]";
const COMMON_FILE: &str = "kicad_common";
const COMMON_JSON_FILE: &str = "kicad_common.json";
const FP_LIB_TABLE_FILE: &str = "fp-lib-table";

/// Named KiCad environment variables, resolved once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvironmentVariables {
    vars: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct JsonCommon {
    environment: Option<JsonEnvironment>,
}

#[derive(Deserialize)]
struct JsonEnvironment {
    vars: Option<BTreeMap<String, String>>,
}

impl EnvironmentVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load variables from a KiCad `kicad_common` file (either format).
    pub fn load(path: &Path) -> Result<Self, ArchiveError> {
        let content = std::fs::read_to_string(path).map_err(|source| ArchiveError::Config {
            path: path.to_path_buf(),
            source,
        })?;

        if content.trim_start().starts_with('{') {
            Self::parse_json(&content)
        } else {
            Ok(Self::parse_ini(&content))
        }
    }

    /// Parse the KiCad 5 text format.
    ///
    /// Every `name=value` line after the `[EnvironmentVariables]` marker is
    /// collected until the next section header or the end of the file.
    /// The value is everything after the first `=`.
    pub fn parse_ini(content: &str) -> Self {
        let mut vars = BTreeMap::new();
        let mut in_section = false;

        for line in content.lines() {
            if line.contains(ENV_SECTION) {
                in_section = true;
                continue;
            }
            if !in_section {
                continue;
            }
            if line.trim_start().starts_with('[') {
                break;
            }
            if let Some((name, value)) = line.split_once('=') {
                vars.insert(name.trim().to_string(), value.to_string());
            }
        }

        Self { vars }
    }

    /// Parse the KiCad 6 JSON format (`environment.vars`).
    pub fn parse_json(content: &str) -> Result<Self, ArchiveError> {
        let common: JsonCommon = serde_json::from_str(content)
            .map_err(|e| ArchiveError::InvalidConfig(e.to_string()))?;
        let vars = common
            .environment
            .and_then(|env| env.vars)
            .unwrap_or_default();
        Ok(Self { vars })
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Replace every `${NAME}` token whose name is known.
    ///
    /// Passes repeat while a substitution still changes the result, so a
    /// value referring to another variable is resolved too. The pass count
    /// is bounded so self-referencing values cannot loop forever.
    pub fn expand(&self, path: &str) -> String {
        let mut expanded = path.to_string();

        for _ in 0..=self.vars.len() {
            let mut changed = false;
            for (name, value) in &self.vars {
                let token = format!("${{{}}}", name);
                if expanded.contains(&token) {
                    expanded = expanded.replace(&token, value);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        expanded
    }

    /// True when `path` still carries a `${...}` placeholder.
    pub fn has_placeholder(path: &str) -> bool {
        path.find("${")
            .is_some_and(|start| path[start..].contains('}'))
    }
}

/// Location of the global KiCad configuration files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KicadConfig {
    dir: PathBuf,
}

impl KicadConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Pick the configuration directory: explicit path, then
    /// `KICAD_CONFIG_HOME`, then the platform default.
    ///
    /// KiCad 6 and later keep their files in a versioned subdirectory
    /// (`~/.config/kicad/7.0`), so the chosen directory is narrowed with
    /// [`KicadConfig::newest_version`].
    pub fn locate(explicit: Option<&Path>) -> Result<Self, ArchiveError> {
        let dir = match explicit {
            Some(dir) => dir.to_path_buf(),
            None => match std::env::var_os(CONFIG_HOME_VAR).filter(|v| !v.is_empty()) {
                Some(dir) => PathBuf::from(dir),
                None => Self::platform_default()?,
            },
        };
        Ok(Self::newest_version(dir))
    }

    /// `dir` itself when it holds a `kicad_common` file, otherwise the
    /// highest numbered subdirectory (`6.0`, `7.0`, ...) holding a
    /// `kicad_common.json`. Falls back to `dir`.
    pub fn newest_version(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        if dir.join(COMMON_FILE).exists() || dir.join(COMMON_JSON_FILE).exists() {
            return Self::new(dir);
        }

        let newest = std::fs::read_dir(&dir)
            .into_iter()
            .flatten()
            .filter_map(Result::ok)
            .filter(|entry| entry.path().join(COMMON_JSON_FILE).is_file())
            .filter_map(|entry| {
                let version = parse_version(&entry.file_name().to_string_lossy())?;
                Some((version, entry.path()))
            })
            .max_by(|a, b| a.0.cmp(&b.0));

        match newest {
            Some((_, versioned)) => {
                tracing::debug!("Using KiCad configuration {}", versioned.display());
                Self::new(versioned)
            }
            None => Self::new(dir),
        }
    }

    fn platform_default() -> Result<PathBuf, ArchiveError> {
        if !cfg!(any(unix, windows)) {
            return Err(ArchiveError::UnsupportedPlatform);
        }
        let home = dirs::home_dir().ok_or(ArchiveError::HomeDirNotFound)?;
        if cfg!(windows) {
            Ok(home.join("AppData").join("Roaming").join("kicad"))
        } else {
            Ok(home.join(".config").join("kicad"))
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `kicad_common`, falling back to `kicad_common.json` when only the
    /// KiCad 6 file is present.
    pub fn common_path(&self) -> PathBuf {
        let legacy = self.dir.join(COMMON_FILE);
        let json = self.dir.join(COMMON_JSON_FILE);
        if !legacy.exists() && json.exists() {
            json
        } else {
            legacy
        }
    }

    pub fn fp_lib_table_path(&self) -> PathBuf {
        self.dir.join(FP_LIB_TABLE_FILE)
    }
}

/// `"7.0"` -> `[7, 0]`; anything not purely dotted numbers is `None`.
fn parse_version(name: &str) -> Option<Vec<u32>> {
    name.split('.').map(|part| part.parse().ok()).collect()
}

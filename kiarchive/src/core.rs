//! Archive pipeline shared by the CLI and library users.
//! No terminal or output-format concerns here.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf, Prefix};

use serde::Serialize;
use walkdir::WalkDir;

use crate::archiver::{archive, MissingPolicy};
use crate::env::{EnvironmentVariables, KicadConfig, PROJECT_VAR};
use crate::parser::extract::{extract_footprints, extract_models};
use crate::parser::lib_table::LibraryTable;
use crate::rewrite::{
    footprint_lib_table, library_nickname, link_footprint_to_3d_model,
    link_schematic_to_footprint_lib, link_schematic_to_symbol_lib,
    link_symbol_lib_to_footprint_lib, strip_library_prefix, symbol_lib_table, write_atomic,
};

/// Project directory holding the archived symbol library.
pub const SYMBOL_LIB_DIR: &str = "lib_sym";
/// Project footprint library (its nickname is `lib_fp`).
pub const FOOTPRINT_LIB_DIR: &str = "lib_fp.pretty";
/// Project directory holding 3D models.
pub const MODEL_DIR: &str = "3d_models";

const SYMBOL_CACHE_SUFFIX: &str = "-cache.lib";
const SCHEMATIC_EXTENSION: &str = "sch";

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Your OS is not supported yet")]
    UnsupportedPlatform,
    #[error("Home directory not found")]
    HomeDirNotFound,
    #[error("Cannot read KiCad configuration {}: {source}", .path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid KiCad configuration: {0}")]
    InvalidConfig(String),
    #[error("Footprint library '{nickname}' used in {} is not in the library table", .schematic.display())]
    UnknownLibrary { nickname: String, schematic: PathBuf },
    #[error("{} not found", .0.display())]
    MissingResource(PathBuf),
    #[error("Symbols cache not found in {}, nothing to archive", .0.display())]
    SymbolCacheNotFound(PathBuf),
    #[error("Project directory not found: {}", .0.display())]
    ProjectNotFound(PathBuf),
}

/// Read a whole text file; a missing file is `MissingResource`.
pub(crate) fn read_text(path: &Path) -> Result<String, ArchiveError> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ArchiveError::MissingResource(path.to_path_buf())
        } else {
            ArchiveError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

/// How much progress the run reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Pipeline stages and warnings.
    #[default]
    Normal,
    /// Every resolved table entry, reference and copy.
    Debug,
}

impl Verbosity {
    /// `--quiet` wins over `--debug`.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        match (quiet, debug) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Debug,
            (false, false) => Verbosity::Normal,
        }
    }

    /// `tracing` filter directive for this level.
    pub fn filter_directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Debug => "debug",
        }
    }
}

/// Options for an archive run.
#[derive(Clone, Debug)]
pub struct ArchiveOptions {
    pub project_dir: PathBuf,
    /// KiCad configuration directory; located automatically when `None`.
    pub kicad_config_dir: Option<PathBuf>,
    pub verbosity: Verbosity,
    /// Resolve and list references without touching the project.
    pub dry_run: bool,
}

impl ArchiveOptions {
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            kicad_config_dir: None,
            verbosity: Verbosity::default(),
            dry_run: false,
        }
    }
}

/// Everything a run found and did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArchiveReport {
    pub project_dir: PathBuf,
    pub dry_run: bool,
    pub schematics: Vec<PathBuf>,
    /// Footprint files referenced by the schematics, in order, with duplicates.
    pub footprints: Vec<PathBuf>,
    /// 3D models referenced by those footprints, in order, with duplicates.
    pub models: Vec<PathBuf>,
    pub copied_footprints: Vec<PathBuf>,
    pub copied_models: Vec<PathBuf>,
    /// Models that could not be copied; their links still point into the project.
    pub missing_models: Vec<PathBuf>,
    pub symbol_cache: Option<PathBuf>,
    pub symbol_library: Option<PathBuf>,
    pub rewritten_files: Vec<PathBuf>,
}

impl ArchiveReport {
    pub fn warning_count(&self) -> usize {
        self.missing_models.len()
    }

    pub fn has_warnings(&self) -> bool {
        self.warning_count() > 0
    }
}

/// Recursively find `.sch` files below `dir`, skipping hidden directories.
pub fn discover_schematic_files(dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut files = Vec::new();
    let walker = WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        if entry.file_type().is_file()
            && path.extension().and_then(|s| s.to_str()) == Some(SCHEMATIC_EXTENSION)
        {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

/// First `*-cache.lib` directly inside the project directory.
pub fn find_symbol_cache(dir: &Path) -> Result<PathBuf, ArchiveError> {
    let mut caches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_cache = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(SYMBOL_CACHE_SUFFIX));
        if is_cache && path.is_file() {
            caches.push(path);
        }
    }
    caches.sort();
    caches
        .into_iter()
        .next()
        .ok_or_else(|| ArchiveError::SymbolCacheNotFound(dir.to_path_buf()))
}

/// Symbol library name of a cache file: `demo-cache.lib` -> `demo`.
pub fn symbol_library_name(cache: &Path) -> String {
    let file_name = cache
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match file_name.split_once("-cache") {
        Some((name, _)) => name.to_string(),
        None => file_name,
    }
}

/// Absolute, symlink-free project directory.
///
/// On Windows the verbatim `\\?\` prefix from `fs::canonicalize` is
/// dropped again: `KIPRJMOD` and the `lib_fp` location get joined with `/`,
/// which verbatim paths do not accept as a separator.
pub fn resolve_project_dir(dir: &Path) -> Result<PathBuf, ArchiveError> {
    fs::canonicalize(dir)
        .ok()
        .filter(|p| p.is_dir())
        .map(|path| strip_verbatim_prefix(&path))
        .ok_or_else(|| ArchiveError::ProjectNotFound(dir.to_path_buf()))
}

fn strip_verbatim_prefix(path: &Path) -> PathBuf {
    let mut components = path.components();
    let plain = match components.next() {
        Some(Component::Prefix(prefix)) => match prefix.kind() {
            Prefix::VerbatimDisk(drive) => format!("{}:", drive as char),
            Prefix::VerbatimUNC(server, share) => {
                format!(r"\\{}\{}", server.to_string_lossy(), share.to_string_lossy())
            }
            _ => return path.to_path_buf(),
        },
        _ => return path.to_path_buf(),
    };
    let mut stripped = PathBuf::from(plain);
    stripped.extend(components);
    stripped
}

/// Runs the archive pipeline over one project.
pub struct ProjectArchiver {
    options: ArchiveOptions,
}

impl ProjectArchiver {
    pub fn new(options: ArchiveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ArchiveOptions {
        &self.options
    }

    /// Archive the project (or only scan it, for a dry run).
    ///
    /// Stages run in a fixed order and the first fatal error stops the
    /// run. Files already rewritten by then stay rewritten.
    pub fn run(&self) -> Result<ArchiveReport, ArchiveError> {
        let project_dir = resolve_project_dir(&self.options.project_dir)?;
        let dry_run = self.options.dry_run;
        tracing::info!("Project directory: {}", project_dir.display());

        let mut report = ArchiveReport {
            project_dir: project_dir.clone(),
            dry_run,
            ..Default::default()
        };

        // Prepare
        tracing::info!("Read KiCad environment variables ...");
        let config = KicadConfig::locate(self.options.kicad_config_dir.as_deref())?;
        let mut env = EnvironmentVariables::load(&config.common_path())?;
        env.insert(PROJECT_VAR, project_dir.to_string_lossy());
        for (name, value) in env.iter() {
            tracing::debug!("{} {}", name, value);
        }

        tracing::info!("Read KiCad footprint libraries ...");
        let mut fp_libs = LibraryTable::read(&config.fp_lib_table_path(), &env)?;
        let fp_lib_path = project_dir.join(FOOTPRINT_LIB_DIR);
        if !dry_run {
            fs::create_dir_all(&fp_lib_path)?;
            write_atomic(
                &project_dir.join("fp-lib-table"),
                footprint_lib_table(FOOTPRINT_LIB_DIR).as_bytes(),
            )?;
        }
        fp_libs.insert(
            library_nickname(FOOTPRINT_LIB_DIR),
            fp_lib_path.to_string_lossy(),
        );
        for (name, location) in fp_libs.iter() {
            tracing::debug!("{} {}", name, location);
        }

        tracing::info!("Find all project schematic files ...");
        report.schematics = discover_schematic_files(&project_dir)?;
        for schematic in &report.schematics {
            tracing::debug!("{}", schematic.display());
        }

        // Footprints and 3D models
        tracing::info!("Extract list of all footprints from project schematic files ...");
        for schematic in &report.schematics {
            report.footprints.extend(extract_footprints(schematic, &fp_libs)?);
        }
        for footprint in &report.footprints {
            tracing::debug!("{}", footprint.display());
        }

        tracing::info!("Extract list of all 3D models assigned to used footprints ...");
        for footprint in &report.footprints {
            report.models.extend(extract_models(footprint, &env)?);
        }
        for model in &report.models {
            tracing::debug!("{}", model.display());
        }

        if dry_run {
            report.symbol_cache = find_symbol_cache(&project_dir)
                .map_err(|e| tracing::warn!("{}", e))
                .ok();
            return Ok(report);
        }

        tracing::info!("Copy all used footprints to project directory ...");
        let footprints = archive(&report.footprints, &fp_lib_path, MissingPolicy::Fail)?;
        report.copied_footprints = footprints.copied;

        tracing::info!("Copy all used 3D models to project directory ...");
        let model_path = project_dir.join(MODEL_DIR);
        let models = archive(&report.models, &model_path, MissingPolicy::Warn)?;
        report.copied_models = models.copied;
        report.missing_models = models.missing;

        tracing::info!("Link used 3D models with footprints inside project ...");
        let local_footprints: BTreeSet<PathBuf> = report
            .footprints
            .iter()
            .filter_map(|fp| fp.file_name())
            .map(|name| fp_lib_path.join(name))
            .collect();
        for footprint in local_footprints {
            if link_footprint_to_3d_model(&footprint, MODEL_DIR)? {
                report.rewritten_files.push(footprint.clone());
            }
            tracing::debug!("Link project 3D models with {}", footprint.display());
        }

        tracing::info!("Link used footprints with project schematic files ...");
        for schematic in &report.schematics {
            if link_schematic_to_footprint_lib(schematic, FOOTPRINT_LIB_DIR)? {
                report.rewritten_files.push(schematic.clone());
            }
            tracing::debug!("Link project footprints with {}", schematic.display());
        }

        // Symbols
        tracing::info!("Find symbols cache and create project symbol library ...");
        let cache = find_symbol_cache(&project_dir)?;
        tracing::debug!("{}", cache.display());
        let sym_lib_name = symbol_library_name(&cache);
        let sym_lib_dir = project_dir.join(SYMBOL_LIB_DIR);
        let sym_lib = sym_lib_dir.join(format!("{}.lib", sym_lib_name));
        fs::create_dir_all(&sym_lib_dir)?;
        fs::copy(&cache, &sym_lib)?;
        strip_library_prefix(&sym_lib, &sym_lib_name)?;
        tracing::debug!("Copy {} to {}", cache.display(), sym_lib.display());
        write_atomic(
            &project_dir.join("sym-lib-table"),
            symbol_lib_table(SYMBOL_LIB_DIR, &sym_lib_name).as_bytes(),
        )?;

        tracing::info!("Link project footprints with project symbol library ...");
        link_symbol_lib_to_footprint_lib(&sym_lib, FOOTPRINT_LIB_DIR)?;
        tracing::debug!("Link project footprints with {}", sym_lib.display());

        tracing::info!("Link project symbol library with schematic ...");
        for schematic in &report.schematics {
            if link_schematic_to_symbol_lib(schematic, &sym_lib_name)?
                && !report.rewritten_files.contains(schematic)
            {
                report.rewritten_files.push(schematic.clone());
            }
            tracing::debug!("Link project symbol library with {}", schematic.display());
        }

        report.symbol_cache = Some(cache);
        report.symbol_library = Some(sym_lib);
        tracing::info!("Done!");
        Ok(report)
    }
}

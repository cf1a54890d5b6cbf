//! Copying external library files into the project.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::ArchiveError;

/// What to do when a source file does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Abort with `ArchiveError::MissingResource` (footprints).
    Fail,
    /// Log a warning and carry on (3D models, which are often not installed).
    Warn,
}

/// Result of one `archive` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyOutcome {
    /// Files written into the destination directory.
    pub copied: Vec<PathBuf>,
    /// Sources already inside the destination directory.
    pub skipped: Vec<PathBuf>,
    /// Sources that do not exist (only with `MissingPolicy::Warn`).
    pub missing: Vec<PathBuf>,
}

/// Copy `paths` into `dest_dir`, keeping file names.
///
/// `dest_dir` is created first. A source whose path already contains
/// `dest_dir` is skipped, which makes repeated runs over an archived
/// project copy nothing.
pub fn archive(
    paths: &[PathBuf],
    dest_dir: &Path,
    policy: MissingPolicy,
) -> Result<CopyOutcome, ArchiveError> {
    fs::create_dir_all(dest_dir)?;

    let dest = dest_dir.to_string_lossy();
    let mut outcome = CopyOutcome::default();

    for path in paths {
        if path.to_string_lossy().contains(&*dest) {
            outcome.skipped.push(path.clone());
            continue;
        }

        let file_name = match path.file_name() {
            Some(name) if path.is_file() => name,
            _ => match policy {
                MissingPolicy::Fail => return Err(ArchiveError::MissingResource(path.clone())),
                MissingPolicy::Warn => {
                    tracing::warn!("{} not found!", path.display());
                    outcome.missing.push(path.clone());
                    continue;
                }
            },
        };

        let target = dest_dir.join(file_name);
        fs::copy(path, &target)?;
        tracing::debug!("Copy {} to {}", path.display(), dest_dir.display());
        outcome.copied.push(target);
    }

    Ok(outcome)
}

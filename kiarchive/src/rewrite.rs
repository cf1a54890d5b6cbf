//! In-place relinking of schematic, footprint and symbol library files.
//!
//! Every pass is line oriented: a line that matches its record is replaced,
//! every other line (and every line terminator) is copied through untouched.
//! The text transforms are plain `&str -> String` functions; the `link_*`
//! wrappers apply them to a file and replace it atomically.

use std::fs;
use std::path::Path;

use crate::core::{read_text, ArchiveError};
use crate::env::PROJECT_VAR;
use crate::parser::kicad_legacy::{FootprintField, ModelField, SymbolRef};

/// Nickname of a project library directory: the name up to the first `.`
/// (`lib_fp.pretty` -> `lib_fp`).
pub fn library_nickname(dir_name: &str) -> &str {
    dir_name.split('.').next().unwrap_or(dir_name)
}

/// Apply `rewrite` to each line of `content`; `None` keeps the line as is.
pub fn rewrite_lines<F>(content: &str, mut rewrite: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::with_capacity(content.len());
    for raw in content.split_inclusive('\n') {
        let (line, ending) = split_line_ending(raw);
        match rewrite(line) {
            Some(new_line) => {
                out.push_str(&new_line);
                out.push_str(ending);
            }
            None => out.push_str(raw),
        }
    }
    out
}

fn split_line_ending(raw: &str) -> (&str, &str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, "\n")
    } else {
        (raw, "")
    }
}

// ============================================================================
// Text transforms
// ============================================================================

/// Point every `(model ...)` at `${KIPRJMOD}/<model_dir>/<file name>`.
pub fn relink_models(content: &str, model_dir: &str) -> String {
    rewrite_lines(content, |line| {
        let model = ModelField::parse(line)?;
        let name = model.file_name()?;
        Some(model.with_path(&format!("${{{}}}/{}/{}", PROJECT_VAR, model_dir, name)))
    })
}

/// Point schematic footprint fields at the project footprint library.
pub fn relink_schematic_footprints(content: &str, fp_lib_dir: &str) -> String {
    let nickname = library_nickname(fp_lib_dir);
    rewrite_lines(content, |line| {
        FootprintField::parse_schematic(line).map(|field| field.with_library(nickname))
    })
}

/// Point symbol library footprint fields at the project footprint library.
pub fn relink_symbol_library_footprints(content: &str, fp_lib_dir: &str) -> String {
    let nickname = library_nickname(fp_lib_dir);
    rewrite_lines(content, |line| {
        FootprintField::parse_symbol_library(line).map(|field| field.with_library(nickname))
    })
}

/// Move schematic symbols into `symbol_lib`, renaming `LIB:SYM` to
/// `symbol_lib:LIB_SYM`. Symbols already in `symbol_lib` are left alone.
pub fn relink_schematic_symbols(content: &str, symbol_lib: &str) -> String {
    rewrite_lines(content, |line| {
        let symbol = SymbolRef::parse(line)?;
        (symbol.library != symbol_lib).then(|| symbol.relocated_to(symbol_lib))
    })
}

/// Remove every `<symbol_lib>_` token.
///
/// Applied to the project symbol library only: definitions keep their bare
/// names there while schematic references carry the prefixed ones.
pub fn strip_prefix(content: &str, symbol_lib: &str) -> String {
    let token = format!("{}_", symbol_lib);
    rewrite_lines(content, |line| {
        line.contains(&token).then(|| line.replace(&token, ""))
    })
}

// ============================================================================
// File passes
// ============================================================================

/// Rewrite a footprint file so its 3D models live in `model_dir`.
pub fn link_footprint_to_3d_model(footprint: &Path, model_dir: &str) -> Result<bool, ArchiveError> {
    rewrite_file(footprint, |content| relink_models(content, model_dir))
}

/// Rewrite a schematic so its footprints come from `fp_lib_dir`.
pub fn link_schematic_to_footprint_lib(
    schematic: &Path,
    fp_lib_dir: &str,
) -> Result<bool, ArchiveError> {
    rewrite_file(schematic, |content| relink_schematic_footprints(content, fp_lib_dir))
}

/// Rewrite a symbol library so its footprints come from `fp_lib_dir`.
pub fn link_symbol_lib_to_footprint_lib(
    symbol_lib: &Path,
    fp_lib_dir: &str,
) -> Result<bool, ArchiveError> {
    rewrite_file(symbol_lib, |content| {
        relink_symbol_library_footprints(content, fp_lib_dir)
    })
}

/// Rewrite a schematic so its symbols come from `symbol_lib_name`.
pub fn link_schematic_to_symbol_lib(
    schematic: &Path,
    symbol_lib_name: &str,
) -> Result<bool, ArchiveError> {
    rewrite_file(schematic, |content| relink_schematic_symbols(content, symbol_lib_name))
}

/// Undo the `<symbol_lib_name>_` prefix inside the symbol library itself.
pub fn strip_library_prefix(symbol_lib: &Path, symbol_lib_name: &str) -> Result<bool, ArchiveError> {
    rewrite_file(symbol_lib, |content| strip_prefix(content, symbol_lib_name))
}

/// Read, transform and write back `path`. Returns whether it changed; an
/// unchanged file is not rewritten.
fn rewrite_file<F>(path: &Path, transform: F) -> Result<bool, ArchiveError>
where
    F: FnOnce(&str) -> String,
{
    let content = read_text(path)?;
    let rewritten = transform(&content);
    if rewritten == content {
        return Ok(false);
    }
    write_atomic(path, rewritten.as_bytes())?;
    Ok(true)
}

/// Write `content` next to `path` under a temporary name, then rename it
/// over `path`. Readers see either the old or the new file.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<(), ArchiveError> {
    let temp_path = path.with_file_name(format!(
        ".{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        uuid::Uuid::new_v4().simple()
    ));
    if let Err(e) = fs::write(&temp_path, content).and_then(|_| fs::rename(&temp_path, path)) {
        let _ = fs::remove_file(&temp_path);
        return Err(e.into());
    }
    Ok(())
}

// ============================================================================
// Project library tables
// ============================================================================

/// `fp-lib-table` listing only the project footprint library.
pub fn footprint_lib_table(fp_lib_dir: &str) -> String {
    format!(
        "(fp_lib_table\n  (lib (name {})(type KiCad)(uri ${{{}}}/{})(options \"\")(descr \"\"))\n)\n",
        library_nickname(fp_lib_dir),
        PROJECT_VAR,
        fp_lib_dir
    )
}

/// `sym-lib-table` listing only the project symbol library.
pub fn symbol_lib_table(symbol_lib_dir: &str, symbol_lib_name: &str) -> String {
    format!(
        "(sym_lib_table\n  (lib (name {name})(type Legacy)(uri ${{{var}}}/{dir}/{name}.lib)(options \"\")(descr \"\"))\n)\n",
        name = symbol_lib_name,
        var = PROJECT_VAR,
        dir = symbol_lib_dir
    )
}

//! KiArchive - make KiCad projects self-contained
//!
//! A KiCad 5 project normally points at symbol, footprint and 3D model
//! libraries installed somewhere on the machine that created it. This
//! library copies everything a project actually uses into the project
//! directory and rewrites the references so they resolve through
//! `${KIPRJMOD}` instead.
//!
//! # Quick Start
//!
//! ```no_run
//! use kiarchive::{ArchiveOptions, ProjectArchiver};
//!
//! let options = ArchiveOptions::new("/home/me/projects/blinky");
//! let report = ProjectArchiver::new(options).run().unwrap();
//!
//! for model in &report.missing_models {
//!     println!("not found: {}", model.display());
//! }
//! ```
//!
//! # Layout after a run
//!
//! - `lib_fp.pretty/` - every footprint the schematics use (`lib_fp` nickname)
//! - `3d_models/` - every 3D model those footprints use
//! - `lib_sym/<project>.lib` - the symbol cache turned into a library
//! - `fp-lib-table`, `sym-lib-table` - project library tables

pub mod archiver;
pub mod core;
pub mod env;
pub mod parser;
pub mod rewrite;

// Re-export main types
pub use archiver::{archive, CopyOutcome, MissingPolicy};
pub use crate::core::{
    discover_schematic_files, find_symbol_cache, ArchiveError, ArchiveOptions, ArchiveReport,
    ProjectArchiver, Verbosity, FOOTPRINT_LIB_DIR, MODEL_DIR, SYMBOL_LIB_DIR,
};
pub use env::{EnvironmentVariables, KicadConfig, PROJECT_VAR};
pub use parser::LibraryTable;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        ArchiveError, ArchiveOptions, ArchiveReport, EnvironmentVariables, LibraryTable,
        ProjectArchiver, Verbosity,
    };
}

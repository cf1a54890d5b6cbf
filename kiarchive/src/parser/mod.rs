pub mod extract;
pub mod kicad_legacy;
pub mod lib_table;

// Re-export for convenience
pub use extract::{extract_footprints, extract_models, footprints_in, models_in, FOOTPRINT_EXTENSION};
pub use kicad_legacy::{FootprintField, LibTableEntry, ModelField, SymbolRef};
pub use lib_table::LibraryTable;

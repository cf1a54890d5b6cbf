//! Scan example: list the external files a project depends on, change nothing.

use kiarchive::prelude::*;
use std::path::Path;

fn main() -> Result<(), ArchiveError> {
    let path = std::env::args().nth(1).unwrap_or_else(|| ".".to_string());
    let path = Path::new(&path);

    if !path.is_dir() {
        eprintln!("Project directory not found: {}", path.display());
        eprintln!("Usage: cargo run --example scan_project [path/to/project]");
        std::process::exit(1);
    }

    let mut options = ArchiveOptions::new(path);
    options.dry_run = true;

    let report = ProjectArchiver::new(options).run()?;

    println!("Project: {}", report.project_dir.display());
    println!("Schematics: {}", report.schematics.len());
    println!();

    println!("Footprints:");
    for footprint in &report.footprints {
        println!("  - {}", footprint.display());
    }

    println!("3D models:");
    for model in &report.models {
        let marker = if model.is_file() { "" } else { " (missing)" };
        println!("  - {}{}", model.display(), marker);
    }

    match report.symbol_cache {
        Some(ref cache) => println!("Symbol cache: {}", cache.display()),
        None => println!("Symbol cache: not found, run the schematic editor once to create it"),
    }
    Ok(())
}

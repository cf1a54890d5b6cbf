//! KiArchive CLI - make a KiCAD project self-contained from the command line.

use clap::{Args, Parser, Subcommand, ValueEnum};
use kiarchive::{ArchiveOptions, ArchiveReport, ProjectArchiver, Verbosity};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "kiarchive")]
#[command(about = "Archive a KiCAD project: copy used symbols, footprints and 3D models into it", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy used libraries into the project and relink every reference
    Archive {
        #[command(flatten)]
        target: TargetArgs,

        /// Resolve and list references only, change nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// List the external files a project depends on (same as archive --dry-run)
    Scan {
        #[command(flatten)]
        target: TargetArgs,
    },
}

#[derive(Args)]
struct TargetArgs {
    /// Project directory
    #[arg(value_name = "PROJECT_PATH")]
    path: PathBuf,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,

    /// Print debug information
    #[arg(short, long)]
    debug: bool,

    /// KiCAD configuration directory (defaults to $KICAD_CONFIG_HOME or the platform location)
    #[arg(long, value_name = "DIR")]
    kicad_config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary
    Human,
    /// JSON report for scripts
    Json,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Usage errors exit with 1, help and version with 0.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    let exit_code = match cli.command {
        Commands::Archive { target, dry_run } => handle_archive(target, dry_run),
        Commands::Scan { target } => handle_archive(target, true),
    };

    process::exit(exit_code);
}

fn handle_archive(target: TargetArgs, dry_run: bool) -> i32 {
    let options = ArchiveOptions {
        project_dir: target.path,
        kicad_config_dir: target.kicad_config,
        verbosity: Verbosity::from_flags(target.quiet, target.debug),
        dry_run,
    };
    init_tracing(options.verbosity);

    match ProjectArchiver::new(options).run() {
        Ok(report) => {
            match target.format {
                OutputFormat::Human if !target.quiet => output_human(&report),
                OutputFormat::Human => {}
                OutputFormat::Json => {
                    if let Err(e) = output_json(&report) {
                        eprintln!("Error: {}", e);
                        return 1;
                    }
                }
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

/// Initialize tracing subscriber. `RUST_LOG` overrides the flag-derived level.
fn init_tracing(verbosity: Verbosity) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .try_init();
}

fn output_human(report: &ArchiveReport) {
    println!("\nProject: {}", report.project_dir.display());
    println!("{}", "─".repeat(60));

    if report.dry_run {
        println!("\n  Footprints:");
        for footprint in &report.footprints {
            println!("    - {}", footprint.display());
        }
        println!("\n  3D models:");
        for model in &report.models {
            println!("    - {}", model.display());
        }
        if let Some(ref cache) = report.symbol_cache {
            println!("\n  Symbol cache: {}", cache.display());
        }
    }

    if !report.missing_models.is_empty() {
        println!("\n  MISSING 3D MODELS:");
        for model in &report.missing_models {
            println!("    - {}", model.display());
        }
    }

    println!("\n  Summary:");
    println!("    Schematics:  {}", report.schematics.len());
    println!(
        "    Footprints:  {} ({} copied)",
        report.footprints.len(),
        report.copied_footprints.len()
    );
    println!(
        "    3D models:   {} ({} copied, {} missing)",
        report.models.len(),
        report.copied_models.len(),
        report.missing_models.len()
    );
    if let Some(ref library) = report.symbol_library {
        println!("    Symbols:     {}", library.display());
    }
    if !report.dry_run {
        println!("\n  Generate a new netlist and update PCB footprints in KiCAD to finish.");
    }
}

fn output_json(report: &ArchiveReport) -> serde_json::Result<()> {
    let output = serde_json::json!({
        "report": report,
        "summary": {
            "schematics": report.schematics.len(),
            "footprints": report.footprints.len(),
            "models": report.models.len(),
            "warnings": report.warning_count(),
        }
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

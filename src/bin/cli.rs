//! explorer-cli - Debug tool for explorer tile tracking
//!
//! Usage:
//!   explorer-cli update <activity-dir> [--cache <dir>] [--zoom <z>]...
//!   explorer-cli status [--cache <dir>] [--zoom <z>]...
//!   explorer-cli reset [--cache <dir>]
//!
//! The activity directory holds `activities.json` and `time_series/<id>.json`.
//! State and work ledger are kept in the cache directory.

use clap::{Parser, Subcommand};
use explorer_tiles::{
    DirectoryRepository, ExplorerConfig, ExplorerEngine, LogProgress, Result, MAX_ZOOM,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "explorer-cli")]
#[command(about = "Debug tool for explorer tile tracking", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory for persisted state and work ledger
    #[arg(short, long, global = true, default_value = "Cache")]
    cache: PathBuf,

    /// Optional JSON configuration file (overrides defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Zoom levels for evolution (repeatable)
    #[arg(short, long, global = true)]
    zoom: Vec<u8>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest new activities and advance cluster/square evolution
    Update {
        /// Folder containing activities.json and time_series/
        folder: PathBuf,
    },

    /// Print tile counts and milestone timelines
    Status,

    /// Discard all state so the next update starts from scratch
    Reset,
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn build_config(cli: &Cli) -> Result<ExplorerConfig> {
    let mut config = match &cli.config {
        Some(path) => ExplorerConfig::load(path)?,
        None => ExplorerConfig::with_cache_dir(&cli.cache),
    };
    if !cli.zoom.is_empty() {
        config.zoom_levels = cli.zoom.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = build_config(&cli)?;

    match cli.command {
        Commands::Update { folder } => {
            let repo = DirectoryRepository::open(&folder, config.time_series_cache_size)?;
            let mut engine = ExplorerEngine::open(config)?;
            let report = engine.update(&repo, &LogProgress)?;

            println!("\n{}", "=".repeat(60));
            println!("Update of {}", folder.display());
            println!("{}", "=".repeat(60));
            println!("  Processed activities: {}", report.processed);
            println!("  New tiles (all zooms): {}", report.discovered_tiles);
            if report.rebuilt() {
                println!("  Rebuilt after deletion of {:?}", report.deleted_activities);
            }
            for (id, reason) in &report.failed {
                println!("  Failed {id}: {reason}");
            }
            print_status(&engine);
        }
        Commands::Status => {
            let engine = ExplorerEngine::open(config)?;
            print_status(&engine);
        }
        Commands::Reset => {
            let mut engine = ExplorerEngine::open(config)?;
            engine.reset()?;
            println!("State reset.");
        }
    }
    Ok(())
}

fn print_status(engine: &ExplorerEngine) {
    let stats = engine.stats();
    println!("\n{}", "-".repeat(60));
    println!("  Processed activities:  {}", stats.processed_activities);
    println!("  Touched tiles (z{MAX_ZOOM}):   {}", stats.touched_tiles);
    println!("  Explored tiles (z{MAX_ZOOM}):  {}", stats.discovered_tiles);

    for &zoom in &engine.config().zoom_levels {
        println!("\n  Zoom {zoom}");
        println!(
            "    explored tiles: {}",
            engine.visits().discovery_history(zoom).len()
        );

        let clusters = engine.cluster_timeline(zoom);
        match clusters.last() {
            Some(last) => println!(
                "    max cluster:    {} tiles ({} milestones)",
                last.max_cluster_size,
                clusters.len()
            ),
            None => println!("    max cluster:    -"),
        }

        let squares = engine.square_timeline(zoom);
        match squares.last() {
            Some(last) => println!(
                "    max square:     {}x{} at ({}, {}) ({} milestones)",
                last.size,
                last.size,
                last.x,
                last.y,
                squares.len()
            ),
            None => println!("    max square:     -"),
        }
    }
}

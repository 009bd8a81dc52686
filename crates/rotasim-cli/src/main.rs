//! Headless battle runner.
//!
//! Loads a JSON battle config, runs it with the standard kits and prints the
//! battle log and summary. With `--output` the full report is written as
//! JSON instead.
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use rotasim_core::kits::standard_catalog;
use rotasim_core::{BattleReport, Simulation, SimulationConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Run a turn-based battle rotation simulation
#[derive(Parser)]
#[command(name = "rotasim")]
#[command(about = "Simulates a party rotation against a JSON battle config", long_about = None)]
#[command(version)]
struct Cli {
    /// Battle config (JSON)
    config: PathBuf,

    /// Write the report as JSON to this path instead of printing the log
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the config's RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the config's round budget
    #[arg(long)]
    rounds: Option<u32>,

    /// Print only the summary
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();

    let mut config = load_config(&cli)?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(rounds) = cli.rounds {
        config.rounds = rounds;
    }

    let report = Simulation::new(&config, standard_catalog())
        .context("invalid battle config")?
        .run()
        .context("simulation failed")?;

    match &cli.output {
        Some(path) => write_report(&report, path)?,
        None => print_report(&report, cli.quiet),
    }
    Ok(())
}

/// Installs a stderr subscriber filtered by `RUST_LOG`, `warn` by default.
fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}

fn load_config(cli: &Cli) -> Result<SimulationConfig> {
    let text = fs::read_to_string(&cli.config)
        .with_context(|| format!("failed to read {}", cli.config.display()))?;
    let config = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", cli.config.display()))?;
    tracing::info!(path = %cli.config.display(), "config loaded");
    Ok(config)
}

fn write_report(report: &BattleReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    println!("{:?} after {} turns, report written to {}", report.outcome, report.turns, path.display());
    Ok(())
}

fn print_report(report: &BattleReport, quiet: bool) {
    if !quiet {
        for entry in &report.log {
            println!("{entry}");
        }
        println!();
    }
    print!("{report}");
}

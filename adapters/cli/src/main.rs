#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that generates a dust field and drives a vehicle
//! across it.

mod ascii;
mod scenario;

use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use dustfield_core::FieldConfig;
use dustfield_field::Field;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::scenario::{Scenario, ScenarioSettings};

/// Command-line arguments accepted by the dust field simulator.
#[derive(Debug, Parser)]
#[command(name = "dustfield")]
#[command(about = "Generates a dust field and simulates a vehicle carving through it")]
struct Cli {
    /// TOML file with field configuration overrides.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed used by the generation pass.
    #[arg(long, default_value_t = 1)]
    seed: u64,
    /// Number of grid columns.
    #[arg(long, default_value_t = 48)]
    columns: u32,
    /// Number of grid rows.
    #[arg(long, default_value_t = 20)]
    rows: u32,
    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 200)]
    ticks: u32,
    /// Simulated milliseconds per tick.
    #[arg(long, default_value_t = 50)]
    tick_ms: u64,
    /// Maximum level of log output.
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("failed to install log subscriber")?;

    let config = load_config(cli.config.as_ref())?;
    let field = Field::with_config(config).context("invalid field configuration")?;
    let settings = ScenarioSettings {
        columns: cli.columns,
        rows: cli.rows,
        seed: cli.seed,
        ticks: cli.ticks,
        tick: Duration::from_millis(cli.tick_ms),
    };

    let mut scenario = Scenario::new(field, settings);
    let summary = scenario.run();
    info!(
        rebuilds = summary.rebuilds,
        corridors = summary.corridors,
        pockets = summary.pockets,
        "simulation finished"
    );

    print!("{}", ascii::render(scenario.field()));
    println!("{summary}");
    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> Result<FieldConfig> {
    let Some(path) = path else {
        return Ok(FieldConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
}

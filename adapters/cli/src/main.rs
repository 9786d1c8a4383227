#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line runner that plays a Tile Defence scenario headlessly.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tile_defence_cli::{Scenario, Simulation};

#[derive(Parser, Debug)]
#[command(name = "tile-defence")]
#[command(about = "Runs a tile defence scenario without rendering and prints a summary")]
struct Cli {
    /// Path to a TOML scenario file.
    scenario: PathBuf,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 3_600)]
    frames: u32,

    /// Length of a frame in milliseconds.
    #[arg(long, default_value_t = 16, value_parser = clap::value_parser!(u64).range(1..))]
    dt_ms: u64,

    /// Seed overriding the one stored in the scenario.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .try_init();
    let cli = Cli::parse();

    let scenario = Scenario::load(&cli.scenario)?;
    let seed = cli.seed.unwrap_or_else(|| scenario.seed());
    log::info!(
        "running {} for {} frames with seed {seed}",
        cli.scenario.display(),
        cli.frames
    );

    let mut simulation = Simulation::from_scenario(&scenario, seed)?;
    let dt = Duration::from_millis(cli.dt_ms);
    for frame in 0..cli.frames {
        simulation
            .step(dt)
            .with_context(|| format!("frame {frame} failed"))?;
        if simulation.is_over() {
            break;
        }
    }

    println!("{}", simulation.summary());
    println!("replay fingerprint {:016x}", simulation.fingerprint());
    Ok(())
}

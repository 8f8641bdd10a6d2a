mod analysis;
mod config;
mod deterministic;
mod engine;
mod ensemble;
mod gillespie;
mod manager;
mod model;
mod solver;
mod stats;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    /// Parameter file (TOML).
    #[arg(long)]
    params: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Deterministic mean-field trajectories and invasion analysis.
    Ode {
        /// Write the report as JSON.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Stochastic (PDMP) ensembles and extinction statistics.
    Ssa {
        /// Override the configured number of runs per scenario.
        #[arg(long)]
        runs: Option<usize>,

        /// Base seed; omit for a fresh one from the OS.
        #[arg(long)]
        seed: Option<u64>,

        /// Write the per-scenario reports as JSON.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Dump the raw trajectories as MessagePack.
        #[arg(long)]
        trajectories: Option<PathBuf>,
    },
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    let mgr = Manager::new(&args.params).context("failed to construct mgr")?;

    match args.command {
        Command::Ode { out } => mgr.run_ode(out)?,
        Command::Ssa {
            runs,
            seed,
            out,
            trajectories,
        } => mgr.run_ssa(runs, seed, out, trajectories)?,
    }

    Ok(())
}

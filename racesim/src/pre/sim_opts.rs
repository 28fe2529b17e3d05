use crate::core::handle_race::DecisionPolicy;
use crate::core::race::SimSpeed;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    name = "racesim",
    about = "A tick-driven race simulator with live strategy decisions"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug logging
    #[clap(short, long)]
    pub debug: bool,

    /// Simulate in real time and read player controls from stdin
    #[clap(short, long)]
    pub live: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of simulation runs (only for non-live mode, runs are executed in parallel)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the simulation parameter file
    #[clap(short, long)]
    pub parfile_path: PathBuf,

    /// Set path to a JSON file overriding the tuning constants
    #[clap(short, long)]
    pub constants_path: Option<PathBuf>,

    /// Set simulated seconds per tick at 1x speed
    #[clap(short, long, default_value = "1.0")]
    pub timestep_size: f64,

    /// Set simulation speed multiplier (1, 2 or 4)
    #[clap(short, long, default_value = "1")]
    pub sim_speed: SimSpeed,

    /// Set the policy answering race events in non-live mode (cautious or bold)
    #[clap(long, default_value = "cautious")]
    pub policy: DecisionPolicy,

    /// Set seed of the race random numbers (runs use seed, seed + 1, ...)
    #[clap(long)]
    pub seed: Option<u64>,

    /// Write the classification of the (first) race to a CSV file
    #[clap(short, long)]
    pub output: Option<PathBuf>,
}

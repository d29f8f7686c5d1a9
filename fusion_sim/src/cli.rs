// fusion_sim/src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fusion_sim: exercise the lidar/radar UKF on synthetic scenarios or recorded logs.
///
/// This struct defines the command-line arguments of the `fusion_sim` binary.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a synthetic target, sample both sensors and run the filter.
    Simulate {
        /// The path to the scenario TOML file to run.
        #[arg(short, long, default_value = "assets/scenarios/default.toml")]
        scenario: PathBuf,

        /// Override the scenario's seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Print the fully resolved scenario as TOML before running.
        #[arg(long, default_value_t = false)]
        print_config: bool,
    },
    /// Replay a recorded measurement log through the filter.
    Replay {
        /// Path to the log file (`L ...` / `R ...` lines).
        input: PathBuf,

        /// Scenario whose `[filter]` and `[nis_thresholds]` sections tune the
        /// filter. Built-in defaults when omitted.
        #[arg(short, long)]
        scenario: Option<PathBuf>,

        /// Leading measurements excluded from the statistics.
        #[arg(long, default_value_t = 0)]
        warmup: usize,
    },
}

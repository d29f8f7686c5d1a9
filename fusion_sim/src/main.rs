// fusion_sim/src/main.rs

//! Entry point of the `fusion_sim` binary.
//!
//! Log verbosity follows `RUST_LOG`, e.g. `RUST_LOG=fusion_core=debug`.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fusion_sim::cli::{Cli, Command};
use fusion_sim::simulation::config::ScenarioConfig;
use fusion_sim::simulation::runner::{run_replay, run_scenario};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Simulate {
            scenario,
            seed,
            print_config,
        } => {
            let mut config = ScenarioConfig::load(&scenario)
                .with_context(|| format!("loading scenario {}", scenario.display()))?;
            if seed.is_some() {
                config.simulation.seed = seed;
            }
            if print_config {
                println!("{}", config.to_toml_string()?);
            }

            let report = run_scenario(&config)?;
            print!("{report}");
        }
        Command::Replay {
            input,
            scenario,
            warmup,
        } => {
            let config = match scenario {
                Some(path) => ScenarioConfig::load(&path)
                    .with_context(|| format!("loading scenario {}", path.display()))?,
                None => ScenarioConfig::default(),
            };

            let report = run_replay(&input, config.filter, config.nis_thresholds, warmup)
                .with_context(|| format!("replaying {}", input.display()))?;
            print!("{report}");
        }
    }

    Ok(())
}

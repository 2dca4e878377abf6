//! MCL SIM: a simulation driver for the landmark particle filter.
//!
//! The driver builds (or loads) a landmark map, generates a noisy vehicle run over it and localizes the
//! vehicle with the particle filter. Each trial writes a per-step CSV of the truth, the estimate and the
//! best particle's association diagnostics, and logs an error summary.
//!
//! You can run simulations either by:
//!   1. Loading all parameters from a configuration file (TOML/JSON/YAML)
//!   2. Using the defaults and overriding a few of them with command-line flags

mod common;

use clap::Parser;
use common::{ensure_parent_dir, init_logger, trial_output_path, validate_input_file};
use log::{error, info, warn};
use mcl::map::Map;
use mcl::resampling::ParticleResamplingStrategy;
use mcl::sim::{ErrorSummary, NavigationResult, Scenario, SimulationConfig, run_simulation, summarize};
use rayon::prelude::*;
use std::error::Error;
use std::path::{Path, PathBuf};

const LONG_ABOUT: &str = "MCL SIM: a simulation driver for the landmark particle filter.

Each trial simulates a vehicle weaving through a landmark map, observing the landmarks within sensor range
in its own frame, and runs the predict / update / resample cycle on those observations. Per-step results are
written to CSV and a summary of the estimate errors is logged.

Without --map a 10 x 10 grid of landmarks spaced 20 m apart is used. Without --config the built-in defaults
are used; --seed, --num-particles and --resampling override the loaded or default configuration.";

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "A simulation driver for the landmark particle filter.", long_about = LONG_ABOUT)]
struct Cli {
    /// Simulation configuration file (TOML/JSON/YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Landmark map: `.csv` with an `id,x,y` header, anything else as whitespace separated `x y id` rows
    #[arg(short, long)]
    map: Option<PathBuf>,

    /// Output CSV file path; with several trials the trial index is appended to the file stem
    #[arg(short, long, default_value = "mcl_results.csv")]
    output: PathBuf,

    /// Number of independent trials, each seeded with `seed + trial`
    #[arg(short, long, default_value_t = 1)]
    trials: usize,

    /// Run trials in parallel
    #[arg(long)]
    parallel: bool,

    /// Override the simulation and filter seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the number of particles
    #[arg(short = 'n', long)]
    num_particles: Option<usize>,

    /// Override the resampling algorithm
    #[arg(long, value_enum)]
    resampling: Option<ParticleResamplingStrategy>,

    /// Write the effective configuration to this file (TOML/JSON/YAML) and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Load the configuration named on the command line (or the defaults) and apply the overrides.
fn resolve_config(cli: &Cli) -> Result<SimulationConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            validate_input_file(path)?;
            info!("Loading configuration from {}", path.display());
            SimulationConfig::from_file(path)?
        }
        None => SimulationConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
        config.filter.seed = seed;
    }
    if let Some(num_particles) = cli.num_particles {
        if num_particles == 0 {
            return Err("Number of particles must be positive".into());
        }
        config.filter.num_particles = num_particles;
    }
    if let Some(strategy) = cli.resampling {
        config.filter.resampling_strategy = strategy;
    }
    Ok(config)
}

fn load_map(path: Option<&Path>) -> Result<Map, Box<dyn Error>> {
    let map = match path {
        Some(path) => {
            validate_input_file(path)?;
            Map::from_file(path)?
        }
        None => Map::grid(10, 10, 20.0),
    };
    if map.is_empty() {
        warn!("Landmark map is empty; every particle will keep the neutral weight");
    }
    Ok(map)
}

/// Configuration of trial `trial`: scenario and filter seeds are both offset by the trial index.
fn trial_config(config: &SimulationConfig, trial: usize) -> SimulationConfig {
    let mut trial_config = config.clone();
    trial_config.seed = config.seed.wrapping_add(trial as u64);
    trial_config.filter.seed = config.filter.seed.wrapping_add(trial as u64);
    trial_config
}

/// Generate, run and record one trial.
fn run_trial(
    config: &SimulationConfig,
    map: &Map,
    trial: usize,
    output: &Path,
) -> Result<ErrorSummary, Box<dyn Error>> {
    let config = trial_config(config, trial);
    let scenario = Scenario::generate(&config, map);
    info!(
        "Trial {trial}: {} steps, {} particles, {:?} resampling, seed {}",
        scenario.steps.len(),
        config.filter.num_particles,
        config.filter.resampling_strategy,
        config.seed
    );
    let results = run_simulation(&config, map, &scenario);
    ensure_parent_dir(output)?;
    NavigationResult::to_csv(&results, output)?;
    info!("Trial {trial}: wrote {} rows to {}", results.len(), output.display());
    Ok(summarize(&results))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logger(&cli.log_level, cli.log_file.as_ref())?;

    let config = resolve_config(&cli)?;
    if let Some(path) = &cli.write_config {
        ensure_parent_dir(path)?;
        config.to_file(path)?;
        info!("Wrote configuration to {}", path.display());
        return Ok(());
    }
    if cli.trials == 0 {
        return Err("Number of trials must be positive".into());
    }

    let map = load_map(cli.map.as_deref())?;
    info!("Loaded {} landmarks", map.len());

    let run = |trial: usize| {
        let output = trial_output_path(&cli.output, trial, cli.trials);
        run_trial(&config, &map, trial, &output).map_err(|e| {
            error!("Trial {trial} failed: {e}");
            e.to_string()
        })
    };
    let outcomes: Vec<Result<ErrorSummary, String>> = if cli.parallel && cli.trials > 1 {
        (0..cli.trials).into_par_iter().map(run).collect()
    } else {
        (0..cli.trials).map(run).collect()
    };

    let mut failures = 0;
    let mut final_errors = Vec::with_capacity(outcomes.len());
    for (trial, outcome) in outcomes.iter().enumerate() {
        match outcome {
            Ok(summary) => {
                info!("Trial {trial}: {summary}");
                final_errors.push(summary.final_position_error);
            }
            Err(_) => failures += 1,
        }
    }
    if final_errors.len() > 1 {
        let mean = final_errors.iter().sum::<f64>() / final_errors.len() as f64;
        info!(
            "Mean final position error over {} trials: {mean:.3} m",
            final_errors.len()
        );
    }
    if failures > 0 {
        error!("{failures} trial(s) failed");
        return Err(format!("{failures} trial(s) failed").into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["mcl-sim"]);
        assert_eq!(cli.trials, 1);
        assert_eq!(cli.output, PathBuf::from("mcl_results.csv"));
        assert!(!cli.parallel);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config, SimulationConfig::default());
    }
    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "mcl-sim",
            "--seed",
            "9",
            "-n",
            "12",
            "--resampling",
            "systematic",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.seed, 9);
        assert_eq!(config.filter.seed, 9);
        assert_eq!(config.filter.num_particles, 12);
        assert_eq!(
            config.filter.resampling_strategy,
            ParticleResamplingStrategy::Systematic
        );
    }
    #[test]
    fn test_zero_particles_rejected() {
        let cli = Cli::parse_from(["mcl-sim", "-n", "0"]);
        assert!(resolve_config(&cli).is_err());
    }
    #[test]
    fn test_trial_config_offsets_seeds() {
        let config = SimulationConfig::default();
        let trial = trial_config(&config, 3);
        assert_eq!(trial.seed, config.seed + 3);
        assert_eq!(trial.filter.seed, config.filter.seed + 3);
        assert_eq!(trial.filter.num_particles, config.filter.num_particles);
    }
    #[test]
    fn test_default_map_is_grid() {
        let map = load_map(None).unwrap();
        assert_eq!(map.len(), 100);
    }
    #[test]
    fn test_run_trial_writes_results() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out").join("run.csv");
        let mut config = SimulationConfig::default();
        config.trajectory.steps = 20;
        config.filter.num_particles = 20;
        let map = Map::grid(6, 6, 20.0);
        let summary = run_trial(&config, &map, 0, &output).unwrap();
        assert_eq!(summary.steps, 20);
        let rows = NavigationResult::from_csv(&output).unwrap();
        assert_eq!(rows.len(), 20);
    }
}

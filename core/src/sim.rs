//! Simulation utilities for exercising the localization filter end to end.
//!
//! This module provides:
//! - `SimulationConfig`, a serializable description of a run (filter settings, trajectory and sensor
//!   noise) that can be read from and written to JSON, YAML or TOML
//! - `Scenario`, a synthetic ground-truth trajectory with noisy control inputs and noisy vehicle-frame
//!   landmark observations generated against a [Map]
//! - `run_simulation`, the predict, update, resample loop over a scenario
//! - `NavigationResult` and `ErrorSummary` for storing and analyzing the output, with CSV export
//! - Unit tests for validating functionality
use log::{debug, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::fs;
use std::io;
use std::path::Path;

use crate::Pose;
use crate::geometry::{dist, map_to_vehicle};
use crate::map::Map;
use crate::measurements::{LandmarkNoise, LandmarkObservation};
use crate::motion::{ControlInput, PoseNoise, propagate};
use crate::particle::{FilterConfig, ParticleFilter};

/// Commanded motion of the simulated vehicle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryConfig {
    /// Number of filter cycles, including the initial one
    pub steps: usize,
    /// Time between cycles (s)
    pub dt: f64,
    /// Forward velocity (m/s)
    pub velocity: f64,
    /// Yaw rate (rad/s), or the peak yaw rate when `turn_period` is set
    pub yaw_rate: f64,
    /// When set, the yaw rate follows `yaw_rate * sin(2π t / turn_period)` and the vehicle weaves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_period: Option<f64>,
}
impl Default for TrajectoryConfig {
    fn default() -> Self {
        TrajectoryConfig {
            steps: 300,
            dt: 0.1,
            velocity: 5.0,
            yaw_rate: 0.1,
            turn_period: Some(20.0),
        }
    }
}
impl TrajectoryConfig {
    /// Commanded control at time `t`
    pub fn control_at(&self, t: f64) -> ControlInput {
        let yaw_rate = match self.turn_period {
            Some(period) if period > 0.0 => {
                self.yaw_rate * (2.0 * std::f64::consts::PI * t / period).sin()
            }
            _ => self.yaw_rate,
        };
        ControlInput::new(self.velocity, yaw_rate)
    }
}

/// Noise on the control inputs reported to the filter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlNoise {
    pub velocity_std: f64,
    pub yaw_rate_std: f64,
}

/// Complete description of a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed of the scenario generator; the filter has its own seed in `filter.seed`
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// True starting pose of the vehicle
    pub initial_pose: Pose,
    /// Error of the first pose estimate handed to the filter (a GPS-like fix)
    pub gps_noise: PoseNoise,
    #[serde(default)]
    pub trajectory: TrajectoryConfig,
    #[serde(default)]
    pub control_noise: ControlNoise,
    /// Noise of the simulated landmark observations
    pub observation_noise: LandmarkNoise,
    #[serde(default)]
    pub filter: FilterConfig,
}
fn default_seed() -> u64 {
    42
}
impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            seed: default_seed(),
            initial_pose: Pose::new(20.0, 20.0, 0.4),
            gps_noise: PoseNoise::new(0.3, 0.3, 0.01),
            trajectory: TrajectoryConfig::default(),
            control_noise: ControlNoise {
                velocity_std: 0.1,
                yaw_rate_std: 0.01,
            },
            observation_noise: LandmarkNoise::new(0.3, 0.3),
            filter: FilterConfig::default(),
        }
    }
}
/// Serialization format of a configuration file, picked from its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}
impl ConfigFormat {
    /// `.json`, `.yaml`/`.yml` or `.toml`, case-insensitive
    fn from_path(path: &Path) -> io::Result<ConfigFormat> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(ConfigFormat::Json),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported configuration file: {}", path.display()),
            )),
        }
    }
}

impl SimulationConfig {
    /// Write the configuration in the format named by the file extension (.json/.yaml/.yml/.toml).
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();
        let text = match ConfigFormat::from_path(path)? {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(io::Error::other)?,
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(io::Error::other)?,
            ConfigFormat::Toml => toml::to_string(self).map_err(io::Error::other)?,
        };
        fs::write(path, text)
    }
    /// Read a configuration written by [SimulationConfig::to_file]. Omitted sections take their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let text = fs::read_to_string(path)?;
        match format {
            ConfigFormat::Json => serde_json::from_str(&text).map_err(io::Error::other),
            ConfigFormat::Yaml => serde_yaml::from_str(&text).map_err(io::Error::other),
            ConfigFormat::Toml => toml::from_str(&text).map_err(io::Error::other),
        }
    }
}

/// One cycle of a synthetic scenario.
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioStep {
    pub time: f64,
    /// True pose at `time`
    pub truth: Pose,
    /// Noisy control reported at `time`, applied over the following interval
    pub control: ControlInput,
    /// Vehicle-frame observations of the landmarks within sensor range of `truth`
    pub observations: Vec<LandmarkObservation>,
}

/// Synthetic ground truth and sensor stream.
#[derive(Clone, Debug, PartialEq)]
pub struct Scenario {
    /// Noisy first pose estimate used to initialize the filter
    pub initial_estimate: Pose,
    pub steps: Vec<ScenarioStep>,
}
impl Scenario {
    /// Generate a scenario from `config` against `map`.
    ///
    /// The truth follows the noise-free motion model under the commanded controls. Observations include
    /// every landmark within a circular `filter.sensor_range` of the truth, expressed in the vehicle frame,
    /// with independent Gaussian noise per axis.
    pub fn generate(config: &SimulationConfig, map: &Map) -> Scenario {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let initial_estimate = config
            .gps_noise
            .sampler()
            .sample_around(&config.initial_pose, &mut rng);
        let velocity_noise = normal(config.control_noise.velocity_std);
        let yaw_rate_noise = normal(config.control_noise.yaw_rate_std);
        let obs_x_noise = normal(config.observation_noise.std_x);
        let obs_y_noise = normal(config.observation_noise.std_y);
        let trajectory = &config.trajectory;
        let sensor_range = config.filter.sensor_range;

        let mut steps = Vec::with_capacity(trajectory.steps);
        let mut truth = config.initial_pose;
        let mut commanded = ControlInput::default();
        for k in 0..trajectory.steps {
            let time = k as f64 * trajectory.dt;
            if k > 0 {
                truth = propagate(&truth, &commanded, trajectory.dt);
            }
            commanded = trajectory.control_at(time);
            let control = ControlInput::new(
                commanded.velocity + velocity_noise.sample(&mut rng),
                commanded.yaw_rate + yaw_rate_noise.sample(&mut rng),
            );
            let observations = map
                .landmarks()
                .iter()
                .filter(|landmark| {
                    dist(truth.x, truth.y, landmark.x, landmark.y) <= sensor_range
                })
                .map(|landmark| {
                    let (x, y) = map_to_vehicle(&truth, landmark.x, landmark.y);
                    LandmarkObservation::new(
                        x + obs_x_noise.sample(&mut rng),
                        y + obs_y_noise.sample(&mut rng),
                    )
                })
                .collect();
            steps.push(ScenarioStep {
                time,
                truth,
                control,
                observations,
            });
        }
        debug!(
            "Generated scenario with {} steps against {} landmarks",
            steps.len(),
            map.len()
        );
        Scenario {
            initial_estimate,
            steps,
        }
    }
}

fn normal(std_dev: f64) -> Normal<f64> {
    assert!(
        std_dev.is_finite() && std_dev >= 0.0,
        "Simulation noise must be finite and non-negative, got {std_dev}"
    );
    Normal::new(0.0, std_dev)
        .unwrap_or_else(|e| panic!("Invalid standard deviation {std_dev}: {e}"))
}

/// Filter output at one cycle, recorded after the weight update and before resampling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavigationResult {
    pub step: usize,
    pub time: f64,
    pub true_x: f64,
    pub true_y: f64,
    pub true_theta: f64,
    pub estimate_x: f64,
    pub estimate_y: f64,
    pub estimate_theta: f64,
    pub best_x: f64,
    pub best_y: f64,
    pub best_theta: f64,
    /// Distance between the estimate and the truth (m)
    pub position_error: f64,
    /// Wrapped heading error of the estimate (rad)
    pub heading_error: f64,
    pub effective_sample_size: f64,
    pub weight_sum: f64,
    /// Diagnostics of the best particle, space-separated
    pub associations: String,
    pub sense_x: String,
    pub sense_y: String,
}
impl NavigationResult {
    /// Writes results to a CSV file with a header row.
    pub fn to_csv<P: AsRef<Path>>(results: &[Self], path: P) -> io::Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for result in results {
            writer.serialize(result)?;
        }
        writer.flush()?;
        Ok(())
    }
    /// Reads results back from a CSV file written by [`NavigationResult::to_csv`].
    pub fn from_csv<P: AsRef<Path>>(path: P) -> io::Result<Vec<Self>> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut results = Vec::new();
        for record in reader.deserialize() {
            results.push(record?);
        }
        Ok(results)
    }
}

/// Run the filter over `scenario`.
///
/// Step 0 initializes the filter from `scenario.initial_estimate`; every later step first predicts with
/// the control reported at the previous step. Each step then updates the weights, records a
/// [NavigationResult] and resamples.
pub fn run_simulation(
    config: &SimulationConfig,
    map: &Map,
    scenario: &Scenario,
) -> Vec<NavigationResult> {
    let filter_config = &config.filter;
    let mut pf = ParticleFilter::from_config(filter_config, &scenario.initial_estimate);
    let mut results = Vec::with_capacity(scenario.steps.len());
    for (k, step) in scenario.steps.iter().enumerate() {
        if k > 0 {
            let previous = &scenario.steps[k - 1];
            pf.predict(
                step.time - previous.time,
                &filter_config.process_noise,
                &previous.control,
            );
        }
        pf.update_weights(
            filter_config.sensor_range,
            &filter_config.landmark_noise,
            &step.observations,
            map,
        );
        let weight_sum = pf.weight_sum();
        if weight_sum == 0.0 {
            warn!("All particle weights are zero at step {k}; the population will collapse");
        }
        let estimate = pf.get_estimate();
        let best = pf.best_particle();
        results.push(NavigationResult {
            step: k,
            time: step.time,
            true_x: step.truth.x,
            true_y: step.truth.y,
            true_theta: step.truth.theta,
            estimate_x: estimate.x,
            estimate_y: estimate.y,
            estimate_theta: estimate.theta,
            best_x: best.x,
            best_y: best.y,
            best_theta: best.theta,
            position_error: estimate.distance_to(&step.truth),
            heading_error: estimate.heading_error(&step.truth),
            effective_sample_size: pf.effective_sample_size(),
            weight_sum,
            associations: best.get_associations(),
            sense_x: best.get_sense_x(),
            sense_y: best.get_sense_y(),
        });
        pf.resample();
    }
    results
}

/// Aggregate error statistics of a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub steps: usize,
    pub rmse_x: f64,
    pub rmse_y: f64,
    pub rmse_theta: f64,
    pub mean_position_error: f64,
    pub max_position_error: f64,
    pub final_position_error: f64,
}
impl Display for ErrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} steps, RMSE x {:.3} m, y {:.3} m, yaw {:.4} rad, mean position error {:.3} m (max {:.3} m, final {:.3} m)",
            self.steps,
            self.rmse_x,
            self.rmse_y,
            self.rmse_theta,
            self.mean_position_error,
            self.max_position_error,
            self.final_position_error
        )
    }
}

/// Summarize the estimate errors of a run. An empty run gives an all-zero summary.
pub fn summarize(results: &[NavigationResult]) -> ErrorSummary {
    if results.is_empty() {
        return ErrorSummary::default();
    }
    let n = results.len() as f64;
    let rms = |f: &dyn Fn(&NavigationResult) -> f64| {
        (results.iter().map(|r| f(r).powi(2)).sum::<f64>() / n).sqrt()
    };
    ErrorSummary {
        steps: results.len(),
        rmse_x: rms(&|r| r.estimate_x - r.true_x),
        rmse_y: rms(&|r| r.estimate_y - r.true_y),
        rmse_theta: rms(&|r| r.heading_error),
        mean_position_error: results.iter().map(|r| r.position_error).sum::<f64>() / n,
        max_position_error: results
            .iter()
            .map(|r| r.position_error)
            .fold(0.0, f64::max),
        final_position_error: results[results.len() - 1].position_error,
    }
}

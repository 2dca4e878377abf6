//! Monte Carlo localization toolbox for planar vehicles
//!
//! This crate implements the estimation core of a landmark-based particle filter. Given noisy motion
//! commands (forward velocity and yaw rate) and noisy range observations of landmarks whose positions
//! are known in advance, the filter maintains a population of weighted pose hypotheses (particles) and
//! repeatedly refines them toward the vehicle's true pose. The map is an input, not an output: this is
//! localization, not SLAM.
//!
//! This crate is primarily built off of two additional dependencies:
//! - [`nalgebra`](https://crates.io/crates/nalgebra): Provides the rotations and small matrices used by the
//!   frame transforms and the estimate covariance.
//! - [`rand`](https://crates.io/crates/rand) and [`rand_distr`](https://crates.io/crates/rand_distr): Provide
//!   the seedable random source and the Gaussian noise used throughout the filter.
//!
//! All other functionality (map loading, configuration files, simulation) is auxiliary and lives at the edges
//! of the crate.
//!
//! ## Crate overview
//!
//! - [geometry]: Distance, vehicle-to-map frame transform, bivariate Gaussian density and angle wrapping.
//! - [motion]: Unicycle/bicycle kinematic model and process noise.
//! - [association]: Nearest-neighbor data association of observations to landmarks.
//! - [measurements]: Landmark observations, sensor gating and the per-particle importance weight.
//! - [resampling]: Low-variance wheel resampling and alternate resampling schemes.
//! - [particle]: The particle population itself ([particle::ParticleFilter]).
//! - [map]: Map landmarks and loaders.
//! - [sim]: Synthetic scenarios and an end-to-end run loop used to exercise the filter.
//!
//! ## Filter cycle
//!
//! The filter is an initialize-then-loop state machine. Constructing a [particle::ParticleFilter] draws the
//! initial population; every cycle afterwards is the strict sequence
//!
//! 1. [particle::ParticleFilter::predict]: move every particle with the motion model and add process noise.
//! 2. [particle::ParticleFilter::update_weights]: per particle, gate the map to the sensor window, transform the
//!    observations into the map frame, associate them with landmarks and multiply the per-observation
//!    likelihoods into the importance weight.
//! 3. [particle::ParticleFilter::resample]: draw a new population proportional to weight.
//!
//! ```rust
//! use mcl::Pose;
//! use mcl::map::{Map, MapLandmark};
//! use mcl::measurements::{LandmarkNoise, LandmarkObservation};
//! use mcl::motion::{ControlInput, PoseNoise};
//! use mcl::particle::ParticleFilter;
//!
//! let map = Map::new(vec![MapLandmark::new(1, 5.0, 3.0), MapLandmark::new(2, 2.0, 1.0)]);
//! let mut pf = ParticleFilter::initialize(&Pose::new(0.0, 0.0, 0.0), &PoseNoise::new(0.3, 0.3, 0.01), 50, 42);
//!
//! pf.predict(0.1, &PoseNoise::new(0.3, 0.3, 0.01), &ControlInput::new(10.0, 0.0));
//! let observations = vec![LandmarkObservation::new(4.0, 3.0), LandmarkObservation::new(1.0, 1.0)];
//! pf.update_weights(50.0, &LandmarkNoise::new(0.3, 0.3), &observations, &map);
//! pf.resample();
//! assert_eq!(pf.num_particles(), 50);
//! ```
pub mod association;
pub mod geometry;
pub mod map;
pub mod measurements;
pub mod motion;
pub mod particle;
pub mod resampling;
pub mod sim;

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Identifier of a map landmark.
pub type LandmarkId = i32;

/// Planar vehicle pose in the map frame.
///
/// Position is in meters, heading `theta` is in radians measured counter-clockwise from the map x-axis.
/// Headings are not wrapped by the motion model; use [geometry::wrap_to_pi] when comparing them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}
impl Pose {
    pub fn new(x: f64, y: f64, theta: f64) -> Pose {
        Pose { x, y, theta }
    }
    /// Position as a vector
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }
    /// Euclidean distance between the positions of two poses
    pub fn distance_to(&self, other: &Pose) -> f64 {
        geometry::dist(self.x, self.y, other.x, other.y)
    }
    /// Signed heading difference `self - other`, wrapped to [-π, π]
    pub fn heading_error(&self, other: &Pose) -> f64 {
        geometry::wrap_to_pi(self.theta - other.theta)
    }
}
impl Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pose {{ x: {:.4}, y: {:.4}, theta: {:.4} }}",
            self.x, self.y, self.theta
        )
    }
}
impl From<(f64, f64, f64)> for Pose {
    fn from(tuple: (f64, f64, f64)) -> Self {
        let (x, y, theta) = tuple;
        Pose::new(x, y, theta)
    }
}
impl From<Pose> for (f64, f64, f64) {
    fn from(pose: Pose) -> Self {
        (pose.x, pose.y, pose.theta)
    }
}

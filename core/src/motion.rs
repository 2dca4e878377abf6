//! Motion model (prediction step) for planar particles.
//!
//! Particles are advanced with the closed-form unicycle (constant velocity and yaw rate) model:
//!
//! $$
//! \theta' = \theta + \omega \Delta t, \quad
//! x' = x + \frac{v}{\omega}\left(\sin\theta' - \sin\theta\right), \quad
//! y' = y + \frac{v}{\omega}\left(\cos\theta - \cos\theta'\right)
//! $$
//!
//! The closed form divides by the yaw rate, so below [`YAW_RATE_EPSILON`] the straight-line
//! approximation `x' = x + v Δt cos θ`, `y' = y + v Δt sin θ` is used instead.
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::Pose;

/// Yaw rates with a magnitude below this value (rad/s) are treated as straight-line motion.
pub const YAW_RATE_EPSILON: f64 = 1e-3;

/// Control input applied over one prediction interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// Forward velocity (m/s)
    pub velocity: f64,
    /// Yaw rate (rad/s)
    pub yaw_rate: f64,
}
impl ControlInput {
    pub fn new(velocity: f64, yaw_rate: f64) -> ControlInput {
        ControlInput { velocity, yaw_rate }
    }
}

/// Per-axis standard deviations of a pose distribution.
///
/// Used both for the initial spread of the population around the first pose estimate and for the
/// process noise injected at every prediction. The three axes are independent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseNoise {
    /// Standard deviation along the map x-axis (m)
    pub std_x: f64,
    /// Standard deviation along the map y-axis (m)
    pub std_y: f64,
    /// Standard deviation of the heading (rad)
    pub std_theta: f64,
}
impl PoseNoise {
    pub fn new(std_x: f64, std_y: f64, std_theta: f64) -> PoseNoise {
        PoseNoise {
            std_x,
            std_y,
            std_theta,
        }
    }
    /// No noise on any axis
    pub fn zero() -> PoseNoise {
        PoseNoise::default()
    }
    /// Zero-mean sampler for this noise model.
    ///
    /// # Panics
    /// If any standard deviation is negative or not finite.
    pub fn sampler(&self) -> PoseSampler {
        PoseSampler {
            x: zero_mean_normal(self.std_x, "std_x"),
            y: zero_mean_normal(self.std_y, "std_y"),
            theta: zero_mean_normal(self.std_theta, "std_theta"),
        }
    }
}

/// Pre-built zero-mean normal distributions for the three pose axes.
#[derive(Clone, Copy, Debug)]
pub struct PoseSampler {
    x: Normal<f64>,
    y: Normal<f64>,
    theta: Normal<f64>,
}
impl PoseSampler {
    /// Draw a pose from the Gaussian centered on `mean`.
    pub fn sample_around<R: Rng + ?Sized>(&self, mean: &Pose, rng: &mut R) -> Pose {
        Pose::new(
            mean.x + self.x.sample(rng),
            mean.y + self.y.sample(rng),
            mean.theta + self.theta.sample(rng),
        )
    }
    /// Add independent noise to each axis of `pose` in place.
    pub fn perturb<R: Rng + ?Sized>(&self, pose: &mut Pose, rng: &mut R) {
        *pose = self.sample_around(pose, rng);
    }
}

fn zero_mean_normal(std_dev: f64, axis: &str) -> Normal<f64> {
    assert!(
        std_dev.is_finite() && std_dev >= 0.0,
        "Standard deviation {axis} must be finite and non-negative, got {std_dev}"
    );
    Normal::new(0.0, std_dev)
        .unwrap_or_else(|e| panic!("Invalid standard deviation {axis} = {std_dev}: {e}"))
}

/// Noise-free kinematic update of a single pose over `dt` seconds.
pub fn propagate(pose: &Pose, control: &ControlInput, dt: f64) -> Pose {
    let velocity = control.velocity;
    let yaw_rate = control.yaw_rate;
    if yaw_rate.abs() < YAW_RATE_EPSILON {
        let distance = velocity * dt;
        Pose::new(
            pose.x + distance * pose.theta.cos(),
            pose.y + distance * pose.theta.sin(),
            pose.theta,
        )
    } else {
        let theta_new = pose.theta + yaw_rate * dt;
        let radius = velocity / yaw_rate;
        Pose::new(
            pose.x + radius * (theta_new.sin() - pose.theta.sin()),
            pose.y + radius * (pose.theta.cos() - theta_new.cos()),
            theta_new,
        )
    }
}

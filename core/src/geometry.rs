//! Planar geometry helpers shared by the motion, association and weighting steps.
//!
//! Public API:
//!     pub fn dist(x1, y1, x2, y2) -> f64
//!     pub fn vehicle_to_map(pose, x, y) -> (f64, f64)
//!     pub fn map_to_vehicle(pose, x, y) -> (f64, f64)
//!     pub fn bivariate_gaussian(dx, dy, std_x, std_y) -> f64
//!     pub fn wrap_to_pi(angle) -> f64
//!
//! All positions are in meters on a flat plane, headings are in radians measured
//! counter-clockwise from the map x-axis.

use nalgebra::{Rotation2, Vector2};
use std::f64::consts::PI;

use crate::Pose;

/// Euclidean distance between two points.
#[inline]
pub fn dist(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    Vector2::new(x2 - x1, y2 - y1).norm()
}

/// Transform a point from the vehicle frame of `pose` into the map frame.
///
/// The vehicle frame has its origin at the pose position with the x-axis along
/// the heading. The result is
///
/// $$
/// \begin{bmatrix} x_m \\\\ y_m \end{bmatrix} =
/// \begin{bmatrix} \cos\theta & -\sin\theta \\\\ \sin\theta & \cos\theta \end{bmatrix}
/// \begin{bmatrix} x_v \\\\ y_v \end{bmatrix} +
/// \begin{bmatrix} x_p \\\\ y_p \end{bmatrix}
/// $$
pub fn vehicle_to_map(pose: &Pose, x: f64, y: f64) -> (f64, f64) {
    let mapped = Rotation2::new(pose.theta) * Vector2::new(x, y) + pose.position();
    (mapped.x, mapped.y)
}

/// Inverse of [`vehicle_to_map`]: express a map-frame point in the vehicle frame of `pose`.
pub fn map_to_vehicle(pose: &Pose, x: f64, y: f64) -> (f64, f64) {
    let local = Rotation2::new(-pose.theta) * (Vector2::new(x, y) - pose.position());
    (local.x, local.y)
}

/// Axis-independent bivariate Gaussian density evaluated at the residual `(dx, dy)`.
///
/// $$
/// p = \frac{1}{2\pi\sigma_x\sigma_y} \exp\left(-\left(\frac{dx^2}{2\sigma_x^2} + \frac{dy^2}{2\sigma_y^2}\right)\right)
/// $$
pub fn bivariate_gaussian(dx: f64, dy: f64, std_x: f64, std_y: f64) -> f64 {
    let normalizer = 1.0 / (2.0 * PI * std_x * std_y);
    let exponent = dx.powi(2) / (2.0 * std_x.powi(2)) + dy.powi(2) / (2.0 * std_y.powi(2));
    normalizer * (-exponent).exp()
}

/// Wrap an angle in radians to the interval [-π, π].
pub fn wrap_to_pi(angle: f64) -> f64 {
    let mut wrapped = angle;
    while wrapped > PI {
        wrapped -= 2.0 * PI;
    }
    while wrapped < -PI {
        wrapped += 2.0 * PI;
    }
    wrapped
}

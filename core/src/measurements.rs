//! Landmark observations and the observation weighting step.
//!
//! The weight of one particle is computed in four stages:
//!
//! 1. **Gating**: keep map landmarks inside an axis-aligned square of half-width `sensor_range` centered on
//!    the particle. The bound is inclusive on both axes. The square admits slightly more than a circular
//!    range would, at a fraction of the cost.
//! 2. **Transform**: move every vehicle-frame observation into the map frame using the particle's pose.
//! 3. **Association**: nearest neighbor against the gated landmarks (see [crate::association]).
//! 4. **Likelihood**: start from 1 and multiply the bivariate Gaussian density of every residual
//!    `observation - landmark`. Observations without a match contribute no factor.
//!
//! The result is an unnormalized likelihood. A particle with no associated observation keeps the neutral
//! weight 1.
use serde::{Deserialize, Serialize};

use crate::association::associate;
use crate::geometry::{bivariate_gaussian, vehicle_to_map};
use crate::map::Map;
use crate::{LandmarkId, Pose};

/// A landmark observation or prediction.
///
/// The frame of `x` and `y` (vehicle or map) is implied by the step that produced it. `id` is `None` until
/// association assigns a landmark, and stays `None` when no landmark matched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkObservation {
    pub id: Option<LandmarkId>,
    pub x: f64,
    pub y: f64,
}
impl LandmarkObservation {
    /// Unassociated observation
    pub fn new(x: f64, y: f64) -> LandmarkObservation {
        LandmarkObservation { id: None, x, y }
    }
    pub fn with_id(id: LandmarkId, x: f64, y: f64) -> LandmarkObservation {
        LandmarkObservation { id: Some(id), x, y }
    }
}

/// Per-axis standard deviations of a landmark measurement in the map frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LandmarkNoise {
    /// Standard deviation along the map x-axis (m)
    pub std_x: f64,
    /// Standard deviation along the map y-axis (m)
    pub std_y: f64,
}
impl LandmarkNoise {
    pub fn new(std_x: f64, std_y: f64) -> LandmarkNoise {
        LandmarkNoise { std_x, std_y }
    }
    /// Density of the residual `(dx, dy)` under this noise model
    pub fn likelihood(&self, dx: f64, dy: f64) -> f64 {
        bivariate_gaussian(dx, dy, self.std_x, self.std_y)
    }
}

/// Outcome of weighting one particle.
///
/// `associations`, `sense_x` and `sense_y` are parallel and only hold the observations that matched a
/// landmark, in observation order.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementUpdate {
    pub weight: f64,
    pub associations: Vec<LandmarkId>,
    pub sense_x: Vec<f64>,
    pub sense_y: Vec<f64>,
}

/// Map landmarks inside the inclusive square window of half-width `sensor_range` around `pose`.
pub fn landmarks_in_range(pose: &Pose, sensor_range: f64, map: &Map) -> Vec<LandmarkObservation> {
    map.landmarks()
        .iter()
        .filter(|landmark| {
            (landmark.x - pose.x).abs() <= sensor_range
                && (landmark.y - pose.y).abs() <= sensor_range
        })
        .map(|landmark| LandmarkObservation::with_id(landmark.id, landmark.x, landmark.y))
        .collect()
}

/// Transform vehicle-frame observations into the map frame of `pose`, keeping their ids.
pub fn to_map_frame(pose: &Pose, observations: &[LandmarkObservation]) -> Vec<LandmarkObservation> {
    observations
        .iter()
        .map(|observation| {
            let (x, y) = vehicle_to_map(pose, observation.x, observation.y);
            LandmarkObservation {
                id: observation.id,
                x,
                y,
            }
        })
        .collect()
}

/// Weight a single pose hypothesis against vehicle-frame `observations`.
///
/// # Panics
/// If `sensor_range` is not strictly positive (zero, negative or NaN), or if a landmark standard deviation is not strictly positive.
pub fn measurement_update(
    pose: &Pose,
    sensor_range: f64,
    noise: &LandmarkNoise,
    observations: &[LandmarkObservation],
    map: &Map,
) -> MeasurementUpdate {
    assert!(
        sensor_range > 0.0,
        "Sensor range must be positive, got {sensor_range}"
    );
    assert!(
        noise.std_x > 0.0 && noise.std_y > 0.0,
        "Landmark standard deviations must be positive, got ({}, {})",
        noise.std_x,
        noise.std_y
    );
    let predicted = landmarks_in_range(pose, sensor_range, map);
    let mut transformed = to_map_frame(pose, observations);
    associate(&predicted, &mut transformed);

    let mut update = MeasurementUpdate {
        weight: 1.0,
        associations: Vec::with_capacity(transformed.len()),
        sense_x: Vec::with_capacity(transformed.len()),
        sense_y: Vec::with_capacity(transformed.len()),
    };
    for observation in &transformed {
        let Some(id) = observation.id else {
            continue;
        };
        let Some(landmark) = predicted.iter().find(|p| p.id == Some(id)) else {
            continue;
        };
        update.weight *= noise.likelihood(observation.x - landmark.x, observation.y - landmark.y);
        update.associations.push(id);
        update.sense_x.push(observation.x);
        update.sense_y.push(observation.y);
    }
    update
}

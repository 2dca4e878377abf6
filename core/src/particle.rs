//! Particle population and the Monte Carlo localization filter.
//!
//! [ParticleFilter] owns exactly `N` [Particle]s and a seedable random source. Constructing it is the
//! initialization step, so a filter value is always ready to run the predict, update and resample cycle.
use log::{debug, trace};
use nalgebra::{Matrix3, Vector3};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display};

use crate::association::associate;
use crate::geometry::wrap_to_pi;
use crate::map::Map;
use crate::measurements::{LandmarkNoise, LandmarkObservation, measurement_update};
use crate::motion::{ControlInput, PoseNoise, propagate};
use crate::resampling::ParticleResamplingStrategy;
use crate::{LandmarkId, Pose};

/// A single pose hypothesis.
///
/// `associations`, `sense_x` and `sense_y` are diagnostics for external visualization only: the landmark
/// ids matched during the last weight update and the map-frame positions at which they were sensed. They
/// never influence weight, pose or resampling.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Particle {
    /// Index in the population, reassigned at every resample
    pub id: usize,
    pub x: f64,
    pub y: f64,
    pub theta: f64,
    /// Unnormalized importance weight
    pub weight: f64,
    pub associations: Vec<LandmarkId>,
    pub sense_x: Vec<f64>,
    pub sense_y: Vec<f64>,
}
impl Display for Particle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Particle")
            .field("id", &self.id)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("theta", &self.theta)
            .field("weight", &self.weight)
            .field("associations", &self.get_associations())
            .finish()
    }
}
impl Particle {
    pub fn new(id: usize, pose: Pose, weight: f64) -> Particle {
        Particle {
            id,
            x: pose.x,
            y: pose.y,
            theta: pose.theta,
            weight,
            ..Default::default()
        }
    }
    pub fn pose(&self) -> Pose {
        Pose::new(self.x, self.y, self.theta)
    }
    pub fn set_pose(&mut self, pose: Pose) {
        self.x = pose.x;
        self.y = pose.y;
        self.theta = pose.theta;
    }
    /// Replace the diagnostic annotations of this particle and return it.
    ///
    /// # Panics
    /// If the three sequences differ in length.
    pub fn set_associations(
        &mut self,
        associations: Vec<LandmarkId>,
        sense_x: Vec<f64>,
        sense_y: Vec<f64>,
    ) -> &mut Particle {
        assert!(
            associations.len() == sense_x.len() && sense_x.len() == sense_y.len(),
            "Association diagnostics must have equal lengths (associations: {}, sense_x: {}, sense_y: {})",
            associations.len(),
            sense_x.len(),
            sense_y.len()
        );
        self.associations = associations;
        self.sense_x = sense_x;
        self.sense_y = sense_y;
        self
    }
    /// Associated landmark ids as space-separated text, e.g. `"3 5"`
    pub fn get_associations(&self) -> String {
        join_tokens(&self.associations)
    }
    /// Sensed map-frame x coordinates as space-separated text
    pub fn get_sense_x(&self) -> String {
        join_tokens(&self.sense_x)
    }
    /// Sensed map-frame y coordinates as space-separated text
    pub fn get_sense_y(&self) -> String {
        join_tokens(&self.sense_y)
    }
}

fn join_tokens<T: Display>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// How a single pose estimate is extracted from the population.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ParticleAveragingStrategy {
    #[default]
    WeightedAverage,
    UnweightedAverage,
    HighestWeight,
}

/// Filter configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub num_particles: usize,
    /// Half-width of the square sensor gating window (m)
    pub sensor_range: f64,
    #[serde(default)]
    pub resampling_strategy: ParticleResamplingStrategy,
    #[serde(default)]
    pub averaging_strategy: ParticleAveragingStrategy,
    pub seed: u64,
    /// Spread of the initial population around the first pose estimate
    pub init_noise: PoseNoise,
    /// Process noise added at every prediction
    pub process_noise: PoseNoise,
    /// Landmark measurement noise used by the likelihood
    pub landmark_noise: LandmarkNoise,
}
impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            num_particles: 50,
            sensor_range: 50.0,
            resampling_strategy: ParticleResamplingStrategy::Wheel,
            averaging_strategy: ParticleAveragingStrategy::WeightedAverage,
            seed: 42,
            init_noise: PoseNoise::new(0.3, 0.3, 0.01),
            process_noise: PoseNoise::new(0.3, 0.3, 0.01),
            landmark_noise: LandmarkNoise::new(0.3, 0.3),
        }
    }
}

/// Monte Carlo localization filter over a population of planar pose hypotheses.
#[derive(Clone)]
pub struct ParticleFilter {
    particles: Vec<Particle>,
    pub resampling_strategy: ParticleResamplingStrategy,
    pub averaging_strategy: ParticleAveragingStrategy,
    rng: StdRng,
}
impl Debug for ParticleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mean = self.get_estimate();
        let min_weight = self
            .particles
            .iter()
            .map(|p| p.weight)
            .fold(f64::INFINITY, f64::min);
        let max_weight = self.particles.iter().map(|p| p.weight).fold(0.0, f64::max);
        f.debug_struct("ParticleFilter")
            .field("num_particles", &self.particles.len())
            .field("effective_particles", &self.effective_sample_size())
            .field(
                "weight_range",
                &format_args!("[{:.4e}, {:.4e}]", min_weight, max_weight),
            )
            .field(
                "mean_pose",
                &format_args!("({:.3} m, {:.3} m, {:.4} rad)", mean.x, mean.y, mean.theta),
            )
            .field("resampling_strategy", &self.resampling_strategy)
            .finish()
    }
}
impl ParticleFilter {
    /// Draw `num_particles` particles around `initial`, each axis independently Gaussian with the
    /// deviations in `std`. All weights start at `1 / num_particles`.
    ///
    /// # Panics
    /// If `num_particles` is zero or a standard deviation is negative.
    pub fn initialize(initial: &Pose, std: &PoseNoise, num_particles: usize, seed: u64) -> Self {
        assert!(num_particles > 0, "Number of particles must be positive");
        let mut rng = StdRng::seed_from_u64(seed);
        let sampler = std.sampler();
        let init_weight = 1.0 / num_particles as f64;
        let particles = (0..num_particles)
            .map(|id| Particle::new(id, sampler.sample_around(initial, &mut rng), init_weight))
            .collect();
        debug!(
            "Initialized {num_particles} particles around {initial} with std ({}, {}, {})",
            std.std_x, std.std_y, std.std_theta
        );
        ParticleFilter {
            particles,
            resampling_strategy: ParticleResamplingStrategy::default(),
            averaging_strategy: ParticleAveragingStrategy::default(),
            rng,
        }
    }
    /// Initialize from a [FilterConfig], taking the particle count, spread, seed and strategies from it.
    pub fn from_config(config: &FilterConfig, initial: &Pose) -> Self {
        let mut filter = Self::initialize(
            initial,
            &config.init_noise,
            config.num_particles,
            config.seed,
        );
        filter.resampling_strategy = config.resampling_strategy;
        filter.averaging_strategy = config.averaging_strategy;
        filter
    }
    /// Build a filter around an existing population.
    ///
    /// # Panics
    /// If `particles` is empty.
    pub fn from_particles(particles: Vec<Particle>, seed: u64) -> Self {
        assert!(!particles.is_empty(), "Number of particles must be positive");
        ParticleFilter {
            particles,
            resampling_strategy: ParticleResamplingStrategy::default(),
            averaging_strategy: ParticleAveragingStrategy::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
    /// Prediction step: move every particle with the motion model, then add zero-mean Gaussian noise with
    /// the deviations in `std_pos` to x, y and theta.
    pub fn predict(&mut self, dt: f64, std_pos: &PoseNoise, control: &ControlInput) {
        let sampler = std_pos.sampler();
        for particle in &mut self.particles {
            let mut pose = propagate(&particle.pose(), control, dt);
            sampler.perturb(&mut pose, &mut self.rng);
            particle.set_pose(pose);
        }
        trace!(
            "Predicted {} particles over {dt} s with v = {}, yaw rate = {}",
            self.particles.len(),
            control.velocity,
            control.yaw_rate
        );
    }
    /// Nearest-neighbor association of `observations` to `predicted`, in place.
    ///
    /// See [crate::association::associate].
    pub fn data_association(
        predicted: &[LandmarkObservation],
        observations: &mut [LandmarkObservation],
    ) {
        associate(predicted, observations);
    }
    /// Update step: recompute the weight of every particle from vehicle-frame `observations`.
    ///
    /// Weights are unnormalized likelihoods. The association diagnostics of every particle are overwritten
    /// with the matches found in this update.
    pub fn update_weights(
        &mut self,
        sensor_range: f64,
        std_landmark: &LandmarkNoise,
        observations: &[LandmarkObservation],
        map: &Map,
    ) {
        for particle in &mut self.particles {
            let update = measurement_update(
                &particle.pose(),
                sensor_range,
                std_landmark,
                observations,
                map,
            );
            particle.weight = update.weight;
            particle.set_associations(update.associations, update.sense_x, update.sense_y);
        }
        trace!(
            "Updated weights of {} particles with {} observations, weight sum {:.4e}",
            self.particles.len(),
            observations.len(),
            self.weight_sum()
        );
    }
    /// Replace the population with `N` draws proportional to weight.
    ///
    /// Drawn particles keep their pose, weight and diagnostics; ids are reassigned to their new index.
    pub fn resample(&mut self) {
        let weights = self.weights();
        let indices = self.resampling_strategy.resample(&weights, &mut self.rng);
        let new_particles: Vec<Particle> = indices
            .into_iter()
            .enumerate()
            .map(|(id, index)| {
                let mut particle = self.particles[index].clone();
                particle.id = id;
                particle
            })
            .collect();
        self.particles = new_particles;
    }
    /// Annotate the particle at `index`. See [Particle::set_associations].
    pub fn set_associations(
        &mut self,
        index: usize,
        associations: Vec<LandmarkId>,
        sense_x: Vec<f64>,
        sense_y: Vec<f64>,
    ) -> &mut Particle {
        self.particles[index].set_associations(associations, sense_x, sense_y)
    }
    pub fn num_particles(&self) -> usize {
        self.particles.len()
    }
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }
    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }
    pub fn weights(&self) -> Vec<f64> {
        self.particles.iter().map(|p| p.weight).collect()
    }
    pub fn set_weights(&mut self, weights: &[f64]) {
        assert_eq!(weights.len(), self.particles.len());
        for (particle, &w) in self.particles.iter_mut().zip(weights.iter()) {
            particle.weight = w;
        }
    }
    pub fn weight_sum(&self) -> f64 {
        self.particles.iter().map(|p| p.weight).sum()
    }
    /// Scale the weights to sum to one; falls back to uniform weights when the sum is zero or not finite.
    pub fn normalize_weights(&mut self) {
        let sum = self.weight_sum();
        if sum > 0.0 && sum.is_finite() {
            for particle in &mut self.particles {
                particle.weight /= sum;
            }
        } else {
            let uniform = 1.0 / self.particles.len() as f64;
            for particle in &mut self.particles {
                particle.weight = uniform;
            }
        }
    }
    /// N_eff = (Σw)² / Σw², which equals 1 / Σw² for normalized weights
    pub fn effective_sample_size(&self) -> f64 {
        let sum = self.weight_sum();
        let sum_of_squares: f64 = self.particles.iter().map(|p| p.weight * p.weight).sum();
        if sum_of_squares > 0.0 && sum.is_finite() {
            sum * sum / sum_of_squares
        } else {
            0.0
        }
    }
    /// The particle with the highest weight (the first one on ties)
    pub fn best_particle(&self) -> &Particle {
        let mut best = &self.particles[0];
        for particle in &self.particles[1..] {
            if particle.weight > best.weight {
                best = particle;
            }
        }
        best
    }
    /// Pose estimate according to [ParticleFilter::averaging_strategy]
    pub fn get_estimate(&self) -> Pose {
        let (mean, _cov) = self.averaging_strategy.estimate(&self.particles);
        mean
    }
    /// Covariance of (x, y, theta) around the estimate
    pub fn get_certainty(&self) -> Matrix3<f64> {
        let (_mean, cov) = self.averaging_strategy.estimate(&self.particles);
        cov
    }
}

impl ParticleAveragingStrategy {
    fn estimate(&self, particles: &[Particle]) -> (Pose, Matrix3<f64>) {
        match self {
            ParticleAveragingStrategy::WeightedAverage => {
                let sum: f64 = particles.iter().map(|p| p.weight).sum();
                if sum > 0.0 && sum.is_finite() {
                    let weights: Vec<f64> = particles.iter().map(|p| p.weight / sum).collect();
                    weighted_mean_and_covariance(particles, &weights)
                } else {
                    Self::UnweightedAverage.estimate(particles)
                }
            }
            ParticleAveragingStrategy::UnweightedAverage => {
                let uniform = vec![1.0 / particles.len() as f64; particles.len()];
                weighted_mean_and_covariance(particles, &uniform)
            }
            ParticleAveragingStrategy::HighestWeight => {
                let best = particles
                    .iter()
                    .fold(&particles[0], |best, p| if p.weight > best.weight { p } else { best });
                (best.pose(), Matrix3::zeros())
            }
        }
    }
}

/// Mean and covariance of the particle poses under normalized `weights`. Heading is averaged on the circle.
fn weighted_mean_and_covariance(particles: &[Particle], weights: &[f64]) -> (Pose, Matrix3<f64>) {
    let mut x = 0.0;
    let mut y = 0.0;
    let mut sin_sum = 0.0;
    let mut cos_sum = 0.0;
    for (particle, w) in particles.iter().zip(weights) {
        x += w * particle.x;
        y += w * particle.y;
        sin_sum += w * particle.theta.sin();
        cos_sum += w * particle.theta.cos();
    }
    let mean = Pose::new(x, y, sin_sum.atan2(cos_sum));
    let mut cov = Matrix3::<f64>::zeros();
    for (particle, w) in particles.iter().zip(weights) {
        let diff = Vector3::new(
            particle.x - mean.x,
            particle.y - mean.y,
            wrap_to_pi(particle.theta - mean.theta),
        );
        cov += *w * diff * diff.transpose();
    }
    (mean, cov)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapLandmark;
    use assert_approx_eq::assert_approx_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn filter_at(pose: Pose, n: usize) -> ParticleFilter {
        ParticleFilter::initialize(&pose, &PoseNoise::zero(), n, 42)
    }

    #[test]
    fn test_initialize_population() {
        let pf = ParticleFilter::initialize(
            &Pose::new(4983.0, 5029.0, 1.201),
            &PoseNoise::new(2.0, 2.0, 0.05),
            1000,
            1,
        );
        assert_eq!(pf.num_particles(), 1000);
        for (i, particle) in pf.particles().iter().enumerate() {
            assert_eq!(particle.id, i);
            assert_approx_eq!(particle.weight, 1e-3, 1e-15);
            assert!(particle.associations.is_empty());
        }
        let mean = ParticleAveragingStrategy::UnweightedAverage.estimate(pf.particles()).0;
        assert!((mean.x - 4983.0).abs() < 0.3);
        assert!((mean.y - 5029.0).abs() < 0.3);
        assert!((mean.theta - 1.201).abs() < 0.01);
    }
    #[test]
    fn test_initialize_is_deterministic_per_seed() {
        let std = PoseNoise::new(1.0, 1.0, 0.1);
        let a = ParticleFilter::initialize(&Pose::default(), &std, 20, 9);
        let b = ParticleFilter::initialize(&Pose::default(), &std, 20, 9);
        let c = ParticleFilter::initialize(&Pose::default(), &std, 20, 10);
        assert_eq!(a.particles(), b.particles());
        assert_ne!(a.particles(), c.particles());
    }
    #[test]
    #[should_panic(expected = "Number of particles must be positive")]
    fn test_zero_particles_rejected() {
        let _ = filter_at(Pose::default(), 0);
    }
    #[test]
    fn test_predict_straight_line_without_noise() {
        let mut pf = filter_at(Pose::new(0.0, 0.0, 0.0), 5);
        pf.predict(0.5, &PoseNoise::zero(), &ControlInput::new(4.0, 0.0));
        for particle in pf.particles() {
            assert_eq!(particle.pose(), Pose::new(2.0, 0.0, 0.0));
        }
    }
    #[test]
    fn test_predict_curved_without_noise() {
        let mut pf = filter_at(Pose::new(0.0, 0.0, 0.0), 3);
        pf.predict(1.0, &PoseNoise::zero(), &ControlInput::new(1.0, FRAC_PI_2));
        for particle in pf.particles() {
            assert_approx_eq!(particle.x, 2.0 / PI, 1e-12);
            assert_approx_eq!(particle.y, 2.0 / PI, 1e-12);
            assert_approx_eq!(particle.theta, FRAC_PI_2, 1e-12);
        }
    }
    #[test]
    fn test_predict_adds_noise() {
        let mut pf = filter_at(Pose::new(0.0, 0.0, 0.0), 200);
        pf.predict(1.0, &PoseNoise::new(0.5, 0.5, 0.05), &ControlInput::new(1.0, 0.0));
        let distinct = pf
            .particles()
            .iter()
            .filter(|p| p.pose() != Pose::new(1.0, 0.0, 0.0))
            .count();
        assert_eq!(distinct, 200);
        let cov = ParticleAveragingStrategy::UnweightedAverage
            .estimate(pf.particles())
            .1;
        assert!((cov[(0, 0)].sqrt() - 0.5).abs() < 0.1);
    }
    #[test]
    fn test_update_weights_prefers_true_pose() {
        let map = Map::new(vec![
            MapLandmark::new(1, 10.0, 0.0),
            MapLandmark::new(2, 0.0, 10.0),
            MapLandmark::new(3, -10.0, -5.0),
        ]);
        let mut particles = vec![
            Particle::new(0, Pose::new(0.0, 0.0, 0.0), 0.5),
            Particle::new(1, Pose::new(1.0, -1.0, 0.1), 0.5),
        ];
        particles[1].set_associations(vec![99], vec![0.0], vec![0.0]);
        let mut pf = ParticleFilter::from_particles(particles, 3);
        let observations = vec![
            LandmarkObservation::new(10.0, 0.0),
            LandmarkObservation::new(0.0, 10.0),
            LandmarkObservation::new(-10.0, -5.0),
        ];
        pf.update_weights(20.0, &LandmarkNoise::new(0.3, 0.3), &observations, &map);
        let weights = pf.weights();
        assert!(weights.iter().all(|&w| w >= 0.0));
        assert!(weights[0] > 0.0);
        assert!(weights[0] > weights[1]);
        assert_approx_eq!(
            weights[0],
            LandmarkNoise::new(0.3, 0.3).likelihood(0.0, 0.0).powi(3),
            1e-9
        );
        assert_eq!(pf.particles()[0].get_associations(), "1 2 3");
        assert_eq!(pf.particles()[0].get_sense_x(), "10 0 -10");
        assert_eq!(pf.particles()[1].associations.len(), 3);
    }
    #[test]
    fn test_update_weights_without_visible_landmarks_is_neutral() {
        let map = Map::new(vec![MapLandmark::new(1, 500.0, 500.0)]);
        let mut pf = filter_at(Pose::default(), 4);
        pf.update_weights(
            10.0,
            &LandmarkNoise::new(0.3, 0.3),
            &[LandmarkObservation::new(1.0, 1.0)],
            &map,
        );
        assert!(pf.weights().iter().all(|&w| w == 1.0));
    }
    #[test]
    fn test_resample_keeps_population_size_and_reassigns_ids() {
        let mut pf = ParticleFilter::initialize(
            &Pose::default(),
            &PoseNoise::new(1.0, 1.0, 0.1),
            37,
            5,
        );
        let weights: Vec<f64> = (0..37).map(|i| (i % 5) as f64).collect();
        pf.set_weights(&weights);
        for _ in 0..10 {
            pf.resample();
            assert_eq!(pf.num_particles(), 37);
            for (i, particle) in pf.particles().iter().enumerate() {
                assert_eq!(particle.id, i);
                assert!(particle.weight > 0.0);
            }
        }
    }
    #[test]
    fn test_resample_is_weight_proportional() {
        let n = 10;
        let trials = 400;
        let mut hits = 0usize;
        let mut pf = ParticleFilter::initialize(
            &Pose::default(),
            &PoseNoise::new(1.0, 1.0, 0.1),
            n,
            17,
        );
        for _ in 0..trials {
            let mut particles: Vec<Particle> = (0..n)
                .map(|i| Particle::new(i, Pose::new(i as f64, 0.0, 0.0), 0.01 / 9.0))
                .collect();
            particles[6].weight = 0.99;
            pf.particles = particles;
            pf.resample();
            hits += pf.particles().iter().filter(|p| p.x == 6.0).count();
        }
        let fraction = hits as f64 / (n * trials) as f64;
        assert!((fraction - 0.99).abs() < 0.03, "fraction = {fraction}");
    }
    #[test]
    fn test_resample_all_zero_weights_collapses_to_first() {
        let mut pf = ParticleFilter::initialize(
            &Pose::default(),
            &PoseNoise::new(1.0, 1.0, 0.1),
            8,
            23,
        );
        let first = pf.particles()[0].pose();
        pf.set_weights(&[0.0; 8]);
        pf.resample();
        assert_eq!(pf.num_particles(), 8);
        assert!(pf.particles().iter().all(|p| p.pose() == first));
    }
    #[test]
    fn test_diagnostic_rendering() {
        let mut particle = Particle::new(0, Pose::default(), 1.0);
        particle.set_associations(vec![3, 5], vec![1.0, 2.0], vec![3.0, 4.0]);
        assert_eq!(particle.get_associations(), "3 5");
        assert_eq!(particle.get_sense_x(), "1 2");
        assert_eq!(particle.get_sense_y(), "3 4");
    }
    #[test]
    fn test_diagnostic_rendering_fractional_and_empty() {
        let mut particle = Particle::new(0, Pose::default(), 1.0);
        assert_eq!(particle.get_associations(), "");
        assert_eq!(particle.get_sense_x(), "");
        particle
            .set_associations(vec![12], vec![-2.5], vec![0.125])
            .weight = 0.5;
        assert_eq!(particle.get_sense_x(), "-2.5");
        assert_eq!(particle.get_sense_y(), "0.125");
        assert_eq!(particle.weight, 0.5);
        particle.set_associations(vec![], vec![], vec![]);
        assert_eq!(particle.get_associations(), "");
    }
    #[test]
    #[should_panic(expected = "Association diagnostics must have equal lengths")]
    fn test_diagnostic_length_mismatch_panics() {
        let mut particle = Particle::new(0, Pose::default(), 1.0);
        particle.set_associations(vec![1, 2], vec![1.0], vec![1.0, 2.0]);
    }
    #[test]
    fn test_filter_set_associations_targets_one_particle() {
        let mut pf = filter_at(Pose::default(), 3);
        pf.set_associations(1, vec![4], vec![1.5], vec![2.5]);
        assert_eq!(pf.particles()[1].get_associations(), "4");
        assert_eq!(pf.particles()[0].get_associations(), "");
    }
    #[test]
    fn test_normalize_and_effective_sample_size() {
        let mut pf = filter_at(Pose::default(), 4);
        assert_approx_eq!(pf.effective_sample_size(), 4.0, 1e-12);
        pf.set_weights(&[2.0, 0.0, 0.0, 0.0]);
        assert_approx_eq!(pf.effective_sample_size(), 1.0, 1e-12);
        pf.normalize_weights();
        assert_eq!(pf.weights(), vec![1.0, 0.0, 0.0, 0.0]);
        pf.set_weights(&[0.0; 4]);
        assert_eq!(pf.effective_sample_size(), 0.0);
        pf.normalize_weights();
        assert_eq!(pf.weights(), vec![0.25; 4]);
    }
    #[test]
    fn test_estimates() {
        let particles = vec![
            Particle::new(0, Pose::new(0.0, 0.0, PI - 0.1), 1.0),
            Particle::new(1, Pose::new(2.0, 4.0, -PI + 0.1), 3.0),
        ];
        let mut pf = ParticleFilter::from_particles(particles, 0);
        let weighted = pf.get_estimate();
        assert_approx_eq!(weighted.x, 1.5, 1e-12);
        assert_approx_eq!(weighted.y, 3.0, 1e-12);
        // Circular mean stays near the +/- pi seam instead of averaging to 0
        assert!(weighted.theta.abs() > 3.0);
        let cov = pf.get_certainty();
        assert_approx_eq!(cov[(0, 0)], 0.75, 1e-12);
        assert_approx_eq!(cov[(0, 1)], cov[(1, 0)], 1e-12);

        pf.averaging_strategy = ParticleAveragingStrategy::UnweightedAverage;
        let unweighted = pf.get_estimate();
        assert_approx_eq!(unweighted.x, 1.0, 1e-12);
        assert_approx_eq!(unweighted.y, 2.0, 1e-12);

        pf.averaging_strategy = ParticleAveragingStrategy::HighestWeight;
        assert_eq!(pf.get_estimate(), Pose::new(2.0, 4.0, -PI + 0.1));
        assert_eq!(pf.get_certainty(), Matrix3::zeros());
        assert_eq!(pf.best_particle().id, 1);
    }
    #[test]
    fn test_from_config_applies_strategies() {
        let config = FilterConfig {
            num_particles: 12,
            resampling_strategy: ParticleResamplingStrategy::Systematic,
            averaging_strategy: ParticleAveragingStrategy::HighestWeight,
            ..Default::default()
        };
        let pf = ParticleFilter::from_config(&config, &Pose::new(1.0, 2.0, 0.0));
        assert_eq!(pf.num_particles(), 12);
        assert_eq!(pf.resampling_strategy, ParticleResamplingStrategy::Systematic);
        assert_eq!(pf.averaging_strategy, ParticleAveragingStrategy::HighestWeight);
    }
    #[test]
    fn test_debug_output() {
        let pf = filter_at(Pose::new(1.0, 2.0, 0.5), 4);
        let text = format!("{:?}", pf);
        assert!(text.contains("num_particles: 4"));
        assert!(text.contains("mean_pose"));
    }
}

//! Resampling schemes for the particle population.
//!
//! Every scheme draws `N` indices with replacement from a population of `N` weights, each index chosen
//! with probability proportional to its weight. The weights do not need to be normalized. The weight slice
//! is a snapshot taken before the population is rebuilt, so the new population never reads a half-written
//! old one.
//!
//! When no weight is strictly positive the draw is ill-defined. All schemes then collapse onto index 0
//! (a population of `N` copies of the first particle) and log a warning rather than failing. Callers that
//! want to detect divergence should watch [crate::particle::ParticleFilter::weight_sum].
use log::warn;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Resampling algorithm used by [crate::particle::ParticleFilter::resample].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum ParticleResamplingStrategy {
    /// Low-variance resampling wheel (default)
    #[default]
    Wheel,
    /// Systematic resampling: one random offset, N evenly spaced pointers on the cumulative weights
    Systematic,
    /// Independent inverse-CDF draws
    Multinomial,
}
impl ParticleResamplingStrategy {
    /// Indices of the particles that make up the next population.
    pub fn resample<R: Rng + ?Sized>(&self, weights: &[f64], rng: &mut R) -> Vec<usize> {
        match self {
            ParticleResamplingStrategy::Wheel => wheel_resample(weights, rng),
            ParticleResamplingStrategy::Systematic => systematic_resample(weights, rng),
            ParticleResamplingStrategy::Multinomial => multinomial_resample(weights, rng),
        }
    }
}

/// `true` when at least one weight is strictly positive (and finite sums are possible).
fn has_positive_weight(weights: &[f64]) -> bool {
    weights.iter().any(|&w| w > 0.0)
}

fn collapsed(n: usize) -> Vec<usize> {
    warn!("No particle has a positive weight; resampled population collapses onto particle 0");
    vec![0; n]
}

/// Low-variance resampling wheel.
///
/// Start at a uniformly random index with `beta = 0`. For each draw, add `U[0, 1) * 2 * max_weight` to
/// `beta`, then walk the wheel while `beta` exceeds the weight under the pointer, subtracting that weight
/// and advancing the pointer circularly. The index under the pointer is the draw. Expected work is O(N).
pub fn wheel_resample<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Vec<usize> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    if !has_positive_weight(weights) {
        return collapsed(n);
    }
    let max_weight = weights.iter().copied().fold(0.0, f64::max);
    let mut index = rng.random_range(0..n);
    let mut beta = 0.0;
    let mut indices = Vec::with_capacity(n);
    for _ in 0..n {
        beta += rng.random::<f64>() * 2.0 * max_weight;
        while beta > weights[index] {
            beta -= weights[index];
            index = (index + 1) % n;
        }
        indices.push(index);
    }
    indices
}

/// Systematic resampling on the normalized cumulative weights.
pub fn systematic_resample<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Vec<usize> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    if !has_positive_weight(weights) {
        return collapsed(n);
    }
    let cumulative = normalized_cumulative(weights);
    let step = 1.0 / n as f64;
    let offset = rng.random::<f64>() * step;
    let mut indices = Vec::with_capacity(n);
    let mut i = 0;
    for j in 0..n {
        let position = offset + j as f64 * step;
        while i < n - 1 && position > cumulative[i] {
            i += 1;
        }
        indices.push(i);
    }
    indices
}

/// Multinomial resampling: `N` independent inverse-CDF draws.
pub fn multinomial_resample<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Vec<usize> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    if !has_positive_weight(weights) {
        return collapsed(n);
    }
    let cumulative = normalized_cumulative(weights);
    (0..n)
        .map(|_| {
            let u: f64 = rng.random();
            cumulative.partition_point(|&c| c < u).min(n - 1)
        })
        .collect()
}

/// Cumulative sum of the weights divided by their total; negative and NaN weights count as zero.
fn normalized_cumulative(weights: &[f64]) -> Vec<f64> {
    let clean: Vec<f64> = weights
        .iter()
        .map(|&w| if w > 0.0 { w } else { 0.0 })
        .collect();
    let total: f64 = clean.iter().sum();
    let mut running = 0.0;
    clean
        .iter()
        .map(|w| {
            running += w;
            running / total
        })
        .collect()
}

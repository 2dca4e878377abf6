//! Integration tests for the landmark particle filter
//!
//! These tests drive the public API the way an external harness would: build a map, initialize the filter
//! from a noisy first fix, then run predict, update and resample cycles against simulated observations.

use assert_approx_eq::assert_approx_eq;
use mcl::Pose;
use mcl::geometry::map_to_vehicle;
use mcl::map::{Map, MapLandmark};
use mcl::measurements::{LandmarkNoise, LandmarkObservation};
use mcl::motion::{ControlInput, PoseNoise, propagate};
use mcl::particle::{ParticleAveragingStrategy, ParticleFilter};
use mcl::resampling::ParticleResamplingStrategy;
use mcl::sim::{Scenario, SimulationConfig, TrajectoryConfig, run_simulation, summarize};

/// Exact vehicle-frame observations of every landmark within `range` of `truth`
fn observe(truth: &Pose, map: &Map, range: f64) -> Vec<LandmarkObservation> {
    map.landmarks()
        .iter()
        .filter(|l| truth.distance_to(&Pose::new(l.x, l.y, 0.0)) <= range)
        .map(|l| {
            let (x, y) = map_to_vehicle(truth, l.x, l.y);
            LandmarkObservation::new(x, y)
        })
        .collect()
}

fn scattered_map() -> Map {
    Map::new(vec![
        MapLandmark::new(1, 92.064, -34.777),
        MapLandmark::new(2, 61.109, -47.132),
        MapLandmark::new(3, 17.42, -4.5993),
        MapLandmark::new(4, -7.1285, -34.54),
        MapLandmark::new(5, 232.32, 32.032),
        MapLandmark::new(6, 177.49, -77.824),
        MapLandmark::new(7, 64.746, -80.769),
        MapLandmark::new(8, 54.259, 1.6869),
        MapLandmark::new(9, 8.9427, -6.2008),
        MapLandmark::new(10, 124.88, 8.4758),
        MapLandmark::new(11, 30.0, 25.0),
        MapLandmark::new(12, 90.0, 20.0),
    ])
}

/// Run a manual loop and return the final position error of the estimate
fn track_straight_then_turn(strategy: ParticleResamplingStrategy) -> f64 {
    let map = scattered_map();
    let sensor_range = 50.0;
    let landmark_noise = LandmarkNoise::new(0.3, 0.3);
    let process_noise = PoseNoise::new(0.1, 0.1, 0.005);
    let dt = 0.1;

    let mut truth = Pose::new(6.2785, 1.9598, 0.0);
    let mut pf = ParticleFilter::initialize(
        &Pose::new(6.5, 1.8, 0.01),
        &PoseNoise::new(0.3, 0.3, 0.01),
        100,
        2024,
    );
    pf.resampling_strategy = strategy;

    let mut control = ControlInput::new(10.0, 0.0);
    for step in 0..150 {
        if step > 0 {
            pf.predict(dt, &process_noise, &control);
            truth = propagate(&truth, &control, dt);
        }
        let observations = observe(&truth, &map, sensor_range);
        pf.update_weights(sensor_range, &landmark_noise, &observations, &map);
        pf.resample();
        assert_eq!(pf.num_particles(), 100);
        if step == 80 {
            control = ControlInput::new(8.0, 0.15);
        }
    }
    pf.get_estimate().distance_to(&truth)
}

#[test]
fn test_tracks_known_trajectory_with_wheel() {
    let error = track_straight_then_turn(ParticleResamplingStrategy::Wheel);
    assert!(error < 1.0, "final position error {error:.3} m");
}

#[test]
fn test_tracks_known_trajectory_with_alternate_resamplers() {
    for strategy in [
        ParticleResamplingStrategy::Systematic,
        ParticleResamplingStrategy::Multinomial,
    ] {
        let error = track_straight_then_turn(strategy);
        assert!(error < 1.0, "{strategy:?}: final position error {error:.3} m");
    }
}

#[test]
fn test_update_concentrates_population_on_truth() {
    // A wide initial cloud; one update and resample should pull the estimate toward the truth.
    let map = Map::grid(5, 5, 15.0);
    let truth = Pose::new(30.0, 30.0, 0.0);
    let mut pf = ParticleFilter::initialize(
        &Pose::new(31.0, 29.0, 0.0),
        &PoseNoise::new(1.5, 1.5, 0.02),
        500,
        7,
    );
    pf.averaging_strategy = ParticleAveragingStrategy::UnweightedAverage;
    let before = pf.get_estimate().distance_to(&truth);
    let observations = observe(&truth, &map, 40.0);
    pf.update_weights(40.0, &LandmarkNoise::new(0.3, 0.3), &observations, &map);
    assert!(pf.weights().iter().all(|&w| w >= 0.0));
    assert!(pf.weight_sum() > 0.0);
    pf.resample();
    let after = pf.get_estimate().distance_to(&truth);
    assert!(after < before, "before {before:.3} m, after {after:.3} m");
    assert!(after < 1.0);
}

#[test]
fn test_best_particle_diagnostics_match_map() {
    let map = scattered_map();
    let truth = Pose::new(20.0, 0.0, 0.3);
    let mut pf = ParticleFilter::initialize(&truth, &PoseNoise::zero(), 5, 1);
    let observations = observe(&truth, &map, 30.0);
    pf.update_weights(30.0, &LandmarkNoise::new(0.3, 0.3), &observations, &map);
    let best = pf.best_particle();
    assert_eq!(best.associations.len(), observations.len());
    for ((id, x), y) in best.associations.iter().zip(&best.sense_x).zip(&best.sense_y) {
        let landmark = map.get(*id).unwrap();
        assert_approx_eq!(*x, landmark.x, 1e-9);
        assert_approx_eq!(*y, landmark.y, 1e-9);
    }
    let text = best.get_associations();
    let rendered: Vec<&str> = text.split(' ').collect();
    let ids: Vec<i32> = rendered.iter().map(|token| token.parse().unwrap()).collect();
    assert_eq!(ids, best.associations);
}

#[test]
fn test_simulated_run_converges() {
    let map = Map::grid(10, 10, 20.0);
    let config = SimulationConfig {
        trajectory: TrajectoryConfig {
            steps: 120,
            ..Default::default()
        },
        ..Default::default()
    };
    let scenario = Scenario::generate(&config, &map);
    let results = run_simulation(&config, &map, &scenario);
    let summary = summarize(&results);
    assert_eq!(summary.steps, 120);
    assert!(summary.mean_position_error < 1.0, "{summary}");
    assert!(summary.final_position_error < 2.0, "{summary}");
}

//! Nearest-neighbor data association.
//!
//! Each observation is matched to the closest predicted landmark by Euclidean distance. Matching is
//! one-to-many: several observations may be given the same landmark. Distances are compared with a strict
//! `<`, so on ties the landmark seen first wins. Both inputs must be in the same frame (the map frame in
//! the filter). Cost is O(P x M) for P observations and M predicted landmarks.
use crate::geometry::dist;
use crate::measurements::LandmarkObservation;

/// Nearest predicted landmark to the point `(x, y)`, or `None` when `predicted` is empty.
pub fn nearest<'a>(
    predicted: &'a [LandmarkObservation],
    x: f64,
    y: f64,
) -> Option<&'a LandmarkObservation> {
    let mut min_dist = f64::MAX;
    let mut best = None;
    for candidate in predicted {
        let distance = dist(x, y, candidate.x, candidate.y);
        if distance < min_dist {
            min_dist = distance;
            best = Some(candidate);
        }
    }
    best
}

/// Set the `id` of every observation to the id of its nearest predicted landmark.
///
/// The observations are mutated in place; this is part of the contract, not a side effect. Observations
/// with no candidate (empty `predicted`) get `None`. Any previous id is overwritten.
pub fn associate(predicted: &[LandmarkObservation], observations: &mut [LandmarkObservation]) {
    for observation in observations.iter_mut() {
        observation.id = nearest(predicted, observation.x, observation.y).and_then(|p| p.id);
    }
}

/// Non-mutating form of [`associate`] returning an annotated copy of `observations`.
pub fn associated(
    predicted: &[LandmarkObservation],
    observations: &[LandmarkObservation],
) -> Vec<LandmarkObservation> {
    let mut annotated = observations.to_vec();
    associate(predicted, &mut annotated);
    annotated
}

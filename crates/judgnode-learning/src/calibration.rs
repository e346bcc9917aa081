// crates/judgnode-learning/src/calibration.rs
// ============================================================================
// Module: Calibration Tracker
// Description: Sliding-window Brier score over (predicted probability,
//              observed outcome) pairs.
// Purpose: Tell the operator whether confidence scores are honest, not just
//          whether outcomes were good.
// Dependencies: none
// ============================================================================

//! ## Overview
//! [`CalibrationTracker::record`] appends one (predicted probability,
//! observed outcome) pair to a bounded window, evicting the oldest once the
//! window fills. [`CalibrationTracker::brier_score`] is the mean squared
//! error between prediction and outcome over the window: `0.0` is perfect,
//! `0.25` is what a constant `0.5` predictor scores against a balanced
//! outcome stream, and `1.0` is maximally wrong (confidently certain and
//! always incorrect).

use std::collections::VecDeque;
use std::sync::RwLock;

/// Tracks calibration of predicted probabilities against observed booleans
/// over a bounded sliding window.
pub struct CalibrationTracker {
    window: usize,
    samples: RwLock<VecDeque<(f64, bool)>>,
}

impl CalibrationTracker {
    /// Creates a tracker retaining at most `window` most-recent samples.
    /// `window` is clamped to at least `1`.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self { window: window.max(1), samples: RwLock::new(VecDeque::new()) }
    }

    /// Records one (predicted probability, observed outcome) pair.
    /// `predicted` is clamped to `0.0..=1.0`.
    pub fn record(&self, predicted: f64, observed: bool) {
        let predicted = predicted.clamp(0.0, 1.0);
        let mut samples = self.samples.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        samples.push_back((predicted, observed));
        while samples.len() > self.window {
            samples.pop_front();
        }
    }

    /// Mean squared error between prediction and outcome over the window.
    /// `0.0` with no recorded samples.
    #[must_use]
    pub fn brier_score(&self) -> f64 {
        let samples = self.samples.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        if samples.is_empty() {
            return 0.0;
        }
        let sum: f64 = samples
            .iter()
            .map(|(predicted, observed)| {
                let outcome = if *observed { 1.0 } else { 0.0 };
                (predicted - outcome).powi(2)
            })
            .sum();
        #[allow(clippy::cast_precision_loss, reason = "window lengths stay far below f64's exact-integer range")]
        let count = samples.len() as f64;
        sum / count
    }

    /// Number of samples currently retained.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        let samples = self.samples.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        samples.len()
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use super::*;

    #[test]
    fn an_empty_tracker_scores_zero() {
        let tracker = CalibrationTracker::new(10);
        assert_eq!(tracker.brier_score(), 0.0);
    }

    #[test]
    fn perfectly_calibrated_predictions_score_zero() {
        let tracker = CalibrationTracker::new(10);
        tracker.record(1.0, true);
        tracker.record(0.0, false);
        assert_eq!(tracker.brier_score(), 0.0);
    }

    #[test]
    fn a_confident_wrong_prediction_scores_near_one() {
        let tracker = CalibrationTracker::new(10);
        tracker.record(1.0, false);
        assert!((tracker.brier_score() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn a_constant_half_predictor_scores_a_quarter() {
        let tracker = CalibrationTracker::new(10);
        tracker.record(0.5, true);
        tracker.record(0.5, false);
        assert!((tracker.brier_score() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn the_window_evicts_the_oldest_sample_once_full() {
        let tracker = CalibrationTracker::new(2);
        tracker.record(1.0, true); // will be evicted
        tracker.record(1.0, false);
        tracker.record(1.0, false);
        assert_eq!(tracker.sample_count(), 2);
        assert!((tracker.brier_score() - 1.0).abs() < f64::EPSILON);
    }
}

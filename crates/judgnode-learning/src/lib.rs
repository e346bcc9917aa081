// crates/judgnode-learning/src/lib.rs
// ============================================================================
// Module: Judgment Node Learning
// Description: Q-learning feedback loop with a forgetting guard, plus Brier
//              calibration tracking.
// Purpose: Let outcomes feed back into future routing/intervention choices
//          without overwriting settled lessons on the next noisy sample.
// Dependencies: judgnode-config
// ============================================================================

//! ## Overview
//! Two independent pieces: [`qtable::QLearner`], a tabular Q-learner over
//! opaque `(context, action)` string tags with an elastic-weight-
//! consolidation-style forgetting guard, and [`calibration::CalibrationTracker`],
//! a sliding-window Brier score over predicted-probability/observed-outcome
//! pairs. Neither depends on any concrete event, judgment, or domain type —
//! callers supply their own string tags and booleans.

pub mod calibration;
pub mod qtable;

pub use calibration::CalibrationTracker;
pub use qtable::QLearner;

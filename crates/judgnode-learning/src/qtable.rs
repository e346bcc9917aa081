// crates/judgnode-learning/src/qtable.rs
// ============================================================================
// Module: Q-Table
// Description: Tabular Q-learning over opaque context/action tags with an
//              elastic-weight-consolidation-style forgetting guard.
// Purpose: Let the orchestrator nudge future routing/intervention choices
//          toward what previously worked, without forgetting settled lessons
//          every time a new one arrives.
// Dependencies: judgnode-config
// ============================================================================

//! ## Overview
//! [`QLearner`] keeps one value per `(context, action)` pair and updates it
//! with the standard Q-learning rule. Alongside the value it tracks a
//! Welford running variance of that pair's TD error — its "importance" — and
//! periodically (every [`judgnode_config::LearningConfig::consolidation_interval`]
//! episodes) freezes a snapshot of the table. Once a pair has a snapshot,
//! later updates add a penalty proportional to `importance * (value -
//! snapshot)`, so pairs that have historically had low-variance (settled,
//! important) TD error resist being dragged away from their consolidated
//! value by a handful of recent, noisy observations.

use std::collections::HashMap;
use std::sync::RwLock;

use judgnode_config::LearningConfig;

type Key = (String, String);

#[derive(Debug, Clone, Copy, Default)]
struct TdStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl TdStats {
    fn observe(&mut self, td_error: f64) {
        self.count += 1;
        let delta = td_error - self.mean;
        #[allow(clippy::cast_precision_loss, reason = "episode counts stay far below f64's exact-integer range")]
        let count = self.count as f64;
        self.mean += delta / count;
        let delta2 = td_error - self.mean;
        self.m2 += delta * delta2;
    }

    fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            #[allow(
                clippy::cast_precision_loss,
                reason = "episode counts stay far below f64's exact-integer range"
            )]
            let denom = (self.count - 1) as f64;
            self.m2 / denom
        }
    }
}

struct State {
    q: HashMap<Key, f64>,
    stats: HashMap<Key, TdStats>,
    snapshot: HashMap<Key, f64>,
    episode: u32,
}

/// Tabular Q-learner with a consolidation-based forgetting guard.
///
/// # Invariants
/// - A `(context, action)` pair absent from the table has an implicit value
///   of `0.0`.
/// - `snapshot` only contains entries as of the most recent consolidation;
///   it is empty until the first one fires.
pub struct QLearner {
    config: LearningConfig,
    state: RwLock<State>,
}

impl QLearner {
    /// Creates a learner with an empty table and no prior episodes.
    #[must_use]
    pub fn new(config: LearningConfig) -> Self {
        Self {
            config,
            state: RwLock::new(State {
                q: HashMap::new(),
                stats: HashMap::new(),
                snapshot: HashMap::new(),
                episode: 0,
            }),
        }
    }

    /// Returns the current value for `(context, action)`, or `0.0` if unseen.
    #[must_use]
    pub fn q_value(&self, context: &str, action: &str) -> f64 {
        let state = self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.q.get(&(context.to_string(), action.to_string())).copied().unwrap_or(0.0)
    }

    /// Returns the action in `candidates` with the highest value for
    /// `context`, breaking ties by first occurrence. `None` if `candidates`
    /// is empty.
    #[must_use]
    pub fn best_action(&self, context: &str, candidates: &[String]) -> Option<(String, f64)> {
        let state = self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        candidates
            .iter()
            .map(|action| {
                let value = state.q.get(&(context.to_string(), action.clone())).copied().unwrap_or(0.0);
                (action.clone(), value)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Applies one Bellman update for `(context, action)` given `reward` and
    /// the set of actions available from `next_context`, and returns the new
    /// value.
    ///
    /// `Q(s,a) <- Q(s,a) + alpha * (target - Q(s,a))`, where `target = reward
    /// + gamma * max_a' Q(s',a')`, reduced by an elastic penalty once the
    /// pair has a consolidated snapshot.
    pub fn update(&self, context: &str, action: &str, reward: f64, next_context: &str, next_actions: &[String]) -> f64 {
        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let key = (context.to_string(), action.to_string());
        let current = state.q.get(&key).copied().unwrap_or(0.0);

        let max_next = next_actions
            .iter()
            .map(|a| state.q.get(&(next_context.to_string(), a.clone())).copied().unwrap_or(0.0))
            .fold(f64::NEG_INFINITY, f64::max);
        let max_next = if max_next.is_finite() { max_next } else { 0.0 };

        let td_target = reward + self.config.gamma * max_next;
        let td_error = td_target - current;

        let stats = state.stats.entry(key.clone()).or_default();
        stats.observe(td_error);
        let importance = stats.variance();

        let penalty_gradient = state
            .snapshot
            .get(&key)
            .map_or(0.0, |&snapshot_value| self.config.lambda * importance * (current - snapshot_value));

        let new_value = current + self.config.alpha * (td_error - penalty_gradient);
        state.q.insert(key, new_value);
        new_value
    }

    /// Marks the end of an episode. Every `consolidation_interval` episodes,
    /// freezes a snapshot of the current table for future penalty
    /// comparisons.
    pub fn end_episode(&self) {
        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.episode += 1;
        if state.episode % self.config.consolidation_interval == 0 {
            state.snapshot = state.q.clone();
        }
    }

    /// Number of episodes completed via [`Self::end_episode`].
    #[must_use]
    pub fn episode_count(&self) -> u32 {
        let state = self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.episode
    }

    /// Number of distinct `(context, action)` pairs with a recorded value.
    #[must_use]
    pub fn len(&self) -> usize {
        let state = self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.q.len()
    }

    /// True if no pair has been updated yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mean value across every recorded `(context, action)` pair, or `0.0`
    /// when the table is empty.
    #[must_use]
    pub fn avg_value(&self) -> f64 {
        let state = self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.q.is_empty() {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss, reason = "table sizes stay far below f64's exact-integer range")]
        let count = state.q.len() as f64;
        state.q.values().sum::<f64>() / count
    }

    /// Largest absolute distance between a pair's current value and its
    /// value at the last consolidation, or `0.0` before the first snapshot.
    #[must_use]
    pub fn max_drift(&self) -> f64 {
        let state = self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        state
            .snapshot
            .iter()
            .map(|(key, &snapshot_value)| (state.q.get(key).copied().unwrap_or(snapshot_value) - snapshot_value).abs())
            .fold(0.0, f64::max)
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
    fn an_unseen_pair_defaults_to_zero() {
        let learner = QLearner::new(LearningConfig::default());
        assert_eq!(learner.q_value("ctx", "act"), 0.0);
        assert!(learner.is_empty());
    }

    #[test]
    fn a_positive_reward_increases_the_value_toward_the_reward() {
        let learner = QLearner::new(LearningConfig::default());
        let updated = learner.update("ctx", "act", 1.0, "ctx2", &[]);
        assert!(updated > 0.0, "value should move toward the observed reward");
        assert_eq!(learner.len(), 1);
    }

    #[test]
    fn repeated_consistent_rewards_converge_toward_the_reward() {
        let learner = QLearner::new(LearningConfig::default());
        let mut last = 0.0;
        for _ in 0..200 {
            last = learner.update("ctx", "act", 1.0, "ctx2", &[]);
        }
        assert!((last - 1.0).abs() < 0.05, "value {last} should converge near 1.0");
    }

    #[test]
    fn best_action_picks_the_highest_valued_candidate() {
        let learner = QLearner::new(LearningConfig::default());
        learner.update("ctx", "a", 1.0, "next", &[]);
        learner.update("ctx", "b", -1.0, "next", &[]);
        let (action, value) =
            learner.best_action("ctx", &["a".to_string(), "b".to_string()]).expect("candidates non-empty");
        assert_eq!(action, "a");
        assert!(value > 0.0);
    }

    #[test]
    fn best_action_on_empty_candidates_is_none() {
        let learner = QLearner::new(LearningConfig::default());
        assert!(learner.best_action("ctx", &[]).is_none());
    }

    #[test]
    fn consolidation_fires_exactly_at_the_configured_interval() {
        let config = LearningConfig { consolidation_interval: 3, ..LearningConfig::default() };
        let learner = QLearner::new(config);
        learner.update("ctx", "act", 1.0, "next", &[]);
        learner.end_episode();
        learner.end_episode();
        assert_eq!(learner.episode_count(), 2);
        learner.end_episode();
        assert_eq!(learner.episode_count(), 3);
    }

    #[test]
    fn a_snapshotted_pair_resists_drift_toward_a_new_conflicting_reward() {
        let settle_and_conflict = |lambda: f64| {
            let config = LearningConfig { consolidation_interval: 20, lambda, ..LearningConfig::default() };
            let learner = QLearner::new(config);
            for _ in 0..20 {
                learner.update("ctx", "act", 1.0, "next", &[]);
                learner.end_episode();
            }
            let mut value = learner.q_value("ctx", "act");
            for _ in 0..10 {
                value = learner.update("ctx", "act", -1.0, "next", &[]);
            }
            value
        };

        let without_penalty = settle_and_conflict(0.0);
        let with_penalty = settle_and_conflict(5.0);
        assert!(
            with_penalty > without_penalty,
            "a consolidated, important pair ({with_penalty}) should drift less toward \
             the conflicting reward than an unpenalized one ({without_penalty})"
        );
    }

    #[test]
    fn avg_value_is_zero_on_an_empty_table() {
        let learner = QLearner::new(LearningConfig::default());
        assert_eq!(learner.avg_value(), 0.0);
    }

    #[test]
    fn avg_value_tracks_the_mean_of_recorded_pairs() {
        let learner = QLearner::new(LearningConfig::default());
        learner.update("ctx", "a", 1.0, "next", &[]);
        learner.update("ctx", "b", -1.0, "next", &[]);
        assert!(learner.avg_value().abs() < 0.05, "symmetric rewards should average near zero");
    }

    #[test]
    fn max_drift_is_zero_before_any_consolidation() {
        let learner = QLearner::new(LearningConfig::default());
        learner.update("ctx", "act", 1.0, "next", &[]);
        assert_eq!(learner.max_drift(), 0.0);
    }

    #[test]
    fn max_drift_grows_once_a_snapshotted_pair_is_pulled_away() {
        let config = LearningConfig { consolidation_interval: 1, ..LearningConfig::default() };
        let learner = QLearner::new(config);
        learner.update("ctx", "act", 1.0, "next", &[]);
        learner.end_episode();
        learner.update("ctx", "act", -1.0, "next", &[]);
        assert!(learner.max_drift() > 0.0);
    }
}

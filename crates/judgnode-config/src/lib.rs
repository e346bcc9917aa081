// crates/judgnode-config/src/lib.rs
// ============================================================================
// Module: Judgment Node Config
// Description: Single settings structure threaded to every component.
// Purpose: Replace process-wide mutable configuration with explicit construction.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! [`Settings`] is the one configuration structure in the system (design note
//! in spec.md §9: "a single settings structure threaded to components on
//! construction. No process-wide mutable configuration."). It is constructed
//! once — typically via [`Settings::from_toml_str`] or [`Settings::default`]
//! — validated with [`Settings::validate`], and then handed by reference or
//! clone to every component that needs a threshold, capacity, or deadline.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// The five trust-tier cutoffs, overridable via `trust_thresholds`.
///
/// # Invariants
/// - `guardian > steward > builder > contributor >= 0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustThresholds {
    /// Minimum trust value for the `guardian` tier.
    pub guardian: f64,
    /// Minimum trust value for the `steward` tier.
    pub steward: f64,
    /// Minimum trust value for the `builder` tier.
    pub builder: f64,
    /// Minimum trust value for the `contributor` tier; below this is `observer`.
    pub contributor: f64,
}

impl Default for TrustThresholds {
    fn default() -> Self {
        Self {
            guardian: 61.8,
            steward: 38.2,
            builder: 30.0,
            contributor: 15.0,
        }
    }
}

/// Chain slot closure configuration (spec.md Open Question, resolved in
/// SPEC_FULL.md §4: explicit close always wins; otherwise size-then-idle).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Number of pending judgments that triggers an automatic slot close.
    pub slot_judgment_limit: u32,
    /// Milliseconds of inactivity that triggers an automatic slot close.
    pub idle_close_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            slot_judgment_limit: 64,
            idle_close_ms: 30_000,
        }
    }
}

/// Circuit breaker tuning shared by every guarded external call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircuitConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Base backoff, in milliseconds, before the first half-open probe.
    pub base_backoff_ms: u64,
    /// Backoff ceiling, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            base_backoff_ms: 250,
            max_backoff_ms: 60_000,
        }
    }
}

/// Skill registry invocation tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillConfig {
    /// Per-invocation deadline, in milliseconds.
    pub deadline_ms: u64,
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 5_000,
        }
    }
}

/// The five alert thresholds published by the Metrics Collector / Alert Manager.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsThresholds {
    /// Alert fires when the average judgment (Brier calibration) score exceeds this.
    pub avg_judgment_score_floor: f64,
    /// Alert fires when cache hit rate drops below this (0.0..=1.0).
    pub cache_hit_rate_floor: f64,
    /// Alert fires on any chain integrity failure (always true; kept for symmetry).
    pub chain_integrity_required: bool,
    /// Alert fires on any drift value at or above `critical`.
    pub critical_drift_ceiling: f64,
    /// Session idle time, in milliseconds, beyond which an alert fires.
    pub session_idle_ms: u64,
}

impl Default for MetricsThresholds {
    fn default() -> Self {
        Self {
            avg_judgment_score_floor: 0.25,
            cache_hit_rate_floor: 0.5,
            chain_integrity_required: true,
            critical_drift_ceiling: 0.8,
            session_idle_ms: 24 * 60 * 60 * 1000,
        }
    }
}

/// Decision tracer ring buffer capacity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TraceConfig {
    /// Number of most-recent decision records retained in memory.
    pub capacity: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            capacity: 500,
        }
    }
}

/// Q-learning feedback loop tuning: learning rate, discount, forgetting-guard
/// regularization weight, and the consolidation episode interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Learning rate (`alpha`) applied to each TD update.
    pub alpha: f64,
    /// Discount factor (`gamma`) applied to the next state's best value.
    pub gamma: f64,
    /// Regularization weight (`lambda`) penalizing drift on important entries.
    pub lambda: f64,
    /// Episodes between consolidation snapshots.
    pub consolidation_interval: u32,
    /// Sliding window length for Brier-score calibration tracking.
    pub calibration_window: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            gamma: 0.9,
            lambda: 0.1,
            consolidation_interval: 100,
            calibration_window: 200,
        }
    }
}

/// Trigger Engine thresholds and per-kind cooldowns.
///
/// # Invariants
/// - Every `*_cooldown_ms` field is in the 2-30 minute range the trigger
///   engine documents (not enforced here; `validate` checks only non-zero).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Errors of the same kind within the window that fire `error-pattern`.
    pub error_pattern_count: u32,
    /// Window, in milliseconds, `error-pattern` counts errors over.
    pub error_pattern_window_ms: u64,
    /// Cooldown, in milliseconds, between `error-pattern` fires.
    pub error_pattern_cooldown_ms: u64,
    /// Goal/focus token-overlap ceiling below which `context-drift` fires.
    pub context_drift_overlap_ceiling: f64,
    /// Cooldown, in milliseconds, between `context-drift` fires.
    pub context_drift_cooldown_ms: u64,
    /// Energy-metric ceiling below which `burnout-risk` fires (default φ⁻²).
    pub burnout_energy_ceiling: f64,
    /// Cooldown, in milliseconds, between `burnout-risk` fires.
    pub burnout_cooldown_ms: u64,
    /// Confidence floor above which `pattern-match` fires (default φ⁻¹).
    pub pattern_match_confidence_floor: f64,
    /// Cooldown, in milliseconds, between `pattern-match` fires.
    pub pattern_match_cooldown_ms: u64,
    /// Deadline proximity, in milliseconds, at or under which `deadline-near` fires.
    pub deadline_near_ms: u64,
    /// Cooldown, in milliseconds, between `deadline-near` fires.
    pub deadline_near_cooldown_ms: u64,
    /// Occurrence count at or above which `learning-opp` fires.
    pub learning_opp_min_occurrences: u32,
    /// Cooldown, in milliseconds, between `learning-opp` fires.
    pub learning_opp_cooldown_ms: u64,
    /// Minimum collective-vote consensus required to surface a fired suggestion (default φ⁻¹).
    pub collective_vote_floor: f64,
    /// Time, in milliseconds, a pending suggestion may remain unresolved before expiring (default 5 minutes).
    pub suggestion_ttl_ms: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            error_pattern_count: 3,
            error_pattern_window_ms: 5 * 60 * 1000,
            error_pattern_cooldown_ms: 5 * 60 * 1000,
            context_drift_overlap_ceiling: 0.5,
            context_drift_cooldown_ms: 10 * 60 * 1000,
            burnout_energy_ceiling: judgnode_core::PHI_INV2,
            burnout_cooldown_ms: 15 * 60 * 1000,
            pattern_match_confidence_floor: judgnode_core::PHI_INV,
            pattern_match_cooldown_ms: 10 * 60 * 1000,
            deadline_near_ms: 24 * 60 * 60 * 1000,
            deadline_near_cooldown_ms: 30 * 60 * 1000,
            learning_opp_min_occurrences: 3,
            learning_opp_cooldown_ms: 20 * 60 * 1000,
            collective_vote_floor: judgnode_core::PHI_INV,
            suggestion_ttl_ms: 5 * 60 * 1000,
        }
    }
}

/// Per-user session state tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Idle time, in milliseconds, after which a session is evicted.
    pub idle_eviction_ms: u64,
    /// TTL, in milliseconds, within which `match-feedback` still links to
    /// the last recorded judgment.
    pub last_judgment_ttl_ms: u64,
    /// Number of most-recent tracked events retained per session.
    pub recent_events_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_eviction_ms: 24 * 60 * 60 * 1000,
            last_judgment_ttl_ms: 10 * 60 * 1000,
            recent_events_capacity: 10,
        }
    }
}

/// In-memory queue sizing for the default notification sink.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Maximum notifications buffered before the oldest is dropped.
    pub queue_capacity: usize,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

/// Every configuration option enumerated in spec.md §6, gathered into one
/// structure threaded to components at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Upper bound placed on every returned confidence (default φ⁻¹).
    pub confidence_cap: f64,
    /// Trust-tier cutoffs.
    pub trust_thresholds: TrustThresholds,
    /// Chain slot closure configuration.
    pub chain: ChainConfig,
    /// Circuit breaker tuning.
    pub circuit: CircuitConfig,
    /// Skill registry tuning.
    pub skill: SkillConfig,
    /// Alert thresholds.
    pub metrics_thresholds: MetricsThresholds,
    /// Decision tracer configuration.
    pub trace: TraceConfig,
    /// Q-learning feedback loop tuning.
    pub learning: LearningConfig,
    /// Trigger engine thresholds and cooldowns.
    pub trigger: TriggerConfig,
    /// Session state tuning.
    pub session: SessionConfig,
    /// Notification sink queue sizing.
    pub notify: NotifyConfig,
    /// Opaque extension bag for embedder-specific settings not modeled above.
    pub extra: BTreeMap<String, toml::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            confidence_cap: judgnode_core::PHI_INV,
            trust_thresholds: TrustThresholds::default(),
            chain: ChainConfig::default(),
            circuit: CircuitConfig::default(),
            skill: SkillConfig::default(),
            metrics_thresholds: MetricsThresholds::default(),
            trace: TraceConfig::default(),
            learning: LearningConfig::default(),
            trigger: TriggerConfig::default(),
            session: SessionConfig::default(),
            notify: NotifyConfig::default(),
            extra: BTreeMap::new(),
        }
    }
}

/// Errors raised while loading or validating [`Settings`].
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The TOML document could not be parsed.
    #[error("invalid settings toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// A validation invariant was violated.
    #[error("invalid settings: {0}")]
    Validation(String),
}

impl Settings {
    /// Loads settings from a TOML document, falling back to defaults for any
    /// field the document omits (`#[serde(default)]` on every field).
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Parse`] when the document is not valid TOML,
    /// or a parse-time validation error if a field is the wrong shape.
    pub fn from_toml_str(document: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(document)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validates cross-field invariants that `serde` alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Validation`] describing the first invariant
    /// violated.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let t = &self.trust_thresholds;
        if !(t.guardian > t.steward && t.steward > t.builder && t.builder > t.contributor) {
            return Err(SettingsError::Validation(
                "trust_thresholds must satisfy guardian > steward > builder > contributor".to_string(),
            ));
        }
        if t.contributor < 0.0 {
            return Err(SettingsError::Validation("trust_thresholds.contributor must be >= 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence_cap) {
            return Err(SettingsError::Validation("confidence_cap must be in 0.0..=1.0".to_string()));
        }
        if self.chain.slot_judgment_limit == 0 {
            return Err(SettingsError::Validation("chain.slot_judgment_limit must be > 0".to_string()));
        }
        if self.circuit.base_backoff_ms == 0 || self.circuit.base_backoff_ms > self.circuit.max_backoff_ms {
            return Err(SettingsError::Validation(
                "circuit.base_backoff_ms must be > 0 and <= circuit.max_backoff_ms".to_string(),
            ));
        }
        if self.circuit.failure_threshold == 0 {
            return Err(SettingsError::Validation("circuit.failure_threshold must be > 0".to_string()));
        }
        if self.skill.deadline_ms == 0 {
            return Err(SettingsError::Validation("skill.deadline_ms must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.metrics_thresholds.cache_hit_rate_floor) {
            return Err(SettingsError::Validation(
                "metrics_thresholds.cache_hit_rate_floor must be in 0.0..=1.0".to_string(),
            ));
        }
        if self.trace.capacity == 0 {
            return Err(SettingsError::Validation("trace.capacity must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.learning.alpha) {
            return Err(SettingsError::Validation("learning.alpha must be in 0.0..=1.0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.learning.gamma) {
            return Err(SettingsError::Validation("learning.gamma must be in 0.0..=1.0".to_string()));
        }
        if self.learning.lambda < 0.0 {
            return Err(SettingsError::Validation("learning.lambda must be >= 0".to_string()));
        }
        if self.learning.consolidation_interval == 0 {
            return Err(SettingsError::Validation("learning.consolidation_interval must be > 0".to_string()));
        }
        if self.learning.calibration_window == 0 {
            return Err(SettingsError::Validation("learning.calibration_window must be > 0".to_string()));
        }
        if self.trigger.error_pattern_count == 0 {
            return Err(SettingsError::Validation("trigger.error_pattern_count must be > 0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.trigger.context_drift_overlap_ceiling) {
            return Err(SettingsError::Validation(
                "trigger.context_drift_overlap_ceiling must be in 0.0..=1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.trigger.burnout_energy_ceiling) {
            return Err(SettingsError::Validation("trigger.burnout_energy_ceiling must be in 0.0..=1.0".to_string()));
        }
        if !(0.0..=1.0).contains(&self.trigger.pattern_match_confidence_floor) {
            return Err(SettingsError::Validation(
                "trigger.pattern_match_confidence_floor must be in 0.0..=1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.trigger.collective_vote_floor) {
            return Err(SettingsError::Validation("trigger.collective_vote_floor must be in 0.0..=1.0".to_string()));
        }
        if self.trigger.suggestion_ttl_ms == 0 {
            return Err(SettingsError::Validation("trigger.suggestion_ttl_ms must be > 0".to_string()));
        }
        if self.session.idle_eviction_ms == 0 {
            return Err(SettingsError::Validation("session.idle_eviction_ms must be > 0".to_string()));
        }
        if self.session.last_judgment_ttl_ms == 0 {
            return Err(SettingsError::Validation("session.last_judgment_ttl_ms must be > 0".to_string()));
        }
        if self.session.recent_events_capacity == 0 {
            return Err(SettingsError::Validation("session.recent_events_capacity must be > 0".to_string()));
        }
        if self.notify.queue_capacity == 0 {
            return Err(SettingsError::Validation("notify.queue_capacity must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::Settings;

    #[test]
    fn defaults_validate() {
        Settings::default().validate().expect("defaults are valid");
    }

    #[test]
    fn rejects_out_of_order_trust_thresholds() {
        let mut settings = Settings::default();
        settings.trust_thresholds.builder = 90.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_confidence_cap_out_of_range() {
        let mut settings = Settings::default();
        settings.confidence_cap = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn partial_toml_document_fills_in_defaults() {
        let settings = Settings::from_toml_str("confidence_cap = 0.5\n").expect("valid partial document");
        assert_eq!(settings.confidence_cap, 0.5);
        assert_eq!(settings.chain.slot_judgment_limit, 64);
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(Settings::from_toml_str("not = [valid").is_err());
    }

    #[test]
    fn rejects_zero_notify_queue_capacity() {
        let mut settings = Settings::default();
        settings.notify.queue_capacity = 0;
        assert!(settings.validate().is_err());
    }
}

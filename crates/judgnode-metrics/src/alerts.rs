// crates/judgnode-metrics/src/alerts.rs
// ============================================================================
// Module: Alert Manager
// Description: Threshold evaluation over a metrics snapshot with fire/clear
//              diffing across collect cycles.
// Purpose: Turn the five published thresholds into addressable, explicitly
//          clearable alerts.
// Dependencies: judgnode-core, judgnode-config
// ============================================================================

//! ## Overview
//! [`AlertManager::evaluate`] reads the conventional fields documented on
//! [`crate::collector`] out of a [`MetricsSnapshot`] and compares the
//! resulting alert set against the previous cycle's: newly-breached
//! thresholds are reported as `fired`, no-longer-breached ones as `cleared`.
//! The manager is the sole mutator of its active-alert set; [`AlertManager::clear`]
//! removes one by type without waiting for the underlying metric to recover.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use judgnode_config::MetricsThresholds;
use judgnode_core::Clock;
use judgnode_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

use crate::collector::MetricsSnapshot;

/// Severity of a fired [`Alert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AlertLevel {
    /// Informational; no action required.
    Info,
    /// Attention warranted.
    Warning,
    /// Requires immediate attention.
    Critical,
}

/// One threshold breach, addressable by `alert_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Unique key identifying which threshold fired.
    pub alert_type: String,
    /// Severity.
    pub level: AlertLevel,
    /// Human-readable description.
    pub message: String,
    /// The observed value that breached the threshold.
    pub value: f64,
    /// The configured threshold.
    pub threshold: f64,
    /// When this alert first fired.
    pub fired_at: Timestamp,
}

/// Result of one [`AlertManager::evaluate`] cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertDiff {
    /// Alerts newly active this cycle.
    pub fired: Vec<Alert>,
    /// Alerts active last cycle but not this one.
    pub cleared: Vec<Alert>,
}

/// Evaluates the five published thresholds and tracks which are currently
/// breached.
///
/// # Invariants
/// - An alert type appears in `active` iff its threshold was breached on the
///   most recent `evaluate` call, or it was fired and not yet cleared by
///   either `evaluate` or an explicit `clear`.
pub struct AlertManager {
    thresholds: MetricsThresholds,
    clock: Arc<dyn Clock>,
    active: RwLock<BTreeMap<String, Alert>>,
}

impl AlertManager {
    /// Creates a manager with no active alerts.
    #[must_use]
    pub fn new(thresholds: MetricsThresholds, clock: Arc<dyn Clock>) -> Self {
        Self { thresholds, clock, active: RwLock::new(BTreeMap::new()) }
    }

    /// Returns the currently active alerts, in `alert_type` order.
    #[must_use]
    pub fn active(&self) -> Vec<Alert> {
        let active = self.active.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        active.values().cloned().collect()
    }

    /// Clears an alert by type regardless of whether its metric has
    /// recovered. Returns true if an alert was present to clear.
    pub fn clear(&self, alert_type: &str) -> bool {
        let mut active = self.active.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        active.remove(alert_type).is_some()
    }

    /// Directly activates `alert`, bypassing threshold evaluation.
    ///
    /// For failures that are events rather than a continuously-sampled
    /// metric field (a chain append failure, say) and so have no snapshot
    /// field for [`Self::evaluate`] to read on the next cycle. A later
    /// `evaluate` call may still clear it if its `alert_type` happens to
    /// match a threshold-derived one; otherwise it stays active until an
    /// explicit [`Self::clear`].
    pub fn raise(&self, alert: Alert) {
        let mut active = self.active.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        active.insert(alert.alert_type.clone(), alert);
    }

    /// Evaluates the published thresholds against `snapshot`, updates the
    /// active set, and returns what fired/cleared this cycle.
    pub fn evaluate(&self, snapshot: &MetricsSnapshot) -> AlertDiff {
        let now = self.clock.now();
        let mut breached = BTreeMap::new();
        for candidate in self.candidates(snapshot, now) {
            breached.insert(candidate.alert_type.clone(), candidate);
        }

        let mut active = self.active.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut fired = Vec::new();
        for (alert_type, alert) in &breached {
            if !active.contains_key(alert_type) {
                fired.push(alert.clone());
            }
        }
        let mut cleared = Vec::new();
        for (alert_type, alert) in active.iter() {
            if !breached.contains_key(alert_type) {
                cleared.push(alert.clone());
            }
        }
        for alert_type in cleared.iter().map(|alert| alert.alert_type.clone()) {
            active.remove(&alert_type);
        }
        for (alert_type, alert) in breached {
            active.entry(alert_type).or_insert(alert);
        }

        AlertDiff { fired, cleared }
    }

    fn candidates(&self, snapshot: &MetricsSnapshot, now: Timestamp) -> Vec<Alert> {
        let mut candidates = Vec::new();

        let avg_score = snapshot
            .field("learning", "avg_judgment_score")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(1.0);
        if avg_score < self.thresholds.avg_judgment_score_floor {
            candidates.push(Alert {
                alert_type: "avg-judgment-score-low".to_string(),
                level: AlertLevel::Warning,
                message: "average judgment score has dropped below the configured floor".to_string(),
                value: avg_score,
                threshold: self.thresholds.avg_judgment_score_floor,
                fired_at: now,
            });
        }

        let cache_hit_rate =
            snapshot.field("system", "cache_hit_rate").and_then(serde_json::Value::as_f64).unwrap_or(1.0);
        if cache_hit_rate < self.thresholds.cache_hit_rate_floor {
            candidates.push(Alert {
                alert_type: "cache-hit-rate-low".to_string(),
                level: AlertLevel::Warning,
                message: "cache hit rate has dropped below the configured floor".to_string(),
                value: cache_hit_rate,
                threshold: self.thresholds.cache_hit_rate_floor,
                fired_at: now,
            });
        }

        let integrity_ok =
            snapshot.field("chain", "integrity_ok").and_then(serde_json::Value::as_bool).unwrap_or(true);
        if self.thresholds.chain_integrity_required && !integrity_ok {
            candidates.push(Alert {
                alert_type: "chain-integrity-failed".to_string(),
                level: AlertLevel::Critical,
                message: "chain integrity verification failed".to_string(),
                value: 0.0,
                threshold: 1.0,
                fired_at: now,
            });
        }

        let max_drift = snapshot.field("learning", "max_drift").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
        if max_drift >= self.thresholds.critical_drift_ceiling {
            candidates.push(Alert {
                alert_type: "critical-drift".to_string(),
                level: AlertLevel::Critical,
                message: "a tracked pattern has drifted at or above the critical ceiling".to_string(),
                value: max_drift,
                threshold: self.thresholds.critical_drift_ceiling,
                fired_at: now,
            });
        }

        let max_idle_ms =
            snapshot.field("session", "max_idle_ms").and_then(serde_json::Value::as_u64).unwrap_or(0);
        if max_idle_ms as f64 > self.thresholds.session_idle_ms as f64 {
            candidates.push(Alert {
                alert_type: "session-idle-exceeded".to_string(),
                level: AlertLevel::Info,
                message: "a session has been idle longer than its configured TTL".to_string(),
                value: max_idle_ms as f64,
                threshold: self.thresholds.session_idle_ms as f64,
                fired_at: now,
            });
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use std::collections::BTreeMap;

    use judgnode_core::FixedClock;
    use serde_json::json;

    use super::*;

    fn snapshot(sections: BTreeMap<String, serde_json::Value>) -> MetricsSnapshot {
        MetricsSnapshot { taken_at: Timestamp::from_millis(0), uptime_ms: 0, sections }
    }

    #[test]
    fn a_breach_fires_once_and_clears_on_recovery() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let manager = AlertManager::new(MetricsThresholds::default(), clock);

        let mut sections = BTreeMap::new();
        sections.insert("chain".to_string(), json!({"integrity_ok": false}));
        let diff = manager.evaluate(&snapshot(sections.clone()));
        assert_eq!(diff.fired.len(), 1);
        assert_eq!(diff.fired[0].alert_type, "chain-integrity-failed");
        assert_eq!(manager.active().len(), 1);

        let diff = manager.evaluate(&snapshot(sections));
        assert!(diff.fired.is_empty(), "already-active alert must not re-fire");

        sections = BTreeMap::new();
        sections.insert("chain".to_string(), json!({"integrity_ok": true}));
        let diff = manager.evaluate(&snapshot(sections));
        assert_eq!(diff.cleared.len(), 1);
        assert!(manager.active().is_empty());
    }

    #[test]
    fn manual_clear_removes_an_alert_without_recovery() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let manager = AlertManager::new(MetricsThresholds::default(), clock);
        let mut sections = BTreeMap::new();
        sections.insert("chain".to_string(), json!({"integrity_ok": false}));
        manager.evaluate(&snapshot(sections));
        assert!(manager.clear("chain-integrity-failed"));
        assert!(manager.active().is_empty());
    }

    #[test]
    fn missing_sections_default_to_healthy_and_fire_nothing() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let manager = AlertManager::new(MetricsThresholds::default(), clock);
        let diff = manager.evaluate(&snapshot(BTreeMap::new()));
        assert!(diff.fired.is_empty());
    }

    #[test]
    fn raise_activates_an_alert_with_no_backing_metric_field() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let manager = AlertManager::new(MetricsThresholds::default(), clock.clone());
        manager.raise(Alert {
            alert_type: "chain-write-failed".to_string(),
            level: AlertLevel::Critical,
            message: "chain append failed".to_string(),
            value: 0.0,
            threshold: 0.0,
            fired_at: clock.now(),
        });
        assert_eq!(manager.active().len(), 1);
        assert!(manager.clear("chain-write-failed"));
    }
}

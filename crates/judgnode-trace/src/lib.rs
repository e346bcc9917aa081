// crates/judgnode-trace/src/lib.rs
// ============================================================================
// Module: Decision Tracer
// Description: Bounded ring buffer of decision records, indexable by id,
//              domain, and user.
// Purpose: Give operators and the orchestrator's own feedback loops a
//          recent-history window without depending on the durable chain.
// Dependencies: judgnode-core
// ============================================================================

//! ## Overview
//! [`DecisionTracer`] holds the most recent `capacity` (default 500)
//! [`DecisionRecord`]s in memory. Pushing past capacity evicts the oldest
//! entry. Unlike the Proof-of-Judgment chain, the tracer is not durable and
//! not authoritative — it exists purely so `recent`/`by_id`/`by_domain`/
//! `by_user`/`summary` can answer in-process without a chain scan.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::RwLock;

use judgnode_core::DecisionId;
use judgnode_core::DecisionRecord;
use judgnode_core::DomainName;
use judgnode_core::Outcome;
use judgnode_core::UserId;
use serde::Deserialize;
use serde::Serialize;

/// Default ring buffer capacity.
pub const DEFAULT_CAPACITY: usize = 500;

/// Per-outcome and per-domain counts over the tracer's current window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    /// Total records currently held.
    pub total: usize,
    /// Count of records per outcome, keyed by the outcome's wire name.
    pub by_outcome: HashMap<String, usize>,
    /// Count of records per routing domain.
    pub by_domain: HashMap<String, usize>,
}

struct Inner {
    capacity: usize,
    records: VecDeque<DecisionRecord>,
}

/// Bounded in-memory ring buffer of [`DecisionRecord`]s.
///
/// # Invariants
/// - Holds at most `capacity` records; the oldest is evicted on overflow.
/// - `recent`, `by_domain`, `by_user` return newest-first.
pub struct DecisionTracer {
    inner: RwLock<Inner>,
}

impl DecisionTracer {
    /// Creates a tracer with [`DEFAULT_CAPACITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a tracer with an explicit capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner { capacity: capacity.max(1), records: VecDeque::new() }),
        }
    }

    /// Pushes a decision record, evicting the oldest entry if at capacity.
    pub fn push(&self, record: DecisionRecord) {
        let mut inner = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if inner.records.len() >= inner.capacity {
            inner.records.pop_front();
        }
        inner.records.push_back(record);
    }

    /// Returns up to `n` most recent records, newest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<DecisionRecord> {
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.records.iter().rev().take(n).cloned().collect()
    }

    /// Returns the record with the given id, if still in the window.
    #[must_use]
    pub fn by_id(&self, id: &DecisionId) -> Option<DecisionRecord> {
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.records.iter().rev().find(|record| &record.id == id).cloned()
    }

    /// Returns up to `n` most recent records for `domain`, newest first.
    #[must_use]
    pub fn by_domain(&self, domain: &DomainName, n: usize) -> Vec<DecisionRecord> {
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.records.iter().rev().filter(|record| &record.domain == domain).take(n).cloned().collect()
    }

    /// Returns up to `n` most recent records for `user`, newest first.
    #[must_use]
    pub fn by_user(&self, user: &UserId, n: usize) -> Vec<DecisionRecord> {
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.records.iter().rev().filter(|record| &record.user_id == user).take(n).cloned().collect()
    }

    /// Summarizes the current window: total count and per-outcome/per-domain
    /// breakdowns.
    #[must_use]
    pub fn summary(&self) -> TraceSummary {
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut summary = TraceSummary { total: inner.records.len(), ..TraceSummary::default() };
        for record in &inner.records {
            *summary.by_outcome.entry(outcome_label(record.outcome).to_string()).or_insert(0) += 1;
            *summary.by_domain.entry(record.domain.as_str().to_string()).or_insert(0) += 1;
        }
        summary
    }
}

impl Default for DecisionTracer {
    fn default() -> Self {
        Self::new()
    }
}

fn outcome_label(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Allow => "allow",
        Outcome::Modified => "modified",
        Outcome::Blocked => "blocked",
        Outcome::Deferred => "deferred",
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use std::sync::Arc;

    use judgnode_core::Clock;
    use judgnode_core::FixedClock;
    use judgnode_core::InterventionLevel;
    use judgnode_core::Timestamp;

    use super::*;

    fn record(id: &str, domain: &str, user: &str, outcome: Outcome, clock: &FixedClock) -> DecisionRecord {
        DecisionRecord {
            id: DecisionId::new(id),
            event_id: judgnode_core::EventId::new(format!("e-{id}")),
            domain: DomainName::new(domain),
            intervention_level: InterventionLevel::Silent,
            outcome,
            judgment: None,
            synthesis: None,
            skill_result: None,
            user_id: UserId::new(user),
            timestamp: clock.now(),
            duration_ms: 1,
            confidence: 0.5,
            trace_steps: Vec::new(),
        }
    }

    #[test]
    fn overflow_evicts_the_oldest_record() {
        let clock = FixedClock::new(Timestamp::from_millis(0));
        let tracer = DecisionTracer::with_capacity(2);
        tracer.push(record("1", "protection", "u1", Outcome::Allow, &clock));
        tracer.push(record("2", "protection", "u1", Outcome::Allow, &clock));
        tracer.push(record("3", "protection", "u1", Outcome::Allow, &clock));
        let ids: Vec<_> = tracer.recent(10).into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![DecisionId::new("3"), DecisionId::new("2")]);
    }

    #[test]
    fn by_id_finds_a_record_still_in_window() {
        let clock = FixedClock::new(Timestamp::from_millis(0));
        let tracer = DecisionTracer::with_capacity(10);
        tracer.push(record("1", "protection", "u1", Outcome::Allow, &clock));
        assert!(tracer.by_id(&DecisionId::new("1")).is_some());
        assert!(tracer.by_id(&DecisionId::new("missing")).is_none());
    }

    #[test]
    fn by_domain_and_by_user_filter_correctly() {
        let clock = FixedClock::new(Timestamp::from_millis(0));
        let tracer = DecisionTracer::with_capacity(10);
        tracer.push(record("1", "protection", "u1", Outcome::Allow, &clock));
        tracer.push(record("2", "analysis", "u2", Outcome::Blocked, &clock));
        tracer.push(record("3", "protection", "u2", Outcome::Allow, &clock));

        let protection: Vec<_> = tracer.by_domain(&DomainName::new("protection"), 10).into_iter().map(|r| r.id).collect();
        assert_eq!(protection, vec![DecisionId::new("3"), DecisionId::new("1")]);

        let u2: Vec<_> = tracer.by_user(&UserId::new("u2"), 10).into_iter().map(|r| r.id).collect();
        assert_eq!(u2, vec![DecisionId::new("3"), DecisionId::new("2")]);
    }

    #[test]
    fn summary_counts_by_outcome_and_domain() {
        let clock = FixedClock::new(Timestamp::from_millis(0));
        let tracer = DecisionTracer::with_capacity(10);
        tracer.push(record("1", "protection", "u1", Outcome::Allow, &clock));
        tracer.push(record("2", "analysis", "u2", Outcome::Blocked, &clock));
        tracer.push(record("3", "protection", "u2", Outcome::Allow, &clock));

        let summary = tracer.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_outcome.get("allow"), Some(&2));
        assert_eq!(summary.by_outcome.get("blocked"), Some(&1));
        assert_eq!(summary.by_domain.get("protection"), Some(&2));
        assert_eq!(summary.by_domain.get("analysis"), Some(&1));
    }

    #[test]
    fn with_capacity_zero_is_clamped_to_one() {
        let clock = FixedClock::new(Timestamp::from_millis(0));
        let tracer = DecisionTracer::with_capacity(0);
        tracer.push(record("1", "protection", "u1", Outcome::Allow, &clock));
        tracer.push(record("2", "protection", "u1", Outcome::Allow, &clock));
        assert_eq!(tracer.recent(10).len(), 1);
    }
}

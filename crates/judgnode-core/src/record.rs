// crates/judgnode-core/src/record.rs
// ============================================================================
// Module: Decision Record
// Description: The persistent output of one pipeline run.
// Purpose: Carry the judgment, synthesis, skill result, and trace for an event.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! A [`DecisionRecord`] is produced by exactly one orchestrator pipeline run.
//! It is appended to the Proof-of-Judgment chain and pushed onto the decision
//! tracer; the chain's copy is immutable once written, the tracer's copy may
//! later be evicted.

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::DecisionId;
use crate::identifiers::DomainName;
use crate::identifiers::EventId;
use crate::identifiers::UserId;
use crate::time::Timestamp;

/// How the orchestrator must treat an event.
///
/// # Invariants
/// - Ordering `Silent < Notify < Ask < Block` reflects increasing severity
///   and is relied on by the intervention matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterventionLevel {
    /// No intervention; the event proceeds without comment.
    Silent,
    /// The event proceeds but is surfaced to the user.
    Notify,
    /// The event requires explicit caller confirmation before proceeding.
    Ask,
    /// The event must not proceed.
    Block,
}

/// The terminal outcome recorded for a [`DecisionRecord`].
///
/// # Invariants
/// - Variants are stable for serialization and for the C12 reward mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// The event was allowed to proceed unmodified.
    Allow,
    /// The event was allowed after modification.
    Modified,
    /// The event was not allowed to proceed.
    Blocked,
    /// The event requires the caller to confirm before proceeding.
    Deferred,
}

impl Outcome {
    /// The deterministic reward signal fed to the Q-learning feedback loop
    /// (SPEC_FULL.md §4.1–4.14 resolves this open question).
    #[must_use]
    pub const fn reward(self) -> f64 {
        match self {
            Self::Allow => 1.0,
            Self::Modified => 0.5,
            Self::Deferred => 0.25,
            Self::Blocked => 0.0,
        }
    }
}

/// One step of the pipeline's execution trace.
///
/// # Invariants
/// - `took_ms` is the wall-clock duration of the stage alone, not cumulative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceStep {
    /// Name of the pipeline stage (`enrich`, `classify`, `route`, `judge`,
    /// `synthesize`, `act`, `record`).
    pub stage: String,
    /// How long the stage took.
    pub took_ms: u64,
    /// Whether the stage completed successfully.
    pub ok: bool,
    /// A short human-readable note, populated on failure or for context.
    pub note: Option<String>,
}

impl TraceStep {
    /// Creates a successful trace step.
    #[must_use]
    pub fn ok(stage: impl Into<String>, took_ms: u64) -> Self {
        Self {
            stage: stage.into(),
            took_ms,
            ok: true,
            note: None,
        }
    }

    /// Creates a failed trace step with an explanatory note.
    #[must_use]
    pub fn failed(stage: impl Into<String>, took_ms: u64, note: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            took_ms,
            ok: false,
            note: Some(note.into()),
        }
    }
}

/// The persistent record of one orchestrator pipeline run.
///
/// # Invariants
/// - `trace_steps` preserves pipeline execution order.
/// - `confidence`, when present, never exceeds the configured confidence cap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Unique decision identifier.
    pub id: DecisionId,
    /// The event this decision judged.
    pub event_id: EventId,
    /// The routing domain selected for this event.
    pub domain: DomainName,
    /// The intervention level computed for this event.
    pub intervention_level: InterventionLevel,
    /// The terminal outcome.
    pub outcome: Outcome,
    /// Opaque judgment payload, present when a Protection judgment ran.
    pub judgment: Option<serde_json::Value>,
    /// Opaque synthesis payload, present when domain synthesis ran.
    pub synthesis: Option<serde_json::Value>,
    /// Opaque skill invocation result, present when a skill was invoked.
    pub skill_result: Option<serde_json::Value>,
    /// The user this decision is scoped to.
    pub user_id: UserId,
    /// When the decision was recorded.
    pub timestamp: Timestamp,
    /// Total pipeline duration in milliseconds.
    pub duration_ms: u64,
    /// Capped confidence for this decision (never exceeds the configured cap).
    pub confidence: f64,
    /// Ordered trace of pipeline stages.
    pub trace_steps: Vec<TraceStep>,
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::Outcome;

    #[test]
    fn reward_mapping_matches_spec_full() {
        assert_eq!(Outcome::Allow.reward(), 1.0);
        assert_eq!(Outcome::Modified.reward(), 0.5);
        assert_eq!(Outcome::Deferred.reward(), 0.25);
        assert_eq!(Outcome::Blocked.reward(), 0.0);
    }

    #[test]
    fn intervention_levels_order_by_severity() {
        use super::InterventionLevel::{Ask, Block, Notify, Silent};
        assert!(Silent < Notify);
        assert!(Notify < Ask);
        assert!(Ask < Block);
    }
}

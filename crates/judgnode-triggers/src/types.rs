// crates/judgnode-triggers/src/types.rs
// ============================================================================
// Module: Trigger Types
// Description: The read-only context a trigger evaluation pass consults, and
//              the suggestions/lifecycle it produces.
// Purpose: Give the six trigger conditions a typed, caller-supplied view of
//          state without coupling this crate to any concrete session/graph
//          type.
// Dependencies: judgnode-core, serde, serde_json
// ============================================================================

use judgnode_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

/// One classified error observation, as reported by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObservation {
    /// The classified error kind (caller-defined vocabulary).
    pub kind: String,
    /// When the error occurred.
    pub at: Timestamp,
}

/// An active goal a user is working toward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    /// Free-text description of the goal.
    pub text: String,
    /// The goal's deadline, if any.
    pub deadline: Option<Timestamp>,
}

/// A past success judged similar to the current situation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Human-readable description of the matched pattern.
    pub description: String,
    /// Confidence that the match applies, `0.0..=1.0`.
    pub confidence: f64,
}

/// A pattern that has recurred but not yet been surfaced to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergingPattern {
    /// Identifier for the pattern.
    pub id: String,
    /// Number of times it has recurred.
    pub occurrences: u32,
    /// True once a `learning-opp` suggestion has already surfaced it.
    pub surfaced: bool,
}

/// Read-only snapshot of state a trigger evaluation pass consults.
///
/// # Invariants
/// - The engine never mutates this context; all state it owns is internal
///   (cooldowns, pending suggestions, resolution stats).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerContext {
    /// Errors observed recently, in no particular order.
    pub recent_errors: Vec<ErrorObservation>,
    /// The user's active goal, if any.
    pub active_goal: Option<Goal>,
    /// Free-text description of what the user is currently focused on.
    pub current_focus: Option<String>,
    /// Energy metric in `0.0..=1.0`; lower means more fatigued.
    pub energy: f64,
    /// Past successes judged similar to the current situation.
    pub pattern_matches: Vec<PatternMatch>,
    /// Patterns that have recurred without yet being surfaced.
    pub emerging_patterns: Vec<EmergingPattern>,
}

/// Which of the six conditions fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    /// Repeated errors of the same classified kind in a short window.
    ErrorPattern,
    /// Current focus has drifted from the active goal.
    ContextDrift,
    /// Energy metric has dropped below the fatigue ceiling.
    BurnoutRisk,
    /// A confident past success applies to the current situation.
    PatternMatch,
    /// An active goal's deadline is approaching.
    DeadlineNear,
    /// An emerging pattern is ready to be surfaced.
    LearningOpp,
}

impl TriggerKind {
    /// All six kinds, in evaluation order.
    pub const ALL: [Self; 6] =
        [Self::ErrorPattern, Self::ContextDrift, Self::BurnoutRisk, Self::PatternMatch, Self::DeadlineNear, Self::LearningOpp];

    /// The kebab-case wire name, e.g. `"error-pattern"`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ErrorPattern => "error-pattern",
            Self::ContextDrift => "context-drift",
            Self::BurnoutRisk => "burnout-risk",
            Self::PatternMatch => "pattern-match",
            Self::DeadlineNear => "deadline-near",
            Self::LearningOpp => "learning-opp",
        }
    }
}

/// Suggestion urgency, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    /// Worth a low-key mention.
    Subtle,
    /// Worth calling out.
    Active,
    /// Needs attention now.
    Urgent,
}

/// A proactive suggestion built from a fired trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Unique identifier for this suggestion instance.
    pub id: String,
    /// Which trigger fired it.
    pub trigger_kind: TriggerKind,
    /// The suggested action, in the template's own vocabulary.
    pub action: String,
    /// How insistently to present the suggestion.
    pub urgency: Urgency,
    /// Rendered, human-readable message.
    pub message: String,
    /// Structured detail supporting the message (e.g. the matched pattern).
    pub data: serde_json::Value,
    /// When the trigger fired.
    pub fired_at: Timestamp,
}

/// Terminal state a suggestion can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuggestionStatus {
    /// Fired, awaiting resolution.
    Pending,
    /// Implicitly or explicitly accepted.
    Accepted,
    /// Explicitly rejected.
    Rejected,
    /// TTL elapsed without resolution.
    Expired,
}

/// An explicit resolution outcome a caller can report for a pending suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionOutcome {
    /// The user acted on the suggestion.
    Accepted,
    /// The user declined the suggestion.
    Rejected,
}

/// Per-trigger-kind acceptance-rate statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionStats {
    /// Suggestions of this kind accepted (implicitly or explicitly).
    pub accepted: u64,
    /// Suggestions of this kind explicitly rejected.
    pub rejected: u64,
    /// Suggestions of this kind that expired unresolved.
    pub expired: u64,
}

impl ResolutionStats {
    /// Total resolved suggestions of this kind.
    #[must_use]
    pub const fn total(self) -> u64 {
        self.accepted + self.rejected + self.expired
    }

    /// Fraction accepted out of all resolved, `None` if none have resolved yet.
    #[must_use]
    #[allow(clippy::cast_precision_loss, reason = "resolution counts stay far below f64's exact-integer range")]
    pub fn acceptance_rate(self) -> Option<f64> {
        let total = self.total();
        if total == 0 { None } else { Some(self.accepted as f64 / total as f64) }
    }
}

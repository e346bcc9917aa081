// crates/judgnode-triggers/src/lib.rs
// ============================================================================
// Module: Judgment Node Triggers
// Description: Evaluates the six proactive trigger conditions, enforces
//              cooldowns and an optional collective vote, and tracks the
//              fired -> pending -> resolved suggestion lifecycle.
// Purpose: Surface proactive suggestions from read-only state without
//          spamming the user or re-litigating an unresolved one.
// Dependencies: judgnode-core, judgnode-config, serde_json
// ============================================================================

//! ## Overview
//! [`TriggerEngine::evaluate`] is the single entry point: given a read-only
//! [`TriggerContext`], it resolves or expires already-pending suggestions,
//! checks the six conditions (subject to per-kind cooldowns from
//! [`judgnode_config::TriggerConfig`]), and returns any newly surfaced
//! [`Suggestion`]s. [`CollectiveVote`] is the optional consensus gate
//! ([`AutoApprove`] by default).

pub mod engine;
pub mod types;
pub mod vote;

pub use engine::TriggerEngine;
pub use types::EmergingPattern;
pub use types::ErrorObservation;
pub use types::Goal;
pub use types::PatternMatch;
pub use types::ResolutionOutcome;
pub use types::ResolutionStats;
pub use types::Suggestion;
pub use types::SuggestionStatus;
pub use types::TriggerContext;
pub use types::TriggerKind;
pub use types::Urgency;
pub use vote::AutoApprove;
pub use vote::CollectiveVote;

// crates/judgnode-triggers/src/vote.rs
// ============================================================================
// Module: Collective Vote
// Description: Optional consensus gate a fired suggestion must clear before
//              it surfaces.
// Purpose: Let an embedder plug in a real quorum mechanism; ship a stub that
//          always approves.
// Dependencies: none
// ============================================================================

//! ## Overview
//! [`CollectiveVote::consensus`] returns a value in `0.0..=1.0`; a suggestion
//! only surfaces once consensus meets the configured floor (default φ⁻¹,
//! [`judgnode_config::TriggerConfig::collective_vote_floor`]). [`AutoApprove`]
//! is the default: it always returns `1.0`. A real quorum implementation —
//! polling other agents, a human reviewer, etc. — is an embedder concern and
//! out of scope here.

use crate::types::Suggestion;

/// Consensus gate consulted before a fired trigger surfaces.
pub trait CollectiveVote: Send + Sync {
    /// Returns the consensus level, in `0.0..=1.0`, for surfacing `suggestion`.
    fn consensus(&self, suggestion: &Suggestion) -> f64;
}

/// Default vote: always approves at full consensus.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

impl CollectiveVote for AutoApprove {
    fn consensus(&self, _suggestion: &Suggestion) -> f64 {
        1.0
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use judgnode_core::Timestamp;
    use serde_json::json;

    use super::*;
    use crate::types::TriggerKind;
    use crate::types::Urgency;

    #[test]
    fn auto_approve_always_returns_full_consensus() {
        let suggestion = Suggestion {
            id: "s1".to_string(),
            trigger_kind: TriggerKind::BurnoutRisk,
            action: "suggest-break".to_string(),
            urgency: Urgency::Subtle,
            message: "take a break".to_string(),
            data: json!({}),
            fired_at: Timestamp::from_millis(0),
        };
        assert_eq!(AutoApprove.consensus(&suggestion), 1.0);
    }
}

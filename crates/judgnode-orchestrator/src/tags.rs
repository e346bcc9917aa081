// crates/judgnode-orchestrator/src/tags.rs
// ============================================================================
// Module: Wire Tags
// Description: Stable short strings for types that derive Serialize but do
// not publish a string-conversion helper.
// Purpose: Build Q-learning context/action tags and log-friendly labels
// without reaching for serde_json/Debug, both of which are off-limits here.
// Dependencies: judgnode-core, judgnode-policy
// ============================================================================

use judgnode_core::InterventionLevel;
use judgnode_core::Outcome;
use judgnode_policy::RiskLevel;
use judgnode_policy::TrustTier;

/// Kebab-case tag for a [`RiskLevel`], matching its own `serde` rename.
#[must_use]
pub const fn risk_tag(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "low",
        RiskLevel::Medium => "medium",
        RiskLevel::High => "high",
        RiskLevel::Critical => "critical",
    }
}

/// Kebab-case tag for a [`TrustTier`], matching its own `serde` rename.
#[must_use]
pub const fn tier_tag(tier: TrustTier) -> &'static str {
    match tier {
        TrustTier::Observer => "observer",
        TrustTier::Contributor => "contributor",
        TrustTier::Builder => "builder",
        TrustTier::Steward => "steward",
        TrustTier::Guardian => "guardian",
    }
}

/// Kebab-case tag for an [`InterventionLevel`], matching its own `serde` rename.
#[must_use]
pub const fn level_tag(level: InterventionLevel) -> &'static str {
    match level {
        InterventionLevel::Silent => "silent",
        InterventionLevel::Notify => "notify",
        InterventionLevel::Ask => "ask",
        InterventionLevel::Block => "block",
    }
}

/// Kebab-case tag for an [`Outcome`], matching its own `serde` rename.
#[must_use]
pub const fn outcome_tag(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Allow => "allow",
        Outcome::Modified => "modified",
        Outcome::Blocked => "blocked",
        Outcome::Deferred => "deferred",
    }
}

#[cfg(test)]
mod tests {
    use super::level_tag;
    use super::outcome_tag;
    use super::risk_tag;
    use super::tier_tag;
    use judgnode_core::InterventionLevel;
    use judgnode_core::Outcome;
    use judgnode_policy::RiskLevel;
    use judgnode_policy::TrustTier;

    #[test]
    fn tags_are_lowercase_and_stable() {
        assert_eq!(risk_tag(RiskLevel::Critical), "critical");
        assert_eq!(tier_tag(TrustTier::Guardian), "guardian");
        assert_eq!(level_tag(InterventionLevel::Block), "block");
        assert_eq!(outcome_tag(Outcome::Deferred), "deferred");
    }
}

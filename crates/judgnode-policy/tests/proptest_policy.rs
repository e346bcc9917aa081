// crates/judgnode-policy/tests/proptest_policy.rs
// ============================================================================
// Module: Policy Property-Based Tests
// Description: Property tests for trust tiering monotonicity and the
//              intervention matrix's severity ordering.
// Purpose: Detect invariant violations across randomly generated trust
//          values and risk/tier combinations.
// ============================================================================

//! Property-based tests for risk and trust invariants.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use judgnode_policy::RiskLevel;
use judgnode_policy::TrustTier;
use judgnode_policy::intervention;
use judgnode_policy::trust_tier;
use proptest::prelude::*;

fn risk_strategy() -> impl Strategy<Value = RiskLevel> {
    prop_oneof![
        Just(RiskLevel::Low),
        Just(RiskLevel::Medium),
        Just(RiskLevel::High),
        Just(RiskLevel::Critical),
    ]
}

fn tier_strategy() -> impl Strategy<Value = TrustTier> {
    prop_oneof![
        Just(TrustTier::Observer),
        Just(TrustTier::Contributor),
        Just(TrustTier::Builder),
        Just(TrustTier::Steward),
        Just(TrustTier::Guardian),
    ]
}

proptest! {
    #[test]
    fn trust_tier_is_monotonic_non_decreasing(a in -100.0f64..200.0, b in -100.0f64..200.0) {
        if a <= b {
            prop_assert!(trust_tier(a) <= trust_tier(b));
        }
    }

    #[test]
    fn higher_trust_never_demands_a_stricter_intervention(
        risk in risk_strategy(),
        lower in tier_strategy(),
        higher in tier_strategy(),
    ) {
        if lower <= higher {
            prop_assert!(intervention(higher, risk) <= intervention(lower, risk));
        }
    }

    #[test]
    fn higher_risk_never_relaxes_the_intervention(
        tier in tier_strategy(),
        lower in risk_strategy(),
        higher in risk_strategy(),
    ) {
        if lower <= higher {
            prop_assert!(intervention(tier, lower) <= intervention(tier, higher));
        }
    }
}

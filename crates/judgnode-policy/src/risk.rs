// crates/judgnode-policy/src/risk.rs
// ============================================================================
// Module: Risk & Intervention
// Description: Pure risk classification, trust tiering, and the intervention matrix.
// Purpose: Turn free-text content and a scalar trust value into a level the
// orchestrator must honor.
// Dependencies: none
// ============================================================================

//! ## Overview
//! Everything here is a pure function: no I/O, no clock, no shared state.
//! [`detect_risk`] scans lowercased content against four ordered pattern
//! sets (critical first); [`trust_tier`] buckets a scalar trust value; the
//! [`intervention`] matrix maps `(tier, risk)` to a
//! [`judgnode_core::InterventionLevel`].

use judgnode_core::InterventionLevel;
use serde::Deserialize;
use serde::Serialize;

/// Trust value at/above which a caller is a [`TrustTier::Guardian`].
pub const GUARDIAN_THRESHOLD: f64 = 61.8;
/// Trust value at/above which a caller is at least a [`TrustTier::Steward`].
pub const STEWARD_THRESHOLD: f64 = 38.2;
/// Trust value at/above which a caller is at least a [`TrustTier::Builder`].
pub const BUILDER_THRESHOLD: f64 = 30.0;
/// Trust value at/above which a caller is at least a [`TrustTier::Contributor`].
pub const CONTRIBUTOR_THRESHOLD: f64 = 15.0;

/// Severity bucket assigned to free-text content by [`detect_risk`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskLevel {
    /// No concerning pattern matched.
    Low,
    /// An edit/refactor-adjacent pattern matched.
    Medium,
    /// A production- or credential-adjacent pattern matched.
    High,
    /// An irreversible/destructive pattern matched.
    Critical,
}

/// Qualitative bucket derived from a scalar trust value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrustTier {
    /// Below [`CONTRIBUTOR_THRESHOLD`].
    Observer,
    /// At least [`CONTRIBUTOR_THRESHOLD`].
    Contributor,
    /// At least [`BUILDER_THRESHOLD`].
    Builder,
    /// At least [`STEWARD_THRESHOLD`].
    Steward,
    /// At least [`GUARDIAN_THRESHOLD`].
    Guardian,
}

/// Critical-risk substrings: irreversible, destructive operations.
const CRITICAL_PATTERNS: &[&str] =
    &["rm -rf", "drop table", "drop database", "force push", "--force", "delete all", "wipe disk", "format disk"];

/// High-risk substrings: production or credential-adjacent terms.
const HIGH_PATTERNS: &[&str] = &[
    "production",
    "prod db",
    "api key",
    "secret key",
    "access token",
    "private key",
    "credential",
    "rotate secret",
];

/// Medium-risk substrings: edit/refactor terms.
const MEDIUM_PATTERNS: &[&str] =
    &["refactor", "rename", "migrate", "schema change", "edit file", "delete file", "overwrite"];

/// Classifies `text` into a [`RiskLevel`] by ordered substring scan.
///
/// Checks critical patterns first, then high, then medium; the first set
/// with any match wins. Unmatched text is [`RiskLevel::Low`].
#[must_use]
pub fn detect_risk(text: &str) -> RiskLevel {
    let lowered = text.to_lowercase();
    if CRITICAL_PATTERNS.iter().any(|pattern| lowered.contains(pattern)) {
        return RiskLevel::Critical;
    }
    if HIGH_PATTERNS.iter().any(|pattern| lowered.contains(pattern)) {
        return RiskLevel::High;
    }
    if MEDIUM_PATTERNS.iter().any(|pattern| lowered.contains(pattern)) {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

/// Buckets a scalar trust value into a [`TrustTier`].
///
/// Thresholds are part of the published contract: guardian ≥ 61.8, steward
/// ≥ 38.2, builder ≥ 30, contributor ≥ 15, observer otherwise.
#[must_use]
pub fn trust_tier(value: f64) -> TrustTier {
    if value >= GUARDIAN_THRESHOLD {
        TrustTier::Guardian
    } else if value >= STEWARD_THRESHOLD {
        TrustTier::Steward
    } else if value >= BUILDER_THRESHOLD {
        TrustTier::Builder
    } else if value >= CONTRIBUTOR_THRESHOLD {
        TrustTier::Contributor
    } else {
        TrustTier::Observer
    }
}

/// Looks up the authoritative 5×4 intervention matrix.
#[must_use]
pub const fn intervention(tier: TrustTier, risk: RiskLevel) -> InterventionLevel {
    use InterventionLevel::{Ask, Block, Notify, Silent};
    use RiskLevel::{Critical, High, Low, Medium};
    use TrustTier::{Builder, Contributor, Guardian, Observer, Steward};

    match (risk, tier) {
        (Critical, Guardian | Steward) => Ask,
        (Critical, Builder | Contributor | Observer) => Block,
        (High, Guardian) => Notify,
        (High, Steward | Builder) => Ask,
        (High, Contributor | Observer) => Block,
        (Medium, Guardian) => Silent,
        (Medium, Steward | Builder) => Notify,
        (Medium, Contributor | Observer) => Ask,
        (Low, Guardian | Steward | Builder) => Silent,
        (Low, Contributor | Observer) => Notify,
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::RiskLevel;
    use super::TrustTier;
    use super::detect_risk;
    use super::intervention;
    use super::trust_tier;
    use judgnode_core::InterventionLevel;

    #[test]
    fn critical_wins_over_high_and_medium() {
        assert_eq!(detect_risk("refactor the production rm -rf config"), RiskLevel::Critical);
    }

    #[test]
    fn high_wins_over_medium() {
        assert_eq!(detect_risk("rename the api key variable"), RiskLevel::High);
    }

    #[test]
    fn unmatched_text_is_low() {
        assert_eq!(detect_risk("what time is it"), RiskLevel::Low);
    }

    #[test]
    fn trust_tier_boundaries_are_inclusive() {
        assert_eq!(trust_tier(61.8), TrustTier::Guardian);
        assert_eq!(trust_tier(61.799), TrustTier::Steward);
        assert_eq!(trust_tier(38.2), TrustTier::Steward);
        assert_eq!(trust_tier(30.0), TrustTier::Builder);
        assert_eq!(trust_tier(15.0), TrustTier::Contributor);
        assert_eq!(trust_tier(14.999), TrustTier::Observer);
    }

    #[test]
    fn intervention_matrix_matches_the_published_table() {
        assert_eq!(intervention(TrustTier::Guardian, RiskLevel::Critical), InterventionLevel::Ask);
        assert_eq!(intervention(TrustTier::Builder, RiskLevel::Critical), InterventionLevel::Block);
        assert_eq!(intervention(TrustTier::Guardian, RiskLevel::High), InterventionLevel::Notify);
        assert_eq!(intervention(TrustTier::Contributor, RiskLevel::High), InterventionLevel::Block);
        assert_eq!(intervention(TrustTier::Builder, RiskLevel::Medium), InterventionLevel::Notify);
        assert_eq!(intervention(TrustTier::Contributor, RiskLevel::Low), InterventionLevel::Notify);
        assert_eq!(intervention(TrustTier::Observer, RiskLevel::Low), InterventionLevel::Notify);
    }
}

// crates/judgnode-policy/src/lib.rs
// ============================================================================
// Module: Judgment Node Policy
// Description: Risk classification, trust tiering, the intervention matrix,
//              and the substring-triggered routing table.
// Purpose: Pure decision inputs the orchestrator consults before acting.
// Dependencies: judgnode-core
// ============================================================================

//! ## Overview
//! Two independent, side-effect-free modules:
//! - [`risk`]: [`risk::detect_risk`], [`risk::trust_tier`], and
//!   [`risk::intervention`] — the 5×4 matrix mapping trust tier and risk
//!   level to a [`judgnode_core::InterventionLevel`].
//! - [`routing`]: [`routing::RoutingTable`], mapping free-text content (and,
//!   failing that, an event kind) to one of ten registered domains.

pub mod risk;
pub mod routing;

pub use risk::RiskLevel;
pub use risk::TrustTier;
pub use risk::detect_risk;
pub use risk::intervention;
pub use risk::trust_tier;
pub use routing::Domain;
pub use routing::RoutingDecision;
pub use routing::RoutingTable;

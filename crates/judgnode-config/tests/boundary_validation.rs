// crates/judgnode-config/tests/boundary_validation.rs
//! Boundary validation for numeric settings fields.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

use judgnode_config::Settings;

#[test]
fn zero_trace_capacity_is_rejected() {
    let mut settings = Settings::default();
    settings.trace.capacity = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn zero_slot_judgment_limit_is_rejected() {
    let mut settings = Settings::default();
    settings.chain.slot_judgment_limit = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn base_backoff_above_max_backoff_is_rejected() {
    let mut settings = Settings::default();
    settings.circuit.base_backoff_ms = settings.circuit.max_backoff_ms + 1;
    assert!(settings.validate().is_err());
}

#[test]
fn confidence_cap_at_exact_bounds_is_accepted() {
    let mut settings = Settings::default();
    settings.confidence_cap = 0.0;
    assert!(settings.validate().is_ok());
    settings.confidence_cap = 1.0;
    assert!(settings.validate().is_ok());
}

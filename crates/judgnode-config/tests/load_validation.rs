// crates/judgnode-config/tests/load_validation.rs
//! Loading settings from TOML documents, files, and partial overrides.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

use std::io::Write;

use judgnode_config::Settings;

#[test]
fn full_document_round_trips() {
    let document = r#"
        confidence_cap = 0.6

        [trust_thresholds]
        guardian = 90.0
        steward = 60.0
        builder = 40.0
        contributor = 20.0

        [chain]
        slot_judgment_limit = 10
        idle_close_ms = 5000
    "#;
    let settings = Settings::from_toml_str(document).expect("valid document");
    assert_eq!(settings.confidence_cap, 0.6);
    assert_eq!(settings.trust_thresholds.guardian, 90.0);
    assert_eq!(settings.chain.slot_judgment_limit, 10);
}

#[test]
fn loads_from_a_file_on_disk() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile creation succeeds");
    writeln!(file, "confidence_cap = 0.4").expect("write succeeds");
    let contents = std::fs::read_to_string(file.path()).expect("read succeeds");
    let settings = Settings::from_toml_str(&contents).expect("valid document");
    assert_eq!(settings.confidence_cap, 0.4);
}

#[test]
fn empty_document_uses_all_defaults() {
    let settings = Settings::from_toml_str("").expect("empty document is valid");
    assert_eq!(settings, Settings::default());
}

// crates/judgnode-chain-sqlite/tests/sqlite_chain_store.rs
// ============================================================================
// Module: SQLite Chain Store Integration Tests
// Description: Durability and integrity tests for the SQLite-backed chain.
// Purpose: Confirm closed blocks survive a reopen and integrity checks agree
//          with the in-memory implementation's semantics.
// ============================================================================

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions."
)]

use std::sync::Arc;

use judgnode_chain::ChainStore;
use judgnode_chain_sqlite::SqliteChainStore;
use judgnode_config::ChainConfig;
use judgnode_core::DecisionId;
use judgnode_core::FixedClock;
use judgnode_core::SlotId;
use judgnode_core::Timestamp;

fn judgment(n: u64) -> judgnode_chain::PendingJudgment {
    judgnode_chain::PendingJudgment {
        id: DecisionId::new(format!("d{n}")),
        payload: serde_json::json!({"n": n}),
    }
}

#[test]
fn closed_blocks_survive_a_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chain.sqlite3");
    let config = ChainConfig { slot_judgment_limit: 2, idle_close_ms: 60_000 };
    let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));

    {
        let store = SqliteChainStore::open(&path, "producer-1", config.clone(), clock.clone())
            .expect("open store");
        store.append_judgment(judgment(1)).expect("append succeeds");
        store.append_judgment(judgment(2)).expect("append succeeds");
        assert_eq!(store.status().block_count, 1, "size threshold auto-closed the slot");
    }

    let reopened = SqliteChainStore::open(&path, "producer-1", config, clock).expect("reopen store");
    let status = reopened.status();
    assert_eq!(status.block_count, 1);
    assert_eq!(status.pending, 0, "pending judgments are not durable across a restart");
    let blocks = reopened.iter_blocks(0..10);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].judgments.len(), 2);
}

#[test]
fn blocks_link_by_parent_hash_across_closes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chain.sqlite3");
    let config = ChainConfig { slot_judgment_limit: 1, idle_close_ms: 60_000 };
    let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
    let store = SqliteChainStore::open(&path, "producer-1", config, clock).expect("open store");

    store.append_judgment(judgment(1)).expect("append succeeds");
    store.append_judgment(judgment(2)).expect("append succeeds");

    let blocks = store.iter_blocks(0..10);
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[1].parent_hash, blocks[0].self_hash);
    assert_eq!(blocks[0].slot, SlotId::GENESIS);
    assert_eq!(blocks[1].slot, SlotId::GENESIS.next());
}

#[test]
fn verify_integrity_passes_on_an_untampered_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chain.sqlite3");
    let config = ChainConfig { slot_judgment_limit: 1, idle_close_ms: 60_000 };
    let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
    let store = SqliteChainStore::open(&path, "producer-1", config, clock).expect("open store");

    for n in 0..5 {
        store.append_judgment(judgment(n)).expect("append succeeds");
    }
    let report = store.verify_integrity(SlotId::GENESIS);
    assert!(report.valid, "errors: {:?}", report.errors);
}

#[test]
fn detected_tamper_blocks_further_writes_until_reset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chain.sqlite3");
    let config = ChainConfig { slot_judgment_limit: 1, idle_close_ms: 60_000 };
    let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
    let store = SqliteChainStore::open(&path, "producer-1", config, clock).expect("open store");
    store.append_judgment(judgment(1)).expect("append succeeds");

    let raw = rusqlite::Connection::open(&path).expect("raw connection");
    raw.execute("UPDATE blocks SET merkle_root = ?1 WHERE slot = 0", rusqlite::params!["0".repeat(64)])
        .expect("tamper with stored merkle root");
    drop(raw);

    assert!(!store.verify_integrity(SlotId::GENESIS).valid);
    assert!(store.is_read_only());
    assert!(store.status().read_only);

    let err = store.append_judgment(judgment(2)).expect_err("writes blocked while read-only");
    assert!(matches!(err, judgnode_chain::ChainError::ReadOnly));

    store.reset_read_only();
    assert!(!store.is_read_only());
    store.append_judgment(judgment(2)).expect("writes resume after reset");
}

#[test]
fn close_if_idle_closes_only_after_idle_ms() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("chain.sqlite3");
    let config = ChainConfig { slot_judgment_limit: 100, idle_close_ms: 1_000 };
    let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
    let store = SqliteChainStore::open(&path, "producer-1", config, clock.clone()).expect("open store");

    store.append_judgment(judgment(1)).expect("append succeeds");
    assert!(store.close_if_idle().expect("no hash error").is_none());
    clock.advance(1_000);
    assert!(store.close_if_idle().expect("no hash error").is_some());
}

// crates/judgnode-chain-sqlite/src/lib.rs
// ============================================================================
// Module: Judgment Node Chain SQLite
// Description: Durable ChainStore backed by SQLite WAL.
// Purpose: Persist Proof-of-Judgment blocks across process restarts.
// Dependencies: judgnode-chain, judgnode-core, judgnode-config, rusqlite
// ============================================================================

//! ## Overview
//! [`SqliteChainStore`] implements [`judgnode_chain::ChainStore`] against a
//! `SQLite` file. Pending judgments accumulate in memory (mirroring
//! [`judgnode_chain::store::MemoryChainStore`]) and are flushed to durable
//! storage only when a slot closes, so a crash between appends loses at most
//! one open slot's pending judgments, never a closed block.

pub mod store;

pub use store::SqliteChainStore;
pub use store::SqliteChainStoreError;

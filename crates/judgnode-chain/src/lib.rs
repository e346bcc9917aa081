// crates/judgnode-chain/src/lib.rs
// ============================================================================
// Module: Judgment Node Chain
// Description: Append-only, slot-based, Merkle-linked judgment log.
// Purpose: Batch judgments into verifiable blocks with hash links.
// Dependencies: judgnode-core, judgnode-config
// ============================================================================

//! ## Overview
//! The Proof-of-Judgment chain: [`store::ChainStore`] is the trait contract,
//! [`store::MemoryChainStore`] the default in-memory implementation. A
//! SQLite-backed implementation lives in the sibling `judgnode-chain-sqlite`
//! crate.

pub mod store;
pub mod types;

pub use store::ChainError;
pub use store::ChainStore;
pub use store::MemoryChainStore;
pub use types::Block;
pub use types::ChainStatus;
pub use types::IntegrityError;
pub use types::IntegrityReport;
pub use types::JudgmentEntry;
pub use types::PendingJudgment;

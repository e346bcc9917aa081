// crates/judgnode-chain/src/types.rs
// ============================================================================
// Module: Chain Types
// Description: The judgment/block shapes appended to the Proof-of-Judgment chain.
// Purpose: Give every block a stable, hashable, serializable shape.
// Dependencies: judgnode-core, serde, serde_json
// ============================================================================

use judgnode_core::DecisionId;
use judgnode_core::HashDigest;
use judgnode_core::SlotId;
use judgnode_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

/// A judgment submitted for inclusion in the next block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingJudgment {
    /// The decision record id this judgment corresponds to.
    pub id: DecisionId,
    /// Canonical-hashable payload (typically the decision record, serialized).
    pub payload: serde_json::Value,
}

/// A judgment as recorded in a closed block: its id and its content hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentEntry {
    /// The decision record id.
    pub id: DecisionId,
    /// Hash of the judgment's canonical payload.
    pub hash: HashDigest,
}

/// A closed, hash-linked block of judgments.
///
/// # Invariants
/// - `slot == 0` implies `parent_hash` is the all-zero digest.
/// - For `slot > 0`, `parent_hash` equals the prior block's `self_hash`.
/// - `merkle_root` is the pairwise Merkle root of `judgments`' hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Monotonic, contiguous slot number starting at 0.
    pub slot: SlotId,
    /// Hash of the previous block (all-zero for the genesis block).
    pub parent_hash: HashDigest,
    /// Merkle root over this block's judgment hashes.
    pub merkle_root: HashDigest,
    /// Judgments included in this block, in append order.
    pub judgments: Vec<JudgmentEntry>,
    /// Identifier of the node that produced this block.
    pub producer_id: String,
    /// When this block was closed.
    pub timestamp: Timestamp,
    /// This block's own content hash.
    pub self_hash: HashDigest,
}

/// Summary returned by `ChainStore::status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainStatus {
    /// The most recently closed slot, or `None` if no block has been closed.
    pub head_slot: Option<SlotId>,
    /// Number of judgments accumulated since the last close.
    pub pending: usize,
    /// Total closed blocks.
    pub block_count: usize,
    /// Total judgments ever appended, across all blocks and pending.
    pub total_judgments: usize,
    /// True once `verify_integrity` has found a break and writes are
    /// blocked pending an operator's explicit [`ChainStore::reset_read_only`].
    pub read_only: bool,
}

/// A single integrity violation found by `ChainStore::verify_integrity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityError {
    /// The stored parent hash does not match the prior block's self-hash.
    ParentMismatch(SlotId),
    /// The recomputed Merkle root differs from the stored one.
    MerkleMismatch(SlotId),
    /// Slot numbers are not contiguous.
    SlotGap(SlotId),
    /// The backing store could not be read while walking the chain.
    Unreadable(String),
}

/// Result of `ChainStore::verify_integrity`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntegrityReport {
    /// True only if `errors` is empty.
    pub valid: bool,
    /// Every integrity violation found, in slot order.
    pub errors: Vec<IntegrityError>,
}

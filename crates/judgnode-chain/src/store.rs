// crates/judgnode-chain/src/store.rs
// ============================================================================
// Module: Chain Store
// Description: Append-only, slotted, Merkle-linked judgment log.
// Purpose: Batch judgments into hash-linked blocks and verify integrity.
// Dependencies: judgnode-core, judgnode-config, serde_json
// ============================================================================

//! ## Overview
//! [`MemoryChainStore`] is the default, in-memory [`ChainStore`]
//! implementation. Slot closure follows the precedence spelled out in this
//! system's configuration contract: an explicit [`ChainStore::close_slot`]
//! call always wins; otherwise the size threshold
//! (`ChainConfig::slot_judgment_limit`) is checked on every append, and the
//! idle timer (`ChainConfig::idle_close_ms`) is left to a caller-driven
//! background loop via [`MemoryChainStore::close_if_idle`].

use std::ops::Range;
use std::sync::RwLock;

use judgnode_config::ChainConfig;
use judgnode_core::Clock;
use judgnode_core::HashAlgorithm;
use judgnode_core::HashDigest;
use judgnode_core::SlotId;
use judgnode_core::hash_canonical_json;
use judgnode_core::hash_pair;

use crate::types::Block;
use crate::types::ChainStatus;
use crate::types::IntegrityError;
use crate::types::IntegrityReport;
use crate::types::JudgmentEntry;
use crate::types::PendingJudgment;

/// Errors raised while appending to or closing a [`ChainStore`].
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The judgment's payload could not be canonically hashed.
    #[error("judgment payload could not be hashed: {0}")]
    Hashing(#[from] serde_json::Error),
    /// An internal digest failed to decode during Merkle computation.
    #[error("internal digest decode failure: {0}")]
    Digest(#[from] judgnode_core::HashDecodeError),
    /// A durable backend failed to read or write its underlying storage.
    #[error("chain storage failure: {0}")]
    Storage(String),
    /// `verify_integrity` found a break; writes are blocked until an
    /// operator calls [`ChainStore::reset_read_only`].
    #[error("chain is read-only pending operator reset")]
    ReadOnly,
}

/// Append-only, slot-based, Merkle-linked judgment log.
///
/// # Invariants
/// - Implementations serialize appenders; readers never block on a writer
///   holding only a read lock elsewhere.
pub trait ChainStore: Send + Sync {
    /// Adds `judgment` to the pending batch, possibly triggering an
    /// automatic close if the size threshold is reached. Returns the
    /// pending count observed immediately after this call.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] if the judgment cannot be hashed, or if an
    /// automatic close fails.
    fn append_judgment(&self, judgment: PendingJudgment) -> Result<usize, ChainError>;

    /// Closes the current pending batch into a new block, regardless of
    /// whether the size threshold has been reached.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] if Merkle computation fails.
    fn close_slot(&self) -> Result<Block, ChainError>;

    /// Walks blocks from `from_slot` to the head, checking hash links and
    /// Merkle roots.
    fn verify_integrity(&self, from_slot: SlotId) -> IntegrityReport;

    /// Current head slot, pending count, and aggregate stats.
    fn status(&self) -> ChainStatus;

    /// Returns closed blocks whose slot numbers fall in `range`.
    fn iter_blocks(&self, range: Range<u64>) -> Vec<Block>;

    /// True once a prior [`ChainStore::verify_integrity`] call found a break.
    /// While true, [`ChainStore::append_judgment`] and
    /// [`ChainStore::close_slot`] return [`ChainError::ReadOnly`]; reads are
    /// unaffected.
    fn is_read_only(&self) -> bool;

    /// Clears a read-only state set by a prior integrity failure. Intended
    /// to be called only after an operator has investigated and confirmed
    /// the chain is safe to resume writing to.
    fn reset_read_only(&self);
}

struct Inner {
    blocks: Vec<Block>,
    pending: Vec<JudgmentEntry>,
    last_activity: judgnode_core::Timestamp,
}

/// Default in-memory [`ChainStore`].
pub struct MemoryChainStore {
    producer_id: String,
    config: ChainConfig,
    clock: std::sync::Arc<dyn Clock>,
    inner: RwLock<Inner>,
    read_only: std::sync::atomic::AtomicBool,
}

impl MemoryChainStore {
    /// Creates an empty chain for `producer_id`.
    #[must_use]
    pub fn new(producer_id: impl Into<String>, config: ChainConfig, clock: std::sync::Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            producer_id: producer_id.into(),
            config,
            clock,
            inner: RwLock::new(Inner { blocks: Vec::new(), pending: Vec::new(), last_activity: now }),
            read_only: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Closes the current batch if it has been idle for at least
    /// `ChainConfig::idle_close_ms` and is non-empty. Intended to be driven
    /// by a periodic background task, not called from the hot append path.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] if Merkle computation fails.
    pub fn close_if_idle(&self) -> Result<Option<Block>, ChainError> {
        let now = self.clock.now();
        let should_close = {
            let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            !inner.pending.is_empty() && inner.last_activity.elapsed_until(now) >= self.config.idle_close_ms
        };
        if should_close { self.close_slot().map(Some) } else { Ok(None) }
    }

    fn merkle_root(judgments: &[JudgmentEntry]) -> Result<HashDigest, ChainError> {
        if judgments.is_empty() {
            return Ok(HashDigest::zero(HashAlgorithm::Sha256));
        }
        let mut layer: Vec<HashDigest> = judgments.iter().map(|j| j.hash.clone()).collect();
        while layer.len() > 1 {
            if layer.len() % 2 == 1
                && let Some(last) = layer.last().cloned()
            {
                layer.push(last);
            }
            let mut next = Vec::with_capacity(layer.len() / 2);
            for pair in layer.chunks(2) {
                next.push(hash_pair(&pair[0], &pair[1])?);
            }
            layer = next;
        }
        Ok(layer.into_iter().next().unwrap_or_else(|| HashDigest::zero(HashAlgorithm::Sha256)))
    }
}

impl ChainStore for MemoryChainStore {
    fn append_judgment(&self, judgment: PendingJudgment) -> Result<usize, ChainError> {
        if self.is_read_only() {
            return Err(ChainError::ReadOnly);
        }
        let hash = hash_canonical_json(HashAlgorithm::Sha256, &judgment.payload)?;
        let now = self.clock.now();
        let pending_count = {
            let mut inner = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            inner.pending.push(JudgmentEntry { id: judgment.id, hash });
            inner.last_activity = now;
            inner.pending.len()
        };
        if pending_count >= self.config.slot_judgment_limit as usize {
            self.close_slot()?;
            return Ok(0);
        }
        Ok(pending_count)
    }

    fn close_slot(&self) -> Result<Block, ChainError> {
        if self.is_read_only() {
            return Err(ChainError::ReadOnly);
        }
        let now = self.clock.now();
        let mut inner = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let judgments = std::mem::take(&mut inner.pending);
        let merkle_root = Self::merkle_root(&judgments)?;
        let slot = inner.blocks.last().map_or(SlotId::GENESIS, |block| block.slot.next());
        let parent_hash = inner
            .blocks
            .last()
            .map_or_else(|| HashDigest::zero(HashAlgorithm::Sha256), |block| block.self_hash.clone());

        let mut writer = judgnode_core::CanonicalWriter::new();
        writer.field_u64(slot.get());
        writer.field(parent_hash.value.as_bytes());
        writer.field(merkle_root.value.as_bytes());
        writer.field(self.producer_id.as_bytes());
        writer.field_u64(now.as_millis().try_into().unwrap_or(0));
        for entry in &judgments {
            writer.field(entry.hash.value.as_bytes());
        }
        let self_hash = judgnode_core::hash_bytes(HashAlgorithm::Sha256, &writer.into_bytes());

        let block = Block {
            slot,
            parent_hash,
            merkle_root,
            judgments,
            producer_id: self.producer_id.clone(),
            timestamp: now,
            self_hash,
        };
        inner.blocks.push(block.clone());
        inner.last_activity = now;
        Ok(block)
    }

    fn verify_integrity(&self, from_slot: SlotId) -> IntegrityReport {
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut errors = Vec::new();
        let mut expected_slot = from_slot;
        let mut previous_hash: Option<HashDigest> = if from_slot == SlotId::GENESIS {
            None
        } else {
            inner.blocks.iter().find(|b| b.slot.get() + 1 == from_slot.get()).map(|b| b.self_hash.clone())
        };

        for block in inner.blocks.iter().filter(|b| b.slot.get() >= from_slot.get()) {
            if block.slot != expected_slot {
                errors.push(IntegrityError::SlotGap(block.slot));
            }
            expected_slot = block.slot.next();

            let expected_parent = previous_hash
                .clone()
                .unwrap_or_else(|| HashDigest::zero(HashAlgorithm::Sha256));
            if block.parent_hash != expected_parent {
                errors.push(IntegrityError::ParentMismatch(block.slot));
            }

            match Self::merkle_root(&block.judgments) {
                Ok(root) if root == block.merkle_root => {}
                _ => errors.push(IntegrityError::MerkleMismatch(block.slot)),
            }

            previous_hash = Some(block.self_hash.clone());
        }

        let valid = errors.is_empty();
        if !valid {
            self.read_only.store(true, std::sync::atomic::Ordering::SeqCst);
        }
        IntegrityReport { valid, errors }
    }

    fn status(&self) -> ChainStatus {
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let total_judgments =
            inner.blocks.iter().map(|block| block.judgments.len()).sum::<usize>() + inner.pending.len();
        ChainStatus {
            head_slot: inner.blocks.last().map(|block| block.slot),
            pending: inner.pending.len(),
            block_count: inner.blocks.len(),
            total_judgments,
            read_only: self.is_read_only(),
        }
    }

    fn iter_blocks(&self, range: Range<u64>) -> Vec<Block> {
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.blocks.iter().filter(|block| range.contains(&block.slot.get())).cloned().collect()
    }

    fn is_read_only(&self) -> bool {
        self.read_only.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn reset_read_only(&self) {
        self.read_only.store(false, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use std::sync::Arc;

    use judgnode_config::ChainConfig;
    use judgnode_core::DecisionId;
    use judgnode_core::FixedClock;
    use judgnode_core::SlotId;
    use judgnode_core::Timestamp;

    use super::ChainStore;
    use super::MemoryChainStore;
    use crate::types::PendingJudgment;

    fn chain(limit: u32) -> MemoryChainStore {
        let config = ChainConfig { slot_judgment_limit: limit, idle_close_ms: 60_000 };
        MemoryChainStore::new("producer-1", config, Arc::new(FixedClock::new(Timestamp::from_millis(0))))
    }

    fn judgment(n: u64) -> PendingJudgment {
        PendingJudgment { id: DecisionId::new(format!("d{n}")), payload: serde_json::json!({"n": n}) }
    }

    #[test]
    fn genesis_parent_hash_is_all_zero() {
        let chain = chain(10);
        chain.append_judgment(judgment(1)).expect("append succeeds");
        let block = chain.close_slot().expect("close succeeds");
        assert_eq!(block.slot, SlotId::GENESIS);
        assert_eq!(block.parent_hash, judgnode_core::HashDigest::zero(judgnode_core::HashAlgorithm::Sha256));
    }

    #[test]
    fn size_threshold_auto_closes_on_append() {
        let chain = chain(2);
        assert_eq!(chain.append_judgment(judgment(1)).expect("append succeeds"), 1);
        assert_eq!(chain.append_judgment(judgment(2)).expect("append succeeds"), 0, "auto-closed at limit");
        assert_eq!(chain.status().block_count, 1);
    }

    #[test]
    fn blocks_link_by_parent_hash() {
        let chain = chain(1);
        chain.append_judgment(judgment(1)).expect("append succeeds");
        chain.append_judgment(judgment(2)).expect("append succeeds");
        let blocks = chain.iter_blocks(0..10);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].parent_hash, blocks[0].self_hash);
    }

    #[test]
    fn verify_integrity_passes_on_untampered_chain() {
        let chain = chain(1);
        chain.append_judgment(judgment(1)).expect("append succeeds");
        chain.append_judgment(judgment(2)).expect("append succeeds");
        chain.append_judgment(judgment(3)).expect("append succeeds");
        let report = chain.verify_integrity(SlotId::GENESIS);
        assert!(report.valid, "errors: {:?}", report.errors);
    }

    #[test]
    fn verify_integrity_detects_tampered_merkle_root() {
        let chain = chain(1);
        chain.append_judgment(judgment(1)).expect("append succeeds");
        chain.close_slot().expect("close succeeds");
        chain.append_judgment(judgment(2)).expect("append succeeds");
        chain.close_slot().expect("close succeeds");
        {
            let mut inner = chain.inner.write().expect("lock poisoned");
            inner.blocks[0].merkle_root = judgnode_core::HashDigest::zero(judgnode_core::HashAlgorithm::Sha256);
        }
        let report = chain.verify_integrity(SlotId::GENESIS);
        assert!(!report.valid);
    }

    #[test]
    fn odd_judgment_counts_duplicate_the_last_leaf() {
        let chain = chain(10);
        chain.append_judgment(judgment(1)).expect("append succeeds");
        chain.append_judgment(judgment(2)).expect("append succeeds");
        chain.append_judgment(judgment(3)).expect("append succeeds");
        let block = chain.close_slot().expect("close succeeds");
        assert_eq!(block.judgments.len(), 3);
    }

    #[test]
    fn detected_tamper_blocks_further_writes_until_reset() {
        let chain = chain(1);
        chain.append_judgment(judgment(1)).expect("append succeeds");
        chain.close_slot().expect("close succeeds");
        {
            let mut inner = chain.inner.write().expect("lock poisoned");
            inner.blocks[0].merkle_root = judgnode_core::HashDigest::zero(judgnode_core::HashAlgorithm::Sha256);
        }
        assert!(!chain.verify_integrity(SlotId::GENESIS).valid);
        assert!(chain.is_read_only());
        assert!(chain.status().read_only);

        let err = chain.append_judgment(judgment(2)).expect_err("writes blocked while read-only");
        assert!(matches!(err, super::ChainError::ReadOnly));

        chain.reset_read_only();
        assert!(!chain.is_read_only());
        chain.append_judgment(judgment(2)).expect("writes resume after reset");
    }

    #[test]
    fn close_if_idle_closes_only_after_idle_ms() {
        let config = ChainConfig { slot_judgment_limit: 10, idle_close_ms: 1_000 };
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let chain = MemoryChainStore::new("producer-1", config, clock.clone());
        chain.append_judgment(judgment(1)).expect("append succeeds");
        assert!(chain.close_if_idle().expect("no hash error").is_none());
        clock.advance(1_000);
        assert!(chain.close_if_idle().expect("no hash error").is_some());
    }
}

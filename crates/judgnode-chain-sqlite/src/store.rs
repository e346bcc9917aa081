// crates/judgnode-chain-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Chain Store
// Description: Durable ChainStore backed by SQLite WAL.
// Purpose: Persist closed Proof-of-Judgment blocks across restarts.
// Dependencies: judgnode-chain, judgnode-core, judgnode-config, rusqlite
// ============================================================================

//! ## Overview
//! Closed blocks are the unit of durability: every [`ChainStore::close_slot`]
//! call commits its block to `SQLite` before returning. Pending (not yet
//! closed) judgments stay in memory only, mirroring
//! [`judgnode_chain::store::MemoryChainStore`] — a crash loses at most one
//! open slot's pending judgments, never a closed block.

use std::ops::Range;
use std::path::Path;
use std::sync::Mutex;
use std::sync::RwLock;

use judgnode_chain::Block;
use judgnode_chain::ChainError;
use judgnode_chain::ChainStatus;
use judgnode_chain::ChainStore;
use judgnode_chain::IntegrityError;
use judgnode_chain::IntegrityReport;
use judgnode_chain::JudgmentEntry;
use judgnode_chain::PendingJudgment;
use judgnode_config::ChainConfig;
use judgnode_core::Clock;
use judgnode_core::HashAlgorithm;
use judgnode_core::HashDigest;
use judgnode_core::SlotId;
use judgnode_core::Timestamp;
use judgnode_core::hash_canonical_json;
use judgnode_core::hash_pair;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

/// `SQLite` schema version for the chain store.
const SCHEMA_VERSION: i64 = 1;

/// Errors raised while opening or operating a [`SqliteChainStore`].
#[derive(Debug, thiserror::Error)]
pub enum SqliteChainStoreError {
    /// The database file could not be opened or queried.
    #[error("sqlite chain store db error: {0}")]
    Db(String),
    /// A stored block's judgment list could not be (de)serialized.
    #[error("sqlite chain store encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for SqliteChainStoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<SqliteChainStoreError> for ChainError {
    fn from(err: SqliteChainStoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

struct PendingState {
    judgments: Vec<JudgmentEntry>,
    last_activity: Timestamp,
}

/// `SQLite`-backed [`ChainStore`] implementation.
///
/// # Invariants
/// - Every row in `blocks` has already passed Merkle/parent-hash checks at
///   the moment it was written by [`ChainStore::close_slot`].
pub struct SqliteChainStore {
    producer_id: String,
    config: ChainConfig,
    clock: std::sync::Arc<dyn Clock>,
    connection: Mutex<Connection>,
    pending: RwLock<PendingState>,
    read_only: std::sync::atomic::AtomicBool,
}

impl SqliteChainStore {
    /// Opens (creating if absent) a `SQLite`-backed chain store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteChainStoreError`] if the database cannot be opened or
    /// its schema initialized.
    pub fn open(
        path: impl AsRef<Path>,
        producer_id: impl Into<String>,
        config: ChainConfig,
        clock: std::sync::Arc<dyn Clock>,
    ) -> Result<Self, SqliteChainStoreError> {
        let connection = open_connection(path.as_ref())?;
        let now = clock.now();
        Ok(Self {
            producer_id: producer_id.into(),
            config,
            clock,
            connection: Mutex::new(connection),
            pending: RwLock::new(PendingState { judgments: Vec::new(), last_activity: now }),
            read_only: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Closes the current batch if it has been idle for at least
    /// `ChainConfig::idle_close_ms` and is non-empty. Intended to be driven
    /// by a periodic background task.
    ///
    /// # Errors
    ///
    /// Returns [`ChainError`] if the close fails.
    pub fn close_if_idle(&self) -> Result<Option<Block>, ChainError> {
        let now = self.clock.now();
        let should_close = {
            let pending = self.pending.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            !pending.judgments.is_empty()
                && pending.last_activity.elapsed_until(now) >= self.config.idle_close_ms
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

    fn head(connection: &Connection) -> Result<Option<(SlotId, HashDigest)>, SqliteChainStoreError> {
        let row: Option<(i64, String)> = connection
            .query_row(
                "SELECT slot, self_hash_value FROM blocks ORDER BY slot DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(row.map(|(slot, value)| (slot_from_raw(slot), HashDigest { algorithm: HashAlgorithm::Sha256, value })))
    }

    fn insert_block(connection: &Connection, block: &Block) -> Result<(), SqliteChainStoreError> {
        let judgments_json = serde_json::to_string(&block.judgments)?;
        connection.execute(
            "INSERT INTO blocks (
                slot, parent_hash, merkle_root, producer_id, timestamp_ms,
                self_hash, judgment_count, judgments_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                raw_from_slot(block.slot),
                block.parent_hash.value,
                block.merkle_root.value,
                block.producer_id,
                block.timestamp.as_millis(),
                block.self_hash.value,
                i64::try_from(block.judgments.len()).unwrap_or(i64::MAX),
                judgments_json,
            ],
        )?;
        Ok(())
    }

    fn row_to_block(row: BlockRow) -> Result<Block, SqliteChainStoreError> {
        let judgments: Vec<JudgmentEntry> = serde_json::from_str(&row.judgments_json)?;
        Ok(Block {
            slot: slot_from_raw(row.slot),
            parent_hash: HashDigest { algorithm: HashAlgorithm::Sha256, value: row.parent_hash },
            merkle_root: HashDigest { algorithm: HashAlgorithm::Sha256, value: row.merkle_root },
            judgments,
            producer_id: row.producer_id,
            timestamp: Timestamp::from_millis(row.timestamp_ms),
            self_hash: HashDigest { algorithm: HashAlgorithm::Sha256, value: row.self_hash },
        })
    }

    fn blocks_in_range(&self, range: &Range<u64>) -> Result<Vec<Block>, SqliteChainStoreError> {
        let connection = self.connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = connection.prepare(
            "SELECT slot, parent_hash, merkle_root, producer_id, timestamp_ms, self_hash, judgments_json
             FROM blocks WHERE slot >= ?1 AND slot < ?2 ORDER BY slot ASC",
        )?;
        let rows = stmt.query_map(
            params![raw_from_u64(range.start), raw_from_u64(range.end)],
            |row| {
                Ok(BlockRow {
                    slot: row.get(0)?,
                    parent_hash: row.get(1)?,
                    merkle_root: row.get(2)?,
                    producer_id: row.get(3)?,
                    timestamp_ms: row.get(4)?,
                    self_hash: row.get(5)?,
                    judgments_json: row.get(6)?,
                })
            },
        )?;
        let mut blocks = Vec::new();
        for row in rows {
            blocks.push(Self::row_to_block(row?)?);
        }
        Ok(blocks)
    }

    fn summary(&self) -> Result<(Option<i64>, i64, i64), SqliteChainStoreError> {
        let connection = self.connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let row: (Option<i64>, i64, Option<i64>) = connection.query_row(
            "SELECT MAX(slot), COUNT(*), SUM(judgment_count) FROM blocks",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;
        Ok((row.0, row.1, row.2.unwrap_or(0)))
    }
}

struct BlockRow {
    slot: i64,
    parent_hash: String,
    merkle_root: String,
    producer_id: String,
    timestamp_ms: i64,
    self_hash: String,
    judgments_json: String,
}

fn slot_from_raw(raw: i64) -> SlotId {
    SlotId::new(u64::try_from(raw).unwrap_or(0))
}

fn raw_from_slot(slot: SlotId) -> i64 {
    i64::try_from(slot.get()).unwrap_or(i64::MAX)
}

fn raw_from_u64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn open_connection(path: &Path) -> Result<Connection, SqliteChainStoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| SqliteChainStoreError::Db(err.to_string()))?;
    }
    let connection = Connection::open(path)?;
    connection.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
    initialize_schema(&connection)?;
    Ok(connection)
}

fn initialize_schema(connection: &Connection) -> Result<(), SqliteChainStoreError> {
    connection.execute_batch("CREATE TABLE IF NOT EXISTS chain_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> =
        connection.query_row("SELECT version FROM chain_meta LIMIT 1", [], |row| row.get(0)).optional()?;
    if version.is_none() {
        connection.execute("INSERT INTO chain_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
        connection.execute_batch(
            "CREATE TABLE IF NOT EXISTS blocks (
                slot INTEGER PRIMARY KEY,
                parent_hash TEXT NOT NULL,
                merkle_root TEXT NOT NULL,
                producer_id TEXT NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                self_hash TEXT NOT NULL,
                judgment_count INTEGER NOT NULL,
                judgments_json TEXT NOT NULL
            );",
        )?;
    }
    Ok(())
}

impl ChainStore for SqliteChainStore {
    fn append_judgment(&self, judgment: PendingJudgment) -> Result<usize, ChainError> {
        if self.is_read_only() {
            return Err(ChainError::ReadOnly);
        }
        let hash = hash_canonical_json(HashAlgorithm::Sha256, &judgment.payload)?;
        let now = self.clock.now();
        let pending_count = {
            let mut pending = self.pending.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            pending.judgments.push(JudgmentEntry { id: judgment.id, hash });
            pending.last_activity = now;
            pending.judgments.len()
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
        let judgments = {
            let mut pending = self.pending.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            std::mem::take(&mut pending.judgments)
        };
        let merkle_root = Self::merkle_root(&judgments)?;

        let connection = self.connection.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let head = Self::head(&connection).map_err(ChainError::from)?;
        let slot = head.as_ref().map_or(SlotId::GENESIS, |(slot, _)| slot.next());
        let parent_hash =
            head.map_or_else(|| HashDigest::zero(HashAlgorithm::Sha256), |(_, self_hash)| self_hash);

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
        Self::insert_block(&connection, &block).map_err(ChainError::from)?;
        drop(connection);
        {
            let mut pending = self.pending.write().unwrap_or_else(std::sync::PoisonError::into_inner);
            pending.last_activity = now;
        }
        Ok(block)
    }

    fn verify_integrity(&self, from_slot: SlotId) -> IntegrityReport {
        let blocks = match self.blocks_in_range(&(from_slot.get()..u64::MAX)) {
            Ok(blocks) => blocks,
            Err(err) => {
                self.read_only.store(true, std::sync::atomic::Ordering::SeqCst);
                return IntegrityReport {
                    valid: false,
                    errors: vec![IntegrityError::Unreadable(err.to_string())],
                };
            }
        };
        let mut previous_hash: Option<HashDigest> = if from_slot == SlotId::GENESIS {
            None
        } else {
            match self.blocks_in_range(&(0..from_slot.get())) {
                Ok(prior) => prior.last().map(|block| block.self_hash.clone()),
                Err(err) => {
                    self.read_only.store(true, std::sync::atomic::Ordering::SeqCst);
                    return IntegrityReport {
                        valid: false,
                        errors: vec![IntegrityError::Unreadable(err.to_string())],
                    };
                }
            }
        };

        let mut errors = Vec::new();
        let mut expected_slot = from_slot;
        for block in &blocks {
            if block.slot != expected_slot {
                errors.push(IntegrityError::SlotGap(block.slot));
            }
            expected_slot = block.slot.next();

            let expected_parent =
                previous_hash.clone().unwrap_or_else(|| HashDigest::zero(HashAlgorithm::Sha256));
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
        let pending_len = {
            let pending = self.pending.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            pending.judgments.len()
        };
        let Ok((max_slot, block_count, closed_judgments)) = self.summary() else {
            return ChainStatus {
                head_slot: None,
                pending: pending_len,
                block_count: 0,
                total_judgments: pending_len,
                read_only: self.is_read_only(),
            };
        };
        ChainStatus {
            head_slot: max_slot.map(slot_from_raw),
            pending: pending_len,
            block_count: block_count.max(0) as usize,
            total_judgments: closed_judgments.max(0) as usize + pending_len,
            read_only: self.is_read_only(),
        }
    }

    fn iter_blocks(&self, range: Range<u64>) -> Vec<Block> {
        self.blocks_in_range(&range).unwrap_or_default()
    }

    fn is_read_only(&self) -> bool {
        self.read_only.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn reset_read_only(&self) {
        self.read_only.store(false, std::sync::atomic::Ordering::SeqCst);
    }
}

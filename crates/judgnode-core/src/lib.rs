// crates/judgnode-core/src/lib.rs
// ============================================================================
// Module: Judgment Node Core
// Description: Shared identifiers, time, hashing, and event/record types.
// Purpose: Provide the wire-stable vocabulary every other crate builds on.
// Dependencies: serde, serde_jcs, sha2, thiserror, tokio (sync primitives only)
// ============================================================================

//! ## Overview
//! `judgnode-core` holds the data model shared across the judgment node: the
//! [`Timestamp`]/[`Clock`] abstraction, canonical [`hashing`], the golden-ratio
//! constants used throughout routing and ranking, and the transient/persistent
//! record types from the decision pipeline (`Decision Event`, `Decision
//! Record`). Nothing here performs I/O; components are threaded a [`Clock`] at
//! construction rather than reading wall-clock time inline.

pub mod cancel;
pub mod event;
pub mod golden;
pub mod hashing;
pub mod identifiers;
pub mod record;
pub mod time;

pub use cancel::CancelToken;
pub use event::DecisionEvent;
pub use event::EventKind;
pub use event::EventSource;
pub use golden::PHI;
pub use golden::PHI_INV;
pub use golden::PHI_INV2;
pub use hashing::CanonicalWriter;
pub use hashing::HashAlgorithm;
pub use hashing::HashDecodeError;
pub use hashing::HashDigest;
pub use hashing::hash_bytes;
pub use hashing::hash_canonical_json;
pub use hashing::hash_pair;
pub use identifiers::DecisionId;
pub use identifiers::DomainName;
pub use identifiers::EdgeId;
pub use identifiers::EventId;
pub use identifiers::NodeId;
pub use identifiers::SlotId;
pub use identifiers::UserId;
pub use record::DecisionRecord;
pub use record::InterventionLevel;
pub use record::Outcome;
pub use record::TraceStep;
pub use time::Clock;
pub use time::FixedClock;
pub use time::SystemClock;
pub use time::Timestamp;

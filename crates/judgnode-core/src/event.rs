// crates/judgnode-core/src/event.rs
// ============================================================================
// Module: Decision Event
// Description: The transient input to the orchestrator pipeline.
// Purpose: Carry a proposed action plus enough context to judge it.
// Dependencies: crate::identifiers, crate::time, serde
// ============================================================================

//! ## Overview
//! A [`DecisionEvent`] is created on ingress and destroyed once its trace
//! entry is evicted from the tracer's ring buffer; it is never persisted on
//! its own (the [`crate::record::DecisionRecord`] it produces is what gets
//! chained and traced).

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::EventId;
use crate::identifiers::UserId;
use crate::time::Timestamp;

/// The kind of action or lifecycle signal a [`DecisionEvent`] describes.
///
/// # Invariants
/// - Variants are stable for serialization and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// A user-authored prompt or instruction.
    UserPrompt,
    /// A proposed tool invocation.
    ToolUse,
    /// A session has started.
    SessionStart,
    /// A session has ended.
    SessionEnd,
    /// A file was created, edited, or deleted.
    FileChange,
    /// An error was observed upstream.
    Error,
    /// An explicit judgment was requested by the caller.
    JudgmentRequest,
}

/// Where a [`DecisionEvent`] originated.
///
/// # Invariants
/// - Variants are stable for serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventSource {
    /// Emitted by a tool invocation.
    Tool,
    /// Emitted by a host-level event hook.
    Hook,
    /// Emitted internally (e.g. by a background loop).
    Internal,
}

/// User context accompanying a [`DecisionEvent`], used to refresh session state.
///
/// # Invariants
/// - `trust_value`, when present, is in `0.0..=100.0`; out-of-range values are
///   clamped by the consumer, not rejected here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// A freshly supplied trust value, overriding persisted session state.
    pub trust_value: Option<f64>,
    /// The user's currently active project, if known.
    pub current_project: Option<String>,
}

/// A proposed action entering the judgment pipeline.
///
/// # Invariants
/// - `id` is unique per event.
/// - `content` is treated as opaque text; it is never parsed as code or markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionEvent {
    /// Unique event identifier.
    pub id: EventId,
    /// When the event was created.
    pub timestamp: Timestamp,
    /// What kind of action or signal this event describes.
    pub event_kind: EventKind,
    /// Where the event originated.
    pub source: EventSource,
    /// Opaque content the event is judging (a prompt, a diff, an error message).
    pub content: String,
    /// The user this event is scoped to.
    pub user_id: UserId,
    /// Context supplied alongside the event.
    pub user_context: UserContext,
    /// Free-form metadata, not interpreted by the core pipeline.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl DecisionEvent {
    /// Creates a minimal decision event with empty context and metadata.
    #[must_use]
    pub fn new(
        id: impl Into<EventId>,
        timestamp: Timestamp,
        event_kind: EventKind,
        source: EventSource,
        content: impl Into<String>,
        user_id: impl Into<UserId>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            event_kind,
            source,
            content: content.into(),
            user_id: user_id.into(),
            user_context: UserContext::default(),
            metadata: BTreeMap::new(),
        }
    }
}

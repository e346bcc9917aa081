// crates/judgnode-notify/src/sink/mod.rs
// ============================================================================
// Module: Judgment Node Notify Sink Contract
// Description: The trait every notification transport implements, plus the
// shared error and receipt types.
// Purpose: Let the orchestrator fire notifications without depending on a
// specific transport.
// Dependencies: judgnode-core, serde
// ============================================================================

//! ## Overview
//! [`NotificationSink`] is the single interface the rest of the system talks
//! to. Implementations may queue internally, drop on backpressure, or
//! forward to an external channel; callers only ever see `notify` and its
//! [`NotifyReceipt`]/[`NotifyError`] outcome.

pub mod callback;
pub mod channel;
pub mod log;
pub mod queue;

use judgnode_core::Clock;
use judgnode_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Relative urgency of a notification.
///
/// # Invariants
/// - Ordering is `Low < Normal < High < Urgent`; sinks may use this to
///   prioritize delivery but are not required to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Informational; fine to batch or surface later.
    Low,
    /// Default level for routine notifications.
    Normal,
    /// Should reach the user promptly.
    High,
    /// Demands immediate attention.
    Urgent,
}

impl Priority {
    /// Returns the kebab-case name used on the wire and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// A notification to be delivered through a [`NotificationSink`].
///
/// `notification_type` corresponds to the `type` field of the interface;
/// `type` is a reserved word so the field is spelled out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Caller-defined category, e.g. `"burnout-risk"` or `"deadline-near"`.
    pub notification_type: String,
    /// Short headline.
    pub title: String,
    /// Full message body.
    pub body: String,
    /// Relative urgency.
    pub priority: Priority,
    /// Opaque structured payload the sink may log or forward verbatim.
    pub context: serde_json::Value,
}

impl Notification {
    /// Creates a notification with an empty `context`.
    #[must_use]
    pub fn new(
        notification_type: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        priority: Priority,
    ) -> Self {
        Self {
            notification_type: notification_type.into(),
            title: title.into(),
            body: body.into(),
            priority,
            context: serde_json::Value::Null,
        }
    }

    /// Attaches a context payload, replacing any previous one.
    #[must_use]
    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

/// Outcome of a successful `notify` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyReceipt {
    /// Whether the sink accepted the notification.
    pub ok: bool,
    /// When the sink processed the call.
    pub dispatched_at: Timestamp,
}

/// Failure modes a [`NotificationSink`] may report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The transport rejected or could not reach the destination.
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
    /// Writing the audit record failed.
    #[error("notification log write failed: {0}")]
    LogWriteFailed(String),
}

/// Interface every notification transport implements.
///
/// # Invariants
/// - Implementations never block the caller indefinitely; backpressure is
///   resolved by dropping, queueing, or forwarding, never by stalling.
pub trait NotificationSink: Send + Sync {
    /// Delivers `notification`, returning a receipt or a delivery error.
    ///
    /// # Errors
    ///
    /// Returns a [`NotifyError`] when the transport is unreachable or the
    /// audit trail could not be written; backpressure is never an error
    /// (see the `ok` field of the returned receipt).
    fn notify(&self, notification: &Notification) -> Result<NotifyReceipt, NotifyError>;
}

/// Stamps a delivery outcome with the sink's clock.
pub(crate) struct ReceiptFactory;

impl ReceiptFactory {
    pub(crate) fn receipt(ok: bool, clock: &dyn Clock) -> NotifyReceipt {
        NotifyReceipt {
            ok,
            dispatched_at: clock.now(),
        }
    }
}

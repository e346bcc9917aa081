// crates/judgnode-notify/src/lib.rs
// ============================================================================
// Module: Judgment Node Notify
// Description: Notification sink interface and its in-memory implementations.
// Purpose: Let the orchestrator raise notifications without depending on a
// specific transport.
// Dependencies: judgnode-core, serde, serde_json, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`NotificationSink`] is the single interface the rest of the system talks
//! to: `notify(type, title, body, priority, context) -> { ok }`.
//! Implementations may queue internally ([`sink::queue::QueueSink`]), drop on
//! backpressure ([`sink::channel::ChannelSink`]), hand off to a closure
//! ([`sink::callback::CallbackSink`]), or write an audit trail
//! ([`sink::log::LogSink`]). Nothing outside this crate depends on which one
//! is wired in.

pub mod sink;

pub use sink::Notification;
pub use sink::NotificationSink;
pub use sink::NotifyError;
pub use sink::NotifyReceipt;
pub use sink::Priority;
pub use sink::callback::CallbackSink;
pub use sink::channel::ChannelSink;
pub use sink::log::LogSink;
pub use sink::queue::QueueSink;

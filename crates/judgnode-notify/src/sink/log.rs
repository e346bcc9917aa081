// crates/judgnode-notify/src/sink/log.rs
// ============================================================================
// Module: Judgment Node Notify Log Sink
// Description: Writes a JSON audit record for every notification instead of
// delivering it anywhere.
// Purpose: Give deployments a durable, inspectable trail of what would have
// been sent, without wiring a real transport.
// Dependencies: judgnode-core, serde_json
// ============================================================================

use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;

use judgnode_core::Clock;
use serde::Serialize;

use super::Notification;
use super::NotificationSink;
use super::NotifyError;
use super::NotifyReceipt;
use super::ReceiptFactory;

#[derive(Serialize)]
struct AuditRecord<'a> {
    notification_type: &'a str,
    title: &'a str,
    priority: &'a str,
    context: &'a serde_json::Value,
    dispatched_at_ms: i64,
}

/// Sink that serializes each notification as a JSON line into `W`.
///
/// # Invariants
/// - One JSON object per `notify` call, newline-terminated.
pub struct LogSink<W: Write + Send> {
    writer: Mutex<W>,
    clock: Arc<dyn Clock>,
}

impl<W: Write + Send> LogSink<W> {
    /// Creates a log sink writing to `writer`, timestamping records with
    /// `clock`.
    pub fn new(writer: W, clock: Arc<dyn Clock>) -> Self {
        Self {
            writer: Mutex::new(writer),
            clock,
        }
    }
}

impl<W: Write + Send> NotificationSink for LogSink<W> {
    fn notify(&self, notification: &Notification) -> Result<NotifyReceipt, NotifyError> {
        let receipt = ReceiptFactory::receipt(true, self.clock.as_ref());
        let record = AuditRecord {
            notification_type: &notification.notification_type,
            title: &notification.title,
            priority: notification.priority.as_str(),
            context: &notification.context,
            dispatched_at_ms: receipt.dispatched_at.as_millis(),
        };
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| NotifyError::LogWriteFailed("writer lock poisoned".into()))?;
        serde_json::to_writer(&mut *writer, &record)
            .map_err(|err| NotifyError::LogWriteFailed(err.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|err| NotifyError::LogWriteFailed(err.to_string()))?;
        Ok(receipt)
    }
}

// crates/judgnode-notify/src/sink/channel.rs
// ============================================================================
// Module: Judgment Node Notify Channel Sink
// Description: Forwards notifications onto a bounded async channel.
// Purpose: Let an external consumer (UI, webhook dispatcher) drain
// notifications without the sink ever blocking the caller.
// Dependencies: judgnode-core, tokio
// ============================================================================

//! ## Overview
//! A bounded `tokio::sync::mpsc` channel forwards each notification to
//! whoever holds the receiving half. When the channel is full the send is
//! dropped rather than blocked: the caller gets back `ok: false` so it can
//! decide whether to retry or give up.

use std::sync::Arc;

use judgnode_core::Clock;
use tokio::sync::mpsc::Sender;

use super::Notification;
use super::NotificationSink;
use super::NotifyError;
use super::NotifyReceipt;
use super::ReceiptFactory;

/// Sink that forwards notifications onto a bounded channel, dropping on
/// backpressure instead of blocking.
pub struct ChannelSink {
    sender: Sender<Notification>,
    clock: Arc<dyn Clock>,
}

impl ChannelSink {
    /// Creates a channel sink around `sender`, timestamping receipts with
    /// `clock`.
    #[must_use]
    pub fn new(sender: Sender<Notification>, clock: Arc<dyn Clock>) -> Self {
        Self { sender, clock }
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, notification: &Notification) -> Result<NotifyReceipt, NotifyError> {
        match self.sender.try_send(notification.clone()) {
            Ok(()) => Ok(ReceiptFactory::receipt(true, self.clock.as_ref())),
            Err(tokio::sync::mpsc::error::TrySendError::Full(_)) => {
                Ok(ReceiptFactory::receipt(false, self.clock.as_ref()))
            }
            Err(tokio::sync::mpsc::error::TrySendError::Closed(_)) => Err(
                NotifyError::DeliveryFailed("notification channel closed".into()),
            ),
        }
    }
}

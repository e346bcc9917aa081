// crates/judgnode-notify/src/sink/queue.rs
// ============================================================================
// Module: Judgment Node Notify Queue Sink
// Description: Buffers notifications in memory for a consumer to drain.
// Purpose: The "queue internally" strategy: accept every notification
// immediately, evict the oldest on overflow rather than blocking.
// Dependencies: judgnode-core
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::RwLock;

use judgnode_core::Clock;

use super::Notification;
use super::NotificationSink;
use super::NotifyError;
use super::NotifyReceipt;
use super::ReceiptFactory;

struct Inner {
    capacity: usize,
    items: VecDeque<Notification>,
}

/// Sink that buffers notifications in a bounded ring, for a consumer to
/// `drain` on its own schedule.
///
/// # Invariants
/// - Never holds more than `capacity` notifications; the oldest is evicted
///   to make room for a new one.
pub struct QueueSink {
    inner: RwLock<Inner>,
    clock: Arc<dyn Clock>,
}

impl QueueSink {
    /// Creates a queue sink bounded to `capacity` notifications (minimum 1).
    #[must_use]
    pub fn new(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(Inner {
                capacity: capacity.max(1),
                items: VecDeque::new(),
            }),
            clock,
        }
    }

    /// Removes and returns every buffered notification, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<Notification> {
        let mut inner = self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.items.drain(..).collect()
    }

    /// Returns the number of notifications currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.items.len()
    }

    /// Returns `true` when no notifications are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NotificationSink for QueueSink {
    fn notify(&self, notification: &Notification) -> Result<NotifyReceipt, NotifyError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| NotifyError::DeliveryFailed("queue lock poisoned".into()))?;
        if inner.items.len() >= inner.capacity {
            inner.items.pop_front();
        }
        inner.items.push_back(notification.clone());
        drop(inner);
        Ok(ReceiptFactory::receipt(true, self.clock.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use judgnode_core::FixedClock;
    use judgnode_core::Timestamp;

    use super::super::Priority;
    use super::*;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(Timestamp::from_millis(0)))
    }

    #[test]
    fn notifications_accumulate_until_drained() {
        let sink = QueueSink::new(4, clock());
        sink.notify(&Notification::new("a", "t1", "b", Priority::Low))
            .unwrap();
        sink.notify(&Notification::new("a", "t2", "b", Priority::Low))
            .unwrap();
        assert_eq!(sink.len(), 2);
        let drained = sink.drain();
        assert_eq!(drained.len(), 2);
        assert!(sink.is_empty());
    }

    #[test]
    fn overflow_evicts_the_oldest_entry() {
        let sink = QueueSink::new(2, clock());
        sink.notify(&Notification::new("a", "first", "b", Priority::Low))
            .unwrap();
        sink.notify(&Notification::new("a", "second", "b", Priority::Low))
            .unwrap();
        sink.notify(&Notification::new("a", "third", "b", Priority::Low))
            .unwrap();
        let drained = sink.drain();
        let titles: Vec<&str> = drained.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, ["second", "third"]);
    }

    #[test]
    fn every_notify_call_reports_ok() {
        let sink = QueueSink::new(1, clock());
        let receipt = sink
            .notify(&Notification::new("a", "t", "b", Priority::Normal))
            .unwrap();
        assert!(receipt.ok, "queueing always succeeds, even when it evicts");
    }
}

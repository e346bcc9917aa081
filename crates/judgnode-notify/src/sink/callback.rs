// crates/judgnode-notify/src/sink/callback.rs
// ============================================================================
// Module: Judgment Node Notify Callback Sink
// Description: Delivers notifications by invoking a user-supplied closure.
// Purpose: Let embedders wire notifications straight into their own code
// without standing up a queue or log file.
// Dependencies: judgnode-core
// ============================================================================

use std::sync::Arc;

use judgnode_core::Clock;

use super::Notification;
use super::NotificationSink;
use super::NotifyError;
use super::NotifyReceipt;
use super::ReceiptFactory;

/// Sink that hands each notification to a closure and reports the closure's
/// own success/failure back to the caller.
pub struct CallbackSink {
    handler: Arc<dyn Fn(&Notification) -> Result<(), NotifyError> + Send + Sync>,
    clock: Arc<dyn Clock>,
}

impl CallbackSink {
    /// Creates a callback sink around `handler`, timestamping receipts with
    /// `clock`.
    pub fn new(
        handler: Arc<dyn Fn(&Notification) -> Result<(), NotifyError> + Send + Sync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { handler, clock }
    }
}

impl NotificationSink for CallbackSink {
    fn notify(&self, notification: &Notification) -> Result<NotifyReceipt, NotifyError> {
        (self.handler)(notification)?;
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

    use std::sync::Mutex;

    use judgnode_core::FixedClock;
    use judgnode_core::Timestamp;

    use super::super::Priority;
    use super::*;

    #[test]
    fn a_successful_handler_yields_an_ok_receipt() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(10)));
        let sink = CallbackSink::new(Arc::new(|_: &Notification| Ok(())), clock);
        let notification = Notification::new("test", "title", "body", Priority::Normal);
        let receipt = sink.notify(&notification).unwrap();
        assert!(receipt.ok);
    }

    #[test]
    fn a_failing_handler_propagates_its_error() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let sink = CallbackSink::new(
            Arc::new(|_: &Notification| Err(NotifyError::DeliveryFailed("no route".into()))),
            clock,
        );
        let notification = Notification::new("test", "title", "body", Priority::Low);
        assert!(sink.notify(&notification).is_err());
    }

    #[test]
    fn the_handler_receives_the_exact_notification_delivered() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let sink = CallbackSink::new(
            Arc::new(move |n: &Notification| {
                seen_clone.lock().unwrap().push(n.title.clone());
                Ok(())
            }),
            clock,
        );
        let notification = Notification::new("alert", "burnout", "take a break", Priority::High);
        sink.notify(&notification).unwrap();
        assert_eq!(seen.lock().unwrap().as_slice(), ["burnout"]);
    }
}

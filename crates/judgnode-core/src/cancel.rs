// crates/judgnode-core/src/cancel.rs
// ============================================================================
// Module: Cancellation Token
// Description: Minimal cooperative-cancellation primitive for suspension points.
// Purpose: Let the orchestrator and background loops cancel in-flight awaits
// without depending on tokio-util (not part of the ambient stack).
// Dependencies: tokio (sync::Notify)
// ============================================================================

//! ## Overview
//! Every suspension point in the pipeline (chain append, skill invocation,
//! session load) must be cancellable. [`CancelToken`] is a small, cloneable
//! handle: `cancel()` flips a flag and wakes every waiter; `cancelled()`
//! resolves once cancellation has been requested, for use in `tokio::select!`.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use tokio::sync::Notify;

#[derive(Debug)]
struct Inner {
    flag: AtomicBool,
    notify: Notify,
}

/// A cloneable cooperative-cancellation handle.
///
/// # Invariants
/// - Once cancelled, a token never un-cancels.
#[derive(Debug, Clone)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Creates a fresh, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                flag: AtomicBool::new(false),
                notify: Notify::new(),
            }),
        }
    }

    /// Requests cancellation, waking every current and future waiter.
    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Returns true once `cancel` has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolves once cancellation has been requested.
    ///
    /// Safe to call even if cancellation already happened: the check happens
    /// before the first await point.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
            if self.is_cancelled() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::CancelToken;

    #[tokio::test]
    async fn cancel_wakes_waiters() {
        let token = CancelToken::new();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
        });
        assert!(!token.is_cancelled());
        token.cancel();
        handle.await.expect("waiter task completes after cancel");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_if_already_cancelled() {
        let token = CancelToken::new();
        token.cancel();
        token.cancelled().await;
    }
}

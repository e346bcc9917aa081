// crates/judgnode-core/src/time.rs
// ============================================================================
// Module: Judgment Node Time Model
// Description: Canonical timestamp representation plus an injectable clock.
// Purpose: Keep every time-dependent component (backoff, TTL, cooldown)
// deterministic and testable by threading time through a trait.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The core never reads wall-clock time directly. Components are constructed
//! with a [`Clock`]; `SystemClock` is the production implementation and
//! `FixedClock` is a test double that can be advanced by hand.

use std::fmt;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Deserialize;
use serde::Serialize;

/// Unix milliseconds. The sole timestamp representation used on the wire.
///
/// # Invariants
/// - Values are non-negative for any timestamp produced after the epoch;
///   no validation is performed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from raw unix milliseconds.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as unix milliseconds.
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Returns the number of milliseconds elapsed between `self` and `later`.
    ///
    /// Saturates at zero when `later` precedes `self`.
    #[must_use]
    pub fn elapsed_until(self, later: Self) -> u64 {
        later.0.saturating_sub(self.0).max(0) as u64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Source of canonical time for every time-dependent component.
///
/// # Invariants
/// - Implementations must be monotonic-enough for backoff/TTL math; they need
///   not be strictly monotonic across process restarts.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

/// Production clock backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Timestamp::from_millis(millis)
    }
}

/// Test clock that only advances when told to.
///
/// # Invariants
/// - `advance` never moves time backwards.
#[derive(Debug)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    /// Creates a fixed clock starting at `start`.
    #[must_use]
    pub const fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    /// Advances the clock by `delta_ms` and returns the new time.
    pub fn advance(&self, delta_ms: i64) -> Timestamp {
        let next = self.millis.fetch_add(delta_ms.max(0), Ordering::SeqCst) + delta_ms.max(0);
        Timestamp::from_millis(next)
    }

    /// Sets the clock to an absolute time.
    pub fn set(&self, time: Timestamp) {
        self.millis.store(time.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::Clock;
    use super::FixedClock;
    use super::Timestamp;

    #[test]
    fn fixed_clock_advances_monotonically() {
        let clock = FixedClock::new(Timestamp::from_millis(1_000));
        assert_eq!(clock.now().as_millis(), 1_000);
        clock.advance(500);
        assert_eq!(clock.now().as_millis(), 1_500);
        clock.advance(-200);
        assert_eq!(clock.now().as_millis(), 1_500, "negative deltas do not rewind the clock");
    }

    #[test]
    fn elapsed_until_saturates_at_zero() {
        let earlier = Timestamp::from_millis(100);
        let later = Timestamp::from_millis(50);
        assert_eq!(earlier.elapsed_until(later), 0);
    }
}

// crates/judgnode-circuit/src/lib.rs
// ============================================================================
// Module: Circuit Breaker
// Description: Three-state breaker guarding every external/downstream call.
// Purpose: Fail fast on a misbehaving dependency and recover via jittered
// exponential backoff with a half-open probe.
// Dependencies: judgnode-core, judgnode-config, rand, tokio (time)
// ============================================================================

//! ## Overview
//! [`CircuitBreaker`] wraps a call (sync via [`CircuitBreaker::call`], async
//! via [`CircuitBreaker::call_async`]) with the closed/open/half-open state
//! machine from spec.md §4.1. The backoff/jitter shape is grounded on the
//! `HelixOS` kernel's `nexus::bridge::circuit` breaker, adapted to use
//! [`judgnode_core::Clock`] instead of raw cycle counts and `rand` for
//! jitter instead of a fixed PRNG.
//!
//! Timeouts count as failures (spec.md §4.1): [`CircuitBreaker::call_async`]
//! races the callback against a deadline and records a timeout exactly like
//! any other failure.

use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use judgnode_config::CircuitConfig;
use judgnode_core::Clock;
use judgnode_core::Timestamp;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

/// Observable state of a [`CircuitBreaker`].
///
/// # Invariants
/// - Variants are stable for metrics exposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CircuitState {
    /// Calls execute normally.
    Closed,
    /// Calls are rejected immediately.
    Open,
    /// A single probe call is allowed through to test recovery.
    HalfOpen,
}

/// A point-in-time snapshot of a breaker's state, safe to expose as a metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    /// The breaker's name (typically the guarded resource's name).
    pub name: String,
    /// Current state.
    pub state: CircuitState,
    /// Number of times the breaker has opened since the last `reset`.
    pub consecutive_openings: u32,
    /// The backoff currently in effect, in milliseconds.
    pub current_backoff_ms: u64,
    /// Milliseconds remaining until a half-open probe is allowed (0 if closed
    /// or already eligible).
    pub time_until_probe_ms: u64,
    /// When the breaker last recorded a failure.
    pub last_fail_at: Option<Timestamp>,
    /// When the breaker last ran a half-open probe.
    pub last_probe_at: Option<Timestamp>,
}

/// Error returned by a guarded call.
#[derive(Debug, thiserror::Error)]
pub enum CircuitError<E> {
    /// The breaker is open; the call was rejected without running `fn`.
    #[error("circuit open: retry after {retry_after_ms}ms")]
    Open {
        /// Milliseconds until a probe will be allowed.
        retry_after_ms: u64,
    },
    /// `fn` exceeded its deadline.
    #[error("call timed out")]
    Timeout,
    /// `fn` ran and returned an error.
    #[error("call failed: {0}")]
    Failed(E),
}

/// A lightweight health check run before the real call in half-open state.
pub trait HealthProbe: Send + Sync {
    /// Returns true when the guarded resource looks healthy.
    fn probe(&self) -> bool;
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Timestamp, backoff_ms: u64 },
    HalfOpen { probed_at: Timestamp, backoff_ms: u64 },
}

struct Inner {
    phase: Phase,
    consecutive_openings: u32,
    last_fail_at: Option<Timestamp>,
    last_probe_at: Option<Timestamp>,
    /// Set by [`CircuitBreaker::trip`]; holds the breaker open with no
    /// auto-probe until [`CircuitBreaker::reset`], regardless of backoff.
    forced_open: bool,
}

/// Counters exposed alongside the breaker's state (spec.md §4.1).
#[derive(Debug, Default)]
struct Counters {
    opens: AtomicU64,
    half_open_probes: AtomicU64,
    passes: AtomicU64,
    rejects: AtomicU64,
}

/// Three-state circuit breaker guarding one external dependency.
///
/// # Invariants
/// - State transitions are serialized by an internal mutex; callers never
///   observe a torn transition.
pub struct CircuitBreaker {
    name: String,
    config: CircuitConfig,
    clock: std::sync::Arc<dyn Clock>,
    inner: Mutex<Inner>,
    counters: Counters,
}

impl CircuitBreaker {
    /// Creates a new, closed breaker.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitConfig, clock: std::sync::Arc<dyn Clock>) -> Self {
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(Inner {
                phase: Phase::Closed { consecutive_failures: 0 },
                consecutive_openings: 0,
                last_fail_at: None,
                last_probe_at: None,
                forced_open: false,
            }),
            counters: Counters::default(),
        }
    }

    /// Returns the breaker's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Executes `f`, synchronously, observing the breaker's state.
    ///
    /// # Errors
    ///
    /// Returns [`CircuitError::Open`] without running `f` when the breaker is
    /// open and no probe is due yet, or [`CircuitError::Failed`] when `f`
    /// itself errors.
    pub fn call<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, CircuitError<E>> {
        self.call_with_probe(None, f)
    }

    /// Executes `f`, synchronously, running `probe` first if the breaker is
    /// in the half-open window and a probe has been requested.
    ///
    /// # Errors
    ///
    /// See [`CircuitBreaker::call`].
    pub fn call_with_probe<T, E>(
        &self,
        probe: Option<&dyn HealthProbe>,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<T, CircuitError<E>> {
        self.admit(probe)?;
        match f() {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure();
                Err(CircuitError::Failed(err))
            }
        }
    }

    /// Executes an async `fut` against `deadline`, treating a timeout as a
    /// failure (spec.md §4.1: "`fn` timeouts count as failures").
    ///
    /// # Errors
    ///
    /// Returns [`CircuitError::Open`], [`CircuitError::Timeout`], or
    /// [`CircuitError::Failed`].
    pub async fn call_async<T, E, Fut>(
        &self,
        deadline: Duration,
        fut: Fut,
    ) -> Result<T, CircuitError<E>>
    where
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        self.admit(None)?;
        match tokio::time::timeout(deadline, fut).await {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                self.record_failure();
                Err(CircuitError::Failed(err))
            }
            Err(_elapsed) => {
                self.record_failure();
                Err(CircuitError::Timeout)
            }
        }
    }

    /// Forces the breaker open indefinitely: no backoff elapses and no
    /// half-open probe is ever admitted, until [`CircuitBreaker::reset`].
    pub fn trip(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.consecutive_openings += 1;
        inner.last_fail_at = Some(now);
        inner.phase = Phase::Open {
            opened_at: now,
            backoff_ms: self.config.max_backoff_ms,
        };
        inner.forced_open = true;
        self.counters.opens.fetch_add(1, Ordering::Relaxed);
    }

    /// Resets the breaker to closed, zeroing its opening count and clearing
    /// any [`CircuitBreaker::trip`].
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.phase = Phase::Closed { consecutive_failures: 0 };
        inner.consecutive_openings = 0;
        inner.forced_open = false;
    }

    /// Returns a point-in-time snapshot of the breaker's state.
    #[must_use]
    pub fn state(&self) -> CircuitSnapshot {
        let now = self.clock.now();
        let inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let (state, current_backoff_ms, time_until_probe_ms) = match inner.phase {
            Phase::Closed { .. } => (CircuitState::Closed, 0, 0),
            Phase::Open { opened_at, backoff_ms } => {
                let elapsed = opened_at.elapsed_until(now);
                (CircuitState::Open, backoff_ms, backoff_ms.saturating_sub(elapsed))
            }
            Phase::HalfOpen { backoff_ms, .. } => (CircuitState::HalfOpen, backoff_ms, 0),
        };
        CircuitSnapshot {
            name: self.name.clone(),
            state,
            consecutive_openings: inner.consecutive_openings,
            current_backoff_ms,
            time_until_probe_ms,
            last_fail_at: inner.last_fail_at,
            last_probe_at: inner.last_probe_at,
        }
    }

    /// Raw pass/reject/open/probe counters for Prometheus exposition.
    #[must_use]
    pub fn counters(&self) -> CircuitCounters {
        CircuitCounters {
            opens: self.counters.opens.load(Ordering::Relaxed),
            half_open_probes: self.counters.half_open_probes.load(Ordering::Relaxed),
            passes: self.counters.passes.load(Ordering::Relaxed),
            rejects: self.counters.rejects.load(Ordering::Relaxed),
        }
    }

    /// Decides whether a call may proceed, transitioning `Open -> HalfOpen`
    /// when the backoff has elapsed, and returns the rejection error
    /// otherwise.
    fn admit<E>(&self, probe: Option<&dyn HealthProbe>) -> Result<(), CircuitError<E>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match inner.phase {
            Phase::Closed { .. } => {}
            Phase::HalfOpen { .. } => {}
            Phase::Open { opened_at, backoff_ms } => {
                if inner.forced_open {
                    self.counters.rejects.fetch_add(1, Ordering::Relaxed);
                    return Err(CircuitError::Open { retry_after_ms: u64::MAX });
                }
                let elapsed = opened_at.elapsed_until(now);
                if elapsed < backoff_ms {
                    self.counters.rejects.fetch_add(1, Ordering::Relaxed);
                    return Err(CircuitError::Open { retry_after_ms: backoff_ms - elapsed });
                }
                inner.phase = Phase::HalfOpen { probed_at: now, backoff_ms };
                inner.last_probe_at = Some(now);
                self.counters.half_open_probes.fetch_add(1, Ordering::Relaxed);
            }
        }
        if let Some(probe) = probe
            && matches!(inner.phase, Phase::HalfOpen { .. })
            && !probe.probe()
        {
            let backoff_ms = self.next_backoff(inner.consecutive_openings);
            inner.consecutive_openings += 1;
            inner.last_fail_at = Some(now);
            inner.phase = Phase::Open { opened_at: now, backoff_ms };
            self.counters.opens.fetch_add(1, Ordering::Relaxed);
            self.counters.rejects.fetch_add(1, Ordering::Relaxed);
            return Err(CircuitError::Open { retry_after_ms: backoff_ms });
        }
        self.counters.passes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.phase = Phase::Closed { consecutive_failures: 0 };
        inner.consecutive_openings = 0;
    }

    fn record_failure(&self) {
        let now = self.clock.now();
        let mut inner = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match inner.phase {
            Phase::Closed { consecutive_failures } => {
                let failures = consecutive_failures + 1;
                inner.last_fail_at = Some(now);
                if failures >= self.config.failure_threshold {
                    let backoff_ms = self.next_backoff(inner.consecutive_openings);
                    inner.consecutive_openings += 1;
                    inner.phase = Phase::Open { opened_at: now, backoff_ms };
                    self.counters.opens.fetch_add(1, Ordering::Relaxed);
                } else {
                    inner.phase = Phase::Closed { consecutive_failures: failures };
                }
            }
            Phase::HalfOpen { .. } => {
                let backoff_ms = self.next_backoff(inner.consecutive_openings);
                inner.consecutive_openings += 1;
                inner.last_fail_at = Some(now);
                inner.phase = Phase::Open { opened_at: now, backoff_ms };
                self.counters.opens.fetch_add(1, Ordering::Relaxed);
            }
            Phase::Open { opened_at, backoff_ms } => {
                // A failure recorded while still open (e.g. a racing caller)
                // does not extend the backoff further.
                inner.last_fail_at = Some(now);
                inner.phase = Phase::Open { opened_at, backoff_ms };
            }
        }
    }

    /// `base * phi^openings`, capped, then jittered by +/- 20%.
    fn next_backoff(&self, openings: u32) -> u64 {
        let base = self.config.base_backoff_ms as f64;
        let scaled = base * judgnode_core::PHI.powi(i32::try_from(openings).unwrap_or(i32::MAX));
        let capped = scaled.min(self.config.max_backoff_ms as f64);
        let jitter = rand::thread_rng().gen_range(0.8..=1.2);
        ((capped * jitter).round() as u64).clamp(1, self.config.max_backoff_ms)
    }
}

/// Raw counters for Prometheus exposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitCounters {
    /// Total times the breaker has transitioned to open.
    pub opens: u64,
    /// Total half-open probes attempted.
    pub half_open_probes: u64,
    /// Total calls admitted (closed, or successful half-open probe).
    pub passes: u64,
    /// Total calls rejected while open.
    pub rejects: u64,
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use std::sync::Arc;

    use judgnode_config::CircuitConfig;
    use judgnode_core::FixedClock;
    use judgnode_core::Timestamp;

    use super::CircuitBreaker;
    use super::CircuitError;
    use super::CircuitState;

    fn breaker(clock: Arc<FixedClock>) -> CircuitBreaker {
        let config = CircuitConfig {
            failure_threshold: 3,
            base_backoff_ms: 100,
            max_backoff_ms: 10_000,
        };
        CircuitBreaker::new("test", config, clock)
    }

    #[test]
    fn opens_after_consecutive_failures() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let cb = breaker(clock);
        for _ in 0..3 {
            let _: Result<(), CircuitError<&str>> = cb.call(|| Err("boom"));
        }
        assert_eq!(cb.state().state, CircuitState::Open);
    }

    #[test]
    fn trip_rejects_every_call_indefinitely_until_reset() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let cb = breaker(clock.clone());
        cb.trip();
        let result: Result<(), CircuitError<&str>> = cb.call(|| Ok(()));
        assert!(matches!(result, Err(CircuitError::Open { .. })));
        clock.advance(1_000_000);
        let result: Result<(), CircuitError<&str>> = cb.call(|| Ok(()));
        assert!(matches!(result, Err(CircuitError::Open { .. })), "trip holds the breaker open regardless of elapsed time");
        cb.reset();
        let result: Result<(), CircuitError<&str>> = cb.call(|| Ok(()));
        assert!(result.is_ok(), "reset clears a trip and admits calls again");
    }

    #[test]
    fn reset_clears_openings() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let cb = breaker(clock);
        cb.trip();
        cb.reset();
        assert_eq!(cb.state().state, CircuitState::Closed);
        assert_eq!(cb.state().consecutive_openings, 0);
    }

    #[test]
    fn success_in_closed_state_never_trips() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let cb = breaker(clock);
        for _ in 0..10 {
            let _: Result<(), CircuitError<&str>> = cb.call(|| Ok(()));
        }
        assert_eq!(cb.state().state, CircuitState::Closed);
    }

    #[tokio::test]
    async fn call_async_counts_timeout_as_failure() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let cb = breaker(clock);
        for _ in 0..3 {
            let result: Result<(), CircuitError<()>> = cb
                .call_async(std::time::Duration::from_millis(1), async {
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    Ok(())
                })
                .await;
            assert!(matches!(result, Err(CircuitError::Timeout)));
        }
        assert_eq!(cb.state().state, CircuitState::Open);
    }
}

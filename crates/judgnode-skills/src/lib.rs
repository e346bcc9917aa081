// crates/judgnode-skills/src/lib.rs
// ============================================================================
// Module: Skill Registry
// Description: Named callable handlers, dispatched by domain, wrapped in a
//              per-domain circuit breaker with a per-call deadline.
// Purpose: Give the orchestrator a uniform way to invoke domain-specific
//          side-effecting work without coupling it to any one handler.
// Dependencies: judgnode-core, judgnode-config, judgnode-circuit, tokio,
//               async-trait
// ============================================================================

//! ## Overview
//! [`SkillRegistry::register`] associates a domain name with a
//! [`SkillHandler`]; [`SkillRegistry::invoke`] dispatches by domain, wrapping
//! the call in a domain-specific [`judgnode_circuit::CircuitBreaker`] and a
//! per-call deadline (default 5s, from [`judgnode_config::SkillConfig`]). An
//! open breaker or an elapsed deadline never panics the caller — both surface
//! as a failed [`SkillOutcome`].

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use judgnode_circuit::CircuitBreaker;
use judgnode_circuit::CircuitCounters;
use judgnode_circuit::CircuitError;
use judgnode_circuit::CircuitSnapshot;
use judgnode_config::CircuitConfig;
use judgnode_config::SkillConfig;
use judgnode_core::Clock;
use serde::Deserialize;
use serde::Serialize;

/// Error a [`SkillHandler`] may return.
#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    /// The handler rejected the payload or failed to produce a result.
    #[error("skill failed: {0}")]
    Failed(String),
}

/// A callable domain handler.
///
/// # Errors
///
/// Implementations return [`SkillError`] for any failure; the registry does
/// not inspect the payload or result shape.
#[async_trait]
pub trait SkillHandler: Send + Sync {
    /// Invokes the handler with an opaque JSON payload, returning an opaque
    /// JSON result.
    async fn invoke(&self, payload: serde_json::Value) -> Result<serde_json::Value, SkillError>;
}

/// Uniform result envelope returned by [`SkillRegistry::invoke`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillOutcome {
    /// Whether the invocation succeeded.
    pub ok: bool,
    /// The handler's result, present when `ok`.
    pub result: Option<serde_json::Value>,
    /// The failure reason, present when not `ok`. `"circuit-open"` when the
    /// domain's breaker rejected the call without running the handler.
    pub error: Option<String>,
    /// Wall-clock duration of the call attempt, in milliseconds.
    pub took_ms: u64,
}

impl SkillOutcome {
    fn ok(result: serde_json::Value, took_ms: u64) -> Self {
        Self { ok: true, result: Some(result), error: None, took_ms }
    }

    fn failed(error: impl Into<String>, took_ms: u64) -> Self {
        Self { ok: false, result: None, error: Some(error.into()), took_ms }
    }
}

struct Registration {
    handler: Arc<dyn SkillHandler>,
    breaker: Arc<CircuitBreaker>,
}

/// Domain-keyed registry of [`SkillHandler`]s.
///
/// # Invariants
/// - Each registered domain owns exactly one [`CircuitBreaker`], created at
///   `register` time and reused across every `invoke` call for that domain.
pub struct SkillRegistry {
    clock: Arc<dyn Clock>,
    skill_config: SkillConfig,
    circuit_config: CircuitConfig,
    handlers: RwLock<HashMap<String, Registration>>,
}

impl SkillRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, skill_config: SkillConfig, circuit_config: CircuitConfig) -> Self {
        Self { clock, skill_config, circuit_config, handlers: RwLock::new(HashMap::new()) }
    }

    /// Registers `handler` under `domain`, replacing any prior registration
    /// and resetting that domain's breaker.
    pub fn register(&self, domain: impl Into<String>, handler: Arc<dyn SkillHandler>) {
        let domain = domain.into();
        let breaker = Arc::new(CircuitBreaker::new(format!("skill:{domain}"), self.circuit_config, self.clock.clone()));
        let mut handlers = self.handlers.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        handlers.insert(domain, Registration { handler, breaker });
    }

    /// Returns true when a handler is registered for `domain`.
    #[must_use]
    pub fn is_registered(&self, domain: &str) -> bool {
        let handlers = self.handlers.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        handlers.contains_key(domain)
    }

    /// Invokes the handler registered for `domain` with `payload`.
    ///
    /// Enforces the configured per-call deadline and runs the call through
    /// that domain's breaker. An unregistered domain, a timeout, and an open
    /// breaker all return a failed [`SkillOutcome`] rather than an `Err`.
    pub async fn invoke(&self, domain: &str, payload: serde_json::Value) -> SkillOutcome {
        let start = self.clock.now();
        let registered = {
            let handlers = self.handlers.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            handlers.get(domain).map(|reg| (reg.handler.clone(), reg.breaker.clone()))
        };
        let Some((handler, breaker)) = registered else {
            return SkillOutcome::failed(format!("no skill registered for domain: {domain}"), 0);
        };
        let deadline = Duration::from_millis(self.skill_config.deadline_ms);

        let result = breaker.call_async(deadline, handler.invoke(payload)).await;

        let took_ms = start.elapsed_until(self.clock.now());
        match result {
            Ok(value) => SkillOutcome::ok(value, took_ms),
            Err(CircuitError::Open { .. }) => SkillOutcome::failed("circuit-open", took_ms),
            Err(CircuitError::Timeout) => SkillOutcome::failed("timeout", took_ms),
            Err(CircuitError::Failed(SkillError::Failed(message))) => SkillOutcome::failed(message, took_ms),
        }
    }

    /// Returns a snapshot of every registered domain's circuit breaker,
    /// keyed by domain, plus its pass/reject/open counters.
    #[must_use]
    pub fn circuit_snapshots(&self) -> BTreeMap<String, (CircuitSnapshot, CircuitCounters)> {
        let handlers = self.handlers.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        handlers.iter().map(|(domain, reg)| (domain.clone(), (reg.breaker.state(), reg.breaker.counters()))).collect()
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use judgnode_core::FixedClock;
    use serde_json::json;

    use super::*;

    struct EchoHandler;

    #[async_trait]
    impl SkillHandler for EchoHandler {
        async fn invoke(&self, payload: serde_json::Value) -> Result<serde_json::Value, SkillError> {
            Ok(payload)
        }
    }

    struct AlwaysFailsHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SkillHandler for AlwaysFailsHandler {
        async fn invoke(&self, _payload: serde_json::Value) -> Result<serde_json::Value, SkillError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SkillError::Failed("handler always fails".to_string()))
        }
    }

    struct NeverRespondsHandler;

    #[async_trait]
    impl SkillHandler for NeverRespondsHandler {
        async fn invoke(&self, _payload: serde_json::Value) -> Result<serde_json::Value, SkillError> {
            std::future::pending::<()>().await;
            unreachable!("pending future never resolves")
        }
    }

    fn registry() -> SkillRegistry {
        let clock = Arc::new(FixedClock::new(judgnode_core::Timestamp::from_millis(0)));
        SkillRegistry::new(clock, SkillConfig::default(), CircuitConfig::default())
    }

    #[tokio::test]
    async fn invokes_the_registered_handler() {
        let registry = registry();
        registry.register("protection", Arc::new(EchoHandler));
        let outcome = registry.invoke("protection", json!({"a": 1})).await;
        assert!(outcome.ok);
        assert_eq!(outcome.result, Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn circuit_snapshots_reports_one_entry_per_registered_domain() {
        let registry = registry();
        registry.register("protection", Arc::new(EchoHandler));
        registry.invoke("protection", json!(null)).await;
        let snapshots = registry.circuit_snapshots();
        let (snapshot, counters) = snapshots.get("protection").expect("registered domain present");
        assert_eq!(snapshot.name, "skill:protection");
        assert_eq!(counters.passes, 1);
        assert!(!snapshots.contains_key("analysis"));
    }

    #[tokio::test]
    async fn unregistered_domain_fails_without_panicking() {
        let registry = registry();
        let outcome = registry.invoke("nonexistent", json!(null)).await;
        assert!(!outcome.ok);
        assert!(outcome.error.unwrap().contains("no skill registered"));
    }

    #[tokio::test]
    async fn open_breaker_rejects_without_running_the_handler() {
        let registry = registry();
        let failing = Arc::new(AlwaysFailsHandler { calls: AtomicUsize::new(0) });
        registry.register("analysis", failing.clone());
        for _ in 0..CircuitConfig::default().failure_threshold {
            let _ = registry.invoke("analysis", json!(null)).await;
        }
        let outcome = registry.invoke("analysis", json!(null)).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.error.as_deref(), Some("circuit-open"));
    }

    #[tokio::test(start_paused = true)]
    async fn a_hung_handler_times_out_at_the_configured_deadline() {
        let registry = registry();
        registry.register("mapping", Arc::new(NeverRespondsHandler));
        let outcome = registry.invoke("mapping", json!(null)).await;
        assert!(!outcome.ok);
        assert_eq!(outcome.error.as_deref(), Some("timeout"));
    }
}

// crates/judgnode-metrics/src/collector.rs
// ============================================================================
// Module: Metrics Collector
// Description: Parallel fan-out snapshot across registered sources.
// Purpose: Gather one consistent point-in-time view of every component's
//          gauges/counters without letting one failing source abort the rest.
// Dependencies: judgnode-core, tokio (task, sync)
// ============================================================================

//! ## Overview
//! Each registered [`MetricsSource`] contributes one named JSON section to a
//! [`MetricsSnapshot`]. [`MetricsCollector::collect`] runs every source
//! concurrently via a [`tokio::task::JoinSet`]; a source that errors or
//! panics contributes `{"error": "..."}` in its own section rather than
//! failing the whole snapshot.
//!
//! ## Section conventions
//! Sources are free to report any JSON shape, but [`crate::AlertManager`]
//! and [`crate::to_prometheus`] look for these conventional fields when
//! present (absent fields are treated as healthy/zero, never as an error):
//! - `"chain"`: `{ "head_slot": u64|null, "pending": u64, "block_count": u64,
//!   "total_judgments": u64, "integrity_ok": bool }`
//! - `"trace"`: `{ "total": u64, "by_outcome": { verdict: u64 } }`
//! - `"learning"`: `{ "avg_q_score": f64, "avg_judgment_score": f64,
//!   "max_drift": f64 }`
//! - `"session"`: `{ "max_idle_ms": u64 }`
//! - `"system"`: `{ "memory_used_bytes": u64, "cache_hit_rate": f64 }`
//! - any section may additionally carry `"dog_invocations": { dog: u64 }`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::RwLock;

use async_trait::async_trait;
use judgnode_core::Clock;
use judgnode_core::Timestamp;
use serde::Deserialize;
use serde::Serialize;

/// A single registered metrics source.
///
/// # Errors
///
/// Implementations return `Err` with a short human-readable reason; the
/// collector never propagates it as a snapshot-wide failure.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Collects this source's section of the snapshot.
    async fn collect(&self) -> Result<serde_json::Value, String>;
}

/// One fan-out collection result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// When the snapshot was taken.
    pub taken_at: Timestamp,
    /// Milliseconds since the collector was constructed.
    pub uptime_ms: u64,
    /// Named sections, one per registered source.
    pub sections: BTreeMap<String, serde_json::Value>,
}

impl MetricsSnapshot {
    /// Looks up a field within a named section, if the section and field
    /// both exist.
    #[must_use]
    pub fn field(&self, section: &str, field: &str) -> Option<&serde_json::Value> {
        self.sections.get(section)?.get(field)
    }
}

/// Fan-out registry of [`MetricsSource`]s.
///
/// # Invariants
/// - `collect` runs every registered source concurrently; the snapshot's
///   wall-clock cost is bounded by the slowest single source, not their sum.
pub struct MetricsCollector {
    clock: Arc<dyn Clock>,
    started_at: Timestamp,
    sources: RwLock<BTreeMap<String, Arc<dyn MetricsSource>>>,
}

impl MetricsCollector {
    /// Creates a collector whose uptime is measured from construction.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let started_at = clock.now();
        Self { clock, started_at, sources: RwLock::new(BTreeMap::new()) }
    }

    /// Registers `source` under `name`, replacing any prior registration.
    pub fn register(&self, name: impl Into<String>, source: Arc<dyn MetricsSource>) {
        let mut sources = self.sources.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        sources.insert(name.into(), source);
    }

    /// Collects one snapshot, fanning out to every registered source in
    /// parallel.
    pub async fn collect(&self) -> MetricsSnapshot {
        let registered: Vec<(String, Arc<dyn MetricsSource>)> = {
            let sources = self.sources.read().unwrap_or_else(std::sync::PoisonError::into_inner);
            sources.iter().map(|(name, source)| (name.clone(), source.clone())).collect()
        };

        let mut set = tokio::task::JoinSet::new();
        for (name, source) in registered {
            set.spawn(async move {
                let value = match source.collect().await {
                    Ok(value) => value,
                    Err(message) => serde_json::json!({ "error": message }),
                };
                (name, value)
            });
        }

        let mut sections = BTreeMap::new();
        while let Some(outcome) = set.join_next().await {
            if let Ok((name, value)) = outcome {
                sections.insert(name, value);
            }
        }

        let now = self.clock.now();
        MetricsSnapshot { taken_at: now, uptime_ms: self.started_at.elapsed_until(now), sections }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use judgnode_core::FixedClock;
    use serde_json::json;

    use super::*;

    struct StaticSource(serde_json::Value);

    #[async_trait]
    impl MetricsSource for StaticSource {
        async fn collect(&self) -> Result<serde_json::Value, String> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl MetricsSource for FailingSource {
        async fn collect(&self) -> Result<serde_json::Value, String> {
            Err("source unreachable".to_string())
        }
    }

    #[tokio::test]
    async fn a_failing_source_does_not_abort_the_snapshot() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let collector = MetricsCollector::new(clock);
        collector.register("chain", Arc::new(StaticSource(json!({"block_count": 3}))));
        collector.register("broken", Arc::new(FailingSource));

        let snapshot = collector.collect().await;
        assert_eq!(snapshot.field("chain", "block_count"), Some(&json!(3)));
        assert_eq!(snapshot.sections.get("broken"), Some(&json!({"error": "source unreachable"})));
    }

    #[tokio::test]
    async fn uptime_reflects_elapsed_clock_time() {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(1_000)));
        let collector = MetricsCollector::new(clock.clone());
        clock.advance(250);
        let snapshot = collector.collect().await;
        assert_eq!(snapshot.uptime_ms, 250);
    }
}

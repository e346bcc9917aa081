// crates/judgnode-metrics/src/prometheus.rs
// ============================================================================
// Module: Prometheus Exposition
// Description: Renders a metrics snapshot in Prometheus text exposition
//              format under a fixed set of stable metric names.
// Purpose: Give operators a scrape-able endpoint without depending on any
//          one source's internal JSON shape.
// Dependencies: judgnode-core
// ============================================================================

//! ## Overview
//! [`to_prometheus`] reads the conventional fields documented on
//! [`crate::collector`] and renders exactly the stable metric names this
//! system publishes: `judgments_total{verdict=...}`, `avg_q_score`,
//! `chain_height`, `poj_blocks_total`, `alerts_active`, `dog_invocations{dog=...}`,
//! `uptime_seconds`, `memory_used_bytes`. A field that no registered source
//! reported renders as zero rather than being omitted, so the metric name
//! is always present for a scraper's first scrape.

use std::fmt::Write as _;

use crate::collector::MetricsSnapshot;

/// Renders `snapshot` and the manager's current alert count as a Prometheus
/// exposition-format string.
#[must_use]
pub fn to_prometheus(snapshot: &MetricsSnapshot, alerts_active: usize) -> String {
    let mut out = String::new();

    write_judgments_total(&mut out, snapshot);

    let avg_q_score = snapshot.field("learning", "avg_q_score").and_then(serde_json::Value::as_f64).unwrap_or(0.0);
    let _ = writeln!(out, "avg_q_score {avg_q_score}");

    let chain_height =
        snapshot.field("chain", "block_count").and_then(serde_json::Value::as_u64).unwrap_or(0);
    let _ = writeln!(out, "chain_height {chain_height}");
    let _ = writeln!(out, "poj_blocks_total {chain_height}");

    let _ = writeln!(out, "alerts_active {alerts_active}");

    write_dog_invocations(&mut out, snapshot);

    let uptime_seconds = snapshot.uptime_ms / 1000;
    let _ = writeln!(out, "uptime_seconds {uptime_seconds}");

    let memory_used_bytes =
        snapshot.field("system", "memory_used_bytes").and_then(serde_json::Value::as_u64).unwrap_or(0);
    let _ = writeln!(out, "memory_used_bytes {memory_used_bytes}");

    out
}

fn write_judgments_total(out: &mut String, snapshot: &MetricsSnapshot) {
    let Some(by_outcome) = snapshot.field("trace", "by_outcome").and_then(serde_json::Value::as_object) else {
        return;
    };
    for (verdict, count) in by_outcome {
        let count = count.as_u64().unwrap_or(0);
        let _ = writeln!(out, "judgments_total{{verdict=\"{verdict}\"}} {count}");
    }
}

fn write_dog_invocations(out: &mut String, snapshot: &MetricsSnapshot) {
    for section in snapshot.sections.values() {
        let Some(dog_invocations) = section.get("dog_invocations").and_then(serde_json::Value::as_object) else {
            continue;
        };
        for (dog, count) in dog_invocations {
            let count = count.as_u64().unwrap_or(0);
            let _ = writeln!(out, "dog_invocations{{dog=\"{dog}\"}} {count}");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use std::collections::BTreeMap;

    use judgnode_core::Timestamp;
    use serde_json::json;

    use super::*;

    #[test]
    fn renders_every_stable_metric_name() {
        let mut sections = BTreeMap::new();
        sections.insert("trace".to_string(), json!({"total": 2, "by_outcome": {"allow": 1, "blocked": 1}}));
        sections.insert("learning".to_string(), json!({"avg_q_score": 0.42}));
        sections.insert("chain".to_string(), json!({"block_count": 7}));
        sections.insert("system".to_string(), json!({"memory_used_bytes": 1024}));
        sections.insert("skills".to_string(), json!({"dog_invocations": {"rex": 3}}));
        let snapshot = MetricsSnapshot { taken_at: Timestamp::from_millis(5_000), uptime_ms: 5_000, sections };

        let text = to_prometheus(&snapshot, 2);
        assert!(text.contains("judgments_total{verdict=\"allow\"} 1"));
        assert!(text.contains("judgments_total{verdict=\"blocked\"} 1"));
        assert!(text.contains("avg_q_score 0.42"));
        assert!(text.contains("chain_height 7"));
        assert!(text.contains("poj_blocks_total 7"));
        assert!(text.contains("alerts_active 2"));
        assert!(text.contains("dog_invocations{dog=\"rex\"} 3"));
        assert!(text.contains("uptime_seconds 5"));
        assert!(text.contains("memory_used_bytes 1024"));
    }

    #[test]
    fn absent_fields_render_as_zero_rather_than_being_omitted() {
        let snapshot = MetricsSnapshot { taken_at: Timestamp::from_millis(0), uptime_ms: 0, sections: BTreeMap::new() };
        let text = to_prometheus(&snapshot, 0);
        assert!(text.contains("avg_q_score 0"));
        assert!(text.contains("chain_height 0"));
        assert!(text.contains("memory_used_bytes 0"));
    }
}

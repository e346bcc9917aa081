// crates/judgnode-metrics/src/lib.rs
// ============================================================================
// Module: Judgment Node Metrics
// Description: Parallel metrics fan-out, threshold alerting, and Prometheus
//              exposition.
// Purpose: Give operators one snapshot and one scrape endpoint across every
//          other component.
// Dependencies: judgnode-core, judgnode-config, tokio
// ============================================================================

//! ## Overview
//! Three cooperating pieces: [`collector::MetricsCollector`] fans out to
//! registered [`collector::MetricsSource`]s in parallel and assembles a
//! [`collector::MetricsSnapshot`]; [`alerts::AlertManager`] evaluates the
//! five published thresholds against a snapshot and reports fired/cleared
//! alerts each cycle; [`prometheus::to_prometheus`] renders a snapshot under
//! this system's stable metric names.

pub mod alerts;
pub mod collector;
pub mod prometheus;

pub use alerts::Alert;
pub use alerts::AlertDiff;
pub use alerts::AlertLevel;
pub use alerts::AlertManager;
pub use collector::MetricsCollector;
pub use collector::MetricsSnapshot;
pub use collector::MetricsSource;
pub use prometheus::to_prometheus;

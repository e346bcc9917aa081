// crates/judgnode-orchestrator/src/lib.rs
// ============================================================================
// Module: Judgment Node Orchestrator
// Description: Wires every component crate into the enrich/classify/route/
// judge/synthesize/act/record/return pipeline.
// Purpose: Give an embedder a single `process` call that turns a raw event
// into a recorded, graded decision.
// Dependencies: every judgnode-* component crate this workspace composes
// ============================================================================

//! ## Overview
//! [`OrchestratorBuilder`] composes every component (chain, graph, skills,
//! tracer, session store, Q-learner, calibration tracker, trigger engine,
//! metrics collector, alert manager, notification sink) from a
//! [`judgnode_config::Settings`], with fluent overrides for anything an
//! embedder wants to supply itself (a persistent chain store, an external
//! notification transport, a real collective-vote policy). [`Orchestrator::process`]
//! is the single entry point; [`ProcessOptions`] gates the optional Judge,
//! Synthesize, and Act steps.

pub mod builder;
mod metrics_sources;
pub mod options;
mod pipeline;
mod tags;

pub use builder::OrchestratorBuilder;
pub use options::ProcessOptions;
pub use pipeline::Orchestrator;

// crates/judgnode-orchestrator/src/options.rs
// ============================================================================
// Module: Process Options
// Description: Per-call flags controlling the optional pipeline steps.
// Purpose: Let a caller opt into judgment, synthesis, and skill invocation
// without forcing every event through the full pipeline.
// Dependencies: none
// ============================================================================

/// Per-call flags controlling which optional pipeline steps run.
///
/// # Invariants
/// - None of these flags affect the Enrich, Classify, Route, or Record
///   steps; they gate only Judge, Synthesize, and Act.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Run the Judge step even when risk is below `high`.
    pub request_judgment: bool,
    /// Run the Synthesize step.
    pub request_synthesis: bool,
    /// Run the Act step when the routed domain has a preferred tool.
    pub auto_invoke_skill: bool,
}

impl ProcessOptions {
    /// All optional steps disabled.
    #[must_use]
    pub const fn none() -> Self {
        Self { request_judgment: false, request_synthesis: false, auto_invoke_skill: false }
    }

    /// All optional steps enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self { request_judgment: true, request_synthesis: true, auto_invoke_skill: true }
    }
}

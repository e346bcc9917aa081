// crates/judgnode-triggers/src/engine.rs
// ============================================================================
// Module: Trigger Engine
// Description: Evaluates the six trigger conditions against a read-only
//              context, enforces per-kind cooldowns, gates firing behind an
//              optional collective vote, and tracks the fired->pending->
//              resolved suggestion lifecycle.
// Purpose: Turn passive state observations into proactive, rate-limited
//          suggestions with accountable resolution stats.
// Dependencies: judgnode-core, judgnode-config, serde_json
// ============================================================================

//! ## Overview
//! [`TriggerEngine::evaluate`] is the one entry point: it first resolves or
//! expires suggestions already pending, then checks each of the six
//! conditions against the supplied [`TriggerContext`], skipping any kind
//! still in its cooldown. A condition that fires builds a [`Suggestion`] from
//! this module's template table, consults the configured [`CollectiveVote`],
//! and — only if consensus clears the floor — adds it to the pending set and
//! returns it to the caller. [`TriggerEngine::resolve`] lets a caller report
//! an explicit accept/reject; implicit acceptance (the watched condition
//! clearing on its own) and TTL expiry are both handled inside `evaluate`.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use judgnode_config::TriggerConfig;
use judgnode_core::Clock;
use judgnode_core::Timestamp;
use serde_json::json;

use crate::types::EmergingPattern;
use crate::types::ErrorObservation;
use crate::types::Goal;
use crate::types::PatternMatch;
use crate::types::ResolutionOutcome;
use crate::types::ResolutionStats;
use crate::types::Suggestion;
use crate::types::TriggerContext;
use crate::types::TriggerKind;
use crate::types::Urgency;
use crate::vote::AutoApprove;
use crate::vote::CollectiveVote;

struct Candidate {
    kind: TriggerKind,
    action: &'static str,
    urgency: Urgency,
    message: String,
    data: serde_json::Value,
}

struct EngineState {
    last_fired: HashMap<TriggerKind, Timestamp>,
    pending: HashMap<String, Suggestion>,
    stats: HashMap<TriggerKind, ResolutionStats>,
}

/// Evaluates trigger conditions, enforces cooldowns and the collective vote,
/// and tracks suggestion resolution.
pub struct TriggerEngine {
    config: TriggerConfig,
    clock: Arc<dyn Clock>,
    vote: Arc<dyn CollectiveVote>,
    next_id: AtomicU64,
    state: RwLock<EngineState>,
}

impl TriggerEngine {
    /// Creates an engine using [`AutoApprove`] as its collective vote.
    #[must_use]
    pub fn new(config: TriggerConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_vote(config, clock, Arc::new(AutoApprove))
    }

    /// Creates an engine using a caller-supplied collective vote.
    #[must_use]
    pub fn with_vote(config: TriggerConfig, clock: Arc<dyn Clock>, vote: Arc<dyn CollectiveVote>) -> Self {
        Self {
            config,
            clock,
            vote,
            next_id: AtomicU64::new(0),
            state: RwLock::new(EngineState { last_fired: HashMap::new(), pending: HashMap::new(), stats: HashMap::new() }),
        }
    }

    /// Resolves/expires pending suggestions against `context`, evaluates the
    /// six conditions, and returns the suggestions newly surfaced this call.
    pub fn evaluate(&self, context: &TriggerContext) -> Vec<Suggestion> {
        let now = self.clock.now();
        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);

        Self::resolve_implicit(&self.config, &mut state, context, now);
        Self::expire_stale(&mut state, now, self.config.suggestion_ttl_ms);

        let mut fired = Vec::new();
        for candidate in self.candidates(context, now) {
            if !Self::cooldown_elapsed(&state, candidate.kind, now, self.cooldown_ms(candidate.kind)) {
                continue;
            }
            state.last_fired.insert(candidate.kind, now);

            let id = format!("trig-{}-{}", candidate.kind.as_str(), self.next_id.fetch_add(1, Ordering::Relaxed));
            let suggestion = Suggestion {
                id,
                trigger_kind: candidate.kind,
                action: candidate.action.to_string(),
                urgency: candidate.urgency,
                message: candidate.message,
                data: candidate.data,
                fired_at: now,
            };

            if self.vote.consensus(&suggestion) >= self.config.collective_vote_floor {
                state.pending.insert(suggestion.id.clone(), suggestion.clone());
                fired.push(suggestion);
            }
        }
        fired
    }

    /// Explicitly resolves a pending suggestion. Returns `false` if `id` is
    /// not currently pending.
    pub fn resolve(&self, id: &str, outcome: ResolutionOutcome) -> bool {
        let mut state = self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let Some(suggestion) = state.pending.get(id) else {
            return false;
        };
        let kind = suggestion.trigger_kind;
        state.pending.remove(id);
        let stats = state.stats.entry(kind).or_default();
        match outcome {
            ResolutionOutcome::Accepted => stats.accepted += 1,
            ResolutionOutcome::Rejected => stats.rejected += 1,
        }
        true
    }

    /// Currently pending suggestions, oldest first by trigger kind, then id.
    #[must_use]
    pub fn pending(&self) -> Vec<Suggestion> {
        let state = self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut pending: Vec<_> = state.pending.values().cloned().collect();
        pending.sort_by(|a, b| a.id.cmp(&b.id));
        pending
    }

    /// Resolution stats accumulated for `kind`.
    #[must_use]
    pub fn stats(&self, kind: TriggerKind) -> ResolutionStats {
        let state = self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        state.stats.get(&kind).copied().unwrap_or_default()
    }

    fn cooldown_ms(&self, kind: TriggerKind) -> u64 {
        match kind {
            TriggerKind::ErrorPattern => self.config.error_pattern_cooldown_ms,
            TriggerKind::ContextDrift => self.config.context_drift_cooldown_ms,
            TriggerKind::BurnoutRisk => self.config.burnout_cooldown_ms,
            TriggerKind::PatternMatch => self.config.pattern_match_cooldown_ms,
            TriggerKind::DeadlineNear => self.config.deadline_near_cooldown_ms,
            TriggerKind::LearningOpp => self.config.learning_opp_cooldown_ms,
        }
    }

    fn cooldown_elapsed(state: &EngineState, kind: TriggerKind, now: Timestamp, cooldown_ms: u64) -> bool {
        match state.last_fired.get(&kind) {
            Some(&last) => last.elapsed_until(now) >= cooldown_ms,
            None => true,
        }
    }

    /// Marks pending suggestions whose watched condition has cleared as
    /// implicitly accepted (errors stopped, focus returned to goal, energy
    /// recovered, etc.) — the same six conditions used to fire, now read as
    /// "no longer true".
    fn resolve_implicit(config: &TriggerConfig, state: &mut EngineState, context: &TriggerContext, now: Timestamp) {
        let still_firing: std::collections::HashSet<TriggerKind> =
            Self::candidates_static(config, context, now).into_iter().map(|c| c.kind).collect();
        let mut resolved_ids = Vec::new();
        for (id, suggestion) in &state.pending {
            if !still_firing.contains(&suggestion.trigger_kind) {
                resolved_ids.push((id.clone(), suggestion.trigger_kind));
            }
        }
        for (id, kind) in resolved_ids {
            state.pending.remove(&id);
            state.stats.entry(kind).or_default().accepted += 1;
        }
    }

    fn expire_stale(state: &mut EngineState, now: Timestamp, ttl_ms: u64) {
        let expired: Vec<(String, TriggerKind)> = state
            .pending
            .iter()
            .filter(|(_, suggestion)| suggestion.fired_at.elapsed_until(now) > ttl_ms)
            .map(|(id, suggestion)| (id.clone(), suggestion.trigger_kind))
            .collect();
        for (id, kind) in expired {
            state.pending.remove(&id);
            state.stats.entry(kind).or_default().expired += 1;
        }
    }

    fn candidates(&self, context: &TriggerContext, now: Timestamp) -> Vec<Candidate> {
        Self::candidates_static(&self.config, context, now)
    }

    fn candidates_static(config: &TriggerConfig, context: &TriggerContext, now: Timestamp) -> Vec<Candidate> {
        let mut candidates = Vec::new();
        if let Some(candidate) = error_pattern(config, context, now) {
            candidates.push(candidate);
        }
        if let Some(candidate) = context_drift(config, context) {
            candidates.push(candidate);
        }
        if let Some(candidate) = burnout_risk(config, context) {
            candidates.push(candidate);
        }
        if let Some(candidate) = pattern_match(config, context) {
            candidates.push(candidate);
        }
        if let Some(candidate) = deadline_near(config, context, now) {
            candidates.push(candidate);
        }
        if let Some(candidate) = learning_opp(config, context) {
            candidates.push(candidate);
        }
        candidates
    }
}

fn urgency_from_ratio(ratio: f64) -> Urgency {
    if ratio >= 1.0 {
        Urgency::Urgent
    } else if ratio >= 0.5 {
        Urgency::Active
    } else {
        Urgency::Subtle
    }
}

fn error_pattern(config: &TriggerConfig, context: &TriggerContext, now: Timestamp) -> Option<Candidate> {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for error in &context.recent_errors {
        if error.at.elapsed_until(now) <= config.error_pattern_window_ms {
            *counts.entry(error.kind.as_str()).or_default() += 1;
        }
    }
    let (kind, count) = counts.into_iter().max_by_key(|(_, count)| *count)?;
    if count < config.error_pattern_count {
        return None;
    }
    let ratio = f64::from(count) / f64::from(config.error_pattern_count * 2);
    Some(Candidate {
        kind: TriggerKind::ErrorPattern,
        action: "review-error-pattern",
        urgency: urgency_from_ratio(ratio),
        message: format!("{count} errors of kind \"{kind}\" in the last window — want to take a look?"),
        data: json!({ "kind": kind, "count": count }),
    })
}

fn token_overlap(goal_text: &str, focus: &str) -> f64 {
    let goal_tokens: std::collections::HashSet<String> =
        goal_text.split_whitespace().map(str::to_lowercase).collect();
    if goal_tokens.is_empty() {
        return 1.0;
    }
    let focus_tokens: std::collections::HashSet<String> = focus.split_whitespace().map(str::to_lowercase).collect();
    let matched = goal_tokens.intersection(&focus_tokens).count();
    #[allow(clippy::cast_precision_loss, reason = "token counts stay far below f64's exact-integer range")]
    let ratio = matched as f64 / goal_tokens.len() as f64;
    ratio
}

fn context_drift(config: &TriggerConfig, context: &TriggerContext) -> Option<Candidate> {
    let goal: &Goal = context.active_goal.as_ref()?;
    let focus = context.current_focus.as_deref().unwrap_or("");
    let overlap = token_overlap(&goal.text, focus);
    if overlap >= config.context_drift_overlap_ceiling {
        return None;
    }
    let ratio = 1.0 - overlap / config.context_drift_overlap_ceiling;
    Some(Candidate {
        kind: TriggerKind::ContextDrift,
        action: "refocus-on-goal",
        urgency: urgency_from_ratio(ratio),
        message: "current focus has drifted from the active goal — refocus?".to_string(),
        data: json!({ "goal": goal.text, "overlap": overlap }),
    })
}

fn burnout_risk(config: &TriggerConfig, context: &TriggerContext) -> Option<Candidate> {
    if context.energy >= config.burnout_energy_ceiling {
        return None;
    }
    let ratio = 1.0 - context.energy / config.burnout_energy_ceiling;
    Some(Candidate {
        kind: TriggerKind::BurnoutRisk,
        action: "suggest-break",
        urgency: urgency_from_ratio(ratio),
        message: "energy is running low — consider a break".to_string(),
        data: json!({ "energy": context.energy }),
    })
}

fn pattern_match(config: &TriggerConfig, context: &TriggerContext) -> Option<Candidate> {
    let best: &PatternMatch =
        context.pattern_matches.iter().filter(|m| m.confidence >= config.pattern_match_confidence_floor).max_by(|a, b| a.confidence.total_cmp(&b.confidence))?;
    Some(Candidate {
        kind: TriggerKind::PatternMatch,
        action: "reuse-past-success",
        urgency: urgency_from_ratio(best.confidence),
        message: format!("this looks similar to a past success: {}", best.description),
        data: json!({ "description": best.description, "confidence": best.confidence }),
    })
}

fn deadline_near(config: &TriggerConfig, context: &TriggerContext, now: Timestamp) -> Option<Candidate> {
    let goal = context.active_goal.as_ref()?;
    let deadline = goal.deadline?;
    let remaining_ms = if deadline >= now { now.elapsed_until(deadline) } else { 0 };
    if remaining_ms > config.deadline_near_ms {
        return None;
    }
    #[allow(clippy::cast_precision_loss, reason = "durations stay far below f64's exact-integer range")]
    let ratio = 1.0 - remaining_ms as f64 / config.deadline_near_ms as f64;
    Some(Candidate {
        kind: TriggerKind::DeadlineNear,
        action: "flag-approaching-deadline",
        urgency: urgency_from_ratio(ratio),
        message: format!("the deadline for \"{}\" is approaching", goal.text),
        data: json!({ "goal": goal.text, "remaining_ms": remaining_ms }),
    })
}

fn learning_opp(config: &TriggerConfig, context: &TriggerContext) -> Option<Candidate> {
    let pattern: &EmergingPattern = context
        .emerging_patterns
        .iter()
        .filter(|p| !p.surfaced && p.occurrences >= config.learning_opp_min_occurrences)
        .max_by_key(|p| p.occurrences)?;
    let ratio = f64::from(pattern.occurrences) / f64::from(config.learning_opp_min_occurrences * 2);
    Some(Candidate {
        kind: TriggerKind::LearningOpp,
        action: "surface-emerging-pattern",
        urgency: urgency_from_ratio(ratio),
        message: format!("pattern \"{}\" has recurred {} times — worth naming?", pattern.id, pattern.occurrences),
        data: json!({ "pattern_id": pattern.id, "occurrences": pattern.occurrences }),
    })
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions and helpers are permitted."
    )]

    use judgnode_core::FixedClock;

    use super::*;

    fn engine(config: TriggerConfig) -> (TriggerEngine, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        (TriggerEngine::new(config, clock.clone()), clock)
    }

    #[test]
    fn burnout_fires_once_and_respects_cooldown() {
        let (engine, _clock) = engine(TriggerConfig::default());
        let mut context = TriggerContext { energy: 0.1, ..TriggerContext::default() };
        let fired = engine.evaluate(&context);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].trigger_kind, TriggerKind::BurnoutRisk);

        context.energy = 0.05;
        let fired_again = engine.evaluate(&context);
        assert!(fired_again.is_empty(), "cooldown should suppress an immediate re-fire");
    }

    #[test]
    fn cooldown_elapses_after_the_configured_duration() {
        let config = TriggerConfig { burnout_cooldown_ms: 1_000, ..TriggerConfig::default() };
        let (engine, clock) = engine(config);
        let context = TriggerContext { energy: 0.1, ..TriggerContext::default() };
        assert_eq!(engine.evaluate(&context).len(), 1);
        clock.advance(1_001);
        assert_eq!(engine.evaluate(&context).len(), 1, "cooldown should have elapsed");
    }

    #[test]
    fn healthy_energy_never_fires_burnout() {
        let (engine, _clock) = engine(TriggerConfig::default());
        let context = TriggerContext { energy: 0.9, ..TriggerContext::default() };
        assert!(engine.evaluate(&context).is_empty());
    }

    #[test]
    fn error_pattern_requires_the_configured_count_within_the_window() {
        let (engine, _clock) = engine(TriggerConfig::default());
        let context = TriggerContext {
            recent_errors: vec![
                ErrorObservation { kind: "timeout".to_string(), at: Timestamp::from_millis(0) },
                ErrorObservation { kind: "timeout".to_string(), at: Timestamp::from_millis(0) },
            ],
            ..TriggerContext::default()
        };
        assert!(engine.evaluate(&context).is_empty(), "two errors is below the default threshold of three");
    }

    #[test]
    fn error_pattern_fires_and_resolves_implicitly_once_errors_stop() {
        let (engine, _clock) = engine(TriggerConfig::default());
        let with_errors = TriggerContext {
            recent_errors: (0..3)
                .map(|_| ErrorObservation { kind: "timeout".to_string(), at: Timestamp::from_millis(0) })
                .collect(),
            ..TriggerContext::default()
        };
        let fired = engine.evaluate(&with_errors);
        assert_eq!(fired.len(), 1);
        assert_eq!(engine.pending().len(), 1);

        let without_errors = TriggerContext::default();
        engine.evaluate(&without_errors);
        assert!(engine.pending().is_empty(), "clearing the condition should implicitly accept the suggestion");
        assert_eq!(engine.stats(TriggerKind::ErrorPattern).accepted, 1);
    }

    #[test]
    fn context_drift_fires_on_low_overlap() {
        let (engine, _clock) = engine(TriggerConfig::default());
        let context = TriggerContext {
            active_goal: Some(Goal { text: "ship the release notes".to_string(), deadline: None }),
            current_focus: Some("watching videos".to_string()),
            ..TriggerContext::default()
        };
        let fired = engine.evaluate(&context);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].trigger_kind, TriggerKind::ContextDrift);
    }

    #[test]
    fn deadline_near_fires_within_the_window_and_not_outside_it() {
        let config = TriggerConfig { deadline_near_ms: 1_000, ..TriggerConfig::default() };
        let (engine, _clock) = engine(config);
        let near = TriggerContext {
            active_goal: Some(Goal { text: "ship it".to_string(), deadline: Some(Timestamp::from_millis(500)) }),
            ..TriggerContext::default()
        };
        assert_eq!(engine.evaluate(&near).len(), 1);

        let (engine_far, _clock) = engine(TriggerConfig { deadline_near_ms: 1_000, ..TriggerConfig::default() });
        let far = TriggerContext {
            active_goal: Some(Goal { text: "ship it".to_string(), deadline: Some(Timestamp::from_millis(10_000)) }),
            ..TriggerContext::default()
        };
        assert!(engine_far.evaluate(&far).is_empty());
    }

    #[test]
    fn explicit_rejection_is_counted_in_stats() {
        let (engine, _clock) = engine(TriggerConfig::default());
        let context = TriggerContext { energy: 0.1, ..TriggerContext::default() };
        let fired = engine.evaluate(&context);
        assert!(engine.resolve(&fired[0].id, ResolutionOutcome::Rejected));
        assert_eq!(engine.stats(TriggerKind::BurnoutRisk).rejected, 1);
        assert!(engine.pending().is_empty());
    }

    #[test]
    fn a_pending_suggestion_expires_after_its_ttl() {
        let config = TriggerConfig { suggestion_ttl_ms: 1_000, ..TriggerConfig::default() };
        let (engine, clock) = engine(config);
        let with_errors = TriggerContext { energy: 0.1, ..TriggerContext::default() };
        engine.evaluate(&with_errors);
        assert_eq!(engine.pending().len(), 1);

        clock.advance(1_001);
        engine.evaluate(&TriggerContext { energy: 0.1, ..TriggerContext::default() });
        // advancing re-evaluates expiry before considering new fires; the
        // stale pending entry should be gone and counted as expired.
        assert_eq!(engine.stats(TriggerKind::BurnoutRisk).expired, 1);
    }

    #[test]
    fn a_vote_below_the_floor_suppresses_the_suggestion_but_still_applies_cooldown() {
        struct NeverApprove;
        impl CollectiveVote for NeverApprove {
            fn consensus(&self, _suggestion: &Suggestion) -> f64 {
                0.0
            }
        }
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        let engine = TriggerEngine::with_vote(TriggerConfig::default(), clock, Arc::new(NeverApprove));
        let context = TriggerContext { energy: 0.1, ..TriggerContext::default() };
        assert!(engine.evaluate(&context).is_empty());
        assert!(engine.pending().is_empty());
    }
}

// crates/judgnode-orchestrator/src/pipeline.rs
// ============================================================================
// Module: Orchestrator Pipeline
// Description: The eight-step enrich/classify/route/judge/synthesize/act/
// record/return pipeline every event runs through.
// Purpose: Turn a raw event into a recorded, graded decision.
// Dependencies: every judgnode-* component crate this workspace composes
// ============================================================================

//! ## Overview
//! [`Orchestrator::process`] is infallible: every failure mode it encounters
//! (an unreachable skill, a chain write error, a cancelled call) is captured
//! as a [`TraceStep`] and folded into the returned [`DecisionRecord`] rather
//! than propagated as an `Err`. The pipeline is sequential per call; callers
//! wanting per-user ordering serialize their own calls to `process`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use judgnode_chain::ChainStore;
use judgnode_chain::MemoryChainStore;
use judgnode_chain::PendingJudgment;
use judgnode_config::Settings;
use judgnode_core::CancelToken;
use judgnode_core::Clock;
use judgnode_core::DecisionEvent;
use judgnode_core::DecisionId;
use judgnode_core::DecisionRecord;
use judgnode_core::InterventionLevel;
use judgnode_core::Outcome;
use judgnode_core::TraceStep;
use judgnode_graph::EdgeType;
use judgnode_graph::GraphStore;
use judgnode_graph::NodeType;
use judgnode_learning::CalibrationTracker;
use judgnode_learning::QLearner;
use judgnode_metrics::Alert;
use judgnode_metrics::AlertLevel;
use judgnode_metrics::AlertManager;
use judgnode_metrics::MetricsCollector;
use judgnode_metrics::MetricsSnapshot;
use judgnode_notify::Notification;
use judgnode_notify::NotificationSink;
use judgnode_notify::Priority;
use judgnode_policy::RoutingTable;
use judgnode_policy::detect_risk;
use judgnode_policy::intervention;
use judgnode_policy::trust_tier;
use judgnode_session::SessionStore;
use judgnode_skills::SkillRegistry;
use judgnode_trace::DecisionTracer;
use judgnode_triggers::TriggerContext;
use judgnode_triggers::TriggerEngine;
use serde_json::json;

use crate::options::ProcessOptions;
use crate::tags::level_tag;
use crate::tags::outcome_tag;
use crate::tags::risk_tag;

/// Fallback trust value used when no fresh context and no prior session is
/// available, matching the numeric default documented on the Enrich step.
const DEFAULT_TRUST_VALUE: f64 = 50.0;

/// Reward fed to the Q-learning loop when a call is cancelled mid-pipeline,
/// distinct from the reward an ordinary [`Outcome::Blocked`] carries.
const CANCELLED_REWARD: f64 = -0.5;

/// Every composed component, wired together by [`crate::builder::OrchestratorBuilder`].
pub struct Orchestrator {
    pub(crate) settings: Settings,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) routing: RoutingTable,
    pub(crate) chain: Arc<dyn ChainStore>,
    pub(crate) chain_idle: Option<Arc<MemoryChainStore>>,
    pub(crate) graph: Arc<Mutex<GraphStore>>,
    pub(crate) skills: Arc<SkillRegistry>,
    pub(crate) tracer: Arc<DecisionTracer>,
    pub(crate) session: Arc<SessionStore>,
    pub(crate) learner: Arc<QLearner>,
    pub(crate) calibration: Arc<CalibrationTracker>,
    pub(crate) triggers: Arc<TriggerEngine>,
    pub(crate) metrics: Arc<MetricsCollector>,
    pub(crate) alerts: Arc<AlertManager>,
    pub(crate) notifier: Arc<dyn NotificationSink>,
    pub(crate) producer_id: String,
}

impl Orchestrator {
    /// The producer identity stamped on chain blocks (when using the
    /// built-in in-memory chain store).
    #[must_use]
    pub fn producer_id(&self) -> &str {
        &self.producer_id
    }

    /// Returns a cloned handle to the chain store this orchestrator appends
    /// judgments to.
    #[must_use]
    pub fn chain_handle(&self) -> Arc<dyn ChainStore> {
        self.chain.clone()
    }

    /// Registers a skill handler for `domain` after `build`, for embedders
    /// that assemble handlers after constructing the orchestrator rather
    /// than through [`crate::builder::OrchestratorBuilder::skill`].
    pub fn register_skill(&self, domain: impl Into<String>, handler: Arc<dyn judgnode_skills::SkillHandler>) {
        self.skills.register(domain, handler);
    }

    /// Takes a snapshot across every registered metrics source.
    pub async fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.collect().await
    }

    /// Evaluates alert thresholds against the current metrics snapshot.
    pub async fn evaluate_alerts(&self) -> judgnode_metrics::AlertDiff {
        let snapshot = self.metrics_snapshot().await;
        self.alerts.evaluate(&snapshot)
    }

    /// Closes the built-in chain store's pending batch if it has been idle
    /// long enough, a no-op when an external chain store override is in use.
    ///
    /// `process` already calls this once per event; a long-running service
    /// with no incoming events still needs something to drive closure, which
    /// is what this method is for.
    pub fn tick_chain_idle(&self) {
        if let Some(chain_idle) = &self.chain_idle {
            let _ = chain_idle.close_if_idle();
        }
    }

    /// Runs one event through the full pipeline, returning its recorded
    /// decision. Never fails: every failure mode surfaces as a failed
    /// [`TraceStep`] plus, where noted, a forced [`Outcome`].
    #[allow(clippy::too_many_lines, reason = "the eight pipeline steps read linearly; splitting them obscures the sequence")]
    pub async fn process(&self, event: DecisionEvent, opts: ProcessOptions, cancel: &CancelToken) -> DecisionRecord {
        let started = self.clock.now();
        let mut trace_steps = Vec::new();

        self.tick_chain_idle();

        if cancel.is_cancelled() {
            return self.cancelled_record(&event, started, trace_steps);
        }

        // 1. Enrich: resolve this event's trust value.
        let enrich_start = self.clock.now();
        let session_before = self.session.get(&event.user_id);
        let trust_value = if let Some(fresh) = event.user_context.trust_value {
            self.session.set_trust(&event.user_id, fresh).trust_value
        } else if let Some(state) = &session_before {
            state.trust_value
        } else {
            DEFAULT_TRUST_VALUE
        };
        trace_steps.push(TraceStep::ok("enrich", enrich_start.elapsed_until(self.clock.now())));

        // 2. Classify: risk, trust tier, intervention level.
        let classify_start = self.clock.now();
        let risk = detect_risk(&event.content);
        let tier = trust_tier(trust_value);
        let level = intervention(tier, risk);
        trace_steps.push(TraceStep::ok("classify", classify_start.elapsed_until(self.clock.now())));

        // 3. Route: pick a domain.
        let route_start = self.clock.now();
        let routing = self.routing.route(&event.content, event.event_kind);
        trace_steps.push(TraceStep::ok("route", route_start.elapsed_until(self.clock.now())));

        // 4. Judge (optional): Protection handler opinion.
        let mut judgment = None;
        let mut forced_outcome = None;
        // A Judge-step call is itself a protection concern regardless of
        // which domain `route` picked; the record reflects that.
        let mut effective_domain = routing.domain;
        if opts.request_judgment || risk >= judgnode_policy::RiskLevel::High {
            effective_domain = "protection";
            if cancel.is_cancelled() {
                return self.cancelled_record(&event, started, trace_steps);
            }
            let judge_start = self.clock.now();
            let payload = json!({
                "event_id": event.id.as_str(),
                "content": event.content,
                "risk": risk_tag(risk),
            });
            let judgment_outcome = self.skills.invoke("protection", payload).await;
            let took_ms = judge_start.elapsed_until(self.clock.now());
            if judgment_outcome.ok {
                judgment = judgment_outcome.result.clone();
                trace_steps.push(TraceStep::ok("judge", took_ms));
            } else if judgment_outcome.error.as_deref() == Some("circuit-open") {
                forced_outcome = Some(if risk < judgnode_policy::RiskLevel::High {
                    (Outcome::Allow, None)
                } else {
                    (Outcome::Deferred, Some("protection-unavailable".to_string()))
                });
                trace_steps.push(TraceStep::failed("judge", took_ms, "protection-unavailable"));
            } else {
                trace_steps.push(TraceStep::failed(
                    "judge",
                    took_ms,
                    judgment_outcome.error.unwrap_or_else(|| "judgment failed".to_string()),
                ));
            }
        }

        // 5. Synthesize (optional): domain-specific synthesis handler.
        let mut synthesis = None;
        if forced_outcome.is_none() && opts.request_synthesis {
            if cancel.is_cancelled() {
                return self.cancelled_record(&event, started, trace_steps);
            }
            let synth_start = self.clock.now();
            let payload = json!({
                "step": "synthesize",
                "event_id": event.id.as_str(),
                "content": event.content,
            });
            let synth_outcome = self.skills.invoke(routing.domain, payload).await;
            let took_ms = synth_start.elapsed_until(self.clock.now());
            if synth_outcome.ok {
                synthesis = synth_outcome.result.clone();
                trace_steps.push(TraceStep::ok("synthesize", took_ms));
            } else {
                trace_steps.push(TraceStep::failed(
                    "synthesize",
                    took_ms,
                    synth_outcome.error.unwrap_or_else(|| "synthesis failed".to_string()),
                ));
            }
        }

        // 6. Act (optional): invoke the domain's preferred tool.
        let mut skill_result = None;
        let mut outcome = forced_outcome.as_ref().map_or(Outcome::Allow, |(forced, _)| *forced);
        let forced_note = forced_outcome.and_then(|(_, note)| note);

        if forced_note.is_none() {
            match level {
                InterventionLevel::Block => {
                    outcome = Outcome::Blocked;
                }
                InterventionLevel::Ask => {
                    outcome = Outcome::Deferred;
                }
                InterventionLevel::Silent | InterventionLevel::Notify => {
                    if opts.auto_invoke_skill && !routing.tools.is_empty() {
                        if cancel.is_cancelled() {
                            return self.cancelled_record(&event, started, trace_steps);
                        }
                        let act_start = self.clock.now();
                        let payload = json!({
                            "step": "act",
                            "event_id": event.id.as_str(),
                            "tool": routing.tools.first(),
                            "content": event.content,
                        });
                        let act_outcome = self.skills.invoke(routing.domain, payload).await;
                        let took_ms = act_start.elapsed_until(self.clock.now());
                        if act_outcome.ok {
                            skill_result = act_outcome.result.clone();
                            outcome = Outcome::Modified;
                            trace_steps.push(TraceStep::ok("act", took_ms));
                        } else {
                            trace_steps.push(TraceStep::failed(
                                "act",
                                took_ms,
                                act_outcome.error.unwrap_or_else(|| "skill invocation failed".to_string()),
                            ));
                        }
                    }
                }
            }
        }

        let raw_confidence = if judgment.as_ref().is_some() {
            1.0
        } else if opts.request_judgment {
            0.3
        } else {
            0.5
        };
        let confidence = raw_confidence.min(self.settings.confidence_cap);

        // 7. Record: graph edge, chain append, trace push, training signal.
        let record_start = self.clock.now();
        let decision_id = DecisionId::new(format!("decision:{}", event.id.as_str()));

        {
            let mut graph = self.graph.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let service_node = graph.add_node(NodeType::Node, "orchestrator", BTreeMap::new());
            let subject_node = graph.add_node(NodeType::User, event.user_id.as_str(), BTreeMap::new());
            if let (Ok(service_id), Ok(subject_id)) = (service_node, subject_node) {
                let _ = graph.add_edge(EdgeType::Judged, service_id, subject_id, None, BTreeMap::new());
            }
        }

        let judgment_payload = json!({
            "domain": effective_domain,
            "intervention_level": level_tag(level),
            "outcome": outcome_tag(outcome),
            "confidence": confidence,
        });
        let append_result =
            self.chain.append_judgment(PendingJudgment { id: decision_id.clone(), payload: judgment_payload });
        if append_result.is_err() {
            self.alerts.raise(Alert {
                alert_type: "chain-write-failed".to_string(),
                level: AlertLevel::Critical,
                message: "appending a judgment to the chain failed".to_string(),
                value: 0.0,
                threshold: 1.0,
                fired_at: self.clock.now(),
            });
        }

        let context_tag = format!("{}/{}", routing.domain, risk_tag(risk));
        let action_tag = level_tag(level).to_string();
        let reward = outcome.reward();
        self.learner.update(&context_tag, &action_tag, reward, &context_tag, &[]);
        self.learner.end_episode();
        self.calibration.record(confidence, matches!(outcome, Outcome::Allow | Outcome::Modified));

        let session_energy = self.session.get(&event.user_id).map_or(0.0, |state| state.energy);
        let trigger_context = TriggerContext { energy: session_energy, current_focus: Some(routing.domain.to_string()), ..TriggerContext::default() };
        for suggestion in self.triggers.evaluate(&trigger_context) {
            let notification = Notification::new(
                "trigger-suggestion",
                suggestion.trigger_kind.as_str(),
                suggestion.message.clone(),
                Priority::Normal,
            )
            .with_context(json!({ "suggestion_id": suggestion.id, "action": suggestion.action }));
            let _ = self.notifier.notify(&notification);
        }

        let took_record_ms = record_start.elapsed_until(self.clock.now());
        let mut final_note = forced_note;
        if append_result.is_err() {
            final_note = Some(final_note.map_or_else(
                || "chain-write-failed".to_string(),
                |note| format!("{note}; chain-write-failed"),
            ));
        }
        if let Some(note) = &final_note {
            trace_steps.push(TraceStep::failed("record", took_record_ms, note.clone()));
        } else {
            trace_steps.push(TraceStep::ok("record", took_record_ms));
        }

        let duration_ms = started.elapsed_until(self.clock.now());
        let record = DecisionRecord {
            id: decision_id,
            event_id: event.id.clone(),
            domain: effective_domain.into(),
            intervention_level: level,
            outcome,
            judgment,
            synthesis,
            skill_result,
            user_id: event.user_id.clone(),
            timestamp: self.clock.now(),
            duration_ms,
            confidence,
            trace_steps,
        };

        self.tracer.push(record.clone());
        self.session.track_event(&event.user_id, "processed");
        self.session.record_last_judgment(&event.user_id, record.id.clone());

        // 8. Return the decision record.
        record
    }

    fn cancelled_record(
        &self,
        event: &DecisionEvent,
        started: judgnode_core::Timestamp,
        mut trace_steps: Vec<TraceStep>,
    ) -> DecisionRecord {
        trace_steps.push(TraceStep::failed("record", 0, "cancelled"));
        let context_tag = "cancelled/cancelled".to_string();
        self.learner.update(&context_tag, &context_tag, CANCELLED_REWARD, &context_tag, &[]);
        self.learner.end_episode();
        DecisionRecord {
            id: DecisionId::new(format!("decision:{}", event.id.as_str())),
            event_id: event.id.clone(),
            domain: "crown".into(),
            intervention_level: InterventionLevel::Block,
            outcome: Outcome::Blocked,
            judgment: None,
            synthesis: None,
            skill_result: None,
            user_id: event.user_id.clone(),
            timestamp: self.clock.now(),
            duration_ms: started.elapsed_until(self.clock.now()),
            confidence: 0.0,
            trace_steps,
        }
    }
}

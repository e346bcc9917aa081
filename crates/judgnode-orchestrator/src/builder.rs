// crates/judgnode-orchestrator/src/builder.rs
// ============================================================================
// Module: Orchestrator Builder
// Description: Accumulates optional overrides over a `Settings`, then
// materializes every composed component.
// Purpose: Let an embedder override the chain store, notification sink, and
// collective vote policy while defaulting everything else from config.
// Dependencies: every judgnode-* component crate, judgnode-config,
//               judgnode-core
// ============================================================================

//! ## Overview
//! [`OrchestratorBuilder::new`] takes ownership of a [`judgnode_config::Settings`].
//! Fluent setters record overrides; [`OrchestratorBuilder::build`] is
//! infallible, since every component this crate composes has a concrete
//! default and none of their constructors can fail — unlike the broker this
//! crate's builder shape is modeled on, whose `build` fails without a sink.

use std::sync::Arc;
use std::sync::Mutex;

use judgnode_chain::ChainStore;
use judgnode_chain::MemoryChainStore;
use judgnode_config::Settings;
use judgnode_core::Clock;
use judgnode_core::SystemClock;
use judgnode_graph::GraphStore;
use judgnode_learning::CalibrationTracker;
use judgnode_learning::QLearner;
use judgnode_metrics::AlertManager;
use judgnode_metrics::MetricsCollector;
use judgnode_notify::NotificationSink;
use judgnode_notify::QueueSink;
use judgnode_policy::RoutingTable;
use judgnode_session::SessionStore;
use judgnode_skills::SkillHandler;
use judgnode_skills::SkillRegistry;
use judgnode_trace::DecisionTracer;
use judgnode_triggers::CollectiveVote;
use judgnode_triggers::TriggerEngine;

use crate::metrics_sources::ChainMetricsSource;
use crate::metrics_sources::CircuitMetricsSource;
use crate::metrics_sources::GraphMetricsSource;
use crate::metrics_sources::LearningMetricsSource;
use crate::metrics_sources::SessionMetricsSource;
use crate::metrics_sources::SkillInvocationMetricsSource;
use crate::metrics_sources::SystemMetricsSource;
use crate::metrics_sources::TraceMetricsSource;
use crate::pipeline::Orchestrator;

/// Default identity stamped on blocks produced by the built-in chain store,
/// used only when the caller does not supply their own producer id.
const DEFAULT_PRODUCER_ID: &str = "judgnode";

/// Accumulates optional overrides over a [`Settings`], then builds an
/// [`Orchestrator`].
pub struct OrchestratorBuilder {
    settings: Settings,
    clock: Arc<dyn Clock>,
    chain: Option<Arc<dyn ChainStore>>,
    notifier: Option<Arc<dyn NotificationSink>>,
    producer_id: String,
    vote: Option<Arc<dyn CollectiveVote>>,
    skills: Vec<(String, Arc<dyn SkillHandler>)>,
}

impl OrchestratorBuilder {
    /// Starts a builder from `settings`, defaulting the clock to
    /// [`SystemClock`] and the producer id to `"judgnode"`.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            clock: Arc::new(SystemClock),
            chain: None,
            notifier: None,
            producer_id: DEFAULT_PRODUCER_ID.to_string(),
            vote: None,
            skills: Vec::new(),
        }
    }

    /// Overrides the clock every component shares. Mainly useful for tests.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Overrides the Proof-of-Judgment chain store. When unset, `build`
    /// constructs an in-memory [`MemoryChainStore`] from `settings.chain`.
    #[must_use]
    pub fn chain(mut self, chain: Arc<dyn ChainStore>) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Overrides the notification sink. When unset, `build` constructs a
    /// [`QueueSink`] from `settings.notify`.
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets the producer identity stamped on blocks by the built-in chain
    /// store. Ignored when an explicit [`Self::chain`] is supplied.
    #[must_use]
    pub fn producer_id(mut self, producer_id: impl Into<String>) -> Self {
        self.producer_id = producer_id.into();
        self
    }

    /// Overrides the collective-vote policy used to auto-approve trigger
    /// suggestions. When unset, `build` uses [`judgnode_triggers::AutoApprove`].
    #[must_use]
    pub fn collective_vote(mut self, vote: Arc<dyn CollectiveVote>) -> Self {
        self.vote = Some(vote);
        self
    }

    /// Registers a [`SkillHandler`] for `domain`, seeding the skill registry
    /// `build` constructs. Without this, Judge/Synthesize/Act never find a
    /// handler and every invocation reports `"no skill registered"`.
    #[must_use]
    pub fn skill(mut self, domain: impl Into<String>, handler: Arc<dyn SkillHandler>) -> Self {
        self.skills.push((domain.into(), handler));
        self
    }

    /// Materializes every composed component and returns an [`Orchestrator`].
    ///
    /// Never fails: every component constructed here has a concrete default
    /// and an infallible constructor.
    #[must_use]
    pub fn build(self) -> Orchestrator {
        let clock = self.clock;
        let settings = self.settings;

        let (chain, chain_idle) = match self.chain {
            Some(chain) => (chain, None),
            None => {
                let concrete =
                    Arc::new(MemoryChainStore::new(self.producer_id.clone(), settings.chain, clock.clone()));
                (concrete.clone() as Arc<dyn ChainStore>, Some(concrete))
            }
        };

        let notifier = self.notifier.unwrap_or_else(|| {
            Arc::new(QueueSink::new(settings.notify.queue_capacity, clock.clone())) as Arc<dyn NotificationSink>
        });

        let graph = Arc::new(Mutex::new(GraphStore::new(clock.clone())));
        let skills = Arc::new(SkillRegistry::new(clock.clone(), settings.skill, settings.circuit));
        for (domain, handler) in self.skills {
            skills.register(domain, handler);
        }
        let tracer = Arc::new(DecisionTracer::with_capacity(settings.trace.capacity));
        let session = Arc::new(SessionStore::new(settings.session, clock.clone()));
        let learner = Arc::new(QLearner::new(settings.learning));
        let calibration = Arc::new(CalibrationTracker::new(settings.learning.calibration_window));

        let triggers = Arc::new(self.vote.map_or_else(
            || TriggerEngine::new(settings.trigger, clock.clone()),
            |vote| TriggerEngine::with_vote(settings.trigger, clock.clone(), vote),
        ));

        let metrics = Arc::new(MetricsCollector::new(clock.clone()));
        metrics.register("chain", Arc::new(ChainMetricsSource::new(chain.clone())));
        metrics.register("graph", Arc::new(GraphMetricsSource::new(graph.clone())));
        metrics.register("circuit", Arc::new(CircuitMetricsSource::new(skills.clone())));
        metrics.register("skills", Arc::new(SkillInvocationMetricsSource::new(skills.clone())));
        metrics.register("trace", Arc::new(TraceMetricsSource::new(tracer.clone())));
        metrics.register("learning", Arc::new(LearningMetricsSource::new(learner.clone(), calibration.clone())));
        metrics.register("session", Arc::new(SessionMetricsSource::new(session.clone())));
        metrics.register("system", Arc::new(SystemMetricsSource));

        let alerts = Arc::new(AlertManager::new(settings.metrics_thresholds, clock.clone()));

        Orchestrator {
            settings,
            clock,
            routing: RoutingTable,
            chain,
            chain_idle,
            graph,
            skills,
            tracer,
            session,
            learner,
            calibration,
            triggers,
            metrics,
            alerts,
            notifier,
            producer_id: self.producer_id,
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

    use judgnode_config::Settings;

    use super::OrchestratorBuilder;

    #[test]
    fn build_with_defaults_never_panics() {
        let orchestrator = OrchestratorBuilder::new(Settings::default()).build();
        assert_eq!(orchestrator.producer_id(), "judgnode");
    }

    #[test]
    fn producer_id_override_is_honored() {
        let orchestrator = OrchestratorBuilder::new(Settings::default()).producer_id("test-node").build();
        assert_eq!(orchestrator.producer_id(), "test-node");
    }
}

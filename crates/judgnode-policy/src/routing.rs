// crates/judgnode-policy/src/routing.rs
// ============================================================================
// Module: Routing Table
// Description: Ten registered domains, substring-triggered domain selection.
// Purpose: Map free-text content (and, failing that, an event kind) to the
// domain that should handle it.
// Dependencies: judgnode-core
// ============================================================================

//! ## Overview
//! [`RoutingTable::default`] registers the ten domains named in this
//! system's glossary — wisdom, design, memory, analysis, protection,
//! visualization, exploration, cleanup, deployment, mapping — each with a
//! lowercase trigger-substring set, a preferred handler name, and an ordered
//! tool-name list. [`RoutingTable::route`] lowercases content, walks domains
//! in registration order, and returns the first match; on no match it falls
//! back by event kind, and failing that to a generic `crown` domain with no
//! tools.

use judgnode_core::EventKind;

/// One registered routing domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    /// Domain name, matches [`judgnode_core::DomainName`] on the wire.
    pub name: &'static str,
    /// Lowercase substrings that select this domain.
    pub triggers: &'static [&'static str],
    /// Preferred skill-registry handler name for this domain.
    pub handler: &'static str,
    /// Suggested tool names, in preference order.
    pub tools: &'static [&'static str],
}

/// Result of [`RoutingTable::route`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// The selected domain's name.
    pub domain: &'static str,
    /// The domain's preferred handler.
    pub handler: &'static str,
    /// The domain's suggested tools (empty for the generic fallback).
    pub tools: &'static [&'static str],
}

const DOMAINS: &[Domain] = &[
    Domain {
        name: "protection",
        triggers: &["judge", "judgment", "risk", "danger", "block", "guard"],
        handler: "protection-handler",
        tools: &["risk-scanner", "circuit-breaker"],
    },
    Domain {
        name: "analysis",
        triggers: &["error", "exception", "stack trace", "panic", "failure", "bug"],
        handler: "analysis-handler",
        tools: &["log-analyzer", "trace-reader"],
    },
    Domain {
        name: "mapping",
        triggers: &["file", "directory", "path", "module", "import", "dependency"],
        handler: "mapping-handler",
        tools: &["graph-walker", "dependency-lister"],
    },
    Domain {
        name: "memory",
        triggers: &["remember", "recall", "history", "session", "context"],
        handler: "memory-handler",
        tools: &["session-lookup"],
    },
    Domain {
        name: "design",
        triggers: &["design", "architecture", "interface", "api shape", "schema"],
        handler: "design-handler",
        tools: &["design-reviewer"],
    },
    Domain {
        name: "deployment",
        triggers: &["deploy", "release", "rollout", "ci", "pipeline", "build"],
        handler: "deployment-handler",
        tools: &["deploy-runner"],
    },
    Domain {
        name: "cleanup",
        triggers: &["cleanup", "dead code", "unused", "lint", "tidy", "prune"],
        handler: "cleanup-handler",
        tools: &["lint-runner"],
    },
    Domain {
        name: "exploration",
        triggers: &["explore", "investigate", "spike", "prototype", "research"],
        handler: "exploration-handler",
        tools: &["search-tool"],
    },
    Domain {
        name: "visualization",
        triggers: &["chart", "graph view", "diagram", "visualize", "plot"],
        handler: "visualization-handler",
        tools: &["chart-renderer"],
    },
    Domain {
        name: "wisdom",
        triggers: &["advice", "recommend", "should i", "best practice", "tradeoff", "what is the meaning", "wisdom"],
        handler: "wisdom-handler",
        tools: &[],
    },
];

/// The ten registered routing domains, walked in registration order.
///
/// # Invariants
/// - `route` returns the first domain whose trigger set matches; domain
///   order is therefore part of the routing contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoutingTable;

impl RoutingTable {
    /// Routes `content` to a domain: lowercases it, checks each registered
    /// domain's triggers in order, and falls back by `event_kind` if none
    /// match.
    #[must_use]
    pub fn route(&self, content: &str, event_kind: EventKind) -> RoutingDecision {
        let lowered = content.to_lowercase();
        for domain in DOMAINS {
            if domain.triggers.iter().any(|trigger| lowered.contains(trigger)) {
                return RoutingDecision { domain: domain.name, handler: domain.handler, tools: domain.tools };
            }
        }
        match event_kind {
            EventKind::JudgmentRequest => domain_decision("protection"),
            EventKind::Error => domain_decision("analysis"),
            EventKind::FileChange => domain_decision("mapping"),
            _ => RoutingDecision { domain: "crown", handler: "crown-handler", tools: &[] },
        }
    }
}

fn domain_decision(name: &str) -> RoutingDecision {
    let domain = DOMAINS
        .iter()
        .find(|domain| domain.name == name)
        .unwrap_or(&DOMAINS[0]);
    RoutingDecision { domain: domain.name, handler: domain.handler, tools: domain.tools }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions."
    )]

    use super::RoutingTable;
    use judgnode_core::EventKind;

    #[test]
    fn matches_first_registered_domain() {
        let table = RoutingTable;
        let decision = table.route("please judge this risky change", EventKind::UserPrompt);
        assert_eq!(decision.domain, "protection");
    }

    #[test]
    fn falls_back_by_event_kind_on_no_match() {
        let table = RoutingTable;
        let decision = table.route("completely unrelated content", EventKind::Error);
        assert_eq!(decision.domain, "analysis");
    }

    #[test]
    fn a_meaning_of_life_question_routes_to_wisdom() {
        let table = RoutingTable;
        let decision = table.route("what is the meaning of this?", EventKind::UserPrompt);
        assert_eq!(decision.domain, "wisdom");
    }

    #[test]
    fn falls_back_to_crown_with_no_tools() {
        let table = RoutingTable;
        let decision = table.route("completely unrelated content", EventKind::UserPrompt);
        assert_eq!(decision.domain, "crown");
        assert!(decision.tools.is_empty());
    }
}

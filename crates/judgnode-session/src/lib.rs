// crates/judgnode-session/src/lib.rs
// ============================================================================
// Module: Judgment Node Session
// Description: Per-user running state — trust, current project, recent
//              events, pending suggestions, last-judgment feedback linking —
//              with idle eviction.
// Purpose: Give the orchestrator a place to keep cross-request, per-user
//          state without it leaking into the stateless pieces (C5, C6, C12).
// Dependencies: judgnode-core, judgnode-config, judgnode-policy
// ============================================================================

//! ## Overview
//! [`SessionStore`] owns one [`SessionState`] per [`judgnode_core::UserId`].
//! [`SessionStore::get`]/[`SessionStore::update`]/[`SessionStore::set_trust`]/
//! [`SessionStore::track_event`]/[`SessionStore::record_last_judgment`]/
//! [`SessionStore::match_feedback`] are the six public operations; every one
//! of them refreshes the session's idle clock. [`SessionStore::evict_idle`]
//! is the sweep a background loop calls periodically to drop sessions that
//! have been idle past `session.idle_eviction_ms`.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::RwLock;

use judgnode_config::SessionConfig;
use judgnode_core::Clock;
use judgnode_core::DecisionId;
use judgnode_core::Timestamp;
use judgnode_core::UserId;
use judgnode_policy::TrustTier;
use serde::Deserialize;
use serde::Serialize;

/// One tracked event in a session's bounded recent-events ring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEvent {
    /// Caller-supplied event kind.
    pub kind: String,
    /// When it was tracked.
    pub at: Timestamp,
}

/// Per-user running state.
///
/// # Invariants
/// - `trust_value` is clamped to `0.0..=100.0`.
/// - `recent_events` never exceeds the store's configured capacity; the
///   oldest event is evicted first.
/// - `last_judgment_at` is `Some` iff `last_judgment_id` is `Some`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// The user this state belongs to.
    pub user_id: UserId,
    /// Scalar trust value, `0.0..=100.0`.
    pub trust_value: f64,
    /// Free-text label of the project currently in focus.
    pub current_project: Option<String>,
    /// Most recent tracked events, newest last, bounded.
    pub recent_events: VecDeque<TrackedEvent>,
    /// Suggestion ids currently awaiting resolution for this user.
    pub pending_suggestions: Vec<String>,
    /// The most recently recorded judgment's id, if any.
    pub last_judgment_id: Option<DecisionId>,
    /// When that judgment was recorded.
    pub last_judgment_at: Option<Timestamp>,
    /// Energy metric in `0.0..=1.0`, consulted by the burnout-risk trigger.
    pub energy: f64,
    /// Last time any operation touched this session; drives idle eviction.
    pub last_active_at: Timestamp,
}

impl SessionState {
    fn new(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            trust_value: 0.0,
            current_project: None,
            recent_events: VecDeque::new(),
            pending_suggestions: Vec::new(),
            last_judgment_id: None,
            last_judgment_at: None,
            energy: 1.0,
            last_active_at: now,
        }
    }

    /// The qualitative trust tier derived from `trust_value`.
    #[must_use]
    pub fn trust_tier(&self) -> TrustTier {
        judgnode_policy::trust_tier(self.trust_value)
    }
}

/// A partial update applied via [`SessionStore::update`].
///
/// Each field uses `Option<Option<T>>` where clearing is meaningful: `None`
/// leaves the field untouched, `Some(None)` clears it, `Some(Some(v))` sets
/// it. Fields with no "clear" concept use a plain `Option<T>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionPatch {
    /// Set or clear the current project; `None` leaves it untouched.
    pub current_project: Option<Option<String>>,
    /// Overwrite the energy metric.
    pub energy: Option<f64>,
    /// Overwrite the pending-suggestions list.
    pub pending_suggestions: Option<Vec<String>>,
}

struct Inner {
    sessions: HashMap<UserId, SessionState>,
}

/// Owns per-user [`SessionState`], threaded a [`Clock`] and [`SessionConfig`].
pub struct SessionStore {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    inner: RwLock<Inner>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock, inner: RwLock::new(Inner { sessions: HashMap::new() }) }
    }

    /// Returns a clone of `user`'s session state, creating it first if
    /// absent. Returns `None` only if the existing session was already past
    /// its idle TTL (it is evicted as a side effect).
    #[must_use]
    pub fn get(&self, user: &UserId) -> Option<SessionState> {
        let now = self.clock.now();
        let mut inner = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(session) = inner.sessions.get(user) {
            if session.last_active_at.elapsed_until(now) > self.config.idle_eviction_ms {
                inner.sessions.remove(user);
                return None;
            }
        }
        let session = inner.sessions.entry(user.clone()).or_insert_with(|| SessionState::new(user.clone(), now));
        session.last_active_at = now;
        Some(session.clone())
    }

    /// Applies `patch` to `user`'s session, creating it first if absent, and
    /// returns the updated state.
    pub fn update(&self, user: &UserId, patch: SessionPatch) -> SessionState {
        self.with_session(user, |session| {
            if let Some(project) = patch.current_project {
                session.current_project = project;
            }
            if let Some(energy) = patch.energy {
                session.energy = energy.clamp(0.0, 1.0);
            }
            if let Some(pending) = patch.pending_suggestions {
                session.pending_suggestions = pending;
            }
        })
    }

    /// Sets `user`'s trust value, clamped to `0.0..=100.0`.
    pub fn set_trust(&self, user: &UserId, value: f64) -> SessionState {
        self.with_session(user, |session| {
            session.trust_value = value.clamp(0.0, 100.0);
        })
    }

    /// Records one event of `kind`, evicting the oldest if the bounded
    /// window is full.
    pub fn track_event(&self, user: &UserId, kind: impl Into<String>) -> SessionState {
        let capacity = self.config.recent_events_capacity;
        self.with_session(user, |session| {
            session.recent_events.push_back(TrackedEvent { kind: kind.into(), at: session.last_active_at });
            while session.recent_events.len() > capacity {
                session.recent_events.pop_front();
            }
        })
    }

    /// Records `id` as the most recent judgment for `user`, resetting the
    /// 10-minute `match_feedback` window.
    pub fn record_last_judgment(&self, user: &UserId, id: DecisionId) -> SessionState {
        self.with_session(user, |session| {
            session.last_judgment_id = Some(id);
            session.last_judgment_at = Some(session.last_active_at);
        })
    }

    /// Returns `user`'s last judgment id if it was recorded within the
    /// configured TTL; `None` otherwise (absent session, no prior judgment,
    /// or the TTL has elapsed). `_feedback` is accepted for interface parity
    /// with the published operation; resolution here is TTL-only.
    #[must_use]
    pub fn match_feedback(&self, user: &UserId, _feedback: &str) -> Option<DecisionId> {
        let now = self.clock.now();
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let session = inner.sessions.get(user)?;
        let last_judgment_at = session.last_judgment_at?;
        if last_judgment_at.elapsed_until(now) > self.config.last_judgment_ttl_ms {
            return None;
        }
        session.last_judgment_id.clone()
    }

    /// Evicts every session idle past the configured TTL. Returns the
    /// evicted user ids.
    pub fn evict_idle(&self) -> Vec<UserId> {
        let now = self.clock.now();
        let mut inner = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let stale: Vec<UserId> = inner
            .sessions
            .values()
            .filter(|session| session.last_active_at.elapsed_until(now) > self.config.idle_eviction_ms)
            .map(|session| session.user_id.clone())
            .collect();
        for user in &stale {
            inner.sessions.remove(user);
        }
        stale
    }

    /// Number of sessions currently tracked (including ones past TTL that
    /// have not yet been swept).
    #[must_use]
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.sessions.len()
    }

    /// True if no session is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Longest idle duration, in milliseconds, across every currently
    /// tracked session. `0` when no session is tracked.
    #[must_use]
    pub fn max_idle_ms(&self) -> u64 {
        let now = self.clock.now();
        let inner = self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        inner.sessions.values().map(|session| session.last_active_at.elapsed_until(now)).max().unwrap_or(0)
    }

    fn with_session(&self, user: &UserId, mutate: impl FnOnce(&mut SessionState)) -> SessionState {
        let now = self.clock.now();
        let mut inner = self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner);
        let session = inner.sessions.entry(user.clone()).or_insert_with(|| SessionState::new(user.clone(), now));
        session.last_active_at = now;
        mutate(session);
        session.clone()
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

    use super::*;

    fn store(config: SessionConfig) -> (SessionStore, Arc<FixedClock>) {
        let clock = Arc::new(FixedClock::new(Timestamp::from_millis(0)));
        (SessionStore::new(config, clock.clone()), clock)
    }

    #[test]
    fn get_creates_a_fresh_session_on_first_access() {
        let (store, _clock) = store(SessionConfig::default());
        let user = UserId::new("alice");
        let session = store.get(&user).expect("fresh session");
        assert_eq!(session.trust_value, 0.0);
        assert_eq!(session.trust_tier(), TrustTier::Observer);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn set_trust_clamps_to_the_valid_range() {
        let (store, _clock) = store(SessionConfig::default());
        let user = UserId::new("alice");
        let session = store.set_trust(&user, 150.0);
        assert_eq!(session.trust_value, 100.0);
        let session = store.set_trust(&user, -10.0);
        assert_eq!(session.trust_value, 0.0);
    }

    #[test]
    fn track_event_bounds_the_recent_events_window() {
        let config = SessionConfig { recent_events_capacity: 2, ..SessionConfig::default() };
        let (store, _clock) = store(config);
        let user = UserId::new("alice");
        store.track_event(&user, "a");
        store.track_event(&user, "b");
        let session = store.track_event(&user, "c");
        assert_eq!(session.recent_events.len(), 2);
        assert_eq!(session.recent_events[0].kind, "b");
        assert_eq!(session.recent_events[1].kind, "c");
    }

    #[test]
    fn match_feedback_succeeds_within_the_ttl_and_fails_after() {
        let config = SessionConfig { last_judgment_ttl_ms: 1_000, ..SessionConfig::default() };
        let (store, clock) = store(config);
        let user = UserId::new("alice");
        store.record_last_judgment(&user, DecisionId::new("d1"));
        assert_eq!(store.match_feedback(&user, "thanks"), Some(DecisionId::new("d1")));

        clock.advance(1_001);
        assert_eq!(store.match_feedback(&user, "thanks"), None);
    }

    #[test]
    fn match_feedback_on_a_session_with_no_judgment_is_none() {
        let (store, _clock) = store(SessionConfig::default());
        let user = UserId::new("alice");
        store.get(&user);
        assert_eq!(store.match_feedback(&user, "thanks"), None);
    }

    #[test]
    fn update_can_set_and_clear_the_current_project() {
        let (store, _clock) = store(SessionConfig::default());
        let user = UserId::new("alice");
        let patch = SessionPatch { current_project: Some(Some("judgnode".to_string())), ..SessionPatch::default() };
        let session = store.update(&user, patch);
        assert_eq!(session.current_project.as_deref(), Some("judgnode"));

        let clear = SessionPatch { current_project: Some(None), ..SessionPatch::default() };
        let session = store.update(&user, clear);
        assert_eq!(session.current_project, None);
    }

    #[test]
    fn evict_idle_removes_sessions_past_the_ttl_and_leaves_active_ones() {
        let config = SessionConfig { idle_eviction_ms: 1_000, ..SessionConfig::default() };
        let (store, clock) = store(config);
        let idle_user = UserId::new("idle");
        let active_user = UserId::new("active");
        store.get(&idle_user);
        clock.advance(1_001);
        store.get(&active_user);

        let evicted = store.evict_idle();
        assert_eq!(evicted, vec![idle_user]);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn max_idle_ms_is_zero_with_no_sessions() {
        let (store, _clock) = store(SessionConfig::default());
        assert_eq!(store.max_idle_ms(), 0);
    }

    #[test]
    fn max_idle_ms_tracks_the_stalest_session() {
        let (store, clock) = store(SessionConfig::default());
        store.get(&UserId::new("alice"));
        clock.advance(500);
        store.get(&UserId::new("bob"));
        clock.advance(250);
        assert_eq!(store.max_idle_ms(), 750);
    }
}

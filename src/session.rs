// =============================================================================
// Auth Gate — per-session login state machine
// =============================================================================
//
//   Anonymous ──(login succeeded)──▶ Authenticated
//   Authenticated ──(logout)──▶ Anonymous
//
// A failed login leaves the state untouched.  Registration is not an event
// here: a freshly registered user still has to log in.
//
// Every browser session owns its own gate, keyed by an opaque id carried in
// a cookie.  Sessions live in memory only and expire after an idle TTL.
// =============================================================================

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

/// Name of the cookie that carries the session id.
pub const SESSION_COOKIE: &str = "dashboard_session";

/// Login state of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    Anonymous,
    Authenticated { username: String },
}

impl Default for GateState {
    fn default() -> Self {
        Self::Anonymous
    }
}

impl std::fmt::Display for GateState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::Authenticated { username } => write!(f, "Authenticated({username})"),
        }
    }
}

/// Inputs that drive the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEvent {
    LoginSucceeded { username: String },
    LoginFailed,
    Logout,
}

/// The state machine itself.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    state: GateState,
}

impl AuthGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, GateState::Authenticated { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match &self.state {
            GateState::Authenticated { username } => Some(username),
            GateState::Anonymous => None,
        }
    }

    /// Apply `event` and return the resulting state.
    pub fn transition(&mut self, event: GateEvent) -> &GateState {
        match event {
            GateEvent::LoginSucceeded { username } => {
                self.state = GateState::Authenticated { username };
            }
            GateEvent::LoginFailed => {}
            GateEvent::Logout => {
                self.state = GateState::Anonymous;
            }
        }
        &self.state
    }
}

// =============================================================================
// SessionStore
// =============================================================================

struct Session {
    gate: AuthGate,
    last_seen: Instant,
}

/// In-memory map of session id to gate.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Open a new anonymous session and return its id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.sessions.write().insert(
            id.clone(),
            Session {
                gate: AuthGate::new(),
                last_seen: Instant::now(),
            },
        );
        debug!(session = %id, "session created");
        id
    }

    /// Current state of session `id`, refreshing its idle timer.
    ///
    /// Unknown or expired ids report `Anonymous`.
    pub fn state(&self, id: &str) -> GateState {
        let mut sessions = self.sessions.write();
        let expired = match sessions.get(id) {
            Some(s) => s.last_seen.elapsed() > self.ttl,
            None => return GateState::Anonymous,
        };

        if expired {
            sessions.remove(id);
            debug!(session = %id, "session expired");
            return GateState::Anonymous;
        }

        match sessions.get_mut(id) {
            Some(s) => {
                s.last_seen = Instant::now();
                s.gate.state().clone()
            }
            None => GateState::Anonymous,
        }
    }

    /// Feed `event` to the gate of session `id`.  Returns the state after
    /// the transition.
    ///
    /// Only sessions handed out by [`Self::create`] are tracked: an unknown
    /// id is left alone and reports `Anonymous`.
    pub fn apply(&self, id: &str, event: GateEvent) -> GateState {
        let mut sessions = self.sessions.write();
        let Some(session) = sessions.get_mut(id) else {
            debug!(session = %id, "event for unknown session ignored");
            return GateState::Anonymous;
        };
        if session.last_seen.elapsed() > self.ttl {
            session.gate = AuthGate::new();
        }
        session.last_seen = Instant::now();
        let state = session.gate.transition(event).clone();
        info!(
            session = %id,
            authenticated = session.gate.is_authenticated(),
            user = session.gate.username().unwrap_or("-"),
            "session state updated"
        );
        state
    }

    /// Drop sessions idle for longer than the TTL.  Returns how many were
    /// removed.
    pub fn prune_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, s| s.last_seen.elapsed() <= self.ttl);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn login(name: &str) -> GateEvent {
        GateEvent::LoginSucceeded {
            username: name.to_string(),
        }
    }

    #[test]
    fn gate_starts_anonymous() {
        let gate = AuthGate::new();
        assert_eq!(gate.state(), &GateState::Anonymous);
        assert!(!gate.is_authenticated());
        assert_eq!(gate.username(), None);
    }

    #[test]
    fn gate_login_then_logout() {
        let mut gate = AuthGate::new();
        gate.transition(login("alice"));
        assert!(gate.is_authenticated());
        assert_eq!(gate.username(), Some("alice"));

        gate.transition(GateEvent::Logout);
        assert_eq!(gate.state(), &GateState::Anonymous);
    }

    #[test]
    fn gate_failed_login_keeps_state() {
        let mut gate = AuthGate::new();
        gate.transition(GateEvent::LoginFailed);
        assert_eq!(gate.state(), &GateState::Anonymous);

        gate.transition(login("alice"));
        gate.transition(GateEvent::LoginFailed);
        assert_eq!(gate.username(), Some("alice"));
    }

    #[test]
    fn gate_logout_when_anonymous_is_noop() {
        let mut gate = AuthGate::new();
        assert_eq!(gate.transition(GateEvent::Logout), &GateState::Anonymous);
    }

    #[test]
    fn sessions_are_independent() {
        let store = SessionStore::new(Duration::from_secs(60));
        let a = store.create();
        let b = store.create();
        assert_ne!(a, b);

        store.apply(&a, login("alice"));
        assert!(matches!(store.state(&a), GateState::Authenticated { .. }));
        assert_eq!(store.state(&b), GateState::Anonymous);
    }

    #[test]
    fn unknown_session_is_anonymous() {
        let store = SessionStore::new(Duration::from_secs(60));
        assert_eq!(store.state("missing"), GateState::Anonymous);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn apply_to_unknown_session_is_noop() {
        let store = SessionStore::new(Duration::from_secs(60));
        for i in 0..100 {
            let id = format!("forged-{i}");
            assert_eq!(store.apply(&id, GateEvent::Logout), GateState::Anonymous);
            assert_eq!(store.apply(&id, GateEvent::LoginFailed), GateState::Anonymous);
        }
        assert_eq!(store.apply("abc", login("bob")), GateState::Anonymous);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn apply_updates_created_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.create();
        let state = store.apply(&id, login("bob"));
        assert_eq!(
            state,
            GateState::Authenticated {
                username: "bob".to_string()
            }
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expired_sessions_fall_back_to_anonymous() {
        let store = SessionStore::new(Duration::ZERO);
        let id = store.create();
        store.apply(&id, login("alice"));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.state(&id), GateState::Anonymous);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn prune_removes_idle_sessions() {
        let store = SessionStore::new(Duration::ZERO);
        store.create();
        store.create();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.prune_expired(), 2);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn gate_state_serialises_with_tag() {
        let json = serde_json::to_value(GateState::Authenticated {
            username: "alice".to_string(),
        })
        .unwrap();
        assert_eq!(json["state"], "authenticated");
        assert_eq!(json["username"], "alice");
    }
}

//! Workflow session bookkeeping on top of a [`StateStore`] namespace.
//!
//! Stored keys: `is_active`, `session_id`, `current_phase`, `started_at`,
//! `phases_completed`, `actors_spawned`. Values of the wrong type read as
//! absent so a hand-edited store cannot wedge the workflow.

use anyhow::Result;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::core::types::Phase;
use crate::io::store::{Namespace, StateStore};

const KEY_IS_ACTIVE: &str = "is_active";
const KEY_SESSION_ID: &str = "session_id";
const KEY_CURRENT_PHASE: &str = "current_phase";
const KEY_STARTED_AT: &str = "started_at";
const KEY_PHASES_COMPLETED: &str = "phases_completed";
const KEY_ACTORS_SPAWNED: &str = "actors_spawned";

/// Decoded view of the session keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
    pub is_active: bool,
    pub session_id: Option<String>,
    pub current_phase: Option<Phase>,
    pub started_at: Option<String>,
    pub phases_completed: Vec<Phase>,
    pub actors_spawned: Vec<String>,
}

impl Session {
    fn from_namespace(ns: &Namespace) -> Self {
        let string = |key: &str| ns.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            is_active: ns.get(KEY_IS_ACTIVE).and_then(Value::as_bool).unwrap_or(false),
            session_id: string(KEY_SESSION_ID),
            current_phase: string(KEY_CURRENT_PHASE).and_then(|p| p.parse().ok()),
            started_at: string(KEY_STARTED_AT),
            phases_completed: ns
                .get(KEY_PHASES_COMPLETED)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter_map(|p| p.parse().ok())
                        .collect()
                })
                .unwrap_or_default(),
            actors_spawned: ns
                .get(KEY_ACTORS_SPAWNED)
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Phase to gate against. An active session whose stored phase is missing
    /// or unrecognized is treated as being at `initial`.
    pub fn phase_or(&self, initial: Phase) -> Phase {
        self.current_phase.unwrap_or(initial)
    }
}

/// Result of an activation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Activation {
    Started(Session),
    AlreadyActive(Session),
}

/// Result of a compare-and-swap phase advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Advanced,
    /// Another invocation changed the phase since it was read.
    Conflict { actual: Option<Phase> },
    /// The session was deactivated since it was read.
    Inactive,
}

/// Typed accessor for the session keys in one namespace.
pub struct SessionStore<'a, S: StateStore> {
    store: &'a S,
    namespace: &'a str,
}

impl<'a, S: StateStore> SessionStore<'a, S> {
    pub fn new(store: &'a S, namespace: &'a str) -> Self {
        Self { store, namespace }
    }

    pub fn load(&self) -> Session {
        Session::from_namespace(&self.store.load_namespace(self.namespace))
    }

    /// Start a session at `initial` unless one is already active.
    pub fn activate(
        &self,
        session_id: Option<&str>,
        initial: Phase,
        started_at: &str,
    ) -> Result<Activation> {
        self.store.update(self.namespace, |ns| {
            let existing = Session::from_namespace(ns);
            if existing.is_active {
                return Activation::AlreadyActive(existing);
            }
            ns.clear();
            ns.insert(KEY_IS_ACTIVE.to_string(), json!(true));
            if let Some(id) = session_id {
                ns.insert(KEY_SESSION_ID.to_string(), json!(id));
            }
            ns.insert(KEY_CURRENT_PHASE.to_string(), json!(initial.as_str()));
            ns.insert(KEY_STARTED_AT.to_string(), json!(started_at));
            ns.insert(KEY_PHASES_COMPLETED.to_string(), json!([]));
            ns.insert(KEY_ACTORS_SPAWNED.to_string(), json!([]));
            info!(phase = %initial, session_id = ?session_id, "workflow activated");
            Activation::Started(Session::from_namespace(ns))
        })
    }

    /// Move from `expected` to `next` if the stored phase still equals
    /// `expected`.
    pub fn advance(&self, expected: Phase, next: Phase) -> Result<Advance> {
        self.store.update(self.namespace, |ns| {
            let session = Session::from_namespace(ns);
            if !session.is_active {
                return Advance::Inactive;
            }
            // An unreadable stored phase counts as the phase the caller gated on.
            let actual = session.current_phase.unwrap_or(expected);
            if actual != expected {
                debug!(expected = %expected, actual = %actual, "phase advance conflict");
                return Advance::Conflict {
                    actual: session.current_phase,
                };
            }
            let mut completed = session.phases_completed;
            if !completed.contains(&expected) {
                completed.push(expected);
            }
            ns.insert(KEY_CURRENT_PHASE.to_string(), json!(next.as_str()));
            ns.insert(
                KEY_PHASES_COMPLETED.to_string(),
                json!(completed.iter().map(|p| p.as_str()).collect::<Vec<_>>()),
            );
            info!(from = %expected, to = %next, "phase advanced");
            Advance::Advanced
        })
    }

    /// Add an allowed delegation to the session history, once per actor.
    pub fn record_spawn(&self, actor: &str) -> Result<()> {
        self.store.update(self.namespace, |ns| {
            let mut spawned = Session::from_namespace(ns).actors_spawned;
            if spawned.iter().any(|seen| seen == actor) {
                return;
            }
            spawned.push(actor.to_string());
            ns.insert(KEY_ACTORS_SPAWNED.to_string(), json!(spawned));
        })
    }

    /// Return the namespace to the inactive, never-started state.
    pub fn reset(&self) -> Result<()> {
        self.store.update(self.namespace, |ns| {
            ns.clear();
            ns.insert(KEY_IS_ACTIVE.to_string(), json!(false));
        })?;
        info!(namespace = self.namespace, "workflow session reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::store::MemoryStore;

    const NS: &str = "implement_flow";

    #[test]
    fn activation_starts_at_initial_phase_once() {
        let store = MemoryStore::new();
        let sessions = SessionStore::new(&store, NS);
        let started = sessions
            .activate(Some("s1"), Phase::Explore, "2026-10-17T09:00:00+00:00")
            .expect("activate");
        let Activation::Started(session) = started else {
            panic!("expected start");
        };
        assert!(session.is_active);
        assert_eq!(session.current_phase, Some(Phase::Explore));
        assert_eq!(session.session_id.as_deref(), Some("s1"));

        let again = sessions
            .activate(Some("s2"), Phase::Explore, "later")
            .expect("activate");
        assert!(matches!(again, Activation::AlreadyActive(ref s) if s.session_id.as_deref() == Some("s1")));
    }

    #[test]
    fn advance_is_compare_and_swap() {
        let store = MemoryStore::new();
        let sessions = SessionStore::new(&store, NS);
        sessions
            .activate(Some("s1"), Phase::Explore, "t")
            .expect("activate");
        assert_eq!(
            sessions.advance(Phase::Explore, Phase::Plan).expect("advance"),
            Advance::Advanced
        );
        assert_eq!(
            sessions.advance(Phase::Explore, Phase::Plan).expect("advance"),
            Advance::Conflict {
                actual: Some(Phase::Plan)
            }
        );
        let session = sessions.load();
        assert_eq!(session.current_phase, Some(Phase::Plan));
        assert_eq!(session.phases_completed, vec![Phase::Explore]);
    }

    #[test]
    fn advance_on_inactive_session_is_refused() {
        let store = MemoryStore::new();
        let sessions = SessionStore::new(&store, NS);
        assert_eq!(
            sessions.advance(Phase::Explore, Phase::Plan).expect("advance"),
            Advance::Inactive
        );
    }

    #[test]
    fn wrong_typed_values_read_as_absent() {
        let store = MemoryStore::new();
        store.set(NS, KEY_IS_ACTIVE, json!("yes")).expect("set");
        store.set(NS, KEY_CURRENT_PHASE, json!("deploy")).expect("set");
        store.set(NS, KEY_ACTORS_SPAWNED, json!({"a": 1})).expect("set");
        let session = SessionStore::new(&store, NS).load();
        assert_eq!(session, Session::default());
        assert_eq!(session.phase_or(Phase::Plan), Phase::Plan);
    }

    #[test]
    fn reset_clears_progress_and_spawn_history() {
        let store = MemoryStore::new();
        let sessions = SessionStore::new(&store, NS);
        sessions.activate(None, Phase::Explore, "t").expect("activate");
        sessions.record_spawn("codebase-explorer").expect("spawn");
        assert_eq!(sessions.load().actors_spawned, vec!["codebase-explorer"]);
        sessions.reset().expect("reset");
        let session = sessions.load();
        assert!(!session.is_active);
        assert_eq!(session.current_phase, None);
        assert!(session.actors_spawned.is_empty());
    }

    #[test]
    fn repeated_spawns_are_recorded_once() {
        let store = MemoryStore::new();
        let sessions = SessionStore::new(&store, NS);
        sessions.activate(None, Phase::Explore, "t").expect("activate");
        for actor in ["codebase-explorer", "research-specialist", "codebase-explorer"] {
            sessions.record_spawn(actor).expect("spawn");
        }
        assert_eq!(
            sessions.load().actors_spawned,
            vec!["codebase-explorer", "research-specialist"]
        );
    }

    #[test]
    fn other_namespaces_are_untouched() {
        let store = MemoryStore::new();
        store.set("code_review", "is_active", json!(true)).expect("set");
        let sessions = SessionStore::new(&store, NS);
        sessions.activate(None, Phase::Explore, "t").expect("activate");
        sessions.reset().expect("reset");
        assert_eq!(store.get("code_review", "is_active"), Some(json!(true)));
    }
}

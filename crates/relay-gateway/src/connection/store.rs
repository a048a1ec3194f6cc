//! Session store
//!
//! The registry of live sessions: each session's latest merged state together
//! with the outbound handle of the connection that owns it. A session exists
//! in the store exactly while its connection is registered.

use super::Connection;
use crate::protocol::Frame;
use parking_lot::RwLock;
use relay_core::{DomainError, PlayerState, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

struct SessionEntry {
    state: PlayerState,
    connection: Arc<Connection>,
}

/// Result of registering a new connection
#[derive(Debug)]
pub struct Registration {
    pub session_id: SessionId,
    /// Default state stored for the new session
    pub state: PlayerState,
    pub connection: Arc<Connection>,
    /// Connections of the sessions the new one saw in its snapshot
    pub peers: Vec<Arc<Connection>>,
}

/// Registry of live sessions
///
/// Every operation takes the lock once, so each one is atomic with respect to
/// the others.
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
}

impl SessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty store wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection under a fresh id with the default state
    pub fn register(&self, sender: mpsc::Sender<Frame>) -> Registration {
        self.register_with(sender, |_, _| {})
    }

    /// Register a new connection, then call `greet` before any other
    /// operation can observe the new session
    ///
    /// `greet` receives the new connection and a snapshot of every other
    /// session's state. It runs under the store's write lock, so it must not
    /// call back into the store.
    pub fn register_with<F>(&self, sender: mpsc::Sender<Frame>, greet: F) -> Registration
    where
        F: FnOnce(&Arc<Connection>, HashMap<SessionId, PlayerState>),
    {
        let mut sessions = self.sessions.write();

        let mut session_id = SessionId::generate();
        while sessions.contains_key(&session_id) {
            session_id = SessionId::generate();
        }

        let others: HashMap<SessionId, PlayerState> = sessions
            .iter()
            .map(|(id, entry)| (id.clone(), entry.state.clone()))
            .collect();
        let peers: Vec<Arc<Connection>> = sessions
            .values()
            .map(|entry| entry.connection.clone())
            .collect();

        let state = PlayerState::initial(&session_id);
        let connection = Connection::new(session_id.clone(), sender);
        sessions.insert(
            session_id.clone(),
            SessionEntry {
                state: state.clone(),
                connection: connection.clone(),
            },
        );

        greet(&connection, others);
        drop(sessions);

        tracing::debug!(session_id = %session_id, "Session registered");

        Registration {
            session_id,
            state,
            connection,
            peers,
        }
    }

    /// Remove a session, returning its connection if it was present
    pub fn remove(&self, session_id: &SessionId) -> Option<Arc<Connection>> {
        let removed = self.sessions.write().remove(session_id);
        if removed.is_some() {
            tracing::debug!(session_id = %session_id, "Session removed");
        }
        removed.map(|entry| entry.connection)
    }

    /// Get the stored state of a session
    pub fn get(&self, session_id: &SessionId) -> Option<PlayerState> {
        self.sessions
            .read()
            .get(session_id)
            .map(|entry| entry.state.clone())
    }

    /// Replace the stored state of a session
    pub fn set_state(&self, session_id: &SessionId, state: PlayerState) -> Result<(), DomainError> {
        match self.sessions.write().get_mut(session_id) {
            Some(entry) => {
                entry.state = state;
                Ok(())
            }
            None => Err(DomainError::SessionNotFound(session_id.clone())),
        }
    }

    /// Replace the stored state of a session with `f(current)` under one lock
    pub fn update_state<F>(&self, session_id: &SessionId, f: F) -> Result<PlayerState, DomainError>
    where
        F: FnOnce(&PlayerState) -> PlayerState,
    {
        let mut sessions = self.sessions.write();
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| DomainError::SessionNotFound(session_id.clone()))?;
        entry.state = f(&entry.state);
        Ok(entry.state.clone())
    }

    /// Stored state of every session except `exclude`, keyed by id
    pub fn snapshot_excluding(&self, exclude: &SessionId) -> HashMap<SessionId, PlayerState> {
        self.sessions
            .read()
            .iter()
            .filter(|(id, _)| *id != exclude)
            .map(|(id, entry)| (id.clone(), entry.state.clone()))
            .collect()
    }

    /// Connections of every session except `exclude`
    pub fn all_excluding(&self, exclude: &SessionId) -> Vec<Arc<Connection>> {
        self.sessions
            .read()
            .iter()
            .filter(|(id, _)| *id != exclude)
            .map(|(_, entry)| entry.connection.clone())
            .collect()
    }

    /// Connections of every session
    pub fn all(&self) -> Vec<Arc<Connection>> {
        self.sessions
            .read()
            .values()
            .map(|entry| entry.connection.clone())
            .collect()
    }

    /// Check if a session is registered
    pub fn contains(&self, session_id: &SessionId) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Check if no session is registered
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("sessions", &self.len())
            .finish()
    }
}

//! Individual relay connection
//!
//! The outbound half of one participant's connection: a bounded queue drained
//! by that connection's own writer task, plus the lifecycle flags the
//! broadcast side needs to see.

use crate::protocol::Frame;
use parking_lot::Mutex;
use relay_core::SessionId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify};

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registered, greeting not yet sent
    Connecting,
    /// Greeted and announced; processing messages
    Active,
    /// Removed from the registry; terminal
    Closed,
}

/// Why a frame could not be queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    /// The connection is closed or its writer is gone
    #[error("connection closed")]
    Closed,
    /// The outbound queue is at capacity
    #[error("outbound queue full")]
    Full,
}

/// A single participant connection
pub struct Connection {
    /// Session this connection belongs to
    session_id: SessionId,

    /// Bounded queue to the connection's writer task
    sender: mpsc::Sender<Frame>,

    /// Current lifecycle state
    state: Mutex<ConnectionState>,

    /// Set when the overflow policy evicts this connection
    evicted: AtomicBool,
    eviction: Notify,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(session_id: SessionId, sender: mpsc::Sender<Frame>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            sender,
            state: Mutex::new(ConnectionState::Connecting),
            evicted: AtomicBool::new(false),
            eviction: Notify::new(),
            created_at: Instant::now(),
        })
    }

    /// Get the session ID
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Get the current state
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Set the connection state. `Closed` is terminal and never left.
    pub fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock();
        if *state != ConnectionState::Closed {
            *state = next;
        }
    }

    /// Move to `Closed`, returning `true` only for the call that made the transition
    pub fn mark_closed(&self) -> bool {
        let mut state = self.state.lock();
        let was_open = *state != ConnectionState::Closed;
        *state = ConnectionState::Closed;
        was_open
    }

    /// Queue a frame without waiting
    pub fn try_send(&self, frame: Frame) -> Result<(), SendError> {
        if self.state() == ConnectionState::Closed {
            return Err(SendError::Closed);
        }

        self.sender.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::Full,
            mpsc::error::TrySendError::Closed(_) => SendError::Closed,
        })
    }

    /// Ask the owning handler to disconnect this connection
    pub fn evict(&self) {
        if !self.evicted.swap(true, Ordering::SeqCst) {
            // notify_one stores a permit, so a handler that is not yet waiting still sees it
            self.eviction.notify_one();
        }
    }

    /// Check if the connection was evicted
    pub fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::SeqCst)
    }

    /// Resolves once the connection has been evicted
    pub async fn evicted(&self) {
        if self.is_evicted() {
            return;
        }
        self.eviction.notified().await;
    }

    /// Resolves once the writer task has dropped its end of the queue
    pub async fn writer_closed(&self) {
        self.sender.closed().await;
    }

    /// Get connection age
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("state", &self.state())
            .field("evicted", &self.is_evicted())
            .field("created_at", &self.created_at)
            .finish()
    }
}

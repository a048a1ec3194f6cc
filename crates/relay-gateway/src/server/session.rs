//! Per-connection control loop
//!
//! Drives one participant from registration to removal. The handler never
//! touches a socket: it reads `InboundEvent`s from any stream and writes to
//! the outbound queue of its `Connection`, which the transport drains.

use crate::connection::{Connection, ConnectionState, Registration};
use crate::handlers::MessageDispatcher;
use crate::protocol::{Frame, ServerMessage};
use crate::server::GatewayState;
use futures_util::{Stream, StreamExt};
use relay_core::SessionId;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// What the transport observed on the inbound side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A text frame
    Text(String),
    /// A binary frame of the given length; not part of the protocol
    Binary(usize),
    /// Transport-level keepalive
    Heartbeat,
    /// The peer closed the connection or the transport failed
    Closed,
}

/// Why a connection ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    ClientClosed,
    IdleTimeout,
    /// Evicted by the overflow policy
    SlowConsumer,
    /// The outbound writer stopped
    WriterClosed,
    /// The handler was dropped before it finished
    Cancelled,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientClosed => "client_closed",
            Self::IdleTimeout => "idle_timeout",
            Self::SlowConsumer => "slow_consumer",
            Self::WriterClosed => "writer_closed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Handler for one participant connection
pub struct ConnectionHandler {
    state: GatewayState,
    connection: Arc<Connection>,
    closed: bool,
}

impl ConnectionHandler {
    /// Register a new participant, greet it, and announce it to the others
    pub fn open(state: GatewayState, outbound: mpsc::Sender<Frame>) -> Self {
        let router = state.router();
        let Registration {
            session_id,
            state: initial,
            connection,
            peers,
        } = state.store().register_with(outbound, |connection, others| {
            let id = connection.session_id().clone();
            router.send_to(connection, &ServerMessage::player_id(id.clone()));
            router.send_to(connection, &ServerMessage::world_state(id, others));
        });

        let report = router.announce_join(&peers, initial);
        connection.set_state(ConnectionState::Active);

        tracing::info!(
            session_id = %session_id,
            sessions = state.store().len(),
            notified = report.delivered,
            "Participant connected"
        );

        Self {
            state,
            connection,
            closed: false,
        }
    }

    /// Get the session ID
    pub fn session_id(&self) -> &SessionId {
        self.connection.session_id()
    }

    /// Process inbound events until the connection ends, then close it
    pub async fn run<S>(mut self, inbound: S) -> DisconnectReason
    where
        S: Stream<Item = InboundEvent>,
    {
        let reason = self.process(inbound).await;
        self.close(reason);
        reason
    }

    async fn process<S>(&self, inbound: S) -> DisconnectReason
    where
        S: Stream<Item = InboundEvent>,
    {
        let mut inbound = std::pin::pin!(inbound);
        let idle_timeout = self.state.relay().idle_timeout();
        let connection = &self.connection;

        loop {
            tokio::select! {
                biased;

                () = connection.evicted() => return DisconnectReason::SlowConsumer,
                () = connection.writer_closed() => return DisconnectReason::WriterClosed,
                event = next_event(&mut inbound, idle_timeout) => match event {
                    None => return DisconnectReason::IdleTimeout,
                    Some(None | Some(InboundEvent::Closed)) => return DisconnectReason::ClientClosed,
                    Some(Some(InboundEvent::Text(text))) => self.handle_text(&text),
                    Some(Some(InboundEvent::Binary(len))) => {
                        tracing::debug!(
                            session_id = %self.session_id(),
                            len,
                            "Ignoring binary frame"
                        );
                    }
                    Some(Some(InboundEvent::Heartbeat)) => {
                        tracing::trace!(session_id = %self.session_id(), "Heartbeat");
                    }
                },
            }
        }
    }

    fn handle_text(&self, text: &str) {
        if let Err(e) = MessageDispatcher::dispatch_text(&self.state, &self.connection, text) {
            if e.is_benign() {
                tracing::debug!(
                    session_id = %self.session_id(),
                    error = %e,
                    "Message for a departed session skipped"
                );
            } else {
                tracing::warn!(
                    session_id = %self.session_id(),
                    code = e.code(),
                    error = %e,
                    "Malformed message skipped"
                );
            }
        }
    }

    /// Remove the session and tell the others it left. Runs at most once.
    fn close(&mut self, reason: DisconnectReason) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.connection.mark_closed();

        let session_id = self.connection.session_id();
        if self.state.store().remove(session_id).is_none() {
            return;
        }

        let report = self.state.router().announce_leave(session_id);

        tracing::info!(
            session_id = %session_id,
            reason = %reason,
            notified = report.delivered,
            connected_ms = self.connection.age().as_millis() as u64,
            "Participant disconnected"
        );
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        self.close(DisconnectReason::Cancelled);
    }
}

impl std::fmt::Debug for ConnectionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandler")
            .field("connection", &self.connection)
            .field("closed", &self.closed)
            .finish()
    }
}

/// Next inbound event; `None` when the idle timeout elapsed first
async fn next_event<S>(inbound: &mut S, idle_timeout: Option<Duration>) -> Option<Option<InboundEvent>>
where
    S: Stream<Item = InboundEvent> + Unpin,
{
    match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, inbound.next()).await.ok(),
        None => Some(inbound.next().await),
    }
}

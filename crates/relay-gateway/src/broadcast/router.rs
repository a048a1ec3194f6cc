//! Broadcast router
//!
//! Serializes each server message once and queues the shared frame on every
//! recipient. Queuing never waits: a full queue is handled by the configured
//! overflow policy, so one stalled client cannot hold up the others. Only state
//! updates are ever skipped; a recipient that cannot take a join, a leave or a
//! chat line is disconnected under either policy.

use crate::connection::{Connection, SendError, SessionStore};
use crate::protocol::{Frame, ServerMessage};
use relay_common::OverflowPolicy;
use relay_core::{PartialState, PlayerState, SessionId};
use serde_json::Value;
use std::sync::Arc;

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients the frame was queued for
    pub delivered: usize,
    /// Recipients skipped because they were closed or full
    pub dropped: usize,
}

/// Routes server messages to recipient sets drawn from the session store
pub struct BroadcastRouter {
    store: Arc<SessionStore>,
    overflow_policy: OverflowPolicy,
}

impl BroadcastRouter {
    /// Create a new router
    #[must_use]
    pub fn new(store: Arc<SessionStore>, overflow_policy: OverflowPolicy) -> Self {
        Self {
            store,
            overflow_policy,
        }
    }

    /// Queue `message` on every connection in `recipients`
    pub fn send(&self, recipients: &[Arc<Connection>], message: &ServerMessage) -> DeliveryReport {
        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(kind = message.kind(), error = %e, "Failed to serialize message");
                return DeliveryReport {
                    delivered: 0,
                    dropped: recipients.len(),
                };
            }
        };

        let mut report = DeliveryReport::default();
        for connection in recipients {
            if self.deliver(connection, frame.clone(), message) {
                report.delivered += 1;
            } else {
                report.dropped += 1;
            }
        }

        tracing::trace!(
            kind = message.kind(),
            delivered = report.delivered,
            dropped = report.dropped,
            "Message routed"
        );

        report
    }

    /// Queue `message` on a single connection
    pub fn send_to(&self, connection: &Arc<Connection>, message: &ServerMessage) -> bool {
        self.send(std::slice::from_ref(connection), message).delivered == 1
    }

    fn deliver(&self, connection: &Connection, frame: Frame, message: &ServerMessage) -> bool {
        let kind = message.kind();
        match connection.try_send(frame) {
            Ok(()) => true,
            Err(SendError::Closed) => {
                tracing::debug!(
                    session_id = %connection.session_id(),
                    kind,
                    "Recipient closed, skipping"
                );
                false
            }
            Err(SendError::Full)
                if self.overflow_policy == OverflowPolicy::DropNewest && message.is_droppable() =>
            {
                tracing::warn!(
                    session_id = %connection.session_id(),
                    kind,
                    "Outbound queue full, dropping message"
                );
                false
            }
            Err(SendError::Full) => {
                tracing::warn!(
                    session_id = %connection.session_id(),
                    kind,
                    "Outbound queue full, disconnecting slow consumer"
                );
                connection.evict();
                false
            }
        }
    }

    /// Tell `peers` that `player` joined
    ///
    /// `peers` must be the sessions captured at registration, so that a session
    /// which already saw the joiner in its `world_state` is not told twice.
    pub fn announce_join(&self, peers: &[Arc<Connection>], player: PlayerState) -> DeliveryReport {
        self.send(peers, &ServerMessage::player_joined(player))
    }

    /// Tell every remaining session that `session_id` left
    ///
    /// Call after the session has been removed from the store.
    pub fn announce_leave(&self, session_id: &SessionId) -> DeliveryReport {
        let recipients = self.store.all_excluding(session_id);
        self.send(&recipients, &ServerMessage::player_left(session_id.clone()))
    }

    /// Relay a partial update to everyone but its sender
    pub fn relay_player_state(&self, session_id: &SessionId, partial: PartialState) -> DeliveryReport {
        let recipients = self.store.all_excluding(session_id);
        self.send(
            &recipients,
            &ServerMessage::player_state(session_id.clone(), partial),
        )
    }

    /// Relay an environment event to everyone but its sender
    pub fn relay_environment(&self, session_id: &SessionId, target: Value, state: Value) -> DeliveryReport {
        let recipients = self.store.all_excluding(session_id);
        self.send(&recipients, &ServerMessage::environment_update(target, state))
    }

    /// Relay a chat line to every session, its author included
    pub fn relay_chat(&self, session_id: &SessionId, message: Value) -> DeliveryReport {
        let recipients = self.store.all();
        self.send(&recipients, &ServerMessage::chat(session_id.clone(), message))
    }
}

impl std::fmt::Debug for BroadcastRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BroadcastRouter")
            .field("overflow_policy", &self.overflow_policy)
            .field("sessions", &self.store.len())
            .finish()
    }
}

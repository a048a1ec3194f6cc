//! Server message format
//!
//! Defines every message the gateway sends to clients. Messages are JSON objects
//! discriminated by a `type` field; field names are camelCase on the wire.

use relay_core::{PartialState, PlayerState, SessionId};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A serialized message, shared by every recipient of one broadcast
pub type Frame = Arc<str>;

/// Server → client messages
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// First message on a new connection: the id assigned to it
    PlayerId { player_id: SessionId },

    /// Second message on a new connection: every other session's stored state
    WorldState {
        player_id: SessionId,
        players: HashMap<SessionId, PlayerState>,
    },

    /// Another participant connected; carries its default state
    PlayerJoined { player: PlayerState },

    /// Another participant's partial update, exactly as it sent it
    #[serde(rename = "player_state")]
    PlayerStateUpdate {
        player_id: SessionId,
        state: PartialState,
    },

    /// Environment event relayed verbatim
    EnvironmentUpdate { target: Value, state: Value },

    /// Chat line, delivered to everyone including its author
    Chat { player_id: SessionId, message: Value },

    /// A participant disconnected
    PlayerLeft { player_id: SessionId },
}

impl ServerMessage {
    #[must_use]
    pub fn player_id(player_id: SessionId) -> Self {
        Self::PlayerId { player_id }
    }

    #[must_use]
    pub fn world_state(player_id: SessionId, players: HashMap<SessionId, PlayerState>) -> Self {
        Self::WorldState { player_id, players }
    }

    #[must_use]
    pub fn player_joined(player: PlayerState) -> Self {
        Self::PlayerJoined { player }
    }

    #[must_use]
    pub fn player_state(player_id: SessionId, state: PartialState) -> Self {
        Self::PlayerStateUpdate { player_id, state }
    }

    #[must_use]
    pub fn environment_update(target: Value, state: Value) -> Self {
        Self::EnvironmentUpdate { target, state }
    }

    #[must_use]
    pub fn chat(player_id: SessionId, message: Value) -> Self {
        Self::Chat { player_id, message }
    }

    #[must_use]
    pub fn player_left(player_id: SessionId) -> Self {
        Self::PlayerLeft { player_id }
    }

    /// The wire `type` tag, for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PlayerId { .. } => "player_id",
            Self::WorldState { .. } => "world_state",
            Self::PlayerJoined { .. } => "player_joined",
            Self::PlayerStateUpdate { .. } => "player_state",
            Self::EnvironmentUpdate { .. } => "environment_update",
            Self::Chat { .. } => "chat",
            Self::PlayerLeft { .. } => "player_left",
        }
    }

    /// Whether a recipient with a full queue may skip this message
    ///
    /// A skipped state update is superseded by the sender's next one. Losing a
    /// join, a leave or a chat line would leave the recipient out of sync.
    #[must_use]
    pub const fn is_droppable(&self) -> bool {
        matches!(self, Self::PlayerStateUpdate { .. } | Self::EnvironmentUpdate { .. })
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize into a shareable frame
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        self.to_json().map(Frame::from)
    }
}

//! Client payload definitions
//!
//! Parses client → server messages. Parsing is lenient about the parts the
//! relay forwards verbatim (`target`, `state` of environment updates, chat
//! `message`) and strict only where the server interprets the payload.

use relay_core::{DomainError, PartialState};
use serde_json::{Map, Value};
use thiserror::Error;

/// Client → server messages
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// `{type: "player_update", state}`
    PlayerUpdate { state: PartialState },

    /// `{type: "environment_update", target, state}`
    EnvironmentUpdate { target: Value, state: Value },

    /// `{type: "chat", message}`
    Chat { message: Value },

    /// Missing or unrecognized `type`; deliberately ignored
    Ignored { kind: Option<String> },
}

impl ClientMessage {
    /// Parse one text frame
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(fields) = value else {
            return Err(ProtocolError::NotAnObject);
        };
        Self::from_fields(fields)
    }

    fn from_fields(mut fields: Map<String, Value>) -> Result<Self, ProtocolError> {
        let kind = match fields.remove("type") {
            Some(Value::String(kind)) => kind,
            _ => return Ok(Self::Ignored { kind: None }),
        };

        match kind.as_str() {
            "player_update" => {
                let state = fields.remove("state").ok_or(ProtocolError::MissingField {
                    kind: "player_update",
                    field: "state",
                })?;
                let state = PartialState::try_from(state).map_err(|source| {
                    ProtocolError::InvalidPayload {
                        kind: "player_update",
                        source,
                    }
                })?;
                Ok(Self::PlayerUpdate { state })
            }
            "environment_update" => Ok(Self::EnvironmentUpdate {
                target: fields.remove("target").unwrap_or(Value::Null),
                state: fields.remove("state").unwrap_or(Value::Null),
            }),
            "chat" => Ok(Self::Chat {
                message: fields.remove("message").unwrap_or(Value::Null),
            }),
            _ => Ok(Self::Ignored { kind: Some(kind) }),
        }
    }

    /// The message kind, for logs
    pub fn kind(&self) -> &str {
        match self {
            Self::PlayerUpdate { .. } => "player_update",
            Self::EnvironmentUpdate { .. } => "environment_update",
            Self::Chat { .. } => "chat",
            Self::Ignored { kind } => kind.as_deref().unwrap_or("<none>"),
        }
    }
}

/// Errors raised while parsing a client frame
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("{kind} is missing field `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },

    #[error("Invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: &'static str,
        #[source]
        source: DomainError,
    },
}

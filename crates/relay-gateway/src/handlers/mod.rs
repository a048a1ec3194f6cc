//! Client message handlers
//!
//! Routes each parsed client message to the handler for its `type`.

mod chat;
mod environment;
mod error;
mod player;

pub use chat::ChatHandler;
pub use environment::EnvironmentHandler;
pub use error::{HandlerError, HandlerResult};
pub use player::PlayerUpdateHandler;

use crate::connection::Connection;
use crate::protocol::ClientMessage;
use crate::server::GatewayState;
use std::sync::Arc;

/// Dispatch incoming client messages to appropriate handlers
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one raw text frame
    pub fn dispatch_text(
        state: &GatewayState,
        connection: &Arc<Connection>,
        text: &str,
    ) -> HandlerResult<()> {
        let message = ClientMessage::parse(text)?;
        Self::dispatch(state, connection, message)
    }

    /// Handle an incoming client message
    pub fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: ClientMessage,
    ) -> HandlerResult<()> {
        tracing::trace!(
            session_id = %connection.session_id(),
            kind = message.kind(),
            "Dispatching client message"
        );

        match message {
            ClientMessage::PlayerUpdate { state: partial } => {
                PlayerUpdateHandler::handle(state, connection, partial)
            }
            ClientMessage::EnvironmentUpdate {
                target,
                state: env_state,
            } => EnvironmentHandler::handle(state, connection, target, env_state),
            ClientMessage::Chat { message } => ChatHandler::handle(state, connection, message),
            ClientMessage::Ignored { kind } => {
                tracing::debug!(
                    session_id = %connection.session_id(),
                    kind = kind.as_deref().unwrap_or("<none>"),
                    "Ignoring message of unknown type"
                );
                Ok(())
            }
        }
    }
}

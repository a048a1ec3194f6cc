//! Chat handler

use super::HandlerResult;
use crate::connection::Connection;
use crate::server::GatewayState;
use serde_json::Value;
use std::sync::Arc;

/// Handles `chat` messages
pub struct ChatHandler;

impl ChatHandler {
    /// Relay a chat line to every participant, its author included
    pub fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: Value,
    ) -> HandlerResult<()> {
        let report = state.router().relay_chat(connection.session_id(), message);

        tracing::debug!(
            session_id = %connection.session_id(),
            delivered = report.delivered,
            "Chat relayed"
        );

        Ok(())
    }
}

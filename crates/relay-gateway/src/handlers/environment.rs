//! Environment update handler

use super::HandlerResult;
use crate::connection::Connection;
use crate::server::GatewayState;
use serde_json::Value;
use std::sync::Arc;

/// Handles `environment_update` messages
///
/// The server keeps no environment state; events are relayed untouched.
pub struct EnvironmentHandler;

impl EnvironmentHandler {
    pub fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        target: Value,
        env_state: Value,
    ) -> HandlerResult<()> {
        let report = state
            .router()
            .relay_environment(connection.session_id(), target, env_state);

        tracing::trace!(
            session_id = %connection.session_id(),
            delivered = report.delivered,
            "Environment update relayed"
        );

        Ok(())
    }
}

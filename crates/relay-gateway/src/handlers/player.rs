//! Player update handler

use super::HandlerResult;
use crate::connection::Connection;
use crate::server::GatewayState;
use relay_core::{merge, PartialState};
use std::sync::Arc;

/// Handles `player_update` messages
pub struct PlayerUpdateHandler;

impl PlayerUpdateHandler {
    /// Merge the partial into the stored state, then relay the partial as sent
    pub fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        partial: PartialState,
    ) -> HandlerResult<()> {
        let session_id = connection.session_id();

        state
            .store()
            .update_state(session_id, |current| merge(current, &partial, session_id))?;

        let report = state.router().relay_player_state(session_id, partial);

        tracing::trace!(
            session_id = %session_id,
            delivered = report.delivered,
            "Player state relayed"
        );

        Ok(())
    }
}

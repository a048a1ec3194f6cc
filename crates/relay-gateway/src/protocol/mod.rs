//! Relay protocol definitions
//!
//! Defines the JSON messages exchanged over the WebSocket connection.

mod messages;
mod payloads;

pub use messages::{Frame, ServerMessage};
pub use payloads::{ClientMessage, ProtocolError};

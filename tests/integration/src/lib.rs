//! Integration test utilities for the relay server
//!
//! Spawns the real gateway on an ephemeral port and drives it with WebSocket
//! and HTTP clients.

pub mod helpers;

pub use fixtures::*;
pub use helpers::*;

//! # relay-gateway
//!
//! WebSocket relay for realtime multiplayer state. Each participant holds one
//! connection; the gateway keeps every participant's latest state and relays
//! updates, chat, and environment events to the others.

pub mod broadcast;
pub mod connection;
pub mod handlers;
pub mod protocol;
pub mod server;

pub use server::{create_app, create_router, run, run_server, GatewayState};

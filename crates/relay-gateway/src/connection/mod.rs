//! Connection management
//!
//! Per-connection outbound handles and the session store that owns them.

mod connection;
mod store;

pub use connection::{Connection, ConnectionState, SendError};
pub use store::{Registration, SessionStore};

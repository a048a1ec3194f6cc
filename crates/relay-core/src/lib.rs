//! # relay-core
//!
//! Domain layer for the state relay: session identifiers, player state, and the
//! partial-update merge. This crate has no I/O and no dependency on the transport.

pub mod entities;
pub mod error;
pub mod state;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{PartialState, PlayerState, DEFAULT_ANIMATION, DEFAULT_BALLOON_COLORS};
pub use error::DomainError;
pub use state::merge;
pub use value_objects::{SessionId, SessionIdParseError};

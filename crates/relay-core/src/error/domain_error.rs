//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::SessionId;

/// Domain layer errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// The session was removed (usually by a concurrent disconnect)
    #[error("Session not found: {0}")]
    SessionNotFound(SessionId),

    /// A state payload was not a JSON object
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl DomainError {
    /// Get an error code string for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound(_) => "UNKNOWN_SESSION",
            Self::InvalidState(_) => "INVALID_STATE",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::SessionNotFound(_))
    }
}

//! Handler error types

use crate::protocol::ProtocolError;
use relay_core::DomainError;
use thiserror::Error;

/// Handler error type
///
/// None of these end the connection: the offending message is logged and
/// skipped, and the connection keeps processing.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The frame could not be parsed
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The session or its state was rejected
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl HandlerError {
    /// Get an error code string for logs
    pub fn code(&self) -> &'static str {
        match self {
            Self::Protocol(ProtocolError::InvalidJson(_) | ProtocolError::NotAnObject) => {
                "DECODE_ERROR"
            }
            Self::Protocol(_) => "INVALID_PAYLOAD",
            Self::Domain(e) => e.code(),
        }
    }

    /// A session that vanished mid-message; expected during disconnects
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_not_found())
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;

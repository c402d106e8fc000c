//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Handler creation error
    #[error("failed to create handler '{name}': {message}")]
    HandlerCreation { name: String, message: String },

    /// Configuration error (from contract)
    #[error("config error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a handler creation error
    pub fn handler_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HandlerCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by transport clients
#[derive(Debug, Error)]
pub enum TransportError {
    /// The backend refused the message
    #[error("'{target}' rejected message: {message}")]
    Rejected { target: String, message: String },

    /// Message does not fit in one datagram
    #[error("packet too large: {size} bytes, max {max}")]
    PacketTooLarge { size: usize, max: usize },

    /// Envelope serialization failed
    #[error("envelope encode error: {0}")]
    Encode(String),

    /// Socket / IO failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Create a rejection error
    pub fn rejected(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected {
            target: target.into(),
            message: message.into(),
        }
    }
}

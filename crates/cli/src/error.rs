//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// `--data` is not valid JSON
    #[error("Invalid event payload: {message}")]
    InvalidData { message: String },

    /// Some publishes failed
    #[error("{failed} of {total} publishes failed")]
    PublishFailed { failed: u64, total: u64 },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    pub fn publish_failed(failed: u64, total: u64) -> Self {
        Self::PublishFailed { failed, total }
    }
}

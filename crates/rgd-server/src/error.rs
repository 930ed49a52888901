//! Error types for the language service

use thiserror::Error;

/// Server errors
#[derive(Debug, Error)]
pub enum ServerError {
    // ============ Configuration Errors ============
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to parse configuration file {path}: {message}")]
    ConfigParse { path: String, message: String },

    // ============ Schema Errors ============
    #[error(transparent)]
    Crd(#[from] rgd_crd::CrdError),

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

impl ServerError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        ServerError::InvalidConfig {
            message: message.into(),
        }
    }
}

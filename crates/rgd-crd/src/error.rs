//! Error types for schema sources

use thiserror::Error;

/// Schema loading errors
#[derive(Debug, Error)]
pub enum CrdError {
    // ============ Configuration Errors ============
    #[error("Invalid source configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    // ============ Network Errors ============
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Network error: {message}")]
    NetworkError { message: String },

    #[error("Request timeout")]
    Timeout,

    // ============ Document Errors ============
    #[error("Invalid CRD: {message}")]
    InvalidCrd { message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ============ IO Errors ============
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============ Other ============
    #[error("{operation} is not supported by source '{source_name}'")]
    Unsupported {
        operation: String,
        source_name: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, CrdError>;

impl CrdError {
    pub(crate) fn invalid_crd(message: impl Into<String>) -> Self {
        CrdError::InvalidCrd {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for CrdError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CrdError::Timeout
        } else if e.is_connect() {
            CrdError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else if let Some(status) = e.status() {
            CrdError::HttpError {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            CrdError::NetworkError {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_yaml::Error> for CrdError {
    fn from(e: serde_yaml::Error) -> Self {
        CrdError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for CrdError {
    fn from(e: serde_json::Error) -> Self {
        CrdError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for CrdError {
    fn from(e: url::ParseError) -> Self {
        CrdError::InvalidUrl {
            url: String::new(),
            reason: e.to_string(),
        }
    }
}

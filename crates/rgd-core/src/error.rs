//! Error types for parsing and tree navigation

use thiserror::Error;

use crate::position::Position;

/// Malformed YAML input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {position}")]
pub struct ParseError {
    pub message: String,
    /// Best-known location of the problem
    pub position: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// Failure to resolve a dotted path against a tree
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("Malformed path '{path}': {reason}")]
    Malformed { path: String, reason: String },

    /// `depth` is the number of segments that did resolve
    #[error("Path segment '{segment}' not found (depth {depth})")]
    Missing { segment: String, depth: usize },
}

pub type Result<T> = std::result::Result<T, ParseError>;

//! Core types for ResourceGraphDefinition tooling
//!
//! This crate provides the building blocks shared by the validator and the
//! language server:
//!
//! - **Positions**: zero-based line/character coordinates and ranges
//! - **YAML tree**: a position-preserving syntax tree with path navigation
//! - **Diagnostics**: severity-tagged findings with a stable rule code
//! - **Expressions**: syntactic recognition of embedded `${...}` expressions

pub mod diagnostic;
pub mod error;
pub mod expr;
pub mod position;
pub mod yaml;

pub use diagnostic::{Diagnostic, Rule, SOURCE, Severity};
pub use error::{ParseError, PathError};
pub use position::{LineIndex, Position, Range};
pub use yaml::{Entry, Node, NodeId, NodeKind, NodeRef, Scalar, Segment, YamlTree};

//! Language service for ResourceGraphDefinition documents
//!
//! Everything between the editor transport and the validation engine:
//!
//! - **Documents**: the open-document table with per-document classification
//! - **Configuration**: the `kro-lsp` configuration file
//! - **Protocol**: conversion to `lsp_types` and the publishing seam
//! - **Server**: event handlers, background validation, CRD refresh wiring
//!
//! The transport itself is not part of this crate. It forwards
//! `did_open`/`did_change`/`did_save`/`did_close` to a [`Server`] and
//! implements [`DiagnosticPublisher`] to ship results back to the editor.

pub mod config;
pub mod document;
pub mod error;
pub mod protocol;
pub mod server;

pub use config::{ServerConfig, ValidationConfig};
pub use document::{Document, DocumentManager, DocumentType, NodeInfo, looks_like_rgd};
pub use error::{Result, ServerError};
pub use protocol::{DiagnosticPublisher, to_lsp_diagnostic, to_lsp_diagnostics};
pub use server::Server;

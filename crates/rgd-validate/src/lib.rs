//! ResourceGraphDefinition validation engine
//!
//! Runs a fixed pipeline of stages over a parsed [`YamlTree`]:
//!
//! 1. **Structural**: `apiVersion`, `kind`, `metadata.name`, `spec.schema`
//! 2. **Naming**: casing, reserved words and unique resource ids
//! 3. **Grammar**: the `"<type> | modifier=value"` field definitions
//! 4. **Resources**: `template` / `externalRef` shape and expressions
//! 5. **Schema**: resource templates against cached CRD schemas
//!
//! A missing `apiVersion` or `kind` stops the pipeline after the first stage.
//! Findings are returned as [`Diagnostic`] values, never as errors.
//!
//! ## Example
//!
//! ```rust
//! use rgd_core::YamlTree;
//! use rgd_validate::{ValidationMode, Validator};
//!
//! let tree = YamlTree::parse("apiVersion: kro.run/v1alpha1\n").unwrap();
//! let diagnostics = Validator::new(ValidationMode::Permissive).validate(&tree, None);
//! assert_eq!(diagnostics[0].message, "kind is required");
//! ```
//!
//! [`YamlTree`]: rgd_core::YamlTree
//! [`Diagnostic`]: rgd_core::Diagnostic

pub mod grammar;
pub mod mode;
pub mod naming;
pub mod suggestions;
pub mod validator;

mod stage;

pub use grammar::{FieldDefinition, GrammarError, Modifier, TypeExpr};
pub use mode::ValidationMode;
pub use naming::{
    RESERVED_WORDS, is_kubernetes_version, is_lower_camel_case, is_reserved_word,
    is_upper_camel_case,
};
pub use validator::{RGD_API_VERSION, RGD_GROUP, RGD_KIND, Validator, syntax_diagnostic};

//! Validation findings

use serde::{Deserialize, Serialize};

use crate::position::Range;

/// Source tag attached to every diagnostic
pub const SOURCE: &str = "kro-lsp";

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// Stable identifier of the check that produced a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    /// Malformed YAML
    Syntax,
    /// A required field is absent or empty
    RequiredField,
    /// A field holds the wrong literal value
    InvalidValue,
    /// A field holds a value of the wrong YAML type
    InvalidType,
    /// Identifier casing violation
    InvalidNaming,
    /// Identifier collides with a reserved word
    ReservedWord,
    /// Resource id declared more than once
    DuplicateId,
    /// Malformed field type expression
    InvalidFieldType,
    /// Malformed or unknown type modifier
    InvalidModifier,
    /// Resource shape violation
    InvalidResource,
    /// Malformed `${...}` expression
    InvalidExpression,
    /// No schema is registered for a resource type
    SchemaUnknown,
    /// A value violates a CRD schema constraint
    SchemaMismatch,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::RequiredField => "required-field",
            Self::InvalidValue => "invalid-value",
            Self::InvalidType => "invalid-type",
            Self::InvalidNaming => "invalid-naming",
            Self::ReservedWord => "reserved-word",
            Self::DuplicateId => "duplicate-id",
            Self::InvalidFieldType => "invalid-field-type",
            Self::InvalidModifier => "invalid-modifier",
            Self::InvalidResource => "invalid-resource",
            Self::InvalidExpression => "invalid-expression",
            Self::SchemaUnknown => "schema-unknown",
            Self::SchemaMismatch => "schema-mismatch",
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A severity-tagged message anchored to a source range
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub rule: Rule,
    pub message: String,
    pub range: Range,
    pub source: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, rule: Rule, message: impl Into<String>, range: Range) -> Self {
        Self {
            severity,
            rule,
            message: message.into(),
            range,
            source: SOURCE.to_string(),
        }
    }

    pub fn error(rule: Rule, message: impl Into<String>, range: Range) -> Self {
        Self::new(Severity::Error, rule, message, range)
    }

    pub fn warning(rule: Rule, message: impl Into<String>, range: Range) -> Self {
        Self::new(Severity::Warning, rule, message, range)
    }

    pub fn info(rule: Rule, message: impl Into<String>, range: Range) -> Self {
        Self::new(Severity::Info, rule, message, range)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} [{}]: {}",
            self.range.start, self.severity, self.rule, self.message
        )
    }
}

//! Field definition grammar
//!
//! Schema fields are declared as strings:
//!
//! ```text
//! string | required=true default="hello world"
//! []integer | minItems=1
//! map[string]Port
//! ```
//!
//! The part before the first `|` is a type expression; the rest is a
//! whitespace-separated list of `name=value` modifiers whose values may be
//! single- or double-quoted. Only syntax is checked here: a modifier that
//! makes no sense for its type (`string | minimum=5`) is accepted.

use regex::Regex;
use rgd_core::Rule;
use thiserror::Error;

use crate::suggestions::{closest, did_you_mean};

fn hint(suggestion: &Option<String>) -> String {
    did_you_mean(suggestion.as_deref())
}

/// Built-in scalar and object types
pub const BASE_TYPES: &[&str] = &["string", "integer", "boolean", "number", "object"];

/// Modifiers accepted after the `|`
pub const VALID_MODIFIERS: &[&str] = &[
    "required",
    "default",
    "description",
    "minimum",
    "maximum",
    "enum",
    "format",
    "pattern",
    "minLength",
    "maxLength",
    "minItems",
    "maxItems",
    "uniqueItems",
];

/// Malformed field definition
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GrammarError {
    // ============ Type Errors ============
    #[error("field definition cannot be empty")]
    EmptyDefinition,

    #[error("base type cannot be empty")]
    EmptyBaseType,

    #[error("array element type cannot be empty")]
    EmptyElementType,

    #[error("invalid map type syntax: {0}")]
    InvalidMap(String),

    #[error(
        "invalid type '{name}'. Valid types are: string, integer, boolean, number, object{}",
        hint(.suggestion)
    )]
    InvalidType {
        name: String,
        suggestion: Option<String>,
    },

    // ============ Modifier Errors ============
    #[error("invalid modifier syntax: {0}")]
    ModifierSyntax(String),

    #[error("unterminated quote in modifier: {0}")]
    UnterminatedQuote(String),

    #[error(
        "invalid modifier '{name}'. Valid modifiers are: {}{}",
        VALID_MODIFIERS.join(", "),
        hint(.suggestion)
    )]
    UnknownModifier {
        name: String,
        suggestion: Option<String>,
    },

    #[error("{0}")]
    InvalidModifierValue(String),
}

impl GrammarError {
    /// Diagnostic rule for this error
    pub fn rule(&self) -> Rule {
        match self {
            Self::ModifierSyntax(_)
            | Self::UnterminatedQuote(_)
            | Self::UnknownModifier { .. }
            | Self::InvalidModifierValue(_) => Rule::InvalidModifier,
            _ => Rule::InvalidFieldType,
        }
    }
}

/// Parsed type expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// One of [`BASE_TYPES`]
    Base(String),
    /// A type declared under `spec.schema.types`
    Custom(String),
    /// `[]T`
    Array(Box<TypeExpr>),
    /// `map[K]V`
    Map(Box<TypeExpr>, Box<TypeExpr>),
}

impl TypeExpr {
    /// Parse a type expression, resolving non-builtin names through `is_custom`
    pub fn parse(input: &str, is_custom: &dyn Fn(&str) -> bool) -> Result<Self, GrammarError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(GrammarError::EmptyBaseType);
        }

        if let Some(element) = input.strip_prefix("[]") {
            if element.trim().is_empty() {
                return Err(GrammarError::EmptyElementType);
            }
            return Ok(Self::Array(Box::new(Self::parse(element, is_custom)?)));
        }

        if let Some(rest) = input.strip_prefix("map[") {
            let close = matching_bracket(rest)
                .ok_or_else(|| GrammarError::InvalidMap(input.to_string()))?;
            let key = rest[..close].trim();
            let value = rest[close + 1..].trim();
            if key.is_empty() || value.is_empty() {
                return Err(GrammarError::InvalidMap(input.to_string()));
            }
            let key = Self::parse(key, is_custom)?;
            let value = Self::parse(value, is_custom)?;
            return Ok(Self::Map(Box::new(key), Box::new(value)));
        }

        if BASE_TYPES.contains(&input) {
            return Ok(Self::Base(input.to_string()));
        }
        if is_custom(input) {
            return Ok(Self::Custom(input.to_string()));
        }

        Err(GrammarError::InvalidType {
            name: input.to_string(),
            suggestion: closest(input, BASE_TYPES),
        })
    }
}

impl std::fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base(name) | Self::Custom(name) => write!(f, "{}", name),
            Self::Array(element) => write!(f, "[]{}", element),
            Self::Map(key, value) => write!(f, "map[{}]{}", key, value),
        }
    }
}

/// Byte index of the `]` closing a `map[` whose `[` was already consumed
fn matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// A `name=value` pair with quotes removed from the value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifier {
    pub name: String,
    pub value: String,
}

/// A fully parsed field definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub ty: TypeExpr,
    pub modifiers: Vec<Modifier>,
}

impl FieldDefinition {
    /// Parse and check a definition such as `integer | minimum=1 maximum=10`
    pub fn parse(input: &str, is_custom: &dyn Fn(&str) -> bool) -> Result<Self, GrammarError> {
        if input.trim().is_empty() {
            return Err(GrammarError::EmptyDefinition);
        }

        let (type_part, modifier_part) = match input.split_once('|') {
            Some((ty, mods)) => (ty, mods),
            None => (input, ""),
        };

        let ty = TypeExpr::parse(type_part, is_custom)?;

        let mut modifiers = Vec::new();
        for token in tokenize(modifier_part)? {
            let modifier = parse_modifier(&token)?;
            check_modifier(&modifier)?;
            modifiers.push(modifier);
        }

        Ok(Self { ty, modifiers })
    }

    pub fn modifier(&self, name: &str) -> Option<&str> {
        self.modifiers
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.value.as_str())
    }

    pub fn is_required(&self) -> bool {
        self.modifier("required") == Some("true")
    }
}

/// Split on whitespace outside quotes; quotes are kept in the tokens
fn tokenize(input: &str) -> Result<Vec<String>, GrammarError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                current.push(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }

    if quote.is_some() {
        return Err(GrammarError::UnterminatedQuote(current));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_modifier(token: &str) -> Result<Modifier, GrammarError> {
    let (name, value) = token
        .split_once('=')
        .ok_or_else(|| GrammarError::ModifierSyntax(token.to_string()))?;
    if name.is_empty() {
        return Err(GrammarError::ModifierSyntax(token.to_string()));
    }

    Ok(Modifier {
        name: name.to_string(),
        value: unquote(value).to_string(),
    })
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn check_modifier(modifier: &Modifier) -> Result<(), GrammarError> {
    let Modifier { name, value } = modifier;
    let invalid = |message: String| -> Result<(), GrammarError> {
        Err(GrammarError::InvalidModifierValue(message))
    };

    match name.as_str() {
        "required" => {
            if value != "true" && value != "false" {
                return invalid("required modifier must be 'true' or 'false'".to_string());
            }
        }
        "uniqueItems" => {
            if value != "true" && value != "false" {
                return invalid("uniqueItems modifier must be 'true' or 'false'".to_string());
            }
        }
        "minimum" | "maximum" => {
            if value.parse::<f64>().is_err() {
                return invalid(format!("{} modifier must be a number", name));
            }
        }
        "minLength" | "maxLength" | "minItems" | "maxItems" => {
            if value.parse::<i64>().is_err() {
                return invalid(format!("{} modifier must be an integer", name));
            }
        }
        "enum" => {
            if value.split(',').all(|v| v.trim().is_empty()) {
                return invalid("enum modifier must list at least one value".to_string());
            }
        }
        "pattern" => {
            if Regex::new(value).is_err() {
                return invalid(format!(
                    "pattern modifier '{}' is not a valid regular expression",
                    value
                ));
            }
        }
        "default" | "description" | "format" => {}
        _ => {
            return Err(GrammarError::UnknownModifier {
                name: name.clone(),
                suggestion: closest(name, VALID_MODIFIERS),
            });
        }
    }
    Ok(())
}

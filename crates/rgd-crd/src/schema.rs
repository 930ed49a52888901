//! Structured representation of CRD OpenAPI schemas
//!
//! This is a deliberate subset of OpenAPI v3 covering what the validator
//! checks: types, required fields, string/number/array constraints, nested
//! objects and the Kubernetes extensions that relax typing.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::gvk::Gvk;

/// One served version of a CRD, ready for lookup
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaRecord {
    /// Identity the record is indexed by
    pub gvk: Gvk,
    /// CRD metadata.name, e.g. `widgets.example.com`
    pub crd_name: String,
    /// Root `openAPIV3Schema`; absent when the version declares none
    pub schema: Option<SchemaProperty>,
    /// `x-kubernetes-validations` rules found anywhere in the schema
    pub cel_rules: Vec<CelRule>,
    /// Where the record came from, e.g. `local:/crds/widget.yaml`
    pub origin: String,
    pub updated_at: DateTime<Utc>,
}

impl SchemaRecord {
    /// Schema of the `spec` property if present
    pub fn spec_schema(&self) -> Option<&SchemaProperty> {
        self.schema.as_ref().and_then(|s| s.property("spec"))
    }
}

/// A CEL validation rule declared on a schema node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CelRule {
    pub rule: String,
    pub message: Option<String>,
    /// Dotted field path; `[]` marks array items, empty for the root
    pub path: String,
}

/// Schema for a single property
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaProperty {
    /// Property type
    pub type_: PropertyType,
    /// Human-readable description
    pub description: Option<String>,
    /// Format hint (e.g., "date-time", "int32")
    pub format: Option<String>,
    /// Regex pattern for strings
    pub pattern: Option<String>,
    /// Allowed values (enum)
    pub enum_values: Option<Vec<serde_json::Value>>,
    /// Minimum value for numbers
    pub minimum: Option<f64>,
    /// Maximum value for numbers
    pub maximum: Option<f64>,
    /// `minimum` itself is excluded
    pub exclusive_minimum: bool,
    /// `maximum` itself is excluded
    pub exclusive_maximum: bool,
    /// Minimum string length
    pub min_length: Option<u64>,
    /// Maximum string length
    pub max_length: Option<u64>,
    /// Minimum array items
    pub min_items: Option<u64>,
    /// Maximum array items
    pub max_items: Option<u64>,
    /// Whether null is allowed
    pub nullable: bool,
    /// Nested object properties
    pub properties: Option<BTreeMap<String, SchemaProperty>>,
    /// Required nested properties
    pub required: Vec<String>,
    /// Array item schema
    pub items: Option<Box<SchemaProperty>>,
    /// Additional properties for objects
    pub additional_properties: Option<AdditionalProperties>,
    /// Preserve unknown fields
    pub x_preserve_unknown: bool,
    /// Kubernetes embedded resource
    pub x_embedded_resource: bool,
    /// Integer or string (for ports, etc.)
    pub x_int_or_string: bool,
}

impl SchemaProperty {
    /// Nested property by name
    pub fn property(&self, name: &str) -> Option<&SchemaProperty> {
        self.properties.as_ref().and_then(|p| p.get(name))
    }

    /// Check if a nested property is required
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Whether the object accepts fields it does not declare
    pub fn allows_unknown_fields(&self) -> bool {
        if self.x_preserve_unknown || self.x_embedded_resource {
            return true;
        }
        match &self.additional_properties {
            Some(AdditionalProperties::Denied) => false,
            Some(_) => true,
            None => self.properties.is_none(),
        }
    }

    /// Schema that undeclared fields must satisfy, if any
    pub fn additional_schema(&self) -> Option<&SchemaProperty> {
        match &self.additional_properties {
            Some(AdditionalProperties::Schema(schema)) => Some(schema),
            _ => None,
        }
    }
}

/// OpenAPI property type
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PropertyType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    /// No `type` declared
    #[default]
    Any,
    /// Unrecognized type name
    Unknown(String),
}

impl PropertyType {
    /// Parse from string representation
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl std::fmt::Display for PropertyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Array => write!(f, "array"),
            Self::Object => write!(f, "object"),
            Self::Any => write!(f, "any"),
            Self::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Additional properties configuration for objects
#[derive(Debug, Clone, PartialEq)]
pub enum AdditionalProperties {
    /// Additional properties are allowed (any type)
    Allowed,
    /// Additional properties are not allowed
    Denied,
    /// Additional properties must match a schema
    Schema(Box<SchemaProperty>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_type_parse() {
        assert_eq!(PropertyType::parse("String"), PropertyType::String);
        assert_eq!(PropertyType::parse("array"), PropertyType::Array);
        assert_eq!(
            PropertyType::parse("date"),
            PropertyType::Unknown("date".into())
        );
    }

    #[test]
    fn test_allows_unknown_fields() {
        let open = SchemaProperty {
            type_: PropertyType::Object,
            ..Default::default()
        };
        assert!(open.allows_unknown_fields());

        let mut closed = open.clone();
        closed.properties = Some(BTreeMap::from([(
            "name".to_string(),
            SchemaProperty::default(),
        )]));
        assert!(!closed.allows_unknown_fields());

        closed.x_preserve_unknown = true;
        assert!(closed.allows_unknown_fields());

        let mut map = open;
        map.additional_properties = Some(AdditionalProperties::Schema(Box::default()));
        assert!(map.allows_unknown_fields());
        assert!(map.additional_schema().is_some());
    }
}

//! CRD YAML parser
//!
//! Parses CustomResourceDefinition manifests into one [`SchemaRecord`] per
//! served version.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::error::{CrdError, Result};
use crate::gvk::Gvk;
use crate::schema::{AdditionalProperties, CelRule, PropertyType, SchemaProperty, SchemaRecord};

const CRD_KIND: &str = "CustomResourceDefinition";

/// Parser for CRD YAML manifests
pub struct CrdParser;

impl CrdParser {
    /// Split multi-document YAML on `---` separator lines.
    ///
    /// Leading, trailing and repeated separators yield no empty documents.
    pub fn split_documents(content: &str) -> Vec<&str> {
        let mut docs = Vec::new();
        let mut start = 0;
        let mut offset = 0;

        for line in content.split_inclusive('\n') {
            if is_separator(line) {
                docs.push(&content[start..offset]);
                start = offset + line.len();
            }
            offset += line.len();
        }
        docs.push(&content[start..]);

        docs.into_iter()
            .filter(|doc| {
                doc.lines()
                    .any(|l| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
            })
            .collect()
    }

    /// Check if a parsed document is a CRD
    pub fn is_crd(value: &Value) -> bool {
        value.get("kind").and_then(Value::as_str) == Some(CRD_KIND)
    }

    /// Parse every CRD in a multi-document file.
    ///
    /// Documents that fail to parse or are not CRDs are skipped.
    pub fn parse_all(content: &str, origin: &str) -> Vec<SchemaRecord> {
        let mut records = Vec::new();

        for doc in Self::split_documents(content) {
            let value: Value = match serde_yaml::from_str(doc) {
                Ok(value) => value,
                Err(e) => {
                    debug!(origin, error = %e, "skipping unparseable document");
                    continue;
                }
            };
            if !Self::is_crd(&value) {
                continue;
            }
            match Self::parse_value(&value, origin) {
                Ok(mut parsed) => records.append(&mut parsed),
                Err(e) => debug!(origin, error = %e, "skipping malformed CRD"),
            }
        }

        records
    }

    /// Parse a CRD into one record per served version
    pub fn parse_value(value: &Value, origin: &str) -> Result<Vec<SchemaRecord>> {
        let kind = value
            .get("kind")
            .and_then(Value::as_str)
            .ok_or_else(|| CrdError::invalid_crd("Missing 'kind' field"))?;

        if kind != CRD_KIND {
            return Err(CrdError::invalid_crd(format!(
                "Expected {}, got {}",
                CRD_KIND, kind
            )));
        }

        let crd_name = value
            .get("metadata")
            .and_then(|m| m.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let spec = value
            .get("spec")
            .ok_or_else(|| CrdError::invalid_crd("Missing 'spec' field"))?;

        let group = spec
            .get("group")
            .and_then(Value::as_str)
            .ok_or_else(|| CrdError::invalid_crd("Missing 'spec.group' field"))?;

        let resource_kind = spec
            .get("names")
            .and_then(|n| n.get("kind"))
            .and_then(Value::as_str)
            .ok_or_else(|| CrdError::invalid_crd("Missing 'spec.names.kind' field"))?;

        let versions = spec
            .get("versions")
            .and_then(Value::as_array)
            .ok_or_else(|| CrdError::invalid_crd("Missing 'spec.versions' array"))?;

        // apiextensions v1beta1 kept a single schema for every version
        let shared_schema = spec.get("validation").and_then(|v| v.get("openAPIV3Schema"));

        let updated_at = Utc::now();
        let mut records = Vec::new();

        for version in versions {
            let name = version
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| CrdError::invalid_crd("Version missing 'name' field"))?;

            let served = version
                .get("served")
                .and_then(Value::as_bool)
                .unwrap_or(true);
            if !served {
                continue;
            }

            let raw_schema = version
                .get("schema")
                .and_then(|s| s.get("openAPIV3Schema"))
                .or(shared_schema);

            records.push(SchemaRecord {
                gvk: Gvk::new(group, name, resource_kind),
                crd_name: crd_name.clone(),
                schema: raw_schema.map(Self::parse_schema_property),
                cel_rules: raw_schema
                    .map(|s| Self::extract_cel_rules(s, ""))
                    .unwrap_or_default(),
                origin: origin.to_string(),
                updated_at,
            });
        }

        Ok(records)
    }

    /// Parse a single schema property (recursive)
    pub fn parse_schema_property(prop: &Value) -> SchemaProperty {
        let type_ = prop
            .get("type")
            .and_then(Value::as_str)
            .map(PropertyType::parse)
            .unwrap_or_default();

        let (minimum, exclusive_minimum) =
            Self::parse_bound(prop, "minimum", "exclusiveMinimum");
        let (maximum, exclusive_maximum) =
            Self::parse_bound(prop, "maximum", "exclusiveMaximum");

        let properties = prop
            .get("properties")
            .and_then(Value::as_object)
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.clone(), Self::parse_schema_property(v)))
                    .collect()
            });

        let required = prop
            .get("required")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let items = prop
            .get("items")
            .filter(|v| v.is_object())
            .map(|v| Box::new(Self::parse_schema_property(v)));

        let additional_properties = prop.get("additionalProperties").map(|v| match v {
            Value::Bool(true) => AdditionalProperties::Allowed,
            Value::Bool(false) => AdditionalProperties::Denied,
            other => AdditionalProperties::Schema(Box::new(Self::parse_schema_property(other))),
        });

        let flag = |name: &str| prop.get(name).and_then(Value::as_bool).unwrap_or(false);

        SchemaProperty {
            type_,
            description: prop
                .get("description")
                .and_then(Value::as_str)
                .map(String::from),
            format: prop.get("format").and_then(Value::as_str).map(String::from),
            pattern: prop.get("pattern").and_then(Value::as_str).map(String::from),
            enum_values: prop.get("enum").and_then(Value::as_array).cloned(),
            minimum,
            maximum,
            exclusive_minimum,
            exclusive_maximum,
            min_length: prop.get("minLength").and_then(Value::as_u64),
            max_length: prop.get("maxLength").and_then(Value::as_u64),
            min_items: prop.get("minItems").and_then(Value::as_u64),
            max_items: prop.get("maxItems").and_then(Value::as_u64),
            nullable: flag("nullable"),
            properties,
            required,
            items,
            additional_properties,
            x_preserve_unknown: flag("x-kubernetes-preserve-unknown-fields"),
            x_embedded_resource: flag("x-kubernetes-embedded-resource"),
            x_int_or_string: flag("x-kubernetes-int-or-string"),
        }
    }

    /// OpenAPI 3.0 pairs a bound with a boolean `exclusive*` flag; newer
    /// JSON Schema drafts put the exclusive bound itself in `exclusive*`.
    fn parse_bound(prop: &Value, bound: &str, exclusive: &str) -> (Option<f64>, bool) {
        let inclusive = prop.get(bound).and_then(Value::as_f64);
        match prop.get(exclusive) {
            Some(Value::Bool(flag)) => (inclusive, *flag && inclusive.is_some()),
            Some(value) => match value.as_f64() {
                Some(limit) => (Some(limit), true),
                None => (inclusive, false),
            },
            None => (inclusive, false),
        }
    }

    /// Collect `x-kubernetes-validations` rules through properties and items
    pub fn extract_cel_rules(schema: &Value, path: &str) -> Vec<CelRule> {
        let mut rules = Vec::new();

        if let Some(validations) = schema.get("x-kubernetes-validations").and_then(Value::as_array) {
            for validation in validations {
                let Some(rule) = validation.get("rule").and_then(Value::as_str) else {
                    continue;
                };
                rules.push(CelRule {
                    rule: rule.to_string(),
                    message: validation
                        .get("message")
                        .and_then(Value::as_str)
                        .map(String::from),
                    path: path.to_string(),
                });
            }
        }

        if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
            for (name, child) in properties {
                let child_path = if path.is_empty() {
                    name.clone()
                } else {
                    format!("{}.{}", path, name)
                };
                rules.extend(Self::extract_cel_rules(child, &child_path));
            }
        }

        if let Some(items) = schema.get("items").filter(|v| v.is_object()) {
            rules.extend(Self::extract_cel_rules(items, &format!("{}[]", path)));
        }

        rules
    }
}

fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    match line.strip_prefix("---") {
        Some(rest) => rest.is_empty() || rest.starts_with([' ', '\t']),
        None => false,
    }
}

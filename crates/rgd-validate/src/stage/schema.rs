//! Resource templates checked against cached CRD schemas

use regex::Regex;
use rgd_core::{NodeRef, Rule, Scalar, Segment, expr};
use rgd_crd::{Gvk, PropertyType, SchemaProperty};
use std::collections::HashMap;
use tracing::debug;

use super::{Context, Flow, key_range};
use crate::suggestions::{closest, did_you_mean};

/// Top-level template fields the schema walk leaves alone
const OBJECT_HEADER: &[&str] = &["apiVersion", "kind", "metadata"];

pub(crate) fn check(ctx: &mut Context<'_>) -> Flow {
    if !ctx.mode.schema_checks() {
        return Flow::Continue;
    }
    let Some(schemas) = ctx.schemas else {
        return Flow::Continue;
    };

    let mut patterns = PatternCache::default();
    for (_, resource) in ctx.resources() {
        if resource.get("externalRef").is_some() {
            continue;
        }
        let Some(template) = resource.get("template").filter(NodeRef::is_mapping) else {
            continue;
        };
        let (Some(api_version), Some(kind)) = (template.get("apiVersion"), template.get("kind"))
        else {
            continue;
        };
        let (Some(api), Some(kind_name)) = (api_version.as_str(), kind.as_str()) else {
            continue;
        };
        if expr::contains_expression(api) || expr::contains_expression(kind_name) {
            continue;
        }
        let Some(gvk) = Gvk::from_api_version(api, kind_name) else {
            continue;
        };

        let Some(record) = schemas.get_by_identity(&gvk) else {
            ctx.warning(
                Rule::SchemaUnknown,
                format!("no CRD schema found for {}; schema checks skipped", gvk),
                kind.range(),
            );
            continue;
        };

        let Some(root) = record.schema.as_ref() else {
            debug!(gvk = %gvk, origin = %record.origin, "schema record has no openAPIV3Schema");
            continue;
        };

        let mut walker = Walker {
            ctx: &mut *ctx,
            patterns: &mut patterns,
        };
        walker.check_object(template, root, OBJECT_HEADER);
    }

    Flow::Continue
}

/// Schema patterns compiled once per run; `None` marks one that failed to compile
#[derive(Default)]
struct PatternCache {
    compiled: HashMap<String, Option<Regex>>,
}

impl PatternCache {
    /// `None` when the pattern is unusable
    fn is_match(&mut self, pattern: &str, text: &str) -> Option<bool> {
        let re = self
            .compiled
            .entry(pattern.to_string())
            .or_insert_with(|| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    debug!(pattern = %pattern, error = %e, "skipping unusable schema pattern");
                    None
                }
            });
        re.as_ref().map(|re| re.is_match(text))
    }
}

struct Walker<'c, 'a> {
    ctx: &'c mut Context<'a>,
    patterns: &'c mut PatternCache,
}

impl Walker<'_, '_> {
    fn mismatch(&mut self, node: NodeRef<'_>, message: String) {
        self.ctx
            .error(Rule::SchemaMismatch, message, node.display_range());
    }

    fn check_value(&mut self, node: NodeRef<'_>, schema: &SchemaProperty) {
        if let Some(text) = node.as_str()
            && expr::is_dynamic(text)
        {
            return;
        }

        if node.is_null() {
            if !schema.nullable && !matches!(schema.type_, PropertyType::Any) {
                self.mismatch(node, format!("expected {}, found null", schema.type_));
            }
            return;
        }

        if schema.x_int_or_string {
            if node.as_i64().is_none() && node.as_str().is_none() {
                self.mismatch(
                    node,
                    format!("expected integer or string, found {}", node.type_name()),
                );
            }
            return;
        }

        let type_ok = match &schema.type_ {
            PropertyType::String => match node.as_str() {
                Some(text) => {
                    self.check_string(node, text, schema);
                    true
                }
                None => false,
            },
            PropertyType::Integer => match node.as_i64() {
                Some(value) => {
                    self.check_number(node, value as f64, schema);
                    true
                }
                None => false,
            },
            PropertyType::Number => match node.as_f64() {
                Some(value) => {
                    self.check_number(node, value, schema);
                    true
                }
                None => false,
            },
            PropertyType::Boolean => node.as_bool().is_some(),
            PropertyType::Array => {
                if node.is_sequence() {
                    self.check_array(node, schema);
                }
                node.is_sequence()
            }
            PropertyType::Object => {
                if node.is_mapping() {
                    self.check_object(node, schema, &[]);
                }
                node.is_mapping()
            }
            PropertyType::Any => {
                if node.is_mapping() {
                    self.check_object(node, schema, &[]);
                } else if node.is_sequence() {
                    self.check_array(node, schema);
                }
                true
            }
            PropertyType::Unknown(_) => true,
        };

        // A wrong type is reported alone
        if !type_ok {
            self.type_mismatch(node, schema);
        } else if node.is_scalar() {
            self.check_enum(node, schema);
        }
    }

    fn type_mismatch(&mut self, node: NodeRef<'_>, schema: &SchemaProperty) {
        self.mismatch(
            node,
            format!("expected {}, found {}", schema.type_, node.type_name()),
        );
    }

    fn check_string(&mut self, node: NodeRef<'_>, text: &str, schema: &SchemaProperty) {
        if let Some(pattern) = &schema.pattern
            && self.patterns.is_match(pattern, text) == Some(false)
        {
            self.mismatch(
                node,
                format!("value '{}' does not match pattern '{}'", text, pattern),
            );
        }

        let len = text.chars().count() as u64;
        if let Some(min) = schema.min_length
            && len < min
        {
            self.mismatch(
                node,
                format!("value '{}' is shorter than minLength {}", text, min),
            );
        }
        if let Some(max) = schema.max_length
            && len > max
        {
            self.mismatch(
                node,
                format!("value '{}' is longer than maxLength {}", text, max),
            );
        }
    }

    fn check_number(&mut self, node: NodeRef<'_>, value: f64, schema: &SchemaProperty) {
        let shown = node.as_scalar().map(Scalar::to_string).unwrap_or_default();

        if let Some(min) = schema.minimum {
            if schema.exclusive_minimum && value <= min {
                self.mismatch(node, format!("value {} must be greater than {}", shown, min));
            } else if value < min {
                self.mismatch(node, format!("value {} is less than minimum {}", shown, min));
            }
        }
        if let Some(max) = schema.maximum {
            if schema.exclusive_maximum && value >= max {
                self.mismatch(node, format!("value {} must be less than {}", shown, max));
            } else if value > max {
                self.mismatch(node, format!("value {} is greater than maximum {}", shown, max));
            }
        }
    }

    fn check_array(&mut self, node: NodeRef<'_>, schema: &SchemaProperty) {
        let count = node.len() as u64;
        if let Some(min) = schema.min_items
            && count < min
        {
            self.mismatch(
                node,
                format!("expected at least {} items, found {}", min, count),
            );
        }
        if let Some(max) = schema.max_items
            && count > max
        {
            self.mismatch(
                node,
                format!("expected at most {} items, found {}", max, count),
            );
        }

        if let Some(items) = &schema.items {
            for item in node.items() {
                self.check_value(item, items);
            }
        }
    }

    fn check_object(&mut self, node: NodeRef<'_>, schema: &SchemaProperty, skip: &[&str]) {
        for required in &schema.required {
            if skip.contains(&required.as_str()) || node.get(required).is_some() {
                continue;
            }
            let mut path = node.segments();
            path.push(Segment::Key(required.clone()));
            let range = self.ctx.tree.locate_segments(&path);
            self.ctx.error(
                Rule::SchemaMismatch,
                format!("missing required field '{}'", required),
                range,
            );
        }

        let declared: Vec<&str> = schema
            .properties
            .as_ref()
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default();

        for (key, value) in node.entries() {
            let name = key.key_text();
            if skip.contains(&name.as_str()) {
                continue;
            }

            if let Some(property) = schema.property(&name) {
                self.check_value(value, property);
            } else if let Some(additional) = schema.additional_schema() {
                self.check_value(value, additional);
            } else if !schema.allows_unknown_fields() && self.ctx.mode.reports_unknown_fields() {
                let hint = did_you_mean(closest(&name, &declared).as_deref());
                self.ctx.error(
                    Rule::SchemaMismatch,
                    format!("unknown field '{}'{}", name, hint),
                    key_range(value),
                );
            }
        }
    }

    fn check_enum(&mut self, node: NodeRef<'_>, schema: &SchemaProperty) {
        let Some(allowed) = &schema.enum_values else {
            return;
        };
        let Some(scalar) = node.as_scalar() else {
            return;
        };
        if allowed.iter().any(|candidate| scalar_equals(scalar, candidate)) {
            return;
        }

        let listed: Vec<String> = allowed
            .iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        self.mismatch(
            node,
            format!("value '{}' is not one of: {}", scalar, listed.join(", ")),
        );
    }
}

fn scalar_equals(scalar: &Scalar, value: &serde_json::Value) -> bool {
    use serde_json::Value;
    match (scalar, value) {
        (Scalar::String(a), Value::String(b)) => a == b,
        (Scalar::Bool(a), Value::Bool(b)) => a == b,
        (Scalar::Null, Value::Null) => true,
        (Scalar::Int(a), Value::Number(b)) => b.as_f64() == Some(*a as f64),
        (Scalar::Float(a), Value::Number(b)) => b.as_f64() == Some(*a),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ValidationMode;
    use chrono::Utc;
    use rgd_core::{Diagnostic, Range, Severity, YamlTree};
    use rgd_crd::{AdditionalProperties, SchemaLookup, SchemaRecord};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;

    fn prop(type_: PropertyType) -> SchemaProperty {
        SchemaProperty {
            type_,
            ..Default::default()
        }
    }

    fn object(fields: Vec<(&str, SchemaProperty)>, required: &[&str]) -> SchemaProperty {
        SchemaProperty {
            type_: PropertyType::Object,
            properties: Some(
                fields
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect::<BTreeMap<_, _>>(),
            ),
            required: required.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// `example.com/v1, Kind=Widget`
    fn widget_cache() -> HashMap<Gvk, Arc<SchemaRecord>> {
        let spec = object(
            vec![
                (
                    "size",
                    SchemaProperty {
                        enum_values: Some(vec!["small".into(), "large".into()]),
                        ..prop(PropertyType::String)
                    },
                ),
                (
                    "replicas",
                    SchemaProperty {
                        minimum: Some(1.0),
                        maximum: Some(5.0),
                        exclusive_maximum: true,
                        ..prop(PropertyType::Integer)
                    },
                ),
                (
                    "name",
                    SchemaProperty {
                        pattern: Some("^[a-z]+$".into()),
                        max_length: Some(8),
                        ..prop(PropertyType::String)
                    },
                ),
                (
                    "ports",
                    SchemaProperty {
                        min_items: Some(1),
                        items: Some(Box::new(SchemaProperty {
                            x_int_or_string: true,
                            ..Default::default()
                        })),
                        ..prop(PropertyType::Array)
                    },
                ),
                (
                    "labels",
                    SchemaProperty {
                        additional_properties: Some(AdditionalProperties::Schema(Box::new(
                            prop(PropertyType::String),
                        ))),
                        ..prop(PropertyType::Object)
                    },
                ),
                ("enabled", prop(PropertyType::Boolean)),
            ],
            &["size"],
        );
        let root = object(vec![("spec", spec)], &["spec"]);

        let gvk = Gvk::new("example.com", "v1", "Widget");
        let record = SchemaRecord {
            gvk: gvk.clone(),
            crd_name: "widgets.example.com".into(),
            schema: Some(root),
            cel_rules: Vec::new(),
            origin: "test".into(),
            updated_at: Utc::now(),
        };
        HashMap::from([(gvk, Arc::new(record))])
    }

    fn run(body: &str, mode: ValidationMode) -> Vec<Diagnostic> {
        run_with(widget_cache(), body, mode)
    }

    fn run_with(
        cache: HashMap<Gvk, Arc<SchemaRecord>>,
        body: &str,
        mode: ValidationMode,
    ) -> Vec<Diagnostic> {
        let text = format!(
            "apiVersion: kro.run/v1alpha1\nkind: ResourceGraphDefinition\nmetadata:\n  name: app\nspec:\n  resources:\n    - id: widget\n      template:\n        apiVersion: example.com/v1\n        kind: Widget\n        metadata:\n          name: w\n{}\n",
            body
        );
        let tree = YamlTree::parse(&text).unwrap();
        let lookup: &dyn SchemaLookup = &cache;
        let mut ctx = Context::new(&tree, Some(lookup), mode);
        check(&mut ctx);
        ctx.diagnostics
    }

    fn messages(diags: &[Diagnostic]) -> Vec<&str> {
        diags.iter().map(|d| d.message.as_str()).collect()
    }

    #[test]
    fn test_valid_template() {
        let diags = run(
            "        spec:\n          size: small\n          replicas: 4\n          name: web\n          ports: [80, http]\n          labels:\n            team: core\n          enabled: true",
            ValidationMode::Strict,
        );
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_constraint_violations() {
        let diags = run(
            "        spec:\n          size: medium\n          replicas: 5\n          name: Web-Server-01\n          ports: []\n          labels:\n            team: 7\n          enabled: \"yes\"",
            ValidationMode::Permissive,
        );
        assert_eq!(
            messages(&diags),
            [
                "value 'medium' is not one of: small, large",
                "value 5 must be less than 5",
                "value 'Web-Server-01' does not match pattern '^[a-z]+$'",
                "value 'Web-Server-01' is longer than maxLength 8",
                "expected at least 1 items, found 0",
                "expected string, found integer",
                "expected boolean, found string",
            ]
        );
        assert!(diags.iter().all(|d| d.rule == Rule::SchemaMismatch));
        assert_eq!(diags[0].range, Range::on_line(13, 16, 22));
    }

    #[test]
    fn test_required_fields() {
        let diags = run("        spec:\n          replicas: 2", ValidationMode::Permissive);
        assert_eq!(messages(&diags), ["missing required field 'size'"]);
        assert_eq!(diags[0].range, Range::on_line(14, 10, 14));

        let diags = run("", ValidationMode::Permissive);
        assert_eq!(messages(&diags), ["missing required field 'spec'"]);
    }

    #[test]
    fn test_wrong_type_is_reported_once() {
        let diags = run(
            "        spec:\n          size: 7",
            ValidationMode::Permissive,
        );
        assert_eq!(messages(&diags), ["expected string, found integer"]);
    }

    #[test]
    fn test_dotted_keys_are_single_fields() {
        let selector = object(
            vec![("app.kubernetes.io/name", prop(PropertyType::String))],
            &["app.kubernetes.io/name"],
        );
        let root = object(vec![("selector", selector)], &[]);
        let gvk = Gvk::new("example.com", "v1", "Widget");
        let record = SchemaRecord {
            gvk: gvk.clone(),
            crd_name: "widgets.example.com".into(),
            schema: Some(root),
            cel_rules: Vec::new(),
            origin: "test".into(),
            updated_at: Utc::now(),
        };
        let cache = HashMap::from([(gvk, Arc::new(record))]);

        let diags = run_with(
            cache.clone(),
            "        selector:\n          app.kubernetes.io/part-of: shop",
            ValidationMode::Permissive,
        );
        assert_eq!(
            messages(&diags),
            ["missing required field 'app.kubernetes.io/name'"]
        );
        assert_eq!(diags[0].range, Range::on_line(14, 10, 32));

        let diags = run_with(
            cache,
            "        selector:\n          app.kubernetes.io/name: 7",
            ValidationMode::Strict,
        );
        assert_eq!(messages(&diags), ["expected string, found integer"]);
        assert_eq!(diags[0].range, Range::on_line(13, 34, 35));
    }

    #[test]
    fn test_patterns_compile_once() {
        let mut patterns = PatternCache::default();
        assert_eq!(patterns.is_match("^[a-z]+$", "web"), Some(true));
        assert_eq!(patterns.is_match("^[a-z]+$", "Web"), Some(false));
        assert_eq!(patterns.is_match("([", "web"), None);
        assert_eq!(patterns.is_match("([", "api"), None);
        assert_eq!(patterns.compiled.len(), 2);
    }

    #[test]
    fn test_expressions_are_never_flagged() {
        let diags = run(
            "        spec:\n          size: ${schema.spec.size}\n          replicas: ${schema.spec.replicas}\n          name: spec.name\n          ports: ${schema.spec.ports}\n          enabled: ${schema.spec.enabled}",
            ValidationMode::Strict,
        );
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_unknown_fields_only_in_strict_mode() {
        let body = "        spec:\n          size: small\n          replica: 2";
        assert!(run(body, ValidationMode::Permissive).is_empty());

        let diags = run(body, ValidationMode::Strict);
        assert_eq!(
            messages(&diags),
            ["unknown field 'replica'; did you mean 'replicas'?"]
        );
        assert_eq!(diags[0].range, Range::on_line(14, 10, 17));
    }

    #[test]
    fn test_off_mode_skips_schema_checks() {
        let diags = run("        spec:\n          size: huge", ValidationMode::Off);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_cache_miss_is_a_warning() {
        let text = "apiVersion: kro.run/v1alpha1\nkind: ResourceGraphDefinition\nmetadata:\n  name: app\nspec:\n  resources:\n    - id: gadget\n      template:\n        apiVersion: example.com/v2\n        kind: Widget\n        metadata: {}\n        spec:\n          size: 12\n";
        let tree = YamlTree::parse(text).unwrap();
        let cache = widget_cache();
        let lookup: &dyn SchemaLookup = &cache;
        let mut ctx = Context::new(&tree, Some(lookup), ValidationMode::Strict);
        check(&mut ctx);

        assert_eq!(ctx.diagnostics.len(), 1);
        let warning = &ctx.diagnostics[0];
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.rule, Rule::SchemaUnknown);
        assert_eq!(warning.range, Range::on_line(9, 14, 20));
    }

    #[test]
    fn test_no_cache_attached() {
        let text = "apiVersion: kro.run/v1alpha1\nkind: ResourceGraphDefinition\nspec:\n  resources:\n    - id: w\n      template:\n        apiVersion: example.com/v1\n        kind: Widget\n";
        let tree = YamlTree::parse(text).unwrap();
        let mut ctx = Context::new(&tree, None, ValidationMode::Strict);
        check(&mut ctx);
        assert!(ctx.diagnostics.is_empty());
    }
}

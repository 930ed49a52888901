//! Field definitions under `spec.schema`

use rgd_core::{NodeRef, Rule, expr};

use super::{Context, Flow};
use crate::grammar::{FieldDefinition, GrammarError};

pub(crate) fn check(ctx: &mut Context<'_>) -> Flow {
    let Some(schema) = ctx.schema() else {
        return Flow::Continue;
    };

    let custom = ctx.custom_types();
    let is_custom = |name: &str| custom.contains(&name);

    if let Some(fields) = schema.get("spec") {
        check_fields(ctx, fields, &is_custom);
    }

    if let Some(types) = schema.get("types") {
        for (_, definition) in types.entries() {
            check_definition(ctx, definition, &is_custom);
        }
    }

    if let Some(status) = schema.get("status") {
        check_status(ctx, status, &is_custom);
    }

    Flow::Continue
}

fn check_fields(ctx: &mut Context<'_>, fields: NodeRef<'_>, is_custom: &dyn Fn(&str) -> bool) {
    for (_, value) in fields.entries() {
        check_definition(ctx, value, is_custom);
    }
}

/// A single field: a definition string or a nested object of fields
fn check_definition(ctx: &mut Context<'_>, value: NodeRef<'_>, is_custom: &dyn Fn(&str) -> bool) {
    if value.is_mapping() {
        check_fields(ctx, value, is_custom);
        return;
    }

    match value.as_str() {
        Some(text) if expr::contains_expression(text) => {}
        Some(text) => {
            if let Err(e) = FieldDefinition::parse(text, is_custom) {
                ctx.error(e.rule(), e.to_string(), value.display_range());
            }
        }
        None if value.is_null() => ctx.error(
            Rule::InvalidFieldType,
            GrammarError::EmptyDefinition.to_string(),
            value.display_range(),
        ),
        None => ctx.error(
            Rule::InvalidFieldType,
            "field definition must be a string or object",
            value.display_range(),
        ),
    }
}

/// Status fields are mostly `${...}` projections; anything else is a definition
fn check_status(ctx: &mut Context<'_>, status: NodeRef<'_>, is_custom: &dyn Fn(&str) -> bool) {
    for (_, value) in status.entries() {
        if value.is_mapping() {
            check_status(ctx, value, is_custom);
            continue;
        }
        match value.as_str() {
            Some(text) if expr::contains_expression(text) => {
                if expr::find_unterminated(text).is_some() {
                    ctx.error(
                        Rule::InvalidExpression,
                        "unterminated expression: missing closing '}'",
                        value.range(),
                    );
                }
            }
            _ => check_definition(ctx, value, is_custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ValidationMode;
    use rgd_core::{Diagnostic, Range, YamlTree};

    fn run(schema: &str) -> Vec<Diagnostic> {
        let text = format!(
            "apiVersion: kro.run/v1alpha1\nkind: ResourceGraphDefinition\nmetadata:\n  name: app\nspec:\n  schema:\n    apiVersion: v1alpha1\n    kind: App\n{}\n",
            schema
        );
        let tree = YamlTree::parse(&text).unwrap();
        let mut ctx = Context::new(&tree, None, ValidationMode::Permissive);
        check(&mut ctx);
        ctx.diagnostics
    }

    #[test]
    fn test_valid_definitions() {
        let diags = run(r#"    spec:
      name: string | required=true description="The app name"
      replicas: integer | default=3 minimum=1 maximum=10
      ports: "[]Port | minItems=1"
      labels: map[string]string
      ingress:
        enabled: boolean | default=false
    types:
      Port:
        port: integer
        protocol: string | enum="TCP,UDP"
    status:
      ready: ${deployment.status.readyReplicas > 0}"#);
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_minimum_on_string_is_accepted() {
        assert!(run("    spec:\n      name: string | minimum=5").is_empty());
    }

    #[test]
    fn test_invalid_type_range() {
        let diags = run("    spec:\n      name: strin");
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, Rule::InvalidFieldType);
        assert_eq!(diags[0].range, Range::on_line(9, 12, 17));
    }

    #[test]
    fn test_unknown_type_without_declaration() {
        let diags = run("    spec:\n      ports: \"[]Port\"");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.starts_with("invalid type 'Port'"));
    }

    #[test]
    fn test_modifier_errors() {
        let diags = run(
            "    spec:\n      a: string | required=maybe\n      b: string | descripton=x\n      c: \"string | default='open\"",
        );
        assert_eq!(diags.len(), 3);
        assert!(diags.iter().all(|d| d.rule == Rule::InvalidModifier));
        assert!(diags[1].message.contains("did you mean 'description'?"));
    }

    #[test]
    fn test_non_string_definitions() {
        let diags = run("    spec:\n      a: 42\n      b:");
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "field definition must be a string or object",
                "field definition cannot be empty"
            ]
        );
        assert_eq!(diags[1].range, Range::on_line(10, 6, 7));
    }

    #[test]
    fn test_status_expressions() {
        let diags = run(
            "    status:\n      url: ${service.status.loadBalancer\n      count: integer\n      bad: nonsense",
        );
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "unterminated expression: missing closing '}'");
        assert!(messages[1].starts_with("invalid type 'nonsense'"));
    }
}

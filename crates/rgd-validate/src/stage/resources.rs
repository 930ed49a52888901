//! Shape of each `spec.resources[]` entry

use rgd_core::{NodeRef, Range, Rule, expr};

use super::{Context, Flow, key_range, string_scalars};

const CONDITION_FIELDS: &[&str] = &["readyWhen", "includeWhen"];

pub(crate) fn check(ctx: &mut Context<'_>) -> Flow {
    for (idx, resource) in ctx.resources() {
        let path = format!("spec.resources[{}]", idx);
        let template = resource.get_entry("template");
        let external = resource.get_entry("externalRef");

        match (template, external) {
            (Some(_), Some((external_key, _))) => ctx.error(
                Rule::InvalidResource,
                "resource cannot have both 'template' and 'externalRef'; they are mutually exclusive",
                external_key.range(),
            ),
            (None, None) => ctx.error(
                Rule::InvalidResource,
                "resource must have either 'template' or 'externalRef'",
                id_range(resource),
            ),
            (Some((_, template)), None) => check_template(ctx, template, &path),
            (None, Some((_, external))) => check_external_ref(ctx, external, &path),
        }

        for field in CONDITION_FIELDS {
            if let Some(conditions) = resource.get(field) {
                check_conditions(ctx, field, conditions);
            }
        }

        check_unterminated(ctx, resource);
    }

    Flow::Continue
}

fn id_range(resource: NodeRef<'_>) -> Range {
    match resource.get_entry("id") {
        Some((key, value)) if !value.is_null() => Range::new(key.range().start, value.range().end),
        Some((key, _)) => key.range(),
        None => key_range(resource),
    }
}

/// A template must look like a typed Kubernetes object
fn check_template(ctx: &mut Context<'_>, template: NodeRef<'_>, path: &str) {
    if !template.is_mapping() {
        ctx.error(
            Rule::InvalidResource,
            "invalid Kubernetes object: template must be an object",
            template.display_range(),
        );
        return;
    }

    for field in ["apiVersion", "kind"] {
        match template.get(field) {
            Some(value) if value.as_str().is_some_and(|s| !s.is_empty()) => {}
            Some(value) if !value.is_null() && value.as_str().is_none() => ctx.error(
                Rule::InvalidResource,
                format!("invalid Kubernetes object: {} must be a string", field),
                value.display_range(),
            ),
            _ => ctx.error_at(
                Rule::InvalidResource,
                format!("invalid Kubernetes object: {} field is required", field),
                &format!("{}.template.{}", path, field),
            ),
        }
    }

    match template.get("metadata") {
        Some(metadata) if metadata.is_mapping() => {}
        Some(metadata) if !metadata.is_null() => ctx.error(
            Rule::InvalidResource,
            "invalid Kubernetes object: metadata must be an object",
            metadata.display_range(),
        ),
        _ => ctx.error_at(
            Rule::InvalidResource,
            "invalid Kubernetes object: metadata field is required",
            &format!("{}.template.metadata", path),
        ),
    }
}

fn check_external_ref(ctx: &mut Context<'_>, external: NodeRef<'_>, path: &str) {
    if !external.is_mapping() {
        ctx.error(
            Rule::InvalidResource,
            "externalRef must be an object",
            external.display_range(),
        );
        return;
    }

    for field in ["apiVersion", "kind", "metadata.name"] {
        let present = external
            .find(field)
            .and_then(|n| n.as_str())
            .is_some_and(|s| !s.is_empty());
        if !present {
            ctx.error_at(
                Rule::RequiredField,
                format!("externalRef.{} is required", field),
                &format!("{}.externalRef.{}", path, field),
            );
        }
    }
}

/// `readyWhen` / `includeWhen`: a list of `${...}` strings
fn check_conditions(ctx: &mut Context<'_>, field: &str, conditions: NodeRef<'_>) {
    if !conditions.is_sequence() {
        ctx.error(
            Rule::InvalidType,
            format!("{} must be a list of expressions", field),
            conditions.display_range(),
        );
        return;
    }

    for condition in conditions.items() {
        match condition.as_str() {
            Some(text) if expr::is_standalone_expression(text) => {}
            Some(text) if expr::find_unterminated(text).is_some() => {}
            _ => ctx.error(
                Rule::InvalidExpression,
                format!("{} entries must be expressions wrapped in ${{...}}", field),
                condition.display_range(),
            ),
        }
    }
}

/// Every `${` in the resource must be closed
fn check_unterminated(ctx: &mut Context<'_>, resource: NodeRef<'_>) {
    let mut strings = Vec::new();
    string_scalars(resource, &mut strings);

    for (node, text) in strings {
        if let Some(offset) = expr::find_unterminated(text) {
            ctx.error(
                Rule::InvalidExpression,
                "unterminated expression: missing closing '}'",
                expression_range(node, offset),
            );
        }
    }
}

/// From the opening `${` to the end of a single-line plain scalar, else the whole value
fn expression_range(node: NodeRef<'_>, offset: usize) -> Range {
    let range = node.range();
    let text = node.as_str().unwrap_or_default();
    let single_plain_line = range.start.line == range.end.line
        && range.end.character.checked_sub(range.start.character)
            == Some(text.chars().count() as u32);

    if single_plain_line {
        let start = range.start.character + offset as u32;
        Range::on_line(range.start.line, start, range.end.character)
    } else {
        range
    }
}

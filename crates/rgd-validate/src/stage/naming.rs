//! Identifier casing, reserved words and unique resource ids

use rgd_core::{NodeRef, Rule};
use std::collections::HashSet;

use super::{Context, Flow};
use crate::naming::{
    is_kubernetes_version, is_lower_camel_case, is_reserved_word, is_upper_camel_case,
};

pub(crate) fn check(ctx: &mut Context<'_>) -> Flow {
    if let Some(schema) = ctx.schema() {
        check_schema_kind(ctx, schema);
        check_schema_version(ctx, schema);

        for section in ["spec", "status"] {
            if let Some(fields) = schema.get(section) {
                check_field_names(ctx, fields);
            }
        }
        if let Some(types) = schema.get("types") {
            for (_, fields) in types.entries() {
                check_field_names(ctx, fields);
            }
        }
    }

    check_resource_ids(ctx);
    Flow::Continue
}

fn check_schema_kind(ctx: &mut Context<'_>, schema: NodeRef<'_>) {
    let kind = match schema.get("kind") {
        Some(kind) => kind,
        None => {
            ctx.error_at(
                Rule::RequiredField,
                "spec.schema.kind is required",
                "spec.schema.kind",
            );
            return;
        }
    };

    match kind.as_str() {
        None if !kind.is_null() => ctx.error(
            Rule::InvalidType,
            "spec.schema.kind must be a string",
            kind.display_range(),
        ),
        None | Some("") => ctx.error(
            Rule::RequiredField,
            "spec.schema.kind is required",
            kind.display_range(),
        ),
        Some(name) if !is_upper_camel_case(name) => ctx.error(
            Rule::InvalidNaming,
            format!("spec.schema.kind '{}' must be UpperCamelCase", name),
            kind.range(),
        ),
        Some(name) if is_reserved_word(name) => ctx.error(
            Rule::ReservedWord,
            format!("spec.schema.kind '{}' is a reserved word", name),
            kind.range(),
        ),
        Some(_) => {}
    }
}

fn check_schema_version(ctx: &mut Context<'_>, schema: NodeRef<'_>) {
    let version = match schema.get("apiVersion") {
        Some(version) => version,
        None => {
            ctx.error_at(
                Rule::RequiredField,
                "spec.schema.apiVersion is required",
                "spec.schema.apiVersion",
            );
            return;
        }
    };

    match version.as_str() {
        None if !version.is_null() => ctx.error(
            Rule::InvalidType,
            "spec.schema.apiVersion must be a string",
            version.display_range(),
        ),
        None | Some("") => ctx.error(
            Rule::RequiredField,
            "spec.schema.apiVersion is required",
            version.display_range(),
        ),
        Some(v) if !is_kubernetes_version(v) => ctx.error(
            Rule::InvalidValue,
            format!("spec.schema.apiVersion '{}' is not a valid Kubernetes version", v),
            version.range(),
        ),
        Some(_) => {}
    }
}

/// Keys of a field mapping, recursing into nested objects
fn check_field_names(ctx: &mut Context<'_>, fields: NodeRef<'_>) {
    for (key, value) in fields.entries() {
        let name = key.key_text();
        if !is_lower_camel_case(&name) {
            ctx.error(
                Rule::InvalidNaming,
                format!("field name '{}' must be lowerCamelCase", name),
                key.range(),
            );
        } else if is_reserved_word(&name) {
            ctx.error(
                Rule::ReservedWord,
                format!("field name '{}' is a reserved word", name),
                key.range(),
            );
        }

        if value.is_mapping() {
            check_field_names(ctx, value);
        }
    }
}

fn check_resource_ids(ctx: &mut Context<'_>) {
    let mut seen: HashSet<&str> = HashSet::new();

    for (idx, resource) in ctx.resources() {
        let id = match resource.get("id") {
            Some(id) => id,
            None => {
                ctx.error(
                    Rule::RequiredField,
                    "resource id is required",
                    resource_range(resource),
                );
                continue;
            }
        };

        let Some(name) = id.as_str().filter(|s| !s.is_empty()) else {
            let (rule, message) = if id.is_null() || id.as_str().is_some() {
                (Rule::RequiredField, "resource id is required")
            } else {
                (Rule::InvalidType, "resource id must be a string")
            };
            ctx.error(rule, message, id.display_range());
            continue;
        };

        if !is_lower_camel_case(name) {
            ctx.error(
                Rule::InvalidNaming,
                format!("resource id '{}' must be lowerCamelCase", name),
                id.range(),
            );
        } else if is_reserved_word(name) {
            ctx.error(
                Rule::ReservedWord,
                format!("resource id '{}' is a reserved word", name),
                id.range(),
            );
        }

        if !seen.insert(name) {
            ctx.error(
                Rule::DuplicateId,
                format!("duplicate resource id '{}'", name),
                id.range(),
            );
        }

        tracing::trace!(index = idx, id = name, "resource id checked");
    }
}

/// First line of a resource item, where its `id` would go
fn resource_range(resource: NodeRef<'_>) -> rgd_core::Range {
    match resource.entries().next() {
        Some((key, _)) => key.range(),
        None => resource.display_range(),
    }
}

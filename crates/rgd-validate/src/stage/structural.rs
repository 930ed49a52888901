//! Top-level document skeleton

use rgd_core::{NodeRef, Rule};

use super::{Context, Flow};
use crate::validator::{RGD_API_VERSION, RGD_KIND};

pub(crate) fn check(ctx: &mut Context<'_>) -> Flow {
    let root = ctx.tree.root();

    if !root.is_mapping() && !root.is_null() {
        ctx.error(
            Rule::InvalidType,
            "document must be a mapping",
            root.display_range(),
        );
        return Flow::Halt;
    }

    let api_version = non_empty(root.get("apiVersion"));
    let kind = non_empty(root.get("kind"));

    if api_version.is_none() {
        ctx.error_at(Rule::RequiredField, "apiVersion is required", "apiVersion");
    }
    if kind.is_none() {
        ctx.error_at(Rule::RequiredField, "kind is required", "kind");
    }
    let (Some(api_version), Some(kind)) = (api_version, kind) else {
        return Flow::Halt;
    };

    if api_version.as_str() != Some(RGD_API_VERSION) {
        ctx.error(
            Rule::InvalidValue,
            format!("apiVersion must be '{}'", RGD_API_VERSION),
            api_version.display_range(),
        );
    }
    if kind.as_str() != Some(RGD_KIND) {
        ctx.error(
            Rule::InvalidValue,
            format!("kind must be '{}'", RGD_KIND),
            kind.display_range(),
        );
    }

    check_metadata(ctx, root);
    check_spec(ctx, root);

    Flow::Continue
}

/// A present value that is not null or an empty string
fn non_empty(node: Option<NodeRef<'_>>) -> Option<NodeRef<'_>> {
    node.filter(|n| !n.is_null() && n.as_str() != Some(""))
}

fn check_metadata(ctx: &mut Context<'_>, root: NodeRef<'_>) {
    let metadata = match root.get("metadata") {
        Some(m) if !m.is_null() => m,
        _ => {
            ctx.error_at(
                Rule::RequiredField,
                "metadata must have 'name' field",
                "metadata.name",
            );
            return;
        }
    };

    if !metadata.is_mapping() {
        ctx.error(
            Rule::InvalidType,
            "metadata must be an object",
            metadata.display_range(),
        );
        return;
    }

    match metadata.get("name") {
        None => ctx.error_at(
            Rule::RequiredField,
            "metadata must have 'name' field",
            "metadata.name",
        ),
        Some(name) if name.is_null() || name.as_str() == Some("") => ctx.error(
            Rule::RequiredField,
            "metadata.name cannot be empty",
            name.display_range(),
        ),
        Some(name) if name.as_str().is_none() => ctx.error(
            Rule::InvalidType,
            "metadata.name must be a string",
            name.display_range(),
        ),
        Some(_) => {}
    }
}

fn check_spec(ctx: &mut Context<'_>, root: NodeRef<'_>) {
    let spec = match root.get("spec") {
        Some(spec) if !spec.is_null() => spec,
        _ => {
            ctx.error_at(Rule::RequiredField, "spec is required", "spec");
            return;
        }
    };

    if !spec.is_mapping() {
        ctx.error(
            Rule::InvalidType,
            "spec must be an object",
            spec.display_range(),
        );
        return;
    }

    match spec.get("schema") {
        Some(schema) if schema.is_mapping() => {}
        Some(schema) if !schema.is_null() => ctx.error(
            Rule::InvalidType,
            "spec.schema must be an object",
            schema.display_range(),
        ),
        _ => ctx.error_at(Rule::RequiredField, "spec.schema is required", "spec.schema"),
    }

    if let Some(resources) = spec.get("resources")
        && !resources.is_sequence()
        && !resources.is_null()
    {
        ctx.error(
            Rule::InvalidType,
            "spec.resources must be a list",
            resources.display_range(),
        );
    }

    for (idx, item) in spec.get("resources").into_iter().flat_map(|r| r.items()).enumerate() {
        if !item.is_mapping() {
            ctx.error(
                Rule::InvalidType,
                format!("spec.resources[{}] must be an object", idx),
                item.display_range(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ValidationMode;
    use rgd_core::{Range, YamlTree};

    fn run(text: &str) -> (Flow, Vec<rgd_core::Diagnostic>) {
        let tree = YamlTree::parse(text).unwrap();
        let mut ctx = Context::new(&tree, None, ValidationMode::Permissive);
        let flow = check(&mut ctx);
        (flow, ctx.diagnostics)
    }

    const VALID: &str = r#"apiVersion: kro.run/v1alpha1
kind: ResourceGraphDefinition
metadata:
  name: web-app
spec:
  schema:
    apiVersion: v1alpha1
    kind: WebApp
  resources: []
"#;

    #[test]
    fn test_valid_skeleton() {
        let (flow, diags) = run(VALID);
        assert_eq!(flow, Flow::Continue);
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn test_missing_kind_halts() {
        let (flow, diags) = run("apiVersion: kro.run/v1alpha1\nmetadata:\n  name: x\n");
        assert_eq!(flow, Flow::Halt);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "kind is required");
        assert_eq!(diags[0].rule, Rule::RequiredField);
    }

    #[test]
    fn test_empty_document() {
        let (flow, diags) = run("");
        assert_eq!(flow, Flow::Halt);
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["apiVersion is required", "kind is required"]);
    }

    #[test]
    fn test_wrong_values_continue() {
        let (flow, diags) = run(
            "apiVersion: kro.run/v1\nkind: Deployment\nmetadata:\n  name: x\nspec:\n  schema:\n    kind: A\n",
        );
        assert_eq!(flow, Flow::Continue);
        assert_eq!(diags[0].message, "apiVersion must be 'kro.run/v1alpha1'");
        assert_eq!(diags[0].range, Range::on_line(0, 12, 22));
        assert_eq!(diags[1].message, "kind must be 'ResourceGraphDefinition'");
    }

    #[test]
    fn test_missing_metadata_at_expected_position() {
        let (_, diags) = run(
            "apiVersion: kro.run/v1alpha1\nkind: ResourceGraphDefinition\n",
        );
        let metadata = diags
            .iter()
            .find(|d| d.message == "metadata must have 'name' field")
            .unwrap();
        assert_eq!(metadata.range, Range::on_line(2, 0, 8));
    }

    #[test]
    fn test_metadata_name_rules() {
        let (_, diags) = run(
            "apiVersion: kro.run/v1alpha1\nkind: ResourceGraphDefinition\nmetadata:\n  labels: {}\n",
        );
        let missing = diags
            .iter()
            .find(|d| d.message == "metadata must have 'name' field")
            .unwrap();
        assert_eq!(missing.range, Range::on_line(4, 2, 6));

        let (_, diags) = run(
            "apiVersion: kro.run/v1alpha1\nkind: ResourceGraphDefinition\nmetadata:\n  name: \"\"\n",
        );
        assert!(diags.iter().any(|d| d.message == "metadata.name cannot be empty"));
    }

    #[test]
    fn test_spec_shape() {
        let (_, diags) = run(
            "apiVersion: kro.run/v1alpha1\nkind: ResourceGraphDefinition\nmetadata:\n  name: x\nspec:\n  resources: nope\n",
        );
        let messages: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            ["spec.schema is required", "spec.resources must be a list"]
        );
    }
}

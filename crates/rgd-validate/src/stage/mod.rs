//! Pipeline stages and the state they share

use rgd_core::{Diagnostic, NodeRef, Range, Rule, YamlTree};
use rgd_crd::SchemaLookup;

use crate::mode::ValidationMode;

pub(crate) mod grammar;
pub(crate) mod naming;
pub(crate) mod resources;
pub(crate) mod schema;
pub(crate) mod structural;

/// Whether the pipeline may continue after a stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Halt,
}

/// A pipeline stage
pub(crate) type Stage = fn(&mut Context<'_>) -> Flow;

/// Stages in execution order
pub(crate) const STAGES: &[(&str, Stage)] = &[
    ("structural", structural::check),
    ("naming", naming::check),
    ("grammar", grammar::check),
    ("resources", resources::check),
    ("schema", schema::check),
];

/// Per-pass state handed to every stage
pub(crate) struct Context<'a> {
    pub tree: &'a YamlTree,
    pub schemas: Option<&'a dyn SchemaLookup>,
    pub mode: ValidationMode,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> Context<'a> {
    pub fn new(
        tree: &'a YamlTree,
        schemas: Option<&'a dyn SchemaLookup>,
        mode: ValidationMode,
    ) -> Self {
        Self {
            tree,
            schemas,
            mode,
            diagnostics: Vec::new(),
        }
    }

    pub fn error(&mut self, rule: Rule, message: impl Into<String>, range: Range) {
        self.diagnostics.push(Diagnostic::error(rule, message, range));
    }

    pub fn warning(&mut self, rule: Rule, message: impl Into<String>, range: Range) {
        self.diagnostics
            .push(Diagnostic::warning(rule, message, range));
    }

    /// Error placed on `path`, or where it is expected when missing
    pub fn error_at(&mut self, rule: Rule, message: impl Into<String>, path: &str) {
        let range = self.tree.locate(path);
        self.error(rule, message, range);
    }

    /// `spec.schema` when it is a mapping
    pub fn schema(&self) -> Option<NodeRef<'a>> {
        self.tree
            .root()
            .find("spec.schema")
            .filter(NodeRef::is_mapping)
    }

    /// Names declared under `spec.schema.types`
    pub fn custom_types(&self) -> Vec<&'a str> {
        self.schema()
            .and_then(|s| s.get("types"))
            .map(|types| types.entries().filter_map(|(k, _)| k.as_str()).collect())
            .unwrap_or_default()
    }

    /// Mapping items of `spec.resources` with their index
    pub fn resources(&self) -> Vec<(usize, NodeRef<'a>)> {
        match self.tree.root().find("spec.resources") {
            Some(list) => list
                .items()
                .enumerate()
                .filter(|(_, item)| item.is_mapping())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Range of the key that introduces `node`, else the node itself
pub(crate) fn key_range(node: NodeRef<'_>) -> Range {
    node.key()
        .map(|k| k.range())
        .unwrap_or_else(|| node.display_range())
}

/// Every string value below `node`, including `node` itself; keys are skipped
pub(crate) fn string_scalars<'a>(node: NodeRef<'a>, out: &mut Vec<(NodeRef<'a>, &'a str)>) {
    if let Some(s) = node.as_str() {
        out.push((node, s));
        return;
    }
    for (_, value) in node.entries() {
        string_scalars(value, out);
    }
    for item in node.items() {
        string_scalars(item, out);
    }
}

//! Pipeline driver

use rgd_core::{Diagnostic, LineIndex, ParseError, Range, Rule, YamlTree};
use rgd_crd::SchemaLookup;
use tracing::{debug, trace};

use crate::mode::ValidationMode;
use crate::stage::{Context, Flow, STAGES};

/// API group of ResourceGraphDefinition documents
pub const RGD_GROUP: &str = "kro.run";

/// The only accepted `apiVersion`
pub const RGD_API_VERSION: &str = "kro.run/v1alpha1";

pub const RGD_KIND: &str = "ResourceGraphDefinition";

/// Runs every stage over a document.
///
/// A validator holds no per-document state, so one instance can serve any
/// number of documents concurrently.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator {
    mode: ValidationMode,
}

impl Validator {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Validate a parsed document.
    ///
    /// Schema-backed checks run only when `schemas` is given and the mode is
    /// not [`ValidationMode::Off`].
    pub fn validate(&self, tree: &YamlTree, schemas: Option<&dyn SchemaLookup>) -> Vec<Diagnostic> {
        let mut ctx = Context::new(tree, schemas, self.mode);

        for &(name, stage) in STAGES {
            let before = ctx.diagnostics.len();
            let flow = stage(&mut ctx);
            trace!(
                stage = name,
                findings = ctx.diagnostics.len() - before,
                "stage finished"
            );
            if flow == Flow::Halt {
                debug!(stage = name, "validation halted");
                break;
            }
        }

        ctx.diagnostics
    }

    /// Parse and validate raw text; a parse failure becomes one syntax diagnostic
    pub fn validate_text(&self, text: &str, schemas: Option<&dyn SchemaLookup>) -> Vec<Diagnostic> {
        match YamlTree::parse(text) {
            Ok(tree) => self.validate(&tree, schemas),
            Err(e) => vec![syntax_diagnostic(text, &e)],
        }
    }
}

/// Diagnostic for a YAML parse failure, spanning the word at the error position
pub fn syntax_diagnostic(text: &str, error: &ParseError) -> Diagnostic {
    let index = LineIndex::new(text);
    let start = error.position;
    let end = index.word_end(start);
    Diagnostic::error(Rule::Syntax, &error.message, Range::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgd_core::Severity;

    #[test]
    fn test_syntax_error_is_single_diagnostic() {
        let diags = Validator::default().validate_text("kind: [unclosed\nname: x\n", None);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].rule, Rule::Syntax);
        assert_eq!(diags[0].severity, Severity::Error);
    }

    #[test]
    fn test_halt_skips_later_stages() {
        let text = "apiVersion: kro.run/v1alpha1\nspec:\n  resources:\n    - id: Bad_Id\n";
        let diags = Validator::default().validate_text(text, None);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "kind is required");
    }
}

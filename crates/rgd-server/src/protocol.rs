//! Editor protocol boundary
//!
//! Converts engine diagnostics into `lsp_types` values and defines the
//! publishing seam. Columns become UTF-16 code units only here.

use async_trait::async_trait;
use lsp_types::{
    DiagnosticSeverity, NumberOrString, Position as LspPosition, Range as LspRange,
};
use rgd_core::{Diagnostic, LineIndex, Position, Range, Severity};

/// Receives the diagnostics computed for a document.
///
/// An empty list clears whatever was published before for the URI.
#[async_trait]
pub trait DiagnosticPublisher: Send + Sync {
    async fn publish(&self, uri: &str, diagnostics: Vec<lsp_types::Diagnostic>);
}

pub fn to_lsp_position(index: &LineIndex, pos: Position) -> LspPosition {
    LspPosition {
        line: pos.line,
        character: index.utf16_column(pos),
    }
}

pub fn to_lsp_range(index: &LineIndex, range: Range) -> LspRange {
    LspRange {
        start: to_lsp_position(index, range.start),
        end: to_lsp_position(index, range.end),
    }
}

pub fn to_lsp_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Info => DiagnosticSeverity::INFORMATION,
    }
}

pub fn to_lsp_diagnostic(index: &LineIndex, diag: &Diagnostic) -> lsp_types::Diagnostic {
    lsp_types::Diagnostic {
        range: to_lsp_range(index, diag.range),
        severity: Some(to_lsp_severity(diag.severity)),
        code: Some(NumberOrString::String(diag.rule.as_str().to_string())),
        code_description: None,
        source: Some(diag.source.clone()),
        message: diag.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}

/// Convert every diagnostic computed over `text`
pub fn to_lsp_diagnostics(text: &str, diagnostics: &[Diagnostic]) -> Vec<lsp_types::Diagnostic> {
    let index = LineIndex::new(text);
    diagnostics
        .iter()
        .map(|d| to_lsp_diagnostic(&index, d))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgd_core::Rule;

    #[test]
    fn test_convert_fields() {
        let text = "kind: webApp\n";
        let diag = Diagnostic::warning(Rule::InvalidNaming, "bad name", Range::on_line(0, 6, 12));
        let converted = to_lsp_diagnostics(text, &[diag]);

        assert_eq!(converted.len(), 1);
        let lsp = &converted[0];
        assert_eq!(lsp.severity, Some(DiagnosticSeverity::WARNING));
        assert_eq!(lsp.code, Some(NumberOrString::String("invalid-naming".to_string())));
        assert_eq!(lsp.source.as_deref(), Some(rgd_core::SOURCE));
        assert_eq!(lsp.message, "bad name");
        assert_eq!(lsp.range.start, LspPosition::new(0, 6));
        assert_eq!(lsp.range.end, LspPosition::new(0, 12));
    }

    #[test]
    fn test_columns_count_utf16_units() {
        let text = "owner: \"🚀 team\" x\n";
        let diag = Diagnostic::error(Rule::SchemaMismatch, "m", Range::on_line(0, 16, 17));
        let lsp = &to_lsp_diagnostics(text, &[diag])[0];
        assert_eq!(lsp.range.start.character, 17);
        assert_eq!(lsp.range.end.character, 18);
    }

    #[test]
    fn test_severity_mapping() {
        assert_eq!(to_lsp_severity(Severity::Error), DiagnosticSeverity::ERROR);
        assert_eq!(to_lsp_severity(Severity::Info), DiagnosticSeverity::INFORMATION);
    }
}

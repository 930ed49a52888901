//! Check command - validate RGD files

use console::style;
use miette::{IntoDiagnostic, Result, miette};
use rgd_core::{Diagnostic, Severity, YamlTree};
use rgd_crd::{CrdManager, SchemaLookup};
use rgd_server::looks_like_rgd;
use rgd_validate::{ValidationMode, Validator, syntax_diagnostic};
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::{load_config, load_schemas};
use crate::exit_codes;

#[derive(Debug, Serialize)]
struct FileResult {
    path: String,
    /// The file parsed but is not a ResourceGraphDefinition
    skipped: bool,
    diagnostics: Vec<Diagnostic>,
}

impl FileResult {
    fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

pub async fn run(
    paths: &[PathBuf],
    config_path: Option<&Path>,
    crd_dirs: &[PathBuf],
    mode: Option<ValidationMode>,
    json_output: bool,
) -> Result<()> {
    let mut config = load_config(config_path, crd_dirs)?;
    if let Some(mode) = mode {
        config.validation.mode = mode;
    }

    let files = collect_files(paths)?;
    let schemas = load_schemas(&config).await?;
    let validator = Validator::new(config.validation.mode);

    if !json_output {
        println!(
            "{} Checking {} file(s) ({} mode, {} schema(s))",
            style("→").blue(),
            files.len(),
            validator.mode(),
            schemas.len()
        );
    }

    let mut results = Vec::with_capacity(files.len());
    for file in &files {
        let text = std::fs::read_to_string(file).into_diagnostic()?;
        let result = match check_text(&validator, &text, &schemas) {
            Some(diagnostics) => FileResult {
                path: file.display().to_string(),
                skipped: false,
                diagnostics,
            },
            None => FileResult {
                path: file.display().to_string(),
                skipped: true,
                diagnostics: Vec::new(),
            },
        };
        if !json_output {
            print_file(&result);
        }
        results.push(result);
    }

    let errors: usize = results.iter().map(|r| r.count(Severity::Error)).sum();
    let warnings: usize = results.iter().map(|r| r.count(Severity::Warning)).sum();

    if json_output {
        let output = serde_json::json!({
            "valid": errors == 0,
            "mode": validator.mode().to_string(),
            "schemas": schemas.len(),
            "errors": errors,
            "warnings": warnings,
            "files": results,
        });
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
    } else {
        println!();
        if errors == 0 {
            println!(
                "{} Validation passed ({} warning(s))",
                style("✓").green().bold(),
                warnings
            );
        } else {
            println!(
                "{} Validation failed: {} error(s), {} warning(s)",
                style("✗").red().bold(),
                errors,
                warnings
            );
        }
    }

    if errors > 0 {
        std::process::exit(exit_codes::VALIDATION_ERROR);
    }
    Ok(())
}

/// Validate one file's text; `None` when it is not an RGD
fn check_text(validator: &Validator, text: &str, schemas: &CrdManager) -> Option<Vec<Diagnostic>> {
    match YamlTree::parse(text) {
        Err(e) => Some(vec![syntax_diagnostic(text, &e)]),
        Ok(tree) if looks_like_rgd(&tree) => {
            let lookup: &dyn SchemaLookup = schemas;
            Some(validator.validate(&tree, Some(lookup)))
        }
        Ok(_) => None,
    }
}

/// Expand directories into their `.yaml`/`.yml` files, in path order
fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| {
                    p.extension()
                        .is_some_and(|ext| ext == "yaml" || ext == "yml")
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            return Err(miette!("Path not found: {}", path.display()));
        }
    }

    Ok(files)
}

fn print_file(result: &FileResult) {
    if result.skipped {
        println!(
            "  {} {} {}",
            style("-").dim(),
            result.path,
            style("(not a ResourceGraphDefinition)").dim()
        );
        return;
    }

    if result.count(Severity::Error) == 0 {
        println!("  {} {}", style("✓").green(), result.path);
    } else {
        println!("  {} {}", style("✗").red(), result.path);
    }

    for diag in &result.diagnostics {
        let severity = match diag.severity {
            Severity::Error => style("error").red(),
            Severity::Warning => style("warning").yellow(),
            Severity::Info => style("info").cyan(),
        };
        println!(
            "      {} {}[{}] {}",
            style(diag.range.start).dim(),
            severity,
            diag.rule,
            diag.message
        );
    }
}

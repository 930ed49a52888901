//! Crds command - list cached CRD schemas

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use super::{load_config, load_schemas};

pub async fn run(config_path: Option<&Path>, crd_dirs: &[PathBuf], json_output: bool) -> Result<()> {
    let config = load_config(config_path, crd_dirs)?;
    let schemas = load_schemas(&config).await?;
    let records = schemas.records();

    if json_output {
        let output: Vec<_> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "group": r.gvk.group,
                    "version": r.gvk.version,
                    "kind": r.gvk.kind,
                    "crd": r.crd_name,
                    "origin": r.origin,
                    "hasSchema": r.schema.is_some(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
        return Ok(());
    }

    if records.is_empty() {
        println!("{} No CRD schemas found", style("!").yellow());
        return Ok(());
    }

    println!(
        "{} {} schema(s) from {} source(s)",
        style("→").blue(),
        records.len(),
        schemas.source_names().len()
    );
    for record in &records {
        println!(
            "  {} {}",
            style(&record.gvk).bold(),
            style(&record.origin).dim()
        );
    }

    Ok(())
}

//! CLI commands

pub mod check;
pub mod crds;

use miette::{IntoDiagnostic, Result};
use rgd_crd::{CrdManager, LocalSourceConfig};
use rgd_server::ServerConfig;
use std::path::{Path, PathBuf};

/// Load configuration and append `--crd-dir` roots as local sources
fn load_config(path: Option<&Path>, crd_dirs: &[PathBuf]) -> Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::load_from(path).into_diagnostic()?,
        None => ServerConfig::load().into_diagnostic()?,
    };

    for dir in crd_dirs {
        let mut source = LocalSourceConfig::new(dir.display().to_string());
        source.name = Some("cli".to_string());
        config.crd.sources.local.push(source);
    }

    Ok(config)
}

/// Build the schema manager and load it once
async fn load_schemas(config: &ServerConfig) -> Result<CrdManager> {
    let manager = CrdManager::new(config.crd.clone()).into_diagnostic()?;
    let report = manager.load_crds().await;
    tracing::debug!(
        schemas = report.cached,
        failed = report.failed.len(),
        "schemas loaded"
    );
    Ok(manager)
}

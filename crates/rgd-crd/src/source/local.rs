//! CRDs from the local filesystem

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{CrdSource, is_yaml_file};
use crate::config::LocalSourceConfig;
use crate::error::{CrdError, Result};
use crate::parser::CrdParser;
use crate::schema::SchemaRecord;

/// Recursively scans directory trees for CRD manifests
#[derive(Debug, Clone)]
pub struct LocalSource {
    name: String,
    roots: Vec<PathBuf>,
}

impl LocalSource {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: "local".to_string(),
            roots: paths.into_iter().map(|p| expand_home(p.as_ref())).collect(),
        }
    }

    pub fn from_config(config: &LocalSourceConfig) -> Self {
        let mut source = Self::new([config.path.as_str()]);
        if let Some(name) = &config.name {
            source.name = format!("local:{}", name);
        }
        source
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn scan(roots: &[PathBuf]) -> Vec<SchemaRecord> {
        let mut records = Vec::new();

        for root in roots {
            if !root.exists() {
                warn!(path = %root.display(), "CRD directory does not exist");
                continue;
            }

            for entry in WalkDir::new(root).follow_links(true) {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        warn!(error = %e, "failed to walk CRD directory");
                        continue;
                    }
                };
                if !entry.file_type().is_file() || !is_yaml_file(entry.path()) {
                    continue;
                }
                records.extend(Self::load_file(entry.path()));
            }
        }

        records
    }

    fn load_file(path: &Path) -> Vec<SchemaRecord> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read file");
                return Vec::new();
            }
        };

        let records = CrdParser::parse_all(&content, &format!("local:{}", path.display()));
        if records.is_empty() {
            debug!(path = %path.display(), "no CRDs in file");
        }
        records
    }
}

#[async_trait]
impl CrdSource for LocalSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_crds(&self) -> Result<Vec<SchemaRecord>> {
        let roots = self.roots.clone();
        tokio::task::spawn_blocking(move || Self::scan(&roots))
            .await
            .map_err(|e| CrdError::Other(format!("local scan task failed: {}", e)))
    }
}

/// Expand a leading `~` to the home directory
pub(crate) fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/crds"), PathBuf::from("/etc/crds"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/crds"), home.join("crds"));
            assert_eq!(expand_home("~"), home);
        }
        assert_eq!(expand_home("a~b"), PathBuf::from("a~b"));
    }

    #[test]
    fn test_named_source() {
        let config = LocalSourceConfig {
            name: Some("vendor".into()),
            path: "/crds".into(),
            enabled: true,
        };
        let source = LocalSource::from_config(&config);
        assert_eq!(source.name(), "local:vendor");
        assert_eq!(source.roots(), &[PathBuf::from("/crds")]);
    }

    #[tokio::test]
    async fn test_missing_root_yields_nothing() {
        let source = LocalSource::new(["/definitely/not/here"]);
        assert!(source.load_crds().await.unwrap().is_empty());
    }
}

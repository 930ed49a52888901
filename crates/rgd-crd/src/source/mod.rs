//! Pluggable CRD sources
//!
//! Every source turns some external location into [`SchemaRecord`]s. The
//! manager queries all of them on each reload.

mod cluster;
mod github;
mod local;

pub use cluster::ClusterSource;
pub use github::{GITHUB_API, GitHubSource};
pub use local::LocalSource;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::config::CrdConfig;
use crate::error::{CrdError, Result};
use crate::schema::SchemaRecord;

/// Callback receiving a fresh record set from a watching source
pub type WatchCallback = Box<dyn Fn(Vec<SchemaRecord>) + Send + Sync>;

/// A place CRDs can be loaded from
#[async_trait]
pub trait CrdSource: Send + Sync {
    /// Source name used in logs, e.g. `github:kro-run/kro`
    fn name(&self) -> &str;

    /// Load every CRD the source can see, one record per served version
    async fn load_crds(&self) -> Result<Vec<SchemaRecord>>;

    /// Whether the source can push changes through [`CrdSource::watch`]
    fn supports_watch(&self) -> bool {
        false
    }

    /// Push updated record sets to `callback` until the source stops
    async fn watch(&self, _callback: WatchCallback) -> Result<()> {
        Err(CrdError::Unsupported {
            operation: "watch".to_string(),
            source_name: self.name().to_string(),
        })
    }
}

/// Create every enabled source described by `config`
pub fn build_sources(config: &CrdConfig) -> Result<Vec<Arc<dyn CrdSource>>> {
    let mut sources: Vec<Arc<dyn CrdSource>> = Vec::new();

    for local in config.sources.local.iter().filter(|l| l.enabled) {
        sources.push(Arc::new(LocalSource::from_config(local)));
    }

    for cluster in config.sources.clusters.iter().filter(|c| c.enabled) {
        sources.push(Arc::new(ClusterSource::from_config(cluster)));
    }

    for repo in config.sources.github.iter().filter(|g| g.enabled) {
        sources.push(Arc::new(GitHubSource::new(
            repo.clone(),
            config.request_timeout,
        )?));
    }

    Ok(sources)
}

/// Check for a `.yaml` or `.yml` suffix
pub fn is_yaml_file(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GitHubSourceConfig, LocalSourceConfig};

    #[test]
    fn test_is_yaml_file() {
        assert!(is_yaml_file("crds/widget.yaml"));
        assert!(is_yaml_file("WIDGET.YML"));
        assert!(!is_yaml_file("README.md"));
        assert!(!is_yaml_file("yaml"));
    }

    #[test]
    fn test_build_sources_skips_disabled() {
        let mut config = CrdConfig::default();
        config.sources.local.push(LocalSourceConfig::new("/tmp/crds"));
        let mut disabled = GitHubSourceConfig::new("o", "r", "crds");
        disabled.enabled = false;
        config.sources.github.push(disabled);

        let sources = build_sources(&config).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].name(), "local");
    }

    #[tokio::test]
    async fn test_watch_unsupported_by_default() {
        let source = LocalSource::new(["/nonexistent"]);
        assert!(!source.supports_watch());
        let err = source.watch(Box::new(|_| {})).await.unwrap_err();
        assert!(matches!(err, CrdError::Unsupported { .. }));
    }
}

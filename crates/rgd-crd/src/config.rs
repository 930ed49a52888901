//! Schema source configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings for the schema registry and its sources
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdConfig {
    /// Interval between background reloads
    #[serde(default = "default_refresh_interval", with = "humantime_serde")]
    pub refresh_interval: Duration,

    /// Upper bound on one full reload across all sources
    #[serde(default = "default_cycle_deadline", with = "humantime_serde")]
    pub cycle_deadline: Duration,

    /// Timeout applied to each outbound HTTP request
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Keep the previous cache when every source fails during a reload.
    ///
    /// Defaults to `true`. Set it to `false` to clear the cache instead, so
    /// a reload where every source fails leaves no schemas.
    #[serde(default = "default_true")]
    pub keep_stale_on_failure: bool,

    #[serde(default)]
    pub sources: SourcesConfig,
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_cycle_deadline() -> Duration {
    Duration::from_secs(2 * 60)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

impl Default for CrdConfig {
    fn default() -> Self {
        Self {
            refresh_interval: default_refresh_interval(),
            cycle_deadline: default_cycle_deadline(),
            request_timeout: default_request_timeout(),
            keep_stale_on_failure: true,
            sources: SourcesConfig::default(),
        }
    }
}

/// Configured sources, grouped by kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesConfig {
    #[serde(default)]
    pub local: Vec<LocalSourceConfig>,
    #[serde(default)]
    pub clusters: Vec<ClusterSourceConfig>,
    #[serde(default)]
    pub github: Vec<GitHubSourceConfig>,
}

impl SourcesConfig {
    pub fn is_empty(&self) -> bool {
        self.local.is_empty() && self.clusters.is_empty() && self.github.is_empty()
    }
}

/// Directory tree scanned for CRD manifests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalSourceConfig {
    #[serde(default)]
    pub name: Option<String>,
    /// Root directory; a leading `~` expands to the home directory
    pub path: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl LocalSourceConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            name: None,
            path: path.into(),
            enabled: true,
        }
    }
}

/// Live cluster connection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSourceConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kubeconfig: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub namespaces: Vec<String>,
    #[serde(default)]
    pub enabled: bool,
}

/// Directory of CRD manifests in a GitHub repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitHubSourceConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub owner: String,
    pub repo: String,
    /// Directory inside the repository; empty for the root
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Bearer token; falls back to `GITHUB_TOKEN` when unset
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_branch() -> String {
    "main".to_string()
}

impl GitHubSourceConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: None,
            owner: owner.into(),
            repo: repo.into(),
            path: path.into(),
            branch: default_branch(),
            token: None,
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: CrdConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config, CrdConfig::default());
        assert_eq!(config.refresh_interval, Duration::from_secs(300));
        assert!(config.sources.is_empty());
        assert!(config.keep_stale_on_failure);
    }

    #[test]
    fn test_parse_sources() {
        let yaml = r#"
refreshInterval: 10m
cycleDeadline: 90s
sources:
  local:
    - path: ~/crds
  clusters:
    - name: dev
      context: kind-dev
      namespaces: [default]
  github:
    - owner: kro-run
      repo: kro
      path: helm/crds
      enabled: false
"#;
        let config: CrdConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.refresh_interval, Duration::from_secs(600));
        assert_eq!(config.cycle_deadline, Duration::from_secs(90));
        assert!(config.sources.local[0].enabled);
        assert!(!config.sources.clusters[0].enabled);
        assert_eq!(config.sources.github[0].branch, "main");
        assert!(!config.sources.github[0].enabled);
    }
}

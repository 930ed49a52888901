//! CRDs from a live cluster

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use super::CrdSource;
use super::local::expand_home;
use crate::config::ClusterSourceConfig;
use crate::error::Result;
use crate::schema::SchemaRecord;

/// Cluster-backed source.
///
/// There is no cluster client behind it yet, so it always reports an empty
/// set instead of failing.
#[derive(Debug, Clone)]
pub struct ClusterSource {
    name: String,
    kubeconfig: Option<PathBuf>,
    context: Option<String>,
    namespaces: Vec<String>,
}

impl ClusterSource {
    pub fn new(kubeconfig: Option<&str>, context: Option<&str>, namespaces: Vec<String>) -> Self {
        let name = format!("cluster:{}", context.unwrap_or("default"));
        Self {
            name,
            kubeconfig: kubeconfig.map(expand_home),
            context: context.map(String::from),
            namespaces,
        }
    }

    pub fn from_config(config: &ClusterSourceConfig) -> Self {
        Self::new(
            config.kubeconfig.as_deref(),
            config.context.as_deref(),
            config.namespaces.clone(),
        )
    }
}

#[async_trait]
impl CrdSource for ClusterSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_crds(&self) -> Result<Vec<SchemaRecord>> {
        debug!(
            source = %self.name,
            kubeconfig = ?self.kubeconfig,
            context = ?self.context,
            namespaces = ?self.namespaces,
            "cluster CRD discovery is not available, returning no CRDs"
        );
        Ok(Vec::new())
    }
}

//! CRD schema registry
//!
//! Loads CustomResourceDefinitions from several places and indexes their
//! OpenAPI schemas by resource type identity:
//!
//! - **Local**: directory trees on disk
//! - **Cluster**: a live cluster (placeholder, always empty)
//! - **GitHub**: a repository directory through the contents API
//!
//! The [`CrdManager`] rebuilds its cache from every source on demand and,
//! optionally, on a fixed interval in the background.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rgd_crd::{CrdConfig, CrdManager, Gvk, LocalSourceConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = CrdConfig::default();
//! config.sources.local.push(LocalSourceConfig::new("~/.kube/crds"));
//!
//! let manager = CrdManager::new(config)?;
//! manager.load_crds().await;
//!
//! if let Some(record) = manager.get_by_identity(&Gvk::new("apps", "v1", "Deployment")) {
//!     println!("{} from {}", record.crd_name, record.origin);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod gvk;
pub mod manager;
pub mod parser;
pub mod schema;
pub mod source;

pub use config::{ClusterSourceConfig, CrdConfig, GitHubSourceConfig, LocalSourceConfig, SourcesConfig};
pub use error::{CrdError, Result};
pub use gvk::Gvk;
pub use manager::{CrdManager, LoadReport, RefreshCallback, RefreshHandle, SchemaLookup};
pub use parser::CrdParser;
pub use schema::{AdditionalProperties, CelRule, PropertyType, SchemaProperty, SchemaRecord};
pub use source::{ClusterSource, CrdSource, GitHubSource, LocalSource, WatchCallback};

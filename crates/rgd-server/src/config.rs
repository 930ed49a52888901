//! Configuration file
//!
//! Read once at startup from `<config_dir>/kro-lsp/config.yaml` unless a path
//! is given. A missing default file means defaults everywhere; a file with a
//! `.json` extension is read as JSON, anything else as YAML.

use rgd_crd::CrdConfig;
use rgd_validate::ValidationMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ServerError};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub crd: CrdConfig,
}

/// Validation switches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationConfig {
    /// When false every document is published with no diagnostics
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub mode: ValidationMode,
}

fn default_true() -> bool {
    true
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: ValidationMode::default(),
        }
    }
}

impl ServerConfig {
    /// Load from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let parse_error = |message: String| ServerError::ConfigParse {
            path: path.display().to_string(),
            message,
        };

        let config: Self = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?
        } else if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ServerError::invalid_config("Could not determine config directory"))?;
        Ok(config_dir.join("kro-lsp").join("config.yaml"))
    }

    /// Reject settings no component can work with
    pub fn validate(&self) -> Result<()> {
        if self.crd.refresh_interval.is_zero() {
            return Err(ServerError::invalid_config(
                "crd.refreshInterval must be greater than zero",
            ));
        }
        if self.crd.cycle_deadline.is_zero() {
            return Err(ServerError::invalid_config(
                "crd.cycleDeadline must be greater than zero",
            ));
        }
        if self.crd.request_timeout.is_zero() {
            return Err(ServerError::invalid_config(
                "crd.requestTimeout must be greater than zero",
            ));
        }
        for (idx, source) in self.crd.sources.github.iter().enumerate() {
            if source.owner.trim().is_empty() || source.repo.trim().is_empty() {
                return Err(ServerError::invalid_config(format!(
                    "crd.sources.github[{}] needs both owner and repo",
                    idx
                )));
            }
        }
        for (idx, source) in self.crd.sources.local.iter().enumerate() {
            if source.path.trim().is_empty() {
                return Err(ServerError::invalid_config(format!(
                    "crd.sources.local[{}].path cannot be empty",
                    idx
                )));
            }
        }
        Ok(())
    }
}

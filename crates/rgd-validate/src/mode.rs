//! Validation strictness

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How far schema-backed checks go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Schema checks, plus fields a closed schema does not declare
    Strict,
    /// Schema checks on declared fields only
    #[default]
    Permissive,
    /// No schema checks; document rules still apply
    Off,
}

impl ValidationMode {
    pub fn schema_checks(&self) -> bool {
        !matches!(self, Self::Off)
    }

    pub fn reports_unknown_fields(&self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Permissive => write!(f, "permissive"),
            Self::Off => write!(f, "off"),
        }
    }
}

impl FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            "off" | "none" => Ok(Self::Off),
            other => Err(format!(
                "unknown validation mode '{}', expected strict, permissive or off",
                other
            )),
        }
    }
}

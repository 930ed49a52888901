//! Resource type identity

use serde::{Deserialize, Serialize};

/// Group, version and kind of a Kubernetes resource type.
///
/// The core API group is the empty string (`apiVersion: v1`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Gvk {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl Gvk {
    pub fn new(group: impl Into<String>, version: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Build from an object's `apiVersion` and `kind`
    ///
    /// `apps/v1` splits into group `apps` and version `v1`; a bare `v1`
    /// belongs to the core group.
    pub fn from_api_version(api_version: &str, kind: &str) -> Option<Self> {
        let api_version = api_version.trim();
        if api_version.is_empty() || kind.is_empty() {
            return None;
        }
        let (group, version) = match api_version.rsplit_once('/') {
            Some((group, version)) => (group, version),
            None => ("", api_version),
        };
        if version.is_empty() {
            return None;
        }
        Some(Self::new(group, version, kind))
    }

    /// `group/version`, or just `version` for the core group
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl std::fmt::Display for Gvk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_api_version() {
        let gvk = Gvk::from_api_version("apps/v1", "Deployment").unwrap();
        assert_eq!(gvk, Gvk::new("apps", "v1", "Deployment"));

        let core = Gvk::from_api_version("v1", "ConfigMap").unwrap();
        assert_eq!(core.group, "");
        assert_eq!(core.api_version(), "v1");

        assert!(Gvk::from_api_version("", "Foo").is_none());
        assert!(Gvk::from_api_version("apps/", "Foo").is_none());
        assert!(Gvk::from_api_version("v1", "").is_none());
    }

    #[test]
    fn test_display() {
        let gvk = Gvk::new("kro.run", "v1alpha1", "WebApp");
        assert_eq!(gvk.to_string(), "kro.run/v1alpha1, Kind=WebApp");
    }
}

//! CRDs from a GitHub repository directory

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{CrdSource, is_yaml_file};
use crate::config::GitHubSourceConfig;
use crate::error::{CrdError, Result};
use crate::parser::CrdParser;
use crate::schema::SchemaRecord;

/// Public GitHub REST endpoint
pub const GITHUB_API: &str = "https://api.github.com";

const CLIENT_AGENT: &str = concat!("kro-lsp/", env!("CARGO_PKG_VERSION"));

/// Entry of the contents API listing
#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
    download_url: Option<String>,
}

/// Contents API reply: a directory listing, or one entry when the path is a file
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Directory(Vec<ContentEntry>),
    File(ContentEntry),
}

impl Listing {
    fn into_entries(self) -> Vec<ContentEntry> {
        match self {
            Self::Directory(entries) => entries,
            Self::File(entry) => vec![entry],
        }
    }
}

/// Lists a repository directory through the contents API and parses every
/// YAML file in it
pub struct GitHubSource {
    name: String,
    repo: GitHubSourceConfig,
    api_base: Url,
    token: Option<String>,
    client: reqwest::Client,
}

impl GitHubSource {
    /// Create a source against the public GitHub API
    pub fn new(repo: GitHubSourceConfig, timeout: Duration) -> Result<Self> {
        Self::with_api_base(repo, timeout, GITHUB_API)
    }

    /// Create a source against another API endpoint (GitHub Enterprise, tests)
    pub fn with_api_base(repo: GitHubSourceConfig, timeout: Duration, api_base: &str) -> Result<Self> {
        let api_base = Url::parse(api_base).map_err(|e| CrdError::InvalidUrl {
            url: api_base.to_string(),
            reason: e.to_string(),
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CrdError::NetworkError {
                message: e.to_string(),
            })?;

        let token = repo
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()));

        Ok(Self {
            name: format!("github:{}/{}", repo.owner, repo.repo),
            repo,
            api_base,
            token,
            client,
        })
    }

    /// `{api}/repos/{owner}/{repo}/contents/{path}?ref={branch}`
    pub fn contents_url(&self) -> Result<Url> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| CrdError::InvalidUrl {
                url: self.api_base.to_string(),
                reason: "cannot be a base URL".to_string(),
            })?;
            segments
                .pop_if_empty()
                .extend(["repos", self.repo.owner.as_str(), self.repo.repo.as_str(), "contents"])
                .extend(self.repo.path.split('/').filter(|s| !s.is_empty()));
        }
        url.query_pairs_mut().append_pair("ref", &self.repo.branch);
        Ok(url)
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url).header(USER_AGENT, CLIENT_AGENT);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn list_files(&self) -> Result<Vec<ContentEntry>> {
        let url = self.contents_url()?;
        let listing: Listing = self
            .get(url.as_str())
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(listing.into_entries())
    }

    async fn fetch_file(&self, url: &str) -> Result<String> {
        let text = self
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }
}

#[async_trait]
impl CrdSource for GitHubSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load_crds(&self) -> Result<Vec<SchemaRecord>> {
        let files: Vec<ContentEntry> = self
            .list_files()
            .await?
            .into_iter()
            .filter(|e| e.kind == "file" && is_yaml_file(&e.name) && e.download_url.is_some())
            .collect();

        debug!(source = %self.name, files = files.len(), "fetching CRD files");

        let downloads = files.iter().map(|entry| async move {
            let url = entry.download_url.as_deref().unwrap_or_default();
            (entry, self.fetch_file(url).await)
        });

        let mut records = Vec::new();
        for (entry, result) in join_all(downloads).await {
            match result {
                Ok(content) => {
                    let origin = format!("github:{}/{}/{}", self.repo.owner, self.repo.repo, entry.path);
                    records.extend(CrdParser::parse_all(&content, &origin));
                }
                Err(e) => warn!(source = %self.name, file = %entry.path, error = %e, "failed to fetch CRD file"),
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_url() {
        let mut repo = GitHubSourceConfig::new("kro-run", "kro", "/helm/crds/");
        repo.branch = "release-0.3".into();
        let source = GitHubSource::new(repo, Duration::from_secs(5)).unwrap();
        assert_eq!(
            source.contents_url().unwrap().as_str(),
            "https://api.github.com/repos/kro-run/kro/contents/helm/crds?ref=release-0.3"
        );
        assert_eq!(source.name(), "github:kro-run/kro");
    }

    #[test]
    fn test_contents_url_with_base_path() {
        let repo = GitHubSourceConfig::new("o", "r", "");
        let source =
            GitHubSource::with_api_base(repo, Duration::from_secs(5), "http://ghe.local/api/v3/").unwrap();
        assert_eq!(
            source.contents_url().unwrap().as_str(),
            "http://ghe.local/api/v3/repos/o/r/contents?ref=main"
        );
    }

    #[test]
    fn test_listing_shapes() {
        let dir: Listing = serde_json::from_str(
            r#"[{"name": "a.yaml", "path": "crds/a.yaml", "type": "file", "download_url": "http://x/a.yaml"},
                {"name": "sub", "path": "crds/sub", "type": "dir", "download_url": null}]"#,
        )
        .unwrap();
        assert_eq!(dir.into_entries().len(), 2);

        let file: Listing = serde_json::from_str(
            r#"{"name": "a.yaml", "path": "crds/a.yaml", "type": "file", "download_url": "http://x/a.yaml", "size": 120}"#,
        )
        .unwrap();
        let entries = file.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path, "crds/a.yaml");
    }

    #[test]
    fn test_invalid_api_base() {
        let repo = GitHubSourceConfig::new("o", "r", "");
        let result = GitHubSource::with_api_base(repo, Duration::from_secs(5), "not a url");
        assert!(matches!(result, Err(CrdError::InvalidUrl { .. })));
    }
}

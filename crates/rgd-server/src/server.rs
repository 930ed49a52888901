//! Event handling
//!
//! Document events update the [`DocumentManager`] synchronously and schedule
//! validation on the runtime; each handler returns as soon as the work is
//! queued. Validation itself is CPU-bound and runs on the blocking pool.

use rgd_core::Diagnostic;
use rgd_crd::{CrdManager, LoadReport, RefreshCallback, RefreshHandle, SchemaLookup};
use rgd_validate::{Validator, syntax_diagnostic};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ServerConfig, ValidationConfig};
use crate::document::{Document, DocumentManager, DocumentType, looks_like_rgd};
use crate::error::Result;
use crate::protocol::{DiagnosticPublisher, to_lsp_diagnostics};

struct Inner {
    documents: DocumentManager,
    crds: Arc<CrdManager>,
    publisher: Arc<dyn DiagnosticPublisher>,
    validator: Validator,
    enabled: bool,
}

/// The language service behind the editor transport
pub struct Server {
    inner: Arc<Inner>,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl Server {
    /// Build a server and its schema sources from configuration
    pub fn new(config: ServerConfig, publisher: Arc<dyn DiagnosticPublisher>) -> Result<Self> {
        let crds = Arc::new(CrdManager::new(config.crd)?);
        Ok(Self::with_crd_manager(config.validation, crds, publisher))
    }

    /// Build a server around an existing schema manager
    pub fn with_crd_manager(
        validation: ValidationConfig,
        crds: Arc<CrdManager>,
        publisher: Arc<dyn DiagnosticPublisher>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                documents: DocumentManager::new(),
                crds,
                publisher,
                validator: Validator::new(validation.mode),
                enabled: validation.enabled,
            }),
            refresh: Mutex::new(None),
        }
    }

    pub fn documents(&self) -> &DocumentManager {
        &self.inner.documents
    }

    pub fn crds(&self) -> &Arc<CrdManager> {
        &self.inner.crds
    }

    /// Load schemas once, then keep them fresh in the background.
    ///
    /// Every finished refresh cycle revalidates all open documents.
    pub async fn start(&self) -> LoadReport {
        let report = self.inner.crds.load_crds().await;
        info!(
            schemas = report.cached,
            failed = report.failed.len(),
            "initial CRD load finished"
        );

        let weak = Arc::downgrade(&self.inner);
        let on_refresh: RefreshCallback = Arc::new(move |report: &LoadReport| {
            if let Some(inner) = weak.upgrade() {
                debug!(schemas = report.cached, "revalidating after CRD refresh");
                Inner::revalidate_all(&inner);
            }
        });

        let handle = self.inner.crds.spawn_refresh(Some(on_refresh));
        let previous = self
            .refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            previous.stop().await;
        }

        Inner::revalidate_all(&self.inner);
        report
    }

    /// Stop the background refresh
    pub async fn shutdown(&self) {
        let handle = self
            .refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop().await;
            debug!("server shut down");
        }
    }

    pub fn did_open(&self, uri: &str, version: i32, text: impl Into<String>) -> JoinHandle<()> {
        self.inner.documents.open(uri, version, text);
        Inner::schedule(&self.inner, uri)
    }

    pub fn did_change(&self, uri: &str, version: i32, text: impl Into<String>) -> JoinHandle<()> {
        self.inner.documents.update(uri, version, text);
        Inner::schedule(&self.inner, uri)
    }

    /// Revalidate on save, taking the saved text when the client sends it
    pub fn did_save(&self, uri: &str, text: Option<String>) -> JoinHandle<()> {
        if let Some(text) = text
            && let Some(current) = self.inner.documents.get(uri)
        {
            self.inner.documents.update(uri, current.version, text);
        }
        Inner::schedule(&self.inner, uri)
    }

    /// Forget the document and clear its diagnostics
    pub fn did_close(&self, uri: &str) -> JoinHandle<()> {
        self.inner.documents.close(uri);
        let inner = Arc::clone(&self.inner);
        let uri = uri.to_string();
        tokio::spawn(async move {
            inner.publisher.publish(&uri, Vec::new()).await;
        })
    }

    /// Schedule validation of every open document
    pub fn revalidate_all(&self) -> Vec<JoinHandle<()>> {
        Inner::revalidate_all(&self.inner)
    }
}

impl Inner {
    fn schedule(inner: &Arc<Self>, uri: &str) -> JoinHandle<()> {
        let inner = Arc::clone(inner);
        let uri = uri.to_string();
        tokio::spawn(async move { inner.validate_and_publish(uri).await })
    }

    fn revalidate_all(inner: &Arc<Self>) -> Vec<JoinHandle<()>> {
        inner
            .documents
            .list_all()
            .iter()
            .map(|uri| Self::schedule(inner, uri))
            .collect()
    }

    async fn validate_and_publish(self: Arc<Self>, uri: String) {
        let Some(document) = self.documents.get(&uri) else {
            debug!(uri = %uri, "document closed before validation");
            return;
        };

        let diagnostics = if self.enabled {
            let inner = Arc::clone(&self);
            let snapshot = Arc::clone(&document);
            match tokio::task::spawn_blocking(move || inner.diagnostics_for(&snapshot)).await {
                Ok(diagnostics) => diagnostics,
                Err(e) => {
                    warn!(uri = %uri, error = %e, "validation task failed");
                    return;
                }
            }
        } else {
            Vec::new()
        };

        // A close or a newer version supersedes this result
        match self.documents.get(&uri) {
            Some(current) if Arc::ptr_eq(&current, &document) => {}
            _ => {
                debug!(uri = %uri, version = document.version, "dropping outdated diagnostics");
                return;
            }
        }

        debug!(
            uri = %uri,
            version = document.version,
            count = diagnostics.len(),
            "publishing diagnostics"
        );
        self.publisher
            .publish(&uri, to_lsp_diagnostics(&document.text, &diagnostics))
            .await;
    }

    fn diagnostics_for(&self, document: &Document) -> Vec<Diagnostic> {
        match (&document.model, &document.parse_error) {
            (Some(tree), _) if document.doc_type == DocumentType::Rgd || looks_like_rgd(tree) => {
                let lookup: &dyn SchemaLookup = self.crds.as_ref();
                self.validator.validate(tree, Some(lookup))
            }
            (Some(_), _) => Vec::new(),
            (None, Some(error)) if is_yaml_uri(&document.uri) => {
                vec![syntax_diagnostic(&document.text, error)]
            }
            (None, _) => Vec::new(),
        }
    }
}

/// Whether the URI names a `.yaml` or `.yml` file
fn is_yaml_uri(uri: &str) -> bool {
    let path = uri.split(['?', '#']).next().unwrap_or(uri).to_ascii_lowercase();
    path.ends_with(".yaml") || path.ends_with(".yml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yaml_uri() {
        assert!(is_yaml_uri("file:///a/b.yaml"));
        assert!(is_yaml_uri("file:///a/b.YML"));
        assert!(is_yaml_uri("untitled:///b.yaml?x=1"));
        assert!(!is_yaml_uri("file:///a/b.json"));
        assert!(!is_yaml_uri("file:///a/yaml"));
    }
}

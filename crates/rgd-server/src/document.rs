//! Open document store
//!
//! Every open and every accepted update re-parses the text and replaces the
//! stored document wholesale. Readers get an `Arc` snapshot, so a model handed
//! out earlier stays valid while newer versions arrive.

use rgd_core::{NodeKind, ParseError, Position, Range, YamlTree};
use rgd_validate::{RGD_GROUP, RGD_KIND};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Classification of a document's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Not yet classified
    Unknown,
    /// A ResourceGraphDefinition
    Rgd,
    /// Any other parseable YAML
    Yaml,
    /// The last text failed to parse
    Unparseable,
}

/// One open document
#[derive(Debug, Clone)]
pub struct Document {
    pub uri: String,
    pub version: i32,
    pub text: String,
    pub doc_type: DocumentType,
    /// Parsed tree; absent when the text does not parse
    pub model: Option<Arc<YamlTree>>,
    pub parse_error: Option<ParseError>,
}

impl Document {
    fn new(uri: &str, version: i32, text: String) -> Self {
        let (model, parse_error) = match YamlTree::parse(&text) {
            Ok(tree) => (Some(Arc::new(tree)), None),
            Err(e) => {
                debug!(uri = %uri, error = %e, "document does not parse");
                (None, Some(e))
            }
        };

        let doc_type = match &model {
            Some(tree) if is_rgd(tree) => DocumentType::Rgd,
            Some(_) => DocumentType::Yaml,
            None => DocumentType::Unparseable,
        };

        Self {
            uri: uri.to_string(),
            version,
            text,
            doc_type,
            model,
            parse_error,
        }
    }
}

/// What sits under a cursor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeInfo {
    /// Dotted path from the root, e.g. `spec.resources[0].id`
    pub path: String,
    pub range: Range,
    /// `mapping`, `sequence` or the scalar's type name
    pub kind: String,
    /// Scalar text, if the node is a scalar
    pub value: Option<String>,
}

/// Thread-safe table of open documents keyed by URI
#[derive(Debug, Default)]
pub struct DocumentManager {
    documents: RwLock<HashMap<String, Arc<Document>>>,
}

impl DocumentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document, replacing any previous state for the URI
    pub fn open(&self, uri: &str, version: i32, text: impl Into<String>) -> Arc<Document> {
        let document = Arc::new(Document::new(uri, version, text.into()));
        self.write().insert(uri.to_string(), document.clone());
        debug!(uri = %uri, version, doc_type = ?document.doc_type, "document opened");
        document
    }

    /// Replace the text of an open document.
    ///
    /// Unknown URIs are ignored, and so are versions older than the stored
    /// one. Returns whether the update was applied.
    pub fn update(&self, uri: &str, version: i32, text: impl Into<String>) -> bool {
        match self.get(uri) {
            None => {
                debug!(uri = %uri, "update for a document that is not open");
                return false;
            }
            Some(current) if version < current.version => {
                warn!(
                    uri = %uri,
                    stored = current.version,
                    received = version,
                    "ignoring stale document update"
                );
                return false;
            }
            Some(_) => {}
        }

        // Parse outside the lock; re-check the version before swapping in
        let document = Arc::new(Document::new(uri, version, text.into()));
        let mut documents = self.write();
        match documents.get(uri) {
            Some(current) if current.version <= version => {
                documents.insert(uri.to_string(), document);
                true
            }
            Some(current) => {
                warn!(
                    uri = %uri,
                    stored = current.version,
                    received = version,
                    "ignoring stale document update"
                );
                false
            }
            None => false,
        }
    }

    /// Forget a document; returns whether it was open
    pub fn close(&self, uri: &str) -> bool {
        let removed = self.write().remove(uri).is_some();
        debug!(uri = %uri, removed, "document closed");
        removed
    }

    pub fn get(&self, uri: &str) -> Option<Arc<Document>> {
        self.read().get(uri).cloned()
    }

    pub fn get_model(&self, uri: &str) -> Option<Arc<YamlTree>> {
        self.get(uri).and_then(|d| d.model.clone())
    }

    pub fn get_type(&self, uri: &str) -> Option<DocumentType> {
        self.get(uri).map(|d| d.doc_type)
    }

    /// Deepest node under `pos`, if the document is open and parsed
    pub fn find_node_at_position(&self, uri: &str, pos: Position) -> Option<NodeInfo> {
        let model = self.get_model(uri)?;
        let node = model.find_node_at_position(pos)?;

        let kind = match node.kind() {
            NodeKind::Mapping(_) => "mapping".to_string(),
            NodeKind::Sequence(_) => "sequence".to_string(),
            NodeKind::Scalar(s) => s.type_name().to_string(),
        };

        Some(NodeInfo {
            path: node.path(),
            range: node.range(),
            kind,
            value: node.as_scalar().map(|s| s.to_string()),
        })
    }

    /// URIs of all open documents, sorted
    pub fn list_all(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.read().keys().cloned().collect();
        uris.sort();
        uris
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Document>>> {
        self.documents.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Document>>> {
        self.documents.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn api_group(tree: &YamlTree) -> Option<&str> {
    let api_version = tree.root().get("apiVersion")?.as_str()?;
    api_version.trim().rsplit_once('/').map(|(group, _)| group)
}

fn kind(tree: &YamlTree) -> Option<&str> {
    tree.root().get("kind")?.as_str()
}

/// Both the group and the kind identify a ResourceGraphDefinition
fn is_rgd(tree: &YamlTree) -> bool {
    api_group(tree) == Some(RGD_GROUP) && kind(tree) == Some(RGD_KIND)
}

/// Either the group or the kind points at a ResourceGraphDefinition.
///
/// Catches documents still being written, e.g. one whose `kind` is missing
/// or misspelled, so they get validated instead of silently ignored.
pub fn looks_like_rgd(tree: &YamlTree) -> bool {
    api_group(tree) == Some(RGD_GROUP) || kind(tree) == Some(RGD_KIND)
}

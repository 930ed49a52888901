//! Position-preserving YAML syntax tree
//!
//! Nodes live in an arena owned by [`YamlTree`] and are addressed by
//! [`NodeId`]. Each node records its parent index, which is only used to
//! rebuild a node's dotted path. Navigation goes through the borrowed
//! [`NodeRef`] cursor.

mod parser;
mod path;

pub use path::{Segment, parse_path};

use crate::error::ParseError;
use crate::position::{LineIndex, Position, Range};

/// Index of a node inside its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Scalar payload with its resolved YAML type
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// JSON-schema style type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "number",
            Self::String(_) => "string",
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

/// One key/value pair of a mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub key: NodeId,
    pub value: NodeId,
}

/// Node discriminator with owned children
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Entries in document order, duplicates included
    Mapping(Vec<Entry>),
    Sequence(Vec<NodeId>),
    Scalar(Scalar),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: Range,
    pub parent: Option<NodeId>,
}

/// A parsed YAML document
#[derive(Debug, Clone)]
pub struct YamlTree {
    nodes: Vec<Node>,
    root: NodeId,
    index: LineIndex,
}

impl YamlTree {
    /// Parse the first document of `text`.
    ///
    /// Empty input yields a tree whose root is a null scalar.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        parser::parse(text)
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    /// Number of nodes, keys included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root().is_null()
    }

    /// Deepest node whose range contains `pos`
    pub fn find_node_at_position(&self, pos: Position) -> Option<NodeRef<'_>> {
        let root = self.root();
        if !root.range().contains(pos) {
            return None;
        }

        let mut current = root;
        'descend: loop {
            for child in current.children() {
                if child.range().contains(pos) {
                    current = child;
                    continue 'descend;
                }
            }
            return Some(current);
        }
    }

    fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

/// Borrowed cursor over a node in a [`YamlTree`]
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a YamlTree,
    id: NodeId,
}

impl std::fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("kind", &self.type_name())
            .field("range", &self.range())
            .finish()
    }
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'a YamlTree {
        self.tree
    }

    pub fn kind(&self) -> &'a NodeKind {
        &self.tree.get(self.id).kind
    }

    pub fn range(&self) -> Range {
        self.tree.get(self.id).range
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree.get(self.id).parent.map(|id| self.tree.node(id))
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind(), NodeKind::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind(), NodeKind::Sequence(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.kind(), NodeKind::Scalar(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind(), NodeKind::Scalar(Scalar::Null))
    }

    pub fn as_scalar(&self) -> Option<&'a Scalar> {
        match self.kind() {
            NodeKind::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.as_scalar() {
            Some(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self.as_scalar() {
            Some(Scalar::Int(i)) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value of an integer or float scalar
    pub fn as_f64(&self) -> Option<f64> {
        match self.as_scalar() {
            Some(Scalar::Int(i)) => Some(*i as f64),
            Some(Scalar::Float(x)) => Some(*x),
            _ => None,
        }
    }

    /// JSON-schema style type name: object, array, string, integer, number, boolean or null
    pub fn type_name(&self) -> &'static str {
        match self.kind() {
            NodeKind::Mapping(_) => "object",
            NodeKind::Sequence(_) => "array",
            NodeKind::Scalar(s) => s.type_name(),
        }
    }

    /// Entries of a mapping in document order, duplicate keys included
    pub fn entries(self) -> impl Iterator<Item = (NodeRef<'a>, NodeRef<'a>)> + 'a {
        let tree = self.tree;
        let entries: &'a [Entry] = match self.kind() {
            NodeKind::Mapping(entries) => entries,
            _ => &[],
        };
        entries
            .iter()
            .map(move |e| (tree.node(e.key), tree.node(e.value)))
    }

    /// Items of a sequence
    pub fn items(self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        let items: &'a [NodeId] = match self.kind() {
            NodeKind::Sequence(items) => items,
            _ => &[],
        };
        items.iter().map(move |id| tree.node(*id))
    }

    /// Number of entries or items; zero for scalars
    pub fn len(&self) -> usize {
        match self.kind() {
            NodeKind::Mapping(entries) => entries.len(),
            NodeKind::Sequence(items) => items.len(),
            NodeKind::Scalar(_) => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a mapping key; with duplicate keys the last occurrence wins
    pub fn get(&self, key: &str) -> Option<NodeRef<'a>> {
        self.get_entry(key).map(|(_, value)| value)
    }

    /// Look up a mapping entry as `(key, value)`
    pub fn get_entry(&self, key: &str) -> Option<(NodeRef<'a>, NodeRef<'a>)> {
        self.entries().filter(|(k, _)| k.as_key() == Some(key)).last()
    }

    /// Sequence item by index
    pub fn index(&self, idx: usize) -> Option<NodeRef<'a>> {
        match self.kind() {
            NodeKind::Sequence(items) => items.get(idx).map(|id| self.tree.node(*id)),
            _ => None,
        }
    }

    /// Keys, values and items, in document order
    pub fn children(&self) -> Vec<NodeRef<'a>> {
        match self.kind() {
            NodeKind::Mapping(entries) => entries
                .iter()
                .flat_map(|e| [self.tree.node(e.key), self.tree.node(e.value)])
                .collect(),
            NodeKind::Sequence(items) => items.iter().map(|id| self.tree.node(*id)).collect(),
            NodeKind::Scalar(_) => Vec::new(),
        }
    }

    /// The key node when this node is the value of a mapping entry
    pub fn key(&self) -> Option<NodeRef<'a>> {
        let parent = self.parent()?;
        parent
            .entries()
            .filter(|(_, v)| v.id == self.id)
            .map(|(k, _)| k)
            .last()
    }

    /// Whether this node is itself a mapping key
    pub fn is_key(&self) -> bool {
        self.parent()
            .map(|p| p.entries().any(|(k, _)| k.id == self.id))
            .unwrap_or(false)
    }

    /// Range to underline: the value itself, or its key when the value is empty
    pub fn display_range(&self) -> Range {
        let range = self.range();
        if range.is_empty()
            && let Some(key) = self.key()
        {
            return key.range();
        }
        range
    }

    /// Dotted path from the root, e.g. `spec.resources[1].id`
    pub fn path(&self) -> String {
        path::format_path(&self.segments())
    }

    /// Steps from the root down to this node
    pub fn segments(&self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut current = *self;

        while let Some(parent) = current.parent() {
            match parent.kind() {
                NodeKind::Mapping(entries) => {
                    if let Some(entry) = entries
                        .iter()
                        .find(|e| e.value == current.id || e.key == current.id)
                    {
                        let key = self.tree.node(entry.key);
                        segments.push(Segment::Key(key.key_text()));
                    }
                }
                NodeKind::Sequence(items) => {
                    if let Some(idx) = items.iter().position(|id| *id == current.id) {
                        segments.push(Segment::Index(idx));
                    }
                }
                NodeKind::Scalar(_) => {}
            }
            current = parent;
        }

        segments.reverse();
        segments
    }

    fn as_key(&self) -> Option<&'a str> {
        match self.as_scalar()? {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text of a scalar used as a key; non-string keys use their display form
    pub fn key_text(&self) -> String {
        match self.as_scalar() {
            Some(s) => s.to_string(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"apiVersion: kro.run/v1alpha1
kind: ResourceGraphDefinition
metadata:
  name: web-app
spec:
  resources:
    - id: deployment
      template:
        kind: Deployment
    - id: service
"#;

    #[test]
    fn test_navigation() {
        let tree = YamlTree::parse(SAMPLE).unwrap();
        let root = tree.root();
        assert!(root.is_mapping());
        assert_eq!(root.get("kind").and_then(|n| n.as_str()), Some("ResourceGraphDefinition"));

        let resources = root.get("spec").and_then(|s| s.get("resources")).unwrap();
        assert!(resources.is_sequence());
        assert_eq!(resources.len(), 2);
        assert_eq!(
            resources.index(1).and_then(|r| r.get("id")).and_then(|n| n.as_str()),
            Some("service")
        );
    }

    #[test]
    fn test_path_reconstruction() {
        let tree = YamlTree::parse(SAMPLE).unwrap();
        let kind = tree
            .root()
            .get("spec")
            .and_then(|s| s.get("resources"))
            .and_then(|r| r.index(0))
            .and_then(|r| r.get("template"))
            .and_then(|t| t.get("kind"))
            .unwrap();
        assert_eq!(kind.path(), "spec.resources[0].template.kind");
        assert_eq!(kind.key().map(|k| k.key_text()), Some("kind".to_string()));
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let tree = YamlTree::parse("a: 1\nb: 2\na: 3\n").unwrap();
        let root = tree.root();
        assert_eq!(root.get("a").and_then(|n| n.as_i64()), Some(3));
        assert_eq!(root.entries().count(), 3);
        let keys: Vec<String> = root.entries().map(|(k, _)| k.key_text()).collect();
        assert_eq!(keys, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_find_node_at_position() {
        let tree = YamlTree::parse(SAMPLE).unwrap();

        let node = tree.find_node_at_position(Position::new(3, 9)).unwrap();
        assert_eq!(node.as_str(), Some("web-app"));

        let node = tree.find_node_at_position(Position::new(6, 13)).unwrap();
        assert_eq!(node.as_str(), Some("deployment"));

        let key = tree.find_node_at_position(Position::new(1, 1)).unwrap();
        assert!(key.is_key());
        assert_eq!(key.as_str(), Some("kind"));
    }

    #[test]
    fn test_type_names() {
        let tree = YamlTree::parse("s: x\ni: 1\nf: 1.5\nb: true\nn: null\nl: []\nm: {}\n").unwrap();
        let root = tree.root();
        let types: Vec<&str> = root.entries().map(|(_, v)| v.type_name()).collect();
        assert_eq!(
            types,
            vec!["string", "integer", "number", "boolean", "null", "array", "object"]
        );
    }
}

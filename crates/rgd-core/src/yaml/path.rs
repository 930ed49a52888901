//! Dotted path navigation: `spec.resources[2].template`

use super::{NodeRef, YamlTree};
use crate::error::PathError;
use crate::position::Range;

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(idx) => write!(f, "[{}]", idx),
        }
    }
}

/// Split a path such as `a.b[2].c` into segments
pub fn parse_path(path: &str) -> Result<Vec<Segment>, PathError> {
    let malformed = |reason: &str| PathError::Malformed {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let mut segments = Vec::new();
    if path.is_empty() {
        return Ok(segments);
    }

    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(open) => (&part[..open], &part[open..]),
            None => (part, ""),
        };

        if key.is_empty() && rest.is_empty() {
            return Err(malformed("empty segment"));
        }
        if !key.is_empty() {
            segments.push(Segment::Key(key.to_string()));
        }

        while !rest.is_empty() {
            let close = rest.find(']').ok_or_else(|| malformed("unclosed '['"))?;
            let idx = rest[1..close]
                .parse::<usize>()
                .map_err(|_| malformed("index must be a non-negative integer"))?;
            segments.push(Segment::Index(idx));
            rest = &rest[close + 1..];
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(malformed("unexpected text after ']'"));
            }
        }
    }

    Ok(segments)
}

pub(super) fn format_path(segments: &[Segment]) -> String {
    let mut out = String::new();
    for segment in segments {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Index(idx) => out.push_str(&format!("[{}]", idx)),
        }
    }
    out
}

fn step<'a>(node: NodeRef<'a>, segment: &Segment) -> Option<NodeRef<'a>> {
    match segment {
        Segment::Key(key) => node.get(key),
        Segment::Index(idx) => node.index(*idx),
    }
}

/// Deepest resolvable node along `segments` and how many segments it consumed
fn deepest<'a>(root: NodeRef<'a>, segments: &[Segment]) -> (NodeRef<'a>, usize) {
    let mut node = root;
    for (depth, segment) in segments.iter().enumerate() {
        match step(node, segment) {
            Some(next) => node = next,
            None => return (node, depth),
        }
    }
    (node, segments.len())
}

impl YamlTree {
    /// Resolve a dotted path to a node
    pub fn find_by_path(&self, path: &str) -> Result<NodeRef<'_>, PathError> {
        let segments = parse_path(path)?;
        let (node, depth) = deepest(self.root(), &segments);
        match segments.get(depth) {
            None => Ok(node),
            Some(segment) => Err(PathError::Missing {
                segment: segment.to_string(),
                depth,
            }),
        }
    }

    /// Where a missing field at `path` would be written.
    ///
    /// The range sits on the line after the deepest existing ancestor,
    /// indented as that ancestor's child and as wide as the missing name.
    pub fn expected_range(&self, path: &str) -> Range {
        match parse_path(path) {
            Ok(segments) => self.expected_range_at(&segments),
            Err(_) => Range::zero(),
        }
    }

    /// [`expected_range`](Self::expected_range) for an already split path.
    ///
    /// Keys are taken verbatim, so a key such as `app.kubernetes.io/name`
    /// stays one step.
    pub fn expected_range_at(&self, segments: &[Segment]) -> Range {
        let (ancestor, depth) = deepest(self.root(), segments);
        let Some(missing) = segments.get(depth) else {
            return ancestor.display_range();
        };

        let indent = child_indent(ancestor);
        let width = match missing {
            Segment::Key(key) => key.chars().count() as u32,
            Segment::Index(_) => 1,
        };

        let line = if ancestor.is_null() && ancestor.parent().is_none() {
            0
        } else {
            ancestor.range().end.line + 1
        };

        Range::on_line(line, indent, indent + width)
    }

    /// Best range for a diagnostic about `path`: the node itself, else where
    /// it is expected below its nearest ancestor, else the document start
    pub fn locate(&self, path: &str) -> Range {
        match parse_path(path) {
            Ok(segments) => self.locate_segments(&segments),
            Err(_) => Range::zero(),
        }
    }

    /// [`locate`](Self::locate) for an already split path
    pub fn locate_segments(&self, segments: &[Segment]) -> Range {
        match deepest(self.root(), segments) {
            (node, depth) if depth == segments.len() => node.display_range(),
            _ => self.expected_range_at(segments),
        }
    }
}

fn child_indent(node: NodeRef<'_>) -> u32 {
    if let Some((key, _)) = node.entries().next() {
        return key.range().start.character;
    }
    if let Some(item) = node.items().next() {
        return item.range().start.character;
    }
    match node.key() {
        Some(key) => key.range().start.character + 2,
        None if node.parent().is_some() => node.range().start.character + 2,
        None => 0,
    }
}

impl<'a> NodeRef<'a> {
    /// Resolve a relative dotted path below this node
    pub fn find(&self, path: &str) -> Option<NodeRef<'a>> {
        let segments = parse_path(path).ok()?;
        let (node, depth) = deepest(*self, &segments);
        (depth == segments.len()).then_some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"apiVersion: kro.run/v1alpha1
kind: ResourceGraphDefinition
spec:
  schema:
    kind: WebApp
  resources:
    - id: web
      template:
        apiVersion: apps/v1
"#;

    #[test]
    fn test_parse_path() {
        assert_eq!(
            parse_path("a.b[2].c").unwrap(),
            vec![
                Segment::Key("a".into()),
                Segment::Key("b".into()),
                Segment::Index(2),
                Segment::Key("c".into()),
            ]
        );
        assert_eq!(parse_path("m[0][1]").unwrap().len(), 3);
        assert!(parse_path("a..b").is_err());
        assert!(parse_path("a[x]").is_err());
        assert!(parse_path("a[1").is_err());
        assert!(parse_path("").unwrap().is_empty());
    }

    #[test]
    fn test_find_by_path() {
        let tree = YamlTree::parse(DOC).unwrap();
        let node = tree.find_by_path("spec.resources[0].template.apiVersion").unwrap();
        assert_eq!(node.as_str(), Some("apps/v1"));

        let err = tree.find_by_path("spec.resources[3].id").unwrap_err();
        assert_eq!(
            err,
            PathError::Missing {
                segment: "[3]".into(),
                depth: 2
            }
        );
    }

    #[test]
    fn test_expected_range_at_root() {
        let tree = YamlTree::parse("apiVersion: kro.run/v1alpha1\nkind: ResourceGraphDefinition\n").unwrap();
        assert!(tree.find_by_path("metadata").is_err());
        assert_eq!(tree.expected_range("metadata"), Range::on_line(2, 0, 8));
        assert_eq!(tree.locate("metadata.name"), Range::on_line(2, 0, 8));
    }

    #[test]
    fn test_expected_range_nested() {
        let tree = YamlTree::parse(DOC).unwrap();
        let range = tree.expected_range("spec.schema.apiVersion");
        assert_eq!(range, Range::on_line(5, 4, 14));

        let range = tree.expected_range("spec.resources[0].template.kind");
        assert_eq!(range, Range::on_line(9, 8, 12));
    }

    #[test]
    fn test_expected_range_empty_parent() {
        let tree = YamlTree::parse("metadata:\nkind: X\n").unwrap();
        assert_eq!(tree.expected_range("metadata.name"), Range::on_line(1, 2, 6));
    }

    #[test]
    fn test_locate_existing_uses_node_range() {
        let tree = YamlTree::parse(DOC).unwrap();
        assert_eq!(tree.locate("spec.schema.kind"), Range::on_line(4, 10, 16));
        assert_eq!(tree.locate("spec.bogus[x]"), Range::zero());
    }

    #[test]
    fn test_relative_find() {
        let tree = YamlTree::parse(DOC).unwrap();
        let resource = tree.find_by_path("spec.resources[0]").unwrap();
        assert_eq!(
            resource.find("template.apiVersion").and_then(|n| n.as_str()),
            Some("apps/v1")
        );
        assert!(resource.find("template.kind").is_none());
    }

    #[test]
    fn test_segments_keep_dotted_keys() {
        let tree = YamlTree::parse(
            "metadata:\n  labels:\n    app.kubernetes.io/name: web\n",
        )
        .unwrap();
        let labels = tree.find_by_path("metadata.labels").unwrap();
        let value = labels.get("app.kubernetes.io/name").unwrap();

        let mut segments = value.segments();
        assert_eq!(segments.last(), Some(&Segment::Key("app.kubernetes.io/name".into())));
        assert_eq!(tree.locate_segments(&segments), Range::on_line(2, 28, 31));

        segments.pop();
        segments.push(Segment::Key("app.kubernetes.io/part-of".into()));
        assert_eq!(tree.locate_segments(&segments), Range::on_line(3, 4, 29));
    }
}

//! Event-driven tree construction on top of `yaml-rust2`

use std::collections::HashMap;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use super::{Entry, Node, NodeId, NodeKind, Scalar, YamlTree};
use crate::error::ParseError;
use crate::position::{LineIndex, Position, Range};

/// Upper bound on nodes copied while expanding aliases in one document
const MAX_ALIAS_NODES: usize = 10_000;

pub(super) fn parse(text: &str) -> Result<YamlTree, ParseError> {
    let index = LineIndex::new(text);
    let mut builder = TreeBuilder::new(text, &index);
    let mut parser = Parser::new_from_str(text);

    parser
        .load(&mut builder, false)
        .map_err(|e| ParseError::new(e.info(), index.position(e.marker().index())))?;

    if let Some(error) = builder.error.take() {
        return Err(error);
    }

    let (nodes, root) = builder.finish();
    Ok(YamlTree { nodes, root, index })
}

enum Frame {
    Mapping {
        id: NodeId,
        anchor: usize,
        entries: Vec<Entry>,
        pending_key: Option<NodeId>,
    },
    Sequence {
        id: NodeId,
        anchor: usize,
        items: Vec<NodeId>,
    },
}

impl Frame {
    fn id(&self) -> NodeId {
        match self {
            Frame::Mapping { id, .. } | Frame::Sequence { id, .. } => *id,
        }
    }
}

struct TreeBuilder<'a> {
    chars: Vec<char>,
    index: &'a LineIndex,
    nodes: Vec<Node>,
    stack: Vec<Frame>,
    anchors: HashMap<usize, NodeId>,
    root: Option<NodeId>,
    /// Nodes created so far by alias expansion
    expanded: usize,
    error: Option<ParseError>,
}

impl<'a> TreeBuilder<'a> {
    fn new(text: &str, index: &'a LineIndex) -> Self {
        Self {
            chars: text.chars().collect(),
            index,
            nodes: Vec::new(),
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            expanded: 0,
            error: None,
        }
    }

    fn finish(mut self) -> (Vec<Node>, NodeId) {
        match self.root {
            Some(root) => (self.nodes, root),
            None => {
                let root = self.alloc(NodeKind::Scalar(Scalar::Null), Range::zero(), None);
                (self.nodes, root)
            }
        }
    }

    fn alloc(&mut self, kind: NodeKind, range: Range, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            range,
            parent,
        });
        id
    }

    fn current_parent(&self) -> Option<NodeId> {
        self.stack.last().map(Frame::id)
    }

    fn position(&self, offset: usize) -> Position {
        self.index.position(offset)
    }

    fn attach(&mut self, id: NodeId) {
        match self.stack.last_mut() {
            None => self.root = Some(id),
            Some(Frame::Sequence { items, .. }) => items.push(id),
            Some(Frame::Mapping {
                entries,
                pending_key,
                ..
            }) => match pending_key.take() {
                Some(key) => entries.push(Entry { key, value: id }),
                None => *pending_key = Some(id),
            },
        }
    }

    fn register_anchor(&mut self, anchor: usize, id: NodeId) {
        if anchor > 0 {
            self.anchors.insert(anchor, id);
        }
    }

    fn on_scalar(&mut self, value: String, style: TScalarStyle, anchor: usize, marker: Marker) {
        let range = self.scalar_range(&value, style, marker.index());
        let parent = self.current_parent();
        let id = self.alloc(NodeKind::Scalar(resolve_scalar(value, style)), range, parent);
        self.register_anchor(anchor, id);
        self.attach(id);
    }

    fn scalar_range(&self, value: &str, style: TScalarStyle, start: usize) -> Range {
        let plain = matches!(style, TScalarStyle::Plain);

        // `key:` with nothing after it produces an implicit empty scalar
        // whose marker points at the next token.
        if plain && (value.is_empty() || value == "~") && self.chars.get(start) != Some(&'~') {
            let anchor = match self.stack.last() {
                Some(Frame::Mapping {
                    pending_key: Some(key),
                    ..
                }) => self.nodes[key.0].range.end,
                _ => self.position(start),
            };
            return Range::point(anchor);
        }

        let end = match style {
            TScalarStyle::Plain => self.plain_end(start, value),
            TScalarStyle::SingleQuoted => self.quoted_end(start, '\''),
            TScalarStyle::DoubleQuoted => self.quoted_end(start, '"'),
            _ => return self.block_range(start, value),
        };
        Range::new(self.position(start), self.position(end))
    }

    fn plain_end(&self, start: usize, value: &str) -> usize {
        let len = value.chars().count();
        if self
            .chars
            .get(start..start + len)
            .is_some_and(|src| src.iter().copied().eq(value.chars()))
        {
            return start + len;
        }

        // Folded multi-line scalar: follow each word through the source.
        let mut cursor = start;
        for word in value.split_whitespace() {
            let needle: Vec<char> = word.chars().collect();
            match self.chars[cursor..]
                .windows(needle.len())
                .position(|w| w == needle.as_slice())
            {
                Some(found) => cursor += found + needle.len(),
                None => break,
            }
        }
        cursor.max(start)
    }

    fn quoted_end(&self, start: usize, quote: char) -> usize {
        let mut i = start + 1;
        loop {
            match self.chars.get(i) {
                None => return self.chars.len(),
                Some('\\') if quote == '"' => i += 2,
                Some(&c) if c == quote => {
                    if quote == '\'' && self.chars.get(i + 1) == Some(&'\'') {
                        i += 2;
                    } else {
                        return i + 1;
                    }
                }
                Some(_) => i += 1,
            }
        }
    }

    fn block_range(&self, start: usize, value: &str) -> Range {
        let start = self.position(start);
        let lines = value.trim_end_matches('\n').lines().count().max(1) as u32;
        let last_line = self.index.line_count().saturating_sub(1);
        let end_line = (start.line + lines).min(last_line);
        Range::new(start, Position::new(end_line, self.index.line_len(end_line)))
    }

    fn open(&mut self, kind: NodeKind, marker: Marker) -> NodeId {
        let parent = self.current_parent();
        let start = self.position(marker.index());
        self.alloc(kind, Range::point(start), parent)
    }

    /// Composite end: last child's end, or just past the closing bracket when empty
    fn close(&mut self, id: NodeId, last_child: Option<NodeId>, marker: Marker, bracket: char) {
        let end = match last_child {
            Some(child) => self.nodes[child.0].range.end,
            None => {
                let idx = marker.index();
                let idx = if self.chars.get(idx) == Some(&bracket) {
                    idx + 1
                } else {
                    idx
                };
                self.position(idx)
            }
        };
        let node = &mut self.nodes[id.0];
        node.range.end = end.max(node.range.start);
    }

    fn on_alias(&mut self, anchor: usize, marker: Marker) {
        let start = self.position(marker.index());
        let range = Range::new(start, self.index.word_end(start));
        let parent = self.current_parent();

        let source = self
            .anchors
            .get(&anchor)
            .copied()
            .filter(|&source| self.reserve_expansion(source, start));

        let id = match source {
            Some(source) => {
                let id = self.clone_subtree(source, parent);
                self.nodes[id.0].range = range;
                id
            }
            None => self.alloc(NodeKind::Scalar(Scalar::Null), range, parent),
        };
        self.attach(id);
    }

    /// Charge an alias copy of `source` against the expansion budget
    fn reserve_expansion(&mut self, source: NodeId, at: Position) -> bool {
        if self.error.is_some() {
            return false;
        }
        let budget = MAX_ALIAS_NODES - self.expanded;
        let size = self.subtree_size(source, budget + 1);
        if size > budget {
            self.error = Some(ParseError::new(
                format!("alias expansion exceeds {} nodes", MAX_ALIAS_NODES),
                at,
            ));
            return false;
        }
        self.expanded += size;
        true
    }

    /// Node count of a subtree, counting no further than `limit`
    fn subtree_size(&self, root: NodeId, limit: usize) -> usize {
        let mut pending = vec![root];
        let mut count = 0;
        while let Some(id) = pending.pop() {
            count += 1;
            if count >= limit {
                break;
            }
            match &self.nodes[id.0].kind {
                NodeKind::Mapping(entries) => {
                    pending.extend(entries.iter().flat_map(|e| [e.key, e.value]));
                }
                NodeKind::Sequence(items) => pending.extend(items.iter().copied()),
                NodeKind::Scalar(_) => {}
            }
        }
        count
    }

    fn clone_subtree(&mut self, source: NodeId, parent: Option<NodeId>) -> NodeId {
        let original = self.nodes[source.0].clone();
        let id = self.alloc(NodeKind::Scalar(Scalar::Null), original.range, parent);

        let kind = match original.kind {
            NodeKind::Mapping(entries) => {
                let mut cloned = Vec::with_capacity(entries.len());
                for entry in entries {
                    let key = self.clone_subtree(entry.key, Some(id));
                    let value = self.clone_subtree(entry.value, Some(id));
                    cloned.push(Entry { key, value });
                }
                NodeKind::Mapping(cloned)
            }
            NodeKind::Sequence(items) => {
                let mut cloned = Vec::with_capacity(items.len());
                for item in items {
                    cloned.push(self.clone_subtree(item, Some(id)));
                }
                NodeKind::Sequence(cloned)
            }
            scalar @ NodeKind::Scalar(_) => scalar,
        };

        self.nodes[id.0].kind = kind;
        id
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        match ev {
            Event::Scalar(value, style, anchor, _tag) => {
                self.on_scalar(value, style, anchor, marker);
            }

            Event::SequenceStart(anchor, _tag) => {
                let id = self.open(NodeKind::Sequence(Vec::new()), marker);
                self.stack.push(Frame::Sequence {
                    id,
                    anchor,
                    items: Vec::new(),
                });
            }

            Event::MappingStart(anchor, _tag) => {
                let id = self.open(NodeKind::Mapping(Vec::new()), marker);
                self.stack.push(Frame::Mapping {
                    id,
                    anchor,
                    entries: Vec::new(),
                    pending_key: None,
                });
            }

            Event::SequenceEnd => {
                if let Some(Frame::Sequence { id, anchor, items }) = self.stack.pop() {
                    self.close(id, items.last().copied(), marker, ']');
                    self.nodes[id.0].kind = NodeKind::Sequence(items);
                    self.register_anchor(anchor, id);
                    self.attach(id);
                }
            }

            Event::MappingEnd => {
                if let Some(Frame::Mapping {
                    id,
                    anchor,
                    entries,
                    ..
                }) = self.stack.pop()
                {
                    self.close(id, entries.last().map(|e| e.value), marker, '}');
                    self.nodes[id.0].kind = NodeKind::Mapping(entries);
                    self.register_anchor(anchor, id);
                    self.attach(id);
                }
            }

            Event::Alias(anchor) => self.on_alias(anchor, marker),

            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}
        }
    }
}

fn resolve_scalar(value: String, style: TScalarStyle) -> Scalar {
    if !matches!(style, TScalarStyle::Plain) {
        return Scalar::String(value);
    }

    match value.as_str() {
        "" | "~" | "null" | "Null" | "NULL" => Scalar::Null,
        "true" | "True" | "TRUE" => Scalar::Bool(true),
        "false" | "False" | "FALSE" => Scalar::Bool(false),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => Scalar::Float(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Scalar::Float(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Scalar::Float(f64::NAN),
        _ => {
            if let Some(i) = parse_int(&value) {
                Scalar::Int(i)
            } else if let Some(x) = parse_float(&value) {
                Scalar::Float(x)
            } else {
                Scalar::String(value)
            }
        }
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };

    let magnitude = if let Some(hex) = digits.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = digits.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()?
    } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse::<i64>().ok()?
    } else {
        return None;
    };

    Some(if negative { -magnitude } else { magnitude })
}

fn parse_float(s: &str) -> Option<f64> {
    let unsigned = s.trim_start_matches(['-', '+']);
    let first = unsigned.chars().next()?;
    if !(first.is_ascii_digit() || first == '.') {
        return None;
    }
    if !unsigned.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    if !unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '-' | '+'))
    {
        return None;
    }
    s.parse::<f64>().ok()
}

//! Query-string decoding, including nested bracket keys such as `a[b][]`.
//!
//! `a[b][c]=1` is decoded into nested containers. The tree is built by
//! recursive construction: every insertion consumes the current sub-tree and
//! returns the updated one, so no node is ever reachable through two paths.
//!
//! While building, two conditions are tracked:
//! - `duplicates`: a key was seen more than once, or a scalar had to be turned
//!   into a container to hold more data;
//! - `numeric_indices`: cleared as soon as an empty `[]` segment is used.

use indexmap::IndexMap;

use crate::query::encoding::{Codec, QueryEncoding};
use crate::query::{ParsedQuery, QueryMap, QueryValue};

/// Working representation of the tree. Containers are kept as ordered maps
/// until the end, then [`Node::finish`] decides between list and map.
#[derive(Debug, Default)]
enum Node {
    #[default]
    Vacant,
    Leaf(Option<String>),
    Branch(IndexMap<String, Node>),
}

#[derive(Debug, PartialEq, Eq)]
enum Segment {
    Key(String),
    /// An empty `[]`.
    Append,
}

pub struct QueryParser {
    decoder: Codec,
    duplicates: bool,
    numeric_indices: bool,
}

impl QueryParser {
    pub fn new(encoding: QueryEncoding) -> Self {
        Self {
            decoder: encoding.decoder(),
            duplicates: false,
            numeric_indices: true,
        }
    }

    /// Decodes `s`, expanding bracket keys into nested containers.
    pub fn parse(mut self, s: &str) -> ParsedQuery {
        let root = self.decode_pairs(s, true);
        ParsedQuery {
            data: root,
            duplicates: self.duplicates,
            numeric_indices: self.numeric_indices,
        }
    }

    /// Decodes `s` keeping every key literally, brackets included.
    pub fn parse_flat(mut self, s: &str) -> QueryMap {
        self.decode_pairs(s, false)
    }

    fn decode_pairs(&mut self, s: &str, expand_brackets: bool) -> QueryMap {
        if s.is_empty() {
            return QueryMap::new();
        }

        let mut root = Node::Branch(IndexMap::new());
        for kvp in s.split('&') {
            let (key, value) = match kvp.split_once('=') {
                Some((k, v)) => (k, Some(v)),
                None => (kvp, None),
            };
            let key = (self.decoder)(key);
            let value = value.map(|v| (self.decoder)(v).into_owned());

            let path = if expand_brackets && key.contains('[') {
                tracing::trace!(key = %key, "decoding bracket key");
                split_bracket_key(&key)
            } else {
                vec![Segment::Key(key.into_owned())]
            };
            self.insert(&mut root, &path, value);
        }

        match root {
            Node::Branch(children) => children
                .into_iter()
                .map(|(k, node)| (k, node.finish()))
                .collect(),
            _ => QueryMap::new(),
        }
    }

    /// Walks `path` down from `root`, creating containers as needed, and
    /// stores `value` at the end of it.
    fn insert(&mut self, root: &mut Node, path: &[Segment], value: Option<String>) {
        let mut node = root;
        for segment in path {
            let children = self.branch(node);
            let key = match segment {
                Segment::Key(k) => k.clone(),
                Segment::Append => {
                    self.numeric_indices = false;
                    children.len().to_string()
                }
            };
            node = children.entry(key).or_default();
        }

        if let Node::Vacant = node {
            *node = Node::Leaf(value);
        } else {
            self.duplicates = true;
            let children = self.branch(node);
            let key = next_index(children).to_string();
            children.insert(key, Node::Leaf(value));
        }
    }

    /// Turns `node` into a container in place, promoting a scalar to the
    /// first element of a new list.
    fn branch<'n>(&mut self, node: &'n mut Node) -> &'n mut IndexMap<String, Node> {
        let children = match std::mem::take(node) {
            Node::Vacant => IndexMap::new(),
            Node::Leaf(v) => {
                self.duplicates = true;
                IndexMap::from([("0".to_string(), Node::Leaf(v))])
            }
            Node::Branch(children) => children,
        };
        *node = Node::Branch(children);
        match node {
            Node::Branch(children) => children,
            Node::Vacant | Node::Leaf(_) => unreachable!("node was just turned into a branch"),
        }
    }
}

/// A branch being converted by [`Node::finish`].
struct Frame {
    pending: indexmap::map::IntoIter<String, Node>,
    done: Vec<(String, QueryValue)>,
    /// Key of the child currently being converted.
    key: String,
}

impl Frame {
    fn new(children: IndexMap<String, Node>) -> Self {
        Self {
            pending: children.into_iter(),
            done: Vec::new(),
            key: String::new(),
        }
    }

    /// Keys `0..n` in order make a list, anything else a map.
    fn close(self) -> QueryValue {
        let sequential = self
            .done
            .iter()
            .enumerate()
            .all(|(i, (k, _))| index_of(k) == Some(i));
        if sequential {
            QueryValue::List(self.done.into_iter().map(|(_, v)| v).collect())
        } else {
            QueryValue::Map(self.done.into_iter().collect())
        }
    }
}

impl Node {
    /// Converts the tree depth-first with an explicit stack, so nesting depth
    /// is bounded by memory only.
    fn finish(self) -> QueryValue {
        let mut stack: Vec<Frame> = Vec::new();
        let mut node = self;
        loop {
            let mut value = match node {
                Node::Vacant => Some(QueryValue::Scalar(None)),
                Node::Leaf(v) => Some(QueryValue::Scalar(v)),
                Node::Branch(children) => {
                    stack.push(Frame::new(children));
                    None
                }
            };

            node = loop {
                let Some(frame) = stack.last_mut() else {
                    return value.unwrap_or(QueryValue::Scalar(None));
                };
                if let Some(v) = value.take() {
                    frame.done.push((std::mem::take(&mut frame.key), v));
                }
                match frame.pending.next() {
                    Some((key, child)) => {
                        frame.key = key;
                        break child;
                    }
                    None => {
                        if let Some(closed) = stack.pop() {
                            value = Some(closed.close());
                        }
                    }
                }
            };
        }
    }
}

/// `"3"` is an index, `"03"` and `"+3"` are plain keys.
fn index_of(key: &str) -> Option<usize> {
    key.parse::<usize>()
        .ok()
        .filter(|n| n.to_string() == key)
}

/// Key used when appending: one past the largest index, or 0.
fn next_index(children: &IndexMap<String, Node>) -> usize {
    children
        .keys()
        .filter_map(|k| index_of(k))
        .max()
        .map_or(0, |n| n + 1)
}

/// Splits `a[b][]` into `[Key(a), Key(b), Append]`.
///
/// A `[` closes the pending segment only when it is non-empty; text after
/// the last `]` is ignored.
fn split_bracket_key(key: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut buffer = String::new();

    for c in key.chars() {
        match c {
            '[' => {
                if !buffer.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut buffer)));
                }
            }
            ']' => {
                if buffer.is_empty() {
                    segments.push(Segment::Append);
                } else {
                    segments.push(Segment::Key(std::mem::take(&mut buffer)));
                }
            }
            _ => buffer.push(c),
        }
    }
    segments
}

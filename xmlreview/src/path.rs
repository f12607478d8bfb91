//! Path keys: building them from a tree and resolving them against one.
//!
//! A path key is the reviewer-facing location of a node, e.g.
//! `/document/section[@id='intro']/title`. Each segment is the tag name,
//! disambiguated by the first present of `id`, `name` or `type`. Siblings
//! sharing a segment produce the same key; the resolver finds the first of
//! them.
//!
//! The diff pairs nodes by [`Address`] instead: a list of
//! `(segment, ordinal among siblings with that segment)` steps, which is
//! unambiguous within a tree and equal for the n-th of a run of colliding
//! siblings on both sides.

use rustc_hash::FxHashMap;

use crate::constants::{DISAMBIGUATING_ATTRIBUTES, DOCUMENT_PATH, ROOT_PATH};
use crate::node::Element;

/// Builds the path segment for one element.
pub fn path_segment(element: &Element) -> String {
    let predicate = DISAMBIGUATING_ATTRIBUTES
        .iter()
        .find_map(|name| element.attribute(name).map(|value| (*name, value)));
    match predicate {
        Some((name, value)) if value.contains('\'') => {
            format!("{}[@{}=\"{}\"]", element.tag, name, value)
        }
        Some((name, value)) => format!("{}[@{}='{}']", element.tag, name, value),
        None => element.tag.clone(),
    }
}

/// Path key of a document root.
pub fn root_path(root: &Element) -> String {
    format!("/{}", path_segment(root))
}

/// One step of a structural address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Step {
    pub segment: String,
    pub ordinal: usize,
}

/// Structural location of a node, starting with the root's own step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Address(Vec<Step>);

impl Address {
    fn child(&self, segment: String, ordinal: usize) -> Self {
        let mut steps = self.0.clone();
        steps.push(Step { segment, ordinal });
        Address(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Follows the address from `root`.
    pub fn locate<'a>(&self, root: &'a Element) -> Option<&'a Element> {
        let (first, rest) = self.0.split_first()?;
        if path_segment(root) != first.segment {
            return None;
        }
        let mut current = root;
        for step in rest {
            current = current
                .children
                .iter()
                .filter(|c| path_segment(c) == step.segment)
                .nth(step.ordinal)?;
        }
        Some(current)
    }
}

/// Every node of a tree in document order, with its path key and address.
#[derive(Debug, Default)]
pub struct PathIndex {
    entries: Vec<(String, Address)>,
    lookup: FxHashMap<Address, usize>,
    collisions: usize,
}

impl PathIndex {
    /// Indexes `root` and all its descendants in pre-order.
    pub fn build(root: &Element) -> Self {
        let mut index = PathIndex::default();
        let segment = path_segment(root);
        let address = Address::default().child(segment.clone(), 0);
        index.visit(root, format!("/{segment}"), address);
        index
    }

    fn visit(&mut self, element: &Element, key: String, address: Address) {
        self.lookup.insert(address.clone(), self.entries.len());
        self.entries.push((key.clone(), address.clone()));

        let mut ordinals: FxHashMap<String, usize> = FxHashMap::default();
        for child in &element.children {
            let segment = path_segment(child);
            let ordinal = ordinals.entry(segment.clone()).or_insert(0);
            let child_key = format!("{}/{}", key, segment);
            let child_address = address.child(segment, *ordinal);
            if *ordinal > 0 {
                self.collisions += 1;
            }
            *ordinal += 1;
            self.visit(child, child_key, child_address);
        }
    }

    /// `(key, address)` of every node in document order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Address)> {
        self.entries.iter().map(|(k, a)| (k.as_str(), a))
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.lookup.contains_key(address)
    }

    /// Nodes whose key repeats an earlier sibling's key.
    pub fn collisions(&self) -> usize {
        self.collisions
    }
}

/// `[@name='value']` filter on a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub name: String,
    pub value: String,
}

/// One parsed segment of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `@name`: the rest of the path addresses attributes of the current node.
    Attribute(String),
    /// `tag` or `tag[@attr='value']`.
    Element {
        tag: String,
        predicate: Option<Predicate>,
    },
}

impl Segment {
    /// Parses one segment. Bracket content that is not an `@attr='value'`
    /// test is ignored and the segment matches on tag alone.
    pub fn parse(raw: &str) -> Segment {
        if let Some(name) = raw.strip_prefix('@') {
            return Segment::Attribute(name.to_string());
        }
        let Some(open) = raw.find('[') else {
            return Segment::Element {
                tag: raw.to_string(),
                predicate: None,
            };
        };
        let tag = raw[..open].to_string();
        let inner = raw[open + 1..].trim_end_matches(']');
        Segment::Element {
            tag,
            predicate: parse_predicate(inner),
        }
    }

    /// Whether `element` is the node this segment names.
    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Segment::Attribute(_) => false,
            Segment::Element { tag, predicate } => {
                element.tag == *tag
                    && predicate
                        .as_ref()
                        .is_none_or(|p| element.attribute(&p.name) == Some(p.value.as_str()))
            }
        }
    }
}

fn parse_predicate(inner: &str) -> Option<Predicate> {
    let body = inner.trim().strip_prefix('@')?;
    let (name, value) = body.split_once('=')?;
    let value = value.trim();
    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))?;
    Some(Predicate {
        name: name.trim().to_string(),
        value: unquoted.to_string(),
    })
}

/// Splits on `/` outside of brackets and quotes, dropping empty segments.
fn split_segments(path: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in path.chars() {
        match c {
            '\'' | '"' if depth > 0 => {
                match quote {
                    Some(q) if q == c => quote = None,
                    None => quote = Some(c),
                    _ => {}
                }
                current.push(c);
            }
            '[' if quote.is_none() => {
                depth += 1;
                current.push(c);
            }
            ']' if quote.is_none() && depth > 0 => {
                depth -= 1;
                current.push(c);
            }
            '/' if depth == 0 => {
                if !current.is_empty() {
                    out.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// A parsed path, as found in a change record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlPath {
    raw: String,
    parts: Vec<String>,
    segments: Vec<Segment>,
}

impl XmlPath {
    pub fn parse(path: &str) -> Self {
        let raw = path.trim().to_string();
        let parts = split_segments(&raw);
        let segments = parts.iter().map(|s| Segment::parse(s)).collect();
        XmlPath {
            raw,
            parts,
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// `/` or `/document`: the whole document.
    pub fn is_document(&self) -> bool {
        self.raw == ROOT_PATH || self.raw == DOCUMENT_PATH
    }

    /// Whether the path addresses attributes rather than an element.
    pub fn is_attribute(&self) -> bool {
        self.segments
            .iter()
            .any(|s| matches!(s, Segment::Attribute(_)))
    }

    /// Tag of the last element segment.
    pub fn last_tag(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|s| match s {
            Segment::Element { tag, .. } => Some(tag.as_str()),
            Segment::Attribute(_) => None,
        })
    }

    /// The path without its last segment; `None` for the root or shorter.
    pub fn parent(&self) -> Option<XmlPath> {
        if self.segments.len() < 2 {
            return None;
        }
        let keep = self.segments.len() - 1;
        let parts = self.parts[..keep].to_vec();
        Some(XmlPath {
            raw: format!("/{}", parts.join("/")),
            parts,
            segments: self.segments[..keep].to_vec(),
        })
    }

    /// Whether this path lies strictly below `ancestor`.
    pub fn is_within(&self, ancestor: &XmlPath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments.starts_with(&ancestor.segments)
    }

    /// Resolves the path against `root`.
    ///
    /// The first segment names the root itself, later segments select the
    /// first direct child that matches. An attribute segment ends resolution
    /// at the current element. Any miss yields `None`.
    pub fn resolve<'a>(&self, root: &'a Element) -> Option<&'a Element> {
        if self.is_document() {
            return Some(root);
        }
        let mut segments = self.segments.iter();
        match segments.next() {
            None | Some(Segment::Attribute(_)) => return Some(root),
            Some(first) if first.matches(root) => {}
            Some(_) => return None,
        }
        let mut current = root;
        for segment in segments {
            if let Segment::Attribute(_) = segment {
                break;
            }
            current = current.children.iter().find(|c| segment.matches(c))?;
        }
        Some(current)
    }

    /// Mutable counterpart of [`XmlPath::resolve`].
    pub fn resolve_mut<'a>(&self, root: &'a mut Element) -> Option<&'a mut Element> {
        if self.is_document() {
            return Some(root);
        }
        let mut segments = self.segments.iter();
        match segments.next() {
            None | Some(Segment::Attribute(_)) => return Some(root),
            Some(first) if first.matches(root) => {}
            Some(_) => return None,
        }
        let mut current = root;
        for segment in segments {
            if let Segment::Attribute(_) = segment {
                break;
            }
            current = current.children.iter_mut().find(|c| segment.matches(c))?;
        }
        Some(current)
    }
}

impl std::fmt::Display for XmlPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

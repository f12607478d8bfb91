//! Document tree representation.
//!
//! An [`Element`] owns its children outright. Text directly inside an element
//! is kept in `text`; text that follows a child's closing tag belongs to the
//! parent but is stored on the child as `tail`, so mixed content survives a
//! parse/print round trip without separate text nodes.

use std::collections::BTreeMap;

/// An XML element with its attributes, text, tail and children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Element name as written in the document.
    pub tag: String,
    /// Attributes as key-value pairs.
    pub attributes: BTreeMap<String, String>,
    /// Text between the start tag and the first child (or end tag).
    pub text: Option<String>,
    /// Text between this element's end tag and the next sibling.
    pub tail: Option<String>,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// Creates an element with no attributes, text or children.
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style text setter.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Builder-style tail setter.
    pub fn with_tail(mut self, tail: impl Into<String>) -> Self {
        self.tail = Some(tail.into());
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Appends a child as the last child of this element.
    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Order-insensitive attribute comparison.
    pub fn attributes_equal(&self, other: &Element) -> bool {
        self.attributes == other.attributes
    }

    /// Own text with surrounding whitespace removed, empty when absent.
    pub fn trimmed_text(&self) -> &str {
        self.text.as_deref().map(str::trim).unwrap_or("")
    }

    /// Tail text with surrounding whitespace removed, empty when absent.
    pub fn trimmed_tail(&self) -> &str {
        self.tail.as_deref().map(str::trim).unwrap_or("")
    }

    /// Text content of the whole subtree.
    ///
    /// Own text, then for every child its full text followed by its tail,
    /// each trimmed; empty parts are skipped and the rest joined by single
    /// spaces.
    pub fn full_text(&self) -> String {
        let mut parts = Vec::new();
        self.collect_text(&mut parts);
        parts.join(" ")
    }

    fn collect_text(&self, parts: &mut Vec<String>) {
        push_part(parts, self.trimmed_text());
        for child in &self.children {
            child.collect_text(parts);
            push_part(parts, child.trimmed_tail());
        }
    }

    /// Text owned by this element itself: own text plus the tails of its
    /// direct children. Descendants' text is not included.
    pub fn direct_text(&self) -> String {
        let mut parts = Vec::new();
        push_part(&mut parts, self.trimmed_text());
        for child in &self.children {
            push_part(&mut parts, child.trimmed_tail());
        }
        parts.join(" ")
    }

    /// Number of elements below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    /// Pre-order iterator over this element and all descendants.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }
}

fn push_part(parts: &mut Vec<String>, s: &str) {
    if !s.is_empty() {
        parts.push(s.to_string());
    }
}

/// Renders an attribute mapping for display, keys in sorted order.
pub fn format_attributes(attributes: &BTreeMap<String, String>) -> String {
    let inner: Vec<String> = attributes
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect();
    format!("{{{}}}", inner.join(", "))
}

/// Pre-order iterator over an element tree.
pub struct Iter<'a> {
    stack: Vec<&'a Element>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Element;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        // <doc> intro <p>one</p> between <p>two <b>bold</b> end</p> outro</doc>
        Element::new("doc")
            .with_text(" intro ")
            .with_child(Element::new("p").with_text("one").with_tail(" between "))
            .with_child(
                Element::new("p")
                    .with_text("two ")
                    .with_child(Element::new("b").with_text("bold").with_tail(" end"))
                    .with_tail(" outro"),
            )
    }

    #[test]
    fn test_full_text_document_order() {
        assert_eq!(sample().full_text(), "intro one between two bold end outro");
    }

    #[test]
    fn test_full_text_skips_empty_parts() {
        let e = Element::new("a")
            .with_text("   ")
            .with_child(Element::new("b").with_text("x").with_tail("\n  "));
        assert_eq!(e.full_text(), "x");
        assert_eq!(Element::new("empty").full_text(), "");
    }

    #[test]
    fn test_direct_text_ignores_descendants() {
        assert_eq!(sample().direct_text(), "intro between outro");
    }

    #[test]
    fn test_iter_is_preorder() {
        let doc = sample();
        let tags: Vec<&str> = doc.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(tags, vec!["doc", "p", "p", "b"]);
        assert_eq!(doc.descendant_count(), 3);
    }

    #[test]
    fn test_attributes_equal_is_order_insensitive() {
        let a = Element::new("x").with_attribute("a", "1").with_attribute("b", "2");
        let b = Element::new("x").with_attribute("b", "2").with_attribute("a", "1");
        assert!(a.attributes_equal(&b));
        assert!(!a.attributes_equal(&Element::new("x").with_attribute("a", "1")));
    }

    #[test]
    fn test_format_attributes() {
        let e = Element::new("x").with_attribute("name", "n").with_attribute("id", "7");
        assert_eq!(format_attributes(&e.attributes), r#"{id="7", name="n"}"#);
        assert_eq!(format_attributes(&BTreeMap::new()), "{}");
    }
}

//! XML parser that builds element trees.
//!
//! This parser uses quick-xml's streaming API. Text is kept verbatim (only
//! entity references are resolved) and attached either to the open element
//! or, once that element has children, to the tail of its last child.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::constants::FRAGMENT_ROOT;
use crate::error::{Error, Result};
use crate::node::Element;

/// XML parser that builds element trees.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlParser;

impl XmlParser {
    /// Creates a new parser.
    pub fn new() -> Self {
        XmlParser
    }

    /// Parses XML from a string.
    pub fn parse_str(&self, xml: &str) -> Result<Element> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a file.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Element> {
        let file = File::open(path)?;
        let mut reader = Reader::from_reader(BufReader::new(file));
        reader.config_mut().trim_text(false);
        self.parse_reader(&mut reader)
    }

    /// Parses XML from a quick-xml Reader.
    fn parse_reader<R: BufRead>(&self, reader: &mut Reader<R>) -> Result<Element> {
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => {
                    let element = self.parse_element(e, reader)?;
                    stack.push(element);
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| Error::Parse("unexpected end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Empty(ref e)) => {
                    let element = self.parse_element(e, reader)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape()?;
                    append_text(&mut stack, &text);
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).to_string();
                    append_text(&mut stack, &text);
                }
                Ok(Event::Eof) => break,
                Ok(Event::Comment(_))
                | Ok(Event::Decl(_))
                | Ok(Event::PI(_))
                | Ok(Event::DocType(_)) => {}
                Err(e) => return Err(Error::Xml(e)),
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(Error::Parse(format!("unclosed element <{}>", open.tag)));
        }
        root.ok_or_else(|| Error::Parse("document has no root element".to_string()))
    }

    /// Parses an element's name and attributes.
    fn parse_element<R: BufRead>(&self, e: &BytesStart, reader: &Reader<R>) -> Result<Element> {
        let name = reader
            .decoder()
            .decode(e.name().as_ref())
            .map_err(|e| Error::Parse(e.to_string()))?
            .to_string();

        let mut attributes = BTreeMap::new();
        for attr_result in e.attributes() {
            let attr = attr_result.map_err(|e| Error::Parse(format!("Attribute error: {}", e)))?;
            let key = reader
                .decoder()
                .decode(attr.key.as_ref())
                .map_err(|e| Error::Parse(e.to_string()))?
                .to_string();
            let value = attr.unescape_value()?.to_string();
            attributes.insert(key, value);
        }

        Ok(Element {
            tag: name,
            attributes,
            ..Default::default()
        })
    }
}

/// Hands a finished element to its parent, or makes it the document root.
fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => {
            return Err(Error::Parse(format!(
                "more than one top-level element (found <{}>)",
                element.tag
            )))
        }
        None => *root = Some(element),
    }
    Ok(())
}

/// Text outside the root element is dropped.
fn append_text(stack: &mut [Element], text: &str) {
    let Some(open) = stack.last_mut() else {
        return;
    };
    let slot = match open.children.last_mut() {
        Some(last) => &mut last.tail,
        None => &mut open.text,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

/// Parses XML from a file.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Element> {
    XmlParser::new().parse_file(path)
}

/// Parses XML from a string.
pub fn parse_str(xml: &str) -> Result<Element> {
    XmlParser::new().parse_str(xml)
}

/// Parses serialized content that may be a full document or a bare fragment.
///
/// Content starting with an XML declaration is parsed as a document.
/// Anything else is wrapped in a synthetic `root` element first; when the
/// wrapper ends up with exactly one child element, that child is returned
/// instead of the wrapper.
pub fn parse_fragment(content: &str) -> Result<Element> {
    let trimmed = content.trim();
    if trimmed.starts_with("<?xml") {
        return parse_str(trimmed);
    }
    let wrapped = format!("<{FRAGMENT_ROOT}>{trimmed}</{FRAGMENT_ROOT}>");
    let mut wrapper = parse_str(&wrapped)?;
    if wrapper.children.len() == 1 {
        let mut only = wrapper.children.remove(0);
        only.tail = None;
        return Ok(only);
    }
    Ok(wrapper)
}

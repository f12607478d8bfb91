//! XML printer that outputs element trees.
//!
//! Output is compact: no indentation is added, whitespace comes only from the
//! text and tail strings carried by the tree.

use std::io::Write;

use crate::node::Element;

/// Document declaration written before the root element.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// XML printer that outputs element trees.
pub struct XmlPrinter<W: Write> {
    writer: W,
}

impl<W: Write> XmlPrinter<W> {
    /// Creates a new XML printer.
    pub fn new(writer: W) -> Self {
        XmlPrinter { writer }
    }

    /// Prints a whole document: declaration header, then the root element.
    pub fn print(&mut self, root: &Element) -> std::io::Result<()> {
        writeln!(self.writer, "{}", XML_DECLARATION)?;
        self.print_element(root)?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    /// Prints a subtree without declaration and without the element's tail.
    pub fn print_fragment(&mut self, element: &Element) -> std::io::Result<()> {
        self.print_element(element)?;
        self.writer.flush()
    }

    fn print_element(&mut self, element: &Element) -> std::io::Result<()> {
        write!(self.writer, "<{}", element.tag)?;
        // BTreeMap iteration keeps attributes in sorted order.
        for (name, value) in &element.attributes {
            write!(self.writer, " {}=\"{}\"", name, to_entities(value, true))?;
        }

        let text = element.text.as_deref().unwrap_or("");
        if text.is_empty() && element.children.is_empty() {
            return write!(self.writer, " />");
        }

        write!(self.writer, ">{}", to_entities(text, false))?;
        for child in &element.children {
            self.print_element(child)?;
            if let Some(tail) = child.tail.as_deref() {
                write!(self.writer, "{}", to_entities(tail, false))?;
            }
        }
        write!(self.writer, "</{}>", element.tag)
    }
}

/// Converts special characters to XML entities.
fn to_entities(s: &str, in_attribute: bool) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if in_attribute => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

/// Prints a document to a string.
pub fn print_to_string(root: &Element) -> String {
    let mut output = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = XmlPrinter::new(&mut output).print(root);
    String::from_utf8_lossy(&output).to_string()
}

/// Prints a subtree to a string, as stored in change records.
pub fn fragment_to_string(element: &Element) -> String {
    let mut output = Vec::new();
    let _ = XmlPrinter::new(&mut output).print_fragment(element);
    String::from_utf8_lossy(&output).to_string()
}

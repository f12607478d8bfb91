//! XML parsing and output.
//!
//! The parser builds an owned [`Element`](crate::node::Element) tree from
//! quick-xml's streaming events; the printer writes a tree back as compact
//! markup. Formatting of the source is not preserved beyond the text and
//! tail strings held in the tree.

mod parser;
mod printer;

pub use parser::{parse_file, parse_fragment, parse_str, XmlParser};
pub use printer::{fragment_to_string, print_to_string, XmlPrinter};

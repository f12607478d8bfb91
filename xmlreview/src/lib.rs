//! xml-review - Reviewable XML snapshot diffs
//!
//! This library compares two directory snapshots of XML documents, reduces
//! every difference to a flat, path-keyed change record a person can approve
//! or reject, and later re-applies the approved records to the older
//! snapshot to produce updated documents.
//!
//! # Overview
//!
//! Every record names its node by a path key, e.g.
//! `/document/section[@id='intro']/title`: the tag of every ancestor, made
//! unique where possible by an `id`, `name` or `type` attribute. Siblings the
//! key cannot tell apart are still paired one to one by position. Records are
//! exported as rows, reviewed outside the tool and read back; the
//! [`Applicator`] then resolves each approved record against a freshly parsed
//! original and inserts, removes or rewrites the addressed node.
//!
//! # Example
//!
//! ```
//! use xml_review::{apply_changes, parse_str, ApprovalState, DiffEngine};
//!
//! let before = parse_str("<document><title>Hello</title></document>").unwrap();
//! let after = parse_str("<document><title>Hello World</title></document>").unwrap();
//!
//! let mut changes = DiffEngine::default().diff_trees("doc1", &before, &after);
//! assert_eq!(changes.len(), 1);
//! assert_eq!(changes[0].xml_path, "/document/title");
//!
//! changes[0].approval = ApprovalState::Approved;
//! let mut tree = before.clone();
//! apply_changes(&mut tree, &changes);
//! assert_eq!(tree.full_text(), "Hello World");
//! ```

pub mod apply;
pub mod change;
pub mod constants;
pub mod diff;
pub mod error;
pub mod node;
pub mod path;
pub mod scan;
pub mod xml;

// Re-export commonly used types
pub use constants::*;
pub use error::{Error, Result};
pub use node::{format_attributes, Element};
pub use path::{root_path, PathIndex, XmlPath};
pub use scan::scan_documents;
pub use xml::{parse_file, parse_fragment, parse_str, XmlParser, XmlPrinter};

// Re-export change record types
pub use change::{
    read_changes, read_changes_file, write_changes, write_changes_file, ApprovalState,
    ChangeRecord, ChangeSet, ChangeType,
};

// Re-export diff and apply types
pub use apply::{apply_change, apply_changes, Applicator, Applied, ApplyError, ApplySummary};
pub use diff::{focused_changes, DiffConfig, DiffEngine, DiffReport};

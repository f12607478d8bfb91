//! Constants used throughout xml-review.
//!
//! Defaults for [`DiffConfig`](crate::diff::DiffConfig) live here so the CLI
//! and the library agree on them.

/// Words of context shown on each side of a focused change.
pub const DEFAULT_CONTEXT_WORDS: usize = 2;

/// Characters of text previewed when a whole text value is added or removed.
pub const DEFAULT_PREVIEW_CHARS: usize = 100;

/// File extension (without the dot) of documents picked up by the scanner.
pub const DEFAULT_EXTENSION: &str = "xml";

/// Path used for whole-document changes.
pub const DOCUMENT_PATH: &str = "/document";

/// Alternative spelling of [`DOCUMENT_PATH`] accepted by the applicator.
pub const ROOT_PATH: &str = "/";

/// Suffix appended to a node's path for attribute changes.
pub const ATTRIBUTES_SUFFIX: &str = "/@attributes";

/// Attributes used, in priority order, to disambiguate a path segment.
pub const DISAMBIGUATING_ATTRIBUTES: [&str; 3] = ["id", "name", "type"];

/// Value written into the approval column on export.
pub const APPROVAL_PLACEHOLDER: &str = "approved,rejected,pending";

/// Synthetic element wrapping fragments that are not full documents.
pub const FRAGMENT_ROOT: &str = "root";

/// Segment names whose MODIFY sets the element text directly.
pub const DIRECT_TEXT_SEGMENTS: [&str; 2] = ["version", "text"];

/// Summary used when two texts differ only in whitespace.
pub const NO_WORD_CHANGES: &str = "No specific word changes detected";

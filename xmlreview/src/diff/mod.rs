//! Tree and directory diffing.
//!
//! Two versions of a document are reduced to a flat list of
//! [`ChangeRecord`](crate::change::ChangeRecord)s keyed by path: nodes are
//! paired by path key rather than by structural matching, so every record is
//! something a reviewer can read and the applicator can re-resolve.

mod engine;
mod focused;

pub use engine::{DiffEngine, DiffReport};
pub use focused::focused_changes;

use crate::constants::{DEFAULT_CONTEXT_WORDS, DEFAULT_EXTENSION, DEFAULT_PREVIEW_CHARS};

/// Settings for a [`DiffEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffConfig {
    /// Words of context around each focused change.
    pub context_words: usize,
    /// Characters previewed when a whole text is added or removed.
    pub preview_chars: usize,
    /// Extension of the documents compared by
    /// [`DiffEngine::diff_directories`].
    pub extension: String,
}

impl Default for DiffConfig {
    fn default() -> Self {
        DiffConfig {
            context_words: DEFAULT_CONTEXT_WORDS,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

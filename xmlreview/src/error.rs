//! Error types for xml-review.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for xml-review operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while diffing or applying changes.
#[derive(Error, Debug)]
pub enum Error {
    /// XML parsing error.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// A required input directory does not exist.
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// A change-record row could not be interpreted.
    #[error("invalid change record: {0}")]
    InvalidRecord(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Row export/import error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Directory traversal error.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

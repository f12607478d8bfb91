//! Directory scanning for document snapshots.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Lists the documents directly inside `dir`, keyed by file stem.
///
/// Only regular files whose extension matches `extension` (case-insensitive,
/// without the dot) are returned. Subdirectories are not descended into.
/// The map iterates in lexicographic `file_id` order.
pub fn scan_documents(dir: &Path, extension: &str) -> Result<BTreeMap<String, PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::MissingDirectory(dir.to_path_buf()));
    }

    let mut documents = BTreeMap::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(extension));
        if !matches {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            documents.insert(stem.to_string(), path.to_path_buf());
        }
    }
    Ok(documents)
}

//! Directory-level application of approved records.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::apply_changes;
use crate::change::{ChangeRecord, ChangeSet, ChangeType};
use crate::constants::DEFAULT_EXTENSION;
use crate::error::Result;
use crate::node::Element;
use crate::path::XmlPath;
use crate::scan::scan_documents;
use crate::xml::{parse_file, parse_fragment, XmlPrinter};

/// End-of-run counts of an apply pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Records in the reviewed set, whatever their decision.
    pub total_records: usize,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
    /// Approved records that mutated a tree or created a document.
    pub applied: usize,
    /// Approved records already carried by an earlier ADD or DELETE.
    pub covered: usize,
    /// Approved attribute changes, accepted without mutation.
    pub attribute_noops: usize,
    /// Approved records whose target resolved but needed no edit.
    pub unchanged: usize,
    /// Approved records that could not be applied.
    pub failed: usize,
    /// Documents rewritten from a mutated or newly created tree.
    pub files_written: usize,
    /// Documents with approved records that could not be produced.
    pub files_failed: usize,
    /// Documents without approved records, copied unchanged.
    pub files_copied: usize,
}

impl ApplySummary {
    /// Approved records that took effect.
    pub fn success_count(&self) -> usize {
        self.applied + self.covered + self.attribute_noops + self.unchanged
    }
}

/// Regenerates a document directory from originals and approved records.
#[derive(Debug, Clone)]
pub struct Applicator {
    source_dir: PathBuf,
    output_dir: PathBuf,
    extension: String,
}

impl Applicator {
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Applicator {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Sets the extension of source documents (without the dot).
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Applies the approved part of `changes`.
    ///
    /// Each document with approved records is re-parsed from the source
    /// directory, mutated and written as `<file_id>.<extension>`. Every other
    /// source document is copied byte for byte. Only an unreadable source
    /// directory or an uncreatable output directory is an error; everything
    /// else is counted in the summary.
    pub fn apply(&self, changes: &ChangeSet) -> Result<ApplySummary> {
        let sources = scan_documents(&self.source_dir, &self.extension)?;
        fs::create_dir_all(&self.output_dir)?;

        let mut summary = ApplySummary {
            total_records: changes.total(),
            approved: changes.approved.len(),
            rejected: changes.rejected.len(),
            pending: changes.pending.len(),
            ..ApplySummary::default()
        };

        let mut by_file: BTreeMap<&str, Vec<&ChangeRecord>> = BTreeMap::new();
        for record in &changes.approved {
            by_file.entry(record.file_id.as_str()).or_default().push(record);
        }

        for (file_id, records) in &by_file {
            self.apply_file(file_id, records, sources.get(*file_id), &mut summary);
        }

        for (file_id, source) in &sources {
            if by_file.contains_key(file_id.as_str()) {
                continue;
            }
            let Some(name) = source.file_name() else {
                continue;
            };
            match fs::copy(source, self.output_dir.join(name)) {
                Ok(_) => summary.files_copied += 1,
                Err(e) => {
                    warn!(event = "copy_failed", file_id = %file_id, error = %e);
                    summary.files_failed += 1;
                }
            }
        }

        info!(
            event = "apply_complete",
            approved = summary.approved,
            rejected = summary.rejected,
            pending = summary.pending,
            succeeded = summary.success_count(),
            failed = summary.failed,
            written = summary.files_written,
            copied = summary.files_copied,
        );
        Ok(summary)
    }

    fn apply_file(
        &self,
        file_id: &str,
        records: &[&ChangeRecord],
        source: Option<&PathBuf>,
        summary: &mut ApplySummary,
    ) {
        let created = records
            .iter()
            .find(|r| r.change_type == ChangeType::Add && XmlPath::parse(&r.xml_path).is_document());
        if let Some(created) = created {
            if records.len() > 1 {
                debug!(event = "records_superseded", file_id, count = records.len() - 1);
            }
            match parse_fragment(&created.new_content) {
                Ok(root) => {
                    summary.applied += 1;
                    self.write(file_id, &root, summary);
                }
                Err(e) => {
                    warn!(event = "record_failed", file_id, path = %created.xml_path, error = %e);
                    summary.failed += 1;
                    summary.files_failed += 1;
                }
            }
            return;
        }

        let Some(source) = source else {
            warn!(event = "source_missing", file_id, records = records.len());
            summary.failed += records.len();
            summary.files_failed += 1;
            return;
        };
        let mut root = match parse_file(source) {
            Ok(root) => root,
            Err(e) => {
                warn!(event = "parse_failed", file_id, error = %e);
                summary.failed += records.len();
                summary.files_failed += 1;
                return;
            }
        };

        let batch = apply_changes(&mut root, records.iter().copied());
        debug!(
            event = "file_applied",
            file_id,
            applied = batch.applied,
            covered = batch.covered,
            unchanged = batch.unchanged,
            failed = batch.failed,
        );
        summary.applied += batch.applied;
        summary.covered += batch.covered;
        summary.attribute_noops += batch.attribute_noops;
        summary.unchanged += batch.unchanged;
        summary.failed += batch.failed;
        self.write(file_id, &root, summary);
    }

    fn write(&self, file_id: &str, root: &Element, summary: &mut ApplySummary) {
        let target = self
            .output_dir
            .join(format!("{}.{}", file_id, self.extension));
        let result = File::create(&target)
            .and_then(|file| XmlPrinter::new(BufWriter::new(file)).print(root));
        match result {
            Ok(()) => {
                debug!(event = "file_written", file_id, path = %target.display());
                summary.files_written += 1;
            }
            Err(e) => {
                warn!(event = "write_failed", file_id, path = %target.display(), error = %e);
                summary.files_failed += 1;
            }
        }
    }
}

//! Row format of exported and reviewed change records.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ApprovalState, ChangeRecord};
use crate::constants::APPROVAL_PLACEHOLDER;
use crate::error::{Error, Result};

const HEADERS: [&str; 8] = [
    "file_id",
    "change_type",
    "section_id",
    "xml_path",
    "old_content",
    "new_content",
    "focused_changes",
    "approved",
];

/// One row as it appears in the exported file.
///
/// Every column but `change_type` may be missing on import. Older exports
/// named the decision column `status`; when both columns are present a
/// non-blank `approved` wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRow {
    #[serde(default)]
    pub file_id: String,
    pub change_type: String,
    #[serde(default)]
    pub section_id: String,
    #[serde(default)]
    pub xml_path: String,
    #[serde(default)]
    pub old_content: String,
    #[serde(default)]
    pub new_content: String,
    #[serde(default)]
    pub focused_changes: String,
    #[serde(default)]
    pub approved: String,
    #[serde(default, skip_serializing)]
    pub status: String,
}

impl ChangeRow {
    /// Export form of a record. The decision column always carries the
    /// placeholder listing the accepted values.
    pub fn from_record(record: &ChangeRecord) -> Self {
        ChangeRow {
            file_id: record.file_id.clone(),
            change_type: record.change_type.to_string(),
            section_id: record.section_id.clone(),
            xml_path: record.xml_path.clone(),
            old_content: record.old_content.clone(),
            new_content: record.new_content.clone(),
            focused_changes: record.focused_changes.clone(),
            approved: APPROVAL_PLACEHOLDER.to_string(),
            status: String::new(),
        }
    }

    pub fn into_record(self) -> Result<ChangeRecord> {
        let change_type = self.change_type.parse()?;
        let file_id = self.file_id.trim().to_string();
        if file_id.is_empty() {
            return Err(Error::InvalidRecord("empty file_id".to_string()));
        }
        let decision = if self.approved.trim().is_empty() {
            &self.status
        } else {
            &self.approved
        };
        let approval = ApprovalState::parse(decision);
        Ok(ChangeRecord {
            file_id,
            change_type,
            section_id: self.section_id,
            xml_path: self.xml_path.trim().to_string(),
            old_content: self.old_content,
            new_content: self.new_content,
            focused_changes: self.focused_changes,
            approval,
        })
    }
}

/// Writes records with a header row, even when there are none.
pub fn write_changes<W: Write>(writer: W, records: &[ChangeRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(HEADERS)?;
    for record in records {
        wtr.serialize(ChangeRow::from_record(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes records to `path`, creating parent directories as needed.
pub fn write_changes_file(path: &Path, records: &[ChangeRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_changes(file, records)?;
    debug!(event = "changes_written", path = %path.display(), count = records.len());
    Ok(())
}

/// Reads reviewed records in file order.
///
/// Rows that cannot be interpreted (unknown change type, no file id) are
/// logged and skipped; a malformed file is an error.
pub fn read_changes<R: Read>(reader: R) -> Result<Vec<ChangeRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let mut records = Vec::new();
    for (i, row) in rdr.deserialize::<ChangeRow>().enumerate() {
        let row = row?;
        match row.into_record() {
            Ok(record) => records.push(record),
            // Row 1 is the header.
            Err(e) => warn!(event = "row_skipped", row = i + 2, error = %e),
        }
    }
    Ok(records)
}

pub fn read_changes_file(path: &Path) -> Result<Vec<ChangeRecord>> {
    let file = File::open(path)?;
    let records = read_changes(file)?;
    debug!(event = "changes_read", path = %path.display(), count = records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeType;

    fn sample() -> Vec<ChangeRecord> {
        vec![
            ChangeRecord::modify(
                "doc1",
                "/document/title".into(),
                "Hello".into(),
                "Hello World".into(),
                "ADDED: 'Hello [World]'".into(),
            ),
            ChangeRecord::add(
                "doc1",
                "/document/section[@id='s2']".into(),
                "<section id=\"s2\"><p>a, b\nc</p></section>".into(),
            ),
        ]
    }

    #[test]
    fn test_export_header_and_placeholder() {
        let mut out = Vec::new();
        write_changes(&mut out, &sample()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("file_id,change_type,section_id,xml_path,old_content,new_content,focused_changes,approved")
        );
        assert!(text.contains("\"approved,rejected,pending\""));
        assert!(text.contains("MODIFY"));
    }

    #[test]
    fn test_empty_export_still_has_header() {
        let mut out = Vec::new();
        write_changes(&mut out, &[]).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("file_id,change_type,"));
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_exported_rows_read_back_as_pending() {
        let mut out = Vec::new();
        write_changes(&mut out, &sample()).unwrap();
        let records = read_changes(out.as_slice()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.approval == ApprovalState::Pending));
        assert_eq!(records[1].new_content, sample()[1].new_content);
        assert_eq!(records[1].section_id, "doc1");
    }

    #[test]
    fn test_reviewed_values_and_legacy_status_column() {
        let input = "file_id,change_type,xml_path,new_content,status\n\
                     a,add,/document/x,<x/>, Approved \n\
                     a,DELETE,/document/y,,REJECTED\n\
                     a,Modify,/document/z,z,maybe\n";
        let records = read_changes(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].change_type, ChangeType::Add);
        assert_eq!(records[0].approval, ApprovalState::Approved);
        assert_eq!(records[1].approval, ApprovalState::Rejected);
        assert_eq!(records[2].approval, ApprovalState::Pending);
        assert_eq!(records[2].old_content, "");
    }

    #[test]
    fn test_approved_column_wins_over_status() {
        let input = "file_id,change_type,xml_path,approved,status\n\
                     a,ADD,/document/x,approved,rejected\n\
                     a,ADD,/document/y,,approved\n\
                     a,ADD,/document/z,rejected,\n";
        let records = read_changes(input.as_bytes()).unwrap();
        let decisions: Vec<ApprovalState> = records.iter().map(|r| r.approval).collect();
        assert_eq!(
            decisions,
            vec![
                ApprovalState::Approved,
                ApprovalState::Approved,
                ApprovalState::Rejected
            ]
        );
    }

    #[test]
    fn test_unknown_change_type_is_skipped() {
        let input = "file_id,change_type,xml_path,approved\n\
                     a,MOVE,/document/x,approved\n\
                     a,ADD,/document/y,approved\n";
        let records = read_changes(input.as_bytes()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].xml_path, "/document/y");
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("changes.csv");
        write_changes_file(&path, &sample()).unwrap();
        let records = read_changes_file(&path).unwrap();
        assert_eq!(records[0].focused_changes, "ADDED: 'Hello [World]'");
    }
}

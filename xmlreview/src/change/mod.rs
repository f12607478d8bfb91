//! Change records: the interchange unit between diffing and applying.

mod rows;

pub use rows::{read_changes, read_changes_file, write_changes, write_changes_file, ChangeRow};

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Kind of a detected difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Add,
    Modify,
    Delete,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Add => "ADD",
            ChangeType::Modify => "MODIFY",
            ChangeType::Delete => "DELETE",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADD" => Ok(ChangeType::Add),
            "MODIFY" => Ok(ChangeType::Modify),
            "DELETE" => Ok(ChangeType::Delete),
            other => Err(Error::InvalidRecord(format!("unknown change type '{other}'"))),
        }
    }
}

/// Reviewer decision on a change record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ApprovalState {
    Approved,
    Rejected,
    #[default]
    Pending,
}

impl ApprovalState {
    /// Reads a reviewer-entered value. Only `approved` and `rejected`
    /// (any case, surrounding whitespace ignored) are decisions; everything
    /// else, the export placeholder included, is pending.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "approved" => ApprovalState::Approved,
            "rejected" => ApprovalState::Rejected,
            _ => ApprovalState::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalState::Approved => "approved",
            ApprovalState::Rejected => "rejected",
            ApprovalState::Pending => "pending",
        }
    }
}

/// One atomic difference between two versions of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// File stem of the document the change belongs to.
    pub file_id: String,
    pub change_type: ChangeType,
    /// Grouping label for reviewers; the `file_id` for generated records.
    pub section_id: String,
    pub xml_path: String,
    pub old_content: String,
    pub new_content: String,
    pub focused_changes: String,
    pub approval: ApprovalState,
}

impl ChangeRecord {
    /// Record for a node or document present only in the newer version.
    pub fn add(file_id: &str, xml_path: String, new_content: String) -> Self {
        ChangeRecord {
            file_id: file_id.to_string(),
            change_type: ChangeType::Add,
            section_id: file_id.to_string(),
            xml_path,
            old_content: String::new(),
            new_content,
            focused_changes: String::new(),
            approval: ApprovalState::Pending,
        }
    }

    /// Record for a node or document present only in the older version.
    pub fn delete(file_id: &str, xml_path: String, old_content: String) -> Self {
        ChangeRecord {
            file_id: file_id.to_string(),
            change_type: ChangeType::Delete,
            section_id: file_id.to_string(),
            xml_path,
            old_content,
            new_content: String::new(),
            focused_changes: String::new(),
            approval: ApprovalState::Pending,
        }
    }

    /// Record for content that differs between the versions.
    pub fn modify(
        file_id: &str,
        xml_path: String,
        old_content: String,
        new_content: String,
        focused_changes: String,
    ) -> Self {
        ChangeRecord {
            file_id: file_id.to_string(),
            change_type: ChangeType::Modify,
            section_id: file_id.to_string(),
            xml_path,
            old_content,
            new_content,
            focused_changes,
            approval: ApprovalState::Pending,
        }
    }
}

/// Reviewed records split by decision, each part in input order.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub approved: Vec<ChangeRecord>,
    pub rejected: Vec<ChangeRecord>,
    pub pending: Vec<ChangeRecord>,
}

impl ChangeSet {
    pub fn partition(records: Vec<ChangeRecord>) -> Self {
        let mut set = ChangeSet::default();
        for record in records {
            match record.approval {
                ApprovalState::Approved => set.approved.push(record),
                ApprovalState::Rejected => set.rejected.push(record),
                ApprovalState::Pending => set.pending.push(record),
            }
        }
        set
    }

    pub fn total(&self) -> usize {
        self.approved.len() + self.rejected.len() + self.pending.len()
    }
}

//! Re-application of reviewed change records.
//!
//! Records are resolved against a freshly parsed copy of the older document
//! and applied in order. A record that cannot be applied is reported and
//! skipped; it never aborts the rest of the batch.

mod applicator;

pub use applicator::{ApplySummary, Applicator};

use thiserror::Error;
use tracing::{debug, warn};

use crate::change::{ChangeRecord, ChangeType};
use crate::constants::DIRECT_TEXT_SEGMENTS;
use crate::node::Element;
use crate::path::{Segment, XmlPath};
use crate::xml::parse_fragment;

/// Why a single record could not be applied.
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("parent of {0} not found")]
    ParentNotFound(String),

    #[error("content for {path} is not valid XML: {source}")]
    InvalidContent {
        path: String,
        #[source]
        source: crate::error::Error,
    },

    #[error("ADD of the whole document must be applied per file")]
    DocumentLevel,
}

/// How a record took effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The tree was mutated.
    Changed,
    /// Attribute changes are recognized but not written back.
    AttributeNoop,
    /// An earlier ADD or DELETE in the batch already carried this one.
    Covered,
    /// The target resolved but nothing needed to change: the old text was
    /// not found below it, or the record deletes the whole document.
    Unchanged,
}

/// Counts for one batch of records applied to one tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub applied: usize,
    pub covered: usize,
    pub attribute_noops: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Applies one record to `root`.
pub fn apply_change(root: &mut Element, record: &ChangeRecord) -> Result<Applied, ApplyError> {
    let path = XmlPath::parse(&record.xml_path);
    if path.is_document() {
        match record.change_type {
            ChangeType::Add => return Err(ApplyError::DocumentLevel),
            // The source document is still written out.
            ChangeType::Delete => return Ok(Applied::Unchanged),
            ChangeType::Modify => {}
        }
    }

    match record.change_type {
        ChangeType::Add => add(root, &path, &record.new_content),
        ChangeType::Delete => delete(root, &path),
        ChangeType::Modify => modify(root, &path, &record.old_content, &record.new_content),
    }
}

/// Applies `records` to `root` in order.
///
/// ADD and DELETE records lying below a path that an earlier ADD or DELETE
/// of the same batch already handled are counted as covered and skipped.
pub fn apply_changes<'a, I>(root: &mut Element, records: I) -> BatchSummary
where
    I: IntoIterator<Item = &'a ChangeRecord>,
{
    let mut summary = BatchSummary::default();
    let mut structural: Vec<XmlPath> = Vec::new();

    for record in records {
        let path = XmlPath::parse(&record.xml_path);
        let is_structural = record.change_type != ChangeType::Modify;

        let result = if is_structural && structural.iter().any(|p| path.is_within(p)) {
            Ok(Applied::Covered)
        } else {
            apply_change(root, record)
        };

        match result {
            Ok(Applied::Changed) => {
                summary.applied += 1;
                if is_structural {
                    structural.push(path);
                }
            }
            Ok(Applied::Covered) => {
                debug!(event = "record_covered", file_id = %record.file_id, path = %record.xml_path);
                summary.covered += 1;
            }
            Ok(Applied::AttributeNoop) => {
                debug!(event = "attribute_noop", file_id = %record.file_id, path = %record.xml_path);
                summary.attribute_noops += 1;
            }
            Ok(Applied::Unchanged) => {
                debug!(event = "record_unchanged", file_id = %record.file_id, path = %record.xml_path);
                summary.unchanged += 1;
            }
            Err(e) => {
                warn!(
                    event = "record_failed",
                    file_id = %record.file_id,
                    change_type = %record.change_type,
                    path = %record.xml_path,
                    error = %e,
                );
                summary.failed += 1;
            }
        }
    }
    summary
}

fn add(root: &mut Element, path: &XmlPath, content: &str) -> Result<Applied, ApplyError> {
    let node = parse_fragment(content).map_err(|source| ApplyError::InvalidContent {
        path: path.to_string(),
        source,
    })?;
    let parent = resolve_parent(root, path)?;
    parent.push_child(node);
    Ok(Applied::Changed)
}

fn delete(root: &mut Element, path: &XmlPath) -> Result<Applied, ApplyError> {
    let parent = resolve_parent(root, path)?;
    let position = match path.segments().last() {
        Some(segment @ Segment::Element { .. }) => {
            parent.children.iter().position(|c| segment.matches(c))
        }
        _ => None,
    }
    .ok_or_else(|| ApplyError::PathNotFound(path.to_string()))?;
    parent.children.remove(position);
    Ok(Applied::Changed)
}

fn resolve_parent<'a>(root: &'a mut Element, path: &XmlPath) -> Result<&'a mut Element, ApplyError> {
    let not_found = || ApplyError::ParentNotFound(path.to_string());
    let parent = path.parent().ok_or_else(not_found)?;
    parent.resolve_mut(root).ok_or_else(not_found)
}

fn modify(root: &mut Element, path: &XmlPath, old: &str, new: &str) -> Result<Applied, ApplyError> {
    let target = path
        .resolve_mut(root)
        .ok_or_else(|| ApplyError::PathNotFound(path.to_string()))?;
    if path.is_attribute() {
        return Ok(Applied::AttributeNoop);
    }

    if path
        .last_tag()
        .is_some_and(|tag| DIRECT_TEXT_SEGMENTS.contains(&tag))
    {
        target.text = Some(new.to_string());
        return Ok(Applied::Changed);
    }

    // An empty old text matches the own text of any node.
    let old = old.trim();
    if target.trimmed_text().contains(old) {
        target.text = Some(new.to_string());
        return Ok(Applied::Changed);
    }
    if replace_in_subtree(target, old, new) {
        return Ok(Applied::Changed);
    }
    Ok(Applied::Unchanged)
}

/// Replaces `old` in the first text slot containing it: the element's own
/// text, its tail, then each child depth-first.
fn replace_in_subtree(element: &mut Element, old: &str, new: &str) -> bool {
    replace_in(&mut element.text, old, new)
        || replace_in(&mut element.tail, old, new)
        || element
            .children
            .iter_mut()
            .any(|child| replace_in_descendant(child, old, new))
}

fn replace_in_descendant(element: &mut Element, old: &str, new: &str) -> bool {
    replace_in(&mut element.text, old, new)
        || element
            .children
            .iter_mut()
            .any(|child| replace_in_descendant(child, old, new))
        || replace_in(&mut element.tail, old, new)
}

fn replace_in(slot: &mut Option<String>, old: &str, new: &str) -> bool {
    match slot {
        Some(text) if text.contains(old) => {
            *text = text.replace(old, new);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::{fragment_to_string, parse_str};

    fn record(change_type: ChangeType, path: &str, old: &str, new: &str) -> ChangeRecord {
        let mut r = ChangeRecord::modify("doc", path.into(), old.into(), new.into(), String::new());
        r.change_type = change_type;
        r
    }

    #[test]
    fn test_add_appends_to_parent() {
        let mut root = parse_str("<document><a/></document>").unwrap();
        let r = record(ChangeType::Add, "/document/b", "", "<b>new</b>");
        assert_eq!(apply_change(&mut root, &r).unwrap(), Applied::Changed);
        assert_eq!(fragment_to_string(&root), "<document><a /><b>new</b></document>");
    }

    #[test]
    fn test_add_failures() {
        let mut root = parse_str("<document><a/></document>").unwrap();
        let r = record(ChangeType::Add, "/document/x/b", "", "<b/>");
        assert!(matches!(apply_change(&mut root, &r), Err(ApplyError::ParentNotFound(_))));
        let r = record(ChangeType::Add, "/document/b", "", "<b>");
        assert!(matches!(apply_change(&mut root, &r), Err(ApplyError::InvalidContent { .. })));
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn test_delete_removes_first_match() {
        let mut root =
            parse_str(r#"<document><s id="1"/><s id="2"><p/></s><s id="2"/></document>"#).unwrap();
        let r = record(ChangeType::Delete, "/document/s[@id='2']", "", "");
        apply_change(&mut root, &r).unwrap();
        assert_eq!(
            fragment_to_string(&root),
            r#"<document><s id="1" /><s id="2" /></document>"#
        );
        let r = record(ChangeType::Delete, "/document/s[@id='9']", "", "");
        assert!(matches!(apply_change(&mut root, &r), Err(ApplyError::PathNotFound(_))));
    }

    #[test]
    fn test_add_then_delete_restores_child_count() {
        let mut root = parse_str("<document><a/><n>x</n></document>").unwrap();
        let before = root.children.len();
        let records = vec![
            record(ChangeType::Add, "/document/n", "", "<n>y</n>"),
            record(ChangeType::Delete, "/document/n", "", ""),
        ];
        let summary = apply_changes(&mut root, &records);
        assert_eq!(summary.applied, 2);
        assert_eq!(root.children.len(), before);
    }

    #[test]
    fn test_document_level_records() {
        let mut root = parse_str("<document><a/></document>").unwrap();
        let r = record(ChangeType::Add, "/document", "", "<document/>");
        assert!(matches!(apply_change(&mut root, &r), Err(ApplyError::DocumentLevel)));
        let r = record(ChangeType::Delete, "/", "", "");
        assert_eq!(apply_change(&mut root, &r).unwrap(), Applied::Unchanged);
        assert_eq!(fragment_to_string(&root), "<document><a /></document>");
    }

    #[test]
    fn test_modify_own_text() {
        let mut root = parse_str("<document><title>Hello</title></document>").unwrap();
        let r = record(ChangeType::Modify, "/document/title", "Hello", "Hello World");
        apply_change(&mut root, &r).unwrap();
        assert_eq!(root.children[0].text.as_deref(), Some("Hello World"));
    }

    #[test]
    fn test_modify_replaces_whole_text_when_contained() {
        let mut root = parse_str("<document><t>  say Hello there </t></document>").unwrap();
        let r = record(ChangeType::Modify, "/document/t", "Hello", "Bye");
        apply_change(&mut root, &r).unwrap();
        assert_eq!(root.children[0].text.as_deref(), Some("Bye"));
    }

    #[test]
    fn test_modify_version_segment_sets_text() {
        let mut root = parse_str("<document><version>1.0</version></document>").unwrap();
        let r = record(ChangeType::Modify, "/document/version", "unrelated", "2.0");
        apply_change(&mut root, &r).unwrap();
        assert_eq!(root.children[0].text.as_deref(), Some("2.0"));
    }

    #[test]
    fn test_modify_searches_descendants() {
        let mut root = parse_str("<document><s><p>alpha</p><p>beta beta</p></s></document>").unwrap();
        let r = record(ChangeType::Modify, "/document/s", "beta", "gamma");
        apply_change(&mut root, &r).unwrap();
        assert_eq!(
            fragment_to_string(&root),
            "<document><s><p>alpha</p><p>gamma gamma</p></s></document>"
        );
    }

    #[test]
    fn test_modify_searches_tails_in_document_order() {
        let mut root = parse_str("<document><s><b>x</b> key one <i>key</i></s></document>").unwrap();
        let r = record(ChangeType::Modify, "/document/s", "key", "KEY");
        apply_change(&mut root, &r).unwrap();
        assert_eq!(
            fragment_to_string(&root),
            "<document><s><b>x</b> KEY one <i>key</i></s></document>"
        );
    }

    #[test]
    fn test_modify_missing_text_leaves_tree_unchanged() {
        let mut root = parse_str("<document><s><p>a</p></s></document>").unwrap();
        let original = root.clone();
        let r = record(ChangeType::Modify, "/document/s", "zzz", "y");
        assert_eq!(apply_change(&mut root, &r).unwrap(), Applied::Unchanged);
        assert_eq!(root, original);
        let r = record(ChangeType::Modify, "/document/q", "a", "b");
        assert!(matches!(apply_change(&mut root, &r), Err(ApplyError::PathNotFound(_))));
    }

    #[test]
    fn test_modify_empty_old_on_leaf() {
        let mut root = parse_str("<document><t/></document>").unwrap();
        let r = record(ChangeType::Modify, "/document/t", "", "filled");
        apply_change(&mut root, &r).unwrap();
        assert_eq!(root.children[0].text.as_deref(), Some("filled"));
    }

    #[test]
    fn test_modify_empty_old_sets_own_text_of_parent() {
        let mut root = parse_str("<document><s><p>a</p></s></document>").unwrap();
        let r = record(ChangeType::Modify, "/document/s", "", "lead");
        assert_eq!(apply_change(&mut root, &r).unwrap(), Applied::Changed);
        assert_eq!(fragment_to_string(&root), "<document><s>lead<p>a</p></s></document>");
    }

    #[test]
    fn test_descendant_record_after_ancestor_rewrite_is_unchanged() {
        let mut root = parse_str("<document><s><p>old words</p></s></document>").unwrap();
        let records = vec![
            record(ChangeType::Modify, "/document/s", "old words", "new words"),
            record(ChangeType::Modify, "/document/s/p", "old words", "new words"),
        ];
        let summary = apply_changes(&mut root, &records);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(fragment_to_string(&root), "<document><s><p>new words</p></s></document>");
    }

    #[test]
    fn test_attribute_modify_is_noop() {
        let mut root = parse_str(r#"<document><s id="1" lang="en"/></document>"#).unwrap();
        let original = root.clone();
        let r = record(
            ChangeType::Modify,
            "/document/s[@id='1']/@attributes",
            r#"{id="1", lang="en"}"#,
            r#"{id="1", lang="fr"}"#,
        );
        assert_eq!(apply_change(&mut root, &r).unwrap(), Applied::AttributeNoop);
        assert_eq!(root, original);
    }

    #[test]
    fn test_batch_counts_covered_and_failures() {
        let mut root = parse_str(r#"<document><s id="x"><p>t</p></s></document>"#).unwrap();
        let records = vec![
            record(ChangeType::Delete, "/document/s[@id='x']", "", ""),
            record(ChangeType::Delete, "/document/s[@id='x']/p", "", ""),
            record(ChangeType::Add, "/document/b", "", "<b><c/></b>"),
            record(ChangeType::Add, "/document/b/c", "", "<c/>"),
            record(ChangeType::Modify, "/document/missing", "a", "b"),
            record(ChangeType::Modify, "/document/@attributes", "{}", "{a=\"1\"}"),
        ];
        let summary = apply_changes(&mut root, &records);
        assert_eq!(
            summary,
            BatchSummary {
                applied: 2,
                covered: 2,
                attribute_noops: 1,
                unchanged: 0,
                failed: 1,
            }
        );
        assert_eq!(fragment_to_string(&root), "<document><b><c /></b></document>");
    }
}

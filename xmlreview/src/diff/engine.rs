//! Path-keyed comparison of element trees.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, info, warn};

use super::{focused_changes, DiffConfig};
use crate::change::ChangeRecord;
use crate::constants::{ATTRIBUTES_SUFFIX, DOCUMENT_PATH};
use crate::error::Result;
use crate::node::{format_attributes, Element};
use crate::path::{root_path, PathIndex};
use crate::scan::scan_documents;
use crate::xml::{fragment_to_string, parse_file};

/// Outcome of diffing two directories.
#[derive(Debug, Default)]
pub struct DiffReport {
    /// Records in emission order.
    pub changes: Vec<ChangeRecord>,
    /// Files present on both sides and compared node by node.
    pub compared: usize,
    /// Files present only in the newer snapshot.
    pub added: usize,
    /// Files present only in the older snapshot.
    pub deleted: usize,
    /// Files skipped because they failed to parse.
    pub failed: usize,
}

impl DiffReport {
    /// Record count per change type, keyed by the type's name.
    pub fn counts_by_type(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for change in &self.changes {
            *counts.entry(change.change_type.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// Produces change records from pairs of trees or directories.
#[derive(Debug, Clone, Default)]
pub struct DiffEngine {
    config: DiffConfig,
}

impl DiffEngine {
    pub fn new(config: DiffConfig) -> Self {
        DiffEngine { config }
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// Compares two versions of the document `file_id`.
    ///
    /// The roots are compared first, on attributes and their own text. Then
    /// every other node of either tree is visited: nodes of `a` in document
    /// order, followed by nodes found only in `b`, in `b`'s document order.
    /// Nodes are paired by [`Address`](crate::path::Address), so siblings
    /// sharing a path key are compared one to one and reported under that
    /// key.
    pub fn diff_trees(&self, file_id: &str, a: &Element, b: &Element) -> Vec<ChangeRecord> {
        let mut changes = Vec::new();
        let root_key = root_path(a);

        if !a.attributes_equal(b) {
            changes.push(self.attribute_change(file_id, &root_key, a, b));
        }
        let (text_a, text_b) = (a.direct_text(), b.direct_text());
        if text_a != text_b {
            changes.push(self.text_change(file_id, &root_key, text_a, text_b));
        }

        let index_a = PathIndex::build(a);
        let index_b = PathIndex::build(b);

        for (key, address) in index_a.entries().filter(|(_, addr)| !addr.is_root()) {
            self.compare(file_id, key, address.locate(a), address.locate(b), &mut changes);
        }
        for (key, address) in index_b
            .entries()
            .filter(|(_, addr)| !addr.is_root() && !index_a.contains(addr))
        {
            self.compare(file_id, key, None, address.locate(b), &mut changes);
        }

        let collisions = index_a.collisions() + index_b.collisions();
        if collisions > 0 {
            debug!(event = "path_collisions", file_id, collisions);
        }
        changes
    }

    /// Compares the documents of two snapshot directories.
    ///
    /// Both directories must exist. Files are processed in `file_id` order;
    /// a file that fails to parse is logged, counted and skipped.
    pub fn diff_directories(&self, before: &Path, after: &Path) -> Result<DiffReport> {
        let old_docs = scan_documents(before, &self.config.extension)?;
        let new_docs = scan_documents(after, &self.config.extension)?;
        let file_ids: BTreeSet<&String> = old_docs.keys().chain(new_docs.keys()).collect();

        let mut report = DiffReport::default();
        for file_id in file_ids {
            match (old_docs.get(file_id), new_docs.get(file_id)) {
                (Some(old_path), Some(new_path)) => {
                    let (a, b) = match (parse_file(old_path), parse_file(new_path)) {
                        (Ok(a), Ok(b)) => (a, b),
                        (Err(e), _) | (_, Err(e)) => {
                            warn!(event = "parse_failed", file_id = %file_id, error = %e);
                            report.failed += 1;
                            continue;
                        }
                    };
                    let changes = self.diff_trees(file_id, &a, &b);
                    debug!(event = "file_compared", file_id = %file_id, changes = changes.len());
                    report.changes.extend(changes);
                    report.compared += 1;
                }
                (None, Some(new_path)) => match parse_file(new_path) {
                    Ok(root) => {
                        report.changes.push(ChangeRecord::add(
                            file_id,
                            DOCUMENT_PATH.to_string(),
                            fragment_to_string(&root),
                        ));
                        report.added += 1;
                    }
                    Err(e) => {
                        warn!(event = "parse_failed", file_id = %file_id, error = %e);
                        report.failed += 1;
                    }
                },
                (Some(old_path), None) => match parse_file(old_path) {
                    Ok(root) => {
                        report.changes.push(ChangeRecord::delete(
                            file_id,
                            DOCUMENT_PATH.to_string(),
                            fragment_to_string(&root),
                        ));
                        report.deleted += 1;
                    }
                    Err(e) => {
                        warn!(event = "parse_failed", file_id = %file_id, error = %e);
                        report.failed += 1;
                    }
                },
                (None, None) => {}
            }
        }

        info!(
            event = "diff_complete",
            changes = report.changes.len(),
            compared = report.compared,
            added = report.added,
            deleted = report.deleted,
            failed = report.failed,
        );
        Ok(report)
    }

    fn compare(
        &self,
        file_id: &str,
        key: &str,
        a: Option<&Element>,
        b: Option<&Element>,
        changes: &mut Vec<ChangeRecord>,
    ) {
        match (a, b) {
            (None, None) => {}
            (None, Some(b)) => changes.push(ChangeRecord::add(
                file_id,
                key.to_string(),
                fragment_to_string(b),
            )),
            (Some(a), None) => changes.push(ChangeRecord::delete(
                file_id,
                key.to_string(),
                fragment_to_string(a),
            )),
            (Some(a), Some(b)) => {
                if !a.attributes_equal(b) {
                    changes.push(self.attribute_change(file_id, key, a, b));
                }
                let (text_a, text_b) = (a.full_text(), b.full_text());
                if text_a != text_b {
                    changes.push(self.text_change(file_id, key, text_a, text_b));
                }
            }
        }
    }

    fn attribute_change(&self, file_id: &str, key: &str, a: &Element, b: &Element) -> ChangeRecord {
        ChangeRecord::modify(
            file_id,
            format!("{key}{ATTRIBUTES_SUFFIX}"),
            format_attributes(&a.attributes),
            format_attributes(&b.attributes),
            String::new(),
        )
    }

    fn text_change(&self, file_id: &str, key: &str, old: String, new: String) -> ChangeRecord {
        let focused = focused_changes(
            &old,
            &new,
            self.config.context_words,
            self.config.preview_chars,
        );
        ChangeRecord::modify(file_id, key.to_string(), old, new, focused)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::ChangeType;
    use crate::xml::parse_str;

    fn diff(a: &str, b: &str) -> Vec<ChangeRecord> {
        let a = parse_str(a).unwrap();
        let b = parse_str(b).unwrap();
        DiffEngine::default().diff_trees("doc", &a, &b)
    }

    #[test]
    fn test_identical_documents() {
        let xml = r#"<document><s id="1"><p>one <b>two</b> three</p></s><t>x</t></document>"#;
        assert!(diff(xml, xml).is_empty());
    }

    #[test]
    fn test_title_text_change() {
        let changes = diff(
            "<document><title>Hello</title></document>",
            "<document><title>Hello World</title></document>",
        );
        assert_eq!(changes.len(), 1);
        let c = &changes[0];
        assert_eq!(c.change_type, ChangeType::Modify);
        assert_eq!(c.xml_path, "/document/title");
        assert_eq!(c.old_content, "Hello");
        assert_eq!(c.new_content, "Hello World");
        assert_eq!(c.focused_changes, "ADDED: 'Hello [World]'");
        assert_eq!(c.file_id, "doc");
    }

    #[test]
    fn test_attribute_change() {
        let changes = diff(
            r#"<document><s id="1" lang="en">x</s></document>"#,
            r#"<document><s lang="fr" id="1">x</s></document>"#,
        );
        assert_eq!(changes.len(), 1);
        let c = &changes[0];
        assert_eq!(c.xml_path, "/document/s[@id='1']/@attributes");
        assert_eq!(c.old_content, r#"{id="1", lang="en"}"#);
        assert_eq!(c.new_content, r#"{id="1", lang="fr"}"#);
        assert_eq!(c.section_id, "doc");
    }

    #[test]
    fn test_added_and_deleted_nodes() {
        let changes = diff(
            r#"<document><a/><s id="x"><p>t</p></s></document>"#,
            r#"<document><a/><b>new</b></document>"#,
        );
        let summary: Vec<(ChangeType, &str)> = changes
            .iter()
            .map(|c| (c.change_type, c.xml_path.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (ChangeType::Delete, "/document/s[@id='x']"),
                (ChangeType::Delete, "/document/s[@id='x']/p"),
                (ChangeType::Add, "/document/b"),
            ]
        );
        assert_eq!(changes[0].old_content, r#"<s id="x"><p>t</p></s>"#);
        assert!(changes.iter().all(|c| c.section_id == "doc"));
        assert_eq!(changes[2].new_content, "<b>new</b>");
        assert!(changes[2].old_content.is_empty());
    }

    #[test]
    fn test_nested_text_change_reported_at_each_level() {
        let changes = diff(
            "<document><s><t>a</t></s></document>",
            "<document><s><t>b</t></s></document>",
        );
        let paths: Vec<&str> = changes.iter().map(|c| c.xml_path.as_str()).collect();
        assert_eq!(paths, vec!["/document/s", "/document/s/t"]);
    }

    #[test]
    fn test_root_direct_text_and_attributes() {
        let changes = diff(
            r#"<document v="1">intro<t>x</t></document>"#,
            r#"<document v="2">outro<t>x</t></document>"#,
        );
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].xml_path, "/document/@attributes");
        assert_eq!(changes[1].xml_path, "/document");
        assert_eq!(changes[1].old_content, "intro");
        assert_eq!(changes[1].new_content, "outro");
    }

    #[test]
    fn test_colliding_siblings_compared_one_to_one() {
        let changes = diff(
            "<document><p>one</p><p>two</p></document>",
            "<document><p>one</p><p>TWO</p></document>",
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::Modify);
        assert_eq!(changes[0].xml_path, "/document/p");
        assert_eq!(changes[0].old_content, "two");
        assert_eq!(changes[0].new_content, "TWO");
    }

    #[test]
    fn test_extra_colliding_sibling_is_added() {
        let changes = diff(
            "<document><p>a</p></document>",
            "<document><p>a</p><p>b</p></document>",
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].change_type, ChangeType::Add);
        assert_eq!(changes[0].xml_path, "/document/p");
        assert_eq!(changes[0].new_content, "<p>b</p>");
    }

    #[test]
    fn test_renamed_root_reports_descendants() {
        let changes = diff("<document><t>x</t></document>", "<doc><t>x</t></doc>");
        let summary: Vec<(ChangeType, &str)> = changes
            .iter()
            .map(|c| (c.change_type, c.xml_path.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![(ChangeType::Delete, "/document/t"), (ChangeType::Add, "/doc/t")]
        );
    }

    #[test]
    fn test_counts_by_type() {
        let changes = diff(
            r#"<document><a>1</a><s id="x"><p>t</p></s></document>"#,
            r#"<document><a>2</a><b>new</b></document>"#,
        );
        let report = DiffReport {
            changes,
            ..DiffReport::default()
        };
        let counts: Vec<(&str, usize)> = report.counts_by_type().into_iter().collect();
        assert_eq!(counts, vec![("ADD", 1), ("DELETE", 2), ("MODIFY", 1)]);
        assert!(DiffReport::default().counts_by_type().is_empty());
    }

    #[test]
    fn test_rediff_has_no_modify() {
        let xml = "<document><s>lead <em>mid</em> tail</s></document>";
        let doc = parse_str(xml).unwrap();
        let engine = DiffEngine::default();
        assert!(engine.diff_trees("d", &doc, &doc).is_empty());
        let reparsed = parse_str(&crate::xml::print_to_string(&doc)).unwrap();
        assert!(engine
            .diff_trees("d", &doc, &reparsed)
            .iter()
            .all(|c| c.change_type != ChangeType::Modify));
    }

    #[test]
    fn test_context_words_configurable() {
        let engine = DiffEngine::new(DiffConfig {
            context_words: 0,
            ..DiffConfig::default()
        });
        let a = parse_str("<document><t>the quick fox</t></document>").unwrap();
        let b = parse_str("<document><t>the slow fox</t></document>").unwrap();
        let changes = engine.diff_trees("d", &a, &b);
        assert_eq!(changes[0].focused_changes, "CHANGED: '[quick]' → '[slow]'");
    }
}

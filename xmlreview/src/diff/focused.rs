//! Word-level summaries of text changes.
//!
//! Both texts are split on whitespace and compared with an LCS diff; every
//! non-equal run is rendered with a few words of surrounding context and the
//! changed words in brackets.

use similar::{capture_diff_slices, Algorithm, DiffTag};

use crate::constants::NO_WORD_CHANGES;

/// Summarizes what changed between `old` and `new`.
///
/// `context_words` words are shown on each side of a change; when one side
/// is empty the other is previewed up to `preview_chars` characters.
pub fn focused_changes(old: &str, new: &str, context_words: usize, preview_chars: usize) -> String {
    let (old, new) = (old.trim(), new.trim());
    match (old.is_empty(), new.is_empty()) {
        (true, true) => return String::new(),
        (true, false) => return format!("ADDED: {}", preview(new, preview_chars)),
        (false, true) => return format!("REMOVED: {}", preview(old, preview_chars)),
        (false, false) => {}
    }

    let old_words: Vec<&str> = old.split_whitespace().collect();
    let new_words: Vec<&str> = new.split_whitespace().collect();

    let mut segments = Vec::new();
    for op in capture_diff_slices(Algorithm::Lcs, &old_words, &new_words) {
        let (tag, old_range, new_range) = op.as_tag_tuple();
        match tag {
            DiffTag::Equal => {}
            DiffTag::Replace => segments.push(format!(
                "CHANGED: '{}' → '{}'",
                in_context(&old_words, old_range, context_words),
                in_context(&new_words, new_range, context_words),
            )),
            DiffTag::Delete => segments.push(format!(
                "REMOVED: '{}'",
                in_context(&old_words, old_range, context_words)
            )),
            DiffTag::Insert => segments.push(format!(
                "ADDED: '{}'",
                in_context(&new_words, new_range, context_words)
            )),
        }
    }

    if segments.is_empty() {
        NO_WORD_CHANGES.to_string()
    } else {
        segments.join(", ")
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// `before [changed] after`, with up to `context` words on each side.
fn in_context(words: &[&str], range: std::ops::Range<usize>, context: usize) -> String {
    let before = &words[range.start.saturating_sub(context)..range.start];
    let changed = &words[range.clone()];
    let after = &words[range.end..(range.end + context).min(words.len())];

    let mut parts = Vec::with_capacity(3);
    if !before.is_empty() {
        parts.push(before.join(" "));
    }
    parts.push(format!("[{}]", changed.join(" ")));
    if !after.is_empty() {
        parts.push(after.join(" "));
    }
    parts.join(" ")
}

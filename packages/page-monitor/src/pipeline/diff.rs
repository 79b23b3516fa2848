//! Unified diff between two snapshots, plus a short preview snippet.

use serde::{Deserialize, Serialize};
use similar::{ChangeTag, TextDiff};

/// Lines of unchanged context around each hunk.
pub const CONTEXT_LINES: usize = 3;

pub const OLD_LABEL: &str = "previous";
pub const NEW_LABEL: &str = "current";

/// Default snippet length in characters.
pub const DEFAULT_SNIPPET_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResult {
    /// Unified diff labeled `previous`/`current`
    pub unified: String,

    /// Lines added (`+`), headers excluded
    pub added: usize,

    /// Lines removed (`-`), headers excluded
    pub removed: usize,

    /// `added > 0 || removed > 0`
    pub has_changes: bool,

    /// Changed lines for list previews, at most [`DEFAULT_SNIPPET_LEN`] chars plus `...`
    pub snippet: String,
}

/// Diff `old` against `new` line by line.
pub fn compute_diff(old: &str, new: &str) -> DiffResult {
    let diff = TextDiff::from_lines(old, new);

    let (mut added, mut removed) = (0, 0);
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => removed += 1,
            ChangeTag::Equal => {}
        }
    }

    let unified = diff
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(OLD_LABEL, NEW_LABEL)
        .to_string();
    let snippet = extract_snippet(&unified, DEFAULT_SNIPPET_LEN);

    DiffResult {
        unified,
        added,
        removed,
        has_changes: added > 0 || removed > 0,
        snippet,
    }
}

/// Changed lines of a unified diff, space-joined and cut to `max_len`
/// characters. `...` is appended only when something was cut.
pub fn extract_snippet(unified: &str, max_len: usize) -> String {
    let mut snippet = String::new();
    let mut in_hunk = false;

    for line in unified.lines() {
        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }
        // `---`/`+++` before the first hunk are file headers
        if !in_hunk || !(line.starts_with('+') || line.starts_with('-')) {
            continue;
        }
        if !snippet.is_empty() {
            snippet.push(' ');
        }
        snippet.push_str(line);
        if snippet.chars().count() > max_len {
            break;
        }
    }

    match snippet.char_indices().nth(max_len) {
        Some((cut, _)) => {
            snippet.truncate(cut);
            snippet.push_str("...");
            snippet
        }
        None => snippet,
    }
}

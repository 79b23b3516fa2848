//! Change detection by exact digest comparison.
//!
//! Input text is already whitespace-normalized by the extractor, so no
//! further normalization happens here: any visible edit, including case
//! and punctuation, changes the digest.

use sha2::{Digest, Sha256};

/// Hex SHA-256 of `text` (64 lowercase hex characters).
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Exact digest inequality. A first observation (`previous == None`) is
/// not a change.
pub fn has_changed(previous: Option<&str>, current: &str) -> bool {
    previous.is_some_and(|previous| previous != current)
}

/// How a new digest relates to the prior observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// No prior observation exists
    Baseline,
    Unchanged,
    Changed,
}

pub fn classify(previous: Option<&str>, current: &str) -> ChangeKind {
    match previous {
        None => ChangeKind::Baseline,
        Some(_) if has_changed(previous, current) => ChangeKind::Changed,
        Some(_) => ChangeKind::Unchanged,
    }
}

//! Storage collaborator.
//!
//! The pipeline only ever reads the most recent snapshot. Recording checks
//! and listing history exist for callers that persist outcomes.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::types::{CheckRecord, Link, Snapshot};

/// Number of check records retained per target by the bundled stores.
pub const MAX_CHECKS_PER_TARGET: usize = 5;

/// Links a registry may hold.
pub const MAX_LINKS: usize = 8;

/// Result of [`LinkStore::insert_link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkInsert {
    Inserted,
    /// A link with the same URL exists
    Duplicate,
    /// The registry already holds `limit` links
    LimitReached,
}

/// Trim a newest-first history to `retention` records.
///
/// The newest successful record is never pruned: when it falls outside the
/// window it replaces the oldest kept record, so a streak of failures cannot
/// erase the prior snapshot. With a retention of 1 both records survive.
pub fn prune_history(history: &mut Vec<CheckRecord>, retention: usize) {
    let retention = retention.max(1);
    if history.len() <= retention {
        return;
    }

    match history.iter().position(|r| r.snapshot().is_some()) {
        Some(last_good) if last_good >= retention => {
            let good = history.remove(last_good);
            history.truncate((retention - 1).max(1));
            history.push(good);
        }
        _ => history.truncate(retention),
    }
}

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist one check record.
    async fn record_check(&self, record: &CheckRecord) -> StoreResult<()>;

    /// Check records for a target, newest first.
    async fn history(&self, target_id: &str) -> StoreResult<Vec<CheckRecord>>;

    /// The newest successful observation of a target.
    ///
    /// Failed checks are skipped.
    async fn most_recent_snapshot(&self, target_id: &str) -> StoreResult<Option<Snapshot>> {
        Ok(self
            .history(target_id)
            .await?
            .iter()
            .find_map(CheckRecord::snapshot))
    }

    /// Liveness check for status reporting.
    async fn health(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Registry of monitored links.
///
/// Check history for a link is keyed by [`Link::id`].
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// All links, newest first.
    async fn links(&self) -> StoreResult<Vec<Link>>;

    /// Add `link` unless its URL is already registered or `limit` links
    /// exist. Both checks and the insert happen atomically.
    async fn insert_link(&self, link: &Link, limit: usize) -> StoreResult<LinkInsert>;

    /// Delete a link together with its check history.
    async fn remove_link(&self, id: &str) -> StoreResult<Option<Link>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CheckStatus, PipelineOutcome};
    use chrono::Utc;

    fn good(text: &str) -> CheckRecord {
        CheckRecord::from_outcome(&PipelineOutcome::unchanged(
            "t1",
            Snapshot::new(text, Utc::now()),
            None,
        ))
    }

    fn failed() -> CheckRecord {
        CheckRecord::from_outcome(&PipelineOutcome::failed("t1", "HTTP 503"))
    }

    #[test]
    fn test_prune_keeps_newest_records() {
        let mut history: Vec<_> = ["e", "d", "c", "b", "a"].into_iter().map(good).collect();
        prune_history(&mut history, 3);

        let texts: Vec<_> = history.iter().filter_map(|r| r.raw_text.as_deref()).collect();
        assert_eq!(texts, vec!["e", "d", "c"]);
    }

    #[test]
    fn test_prune_keeps_last_good_behind_failures() {
        let mut history: Vec<_> = (0..5).map(|_| failed()).collect();
        history.push(good("last good"));
        history.push(good("older"));
        prune_history(&mut history, 5);

        assert_eq!(history.len(), 5);
        assert!(history[..4].iter().all(|r| r.status == CheckStatus::Failed));
        assert_eq!(history[4].raw_text.as_deref(), Some("last good"));
    }

    #[test]
    fn test_prune_all_failures() {
        let mut history: Vec<_> = (0..7).map(|_| failed()).collect();
        prune_history(&mut history, 5);
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn test_prune_retention_of_one() {
        let mut history = vec![failed(), failed(), good("kept")];
        prune_history(&mut history, 1);

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].status, CheckStatus::Failed);
        assert_eq!(history[1].raw_text.as_deref(), Some("kept"));
    }
}

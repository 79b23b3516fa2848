//! In-memory check and link store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::traits::store::{
    prune_history, LinkInsert, LinkStore, SnapshotStore, MAX_CHECKS_PER_TARGET,
};
use crate::types::{CheckRecord, Link};

/// Check records held in memory, newest first per target.
///
/// Data is lost on restart.
pub struct MemoryStore {
    checks: RwLock<HashMap<String, Vec<CheckRecord>>>,
    /// Newest first
    links: RwLock<Vec<Link>>,
    retention: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            checks: RwLock::new(HashMap::new()),
            links: RwLock::new(Vec::new()),
            retention: MAX_CHECKS_PER_TARGET,
        }
    }

    /// Keep at most `retention` records per target (minimum 1).
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    /// Total records across all targets.
    pub fn check_count(&self) -> usize {
        self.checks
            .read()
            .map(|checks| checks.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.checks.write().map_err(poisoned)?.clear();
        self.links.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn record_check(&self, record: &CheckRecord) -> StoreResult<()> {
        let mut checks = self.checks.write().map_err(poisoned)?;
        let history = checks.entry(record.target_id.clone()).or_default();
        history.insert(0, record.clone());
        prune_history(history, self.retention);
        Ok(())
    }

    async fn history(&self, target_id: &str) -> StoreResult<Vec<CheckRecord>> {
        let checks = self.checks.read().map_err(poisoned)?;
        Ok(checks
            .get(target_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl LinkStore for MemoryStore {
    async fn links(&self) -> StoreResult<Vec<Link>> {
        Ok(self.links.read().map_err(poisoned)?.clone())
    }

    async fn insert_link(&self, link: &Link, limit: usize) -> StoreResult<LinkInsert> {
        let mut links = self.links.write().map_err(poisoned)?;
        if links.iter().any(|l| l.url == link.url) {
            return Ok(LinkInsert::Duplicate);
        }
        if links.len() >= limit {
            return Ok(LinkInsert::LimitReached);
        }
        links.insert(0, link.clone());
        Ok(LinkInsert::Inserted)
    }

    async fn remove_link(&self, id: &str) -> StoreResult<Option<Link>> {
        let removed = {
            let mut links = self.links.write().map_err(poisoned)?;
            links
                .iter()
                .position(|l| l.id == id)
                .map(|index| links.remove(index))
        };
        if removed.is_some() {
            self.checks.write().map_err(poisoned)?.remove(id);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PipelineOutcome, Snapshot};
    use chrono::Utc;

    fn unchanged(target: &str, text: &str) -> CheckRecord {
        let outcome = PipelineOutcome::unchanged(target, Snapshot::new(text, Utc::now()), None);
        CheckRecord::from_outcome(&outcome)
    }

    #[tokio::test]
    async fn test_history_is_newest_first() {
        let store = MemoryStore::new();
        store.record_check(&unchanged("t1", "one")).await.unwrap();
        store.record_check(&unchanged("t1", "two")).await.unwrap();

        let history = store.history("t1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].raw_text.as_deref(), Some("two"));
        assert_eq!(history[1].raw_text.as_deref(), Some("one"));
    }

    #[tokio::test]
    async fn test_retention_limit() {
        let store = MemoryStore::new();
        for n in 0..8 {
            store
                .record_check(&unchanged("t1", &format!("v{}", n)))
                .await
                .unwrap();
        }

        let history = store.history("t1").await.unwrap();
        assert_eq!(history.len(), MAX_CHECKS_PER_TARGET);
        assert_eq!(history[0].raw_text.as_deref(), Some("v7"));
        assert_eq!(history[4].raw_text.as_deref(), Some("v3"));
    }

    #[tokio::test]
    async fn test_targets_are_separate() {
        let store = MemoryStore::new().with_retention(2);
        store.record_check(&unchanged("a", "x")).await.unwrap();
        store.record_check(&unchanged("b", "y")).await.unwrap();

        assert_eq!(store.history("a").await.unwrap().len(), 1);
        assert_eq!(store.check_count(), 2);
        assert!(store.history("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_check_is_skipped_for_snapshot() {
        let store = MemoryStore::new();
        store.record_check(&unchanged("t1", "good")).await.unwrap();
        store
            .record_check(&CheckRecord::from_outcome(&PipelineOutcome::failed("t1", "HTTP 503")))
            .await
            .unwrap();

        let snapshot = store.most_recent_snapshot("t1").await.unwrap().unwrap();
        assert_eq!(snapshot.text, "good");
    }

    #[tokio::test]
    async fn test_failures_do_not_evict_last_snapshot() {
        let store = MemoryStore::new();
        store.record_check(&unchanged("t1", "good")).await.unwrap();
        for _ in 0..(MAX_CHECKS_PER_TARGET + 2) {
            store
                .record_check(&CheckRecord::from_outcome(&PipelineOutcome::failed("t1", "HTTP 503")))
                .await
                .unwrap();
        }

        let history = store.history("t1").await.unwrap();
        assert_eq!(history.len(), MAX_CHECKS_PER_TARGET);
        assert_eq!(history[0].status, crate::types::CheckStatus::Failed);
        let snapshot = store.most_recent_snapshot("t1").await.unwrap().unwrap();
        assert_eq!(snapshot.text, "good");
    }

    #[tokio::test]
    async fn test_insert_link_rules() {
        let store = MemoryStore::new();
        let first = Link::new("https://example.com/a", Some("A"), None);

        assert_eq!(store.insert_link(&first, 2).await.unwrap(), LinkInsert::Inserted);
        let again = Link::new("https://example.com/a", None, None);
        assert_eq!(store.insert_link(&again, 2).await.unwrap(), LinkInsert::Duplicate);

        let second = Link::new("https://example.com/b", None, None);
        assert_eq!(store.insert_link(&second, 2).await.unwrap(), LinkInsert::Inserted);
        let third = Link::new("https://example.com/c", None, None);
        assert_eq!(store.insert_link(&third, 2).await.unwrap(), LinkInsert::LimitReached);

        let urls: Vec<_> = store.links().await.unwrap().into_iter().map(|l| l.url).collect();
        assert_eq!(urls, vec!["https://example.com/b", "https://example.com/a"]);
    }

    #[tokio::test]
    async fn test_remove_link_drops_history() {
        let store = MemoryStore::new();
        let link = Link::new("https://example.com/a", None, None);
        store.insert_link(&link, 8).await.unwrap();
        store.record_check(&unchanged(&link.id, "x")).await.unwrap();
        store.record_check(&unchanged("other", "y")).await.unwrap();

        let removed = store.remove_link(&link.id).await.unwrap();
        assert_eq!(removed, Some(link.clone()));
        assert!(store.history(&link.id).await.unwrap().is_empty());
        assert_eq!(store.check_count(), 1);
        assert_eq!(store.remove_link(&link.id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_clear() {
        let store = MemoryStore::new();
        store.record_check(&unchanged("t1", "x")).await.unwrap();
        store.clear().unwrap();

        assert_eq!(store.check_count(), 0);
    }
}

//! JSON-file check and link store.
//!
//! The whole store is one JSON object: `links` (newest first) and `checks`
//! mapping target id to its records, newest first. Writes go to a sibling
//! temp file and are renamed into place.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::StoreResult;
use crate::traits::store::{
    prune_history, LinkInsert, LinkStore, SnapshotStore, MAX_CHECKS_PER_TARGET,
};
use crate::types::{CheckRecord, Link};

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    links: Vec<Link>,

    #[serde(default)]
    checks: BTreeMap<String, Vec<CheckRecord>>,
}

pub struct FileStore {
    path: PathBuf,
    retention: usize,
    /// Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retention: MAX_CHECKS_PER_TARGET,
            lock: Mutex::new(()),
        }
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<StoreFile> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(StoreFile::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(StoreFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, file: &StoreFile) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec_pretty(file)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn record_check(&self, record: &CheckRecord) -> StoreResult<()> {
        let _guard = self.lock.lock().await;

        let mut file = self.load().await?;
        let history = file.checks.entry(record.target_id.clone()).or_default();
        history.insert(0, record.clone());
        prune_history(history, self.retention);

        self.save(&file).await?;
        debug!(path = %self.path.display(), target_id = %record.target_id, "Check recorded");
        Ok(())
    }

    async fn history(&self, target_id: &str) -> StoreResult<Vec<CheckRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.checks.remove(target_id).unwrap_or_default())
    }

    /// Fails when the file exists but cannot be read or parsed.
    async fn health(&self) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        self.load().await.map(|_| ())
    }
}

#[async_trait]
impl LinkStore for FileStore {
    async fn links(&self) -> StoreResult<Vec<Link>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.links)
    }

    async fn insert_link(&self, link: &Link, limit: usize) -> StoreResult<LinkInsert> {
        let _guard = self.lock.lock().await;

        let mut file = self.load().await?;
        if file.links.iter().any(|l| l.url == link.url) {
            return Ok(LinkInsert::Duplicate);
        }
        if file.links.len() >= limit {
            return Ok(LinkInsert::LimitReached);
        }
        file.links.insert(0, link.clone());

        self.save(&file).await?;
        debug!(path = %self.path.display(), link_id = %link.id, "Link added");
        Ok(LinkInsert::Inserted)
    }

    async fn remove_link(&self, id: &str) -> StoreResult<Option<Link>> {
        let _guard = self.lock.lock().await;

        let mut file = self.load().await?;
        let Some(index) = file.links.iter().position(|l| l.id == id) else {
            return Ok(None);
        };
        let link = file.links.remove(index);
        file.checks.remove(id);

        self.save(&file).await?;
        debug!(path = %self.path.display(), link_id = %id, "Link removed");
        Ok(Some(link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::types::{PipelineOutcome, Snapshot};
    use chrono::Utc;
    use tempfile::TempDir;

    fn unchanged(target: &str, text: &str) -> CheckRecord {
        let outcome = PipelineOutcome::unchanged(target, Snapshot::new(text, Utc::now()), None);
        CheckRecord::from_outcome(&outcome)
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("checks.json"));

        assert!(store.history("t1").await.unwrap().is_empty());
        tokio_test::assert_ok!(store.health().await);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("checks.json");

        let store = FileStore::new(&path);
        store.record_check(&unchanged("t1", "first")).await.unwrap();
        store.record_check(&unchanged("t1", "second")).await.unwrap();

        let reopened = FileStore::new(&path);
        let history = reopened.history("t1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].raw_text.as_deref(), Some("second"));

        let snapshot = reopened.most_recent_snapshot("t1").await.unwrap().unwrap();
        assert_eq!(snapshot.text, "second");
    }

    #[tokio::test]
    async fn test_retention_limit() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("checks.json")).with_retention(2);
        for text in ["a", "b", "c"] {
            store.record_check(&unchanged("t1", text)).await.unwrap();
        }

        let history = store.history("t1").await.unwrap();
        let texts: Vec<_> = history.iter().filter_map(|r| r.raw_text.as_deref()).collect();
        assert_eq!(texts, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_failures_do_not_evict_last_snapshot() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("checks.json"));
        store.record_check(&unchanged("t1", "good")).await.unwrap();
        for _ in 0..MAX_CHECKS_PER_TARGET {
            let failed = PipelineOutcome::failed("t1", "HTTP 503");
            store.record_check(&CheckRecord::from_outcome(&failed)).await.unwrap();
        }

        let history = store.history("t1").await.unwrap();
        assert_eq!(history.len(), MAX_CHECKS_PER_TARGET);
        let snapshot = store.most_recent_snapshot("t1").await.unwrap().unwrap();
        assert_eq!(snapshot.text, "good");
    }

    #[tokio::test]
    async fn test_links_survive_reopen_and_removal_drops_history() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checks.json");
        let store = FileStore::new(&path);

        let link = Link::new("https://example.com/pricing", Some(" Pricing "), Some(""));
        assert_eq!(store.insert_link(&link, 8).await.unwrap(), LinkInsert::Inserted);
        store.record_check(&unchanged(&link.id, "v1")).await.unwrap();

        let reopened = FileStore::new(&path);
        let links = reopened.links().await.unwrap();
        assert_eq!(links, vec![link.clone()]);
        assert_eq!(links[0].label.as_deref(), Some("Pricing"));
        assert_eq!(links[0].tags, None);
        assert_eq!(
            reopened.insert_link(&Link::new(&link.url, None, None), 8).await.unwrap(),
            LinkInsert::Duplicate
        );

        assert_eq!(reopened.remove_link(&link.id).await.unwrap(), Some(link.clone()));
        assert!(reopened.links().await.unwrap().is_empty());
        assert!(reopened.history(&link.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_link_limit() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("checks.json"));
        for n in 0..2 {
            let link = Link::new(format!("https://example.com/{}", n), None, None);
            assert_eq!(store.insert_link(&link, 2).await.unwrap(), LinkInsert::Inserted);
        }

        let extra = Link::new("https://example.com/extra", None, None);
        assert_eq!(store.insert_link(&extra, 2).await.unwrap(), LinkInsert::LimitReached);
        assert_eq!(store.links().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_unhealthy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("checks.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = FileStore::new(&path);

        assert!(matches!(store.health().await, Err(StoreError::Serde(_))));
        assert!(store.history("t1").await.is_err());
    }
}

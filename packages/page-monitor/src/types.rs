//! Value types passed between the pipeline and its callers.
//!
//! Everything here is immutable once produced and owned by whoever holds it;
//! nothing is shared between concurrent runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::diff::DiffResult;

/// Summary attached to the first successful check of a target.
pub const BASELINE_SUMMARY: &str =
    "First snapshot captured — changes will be tracked from this point.";

/// A monitored page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub url: String,
}

impl Target {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }

    /// Target identified by its own URL.
    pub fn for_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            id: url.clone(),
            url,
        }
    }
}

/// A page registered for monitoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,

    /// Canonical form of the validated URL
    pub url: String,

    pub label: Option<String>,

    /// Free-form, e.g. `pricing, competitors`
    pub tags: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl Link {
    /// New link with a fresh id. Blank label and tags are dropped.
    pub fn new(url: impl Into<String>, label: Option<&str>, tags: Option<&str>) -> Self {
        let non_blank = |s: Option<&str>| {
            s.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            url: url.into(),
            label: non_blank(label),
            tags: non_blank(tags),
            created_at: Utc::now(),
        }
    }

    /// The link as a pipeline target; history is keyed by the link id.
    pub fn target(&self) -> Target {
        Target::new(&self.id, &self.url)
    }
}

/// A link with its most recent check, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStatus {
    #[serde(flatten)]
    pub link: Link,

    pub latest_check: Option<CheckRecord>,
}

impl LinkStatus {
    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.latest_check.as_ref().map(|c| c.checked_at)
    }
}

/// Normalized text of a target at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub text: String,

    /// Hex SHA-256 of `text`
    pub content_hash: String,

    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(text: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        let text = text.into();
        Self {
            content_hash: crate::pipeline::detect::content_hash(&text),
            text,
            captured_at,
        }
    }
}

/// Terminal state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// First successful observation; nothing to compare against
    Baseline,
    Unchanged,
    Changed,
    Failed,
}

/// Result of checking one target. Never an error: failures are data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub target_id: String,
    pub status: CheckStatus,
    pub has_changes: bool,
    pub summary: Option<String>,
    pub diff: Option<DiffResult>,

    /// Page title when extraction succeeded
    pub title: Option<String>,

    /// The freshly captured observation, for the caller to persist
    pub snapshot: Option<Snapshot>,

    pub checked_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl PipelineOutcome {
    fn base(target_id: &str, status: CheckStatus, checked_at: DateTime<Utc>) -> Self {
        Self {
            target_id: target_id.to_string(),
            status,
            has_changes: false,
            summary: None,
            diff: None,
            title: None,
            snapshot: None,
            checked_at,
            error: None,
        }
    }

    pub fn baseline(target_id: &str, snapshot: Snapshot, title: Option<String>) -> Self {
        Self {
            summary: Some(BASELINE_SUMMARY.to_string()),
            title,
            ..Self::base(target_id, CheckStatus::Baseline, snapshot.captured_at)
        }
        .with_snapshot(snapshot)
    }

    pub fn unchanged(target_id: &str, snapshot: Snapshot, title: Option<String>) -> Self {
        Self {
            title,
            ..Self::base(target_id, CheckStatus::Unchanged, snapshot.captured_at)
        }
        .with_snapshot(snapshot)
    }

    pub fn changed(
        target_id: &str,
        snapshot: Snapshot,
        title: Option<String>,
        diff: DiffResult,
        summary: String,
    ) -> Self {
        Self {
            has_changes: true,
            summary: Some(summary),
            diff: Some(diff),
            title,
            ..Self::base(target_id, CheckStatus::Changed, snapshot.captured_at)
        }
        .with_snapshot(snapshot)
    }

    pub fn failed(target_id: &str, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::base(target_id, CheckStatus::Failed, Utc::now())
        }
    }

    fn with_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }

    pub fn is_failed(&self) -> bool {
        self.status == CheckStatus::Failed
    }

    /// Unified diff text, if the run detected a change.
    pub fn unified_diff(&self) -> Option<&str> {
        self.diff.as_ref().map(|d| d.unified.as_str())
    }
}

/// Persisted form of a [`PipelineOutcome`].
///
/// Failed runs are stored with an empty hash and no text so they are
/// queryable but never used as the prior snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: String,
    pub target_id: String,
    pub status: CheckStatus,
    pub content_hash: String,
    pub raw_text: Option<String>,
    pub title: Option<String>,
    pub diff: Option<String>,
    pub snippet: Option<String>,
    pub added: usize,
    pub removed: usize,
    pub summary: Option<String>,
    pub has_changes: bool,
    pub error: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl CheckRecord {
    pub fn from_outcome(outcome: &PipelineOutcome) -> Self {
        let (content_hash, raw_text) = match &outcome.snapshot {
            Some(s) => (s.content_hash.clone(), Some(s.text.clone())),
            None => (String::new(), None),
        };
        let diff = outcome.diff.as_ref();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target_id: outcome.target_id.clone(),
            status: outcome.status,
            content_hash,
            raw_text,
            title: outcome.title.clone(),
            diff: diff.map(|d| d.unified.clone()),
            snippet: diff.map(|d| d.snippet.clone()),
            added: diff.map(|d| d.added).unwrap_or(0),
            removed: diff.map(|d| d.removed).unwrap_or(0),
            summary: outcome.summary.clone(),
            has_changes: outcome.has_changes,
            error: outcome.error.clone(),
            checked_at: outcome.checked_at,
        }
    }

    /// The observation this record captured, unless the run failed.
    pub fn snapshot(&self) -> Option<Snapshot> {
        if self.status == CheckStatus::Failed || self.content_hash.is_empty() {
            return None;
        }
        self.raw_text.as_ref().map(|text| Snapshot {
            text: text.clone(),
            content_hash: self.content_hash.clone(),
            captured_at: self.checked_at,
        })
    }
}

/// Health of one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub ok: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    pub fn up(latency_ms: u64) -> Self {
        Self {
            ok: true,
            latency_ms,
            error: None,
        }
    }

    pub fn down(error: impl ToString) -> Self {
        Self {
            ok: false,
            latency_ms: 0,
            error: Some(error.to_string()),
        }
    }
}

/// Operational status of the monitor and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub backend: ServiceHealth,
    pub store: ServiceHealth,
    pub llm: ServiceHealth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_outcome_has_no_snapshot() {
        let outcome = PipelineOutcome::failed("t1", "HTTP 500 for https://example.com/");

        assert!(outcome.is_failed());
        assert!(!outcome.has_changes);
        assert!(outcome.snapshot.is_none());
        assert_eq!(
            outcome.error.as_deref(),
            Some("HTTP 500 for https://example.com/")
        );
    }

    #[test]
    fn test_baseline_outcome() {
        let snapshot = Snapshot::new("hello world", Utc::now());
        let outcome = PipelineOutcome::baseline("t1", snapshot.clone(), None);

        assert_eq!(outcome.status, CheckStatus::Baseline);
        assert!(!outcome.has_changes);
        assert!(outcome.diff.is_none());
        assert!(outcome.summary.unwrap().starts_with("First snapshot captured"));
        assert_eq!(outcome.checked_at, snapshot.captured_at);
    }

    #[test]
    fn test_failed_record_is_not_a_snapshot() {
        let record = CheckRecord::from_outcome(&PipelineOutcome::failed("t1", "boom"));

        assert_eq!(record.content_hash, "");
        assert!(record.snapshot().is_none());
    }

    #[test]
    fn test_record_round_trips_snapshot() {
        let snapshot = Snapshot::new("some text", Utc::now());
        let outcome = PipelineOutcome::unchanged("t1", snapshot.clone(), Some("Title".into()));
        let record = CheckRecord::from_outcome(&outcome);

        assert_eq!(record.snapshot(), Some(snapshot));
        assert_eq!(record.title.as_deref(), Some("Title"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&CheckStatus::Baseline).unwrap();
        assert_eq!(json, "\"baseline\"");
    }
}

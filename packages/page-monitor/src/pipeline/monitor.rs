//! The Monitor - runs the change-detection pipeline per target.
//!
//! Stages run strictly in order: validate, fetch, extract, hash, then diff
//! and summarize only when the digest moved. Every stage failure becomes a
//! failed [`PipelineOutcome`]; nothing is propagated to the caller.
//!
//! The monitor holds no mutable state between runs. The prior snapshot comes
//! from the store, so runs for different targets can proceed concurrently.

use futures::StreamExt;
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

use crate::config::MonitorConfig;
use crate::error::{FetchResult, LinkError, LinkResult, Result, StoreResult};
use crate::fetchers::HttpFetcher;
use crate::pipeline::detect::{classify, ChangeKind};
use crate::pipeline::diff::compute_diff;
use crate::pipeline::readable::extract_readable_text;
use crate::pipeline::summarize::Summarizer;
use crate::security::UrlValidator;
use crate::traits::fetcher::Fetcher;
use crate::traits::store::{LinkInsert, LinkStore, SnapshotStore, MAX_LINKS};
use crate::types::{
    CheckRecord, Link, LinkStatus, PipelineOutcome, ServiceHealth, Snapshot, StatusReport,
    Target,
};

/// Change-detection pipeline over a fetcher and a snapshot store.
///
/// # Example
///
/// ```rust,ignore
/// let monitor = Monitor::from_config(&MonitorConfig::from_env()?, MemoryStore::new())?;
///
/// let outcome = monitor.check_and_record(&Target::for_url("https://example.com/")).await;
/// if outcome.has_changes {
///     println!("{}", outcome.summary.unwrap_or_default());
/// }
/// ```
pub struct Monitor<F: Fetcher, S: SnapshotStore> {
    validator: UrlValidator,
    fetcher: F,
    store: S,
    summarizer: Summarizer,
    concurrency: usize,
}

impl<S: SnapshotStore> Monitor<HttpFetcher, S> {
    /// HTTP fetcher and OpenRouter summarizer built from `config`.
    ///
    /// The same validator guards the initial URL and every redirect hop.
    pub fn from_config(config: &MonitorConfig, store: S) -> FetchResult<Self> {
        let validator = UrlValidator::new();
        let fetcher = HttpFetcher::with_validator(config.fetch.clone(), validator.clone())?;
        let summarizer = Summarizer::from_config(config.summarizer.clone());

        Ok(Self::new(fetcher, store, summarizer)
            .with_validator(validator)
            .with_concurrency(config.concurrency))
    }
}

impl<F: Fetcher, S: SnapshotStore> Monitor<F, S> {
    pub fn new(fetcher: F, store: S, summarizer: Summarizer) -> Self {
        Self {
            validator: UrlValidator::new(),
            fetcher,
            store,
            summarizer,
            concurrency: 1,
        }
    }

    pub fn with_validator(mut self, validator: UrlValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Targets checked at once by [`check_all`](Self::check_all). Minimum 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    /// Run the pipeline for one target without persisting anything.
    pub async fn check(&self, target: &Target) -> PipelineOutcome {
        let span = info_span!("check", target_id = %target.id);
        async {
            let start = Instant::now();
            match self.run(target).await {
                Ok(outcome) => {
                    info!(
                        url = %target.url,
                        status = ?outcome.status,
                        has_changes = outcome.has_changes,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Check complete"
                    );
                    outcome
                }
                Err(e) => {
                    warn!(
                        url = %target.url,
                        error = %e,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Check failed"
                    );
                    PipelineOutcome::failed(&target.id, e)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Run the pipeline and record the outcome, failures included.
    ///
    /// A store write failure is logged and does not alter the outcome.
    pub async fn check_and_record(&self, target: &Target) -> PipelineOutcome {
        let outcome = self.check(target).await;
        if let Err(e) = self.store.record_check(&CheckRecord::from_outcome(&outcome)).await {
            warn!(target_id = %target.id, error = %e, "Failed to record check");
        }
        outcome
    }

    /// Check and record every target, at most `concurrency` at a time.
    ///
    /// Results are in input order. One target failing never affects another.
    pub async fn check_all(&self, targets: &[Target]) -> Vec<PipelineOutcome> {
        debug!(
            targets = targets.len(),
            concurrency = self.concurrency,
            "Checking batch"
        );

        futures::stream::iter(targets)
            .map(|target| self.check_and_record(target))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    /// Health of the monitor, its store and the LLM backend.
    pub async fn status(&self) -> StatusReport {
        let store = async {
            let start = Instant::now();
            match self.store.health().await {
                Ok(()) => ServiceHealth::up(start.elapsed().as_millis() as u64),
                Err(e) => ServiceHealth::down(e),
            }
        };
        let llm = async {
            match self.summarizer.check_health().await {
                Ok(latency_ms) => ServiceHealth::up(latency_ms),
                Err(e) => ServiceHealth::down(e),
            }
        };
        let (store, llm) = tokio::join!(store, llm);

        StatusReport {
            backend: ServiceHealth::up(0),
            store,
            llm,
        }
    }

    async fn run(&self, target: &Target) -> Result<PipelineOutcome> {
        let url = self.validator.validate(&target.url)?;

        let start = Instant::now();
        let page = self.fetcher.fetch(&url).await?;
        debug!(
            fetcher = self.fetcher.name(),
            status = page.status,
            final_url = %page.final_url,
            bytes = page.html.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Page fetched"
        );

        let readable = extract_readable_text(&page.html, &page.final_url)?;
        let title = Some(readable.title).filter(|t| !t.is_empty());
        let snapshot = Snapshot::new(readable.text, page.fetched_at);

        let previous = self.store.most_recent_snapshot(&target.id).await?;
        let kind = classify(
            previous.as_ref().map(|p| p.content_hash.as_str()),
            &snapshot.content_hash,
        );
        debug!(kind = ?kind, hash = %snapshot.content_hash, "Content hashed");

        let previous = match (kind, previous) {
            (ChangeKind::Changed, Some(previous)) => previous,
            (ChangeKind::Unchanged, _) => {
                return Ok(PipelineOutcome::unchanged(&target.id, snapshot, title))
            }
            _ => return Ok(PipelineOutcome::baseline(&target.id, snapshot, title)),
        };

        let diff = compute_diff(&previous.text, &snapshot.text);
        if !diff.has_changes {
            warn!(
                previous_hash = %previous.content_hash,
                hash = %snapshot.content_hash,
                "Digests differ but the diff has no changed lines"
            );
        }

        let summary = self.summarizer.summarize(&diff.unified, url.as_str()).await;
        Ok(PipelineOutcome::changed(
            &target.id, snapshot, title, diff, summary,
        ))
    }
}

/// Link registry. Registered links are checked under their id, so renaming
/// the label never splits history.
impl<F: Fetcher, S: SnapshotStore + LinkStore> Monitor<F, S> {
    /// Register a URL for monitoring, stored in canonical form.
    ///
    /// Rejects URLs the validator rejects, URLs already registered, and any
    /// addition past [`MAX_LINKS`].
    pub async fn add_link(
        &self,
        url: &str,
        label: Option<&str>,
        tags: Option<&str>,
    ) -> LinkResult<Link> {
        let url = self.validator.validate(url.trim())?;
        let link = Link::new(url.as_str(), label, tags);

        match self.store.insert_link(&link, MAX_LINKS).await? {
            LinkInsert::Inserted => {
                info!(link_id = %link.id, url = %link.url, "Link added");
                Ok(link)
            }
            LinkInsert::Duplicate => Err(LinkError::Duplicate { url: link.url }),
            LinkInsert::LimitReached => Err(LinkError::LimitReached { max: MAX_LINKS }),
        }
    }

    /// Every registered link with its most recent check, newest link first.
    pub async fn list_links(&self) -> StoreResult<Vec<LinkStatus>> {
        let links = self.store.links().await?;
        let mut statuses = Vec::with_capacity(links.len());
        for link in links {
            let latest_check = self.store.history(&link.id).await?.into_iter().next();
            statuses.push(LinkStatus { link, latest_check });
        }
        Ok(statuses)
    }

    /// Look a link up by id or URL.
    pub async fn find_link(&self, key: &str) -> StoreResult<Option<Link>> {
        let key = key.trim();
        let canonical = Url::parse(key).ok().map(String::from);

        Ok(self.store.links().await?.into_iter().find(|link| {
            link.id == key || link.url == key || canonical.as_deref() == Some(link.url.as_str())
        }))
    }

    /// Unregister a link by id or URL. Its check history goes with it.
    pub async fn remove_link(&self, key: &str) -> LinkResult<Link> {
        let not_found = || LinkError::NotFound(key.trim().to_string());

        let link = self.find_link(key).await?.ok_or_else(not_found)?;
        let removed = self.store.remove_link(&link.id).await?.ok_or_else(not_found)?;

        info!(link_id = %removed.id, url = %removed.url, "Link removed");
        Ok(removed)
    }

    /// Check and record every registered link.
    pub async fn check_links(&self) -> StoreResult<Vec<PipelineOutcome>> {
        let targets: Vec<Target> = self.store.links().await?.iter().map(Link::target).collect();
        info!(links = targets.len(), "Checking registered links");
        Ok(self.check_all(&targets).await)
    }
}

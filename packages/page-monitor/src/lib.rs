//! Web Page Change Detection
//!
//! Re-fetches monitored pages, decides whether their visible text changed
//! since the last observation, and explains the change with an LLM.
//!
//! # Pipeline
//!
//! ```text
//! Target -> UrlValidator -> Fetcher -> readable text -> SHA-256
//!        -> (changed) unified diff + snippet -> Summarizer -> PipelineOutcome
//! ```
//!
//! Failures never escape [`Monitor::check`]; they come back as a failed
//! [`PipelineOutcome`] carrying the error message. Summarizer failures only
//! degrade the summary to [`SUMMARY_UNAVAILABLE`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use page_monitor::{Monitor, MonitorConfig, Target};
//! use page_monitor::stores::MemoryStore;
//!
//! let monitor = Monitor::from_config(&MonitorConfig::from_env()?, MemoryStore::new())?;
//! let outcomes = monitor
//!     .check_all(&[Target::for_url("https://example.com/")])
//!     .await;
//!
//! // Or register links once and check them all
//! monitor.add_link("https://example.com/pricing", Some("Pricing"), None).await?;
//! let outcomes = monitor.check_links().await?;
//! ```
//!
//! # Modules
//!
//! - [`security`] - SSRF validation
//! - [`fetchers`] - HTTP fetcher
//! - [`pipeline`] - Extraction, detection, diffing, summarizing, orchestration
//! - [`stores`] - Check-record and link stores (memory, JSON file)
//! - [`traits`] - Fetcher, chat backend and store abstractions
//! - [`testing`] - Mock fetcher and chat backend

pub mod ai;
pub mod config;
pub mod error;
pub mod fetchers;
pub mod pipeline;
pub mod security;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

pub use config::{FetchConfig, MonitorConfig, SummarizerConfig};
pub use error::{
    ConfigError, ExtractionError, FetchError, LinkError, LinkResult, MonitorError, StoreError,
    SummaryError, ValidationError,
};
pub use fetchers::HttpFetcher;
pub use pipeline::{
    compute_diff, content_hash, extract_readable_text, extract_snippet, has_changed, DiffResult,
    Monitor, ReadableText, Summarizer, SUMMARY_UNAVAILABLE,
};
pub use secrecy::SecretString;
pub use security::UrlValidator;
pub use traits::{
    fetcher::{Fetcher, RawPage},
    llm::ChatBackend,
    store::{LinkInsert, LinkStore, SnapshotStore, MAX_CHECKS_PER_TARGET, MAX_LINKS},
};
pub use types::{
    CheckRecord, CheckStatus, Link, LinkStatus, PipelineOutcome, ServiceHealth, Snapshot,
    StatusReport, Target, BASELINE_SUMMARY,
};

//! Typed errors for the change-detection pipeline.
//!
//! One enum per failure domain. The orchestrator turns every one of them
//! into a failed [`PipelineOutcome`](crate::types::PipelineOutcome) instead of
//! propagating it, so these are mostly seen by callers of individual stages.

use thiserror::Error;

/// Errors from any stage, for callers driving stages by hand.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// URL rejected before any network access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Not an absolute URL
    #[error("Invalid URL format")]
    InvalidFormat,

    /// Explicitly dangerous scheme (file, ftp, data, javascript)
    #[error("Protocol \"{0}:\" is not allowed")]
    BlockedScheme(String),

    /// Any other non-HTTP(S) scheme
    #[error("Only HTTP and HTTPS URLs are supported (got \"{0}:\")")]
    UnsupportedScheme(String),

    /// http(s) URL without a host component
    #[error("URL has no host")]
    MissingHost,

    /// Host looks like a private, loopback or link-local address
    #[error("URL not allowed (private network): {0}")]
    PrivateNetwork(String),
}

/// Page retrieval failed. Never retried by the pipeline.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Timed out fetching {url}")]
    Timeout { url: String },

    #[error("Too many redirects fetching {url}")]
    TooManyRedirects { url: String },

    /// A redirect hop pointed at a host the validator rejects
    #[error("Redirect blocked for {url}")]
    RedirectBlocked { url: String },

    #[error("HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Response from {url} is larger than {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },

    #[error("Cannot monitor this file type ({content_type}) - only HTML pages are supported")]
    UnsupportedContentType { content_type: String },

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),
}

/// No text could be recovered from the document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("Could not extract readable text from this page")]
    NoReadableText,
}

/// Summarizer failures, split by retry class.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SummaryError {
    /// Missing or unusable credential. Never retried.
    #[error("Summarizer configuration error: {0}")]
    Config(String),

    /// Network failure, API error or empty completion. Retried with backoff.
    #[error("Summarizer request failed: {0}")]
    Transient(String),
}

/// Storage collaborator failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Backend(String),
}

/// Link registry failures.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("You're already monitoring {url}")]
    Duplicate { url: String },

    #[error("Maximum of {max} links reached. Delete one to add more.")]
    LimitReached { max: usize },

    #[error("Link not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for stage-level operations.
pub type Result<T> = std::result::Result<T, MonitorError>;

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

pub type FetchResult<T> = std::result::Result<T, FetchError>;

pub type ExtractionResult<T> = std::result::Result<T, ExtractionError>;

pub type SummaryResult<T> = std::result::Result<T, SummaryError>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

pub type LinkResult<T> = std::result::Result<T, LinkError>;

/// Invalid environment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}")]
    Invalid { var: String, value: String },
}

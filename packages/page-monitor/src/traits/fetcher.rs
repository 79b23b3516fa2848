//! Fetcher trait and the raw page it produces.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use url::Url;

use crate::error::FetchResult;

/// HTML as returned by the server, before any extraction.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// URL that was requested (without the cache-busting parameter)
    pub url: Url,

    /// URL that answered, after redirects
    pub final_url: Url,

    pub status: u16,

    pub content_type: String,

    pub html: String,

    pub fetched_at: DateTime<Utc>,
}

impl RawPage {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            final_url: url.clone(),
            url,
            status: 200,
            content_type: "text/html; charset=utf-8".to_string(),
            html: html.into(),
            fetched_at: Utc::now(),
        }
    }

    pub fn with_final_url(mut self, final_url: Url) -> Self {
        self.final_url = final_url;
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// Retrieves a validated URL.
///
/// Implementations make exactly one attempt; the pipeline never retries a
/// fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> FetchResult<RawPage>;

    /// Short name for logs.
    fn name(&self) -> &str {
        "fetcher"
    }
}

//! Mock collaborators for tests.
//!
//! Lets the pipeline run without network access: [`MockFetcher`] serves
//! canned HTML per URL and [`MockChatBackend`] plays back scripted LLM
//! responses while recording when each call happened.

use async_trait::async_trait;
use openrouter_client::{ChatRequest, OpenRouterError};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::traits::fetcher::{Fetcher, RawPage};
use crate::traits::llm::ChatBackend;

#[derive(Debug, Clone)]
enum CannedPage {
    Html(String),
    Status(u16),
    Timeout,
}

/// Fetcher serving canned pages by URL.
///
/// Unknown URLs answer `404`. Clones share pages and call history, so a test
/// can keep a handle and change a page between checks.
#[derive(Default, Clone)]
pub struct MockFetcher {
    pages: Arc<RwLock<HashMap<String, CannedPage>>>,
    calls: Arc<RwLock<Vec<String>>>,
    delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

fn key(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.set_page(url, html);
        self
    }

    /// Answer `url` with a non-2xx status.
    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.set_status(url, status);
        self
    }

    /// Time out every fetch of `url`.
    pub fn with_timeout(self, url: &str) -> Self {
        self.pages
            .write()
            .unwrap()
            .insert(key(url), CannedPage::Timeout);
        self
    }

    /// Sleep this long inside every fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Replace the page served for `url`.
    pub fn set_page(&self, url: &str, html: impl Into<String>) {
        self.pages
            .write()
            .unwrap()
            .insert(key(url), CannedPage::Html(html.into()));
    }

    /// Start answering `url` with a non-2xx status.
    pub fn set_status(&self, url: &str, status: u16) {
        self.pages
            .write()
            .unwrap()
            .insert(key(url), CannedPage::Status(status));
    }

    pub fn fetch_call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// URLs fetched, in call order.
    pub fn fetch_calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }

    /// Highest number of fetches that were in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult<RawPage> {
        self.calls.write().unwrap().push(url.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let canned = self.pages.read().unwrap().get(url.as_str()).cloned();
        match canned {
            Some(CannedPage::Html(html)) => Ok(RawPage::new(url.clone(), html)),
            Some(CannedPage::Status(status)) => Err(FetchError::Status {
                status,
                url: url.to_string(),
            }),
            Some(CannedPage::Timeout) => Err(FetchError::Timeout {
                url: url.to_string(),
            }),
            None => Err(FetchError::Status {
                status: 404,
                url: url.to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

enum Scripted {
    Content(String),
    Empty,
    Error(OpenRouterError),
}

/// Record of a call made to the mock chat backend.
#[derive(Debug, Clone)]
pub struct MockChatCall {
    pub request: ChatRequest,

    /// Tokio clock reading, so paused-time tests can measure backoff
    pub at: tokio::time::Instant,
}

/// Chat backend playing back scripted responses in order.
///
/// When the script runs out it repeats the default response if one was set,
/// otherwise it fails with a network error.
#[derive(Default, Clone)]
pub struct MockChatBackend {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    default_response: Option<String>,
    calls: Arc<Mutex<Vec<MockChatCall>>>,
}

impl MockChatBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every unscripted call with `content`.
    pub fn always(content: impl Into<String>) -> Self {
        Self {
            default_response: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn then_respond(self, content: impl Into<String>) -> Self {
        self.push(Scripted::Content(content.into()))
    }

    /// A completion with no content.
    pub fn then_respond_empty(self) -> Self {
        self.push(Scripted::Empty)
    }

    pub fn then_fail(self, error: OpenRouterError) -> Self {
        self.push(Scripted::Error(error))
    }

    fn push(self, response: Scripted) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<MockChatCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for MockChatBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, OpenRouterError> {
        self.calls.lock().unwrap().push(MockChatCall {
            request: request.clone(),
            at: tokio::time::Instant::now(),
        });

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Content(content)) => Ok(Some(content)),
            Some(Scripted::Empty) => Ok(None),
            Some(Scripted::Error(error)) => Err(error),
            None => match &self.default_response {
                Some(content) => Ok(Some(content.clone())),
                None => Err(OpenRouterError::Network(
                    "no scripted response left".to_string(),
                )),
            },
        }
    }
}

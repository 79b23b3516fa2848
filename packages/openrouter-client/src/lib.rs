//! Pure OpenRouter chat completions client
//!
//! A minimal client for OpenRouter's OpenAI-compatible API with no
//! domain-specific logic. Only chat completions are supported.
//!
//! # Example
//!
//! ```rust,ignore
//! use openrouter_client::{ChatRequest, Message, OpenRouterClient};
//!
//! let client = OpenRouterClient::new(api_key)
//!     .with_app("https://example.com", "My App");
//!
//! let response = client
//!     .chat_completion(
//!         &ChatRequest::new("openrouter/free")
//!             .message(Message::user("Hello!"))
//!             .max_tokens(50),
//!     )
//!     .await?;
//! ```

pub mod error;
pub mod types;

pub use error::{OpenRouterError, Result};
pub use types::*;

use reqwest::Client;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default OpenRouter API root.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// OpenRouter API client.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct OpenRouterClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    app_url: Option<String>,
    app_title: Option<String>,
    timeout: Option<Duration>,
}

impl fmt::Debug for OpenRouterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("app_title", &self.app_title)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenRouterClient {
    /// Create a new client with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            app_url: None,
            app_title: None,
            timeout: None,
        }
    }

    /// Set a custom base URL (proxies, self-hosted gateways, tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Attribute requests to an application (`HTTP-Referer` and `X-Title`).
    pub fn with_app(mut self, url: impl Into<String>, title: impl Into<String>) -> Self {
        self.app_url = Some(url.into());
        self.app_title = Some(title.into());
        self
    }

    /// Per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Chat completion.
    ///
    /// A response without content is returned as `Ok` with `content: None`.
    /// A blank API key fails with [`OpenRouterError::Config`] before any
    /// request is sent.
    pub async fn chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse> {
        if self.api_key.trim().is_empty() {
            return Err(OpenRouterError::Config(format!("{} is empty", API_KEY_ENV)));
        }
        let start = Instant::now();

        let mut builder = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(request);

        if let Some(url) = &self.app_url {
            builder = builder.header("HTTP-Referer", url);
        }
        if let Some(title) = &self.app_title {
            builder = builder.header("X-Title", title);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "OpenRouter request failed");
            OpenRouterError::from(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %body, "OpenRouter API error");
            return Err(OpenRouterError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let raw: types::ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OpenRouterError::Parse(e.to_string()))?;

        debug!(
            model = %request.model,
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenRouter chat completion"
        );

        Ok(raw.into())
    }
}

//! Configuration for fetching, summarizing and batch checks.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Identifies the monitor to site operators.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; WebMonitor/1.0; +https://github.com/web-monitor) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// HTML, XHTML and XML first, anything else last.
pub const DEFAULT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

pub const DEFAULT_MODEL: &str = "openrouter/free";

pub use openrouter_client::API_KEY_ENV;

pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Settings for the HTTP fetcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Total request timeout. Default: 15s.
    pub timeout_secs: u64,

    /// Redirects followed before giving up. Default: 3.
    pub max_redirects: usize,

    pub user_agent: String,

    /// Append `_cb=<unix ms>` to every request. Default: true.
    pub cache_bust: bool,

    /// Largest response body read, in bytes. Default: 5 MiB.
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_redirects: 3,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cache_bust: true,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_redirects(mut self, max: usize) -> Self {
        self.max_redirects = max;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_cache_bust(mut self, enabled: bool) -> Self {
        self.cache_bust = enabled;
        self
    }

    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

/// Settings for the LLM summarizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizerConfig {
    /// OpenRouter API key. Missing is a configuration error at call time.
    #[serde(skip)]
    pub api_key: Option<SecretString>,

    pub model: String,

    pub base_url: String,

    /// Sent as `HTTP-Referer` for OpenRouter attribution
    pub app_url: String,

    /// Sent as `X-Title` for OpenRouter attribution
    pub app_title: String,

    /// Diff characters sent to the model. Default: 24000 (~8k tokens).
    pub max_diff_chars: usize,

    /// Total attempts, including the first. Default: 3.
    pub max_attempts: u32,

    /// First backoff delay; doubles per failed attempt. Default: 1000ms.
    pub base_delay_ms: u64,

    pub temperature: f32,

    pub max_tokens: u32,

    /// Per-request timeout for the LLM call. Default: 60s.
    pub request_timeout_secs: u64,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: openrouter_client::DEFAULT_BASE_URL.to_string(),
            app_url: "https://web-monitor.onrender.com".to_string(),
            app_title: "Web Monitor".to_string(),
            max_diff_chars: 24_000,
            max_attempts: 3,
            base_delay_ms: 1_000,
            temperature: 0.3,
            max_tokens: 300,
            request_timeout_secs: 60,
        }
    }
}

impl SummarizerConfig {
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    pub fn with_max_diff_chars(mut self, chars: usize) -> Self {
        self.max_diff_chars = chars;
        self
    }

    /// Delay after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

/// Top-level monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub fetch: FetchConfig,

    pub summarizer: SummarizerConfig,

    /// Targets checked at once by `check_all`. 1 = sequential. Default: 1.
    pub concurrency: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            summarizer: SummarizerConfig::default(),
            concurrency: 1,
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from the environment, reading `.env` if present.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `OPENROUTER_API_KEY` | unset |
    /// | `OPENROUTER_MODEL` | `openrouter/free` |
    /// | `OPENROUTER_BASE_URL` | `https://openrouter.ai/api/v1` |
    /// | `MONITOR_CONCURRENCY` | `1` |
    /// | `MONITOR_FETCH_TIMEOUT_SECS` | `15` |
    /// | `MONITOR_MAX_BODY_BYTES` | `5242880` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut config = Self::new();
        config.summarizer.api_key = env_string(API_KEY_ENV).map(SecretString::from);

        if let Some(model) = env_string("OPENROUTER_MODEL") {
            config.summarizer.model = model;
        }
        if let Some(base_url) = env_string("OPENROUTER_BASE_URL") {
            config.summarizer.base_url = base_url;
        }
        if let Some(concurrency) = env_parse::<usize>("MONITOR_CONCURRENCY")? {
            config.concurrency = concurrency;
        }
        if let Some(timeout) = env_parse::<u64>("MONITOR_FETCH_TIMEOUT_SECS")? {
            config.fetch.timeout_secs = timeout;
        }
        if let Some(max) = env_parse::<usize>("MONITOR_MAX_BODY_BYTES")? {
            config.fetch.max_body_bytes = max;
        }

        Ok(config)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_summarizer(mut self, summarizer: SummarizerConfig) -> Self {
        self.summarizer = summarizer;
        self
    }
}

fn env_string(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(var: &str) -> Result<Option<T>, ConfigError> {
    match env_string(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                var: var.to_string(),
                value,
            }),
    }
}

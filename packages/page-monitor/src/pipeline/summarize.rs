//! LLM change summaries with retry and backoff.
//!
//! [`Summarizer::summarize`] never fails: once retries are exhausted, or when
//! no credential is configured, it resolves to [`SUMMARY_UNAVAILABLE`] so a
//! broken LLM never blocks recording a check.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use openrouter_client::{ChatRequest, Message, OpenRouterError};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::ai::openrouter_backend;
use crate::config::{SummarizerConfig, API_KEY_ENV};
use crate::error::{SummaryError, SummaryResult};
use crate::pipeline::prompts::{truncate_diff, user_prompt, HEALTH_PROMPT, SYSTEM_PROMPT};
use crate::traits::llm::ChatBackend;

/// Summary returned when the LLM cannot produce one. Callers may match on it.
pub const SUMMARY_UNAVAILABLE: &str =
    "AI summary unavailable — check status page or verify OPENROUTER_API_KEY";

/// How a single completion attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Ok(String),
    Retryable(SummaryError),
    Fatal(SummaryError),
}

impl AttemptOutcome {
    pub fn from_response(response: Result<Option<String>, OpenRouterError>) -> Self {
        match response {
            Ok(Some(content)) if !content.trim().is_empty() => Self::Ok(content.trim().to_string()),
            Ok(_) => Self::Retryable(SummaryError::Transient(
                "LLM returned empty response".to_string(),
            )),
            Err(e) => match classify_error(e) {
                e @ SummaryError::Config(_) => Self::Fatal(e),
                e => Self::Retryable(e),
            },
        }
    }
}

/// Split backend errors into configuration (never retried) and transient.
///
/// A rejected credential (401/403) is a configuration problem too.
pub fn classify_error(error: OpenRouterError) -> SummaryError {
    match error {
        OpenRouterError::Config(msg) => SummaryError::Config(msg),
        OpenRouterError::Api { status, body } if status == 401 || status == 403 => {
            SummaryError::Config(format!("credential rejected ({}): {}", status, body))
        }
        other => SummaryError::Transient(other.to_string()),
    }
}

/// Summarizes diffs through a chat backend.
#[derive(Clone)]
pub struct Summarizer {
    backend: Option<Arc<dyn ChatBackend>>,
    config: SummarizerConfig,
}

impl fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Summarizer")
            .field("configured", &self.is_configured())
            .field("model", &self.config.model)
            .finish()
    }
}

impl Summarizer {
    /// OpenRouter-backed summarizer. Without an API key every call resolves
    /// to a configuration error.
    pub fn from_config(config: SummarizerConfig) -> Self {
        let backend = openrouter_backend(&config).map(|client| Arc::new(client) as Arc<dyn ChatBackend>);
        Self { backend, config }
    }

    pub fn with_backend(backend: Arc<dyn ChatBackend>, config: SummarizerConfig) -> Self {
        Self {
            backend: Some(backend),
            config,
        }
    }

    /// A summarizer with no credential.
    pub fn unconfigured(config: SummarizerConfig) -> Self {
        Self {
            backend: None,
            config,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.backend.is_some()
    }

    pub fn config(&self) -> &SummarizerConfig {
        &self.config
    }

    /// Summarize `diff` for `url`, degrading to [`SUMMARY_UNAVAILABLE`].
    pub async fn summarize(&self, diff: &str, url: &str) -> String {
        match self.try_summarize(diff, url).await {
            Ok(summary) => summary,
            Err(SummaryError::Config(msg)) => {
                warn!(url = %url, error = %msg, "LLM summarization not configured");
                SUMMARY_UNAVAILABLE.to_string()
            }
            Err(e) => {
                error!(
                    url = %url,
                    attempts = self.config.max_attempts,
                    error = %e,
                    "LLM summarization failed after all attempts"
                );
                SUMMARY_UNAVAILABLE.to_string()
            }
        }
    }

    /// Summarize with the error surfaced.
    ///
    /// Configuration errors return at once, without attempts or sleeps.
    /// Transient failures (including empty completions) are retried up to
    /// `max_attempts` times with exponential backoff.
    pub async fn try_summarize(&self, diff: &str, url: &str) -> SummaryResult<String> {
        let backend = self.backend()?;
        let request = self.summary_request(diff, url);
        let max_attempts = self.config.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match AttemptOutcome::from_response(backend.complete(&request).await) {
                AttemptOutcome::Ok(summary) => {
                    debug!(url = %url, attempt, chars = summary.len(), "LLM summary received");
                    return Ok(summary);
                }
                AttemptOutcome::Fatal(e) => return Err(e),
                AttemptOutcome::Retryable(e) if attempt >= max_attempts => return Err(e),
                AttemptOutcome::Retryable(e) => {
                    let delay = self.config.backoff_delay(attempt);
                    warn!(
                        url = %url,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "LLM attempt failed, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    /// One-token round trip to the backend. Returns latency in milliseconds.
    pub async fn check_health(&self) -> SummaryResult<u64> {
        let backend = self.backend()?;
        let request = ChatRequest::new(&self.config.model)
            .message(Message::user(HEALTH_PROMPT))
            .max_tokens(1);

        let start = Instant::now();
        backend.complete(&request).await.map_err(classify_error)?;
        Ok(start.elapsed().as_millis() as u64)
    }

    fn backend(&self) -> SummaryResult<&Arc<dyn ChatBackend>> {
        self.backend.as_ref().ok_or_else(|| {
            SummaryError::Config(format!(
                "{} is not set; configure it to enable AI summaries",
                API_KEY_ENV
            ))
        })
    }

    fn summary_request(&self, diff: &str, url: &str) -> ChatRequest {
        let diff = truncate_diff(diff, self.config.max_diff_chars);
        ChatRequest::new(&self.config.model)
            .message(Message::system(SYSTEM_PROMPT))
            .message(Message::user(user_prompt(url, &diff)))
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_is_trimmed() {
        assert_eq!(
            AttemptOutcome::from_response(Ok(Some("  Price went up.\n".into()))),
            AttemptOutcome::Ok("Price went up.".into())
        );
    }

    #[test]
    fn test_empty_content_is_retryable() {
        assert!(matches!(
            AttemptOutcome::from_response(Ok(None)),
            AttemptOutcome::Retryable(SummaryError::Transient(_))
        ));
        assert!(matches!(
            AttemptOutcome::from_response(Ok(Some("   ".into()))),
            AttemptOutcome::Retryable(_)
        ));
    }

    #[test]
    fn test_error_classes() {
        assert!(matches!(
            AttemptOutcome::from_response(Err(OpenRouterError::Config("no key".into()))),
            AttemptOutcome::Fatal(SummaryError::Config(_))
        ));
        assert!(matches!(
            AttemptOutcome::from_response(Err(OpenRouterError::Api {
                status: 401,
                body: "bad key".into()
            })),
            AttemptOutcome::Fatal(_)
        ));
        assert!(matches!(
            AttemptOutcome::from_response(Err(OpenRouterError::Api {
                status: 429,
                body: "slow down".into()
            })),
            AttemptOutcome::Retryable(_)
        ));
        assert!(matches!(
            AttemptOutcome::from_response(Err(OpenRouterError::Timeout)),
            AttemptOutcome::Retryable(_)
        ));
    }

    #[test]
    fn test_request_shape() {
        let summarizer = Summarizer::unconfigured(SummarizerConfig::default());
        let request = summarizer.summary_request("+hello", "https://example.com");

        assert_eq!(request.model, "openrouter/free");
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_tokens, Some(300));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(
            request.messages[1].content,
            "URL: https://example.com\n\nDiff:\n+hello"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_summarizer() {
        let summarizer = Summarizer::unconfigured(SummarizerConfig::default());

        assert!(!summarizer.is_configured());
        assert_eq!(summarizer.summarize("+x", "https://example.com").await, SUMMARY_UNAVAILABLE);
        assert!(matches!(
            summarizer.check_health().await,
            Err(SummaryError::Config(_))
        ));
    }
}

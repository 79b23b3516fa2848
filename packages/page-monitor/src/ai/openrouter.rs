//! OpenRouter as a [`ChatBackend`].

use async_trait::async_trait;
use openrouter_client::{ChatRequest, OpenRouterClient, OpenRouterError};
use secrecy::ExposeSecret;

use crate::config::SummarizerConfig;
use crate::traits::llm::ChatBackend;

#[async_trait]
impl ChatBackend for OpenRouterClient {
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, OpenRouterError> {
        Ok(self.chat_completion(request).await?.content)
    }
}

/// Build an OpenRouter client from summarizer settings.
///
/// Returns `None` when no API key is configured.
pub fn openrouter_backend(config: &SummarizerConfig) -> Option<OpenRouterClient> {
    let api_key = config.api_key.as_ref()?;
    Some(
        OpenRouterClient::new(api_key.expose_secret())
            .with_base_url(&config.base_url)
            .with_app(&config.app_url, &config.app_title)
            .with_timeout(std::time::Duration::from_secs(config.request_timeout_secs)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_key_no_backend() {
        assert!(openrouter_backend(&SummarizerConfig::default()).is_none());
    }

    #[test]
    fn test_backend_uses_configured_base_url() {
        let config = SummarizerConfig::default()
            .with_api_key("sk-or-test")
            .with_base_url("http://127.0.0.1:9/api/v1/");
        let client = openrouter_backend(&config).unwrap();

        assert_eq!(client.base_url(), "http://127.0.0.1:9/api/v1");
        assert!(!format!("{:?}", client).contains("sk-or-test"));
    }
}

//! Chat completion backend used by the summarizer.

use async_trait::async_trait;
use openrouter_client::{ChatRequest, OpenRouterError};

/// A chat completion endpoint.
///
/// `Ok(None)` means the backend answered without content. The summarizer
/// treats that as a retryable failure. `Err(OpenRouterError::Config(_))` is
/// never retried.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<Option<String>, OpenRouterError>;
}

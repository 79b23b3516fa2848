//! Chat completion request and response types.

use serde::{Deserialize, Serialize};

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model slug (e.g., "openrouter/free", "openai/gpt-4o-mini")
    pub model: String,

    /// Conversation messages
    pub messages: Vec<Message>,

    /// Sampling temperature (0.0 to 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens in the completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Create a new chat request for the given model.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    /// Add a message to the conversation.
    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    /// Set temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set max tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant"
    pub role: String,

    /// Message content
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat completion response.
///
/// `content` is `None` when the provider answered with no choices or a null
/// message body. Free-tier routes do this under load, so callers decide
/// whether an empty answer is an error.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Option<String>,

    /// Model that actually served the request (OpenRouter may re-route)
    pub model: Option<String>,

    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponseRaw {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatChoice {
    pub message: Option<ChatMessageResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatMessageResponse {
    pub content: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<ChatResponseRaw> for ChatResponse {
    fn from(raw: ChatResponseRaw) -> Self {
        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty());

        Self {
            content,
            model: raw.model,
            usage: raw.usage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_skips_unset_fields() {
        let request = ChatRequest::new("openrouter/free").message(Message::user("Hi"));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "openrouter/free");
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json.get("temperature").is_none());
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_null_content_maps_to_none() {
        let raw: ChatResponseRaw = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
        )
        .unwrap();
        assert!(ChatResponse::from(raw).content.is_none());

        let raw: ChatResponseRaw = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(ChatResponse::from(raw).content.is_none());
    }

    #[test]
    fn test_blank_content_maps_to_none() {
        let raw: ChatResponseRaw =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"  \n"}}]}"#).unwrap();
        assert!(ChatResponse::from(raw).content.is_none());
    }

    #[test]
    fn test_content_and_usage_parsed() {
        let raw: ChatResponseRaw = serde_json::from_str(
            r#"{
                "model": "meta-llama/llama-3.3-70b-instruct:free",
                "choices": [{"message": {"role": "assistant", "content": "Pricing changed."}}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
            }"#,
        )
        .unwrap();
        let response = ChatResponse::from(raw);

        assert_eq!(response.content.as_deref(), Some("Pricing changed."));
        assert_eq!(response.usage.unwrap().total_tokens, 13);
        assert!(response.model.unwrap().contains("llama"));
    }
}

mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use client::DEFAULT_TIMEOUT;
pub use schema::StructuredOutput;

use std::time::Duration;

use anyhow::{Context, Result};

use client::Transport;
use types::{ChatRequest, JsonSchemaFormat, ResponseFormat, StructuredRequest, WireMessage};

const DEFAULT_MAX_TOKENS: u32 = 4096;
const NARRATIVE_TEMPERATURE: f32 = 0.2;

/// OpenAI chat completions for one model.
///
/// Clones share the HTTP connection pool.
#[derive(Clone)]
pub struct OpenAi {
    model: String,
    transport: Transport,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            transport: Transport::new(api_key.into(), reqwest::Client::new()),
        }
    }

    /// Point at an OpenAI-compatible server instead of api.openai.com.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.transport = self.transport.at(&url.into());
        self
    }

    /// Per-request limit, covering connect through the full response body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn is_reasoning_model(&self) -> bool {
        types::uses_max_completion_tokens(&self.model)
    }

    /// Strict JSON-schema output deserialized into `T`.
    ///
    /// Deterministic sampling where the model allows it.
    pub async fn extract<T: StructuredOutput>(
        &self,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Result<T> {
        let request = StructuredRequest {
            model: self.model.clone(),
            messages: vec![
                WireMessage::system(system_prompt),
                WireMessage::user(user_prompt),
            ],
            temperature: (!self.is_reasoning_model()).then_some(0.0),
            response_format: ResponseFormat {
                format_type: "json_schema".to_string(),
                json_schema: JsonSchemaFormat {
                    name: schema::schema_name::<T>(),
                    strict: true,
                    schema: T::openai_schema(),
                },
            },
        };

        let raw = self.transport.complete(&request, "structured output").await?;
        serde_json::from_str(crate::util::strip_code_blocks(&raw))
            .with_context(|| format!("{} did not match its schema", T::type_name()))
    }

    /// Free-form text from a system and a user message.
    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user));

        let request = if self.is_reasoning_model() {
            request.max_completion_tokens(DEFAULT_MAX_TOKENS)
        } else {
            request
                .max_tokens(DEFAULT_MAX_TOKENS)
                .temperature(NARRATIVE_TEMPERATURE)
        };

        self.transport.complete(&request, "chat").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_override_changes_endpoint() {
        let ai = OpenAi::new("sk-test", "gpt-4o").with_base_url("https://proxy.internal/v1");
        assert_eq!(ai.model(), "gpt-4o");
        assert_eq!(ai.transport.endpoint, "https://proxy.internal/v1/chat/completions");
    }

    #[test]
    fn reasoning_models_detected_by_prefix() {
        assert!(OpenAi::new("k", "gpt-5-mini").is_reasoning_model());
        assert!(!OpenAi::new("k", "gpt-4o").is_reasoning_model());
    }

    #[test]
    fn unreachable_endpoint_is_an_error() {
        let ai = OpenAi::new("sk-test", "gpt-4o").with_base_url("http://127.0.0.1:9");
        let result = tokio_test::block_on(ai.chat_completion("system", "hello"));
        assert!(result.is_err());
    }

    #[test]
    fn stalled_server_times_out() {
        // Connections land in the accept backlog and never get a reply.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}/v1", listener.local_addr().unwrap());
        let ai = OpenAi::new("sk-test", "gpt-4o")
            .with_base_url(base)
            .with_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let err = tokio_test::block_on(ai.chat_completion("system", "hello")).unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(err.to_string().contains("request failed"));
        drop(listener);
    }
}

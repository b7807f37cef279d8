use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::debug;

use super::types::ChatResponse;
use crate::util::truncate_to_char_boundary;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
/// Memo generation can run long; anything past this is a stalled connection.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// One endpoint, one key, a shared connection pool.
#[derive(Clone)]
pub(crate) struct Transport {
    http: reqwest::Client,
    api_key: String,
    pub(crate) endpoint: String,
    pub(crate) timeout: Duration,
}

impl Transport {
    pub fn new(api_key: String, http: reqwest::Client) -> Self {
        Self {
            http,
            api_key,
            endpoint: completions_url(DEFAULT_BASE_URL),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn at(mut self, base_url: &str) -> Self {
        self.endpoint = completions_url(base_url);
        self
    }

    /// POST a chat-completions body and return the first choice's text.
    pub async fn complete<B: Serialize>(&self, body: &B, label: &'static str) -> Result<String> {
        let started = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .with_context(|| format!("OpenAI {label} request failed"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!(
                "OpenAI {label} returned {status}: {}",
                truncate_to_char_boundary(&text, 500)
            );
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .with_context(|| format!("OpenAI {label} response was not valid JSON"))?;
        debug!(
            label,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "OpenAI call finished"
        );
        parsed.into_content()
    }
}

fn completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

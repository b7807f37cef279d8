use ai_client::util::truncate_to_char_boundary;
use ai_client::OpenAi;
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use dealscope_common::{CoreEntities, DealScopeError, MarketEntities, SignalEntities};

/// Research text beyond this many bytes is cut before it reaches the model.
const MAX_EXTRACTION_BYTES: usize = 120_000;

const CORE_PROMPT: &str = "You are a precise venture research assistant. \
Extract what the research text says about the company, its founders, investors, \
funding, traction and competitors. Unknown fields are empty strings, empty lists \
or null. Never invent facts that the text does not support.

Investor type is one of VC, PE, Corporate, Angel, Unknown. \
Competitor overlap_type is one of direct, adjacent, emerging.";

const MARKET_PROMPT: &str = "You are a venture research assistant focused on \
market intelligence and M&A. Extract the market profile, every acquisition the \
text mentions (with deal size and implied multiple when stated) and funding \
details for each competitor named. Unknown fields are empty strings or null.";

const SIGNAL_PROMPT: &str = "You are a risk analyst. Extract risk signals, \
strategic partnerships and exit indicators from the research text. Include subtle \
signals such as leadership changes, burn concerns and market timing. Risk severity \
is one of low, medium, high.";

/// Turns research text into typed entity bundles.
///
/// Implementations return `Err` on any failure; the caller substitutes the
/// empty bundle and carries on.
#[async_trait]
pub trait EntityExtractor: Send + Sync {
    async fn extract_core(&self, text: &str) -> Result<CoreEntities>;
    async fn extract_market(&self, text: &str) -> Result<MarketEntities>;
    async fn extract_signals(&self, text: &str) -> Result<SignalEntities>;
}

/// Strict structured-output extraction through OpenAI.
pub struct LlmExtractor {
    ai: OpenAi,
}

impl LlmExtractor {
    pub fn new(ai: OpenAi) -> Self {
        Self { ai }
    }

    fn prepare(text: &str) -> Result<&str> {
        if text.trim().is_empty() {
            return Err(DealScopeError::Extraction("no research text to extract from".into()).into());
        }
        let prepared = truncate_to_char_boundary(text, MAX_EXTRACTION_BYTES);
        if prepared.len() < text.len() {
            info!(
                original = text.len(),
                kept = prepared.len(),
                "Truncated research text for extraction"
            );
        }
        Ok(prepared)
    }
}

#[async_trait]
impl EntityExtractor for LlmExtractor {
    async fn extract_core(&self, text: &str) -> Result<CoreEntities> {
        let text = Self::prepare(text)?;
        self.ai.extract::<CoreEntities>(CORE_PROMPT, text).await
    }

    async fn extract_market(&self, text: &str) -> Result<MarketEntities> {
        let text = Self::prepare(text)?;
        self.ai.extract::<MarketEntities>(MARKET_PROMPT, text).await
    }

    async fn extract_signals(&self, text: &str) -> Result<SignalEntities> {
        let text = Self::prepare(text)?;
        self.ai.extract::<SignalEntities>(SIGNAL_PROMPT, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_is_an_extraction_error() {
        let err = LlmExtractor::prepare("  \n").unwrap_err();
        assert!(err.to_string().contains("no research text"));
    }

    #[test]
    fn long_text_is_truncated_on_char_boundary() {
        let text = "é".repeat(MAX_EXTRACTION_BYTES);
        let prepared = LlmExtractor::prepare(&text).unwrap();
        assert!(prepared.len() <= MAX_EXTRACTION_BYTES);
        assert!(prepared.chars().all(|c| c == 'é'));
    }

    #[tokio::test]
    async fn empty_text_never_reaches_the_model() {
        let extractor = LlmExtractor::new(OpenAi::new("test-key", "gpt-4o").with_base_url("http://127.0.0.1:1"));
        let err = extractor.extract_market("").await.unwrap_err();
        assert!(err.to_string().contains("no research text"));
    }
}

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use dealscope_common::DealScopeError;

const TAVILY_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: u32 = 5;
/// Upper bound on one search request, connect through body.
pub const SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTopic {
    General,
    News,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub topic: SearchTopic,
}

impl SearchQuery {
    pub fn general(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            topic: SearchTopic::General,
        }
    }

    pub fn news(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            topic: SearchTopic::News,
        }
    }
}

/// One source returned by a search. `source_id` is the URL, or a synthesized
/// id for provider answers; it is unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub source_id: String,
    pub title: String,
    pub content: String,
}

impl SearchResult {
    pub fn new(
        source_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            title: title.into(),
            content: content.into(),
        }
    }

    /// Pseudo-result wrapping the provider's synthesized answer for `query`.
    /// The id is only a label; answers are not deduplicated by it.
    pub fn answer(query: &str, answer: &str) -> Self {
        let prefix: String = query.chars().take(30).collect();
        Self::new(
            format!("answer:{}", prefix.trim_end()),
            "Search Answer",
            answer,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResponse {
    pub answer: Option<String>,
    pub results: Vec<SearchResult>,
}

#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse>;
}

// ---------------------------------------------------------------------------
// Tavily
// ---------------------------------------------------------------------------

/// Tavily web search adapter.
pub struct TavilySearcher {
    api_key: String,
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct TavilySearchRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    search_depth: &'static str,
    include_answer: bool,
    include_raw_content: bool,
    max_results: u32,
    topic: SearchTopic,
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

impl TavilySearcher {
    pub fn new(api_key: String, client: reqwest::Client) -> Self {
        Self {
            api_key,
            client,
            url: TAVILY_URL.to_string(),
            timeout: SEARCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

#[async_trait]
impl WebSearcher for TavilySearcher {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        if self.api_key.is_empty() {
            return Err(DealScopeError::Search("TAVILY_API_KEY not set".into()).into());
        }

        let request = TavilySearchRequest {
            api_key: &self.api_key,
            query: &query.text,
            search_depth: "advanced",
            include_answer: true,
            include_raw_content: false,
            max_results: MAX_RESULTS,
            topic: query.topic,
        };

        let resp = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| DealScopeError::Search(format!("Tavily request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body = ai_client::util::truncate_to_char_boundary(&body, 200);
            return Err(DealScopeError::Search(format!("Tavily returned {status}: {body}")).into());
        }

        let resp: TavilySearchResponse = resp
            .json()
            .await
            .map_err(|e| DealScopeError::Search(format!("Tavily response unreadable: {e}")))?;
        Ok(SearchResponse {
            answer: resp.answer.filter(|a| !a.trim().is_empty()),
            results: resp
                .results
                .into_iter()
                .map(|r| SearchResult::new(r.url, r.title, r.content))
                .collect(),
        })
    }
}

// Test mocks for the research pipeline.
//
// One mock per gateway seam:
// - MockSearcher (WebSearcher): query text -> response, optional delay, call log
// - MockExtractor (EntityExtractor): fixed bundles or failure, input log
// - MockAnalyst (Analyst): fixed analysis and memo, failure or panic
// - FixedPreferences (PreferenceSource)
// - DownGraph (GraphBackend): never reachable

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use dealscope_common::{
    AcquirerRank, AnalysisOutput, CoreEntities, GraphInsights, InvestorOverlap, MarketEntities,
    SignalEntities,
};
use dealscope_graph::{EdgeSpec, GraphBackend, GraphError, NodeSpec};

use crate::analysis::{Analyst, MemoRequest};
use crate::extraction::EntityExtractor;
use crate::preferences::PreferenceSource;
use crate::search::{SearchQuery, SearchResponse, SearchResult, WebSearcher};

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

/// Returns the registered response for a query text, an error for queries
/// marked failing, and one unique source for anything else.
/// Builder pattern: `.on_query()`, `.on_query_delayed()`, `.failing()`.
#[derive(Default)]
pub struct MockSearcher {
    responses: HashMap<String, (SearchResponse, u64)>,
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockSearcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_query(self, text: &str, response: SearchResponse) -> Self {
        self.on_query_delayed(text, response, 0)
    }

    pub fn on_query_delayed(mut self, text: &str, response: SearchResponse, delay_ms: u64) -> Self {
        self.responses.insert(text.to_string(), (response, delay_ms));
        self
    }

    pub fn failing(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }

    /// Query texts in the order they were issued.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(&self, query: &SearchQuery) -> Result<SearchResponse> {
        self.calls.lock().unwrap().push(query.text.clone());

        if self.failing.contains(&query.text) {
            bail!("mock search failure for '{}'", query.text);
        }

        if let Some((response, delay_ms)) = self.responses.get(&query.text) {
            if *delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
            }
            return Ok(response.clone());
        }

        let slug = query.text.replace(' ', "-").to_lowercase();
        Ok(SearchResponse {
            answer: None,
            results: vec![SearchResult::new(
                format!("https://example.com/{slug}"),
                query.text.clone(),
                format!("Content about {}", query.text),
            )],
        })
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Returns fixed bundles, or fails every call.
#[derive(Default)]
pub struct MockExtractor {
    core: CoreEntities,
    market: MarketEntities,
    signals: SignalEntities,
    fail: bool,
    texts: Mutex<Vec<String>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_core(mut self, core: CoreEntities) -> Self {
        self.core = core;
        self
    }

    pub fn with_market(mut self, market: MarketEntities) -> Self {
        self.market = market;
        self
    }

    pub fn with_signals(mut self, signals: SignalEntities) -> Self {
        self.signals = signals;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Research texts received, in call order (core, market, signals).
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    fn record(&self, text: &str) -> Result<()> {
        self.texts.lock().unwrap().push(text.to_string());
        if self.fail {
            bail!("mock extraction failure");
        }
        Ok(())
    }
}

#[async_trait]
impl EntityExtractor for MockExtractor {
    async fn extract_core(&self, text: &str) -> Result<CoreEntities> {
        self.record(text)?;
        Ok(self.core.clone())
    }

    async fn extract_market(&self, text: &str) -> Result<MarketEntities> {
        self.record(text)?;
        Ok(self.market.clone())
    }

    async fn extract_signals(&self, text: &str) -> Result<SignalEntities> {
        self.record(text)?;
        Ok(self.signals.clone())
    }
}

// ---------------------------------------------------------------------------
// MockAnalyst
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MockAnalyst {
    analysis: AnalysisOutput,
    memo: String,
    fail_analysis: bool,
    fail_memo: bool,
    panic_analysis: bool,
    seen_insights: Mutex<Option<GraphInsights>>,
    seen_preferences: Mutex<Option<String>>,
}

impl MockAnalyst {
    pub fn new() -> Self {
        Self {
            memo: "# Investment Memo".to_string(),
            ..Default::default()
        }
    }

    pub fn with_analysis(mut self, analysis: AnalysisOutput) -> Self {
        self.analysis = analysis;
        self
    }

    pub fn with_memo(mut self, memo: &str) -> Self {
        self.memo = memo.to_string();
        self
    }

    pub fn failing_analysis(mut self) -> Self {
        self.fail_analysis = true;
        self
    }

    pub fn failing_memo(mut self) -> Self {
        self.fail_memo = true;
        self
    }

    /// Panics inside the analysis call, as a catastrophic bug would.
    pub fn panicking(mut self) -> Self {
        self.panic_analysis = true;
        self
    }

    pub fn seen_insights(&self) -> Option<GraphInsights> {
        self.seen_insights.lock().unwrap().clone()
    }

    pub fn seen_preferences(&self) -> Option<String> {
        self.seen_preferences.lock().unwrap().clone()
    }
}

#[async_trait]
impl Analyst for MockAnalyst {
    async fn analyze(
        &self,
        _core: &CoreEntities,
        _market: &MarketEntities,
        _signals: &SignalEntities,
        insights: &GraphInsights,
    ) -> Result<AnalysisOutput> {
        *self.seen_insights.lock().unwrap() = Some(insights.clone());
        if self.panic_analysis {
            panic!("mock analyst exploded");
        }
        if self.fail_analysis {
            bail!("mock analysis failure");
        }
        Ok(self.analysis.clone())
    }

    async fn write_memo(&self, request: &MemoRequest) -> Result<String> {
        *self.seen_preferences.lock().unwrap() = Some(request.preferences.clone());
        if self.fail_memo {
            bail!("model timed out");
        }
        Ok(self.memo.clone())
    }
}

// ---------------------------------------------------------------------------
// FixedPreferences
// ---------------------------------------------------------------------------

pub struct FixedPreferences(pub String);

#[async_trait]
impl PreferenceSource for FixedPreferences {
    async fn memo_preferences(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

// ---------------------------------------------------------------------------
// DownGraph
// ---------------------------------------------------------------------------

/// A graph backend whose server never answers.
pub struct DownGraph;

fn down() -> GraphError {
    GraphError::Unreachable("connection refused".into())
}

#[async_trait]
impl GraphBackend for DownGraph {
    fn name(&self) -> &'static str {
        "down"
    }

    async fn verify(&self) -> Result<(), GraphError> {
        Err(down())
    }

    async fn upsert_node(&self, _node: &NodeSpec) -> Result<(), GraphError> {
        Err(down())
    }

    async fn upsert_edge(&self, _edge: &EdgeSpec) -> Result<(), GraphError> {
        Err(down())
    }

    async fn investor_overlap(&self, _company: &str) -> Result<Vec<InvestorOverlap>, GraphError> {
        Err(down())
    }

    async fn top_acquirers(&self, _company: &str, _limit: usize) -> Result<Vec<AcquirerRank>, GraphError> {
        Err(down())
    }

    async fn competitor_count(&self, _company: &str) -> Result<u64, GraphError> {
        Err(down())
    }

    async fn label_counts(&self) -> Result<BTreeMap<String, u64>, GraphError> {
        Err(down())
    }
}

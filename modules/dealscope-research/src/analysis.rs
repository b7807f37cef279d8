//! Analysis and memo gateways.

use ai_client::OpenAi;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use dealscope_common::{AnalysisOutput, CoreEntities, GraphInsights, MarketEntities, SignalEntities};

const ANALYSIS_PROMPT: &str = "You are a senior venture and M&A analyst. Using the \
structured company, market, signal and relationship-graph data provided, produce an \
investment analysis:

1. Red flags, each rated HIGH, MEDIUM or LOW with the evidence behind it.
2. The most relevant comparable M&A transactions with deal size and multiple.
3. Exit probability: IPO score and acquisition score (1-10 each) and a timeline of Near-term, Medium or Long.
4. Potential acquirers ranked by strategic fit (1-10), with their acquisition history.
5. Competitive position: Strong, Moderate or Weak.

Check for customer concentration, crowded or well-funded competition, founder risk, \
capital inefficiency, market timing, regulatory exposure and weak defensibility. \
Tie every claim to the data provided.";

const MEMO_PROMPT: &str = "You are a venture partner writing an internal investment \
memo for the investment committee, in Markdown.

Be specific: name people, companies, amounts and dates wherever the data has them. \
Take clear positions and ground each one in the data. Avoid generic filler.

Use these sections:
## Executive Summary (end with INVEST, PASS or WATCH and the main reason)
## Company Overview
## Market Opportunity
## Competitive Landscape (close with a Strong/Moderate/Weak rating)
## Traction & Financial Signals
## M&A Comparable Transactions (as a Markdown table: Target, Acquirer, Year, Deal Size, Revenue Multiple, Strategic Rationale)
## Likely Acquirers (ranked by fit, with scores)
## Risk Assessment (each risk tagged HIGH/MEDIUM/LOW with its implication)
## Exit Probability Assessment
## Investment Recommendation";

/// Everything the memo writer sees for one run.
#[derive(Debug, Clone)]
pub struct MemoRequest {
    pub company: String,
    pub stage: String,
    pub exit_type: String,
    pub core: CoreEntities,
    pub market: MarketEntities,
    pub signals: SignalEntities,
    pub analysis: AnalysisOutput,
    pub insights: GraphInsights,
    /// Analyst preferences; blank when none are stored.
    pub preferences: String,
}

/// Structured analysis and narrative generation.
///
/// Implementations return `Err` on failure; the caller substitutes the
/// zero-value analysis or a placeholder memo.
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(
        &self,
        core: &CoreEntities,
        market: &MarketEntities,
        signals: &SignalEntities,
        insights: &GraphInsights,
    ) -> Result<AnalysisOutput>;

    async fn write_memo(&self, request: &MemoRequest) -> Result<String>;
}

/// Placeholder memo used when generation fails.
pub fn memo_placeholder(company: &str, error: &anyhow::Error) -> String {
    format!("# Investment Memo — {company}\n\n*Memo generation encountered an error: {error}*")
}

pub struct LlmAnalyst {
    ai: OpenAi,
}

impl LlmAnalyst {
    pub fn new(ai: OpenAi) -> Self {
        Self { ai }
    }
}

#[async_trait]
impl Analyst for LlmAnalyst {
    async fn analyze(
        &self,
        core: &CoreEntities,
        market: &MarketEntities,
        signals: &SignalEntities,
        insights: &GraphInsights,
    ) -> Result<AnalysisOutput> {
        let prompt = analysis_prompt(core, market, signals, insights);
        self.ai.extract::<AnalysisOutput>(ANALYSIS_PROMPT, prompt).await
    }

    async fn write_memo(&self, request: &MemoRequest) -> Result<String> {
        let instructions = memo_instructions(&request.preferences);
        let prompt = memo_prompt(request);
        self.ai.chat_completion(instructions, prompt).await
    }
}

// ---------------------------------------------------------------------------
// Prompt builders
// ---------------------------------------------------------------------------

fn section<T: Serialize + ?Sized>(title: &str, value: &T) -> String {
    let body = serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string());
    format!("## {title}\n{body}")
}

fn or_unknown(s: &str) -> &str {
    if s.trim().is_empty() {
        "Unknown"
    } else {
        s
    }
}

pub fn analysis_prompt(
    core: &CoreEntities,
    market: &MarketEntities,
    signals: &SignalEntities,
    insights: &GraphInsights,
) -> String {
    let mut parts = vec![
        section("Company", &core.company),
        section("Funding", &core.funding),
        section("Traction", &core.traction),
        section("Founders", &core.founders),
        section("Investors", &core.investors),
        section("Competitors", &core.competitors),
        section("Market", &market.market),
        section("M&A Transactions", &market.acquisitions),
        section("Competitor Financials", &market.competitor_details),
        section("Risk Signals", &signals.risk_signals),
        section("Partnerships", &signals.partnerships),
        section("Exit Signals", &signals.exit_signals),
    ];
    if insights.graph_available {
        parts.push(section("Graph Insights", insights));
    }
    parts.join("\n\n")
}

pub fn memo_instructions(preferences: &str) -> String {
    let preferences = preferences.trim();
    if preferences.is_empty() {
        return MEMO_PROMPT.to_string();
    }
    format!(
        "{MEMO_PROMPT}\n\n---\nANALYST PREFERENCES (apply to this memo):\n{preferences}\n\
         Keep the section structure above while honouring these preferences."
    )
}

pub fn memo_prompt(request: &MemoRequest) -> String {
    let core = &request.core;
    let analysis = &request.analysis;
    let header = format!(
        "Company: {}\nStage: {}\nExit focus: {}\nLast funding round: {}\nTotal raised: {}\n\
         If stage or exit focus is unknown, infer the most likely one from the data.",
        request.company,
        or_unknown(&request.stage),
        or_unknown(&request.exit_type),
        or_unknown(&core.funding.last_round),
        or_unknown(&core.funding.total_raised),
    );

    let mut parts = vec![
        header,
        section("Company Profile", &core.company),
        section("Funding", &core.funding),
        section("Traction", &core.traction),
        section("Founders", &core.founders),
        section("Investors", &core.investors),
        section("Market", &request.market.market),
        section("Competitors", &core.competitors),
        section("Risk Signals", &request.signals.risk_signals),
        section("M&A Comps", &analysis.comps),
        section("Red Flags", &analysis.red_flags),
        section("Exit Probability", &analysis.exit_probability),
        section("Ranked Acquirers", &analysis.ranked_acquirers),
        format!("## Competitive Position: {}", analysis.competitive_position),
    ];
    if request.insights.graph_available {
        parts.push(section("Graph Insights", &request.insights));
    }
    parts.join("\n\n")
}

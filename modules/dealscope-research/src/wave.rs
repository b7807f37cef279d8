//! Rounds of concurrent search queries, merged and deduplicated per run.

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::search::{SearchQuery, SearchResult, WebSearcher};

/// Extra round-two queries, one per competitor found in round one.
pub const MAX_COMPETITOR_QUERIES: usize = 3;
/// Extra round-three queries, one per acquirer found in round two.
pub const MAX_ACQUIRER_QUERIES: usize = 2;
/// Sources rendered into one extraction prompt.
pub const MAX_EXTRACTION_SOURCES: usize = 40;

/// Source ids already kept in this run. Owned by exactly one run and passed
/// explicitly to each round; never shared between concurrent runs. Search
/// answers are never recorded here.
#[derive(Debug, Default)]
pub struct SeenSources {
    ids: HashSet<String>,
}

impl SeenSources {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `id` had not been seen before.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RoundOutput {
    /// Answers first, then sources in completion order.
    pub results: Vec<SearchResult>,
    pub queries_issued: usize,
    pub queries_failed: usize,
    pub duplicates_dropped: usize,
}

pub struct WaveSearchEngine {
    searcher: Arc<dyn WebSearcher>,
    concurrency: usize,
}

impl WaveSearchEngine {
    pub fn new(searcher: Arc<dyn WebSearcher>, concurrency: usize) -> Self {
        Self {
            searcher,
            concurrency: concurrency.max(1),
        }
    }

    /// Issue every query concurrently and merge as they complete.
    ///
    /// A failed query contributes nothing. A source whose id is already in
    /// `seen` is dropped, so the first completion of a source wins. Search
    /// answers are summaries of one query and are always kept.
    pub async fn round(&self, queries: &[SearchQuery], seen: &mut SeenSources) -> RoundOutput {
        let futures: Vec<_> = queries
            .iter()
            .cloned()
            .map(|query| {
                let searcher = self.searcher.clone();
                async move {
                    let result = searcher.search(&query).await;
                    (query, result)
                }
            })
            .collect();

        let responses: Vec<_> = stream::iter(futures)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let mut out = RoundOutput {
            queries_issued: queries.len(),
            ..Default::default()
        };
        let mut sources = Vec::new();
        for (query, result) in responses {
            match result {
                Ok(response) => {
                    if let Some(answer) = response.answer.as_deref() {
                        if !answer.trim().is_empty() {
                            out.results.push(SearchResult::answer(&query.text, answer));
                        }
                    }
                    sources.extend(response.results);
                }
                Err(e) => {
                    warn!(query = query.text.as_str(), error = %e, "Search query failed");
                    out.queries_failed += 1;
                }
            }
        }

        for result in sources {
            if seen.insert(&result.source_id) {
                out.results.push(result);
            } else {
                out.duplicates_dropped += 1;
            }
        }

        info!(
            queries = out.queries_issued,
            failed = out.queries_failed,
            kept = out.results.len(),
            duplicates = out.duplicates_dropped,
            "Search round complete"
        );
        out
    }
}

// ---------------------------------------------------------------------------
// Round definitions
// ---------------------------------------------------------------------------

fn or_company<'a>(sector: &'a str, company: &'a str) -> &'a str {
    let sector = sector.trim();
    if sector.is_empty() {
        company
    } else {
        sector
    }
}

/// Broad company intelligence; independent of earlier rounds.
pub fn round_one_queries(company: &str) -> Vec<SearchQuery> {
    vec![
        SearchQuery::general(format!("{company} company overview funding investors")),
        SearchQuery::general(format!("{company} founders executives leadership team")),
        SearchQuery::general(format!("{company} competitors market landscape")),
        SearchQuery::general(format!("{company} revenue traction customers growth")),
    ]
}

/// Sector and M&A deep-dive, plus one query per competitor (at most three).
pub fn round_two_queries(
    company: &str,
    sector: &str,
    competitors: &[String],
    year: i32,
) -> Vec<SearchQuery> {
    let sector = or_company(sector, company);
    let mut queries = vec![
        SearchQuery::general(format!("M&A acquisitions {sector} {year}")),
        SearchQuery::general(format!("{sector} market size TAM growth rate")),
        SearchQuery::general(format!("companies acquired in {sector} deal size valuation")),
    ];
    queries.extend(
        competitors
            .iter()
            .take(MAX_COMPETITOR_QUERIES)
            .map(|c| SearchQuery::general(format!("{c} funding investors valuation"))),
    );
    queries
}

/// Risk signals and exit intelligence, plus one query per acquirer (at most two).
pub fn round_three_queries(
    company: &str,
    sector: &str,
    acquirers: &[String],
    year: i32,
) -> Vec<SearchQuery> {
    let sector = or_company(sector, company);
    let mut queries = vec![
        SearchQuery::news(format!("{company} layoffs controversy risks problems")),
        SearchQuery::general(format!("{company} partnerships strategic deals")),
        SearchQuery::general(format!("{sector} IPO SPAC exit {} {year}", year - 1)),
    ];
    queries.extend(
        acquirers
            .iter()
            .take(MAX_ACQUIRER_QUERIES)
            .map(|a| SearchQuery::general(format!("{a} acquisition strategy M&A history"))),
    );
    queries
}

/// Render results as numbered source blocks for an extraction prompt.
/// Numbering follows position, so skipped empty results leave gaps.
pub fn format_for_extraction(results: &[SearchResult]) -> String {
    results
        .iter()
        .take(MAX_EXTRACTION_SOURCES)
        .enumerate()
        .filter(|(_, r)| !r.content.is_empty())
        .map(|(i, r)| {
            format!(
                "[Source {}] {}\n{}\n{}\n",
                i + 1,
                r.title,
                r.source_id,
                r.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}

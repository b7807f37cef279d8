use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An investor backing the target and at least one of its competitors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestorOverlap {
    pub investor: String,
    /// Competitor names this investor also backs, sorted.
    pub also_backs: Vec<String>,
}

/// A company that acquired targets sharing a market with the subject company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquirerRank {
    pub acquirer: String,
    pub deal_count: u64,
    /// Distinct acquired company names, sorted.
    pub targets_acquired: Vec<String>,
}

/// Read-only snapshot derived from the relationship graph for one company.
/// Recomputed every run and never written back into the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphInsights {
    pub investor_overlaps: Vec<InvestorOverlap>,
    pub top_acquirers: Vec<AcquirerRank>,
    /// Distinct companies linked to the target by COMPETES_WITH.
    pub competitor_count: Option<u64>,
    /// Node count per label across the whole graph.
    pub graph_stats: BTreeMap<String, u64>,
    pub graph_available: bool,
}

impl GraphInsights {
    /// Local mode: every graph-derived field empty.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn total_nodes(&self) -> u64 {
        self.graph_stats.values().sum()
    }
}

//! Per-run handle onto the relationship graph.
//!
//! Wraps an optional backend with an availability flag. A run whose backend
//! is missing or unreachable ("local mode") still completes: writes become
//! no-ops and every insight comes back empty.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use dealscope_common::GraphInsights;

use crate::backend::GraphBackend;
use crate::error::GraphError;
use crate::model::GraphWrite;

/// How many acquirers the market-acquirer query returns.
pub const TOP_ACQUIRER_LIMIT: usize = 5;

pub struct RelationshipGraph {
    backend: Option<Arc<dyn GraphBackend>>,
    available: AtomicBool,
}

impl RelationshipGraph {
    /// Local mode from the start.
    pub fn unavailable() -> Self {
        Self {
            backend: None,
            available: AtomicBool::new(false),
        }
    }

    /// Verify connectivity once; failure means local mode for this run.
    pub async fn open(backend: Option<Arc<dyn GraphBackend>>) -> Self {
        let Some(backend) = backend else {
            info!("No graph backend configured, running in local mode");
            return Self::unavailable();
        };

        match backend.verify().await {
            Ok(()) => {
                info!(backend = backend.name(), "Graph backend connected");
                Self {
                    backend: Some(backend),
                    available: AtomicBool::new(true),
                }
            }
            Err(e) => {
                warn!(backend = backend.name(), error = %e, "Graph backend unavailable, running in local mode");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst) && self.backend.is_some()
    }

    fn active(&self) -> Option<&Arc<dyn GraphBackend>> {
        if self.is_available() {
            self.backend.as_ref()
        } else {
            None
        }
    }

    fn disable(&self, e: &GraphError) {
        if self.available.swap(false, Ordering::SeqCst) {
            warn!(error = %e, "Lost connection to graph backend, disabling for the rest of this run");
        }
    }

    /// Apply one write. A no-op when unavailable. Connectivity failures
    /// disable the graph before the error is returned.
    pub async fn upsert(&self, write: &GraphWrite) -> Result<(), GraphError> {
        let Some(backend) = self.active() else {
            return Ok(());
        };
        let result = match write {
            GraphWrite::Node(node) => backend.upsert_node(node).await,
            GraphWrite::Edge(edge) => backend.upsert_edge(edge).await,
        };
        if let Err(e) = &result {
            if e.is_connectivity() {
                self.disable(e);
            }
        }
        result
    }

    /// Derive the insight snapshot for `company`. Any failure yields the
    /// empty snapshot with `graph_available = false`.
    pub async fn run_analysis_queries(&self, company: &str) -> GraphInsights {
        let Some(backend) = self.active() else {
            return GraphInsights::unavailable();
        };

        match Self::query_all(backend.as_ref(), company).await {
            Ok(insights) => insights,
            Err(e) => {
                if e.is_connectivity() {
                    self.disable(&e);
                } else {
                    warn!(error = %e, "Graph analysis queries failed");
                }
                GraphInsights::unavailable()
            }
        }
    }

    async fn query_all(
        backend: &dyn GraphBackend,
        company: &str,
    ) -> Result<GraphInsights, GraphError> {
        Ok(GraphInsights {
            investor_overlaps: backend.investor_overlap(company).await?,
            top_acquirers: backend.top_acquirers(company, TOP_ACQUIRER_LIMIT).await?,
            competitor_count: Some(backend.competitor_count(company).await?),
            graph_stats: backend.label_counts().await?,
            graph_available: true,
        })
    }
}

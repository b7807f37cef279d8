//! Availability behaviour of the per-run graph handle.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use dealscope_common::{AcquirerRank, CompanyInfo, CoreEntities, Investor, InvestorOverlap};
use dealscope_common::{MarketEntities, SignalEntities};
use dealscope_graph::{
    build_graph, EdgeSpec, GraphBackend, GraphError, MemoryGraph, NodeSpec, RelationshipGraph,
};

/// Accepts `ok_writes` writes, then fails every call with the given error kind.
struct FlakyBackend {
    ok_writes: usize,
    calls: AtomicUsize,
    unreachable: bool,
}

impl FlakyBackend {
    fn new(ok_writes: usize, unreachable: bool) -> Self {
        Self {
            ok_writes,
            calls: AtomicUsize::new(0),
            unreachable,
        }
    }

    fn fail(&self) -> GraphError {
        if self.unreachable {
            GraphError::Unreachable("connection reset".into())
        } else {
            GraphError::Query("constraint violated".into())
        }
    }

    fn write(&self) -> Result<(), GraphError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.ok_writes {
            Ok(())
        } else {
            Err(self.fail())
        }
    }
}

#[async_trait]
impl GraphBackend for FlakyBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn verify(&self) -> Result<(), GraphError> {
        Ok(())
    }

    async fn upsert_node(&self, _node: &NodeSpec) -> Result<(), GraphError> {
        self.write()
    }

    async fn upsert_edge(&self, _edge: &EdgeSpec) -> Result<(), GraphError> {
        self.write()
    }

    async fn investor_overlap(&self, _company: &str) -> Result<Vec<InvestorOverlap>, GraphError> {
        Err(self.fail())
    }

    async fn top_acquirers(&self, _c: &str, _l: usize) -> Result<Vec<AcquirerRank>, GraphError> {
        Err(self.fail())
    }

    async fn competitor_count(&self, _company: &str) -> Result<u64, GraphError> {
        Err(self.fail())
    }

    async fn label_counts(&self) -> Result<BTreeMap<String, u64>, GraphError> {
        Err(self.fail())
    }
}

struct DownBackend;

#[async_trait]
impl GraphBackend for DownBackend {
    fn name(&self) -> &'static str {
        "down"
    }

    async fn verify(&self) -> Result<(), GraphError> {
        Err(GraphError::Unreachable("connection refused".into()))
    }

    async fn upsert_node(&self, _node: &NodeSpec) -> Result<(), GraphError> {
        unreachable!("writes must not reach a backend that failed verification")
    }

    async fn upsert_edge(&self, _edge: &EdgeSpec) -> Result<(), GraphError> {
        unreachable!("writes must not reach a backend that failed verification")
    }

    async fn investor_overlap(&self, _company: &str) -> Result<Vec<InvestorOverlap>, GraphError> {
        unreachable!()
    }

    async fn top_acquirers(&self, _c: &str, _l: usize) -> Result<Vec<AcquirerRank>, GraphError> {
        unreachable!()
    }

    async fn competitor_count(&self, _company: &str) -> Result<u64, GraphError> {
        unreachable!()
    }

    async fn label_counts(&self) -> Result<BTreeMap<String, u64>, GraphError> {
        unreachable!()
    }
}

fn core() -> CoreEntities {
    CoreEntities {
        company: CompanyInfo { name: "Acme".into(), sector: "Fintech".into(), ..Default::default() },
        investors: vec![
            Investor { name: "Sequoia".into(), ..Default::default() },
            Investor { name: "Accel".into(), ..Default::default() },
        ],
        ..Default::default()
    }
}

#[tokio::test]
async fn failed_verification_means_local_mode() {
    let graph = RelationshipGraph::open(Some(Arc::new(DownBackend))).await;
    assert!(!graph.is_available());

    let stats = build_graph(&graph, "Acme", &core(), &MarketEntities::default(), &SignalEntities::default()).await;
    assert_eq!(stats.written, 0);
    assert!(stats.planned > 0);
    assert_eq!(stats.skipped, stats.planned);
    assert!(!graph.run_analysis_queries("Acme").await.graph_available);
}

#[tokio::test]
async fn connection_loss_disables_remaining_writes() {
    let backend = Arc::new(FlakyBackend::new(2, true));
    let graph = RelationshipGraph::open(Some(backend.clone())).await;

    let stats = build_graph(&graph, "Acme", &core(), &MarketEntities::default(), &SignalEntities::default()).await;
    assert_eq!(stats.written, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.skipped, stats.planned - 3);
    assert!(!graph.is_available());
    // No further calls reached the backend after the disconnect.
    assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn query_errors_continue_the_build_and_empty_the_insights() {
    let backend = Arc::new(FlakyBackend::new(1, false));
    let graph = RelationshipGraph::open(Some(backend)).await;

    let stats = build_graph(&graph, "Acme", &core(), &MarketEntities::default(), &SignalEntities::default()).await;
    assert_eq!(stats.written, 1);
    assert_eq!(stats.failed, stats.planned - 1);
    assert!(graph.is_available());

    let insights = graph.run_analysis_queries("Acme").await;
    assert!(!insights.graph_available);
    assert!(insights.graph_stats.is_empty());
}

#[tokio::test]
async fn repeated_builds_are_idempotent() {
    let backend = Arc::new(MemoryGraph::new());
    let graph = RelationshipGraph::open(Some(backend.clone())).await;

    build_graph(&graph, "Acme", &core(), &MarketEntities::default(), &SignalEntities::default()).await;
    let first = backend.label_counts().await.unwrap();
    let edges = backend.edge_count().await;

    build_graph(&graph, "Acme", &core(), &MarketEntities::default(), &SignalEntities::default()).await;
    assert_eq!(backend.label_counts().await.unwrap(), first);
    assert_eq!(backend.edge_count().await, edges);
    assert_eq!(first["Investor"], 2);
}

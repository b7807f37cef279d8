use std::sync::Arc;

use axum::response::Response;

use dealscope_common::GraphBackendKind;
use dealscope_graph::{GraphBackend, MemoryGraph};
use dealscope_research::testing::{MockAnalyst, MockExtractor, MockSearcher};
use dealscope_research::{Pipeline, PipelineDeps};

use crate::db::{HistoryStore, PreferenceStore};
use crate::AppState;

/// Mock gateways, an in-memory graph and no database.
pub fn test_state() -> Arc<AppState> {
    let graph: Arc<dyn GraphBackend> = Arc::new(MemoryGraph::new());
    state_with_graph(Some(graph), GraphBackendKind::Memory)
}

/// As `test_state`, but Neo4j was configured and could not be reached.
pub fn unreachable_neo4j_state() -> Arc<AppState> {
    state_with_graph(None, GraphBackendKind::Neo4j)
}

fn state_with_graph(
    graph: Option<Arc<dyn GraphBackend>>,
    configured: GraphBackendKind,
) -> Arc<AppState> {
    let graph_backend = crate::active_backend(configured, graph.is_some());
    let deps = PipelineDeps::builder()
        .searcher(Arc::new(MockSearcher::new()))
        .extractor(Arc::new(MockExtractor::new()))
        .analyst(Arc::new(MockAnalyst::new()))
        .graph(graph)
        .build();

    Arc::new(AppState {
        pipeline: Pipeline::new(deps),
        history: HistoryStore::new(None),
        preferences: Arc::new(PreferenceStore::new(None)),
        openai_configured: false,
        tavily_configured: false,
        graph_backend,
    })
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

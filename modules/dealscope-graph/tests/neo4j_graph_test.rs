//! Runs the backend contract against a real Neo4j container.
//!
//! Requires Docker: `cargo test -p dealscope-graph --features test-utils`.
#![cfg(feature = "test-utils")]

use std::sync::Arc;

use dealscope_graph::migrate::migrate;
use dealscope_graph::testutil::neo4j_container;
use dealscope_graph::{
    build_graph, EdgeKind, EdgeSpec, GraphBackend, Neo4jGraph, NodeKey, NodeSpec,
    RelationshipGraph,
};

use dealscope_common::{CompanyInfo, Competitor, CoreEntities, Investor, MarketEntities, SignalEntities};

#[tokio::test]
async fn upserts_merge_and_queries_rank() {
    let (_container, client) = neo4j_container().await;
    migrate(&client).await.expect("migrate");
    // Second run must be a no-op.
    migrate(&client).await.expect("migrate twice");

    let backend = Neo4jGraph::new(client);

    backend
        .upsert_node(&NodeSpec::new(NodeKey::company("Acme")).with_text("sector", "Fintech"))
        .await
        .unwrap();
    backend
        .upsert_node(&NodeSpec::new(NodeKey::company("Acme")).with_text("hq", "Austin"))
        .await
        .unwrap();

    for c in ["Acme", "X", "Y", "Z"] {
        backend
            .upsert_edge(&EdgeSpec::new(
                EdgeKind::OperatesIn,
                NodeKey::company(c),
                NodeKey::market("Payments"),
            ))
            .await
            .unwrap();
    }
    for (acquirer, target) in [("B", "Z"), ("A", "X"), ("A", "Y"), ("A", "Y")] {
        backend
            .upsert_edge(&EdgeSpec::new(
                EdgeKind::Acquired,
                NodeKey::company(acquirer),
                NodeKey::company(target),
            ))
            .await
            .unwrap();
    }

    let ranks = backend.top_acquirers("Acme", 5).await.unwrap();
    assert_eq!(ranks[0].acquirer, "A");
    assert_eq!(ranks[0].deal_count, 2);
    assert_eq!(ranks[1].acquirer, "B");

    let counts = backend.label_counts().await.unwrap();
    assert_eq!(counts["Company"], 6);
    assert_eq!(counts["Market"], 1);
}

#[tokio::test]
async fn full_build_yields_insights() {
    let (_container, client) = neo4j_container().await;
    migrate(&client).await.expect("migrate");

    let backend: Arc<dyn GraphBackend> = Arc::new(Neo4jGraph::new(client));
    let graph = RelationshipGraph::open(Some(backend)).await;
    assert!(graph.is_available());

    let core = CoreEntities {
        company: CompanyInfo { name: "Acme".into(), ..Default::default() },
        investors: vec![Investor { name: "Sequoia".into(), ..Default::default() }],
        competitors: vec![Competitor { name: "Rival".into(), ..Default::default() }],
        ..Default::default()
    };
    let stats = build_graph(
        &graph,
        "Acme",
        &core,
        &MarketEntities::default(),
        &SignalEntities::default(),
    )
    .await;
    assert_eq!(stats.failed, 0);

    graph
        .upsert(&dealscope_graph::GraphWrite::Edge(EdgeSpec::new(
            EdgeKind::InvestedIn,
            NodeKey::investor("Sequoia"),
            NodeKey::company("Rival"),
        )))
        .await
        .unwrap();

    let insights = graph.run_analysis_queries("Acme").await;
    assert!(insights.graph_available);
    assert_eq!(insights.competitor_count, Some(1));
    assert_eq!(insights.investor_overlaps.len(), 1);
    assert_eq!(insights.investor_overlaps[0].also_backs, vec!["Rival"]);
}

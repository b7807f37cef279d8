//! End-to-end runs of the pipeline against in-process mocks.

use std::sync::Arc;

use tokio::sync::mpsc;

use dealscope_common::{
    Acquisition, AnalysisOutput, CompanyInfo, CompetitivePosition, Competitor, CoreEntities,
    ExitProbability, ExitTimeline, Investor, MarketEntities, MarketInfo, ProgressEvent,
    StatusIcon,
};
use dealscope_graph::{GraphBackend, MemoryGraph};
use dealscope_research::testing::{
    DownGraph, FixedPreferences, MockAnalyst, MockExtractor, MockSearcher,
};
use dealscope_research::{
    Pipeline, PipelineDeps, RunOutcome, RunRequest, SearchResponse, SearchResult,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn competitor(name: &str) -> Competitor {
    Competitor {
        name: name.to_string(),
        ..Default::default()
    }
}

fn acme_core(competitors: usize) -> CoreEntities {
    CoreEntities {
        company: CompanyInfo {
            name: "Acme".into(),
            sector: "Fintech".into(),
            ..Default::default()
        },
        investors: vec![Investor {
            name: "Sequoia".into(),
            is_lead: true,
            ..Default::default()
        }],
        competitors: (0..competitors).map(|i| competitor(&format!("Rival{i}"))).collect(),
        ..Default::default()
    }
}

fn analysis() -> AnalysisOutput {
    AnalysisOutput {
        competitive_position: CompetitivePosition::Strong,
        exit_probability: ExitProbability {
            ipo_score: 4,
            acquisition_score: 8,
            timeline: ExitTimeline::NearTerm,
            ..Default::default()
        },
        ..Default::default()
    }
}

async fn collect(mut rx: mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    events
}

fn terminal_count(events: &[ProgressEvent]) -> usize {
    events.iter().filter(|e| e.is_terminal()).count()
}

fn steps(events: &[ProgressEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Status(s) => Some(s.step),
            _ => None,
        })
        .collect()
}

fn complete(events: &[ProgressEvent]) -> &dealscope_common::CompletePayload {
    match events.last() {
        Some(ProgressEvent::Complete(payload)) => payload.as_ref(),
        other => panic!("expected complete as last event, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_run_emits_phases_in_order_and_one_complete() {
    let searcher = Arc::new(MockSearcher::new());
    let extractor = Arc::new(
        MockExtractor::new()
            .with_core(acme_core(5))
            .with_market(MarketEntities {
                market: MarketInfo {
                    name: "Payments".into(),
                    ..Default::default()
                },
                ..Default::default()
            }),
    );
    let graph: Arc<dyn GraphBackend> = Arc::new(MemoryGraph::new());
    let pipeline = Pipeline::new(
        PipelineDeps::builder()
            .searcher(searcher.clone())
            .extractor(extractor)
            .analyst(Arc::new(MockAnalyst::new().with_analysis(analysis())))
            .graph(Some(graph))
            .build(),
    );

    let events = collect(pipeline.start(RunRequest::new("Acme", "Series A", "").unwrap())).await;

    assert_eq!(terminal_count(&events), 1);

    let steps = steps(&events);
    assert!(steps.windows(2).all(|w| w[0] <= w[1]), "steps not monotone: {steps:?}");
    for step in 1..=6u8 {
        assert!(steps.contains(&step), "missing step {step}");
    }
    // Entry + exit for phases 1,2,4,5,6 and two pairs for phase 3.
    assert_eq!(steps.len(), 14);

    let graph_ready = events
        .iter()
        .position(|e| matches!(e, ProgressEvent::GraphReady { graph_available: true }))
        .expect("graph_ready event");
    let step4_exit = events
        .iter()
        .rposition(|e| matches!(e, ProgressEvent::Status(s) if s.step == 4))
        .unwrap();
    assert_eq!(graph_ready, step4_exit + 1);

    // 4 + (3 + 3 capped competitors) + (3 + 0 acquirers)
    assert_eq!(searcher.calls().len(), 4 + 6 + 3);

    let payload = complete(&events);
    assert_eq!(payload.competitive_position, CompetitivePosition::Strong);
    assert_eq!(payload.exit_scores.timeline, ExitTimeline::NearTerm);
    assert_eq!(payload.company_info.name, "Acme");
    assert_eq!(payload.market_info.name, "Payments");
    assert_eq!(payload.graph_stats["Company"], 6);
    assert_eq!(payload.graph_stats["Investor"], 1);

    let json = ProgressEvent::Complete(Box::new(payload.clone())).data();
    assert!(["Strong", "Moderate", "Weak"].contains(&json["competitivePosition"].as_str().unwrap()));
    assert!(["Near-term", "Medium", "Long"].contains(&json["exitScores"]["timeline"].as_str().unwrap()));
}

#[tokio::test]
async fn round_three_adds_at_most_two_acquirer_queries() {
    let searcher = Arc::new(MockSearcher::new());
    let market = MarketEntities {
        acquisitions: ["Visa", "Visa", "Fiserv", "FIS"]
            .iter()
            .enumerate()
            .map(|(i, a)| Acquisition {
                target: format!("Target{i}"),
                acquirer: a.to_string(),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    };
    let pipeline = Pipeline::new(
        PipelineDeps::builder()
            .searcher(searcher.clone())
            .extractor(Arc::new(MockExtractor::new().with_core(acme_core(0)).with_market(market)))
            .analyst(Arc::new(MockAnalyst::new()))
            .build(),
    );

    collect(pipeline.start(RunRequest::new("Acme", "", "").unwrap())).await;

    let calls = searcher.calls();
    assert_eq!(calls.len(), 4 + 3 + 5);
    assert!(calls.contains(&"Visa acquisition strategy M&A history".to_string()));
    assert!(calls.contains(&"Fiserv acquisition strategy M&A history".to_string()));
    assert!(!calls.contains(&"FIS acquisition strategy M&A history".to_string()));
}

#[tokio::test]
async fn unreachable_graph_still_completes_in_local_mode() {
    let pipeline = Pipeline::new(
        PipelineDeps::builder()
            .searcher(Arc::new(MockSearcher::new()))
            .extractor(Arc::new(MockExtractor::new().with_core(acme_core(2))))
            .analyst(Arc::new(MockAnalyst::new()))
            .graph(Some(Arc::new(DownGraph) as Arc<dyn GraphBackend>))
            .build(),
    );

    let events = collect(pipeline.start(RunRequest::new("Acme", "Seed", "").unwrap())).await;

    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::GraphReady { graph_available: false })));
    let payload = complete(&events);
    assert!(payload.graph_stats.is_empty());
    assert!(payload.investor_overlaps.is_empty());
    assert_eq!(
        ProgressEvent::Complete(Box::new(payload.clone())).data()["graphStats"],
        serde_json::json!({})
    );
}

#[tokio::test]
async fn failing_gateways_degrade_to_defaults() {
    let analyst = Arc::new(MockAnalyst::new().failing_analysis().failing_memo());
    let pipeline = Pipeline::new(
        PipelineDeps::builder()
            .searcher(Arc::new(MockSearcher::new()))
            .extractor(Arc::new(MockExtractor::new().failing()))
            .analyst(analyst)
            .build(),
    );

    let events = collect(pipeline.start(RunRequest::new("Acme", "", "").unwrap())).await;

    assert_eq!(terminal_count(&events), 1);
    let payload = complete(&events);
    assert_eq!(payload.competitive_position, CompetitivePosition::Moderate);
    assert_eq!(payload.exit_scores.timeline, ExitTimeline::Medium);
    assert!(payload.red_flags.is_empty());
    assert!(payload.memo.starts_with("# Investment Memo — Acme"));
    assert!(payload.memo.contains("model timed out"));
}

#[tokio::test]
async fn worker_panic_yields_single_error_and_no_complete() {
    let pipeline = Pipeline::new(
        PipelineDeps::builder()
            .searcher(Arc::new(MockSearcher::new()))
            .extractor(Arc::new(MockExtractor::new().with_core(acme_core(1))))
            .analyst(Arc::new(MockAnalyst::new().panicking()))
            .build(),
    );

    let events = collect(pipeline.start(RunRequest::new("Acme", "", "").unwrap())).await;

    assert_eq!(terminal_count(&events), 1);
    assert!(matches!(events.last(), Some(ProgressEvent::Error { .. })));
    assert!(!events.iter().any(|e| matches!(e, ProgressEvent::Complete(_))));
    // Phase 5 started but never finished.
    let last_status = steps(&events).last().copied();
    assert_eq!(last_status, Some(5));
}

#[tokio::test]
async fn empty_search_marks_round_one_with_warning() {
    let searcher = MockSearcher::new()
        .failing("Acme company overview funding investors")
        .failing("Acme founders executives leadership team")
        .failing("Acme competitors market landscape")
        .failing("Acme revenue traction customers growth");
    let pipeline = Pipeline::new(
        PipelineDeps::builder()
            .searcher(Arc::new(searcher))
            .extractor(Arc::new(MockExtractor::new()))
            .analyst(Arc::new(MockAnalyst::new()))
            .build(),
    );

    let events = collect(pipeline.start(RunRequest::new("Acme", "", "").unwrap())).await;

    let round_one_exit = events
        .iter()
        .find_map(|e| match e {
            ProgressEvent::Status(s) if s.step == 1 && s.elapsed.is_some() => Some(s),
            _ => None,
        })
        .unwrap();
    assert_eq!(round_one_exit.icon, StatusIcon::Warning);
    assert_eq!(terminal_count(&events), 1);
}

#[tokio::test]
async fn sources_seen_in_round_one_are_not_resent_later() {
    let shared = SearchResponse {
        answer: None,
        results: vec![SearchResult::new("https://acme.com/about", "About Acme", "Acme builds rails")],
    };
    let searcher = MockSearcher::new()
        .on_query("Acme company overview funding investors", shared.clone())
        .on_query("Acme partnerships strategic deals", shared);
    let extractor = Arc::new(MockExtractor::new().with_core(acme_core(0)));
    let pipeline = Pipeline::new(
        PipelineDeps::builder()
            .searcher(Arc::new(searcher))
            .extractor(extractor.clone())
            .analyst(Arc::new(MockAnalyst::new()))
            .build(),
    );

    collect(pipeline.start(RunRequest::new("Acme", "", "").unwrap())).await;

    let texts = extractor.texts();
    assert_eq!(texts.len(), 3);
    assert!(texts[0].contains("https://acme.com/about"));
    assert!(!texts[2].contains("https://acme.com/about"));
}

#[tokio::test]
async fn memo_preferences_reach_the_analyst() {
    let analyst = Arc::new(MockAnalyst::new());
    let pipeline = Pipeline::new(
        PipelineDeps::builder()
            .searcher(Arc::new(MockSearcher::new()))
            .extractor(Arc::new(MockExtractor::new()))
            .analyst(analyst.clone())
            .preferences(Arc::new(FixedPreferences("Emphasise unit economics".into())))
            .build(),
    );

    collect(pipeline.start(RunRequest::new("Acme", "", "").unwrap())).await;

    assert_eq!(
        analyst.seen_preferences().as_deref(),
        Some("Emphasise unit economics")
    );
    assert!(!analyst.seen_insights().unwrap().graph_available);
}

#[tokio::test]
async fn disconnected_consumer_abandons_the_run() {
    let searcher = Arc::new(MockSearcher::new());
    let pipeline = Pipeline::new(
        PipelineDeps::builder()
            .searcher(searcher.clone())
            .extractor(Arc::new(MockExtractor::new()))
            .analyst(Arc::new(MockAnalyst::new()))
            .build(),
    );

    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let outcome = pipeline.run(RunRequest::new("Acme", "", "").unwrap(), tx).await;

    assert_eq!(outcome, RunOutcome::Abandoned);
    assert!(searcher.calls().is_empty());
}

#[tokio::test]
async fn concurrent_runs_keep_separate_dedup_state() {
    let pipeline = Pipeline::new(
        PipelineDeps::builder()
            .searcher(Arc::new(MockSearcher::new()))
            .extractor(Arc::new(MockExtractor::new()))
            .analyst(Arc::new(MockAnalyst::new()))
            .build(),
    );

    let a = pipeline.start(RunRequest::new("Acme", "", "").unwrap());
    let b = pipeline.start(RunRequest::new("Acme", "", "").unwrap());
    let (a, b) = tokio::join!(collect(a), collect(b));

    let sources = |events: &[ProgressEvent]| -> String {
        events
            .iter()
            .find_map(|e| match e {
                ProgressEvent::Status(s) if s.step == 1 && s.elapsed.is_some() => {
                    Some(s.message.clone())
                }
                _ => None,
            })
            .unwrap()
    };
    assert_eq!(sources(&a), "Round 1 complete: 4 sources found");
    assert_eq!(sources(&b), "Round 1 complete: 4 sources found");
}

//! The six-phase research pipeline.
//!
//! A run executes on its own task and pushes [`ProgressEvent`]s into a
//! bounded channel; the consumer drains it at its own pace. Each gateway
//! call runs on a worker task and its `Result` is settled into a default
//! value on failure. Only a worker panic or a vanished consumer ends a
//! run early.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Datelike;
use tokio::sync::mpsc;
use tracing::{error, info, info_span, warn, Instrument};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use dealscope_common::{
    AnalysisOutput, CompletePayload, CoreEntities, DealScopeError, MarketEntities,
    ProgressEvent, SignalEntities, StatusIcon,
};
use dealscope_graph::{build_graph, GraphBackend, RelationshipGraph};

use crate::analysis::{memo_placeholder, Analyst, MemoRequest};
use crate::error::PipelineError;
use crate::extraction::EntityExtractor;
use crate::preferences::{NoPreferences, PreferenceSource};
use crate::search::WebSearcher;
use crate::stats::RunStats;
use crate::wave::{
    format_for_extraction, round_one_queries, round_three_queries, round_two_queries,
    SeenSources, WaveSearchEngine, MAX_ACQUIRER_QUERIES, MAX_COMPETITOR_QUERIES,
};

/// A validated invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub company: String,
    pub stage: String,
    pub exit_type: String,
}

impl RunRequest {
    pub fn new(
        company: impl Into<String>,
        stage: impl Into<String>,
        exit_type: impl Into<String>,
    ) -> Result<Self, DealScopeError> {
        let company = company.into().trim().to_string();
        if company.is_empty() {
            return Err(DealScopeError::Validation("company must not be empty".into()));
        }
        Ok(Self {
            company,
            stage: stage.into().trim().to_string(),
            exit_type: exit_type.into().trim().to_string(),
        })
    }
}

/// How a run ended, from the producer's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed(String),
    /// The consumer disconnected; no terminal event was delivered.
    Abandoned,
}

#[derive(TypedBuilder)]
pub struct PipelineDeps {
    searcher: Arc<dyn WebSearcher>,
    extractor: Arc<dyn EntityExtractor>,
    analyst: Arc<dyn Analyst>,
    /// `None` runs every job in local mode.
    #[builder(default)]
    graph: Option<Arc<dyn GraphBackend>>,
    #[builder(default = Arc::new(NoPreferences) as Arc<dyn PreferenceSource>)]
    preferences: Arc<dyn PreferenceSource>,
    #[builder(default = 6)]
    search_concurrency: usize,
    /// Capacity of the progress channel handed out by [`Pipeline::start`].
    #[builder(default = 1)]
    event_buffer: usize,
}

/// Cheap to clone; every run gets its own search state.
#[derive(Clone)]
pub struct Pipeline {
    deps: Arc<PipelineDeps>,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        Self {
            deps: Arc::new(deps),
        }
    }

    /// Spawn a run and hand back its event stream.
    pub fn start(&self, request: RunRequest) -> mpsc::Receiver<ProgressEvent> {
        let (tx, rx) = mpsc::channel(self.deps.event_buffer.max(1));
        let pipeline = self.clone();
        tokio::spawn(async move {
            pipeline.run(request, tx).await;
        });
        rx
    }

    /// Drive one run to its terminal event.
    ///
    /// The phases execute on a child task so that a panic anywhere in them
    /// still produces exactly one `error` event.
    pub async fn run(&self, request: RunRequest, tx: mpsc::Sender<ProgressEvent>) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id, company = %request.company);

        async move {
            info!(stage = %request.stage, exit_type = %request.exit_type, "Pipeline run started");
            let run = Run::new(self.deps.clone(), request, tx.clone());
            let handle = tokio::spawn(run.execute().in_current_span());

            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(PipelineError::WorkerFailed {
                    phase: "pipeline",
                    reason: e.to_string(),
                }),
            };

            match result {
                Ok((payload, stats)) => {
                    info!("{stats}");
                    match tx.send(ProgressEvent::Complete(Box::new(payload))).await {
                        Ok(()) => RunOutcome::Completed,
                        Err(_) => RunOutcome::Abandoned,
                    }
                }
                Err(PipelineError::Disconnected) => {
                    warn!("Progress consumer disconnected, abandoning run");
                    RunOutcome::Abandoned
                }
                Err(e) => {
                    error!(error = %e, "Pipeline run failed");
                    let message = e.to_string();
                    match tx.send(ProgressEvent::error(message.clone())).await {
                        Ok(()) => RunOutcome::Failed(message),
                        Err(_) => RunOutcome::Abandoned,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }
}

// ---------------------------------------------------------------------------
// One run
// ---------------------------------------------------------------------------

struct Run {
    deps: Arc<PipelineDeps>,
    request: RunRequest,
    tx: mpsc::Sender<ProgressEvent>,
    engine: WaveSearchEngine,
    seen: SeenSources,
    stats: RunStats,
    year: i32,
}

/// Resolve a gateway result, logging and defaulting on failure.
fn settle<T: Default>(stats: &mut RunStats, phase: &'static str, result: anyhow::Result<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(phase, error = %e, "Gateway call failed, continuing with empty result");
            stats.degraded(phase);
            T::default()
        }
    }
}

/// Run a gateway call on a worker task. Only a panic or cancellation of the
/// worker is an error here; the call's own `Err` is handed back untouched.
async fn on_worker<T, F>(phase: &'static str, fut: F) -> Result<anyhow::Result<T>, PipelineError>
where
    T: Send + 'static,
    F: Future<Output = anyhow::Result<T>> + Send + 'static,
{
    tokio::spawn(fut.in_current_span())
        .await
        .map_err(|e| PipelineError::WorkerFailed {
            phase,
            reason: e.to_string(),
        })
}

impl Run {
    fn new(deps: Arc<PipelineDeps>, request: RunRequest, tx: mpsc::Sender<ProgressEvent>) -> Self {
        let engine = WaveSearchEngine::new(deps.searcher.clone(), deps.search_concurrency);
        Self {
            deps,
            request,
            tx,
            engine,
            seen: SeenSources::new(),
            stats: RunStats::default(),
            year: chrono::Utc::now().year(),
        }
    }

    async fn emit(&self, event: ProgressEvent) -> Result<(), PipelineError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| PipelineError::Disconnected)
    }

    async fn enter(
        &self,
        step: u8,
        message: impl Into<String>,
        icon: StatusIcon,
    ) -> Result<Instant, PipelineError> {
        self.emit(ProgressEvent::phase_started(step, message, icon))
            .await?;
        Ok(Instant::now())
    }

    async fn exit(
        &self,
        step: u8,
        message: impl Into<String>,
        icon: StatusIcon,
        started: Instant,
    ) -> Result<(), PipelineError> {
        self.emit(ProgressEvent::phase_finished(step, message, icon, started.elapsed()))
            .await
    }

    async fn execute(mut self) -> Result<(CompletePayload, RunStats), PipelineError> {
        let total = Instant::now();
        let company = self.request.company.clone();

        // Phase 1: research
        let t = self
            .enter(1, format!("Researching {company} across the web..."), StatusIcon::Search)
            .await?;
        let round1 = self
            .engine
            .round(&round_one_queries(&company), &mut self.seen)
            .await;
        self.stats.record_round(&round1);
        if round1.results.is_empty() {
            warn!("Round 1 returned no results; search provider may be unavailable");
            self.exit(
                1,
                "Round 1 returned no results, search unavailable",
                StatusIcon::Warning,
                t,
            )
            .await?;
        } else {
            self.exit(
                1,
                format!("Round 1 complete: {} sources found", round1.results.len()),
                StatusIcon::Check,
                t,
            )
            .await?;
        }

        // Phase 2: core extraction
        let t = self
            .enter(2, "Extracting company entities...", StatusIcon::Brain)
            .await?;
        let text = format_for_extraction(&round1.results);
        let extractor = self.deps.extractor.clone();
        let result = on_worker("core extraction", async move {
            extractor.extract_core(&text).await
        })
        .await?;
        let core: CoreEntities = settle(&mut self.stats, "core extraction", result);
        self.exit(
            2,
            format!(
                "Extracted: {} competitors, {} investors",
                core.competitors.len(),
                core.investors.len()
            ),
            StatusIcon::Check,
            t,
        )
        .await?;

        let sector = core.company.sector.clone();

        // Phase 3a: market and M&A
        let t = self
            .enter(3, "Deep-diving market landscape and M&A activity...", StatusIcon::Search)
            .await?;
        let competitors = core.competitor_names(MAX_COMPETITOR_QUERIES);
        let round2 = self
            .engine
            .round(
                &round_two_queries(&company, &sector, &competitors, self.year),
                &mut self.seen,
            )
            .await;
        self.stats.record_round(&round2);
        let text = format_for_extraction(&round2.results);
        let extractor = self.deps.extractor.clone();
        let result = on_worker("market extraction", async move {
            extractor.extract_market(&text).await
        })
        .await?;
        let market: MarketEntities = settle(&mut self.stats, "market extraction", result);
        let market_name = if market.market.name.trim().is_empty() {
            "TBD"
        } else {
            market.market.name.as_str()
        };
        self.exit(
            3,
            format!(
                "Found {} M&A comps, market: {market_name}",
                market.acquisitions.len()
            ),
            StatusIcon::Check,
            t,
        )
        .await?;

        // Phase 3b: risk signals and exit intelligence
        let t = self
            .enter(3, "Scanning for risk signals and exit indicators...", StatusIcon::Search)
            .await?;
        let acquirers = market.top_acquirer_names(MAX_ACQUIRER_QUERIES);
        let round3 = self
            .engine
            .round(
                &round_three_queries(&company, &sector, &acquirers, self.year),
                &mut self.seen,
            )
            .await;
        self.stats.record_round(&round3);
        let text = format_for_extraction(&round3.results);
        let extractor = self.deps.extractor.clone();
        let result = on_worker("signal extraction", async move {
            extractor.extract_signals(&text).await
        })
        .await?;
        let signals: SignalEntities = settle(&mut self.stats, "signal extraction", result);
        self.exit(
            3,
            format!("Detected {} risk signals", signals.risk_signals.len()),
            StatusIcon::Check,
            t,
        )
        .await?;

        // Phase 4: relationship graph
        let t = self
            .enter(4, "Building relationship graph...", StatusIcon::Graph)
            .await?;
        let target = resolve_target(&core, &company);
        let graph = RelationshipGraph::open(self.deps.graph.clone()).await;
        let build = build_graph(&graph, &target, &core, &market, &signals).await;
        self.stats.record_graph(&build);
        let insights = graph.run_analysis_queries(&target).await;
        let graph_message = if insights.graph_available {
            format!("Graph ready: {} nodes", insights.total_nodes())
        } else {
            "Graph unavailable (local mode)".to_string()
        };
        self.exit(4, graph_message, StatusIcon::Check, t).await?;
        self.emit(ProgressEvent::GraphReady {
            graph_available: insights.graph_available,
        })
        .await?;

        // Phase 5: analysis
        let t = self
            .enter(5, "Analyzing M&A comps, red flags, and exit probability...", StatusIcon::Chart)
            .await?;
        let analyst = self.deps.analyst.clone();
        let (c, m, s, i) = (core.clone(), market.clone(), signals.clone(), insights.clone());
        let result = on_worker("analysis", async move {
            analyst.analyze(&c, &m, &s, &i).await
        })
        .await?;
        let analysis: AnalysisOutput = settle(&mut self.stats, "analysis", result);
        self.exit(
            5,
            format!(
                "Analysis complete: {} red flags, exit scores generated",
                analysis.red_flags.len()
            ),
            StatusIcon::Check,
            t,
        )
        .await?;

        // Phase 6: memo
        let t = self
            .enter(6, "Writing investment memo...", StatusIcon::Document)
            .await?;
        let preferences = match self.deps.preferences.memo_preferences().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "Failed to load memo preferences, using none");
                String::new()
            }
        };
        let request = MemoRequest {
            company: company.clone(),
            stage: self.request.stage.clone(),
            exit_type: self.request.exit_type.clone(),
            core: core.clone(),
            market: market.clone(),
            signals,
            analysis: analysis.clone(),
            insights: insights.clone(),
            preferences,
        };
        let analyst = self.deps.analyst.clone();
        let result = on_worker("memo", async move { analyst.write_memo(&request).await }).await?;
        let memo = match result {
            Ok(memo) => memo,
            Err(e) => {
                warn!(error = %e, "Memo generation failed, using placeholder");
                self.stats.degraded("memo");
                memo_placeholder(&company, &e)
            }
        };
        self.exit(6, "Investment memo complete", StatusIcon::Check, t)
            .await?;

        let payload = CompletePayload {
            elapsed_total: dealscope_common::round_tenths(total.elapsed()),
            memo,
            comps_table: analysis.comps,
            red_flags: analysis.red_flags,
            exit_scores: analysis.exit_probability,
            ranked_acquirers: analysis.ranked_acquirers,
            competitive_position: analysis.competitive_position,
            company_info: core.company,
            market_info: market.market,
            graph_stats: insights.graph_stats,
            investor_overlaps: insights.investor_overlaps,
        };
        Ok((payload, self.stats))
    }
}

/// The extracted company name when there is one, else the requested name.
/// Graph writes and graph queries both key on this.
fn resolve_target(core: &CoreEntities, requested: &str) -> String {
    let extracted = core.company.name.trim();
    if extracted.is_empty() {
        requested.to_string()
    } else {
        extracted.to_string()
    }
}

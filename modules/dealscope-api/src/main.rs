use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::OpenAi;
use dealscope_common::{Config, GraphBackendKind};
use dealscope_graph::{migrate::migrate, GraphBackend, GraphClient, MemoryGraph, Neo4jGraph};
use dealscope_research::{
    LlmAnalyst, LlmExtractor, Pipeline, PipelineDeps, PreferenceSource, TavilySearcher,
    SEARCH_TIMEOUT,
};

mod db;
mod rest;
#[cfg(test)]
mod testing;

use db::{HistoryStore, PreferenceStore};

pub struct AppState {
    pub pipeline: Pipeline,
    pub history: HistoryStore,
    pub preferences: Arc<PreferenceStore>,
    pub openai_configured: bool,
    pub tavily_configured: bool,
    pub graph_backend: GraphBackendKind,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(rest::api_health))
        .route("/analyze", post(rest::analyze::api_analyze))
        // Run history
        .route("/api/history", get(rest::history::api_history))
        .route(
            "/api/history/{id}",
            get(rest::history::api_history_detail).delete(rest::history::api_history_delete),
        )
        // Analyst preferences
        .route(
            "/api/preferences/memo",
            get(rest::preferences::api_memo_preferences)
                .put(rest::preferences::api_update_memo_preferences),
        )
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        // Logging layer: method + path only
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

/// Resolve the configured backend. Neo4j failures at startup fall back to
/// local mode rather than aborting.
async fn open_graph(config: &Config) -> Option<Arc<dyn GraphBackend>> {
    match config.effective_graph_backend() {
        GraphBackendKind::Neo4j => {
            let client = match GraphClient::connect(
                &config.neo4j_uri,
                &config.neo4j_user,
                &config.neo4j_password,
            )
            .await
            {
                Ok(client) => client,
                Err(e) => {
                    warn!(error = %e, "Neo4j unreachable, running in local mode");
                    return None;
                }
            };
            if let Err(e) = migrate(&client).await {
                warn!(error = %e, "Neo4j schema migration failed");
            }
            info!("Connected to Neo4j at {}", config.neo4j_uri);
            Some(Arc::new(Neo4jGraph::new(client)))
        }
        GraphBackendKind::Memory => {
            info!("Using in-memory relationship graph");
            Some(Arc::new(MemoryGraph::new()))
        }
        GraphBackendKind::Auto | GraphBackendKind::None => {
            info!("Relationship graph disabled, running in local mode");
            None
        }
    }
}

/// What `/health` reports: the configured backend only if it actually opened.
pub fn active_backend(configured: GraphBackendKind, opened: bool) -> GraphBackendKind {
    if opened {
        configured
    } else {
        GraphBackendKind::None
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("dealscope=info".parse()?);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = Config::from_env()?;
    config.log_redacted();

    let graph = open_graph(&config).await;
    let graph_backend = active_backend(config.effective_graph_backend(), graph.is_some());
    let pool = db::connect(&config.database_url).await;
    let history = HistoryStore::new(pool.clone());
    let preferences = Arc::new(PreferenceStore::new(pool));

    let http = reqwest::Client::builder()
        .timeout(SEARCH_TIMEOUT)
        .build()?;
    let ai = OpenAi::new(config.openai_api_key.clone(), config.openai_model.clone());
    info!(model = ai.model(), "OpenAI client ready");

    let deps = PipelineDeps::builder()
        .searcher(Arc::new(TavilySearcher::new(config.tavily_api_key.clone(), http)))
        .extractor(Arc::new(LlmExtractor::new(ai.clone())))
        .analyst(Arc::new(LlmAnalyst::new(ai)))
        .graph(graph)
        .preferences(preferences.clone() as Arc<dyn PreferenceSource>)
        .search_concurrency(config.search_concurrency)
        .build();

    let state = Arc::new(AppState {
        pipeline: Pipeline::new(deps),
        history,
        preferences,
        openai_configured: !config.openai_api_key.is_empty(),
        tavily_configured: !config.tavily_api_key.is_empty(),
        graph_backend,
    });

    let app = router(state);

    let addr = format!("{}:{}", config.web_host, config.web_port);
    info!("DealScope API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

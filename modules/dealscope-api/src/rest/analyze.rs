use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::Stream;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

use dealscope_common::{CompletePayload, ProgressEvent};
use dealscope_research::RunRequest;

use crate::db::HistoryStore;
use crate::AppState;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    company: String,
    #[serde(default = "default_stage")]
    stage: String,
    #[serde(default, alias = "exitType")]
    exit_type: String,
}

fn default_stage() -> String {
    "Series A".to_string()
}

/// Start a run and stream its progress as server-sent events.
pub async fn api_analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeRequest>,
) -> Response {
    let request = match RunRequest::new(body.company, body.stage, body.exit_type) {
        Ok(r) => r,
        Err(_) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({"error": "Company name is required"})),
            )
                .into_response();
        }
    };

    info!(company = %request.company, stage = %request.stage, "Analysis requested");
    let company = request.company.clone();
    let rx = state.pipeline.start(request);

    Sse::new(event_stream(rx, company, state.history.clone()))
        .keep_alive(KeepAlive::default())
        .into_response()
}

/// Drains the run's channel. Dropping the stream (client gone) drops the
/// receiver, which the pipeline observes as a disconnect.
fn event_stream(
    mut rx: mpsc::Receiver<ProgressEvent>,
    company: String,
    history: HistoryStore,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        while let Some(event) = rx.recv().await {
            if let ProgressEvent::Complete(payload) = &event {
                save_in_background(&history, &company, payload);
            }
            yield Ok(to_sse(&event));
        }
    }
}

fn to_sse(event: &ProgressEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(event.data().to_string())
}

fn save_in_background(history: &HistoryStore, company: &str, payload: &CompletePayload) {
    if !history.is_enabled() {
        return;
    }
    let result = match serde_json::to_value(payload) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Failed to serialize result for history");
            return;
        }
    };
    let history = history.clone();
    let company = company.to_string();
    let sector = payload.company_info.sector.clone();
    tokio::spawn(async move {
        history.save(&company, &sector, &result).await;
    });
}

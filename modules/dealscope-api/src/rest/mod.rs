pub mod analyze;
pub mod history;
pub mod preferences;

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Json},
};

use crate::AppState;

pub async fn api_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "openaiConfigured": state.openai_configured,
        "tavilyConfigured": state.tavily_configured,
        "graphBackend": state.graph_backend.to_string(),
        "historyEnabled": state.history.is_enabled(),
    }))
}

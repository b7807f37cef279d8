use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::warn;

use crate::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    limit: Option<u32>,
}

pub async fn api_history(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HistoryQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(20).min(100);
    match state.history.list(limit).await {
        Ok(items) => Json(serde_json::json!(items)).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to list analyses");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_history_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = id.parse::<i32>() else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match state.history.get(id).await {
        Ok(Some(record)) => Json(serde_json::json!(record)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(error = %e, id, "Failed to get analysis");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_history_delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let Ok(id) = id.parse::<i32>() else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    match state.history.delete(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(error = %e, id, "Failed to delete analysis");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

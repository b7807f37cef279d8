use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::AppState;

pub const MAX_PREFERENCE_CHARS: usize = 4000;

#[derive(Deserialize)]
pub struct MemoPreferenceBody {
    preferences: String,
}

pub async fn api_memo_preferences(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.preferences.memo().await {
        Ok(preferences) => Json(serde_json::json!({ "preferences": preferences })).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to read memo preferences");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn api_update_memo_preferences(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MemoPreferenceBody>,
) -> impl IntoResponse {
    let preferences = body.preferences.trim();
    if preferences.chars().count() > MAX_PREFERENCE_CHARS {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": format!("Preferences too long (max {MAX_PREFERENCE_CHARS} characters)")
            })),
        )
            .into_response();
    }

    match state.preferences.set_memo(preferences).await {
        Ok(saved) => {
            if saved {
                info!(chars = preferences.len(), "Memo preferences updated");
            }
            Json(serde_json::json!({ "preferences": preferences, "saved": saved })).into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to store memo preferences");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use super::MAX_PREFERENCE_CHARS;
    use crate::testing::{body_json, test_state};

    fn put(body: serde_json::Value) -> Request<Body> {
        Request::put("/api/preferences/memo")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn read_without_database_is_empty() {
        let app = crate::router(test_state());
        let response = app
            .oneshot(Request::get("/api/preferences/memo").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["preferences"], "");
    }

    #[tokio::test]
    async fn write_without_database_is_not_saved() {
        let app = crate::router(test_state());
        let response = app
            .oneshot(put(serde_json::json!({ "preferences": "  lead with risks  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["preferences"], "lead with risks");
        assert_eq!(json["saved"], false);
    }

    #[tokio::test]
    async fn oversized_preferences_rejected() {
        let app = crate::router(test_state());
        let long = "x".repeat(MAX_PREFERENCE_CHARS + 1);
        let response = app
            .oneshot(put(serde_json::json!({ "preferences": long })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

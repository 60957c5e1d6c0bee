use crate::unfurl::{UNSAFE_CONTENT_BLOCKED, UnfurlOutcome};
use axum::{
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json},
};

use super::{AppState, UnfurlBody};

/// GET /health
pub(super) async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /link/unfurl
pub(super) async fn handle_unfurl(
    State(state): State<AppState>,
    body: Result<Json<UnfurlBody>, JsonRejection>,
) -> impl IntoResponse {
    let Json(UnfurlBody { url }) = match body {
        Ok(body) => body,
        Err(rejection) => {
            let err = serde_json::json!({
                "error": "validation_failed",
                "message": rejection.body_text(),
            });
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(err));
        }
    };
    if url.trim().is_empty() {
        let err = serde_json::json!({
            "error": "validation_failed",
            "message": "The url field is required.",
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(err));
    }

    outcome_response(&url, state.unfurler.unfurl(&url).await)
}

fn outcome_response(url: &str, outcome: UnfurlOutcome) -> (StatusCode, Json<serde_json::Value>) {
    match outcome {
        UnfurlOutcome::Preview(preview) => match serde_json::to_value(&preview) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(e) => failed(&e.to_string()),
        },
        UnfurlOutcome::Blocked { .. } => {
            let body = serde_json::json!({
                "error": UNSAFE_CONTENT_BLOCKED,
                "url": url,
            });
            (StatusCode::FORBIDDEN, Json(body))
        }
        UnfurlOutcome::Failed { kind, detail } => {
            tracing::warn!(url, %kind, "link unfurl failed: {detail}");
            failed(&detail)
        }
    }
}

fn failed(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    let body = serde_json::json!({
        "error": "failed_to_unfurl",
        "message": message,
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
}

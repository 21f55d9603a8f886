//! Route handlers for the Icebreaker API.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use icebreaker_kernel::{BatchRequest, LeadError, LeadPipeline, LeadRequest};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state.
pub struct AppState {
    pub pipeline: LeadPipeline,
}

impl AppState {
    pub fn new(pipeline: LeadPipeline) -> Self {
        Self { pipeline }
    }
}

/// HTTP status for a failed lead.
pub fn status_for(error: &LeadError) -> StatusCode {
    match error {
        LeadError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        LeadError::ScrapeEmpty { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        LeadError::Scrape(_) | LeadError::Generation(_) => StatusCode::BAD_GATEWAY,
    }
}

fn bad_request(message: String) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
}

/// GET /api/health — Liveness check.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /api/process-leads — Scrape one profile and draft its outreach.
pub async fn process_lead(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LeadRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected lead request");
            return bad_request(rejection.body_text());
        }
    };

    match state.pipeline.process_lead_with_error(&request).await {
        Ok(outcome) => (StatusCode::OK, Json(serde_json::json!(outcome))),
        Err((outcome, error)) => (status_for(&error), Json(serde_json::json!(outcome))),
    }
}

/// POST /api/process-leads/batch — Process several profiles in order.
///
/// Always 200 once the body is valid; failed leads are error rows in `results`.
pub async fn process_batch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(batch) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected batch request");
            return bad_request(rejection.body_text());
        }
    };

    if batch.urls().is_empty() {
        return bad_request("Provide at least one profile URL in profileUrls or leads".to_string());
    }

    let results = state.pipeline.process_batch(&batch).await;
    info!(
        leads = results.len(),
        failed = results.iter().filter(|r| r.is_error()).count(),
        "Batch request complete"
    );
    (
        StatusCode::OK,
        Json(serde_json::json!({ "results": results })),
    )
}

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;

use crate::api::models::HealthResponse;
use crate::api::routes::AppState;
use crate::optimization::{FallbackReason, OptimizationOutcome, OptimizeRequest};

// ========== OPTIMIZATION ==========

pub async fn optimize_route(
    State(app_state): State<AppState>,
    payload: Result<Json<OptimizeRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!("unreadable optimize request: {}", rejection.body_text());
            let outcome = OptimizationOutcome::Fallback(FallbackReason::Exception(rejection.body_text()));
            record_outcome(&outcome);
            return outcome.into_response();
        }
    };

    // run on its own task so a panic deep in the search still answers with a fallback
    let optimizer = app_state.optimizer.clone();
    let outcome = match tokio::spawn(async move { optimizer.optimize(&request).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!("optimizer task failed: {e}");
            OptimizationOutcome::Fallback(FallbackReason::Exception(e.to_string()))
        }
    };

    record_outcome(&outcome);
    outcome.into_response()
}

/// Fills the `outcome` and `code` fields left empty on the request span.
fn record_outcome(outcome: &OptimizationOutcome) {
    let span = tracing::Span::current();
    span.record("outcome", outcome.kind());
    if let Some(code) = outcome.code() {
        span.record("code", code);
    }
}

// ========== HEALTH ==========

pub async fn health_check(State(app_state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        routing_configured: app_state.optimizer.is_configured(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

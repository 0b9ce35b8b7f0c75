use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use crate::optimization::OptimizationOutcome;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: Option<&str>) -> Self {
        ErrorResponse {
            error: error.into(),
            code: code.map(str::to_string),
        }
    }
}

/// Sent with HTTP 200 when the caller should compute its own estimate instead.
#[derive(Debug, Serialize, Deserialize)]
pub struct FallbackResponse {
    pub error: String,
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub routing_configured: bool,
    pub timestamp: String,
}

impl IntoResponse for OptimizationOutcome {
    fn into_response(self) -> Response {
        match self {
            OptimizationOutcome::Optimized(result) => (StatusCode::OK, Json(result)).into_response(),
            OptimizationOutcome::Fallback(reason) => {
                let body = FallbackResponse {
                    error: reason.message().to_string(),
                    fallback: true,
                    code: reason.code().map(str::to_string),
                };
                (StatusCode::OK, Json(body)).into_response()
            }
            OptimizationOutcome::Rejected(e) => {
                let body = ErrorResponse::new(e.to_string(), e.code());
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
        }
    }
}

//! Health check handler

use super::types::HealthResponse;
use axum::response::Json;

/// Health check endpoint
#[cfg_attr(
    feature = "openapi",
    utoipa::path(
        get,
        path = "/api/health",
        tag = "Health",
        responses(
            (status = 200, description = "Service is healthy", body = HealthResponse)
        )
    )
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

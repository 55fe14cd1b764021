use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "chat-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness probe. The service has no hard dependencies: an unreachable
/// understanding service is answered with fallback replies.
pub async fn readiness_check() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn metrics() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        crate::services::metrics::get_metrics(),
    )
}

/// Fallback for unknown `/api/*` paths.
pub async fn api_not_found() -> AppError {
    AppError::not_found("Invalid API endpoint")
}

//! Health check endpoint handler.

use crate::api::response;
use axum::response::IntoResponse;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    response::ok(HealthResponse { status: "ok" })
}

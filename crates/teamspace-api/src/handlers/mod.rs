//! Request handlers, one module per resource

pub mod auth;
pub mod tasks;
pub mod teams;
pub mod workspaces;

use axum::Json;

use crate::models::HealthResponse;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

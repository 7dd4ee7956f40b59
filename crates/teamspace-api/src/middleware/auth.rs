//! Session authentication middleware
//!
//! Extracts the session token from the `session_token` cookie or the
//! Authorization header, resolves it against the session table and makes the
//! user available to handlers via Axum's Extension.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use teamspace_core::{session, SessionRejection};

use crate::models::ErrorResponse;
use crate::AppState;

pub const SESSION_COOKIE: &str = "session_token";

/// Authenticated user context
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: Uuid,
}

fn unauthorized(code: &str, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.into(),
            code: Some(code.to_string()),
            errors: None,
        }),
    )
}

fn token_from_cookie(request: &Request) -> Option<String> {
    let cookies = request.headers().get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(|c| c.trim())
        .find_map(|c| c.strip_prefix("session_token="))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Authentication middleware for the protected routes
///
/// # Errors
/// Returns 401 Unauthorized if:
/// - Both cookie and Authorization header are missing
/// - The token is malformed, expired or not a session token
/// - The session behind the token was revoked by a logout
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, (StatusCode, Json<ErrorResponse>)> {
    // Cookie first (web apps), then the Authorization header (API clients)
    let token = match token_from_cookie(&request) {
        Some(t) => t,
        None => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .ok_or_else(|| {
                    unauthorized(
                        "MISSING_AUTH",
                        "Missing authentication token (cookie or Authorization header)",
                    )
                })?;

            auth_header
                .strip_prefix("Bearer ")
                .ok_or_else(|| {
                    unauthorized(
                        "INVALID_AUTH_FORMAT",
                        "Invalid Authorization header format. Expected 'Bearer <token>'",
                    )
                })?
                .to_string()
        }
    };

    let user_id = session::authenticate(
        state.store.as_ref(),
        &state.sessions,
        &token,
        state.clock.now(),
    )
    .await
    .map_err(|rejection| match rejection {
        SessionRejection::Store(e) => {
            error!(error = %e, "Session lookup failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "Internal server error".to_string(),
                    code: Some(e.code().to_string()),
                    errors: None,
                }),
            )
        }
        other => {
            debug!(reason = %other, "Rejected session token");
            unauthorized(other.code(), format!("Invalid or expired token: {}", other))
        }
    })?;

    request.extensions_mut().insert(AuthUser { user_id });

    Ok(next.run(request).await)
}

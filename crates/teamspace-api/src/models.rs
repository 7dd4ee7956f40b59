//! Response bodies specific to the HTTP layer
//!
//! Domain records and request payloads come from `teamspace_core`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

use teamspace_core::User;

/// Error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Field name to messages, for validation failures
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<BTreeMap<String, Vec<String>>>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Version
    pub version: String,
}

/// Returned by register and login
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: User,
    /// Session token (also set as the `session_token` cookie)
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
    /// Number of sessions that were revoked
    pub revoked_sessions: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ForgotPasswordResponse {
    pub message: String,
    /// Only present when the server runs in debug mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<ResetDebugInfo>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ResetDebugInfo {
    pub token: String,
    pub reset_url: String,
    pub expires_at: DateTime<Utc>,
}

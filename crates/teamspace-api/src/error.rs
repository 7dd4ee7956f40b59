//! Mapping of core failures onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::error;

use teamspace_core::CoreError;

use crate::models::ErrorResponse;

/// Error returned by every handler.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: message.into(),
                code: Some(code.to_string()),
                errors: None,
            },
        }
    }

    /// Internal details are only echoed when `debug` is set; they are always logged.
    pub fn from_core(err: CoreError, debug: bool) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            CoreError::Validation(fields) => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: ErrorResponse {
                    error: "The given data was invalid".to_string(),
                    code: Some(code.to_string()),
                    errors: Some(fields.into_inner()),
                },
            },
            CoreError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, code, message),
            CoreError::PermissionDenied(reason) => {
                Self::new(StatusCode::FORBIDDEN, code, reason)
            }
            CoreError::Conflict(kind) => Self::new(StatusCode::CONFLICT, code, kind.to_string()),
            CoreError::InvalidOrExpiredToken(failure) => {
                Self::new(StatusCode::BAD_REQUEST, code, failure.to_string())
            }
            CoreError::Internal(detail) => {
                error!(detail = %detail, "Internal error while handling request");
                let message = if debug {
                    detail
                } else {
                    "Internal server error".to_string()
                };
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, code, message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use teamspace_core::{ConflictKind, EntityKind, TokenFailure};
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CoreError::field("email", "taken"), StatusCode::UNPROCESSABLE_ENTITY),
            (
                CoreError::not_found(EntityKind::Team, Uuid::new_v4()),
                StatusCode::NOT_FOUND,
            ),
            (CoreError::denied("no"), StatusCode::FORBIDDEN),
            (CoreError::Conflict(ConflictKind::LastLeader), StatusCode::CONFLICT),
            (
                CoreError::InvalidOrExpiredToken(TokenFailure::Expired),
                StatusCode::BAD_REQUEST,
            ),
            (CoreError::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from_core(err, false).status, status);
        }
    }

    #[test]
    fn test_validation_carries_field_errors() {
        let err = ApiError::from_core(CoreError::field("email", "taken"), false);
        let errors = err.body.errors.unwrap();
        assert_eq!(errors["email"], vec!["taken".to_string()]);
        assert_eq!(err.body.code.as_deref(), Some("VALIDATION_FAILED"));
    }

    #[test]
    fn test_internal_detail_hidden_unless_debug() {
        let hidden = ApiError::from_core(CoreError::internal("database error: locked"), false);
        assert_eq!(hidden.body.error, "Internal server error");

        let shown = ApiError::from_core(CoreError::internal("database error: locked"), true);
        assert_eq!(shown.body.error, "database error: locked");
    }
}

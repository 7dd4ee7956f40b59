//! Request body extraction
//!
//! Bodies that do not deserialize are answered with an [`ErrorResponse`]
//! like every other failure. A missing or mistyped field is reported under
//! `errors` with status 422; unreadable JSON keeps axum's status.
//!
//! [`ErrorResponse`]: crate::models::ErrorResponse

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
};
use std::collections::BTreeMap;

use crate::error::ApiError;
use crate::models::ErrorResponse;

/// `axum::Json` with [`ApiError`] as its rejection.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

const DATA_ERROR_PREFIX: &str = "target type: ";

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => {
                let text = e.body_text();
                let (field, message) = rejected_field(&text);

                let mut errors = BTreeMap::new();
                errors.insert(field, vec![message]);
                ApiError {
                    status: StatusCode::UNPROCESSABLE_ENTITY,
                    body: ErrorResponse {
                        error: "The given data was invalid".to_string(),
                        code: Some("VALIDATION_FAILED".to_string()),
                        errors: Some(errors),
                    },
                }
            }
            other => ApiError::new(other.status(), "INVALID_BODY", other.body_text()),
        }
    }
}

/// Split a deserialization failure into the offending field and its message.
fn rejected_field(text: &str) -> (String, String) {
    let detail = text
        .rsplit_once(DATA_ERROR_PREFIX)
        .map_or(text, |(_, detail)| detail);

    if let Some(rest) = detail.split_once("missing field `").map(|(_, rest)| rest) {
        if let Some((field, _)) = rest.split_once('`') {
            return (field.to_string(), format!("{} is required", field));
        }
    }

    match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(char::is_whitespace) => {
            (path.to_string(), message.to_string())
        }
        _ => ("body".to_string(), detail.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_is_named() {
        let (field, message) = rejected_field(
            "Failed to deserialize the JSON body into the target type: missing field `email` at line 1 column 2",
        );
        assert_eq!(field, "email");
        assert_eq!(message, "email is required");
    }

    #[test]
    fn test_mistyped_field_uses_path() {
        let (field, message) = rejected_field(
            "Failed to deserialize the JSON body into the target type: progress: invalid type: string \"ten\", expected i32 at line 1 column 17",
        );
        assert_eq!(field, "progress");
        assert!(message.starts_with("invalid type"));
    }

    #[test]
    fn test_unplaceable_error_goes_to_body() {
        let (field, _) = rejected_field("invalid type: sequence, expected struct LoginInput");
        assert_eq!(field, "body");
    }
}

//! Failure kinds returned by every core operation

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use teamspace_auth::{JwtError, PasswordError};
use thiserror::Error;
use uuid::Uuid;

/// Field name → messages, in the shape the HTTP layer returns under `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "{}", fields.join(", "))
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            for e in errs.iter() {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field));
                out.add(field.to_string(), message);
            }
        }
        out
    }
}

/// Entity named in a `NotFound` failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Workspace,
    Team,
    Membership,
    Task,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Workspace => "workspace",
            EntityKind::Team => "team",
            EntityKind::Membership => "membership",
            EntityKind::Task => "task",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The user already has a membership in the team.
    AlreadyMember,
    /// The change would leave the team without a leader.
    LastLeader,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::AlreadyMember => f.write_str("user is already a member of this team"),
            ConflictKind::LastLeader => f.write_str("a team must keep at least one leader"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenFailure {
    Invalid,
    Expired,
}

impl fmt::Display for TokenFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenFailure::Invalid => f.write_str("invalid password reset token"),
            TokenFailure::Expired => f.write_str("password reset token has expired"),
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("conflict: {0}")]
    Conflict(ConflictKind),

    #[error("{0}")]
    InvalidOrExpiredToken(TokenFailure),

    #[error("internal failure: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation(FieldErrors::single(field, message))
    }

    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        CoreError::PermissionDenied(reason.into())
    }

    pub fn internal(detail: impl fmt::Display) -> Self {
        CoreError::Internal(detail.to_string())
    }

    /// Stable machine-readable code for the HTTP layer.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "VALIDATION_FAILED",
            CoreError::NotFound { .. } => "NOT_FOUND",
            CoreError::PermissionDenied(_) => "PERMISSION_DENIED",
            CoreError::Conflict(ConflictKind::AlreadyMember) => "ALREADY_MEMBER",
            CoreError::Conflict(ConflictKind::LastLeader) => "LAST_LEADER",
            CoreError::InvalidOrExpiredToken(TokenFailure::Invalid) => "INVALID_TOKEN",
            CoreError::InvalidOrExpiredToken(TokenFailure::Expired) => "TOKEN_EXPIRED",
            CoreError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<PasswordError> for CoreError {
    fn from(e: PasswordError) -> Self {
        CoreError::Internal(e.to_string())
    }
}

impl From<JwtError> for CoreError {
    fn from(e: JwtError) -> Self {
        CoreError::Internal(e.to_string())
    }
}

impl From<validator::ValidationErrors> for CoreError {
    fn from(e: validator::ValidationErrors) -> Self {
        CoreError::Validation(e.into())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_errors_accumulate_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("email", "is required");
        errors.add("email", "must be valid");
        errors.add("password", "too short");

        assert!(errors.contains("password"));
        assert_eq!(errors.to_string(), "email, password");
        assert_eq!(errors.into_inner()["email"].len(), 2);
    }

    #[test]
    fn test_codes_distinguish_conflicts_and_token_failures() {
        assert_eq!(
            CoreError::Conflict(ConflictKind::LastLeader).code(),
            "LAST_LEADER"
        );
        assert_eq!(
            CoreError::Conflict(ConflictKind::AlreadyMember).code(),
            "ALREADY_MEMBER"
        );
        assert_eq!(
            CoreError::InvalidOrExpiredToken(TokenFailure::Expired).code(),
            "TOKEN_EXPIRED"
        );
        assert_ne!(
            CoreError::denied("x").code(),
            CoreError::Conflict(ConflictKind::LastLeader).code()
        );
    }

    #[test]
    fn test_not_found_message() {
        let id = Uuid::nil();
        let err = CoreError::not_found(EntityKind::Team, id);
        assert_eq!(err.to_string(), format!("team {} not found", id));
    }
}

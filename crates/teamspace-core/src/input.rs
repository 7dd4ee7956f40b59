//! Request payloads accepted by the core operations
//!
//! Each payload carries its field-level rules as `validator` attributes; the
//! services call [`check`] before touching the store.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

use crate::error::CoreResult;
use crate::model::TeamRole;

/// Run the payload's field rules.
pub fn check<T: Validate>(input: &T) -> CoreResult<()> {
    input.validate()?;
    Ok(())
}

/// Absent field: `None`. Explicit `null`: `Some(None)`.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RegisterInput {
    #[validate(length(min = 1, max = 50, message = "first_name is required (max 50 characters)"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50, message = "last_name is required (max 50 characters)"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(length(max = 20, message = "phone must be at most 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "password confirmation does not match"))]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct LoginInput {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ChangePasswordInput {
    #[validate(length(min = 1, message = "current_password is required"))]
    pub current_password: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "password confirmation does not match"))]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ForgotPasswordInput {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ResetPasswordInput {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "password confirmation does not match"))]
    pub password_confirmation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct WorkspaceInput {
    #[validate(length(min = 1, max = 255, message = "name is required (max 255 characters)"))]
    pub name: String,
    /// Left unchanged on update when absent; `null` clears it
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateTeamInput {
    #[validate(length(min = 1, max = 255, message = "name is required (max 255 characters)"))]
    pub name: String,
    pub workspace_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct RenameTeamInput {
    #[validate(length(min = 1, max = 255, message = "name is required (max 255 characters)"))]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct AddMemberInput {
    pub user_id: Uuid,
    pub role: TeamRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct ChangeRoleInput {
    pub role: TeamRole,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct CreateTaskInput {
    #[validate(length(min = 1, max = 255, message = "title is required (max 255 characters)"))]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub workspace_id: Uuid,
    /// Team whose leadership authorizes the creation; must belong to `workspace_id`
    pub team_id: Uuid,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
}

/// Partial task update. Which fields apply depends on the caller's authority:
/// leaders may set any of them, the assignee only `progress` (required) and
/// `is_done`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct UpdateTaskInput {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "title must be 1-255 characters"))]
    pub title: Option<String>,
    /// `null` clears the description
    #[serde(
        default,
        deserialize_with = "nullable",
        skip_serializing_if = "Option::is_none"
    )]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>))]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub assigned_to: Option<Uuid>,
    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "progress must be between 0 and 100"))]
    pub progress: Option<i32>,
    #[serde(default)]
    pub is_done: Option<bool>,
}

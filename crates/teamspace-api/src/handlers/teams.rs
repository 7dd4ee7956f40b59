//! Team and membership handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use teamspace_core::{
    input::{AddMemberInput, ChangeRoleInput, CreateTeamInput, RenameTeamInput},
    service::teams,
    Task, TeamDetail, TeamMember,
};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::models::ErrorResponse;
use crate::AppState;

/// List teams the current user belongs to
#[utoipa::path(
    get,
    path = "/api/teams",
    responses(
        (status = 200, description = "Teams with workspace and members", body = Vec<TeamDetail>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn list_teams(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<TeamDetail>>, ApiError> {
    let list = teams::list_my_teams(state.store.as_ref(), auth.user_id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(list))
}

/// Create a team in a workspace; the creator becomes its leader
#[utoipa::path(
    post,
    path = "/api/teams",
    request_body = CreateTeamInput,
    responses(
        (status = 201, description = "Team created", body = TeamDetail),
        (status = 403, description = "Not the workspace creator", body = ErrorResponse),
        (status = 404, description = "Workspace not found", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn create_team(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<CreateTeamInput>,
) -> Result<(StatusCode, Json<TeamDetail>), ApiError> {
    let team = teams::create_team(state.store.as_ref(), auth.user_id, input, state.clock.now())
        .await
        .map_err(|e| state.fail(e))?;

    Ok((StatusCode::CREATED, Json(team)))
}

#[utoipa::path(
    get,
    path = "/api/teams/{id}",
    params(
        ("id" = Uuid, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team detail", body = TeamDetail),
        (status = 403, description = "Not a team member", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn get_team(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<TeamDetail>, ApiError> {
    let team = teams::get_team(state.store.as_ref(), auth.user_id, id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(team))
}

/// Rename a team (leaders only)
#[utoipa::path(
    put,
    path = "/api/teams/{id}",
    params(
        ("id" = Uuid, Path, description = "Team ID")
    ),
    request_body = RenameTeamInput,
    responses(
        (status = 200, description = "Team updated", body = TeamDetail),
        (status = 403, description = "Not a team leader", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn update_team(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<RenameTeamInput>,
) -> Result<Json<TeamDetail>, ApiError> {
    let team = teams::rename_team(
        state.store.as_ref(),
        auth.user_id,
        id,
        input,
        state.clock.now(),
    )
    .await
    .map_err(|e| state.fail(e))?;

    Ok(Json(team))
}

/// Delete a team (leaders only); workspace tasks are kept
#[utoipa::path(
    delete,
    path = "/api/teams/{id}",
    params(
        ("id" = Uuid, Path, description = "Team ID")
    ),
    responses(
        (status = 204, description = "Team deleted"),
        (status = 403, description = "Not a team leader", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn delete_team(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    teams::delete_team(state.store.as_ref(), auth.user_id, id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Add a user to a team (leaders only)
#[utoipa::path(
    post,
    path = "/api/teams/{id}/members",
    params(
        ("id" = Uuid, Path, description = "Team ID")
    ),
    request_body = AddMemberInput,
    responses(
        (status = 201, description = "Member added", body = TeamDetail),
        (status = 403, description = "Not a team leader", body = ErrorResponse),
        (status = 404, description = "Team or user not found", body = ErrorResponse),
        (status = 409, description = "User is already a member", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<AddMemberInput>,
) -> Result<(StatusCode, Json<TeamDetail>), ApiError> {
    let team = teams::add_member(
        state.store.as_ref(),
        auth.user_id,
        id,
        input,
        state.clock.now(),
    )
    .await
    .map_err(|e| state.fail(e))?;

    Ok((StatusCode::CREATED, Json(team)))
}

/// Change a member's role (leaders only)
#[utoipa::path(
    put,
    path = "/api/teams/{id}/members/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Team ID"),
        ("user_id" = Uuid, Path, description = "Member's user ID")
    ),
    request_body = ChangeRoleInput,
    responses(
        (status = 200, description = "Role changed", body = TeamMember),
        (status = 403, description = "Not a team leader", body = ErrorResponse),
        (status = 404, description = "Team or membership not found", body = ErrorResponse),
        (status = 409, description = "Would demote the last leader", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
    ApiJson(input): ApiJson<ChangeRoleInput>,
) -> Result<Json<TeamMember>, ApiError> {
    let member = teams::change_member_role(state.store.as_ref(), auth.user_id, id, user_id, input)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(member))
}

/// Remove a member from a team (leaders only)
#[utoipa::path(
    delete,
    path = "/api/teams/{id}/members/{user_id}",
    params(
        ("id" = Uuid, Path, description = "Team ID"),
        ("user_id" = Uuid, Path, description = "Member's user ID")
    ),
    responses(
        (status = 204, description = "Member removed"),
        (status = 403, description = "Not a team leader", body = ErrorResponse),
        (status = 404, description = "Team or membership not found", body = ErrorResponse),
        (status = 409, description = "Would remove the last leader", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, ApiError> {
    teams::remove_member(state.store.as_ref(), auth.user_id, id, user_id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Tasks of the team's workspace, newest first
#[utoipa::path(
    get,
    path = "/api/teams/{id}/tasks",
    params(
        ("id" = Uuid, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Team tasks", body = Vec<Task>),
        (status = 403, description = "Not a team member", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse)
    ),
    tag = "teams"
)]
pub async fn list_team_tasks(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = teams::list_team_tasks(state.store.as_ref(), auth.user_id, id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(tasks))
}

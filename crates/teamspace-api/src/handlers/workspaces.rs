//! Workspace handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use teamspace_core::{
    input::WorkspaceInput, service::workspaces, Task, Workspace, WorkspaceDetail,
};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::models::ErrorResponse;
use crate::AppState;

/// List workspaces created by the current user
#[utoipa::path(
    get,
    path = "/api/workspaces",
    responses(
        (status = 200, description = "Own workspaces with teams and tasks", body = Vec<WorkspaceDetail>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "workspaces"
)]
pub async fn list_workspaces(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<WorkspaceDetail>>, ApiError> {
    let list = workspaces::list_own_workspaces(state.store.as_ref(), auth.user_id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(list))
}

/// Create a workspace owned by the current user
#[utoipa::path(
    post,
    path = "/api/workspaces",
    request_body = WorkspaceInput,
    responses(
        (status = 201, description = "Workspace created", body = Workspace),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "workspaces"
)]
pub async fn create_workspace(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<WorkspaceInput>,
) -> Result<(StatusCode, Json<Workspace>), ApiError> {
    let workspace =
        workspaces::create_workspace(state.store.as_ref(), auth.user_id, input, state.clock.now())
            .await
            .map_err(|e| state.fail(e))?;

    Ok((StatusCode::CREATED, Json(workspace)))
}

/// Get a workspace with its teams and tasks
#[utoipa::path(
    get,
    path = "/api/workspaces/{id}",
    params(
        ("id" = Uuid, Path, description = "Workspace ID")
    ),
    responses(
        (status = 200, description = "Workspace detail", body = WorkspaceDetail),
        (status = 403, description = "Not the creator or a team member", body = ErrorResponse),
        (status = 404, description = "Workspace not found", body = ErrorResponse)
    ),
    tag = "workspaces"
)]
pub async fn get_workspace(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkspaceDetail>, ApiError> {
    let detail = workspaces::get_workspace(state.store.as_ref(), auth.user_id, id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(detail))
}

/// Rename or re-describe a workspace (creator only)
#[utoipa::path(
    put,
    path = "/api/workspaces/{id}",
    params(
        ("id" = Uuid, Path, description = "Workspace ID")
    ),
    request_body = WorkspaceInput,
    responses(
        (status = 200, description = "Workspace updated", body = Workspace),
        (status = 403, description = "Not the creator", body = ErrorResponse),
        (status = 404, description = "Workspace not found", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "workspaces"
)]
pub async fn update_workspace(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<WorkspaceInput>,
) -> Result<Json<Workspace>, ApiError> {
    let workspace = workspaces::update_workspace(
        state.store.as_ref(),
        auth.user_id,
        id,
        input,
        state.clock.now(),
    )
    .await
    .map_err(|e| state.fail(e))?;

    Ok(Json(workspace))
}

/// Delete a workspace with its teams and tasks (creator only)
#[utoipa::path(
    delete,
    path = "/api/workspaces/{id}",
    params(
        ("id" = Uuid, Path, description = "Workspace ID")
    ),
    responses(
        (status = 204, description = "Workspace deleted"),
        (status = 403, description = "Not the creator", body = ErrorResponse),
        (status = 404, description = "Workspace not found", body = ErrorResponse)
    ),
    tag = "workspaces"
)]
pub async fn delete_workspace(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    workspaces::delete_workspace(state.store.as_ref(), auth.user_id, id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Tasks of a workspace, newest first
#[utoipa::path(
    get,
    path = "/api/workspaces/{id}/tasks",
    params(
        ("id" = Uuid, Path, description = "Workspace ID")
    ),
    responses(
        (status = 200, description = "Workspace tasks", body = Vec<Task>),
        (status = 403, description = "Not the creator or a team member", body = ErrorResponse),
        (status = 404, description = "Workspace not found", body = ErrorResponse)
    ),
    tag = "workspaces"
)]
pub async fn list_workspace_tasks(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = workspaces::list_workspace_tasks(state.store.as_ref(), auth.user_id, id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(tasks))
}

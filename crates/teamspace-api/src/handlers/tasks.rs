//! Task handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;
use uuid::Uuid;

use teamspace_core::{
    input::{CreateTaskInput, UpdateTaskInput},
    service::tasks,
    Task,
};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::models::ErrorResponse;
use crate::AppState;

/// List tasks assigned to the current user
#[utoipa::path(
    get,
    path = "/api/tasks",
    responses(
        (status = 200, description = "Assigned tasks", body = Vec<Task>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let list = tasks::list_my_tasks(state.store.as_ref(), auth.user_id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(list))
}

/// Create a task in a workspace on behalf of a team the caller leads
#[utoipa::path(
    post,
    path = "/api/tasks",
    request_body = CreateTaskInput,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 403, description = "Not a leader of a team in the workspace", body = ErrorResponse),
        (status = 404, description = "Workspace, team or assignee not found", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = tasks::create_task(state.store.as_ref(), auth.user_id, input, state.clock.now())
        .await
        .map_err(|e| state.fail(e))?;

    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 200, description = "Task", body = Task),
        (status = 403, description = "Neither assignee nor creator", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn get_task(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let task = tasks::get_task(state.store.as_ref(), auth.user_id, id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(task))
}

/// Update a task
///
/// Leaders in the task's workspace may change any field. The assignee may
/// only change `progress` and `is_done`; other submitted fields are ignored.
#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    request_body = UpdateTaskInput,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 403, description = "Neither a leader nor the assignee", body = ErrorResponse),
        (status = 404, description = "Task or assignee not found", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn update_task(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    ApiJson(input): ApiJson<UpdateTaskInput>,
) -> Result<Json<Task>, ApiError> {
    let task = tasks::update_task(
        state.store.as_ref(),
        auth.user_id,
        id,
        input,
        state.clock.now(),
    )
    .await
    .map_err(|e| state.fail(e))?;

    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    params(
        ("id" = Uuid, Path, description = "Task ID")
    ),
    responses(
        (status = 204, description = "Task deleted"),
        (status = 403, description = "Not a leader in the task's workspace", body = ErrorResponse),
        (status = 404, description = "Task not found", body = ErrorResponse)
    ),
    tag = "tasks"
)]
pub async fn delete_task(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    tasks::delete_task(state.store.as_ref(), auth.user_id, id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(StatusCode::NO_CONTENT)
}

//! Task actions

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{require_task, require_team, require_user, require_workspace};
use crate::authz::{
    authorize_task_create, authorize_task_delete, authorize_task_read, permitted_changes,
    task_edit_scope, TaskEditScope,
};
use crate::error::CoreResult;
use crate::input::{check, CreateTaskInput, UpdateTaskInput};
use crate::model::{Task, TaskId, UserId};
use crate::store::Store;

pub async fn create_task<S>(
    store: &S,
    actor: UserId,
    input: CreateTaskInput,
    now: DateTime<Utc>,
) -> CoreResult<Task>
where
    S: Store + ?Sized,
{
    check(&input)?;
    require_workspace(store, input.workspace_id).await?;
    let team = require_team(store, input.team_id).await?;
    if let Some(assignee) = input.assigned_to {
        require_user(store, assignee).await?;
    }

    let role = store.membership_role(team.id, actor).await?;
    if let Err(e) = authorize_task_create(role, &team, input.workspace_id) {
        warn!(team_id = %team.id, user_id = %actor, "Task creation denied");
        return Err(e);
    }

    let task = store
        .insert_task(Task {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            progress: 0,
            is_done: false,
            workspace_id: input.workspace_id,
            assigned_to: input.assigned_to,
            created_by: actor,
            created_at: now,
            updated_at: now,
        })
        .await?;

    info!(task_id = %task.id, workspace_id = %task.workspace_id, "Task created");
    Ok(task)
}

pub async fn list_my_tasks<S>(store: &S, actor: UserId) -> CoreResult<Vec<Task>>
where
    S: Store + ?Sized,
{
    let tasks = store.list_tasks_assigned_to(actor).await?;
    debug!(user_id = %actor, count = tasks.len(), "Listed assigned tasks");
    Ok(tasks)
}

pub async fn get_task<S>(store: &S, actor: UserId, id: TaskId) -> CoreResult<Task>
where
    S: Store + ?Sized,
{
    let task = require_task(store, id).await?;
    authorize_task_read(actor, &task)?;
    Ok(task)
}

/// Apply the subset of `input` the actor is allowed to change.
///
/// Leaders of any team in the task's workspace may change every field; the
/// assignee only progress and the done flag, and anything else they send is
/// dropped.
pub async fn update_task<S>(
    store: &S,
    actor: UserId,
    id: TaskId,
    input: UpdateTaskInput,
    now: DateTime<Utc>,
) -> CoreResult<Task>
where
    S: Store + ?Sized,
{
    check(&input)?;
    let mut task = require_task(store, id).await?;

    let leads = store.is_leader_in_workspace(task.workspace_id, actor).await?;
    let scope = match task_edit_scope(actor, &task, leads) {
        Ok(scope) => scope,
        Err(e) => {
            warn!(task_id = %id, user_id = %actor, "Task update denied");
            return Err(e);
        }
    };
    let changes = permitted_changes(scope, &input)?;

    if let Some(assignee) = changes.assigned_to {
        require_user(store, assignee).await?;
    }
    if scope == TaskEditScope::ProgressOnly
        && (input.title.is_some() || input.description.is_some() || input.assigned_to.is_some())
    {
        debug!(task_id = %id, "Ignoring fields the assignee may not change");
    }

    changes.apply(&mut task);
    task.updated_at = now;

    let task = store.update_task(task).await?;
    info!(task_id = %task.id, user_id = %actor, ?scope, "Task updated");
    Ok(task)
}

pub async fn delete_task<S>(store: &S, actor: UserId, id: TaskId) -> CoreResult<()>
where
    S: Store + ?Sized,
{
    let task = require_task(store, id).await?;
    let leads = store.is_leader_in_workspace(task.workspace_id, actor).await?;
    authorize_task_delete(leads)?;

    store.delete_task(id).await?;
    info!(task_id = %id, user_id = %actor, "Task deleted");
    Ok(())
}

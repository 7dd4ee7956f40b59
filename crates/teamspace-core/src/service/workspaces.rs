//! Workspace actions

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use super::require_workspace;
use crate::authz::{authorize_workspace, WorkspaceAccess, WorkspaceAction};
use crate::error::CoreResult;
use crate::input::{check, WorkspaceInput};
use crate::model::{Task, TeamWithMembers, UserId, Workspace, WorkspaceDetail, WorkspaceId};
use crate::store::Store;

async fn authorize<S>(
    store: &S,
    actor: UserId,
    workspace: &Workspace,
    action: WorkspaceAction,
) -> CoreResult<()>
where
    S: Store + ?Sized,
{
    // Membership only matters when the actor is not the creator.
    let is_team_member = workspace.created_by != actor
        && store.is_member_in_workspace(workspace.id, actor).await?;

    authorize_workspace(
        actor,
        WorkspaceAccess {
            workspace,
            is_team_member,
        },
        action,
    )
}

async fn detail<S>(store: &S, workspace: Workspace) -> CoreResult<WorkspaceDetail>
where
    S: Store + ?Sized,
{
    let mut teams = Vec::new();
    for team in store.list_teams_in_workspace(workspace.id).await? {
        let members = store.list_members(team.id).await?;
        teams.push(TeamWithMembers { team, members });
    }
    let tasks = store.list_tasks_in_workspace(workspace.id).await?;

    Ok(WorkspaceDetail {
        workspace,
        teams,
        tasks,
    })
}

pub async fn create_workspace<S>(
    store: &S,
    actor: UserId,
    input: WorkspaceInput,
    now: DateTime<Utc>,
) -> CoreResult<Workspace>
where
    S: Store + ?Sized,
{
    check(&input)?;

    let workspace = store
        .insert_workspace(Workspace {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description.flatten().unwrap_or_default(),
            created_by: actor,
            created_at: now,
            updated_at: now,
        })
        .await?;

    info!(workspace_id = %workspace.id, user_id = %actor, "Workspace created");
    Ok(workspace)
}

/// Workspaces the actor created, each with its teams and tasks.
pub async fn list_own_workspaces<S>(store: &S, actor: UserId) -> CoreResult<Vec<WorkspaceDetail>>
where
    S: Store + ?Sized,
{
    let mut out = Vec::new();
    for workspace in store.list_workspaces_created_by(actor).await? {
        out.push(detail(store, workspace).await?);
    }
    debug!(user_id = %actor, count = out.len(), "Listed own workspaces");
    Ok(out)
}

pub async fn get_workspace<S>(store: &S, actor: UserId, id: WorkspaceId) -> CoreResult<WorkspaceDetail>
where
    S: Store + ?Sized,
{
    let workspace = require_workspace(store, id).await?;
    authorize(store, actor, &workspace, WorkspaceAction::Read).await?;

    detail(store, workspace).await
}

pub async fn update_workspace<S>(
    store: &S,
    actor: UserId,
    id: WorkspaceId,
    input: WorkspaceInput,
    now: DateTime<Utc>,
) -> CoreResult<Workspace>
where
    S: Store + ?Sized,
{
    check(&input)?;
    let mut workspace = require_workspace(store, id).await?;
    authorize(store, actor, &workspace, WorkspaceAction::Update).await?;

    workspace.name = input.name;
    if let Some(description) = input.description {
        workspace.description = description.unwrap_or_default();
    }
    workspace.updated_at = now;

    let workspace = store.update_workspace(workspace).await?;
    info!(workspace_id = %workspace.id, "Workspace updated");
    Ok(workspace)
}

/// Removes the workspace with all of its teams, memberships and tasks.
pub async fn delete_workspace<S>(store: &S, actor: UserId, id: WorkspaceId) -> CoreResult<()>
where
    S: Store + ?Sized,
{
    let workspace = require_workspace(store, id).await?;
    authorize(store, actor, &workspace, WorkspaceAction::Delete).await?;

    store.delete_workspace(id).await?;
    info!(workspace_id = %id, user_id = %actor, "Workspace deleted");
    Ok(())
}

/// Newest first.
pub async fn list_workspace_tasks<S>(
    store: &S,
    actor: UserId,
    id: WorkspaceId,
) -> CoreResult<Vec<Task>>
where
    S: Store + ?Sized,
{
    let workspace = require_workspace(store, id).await?;
    authorize(store, actor, &workspace, WorkspaceAction::Read).await?;

    store.list_tasks_in_workspace(id).await
}

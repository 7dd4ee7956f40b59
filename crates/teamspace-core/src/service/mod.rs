//! One async function per user-facing action
//!
//! Every function takes the store, the acting user and the raw input, and
//! runs its checks in a fixed order: field validation, lookups (NotFound),
//! permission, conflict guards, then the write.

pub mod accounts;
pub mod tasks;
pub mod teams;
pub mod workspaces;

use crate::error::{CoreError, CoreResult, EntityKind};
use crate::model::{Task, TaskId, Team, TeamId, User, UserId, Workspace, WorkspaceId};
use crate::store::Store;

pub(crate) async fn require_user<S>(store: &S, id: UserId) -> CoreResult<User>
where
    S: Store + ?Sized,
{
    store
        .find_user(id)
        .await?
        .map(|record| record.user)
        .ok_or_else(|| CoreError::not_found(EntityKind::User, id))
}

pub(crate) async fn require_workspace<S>(store: &S, id: WorkspaceId) -> CoreResult<Workspace>
where
    S: Store + ?Sized,
{
    store
        .find_workspace(id)
        .await?
        .ok_or_else(|| CoreError::not_found(EntityKind::Workspace, id))
}

pub(crate) async fn require_team<S>(store: &S, id: TeamId) -> CoreResult<Team>
where
    S: Store + ?Sized,
{
    store
        .find_team(id)
        .await?
        .ok_or_else(|| CoreError::not_found(EntityKind::Team, id))
}

pub(crate) async fn require_task<S>(store: &S, id: TaskId) -> CoreResult<Task>
where
    S: Store + ?Sized,
{
    store
        .find_task(id)
        .await?
        .ok_or_else(|| CoreError::not_found(EntityKind::Task, id))
}

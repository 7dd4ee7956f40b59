//! Repository traits the core operations run against
//!
//! Methods documented as atomic must commit all of their writes or none.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::model::{
    Membership, PasswordResetToken, Session, Task, TaskId, Team, TeamId, TeamMember, TeamRole,
    User, UserId, UserRecord, Workspace, WorkspaceId,
};

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, record: UserRecord) -> CoreResult<UserRecord>;
    async fn find_user(&self, id: UserId) -> CoreResult<Option<UserRecord>>;
    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<UserRecord>>;
    /// All users ordered by first name.
    async fn list_users(&self) -> CoreResult<Vec<User>>;
    /// Users without a membership in `team_id`, ordered by first name.
    async fn list_users_outside_team(&self, team_id: TeamId) -> CoreResult<Vec<User>>;
    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<()>;
}

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn insert_workspace(&self, workspace: Workspace) -> CoreResult<Workspace>;
    async fn find_workspace(&self, id: WorkspaceId) -> CoreResult<Option<Workspace>>;
    async fn list_workspaces_created_by(&self, user: UserId) -> CoreResult<Vec<Workspace>>;
    async fn update_workspace(&self, workspace: Workspace) -> CoreResult<Workspace>;
    /// Atomic: removes the workspace with its teams, memberships and tasks.
    async fn delete_workspace(&self, id: WorkspaceId) -> CoreResult<()>;
    /// User has a membership (any role) in some team of the workspace.
    async fn is_member_in_workspace(&self, workspace: WorkspaceId, user: UserId)
        -> CoreResult<bool>;
    /// User is a leader of some team of the workspace.
    async fn is_leader_in_workspace(&self, workspace: WorkspaceId, user: UserId)
        -> CoreResult<bool>;
}

#[async_trait]
pub trait TeamStore: Send + Sync {
    /// Atomic: inserts the team and the leader membership together.
    async fn create_team_with_leader(&self, team: Team, leader: Membership) -> CoreResult<Team>;
    async fn find_team(&self, id: TeamId) -> CoreResult<Option<Team>>;
    async fn list_teams_in_workspace(&self, workspace: WorkspaceId) -> CoreResult<Vec<Team>>;
    async fn list_teams_for_user(&self, user: UserId) -> CoreResult<Vec<Team>>;
    async fn update_team(&self, team: Team) -> CoreResult<Team>;
    /// Atomic: removes the team and its memberships.
    async fn delete_team(&self, id: TeamId) -> CoreResult<()>;

    async fn membership_role(&self, team: TeamId, user: UserId) -> CoreResult<Option<TeamRole>>;
    async fn membership_exists(&self, team: TeamId, user: UserId) -> CoreResult<bool> {
        Ok(self.membership_role(team, user).await?.is_some())
    }
    async fn leader_count(&self, team: TeamId) -> CoreResult<u64>;
    async fn list_members(&self, team: TeamId) -> CoreResult<Vec<TeamMember>>;
    async fn insert_membership(&self, membership: Membership) -> CoreResult<()>;
    async fn delete_membership(&self, team: TeamId, user: UserId) -> CoreResult<()>;
    async fn set_member_role(&self, team: TeamId, user: UserId, role: TeamRole) -> CoreResult<()>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: Task) -> CoreResult<Task>;
    async fn find_task(&self, id: TaskId) -> CoreResult<Option<Task>>;
    async fn update_task(&self, task: Task) -> CoreResult<Task>;
    async fn delete_task(&self, id: TaskId) -> CoreResult<()>;
    async fn list_tasks_assigned_to(&self, user: UserId) -> CoreResult<Vec<Task>>;
    /// Newest first.
    async fn list_tasks_in_workspace(&self, workspace: WorkspaceId) -> CoreResult<Vec<Task>>;
}

#[async_trait]
pub trait ResetTokenStore: Send + Sync {
    /// Atomic: deletes any row for `token.email`, then inserts `token`.
    async fn replace_reset_token(&self, token: PasswordResetToken) -> CoreResult<()>;
    async fn find_reset_token(&self, email: &str) -> CoreResult<Option<PasswordResetToken>>;
    /// Deletes the row for `email` only if it still holds `token_hash`.
    /// Returns `false` when a newer request already replaced it.
    async fn delete_reset_token_if(&self, email: &str, token_hash: &str) -> CoreResult<bool>;
    /// Atomic compare-and-swap: deletes the row for `email` only if it still
    /// holds `token_hash`, and in the same transaction sets the user's
    /// password hash. Returns `false` (and changes nothing) when the row was
    /// already gone or replaced.
    async fn consume_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        user: UserId,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<bool>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: Session) -> CoreResult<()>;
    async fn find_session(&self, id: Uuid) -> CoreResult<Option<Session>>;
    /// Returns how many sessions were removed.
    async fn delete_sessions_for_user(&self, user: UserId) -> CoreResult<u64>;
}

/// Everything the core operations need from persistence.
pub trait Store:
    UserStore + WorkspaceStore + TeamStore + TaskStore + ResetTokenStore + SessionStore
{
}

impl<T> Store for T where
    T: UserStore + WorkspaceStore + TeamStore + TaskStore + ResetTokenStore + SessionStore
{
}

//! SeaORM implementation of the core store traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use teamspace_core::{
    CoreError, CoreResult, Membership, PasswordResetToken, ResetTokenStore, Session, SessionStore,
    Task, TaskId, TaskStore, Team, TeamId, TeamMember, TeamRole, TeamStore, User, UserId,
    UserRecord, UserStore, Workspace, WorkspaceId, WorkspaceStore,
};
use tracing::debug;
use uuid::Uuid;

use crate::entities::team_member::MemberRole;
use crate::entities::{
    auth_session, password_reset_token, task, team, team_member, user, workspace,
};

fn db_err(e: DbErr) -> CoreError {
    CoreError::internal(format!("database error: {}", e))
}

/// Store backed by a SeaORM connection pool.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn workspace_row(w: Workspace) -> workspace::ActiveModel {
    workspace::ActiveModel {
        id: Set(w.id),
        name: Set(w.name),
        description: Set(w.description),
        created_by: Set(w.created_by),
        created_at: Set(w.created_at),
        updated_at: Set(w.updated_at),
    }
}

fn team_row(t: Team) -> team::ActiveModel {
    team::ActiveModel {
        id: Set(t.id),
        name: Set(t.name),
        workspace_id: Set(t.workspace_id),
        created_at: Set(t.created_at),
        updated_at: Set(t.updated_at),
    }
}

fn membership_row(m: Membership) -> team_member::ActiveModel {
    team_member::ActiveModel {
        team_id: Set(m.team_id),
        user_id: Set(m.user_id),
        role: Set(m.role.into()),
        joined_at: Set(m.joined_at),
    }
}

fn task_row(t: Task) -> task::ActiveModel {
    task::ActiveModel {
        id: Set(t.id),
        title: Set(t.title),
        description: Set(t.description),
        progress: Set(i32::from(t.progress)),
        is_done: Set(t.is_done),
        workspace_id: Set(t.workspace_id),
        assigned_to: Set(t.assigned_to),
        created_by: Set(t.created_by),
        created_at: Set(t.created_at),
        updated_at: Set(t.updated_at),
    }
}

#[async_trait]
impl UserStore for SeaOrmStore {
    async fn insert_user(&self, record: UserRecord) -> CoreResult<UserRecord> {
        let u = record.user;
        let row = user::ActiveModel {
            id: Set(u.id),
            first_name: Set(u.first_name),
            last_name: Set(u.last_name),
            phone: Set(u.phone),
            email: Set(u.email),
            password_hash: Set(record.password_hash),
            created_at: Set(u.created_at),
            updated_at: Set(u.updated_at),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(row.into())
    }

    async fn find_user(&self, id: UserId) -> CoreResult<Option<UserRecord>> {
        let row = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<UserRecord>> {
        let row = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_users(&self) -> CoreResult<Vec<User>> {
        let rows = user::Entity::find()
            .order_by_asc(user::Column::FirstName)
            .order_by_asc(user::Column::LastName)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_users_outside_team(&self, team_id: TeamId) -> CoreResult<Vec<User>> {
        let members = Query::select()
            .column(team_member::Column::UserId)
            .from(team_member::Entity)
            .and_where(team_member::Column::TeamId.eq(team_id))
            .to_owned();

        let rows = user::Entity::find()
            .filter(user::Column::Id.not_in_subquery(members))
            .order_by_asc(user::Column::FirstName)
            .order_by_asc(user::Column::LastName)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        user::Entity::update_many()
            .col_expr(user::Column::PasswordHash, Expr::value(password_hash.to_owned()))
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl WorkspaceStore for SeaOrmStore {
    async fn insert_workspace(&self, workspace: Workspace) -> CoreResult<Workspace> {
        let row = workspace_row(workspace)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }

    async fn find_workspace(&self, id: WorkspaceId) -> CoreResult<Option<Workspace>> {
        let row = workspace::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_workspaces_created_by(&self, user: UserId) -> CoreResult<Vec<Workspace>> {
        let rows = workspace::Entity::find()
            .filter(workspace::Column::CreatedBy.eq(user))
            .order_by_desc(workspace::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_workspace(&self, workspace: Workspace) -> CoreResult<Workspace> {
        let row = workspace_row(workspace)
            .update(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.into())
    }

    async fn delete_workspace(&self, id: WorkspaceId) -> CoreResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let teams = Query::select()
            .column(team::Column::Id)
            .from(team::Entity)
            .and_where(team::Column::WorkspaceId.eq(id))
            .to_owned();

        let memberships = team_member::Entity::delete_many()
            .filter(team_member::Column::TeamId.in_subquery(teams))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        let tasks = task::Entity::delete_many()
            .filter(task::Column::WorkspaceId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        let teams = team::Entity::delete_many()
            .filter(team::Column::WorkspaceId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        workspace::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        debug!(
            workspace_id = %id,
            teams = teams.rows_affected,
            memberships = memberships.rows_affected,
            tasks = tasks.rows_affected,
            "Workspace removed with children"
        );
        Ok(())
    }

    async fn is_member_in_workspace(
        &self,
        workspace: WorkspaceId,
        user: UserId,
    ) -> CoreResult<bool> {
        let count = team_member::Entity::find()
            .join(JoinType::InnerJoin, team_member::Relation::Team.def())
            .filter(team::Column::WorkspaceId.eq(workspace))
            .filter(team_member::Column::UserId.eq(user))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }

    async fn is_leader_in_workspace(
        &self,
        workspace: WorkspaceId,
        user: UserId,
    ) -> CoreResult<bool> {
        let count = team_member::Entity::find()
            .join(JoinType::InnerJoin, team_member::Relation::Team.def())
            .filter(team::Column::WorkspaceId.eq(workspace))
            .filter(team_member::Column::UserId.eq(user))
            .filter(team_member::Column::Role.eq(MemberRole::Leader))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(count > 0)
    }
}

#[async_trait]
impl TeamStore for SeaOrmStore {
    async fn create_team_with_leader(&self, team: Team, leader: Membership) -> CoreResult<Team> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let row = team_row(team).insert(&txn).await.map_err(db_err)?;
        membership_row(leader)
            .insert(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(row.into())
    }

    async fn find_team(&self, id: TeamId) -> CoreResult<Option<Team>> {
        let row = team::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn list_teams_in_workspace(&self, workspace: WorkspaceId) -> CoreResult<Vec<Team>> {
        let rows = team::Entity::find()
            .filter(team::Column::WorkspaceId.eq(workspace))
            .order_by_asc(team::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_teams_for_user(&self, user: UserId) -> CoreResult<Vec<Team>> {
        let rows = team::Entity::find()
            .join(JoinType::InnerJoin, team::Relation::Members.def())
            .filter(team_member::Column::UserId.eq(user))
            .order_by_asc(team::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_team(&self, team: Team) -> CoreResult<Team> {
        let row = team_row(team).update(&self.db).await.map_err(db_err)?;
        Ok(row.into())
    }

    async fn delete_team(&self, id: TeamId) -> CoreResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        team_member::Entity::delete_many()
            .filter(team_member::Column::TeamId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        team::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)
    }

    async fn membership_role(&self, team: TeamId, user: UserId) -> CoreResult<Option<TeamRole>> {
        let row = team_member::Entity::find_by_id((team, user))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(|m| m.role.into()))
    }

    async fn leader_count(&self, team: TeamId) -> CoreResult<u64> {
        team_member::Entity::find()
            .filter(team_member::Column::TeamId.eq(team))
            .filter(team_member::Column::Role.eq(MemberRole::Leader))
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn list_members(&self, team: TeamId) -> CoreResult<Vec<TeamMember>> {
        let rows = team_member::Entity::find()
            .filter(team_member::Column::TeamId.eq(team))
            .find_also_related(user::Entity)
            .order_by_asc(team_member::Column::JoinedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .filter_map(|(membership, user)| {
                user.map(|u| TeamMember {
                    user: u.into(),
                    role: membership.role.into(),
                    joined_at: membership.joined_at,
                })
            })
            .collect())
    }

    async fn insert_membership(&self, membership: Membership) -> CoreResult<()> {
        membership_row(membership)
            .insert(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn delete_membership(&self, team: TeamId, user: UserId) -> CoreResult<()> {
        team_member::Entity::delete_by_id((team, user))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_member_role(&self, team: TeamId, user: UserId, role: TeamRole) -> CoreResult<()> {
        team_member::ActiveModel {
            team_id: Set(team),
            user_id: Set(user),
            role: Set(role.into()),
            ..Default::default()
        }
        .update(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for SeaOrmStore {
    async fn insert_task(&self, task: Task) -> CoreResult<Task> {
        let row = task_row(task).insert(&self.db).await.map_err(db_err)?;
        Ok(row.into())
    }

    async fn find_task(&self, id: TaskId) -> CoreResult<Option<Task>> {
        let row = task::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn update_task(&self, task: Task) -> CoreResult<Task> {
        let row = task_row(task).update(&self.db).await.map_err(db_err)?;
        Ok(row.into())
    }

    async fn delete_task(&self, id: TaskId) -> CoreResult<()> {
        task::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn list_tasks_assigned_to(&self, user: UserId) -> CoreResult<Vec<Task>> {
        let rows = task::Entity::find()
            .filter(task::Column::AssignedTo.eq(user))
            .order_by_desc(task::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_tasks_in_workspace(&self, workspace: WorkspaceId) -> CoreResult<Vec<Task>> {
        let rows = task::Entity::find()
            .filter(task::Column::WorkspaceId.eq(workspace))
            .order_by_desc(task::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl ResetTokenStore for SeaOrmStore {
    async fn replace_reset_token(&self, token: PasswordResetToken) -> CoreResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        password_reset_token::Entity::delete_by_id(token.email.clone())
            .exec(&txn)
            .await
            .map_err(db_err)?;
        password_reset_token::ActiveModel {
            email: Set(token.email),
            token_hash: Set(token.token_hash),
            created_at: Set(token.created_at),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)
    }

    async fn find_reset_token(&self, email: &str) -> CoreResult<Option<PasswordResetToken>> {
        let row = password_reset_token::Entity::find_by_id(email.to_owned())
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn delete_reset_token_if(&self, email: &str, token_hash: &str) -> CoreResult<bool> {
        let deleted = password_reset_token::Entity::delete_many()
            .filter(password_reset_token::Column::Email.eq(email))
            .filter(password_reset_token::Column::TokenHash.eq(token_hash))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(deleted.rows_affected > 0)
    }

    async fn consume_reset_token(
        &self,
        email: &str,
        token_hash: &str,
        user: UserId,
        new_password_hash: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let deleted = password_reset_token::Entity::delete_many()
            .filter(password_reset_token::Column::Email.eq(email))
            .filter(password_reset_token::Column::TokenHash.eq(token_hash))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if deleted.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Ok(false);
        }

        user::Entity::update_many()
            .col_expr(
                user::Column::PasswordHash,
                Expr::value(new_password_hash.to_owned()),
            )
            .col_expr(user::Column::UpdatedAt, Expr::value(now))
            .filter(user::Column::Id.eq(user))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for SeaOrmStore {
    async fn insert_session(&self, session: Session) -> CoreResult<()> {
        auth_session::ActiveModel {
            id: Set(session.id),
            user_id: Set(session.user_id),
            token_hash: Set(session.token_hash),
            expires_at: Set(session.expires_at),
            created_at: Set(session.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> CoreResult<Option<Session>> {
        let row = auth_session::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(row.map(Into::into))
    }

    async fn delete_sessions_for_user(&self, user: UserId) -> CoreResult<u64> {
        let result = auth_session::Entity::delete_many()
            .filter(auth_session::Column::UserId.eq(user))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}

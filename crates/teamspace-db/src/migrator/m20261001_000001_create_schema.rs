//! Initial schema: accounts, workspaces, teams, tasks, resets and sessions

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // users
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(uuid(User::Id).primary_key())
                    .col(string_len(User::FirstName, 50).not_null())
                    .col(string_len(User::LastName, 50).not_null())
                    .col(string_len(User::Phone, 20).null())
                    .col(string_len(User::Email, 255).not_null().unique_key())
                    .col(string_len(User::PasswordHash, 255).not_null())
                    .col(
                        timestamp_with_time_zone(User::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(User::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // workspaces
        manager
            .create_table(
                Table::create()
                    .table(Workspace::Table)
                    .if_not_exists()
                    .col(uuid(Workspace::Id).primary_key())
                    .col(string_len(Workspace::Name, 255).not_null())
                    .col(text(Workspace::Description).not_null().default(""))
                    .col(uuid(Workspace::CreatedBy).not_null())
                    .col(
                        timestamp_with_time_zone(Workspace::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Workspace::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_workspaces_created_by")
                            .from(Workspace::Table, Workspace::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_workspaces_created_by")
                    .table(Workspace::Table)
                    .col(Workspace::CreatedBy)
                    .to_owned(),
            )
            .await?;

        // teams
        manager
            .create_table(
                Table::create()
                    .table(Team::Table)
                    .if_not_exists()
                    .col(uuid(Team::Id).primary_key())
                    .col(string_len(Team::Name, 255).not_null())
                    .col(uuid(Team::WorkspaceId).not_null())
                    .col(
                        timestamp_with_time_zone(Team::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Team::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_teams_workspace_id")
                            .from(Team::Table, Team::WorkspaceId)
                            .to(Workspace::Table, Workspace::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_teams_workspace_id")
                    .table(Team::Table)
                    .col(Team::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        // team_members
        manager
            .create_table(
                Table::create()
                    .table(TeamMember::Table)
                    .if_not_exists()
                    .col(uuid(TeamMember::TeamId).not_null())
                    .col(uuid(TeamMember::UserId).not_null())
                    .col(
                        string_len(TeamMember::Role, 32)
                            .not_null()
                            .default("member"),
                    )
                    .col(
                        timestamp_with_time_zone(TeamMember::JoinedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .primary_key(
                        Index::create()
                            .col(TeamMember::TeamId)
                            .col(TeamMember::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_team_members_team_id")
                            .from(TeamMember::Table, TeamMember::TeamId)
                            .to(Team::Table, Team::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_team_members_user_id")
                            .from(TeamMember::Table, TeamMember::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_team_members_user_id")
                    .table(TeamMember::Table)
                    .col(TeamMember::UserId)
                    .to_owned(),
            )
            .await?;

        // tasks
        manager
            .create_table(
                Table::create()
                    .table(Task::Table)
                    .if_not_exists()
                    .col(uuid(Task::Id).primary_key())
                    .col(string_len(Task::Title, 255).not_null())
                    .col(text(Task::Description).null())
                    .col(integer(Task::Progress).not_null().default(0))
                    .col(boolean(Task::IsDone).not_null().default(false))
                    .col(uuid(Task::WorkspaceId).not_null())
                    .col(uuid(Task::AssignedTo).null())
                    .col(uuid(Task::CreatedBy).not_null())
                    .col(
                        timestamp_with_time_zone(Task::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Task::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_workspace_id")
                            .from(Task::Table, Task::WorkspaceId)
                            .to(Workspace::Table, Workspace::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_assigned_to")
                            .from(Task::Table, Task::AssignedTo)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::SetNull)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tasks_created_by")
                            .from(Task::Table, Task::CreatedBy)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_workspace_id")
                    .table(Task::Table)
                    .col(Task::WorkspaceId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_tasks_assigned_to")
                    .table(Task::Table)
                    .col(Task::AssignedTo)
                    .to_owned(),
            )
            .await?;

        // password_reset_tokens
        manager
            .create_table(
                Table::create()
                    .table(PasswordResetToken::Table)
                    .if_not_exists()
                    .col(string_len(PasswordResetToken::Email, 255).primary_key())
                    .col(string_len(PasswordResetToken::TokenHash, 255).not_null())
                    .col(timestamp_with_time_zone(PasswordResetToken::CreatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        // auth_sessions
        manager
            .create_table(
                Table::create()
                    .table(AuthSession::Table)
                    .if_not_exists()
                    .col(uuid(AuthSession::Id).primary_key())
                    .col(uuid(AuthSession::UserId).not_null())
                    .col(
                        string_len(AuthSession::TokenHash, 64)
                            .not_null()
                            .unique_key(),
                    )
                    .col(timestamp_with_time_zone(AuthSession::ExpiresAt).not_null())
                    .col(
                        timestamp_with_time_zone(AuthSession::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_auth_sessions_user_id")
                            .from(AuthSession::Table, AuthSession::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_auth_sessions_user_id")
                    .table(AuthSession::Table)
                    .col(AuthSession::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Children before parents
        manager
            .drop_table(Table::drop().table(AuthSession::Table).if_exists().to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(PasswordResetToken::Table).if_exists().to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Task::Table).if_exists().to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(TeamMember::Table).if_exists().to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Team::Table).if_exists().to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Workspace::Table).if_exists().to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(User::Table).if_exists().to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum User {
    #[sea_orm(iden = "users")]
    Table,
    Id,
    FirstName,
    LastName,
    Phone,
    Email,
    PasswordHash,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Workspace {
    #[sea_orm(iden = "workspaces")]
    Table,
    Id,
    Name,
    Description,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Team {
    #[sea_orm(iden = "teams")]
    Table,
    Id,
    Name,
    WorkspaceId,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TeamMember {
    #[sea_orm(iden = "team_members")]
    Table,
    TeamId,
    UserId,
    Role,
    JoinedAt,
}

#[derive(DeriveIden)]
enum Task {
    #[sea_orm(iden = "tasks")]
    Table,
    Id,
    Title,
    Description,
    Progress,
    IsDone,
    WorkspaceId,
    AssignedTo,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PasswordResetToken {
    #[sea_orm(iden = "password_reset_tokens")]
    Table,
    Email,
    TokenHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum AuthSession {
    #[sea_orm(iden = "auth_sessions")]
    Table,
    Id,
    UserId,
    TokenHash,
    ExpiresAt,
    CreatedAt,
}

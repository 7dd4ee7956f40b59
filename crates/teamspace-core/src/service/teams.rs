//! Team and membership actions

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{require_team, require_user, require_workspace};
use crate::authz::{
    authorize_team, authorize_workspace, guard_add_member, guard_member_removal,
    guard_role_change, TeamAction, WorkspaceAccess, WorkspaceAction,
};
use crate::error::{CoreError, CoreResult, EntityKind};
use crate::input::{check, AddMemberInput, ChangeRoleInput, CreateTeamInput, RenameTeamInput};
use crate::model::{Membership, Task, Team, TeamDetail, TeamId, TeamMember, TeamRole, UserId};
use crate::store::Store;

async fn detail<S>(store: &S, team: Team) -> CoreResult<TeamDetail>
where
    S: Store + ?Sized,
{
    let workspace = require_workspace(store, team.workspace_id).await?;
    let members = store.list_members(team.id).await?;
    Ok(TeamDetail {
        team,
        workspace,
        members,
    })
}

/// Load the team and check the actor's role against `action`.
async fn authorized_team<S>(
    store: &S,
    actor: UserId,
    team_id: TeamId,
    action: TeamAction,
) -> CoreResult<Team>
where
    S: Store + ?Sized,
{
    let team = require_team(store, team_id).await?;
    let role = store.membership_role(team_id, actor).await?;
    if let Err(e) = authorize_team(role, action) {
        warn!(team_id = %team_id, user_id = %actor, ?action, "Team action denied");
        return Err(e);
    }
    Ok(team)
}

/// Create a team; the creator becomes its first leader atomically.
pub async fn create_team<S>(
    store: &S,
    actor: UserId,
    input: CreateTeamInput,
    now: DateTime<Utc>,
) -> CoreResult<TeamDetail>
where
    S: Store + ?Sized,
{
    check(&input)?;
    let workspace = require_workspace(store, input.workspace_id).await?;
    authorize_workspace(
        actor,
        WorkspaceAccess {
            workspace: &workspace,
            is_team_member: false,
        },
        WorkspaceAction::CreateTeam,
    )?;

    let team = Team {
        id: Uuid::new_v4(),
        name: input.name,
        workspace_id: workspace.id,
        created_at: now,
        updated_at: now,
    };
    let leader = Membership {
        team_id: team.id,
        user_id: actor,
        role: TeamRole::Leader,
        joined_at: now,
    };
    let team = store.create_team_with_leader(team, leader).await?;

    info!(team_id = %team.id, workspace_id = %workspace.id, leader = %actor, "Team created");
    detail(store, team).await
}

/// Teams the actor belongs to, with their workspace and members.
pub async fn list_my_teams<S>(store: &S, actor: UserId) -> CoreResult<Vec<TeamDetail>>
where
    S: Store + ?Sized,
{
    let mut out = Vec::new();
    for team in store.list_teams_for_user(actor).await? {
        out.push(detail(store, team).await?);
    }
    debug!(user_id = %actor, count = out.len(), "Listed teams");
    Ok(out)
}

pub async fn get_team<S>(store: &S, actor: UserId, team_id: TeamId) -> CoreResult<TeamDetail>
where
    S: Store + ?Sized,
{
    let team = authorized_team(store, actor, team_id, TeamAction::Read).await?;
    detail(store, team).await
}

pub async fn rename_team<S>(
    store: &S,
    actor: UserId,
    team_id: TeamId,
    input: RenameTeamInput,
    now: DateTime<Utc>,
) -> CoreResult<TeamDetail>
where
    S: Store + ?Sized,
{
    check(&input)?;
    let mut team = authorized_team(store, actor, team_id, TeamAction::Update).await?;

    team.name = input.name;
    team.updated_at = now;
    let team = store.update_team(team).await?;

    info!(team_id = %team.id, "Team renamed");
    detail(store, team).await
}

/// Removes the team and its memberships. Tasks belong to the workspace and stay.
pub async fn delete_team<S>(store: &S, actor: UserId, team_id: TeamId) -> CoreResult<()>
where
    S: Store + ?Sized,
{
    authorized_team(store, actor, team_id, TeamAction::Delete).await?;

    store.delete_team(team_id).await?;
    info!(team_id = %team_id, user_id = %actor, "Team deleted");
    Ok(())
}

pub async fn add_member<S>(
    store: &S,
    actor: UserId,
    team_id: TeamId,
    input: AddMemberInput,
    now: DateTime<Utc>,
) -> CoreResult<TeamDetail>
where
    S: Store + ?Sized,
{
    require_user(store, input.user_id).await?;
    let team = authorized_team(store, actor, team_id, TeamAction::AddMember).await?;

    guard_add_member(store.membership_role(team_id, input.user_id).await?)?;

    store
        .insert_membership(Membership {
            team_id,
            user_id: input.user_id,
            role: input.role,
            joined_at: now,
        })
        .await?;

    info!(team_id = %team_id, user_id = %input.user_id, role = %input.role, "Member added");
    detail(store, team).await
}

/// Remove a member. The last leader can never be removed, not even by
/// themself.
pub async fn remove_member<S>(
    store: &S,
    actor: UserId,
    team_id: TeamId,
    user_id: UserId,
) -> CoreResult<()>
where
    S: Store + ?Sized,
{
    authorized_team(store, actor, team_id, TeamAction::RemoveMember).await?;

    let target_role = store
        .membership_role(team_id, user_id)
        .await?
        .ok_or_else(|| CoreError::not_found(EntityKind::Membership, user_id))?;
    guard_member_removal(target_role, store.leader_count(team_id).await?)?;

    store.delete_membership(team_id, user_id).await?;
    info!(team_id = %team_id, user_id = %user_id, removed_by = %actor, "Member removed");
    Ok(())
}

pub async fn change_member_role<S>(
    store: &S,
    actor: UserId,
    team_id: TeamId,
    user_id: UserId,
    input: ChangeRoleInput,
) -> CoreResult<TeamMember>
where
    S: Store + ?Sized,
{
    authorized_team(store, actor, team_id, TeamAction::ChangeRole).await?;

    let current = store
        .membership_role(team_id, user_id)
        .await?
        .ok_or_else(|| CoreError::not_found(EntityKind::Membership, user_id))?;
    guard_role_change(current, input.role, store.leader_count(team_id).await?)?;

    store.set_member_role(team_id, user_id, input.role).await?;
    info!(team_id = %team_id, user_id = %user_id, role = %input.role, "Member role changed");

    store
        .list_members(team_id)
        .await?
        .into_iter()
        .find(|m| m.user.id == user_id)
        .ok_or_else(|| CoreError::not_found(EntityKind::Membership, user_id))
}

/// Tasks of the team's workspace, newest first; any member may list them.
pub async fn list_team_tasks<S>(store: &S, actor: UserId, team_id: TeamId) -> CoreResult<Vec<Task>>
where
    S: Store + ?Sized,
{
    let team = authorized_team(store, actor, team_id, TeamAction::ListTasks).await?;
    store.list_tasks_in_workspace(team.workspace_id).await
}

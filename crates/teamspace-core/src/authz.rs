//! Authorization decisions
//!
//! Every function here is pure: callers load the relationship facts (roles,
//! membership, creator) from the store and pass them in. No IO, no panics.
//!
//! Permission failures are reported as [`CoreError::PermissionDenied`];
//! invariant guards that run after a permission check report
//! [`CoreError::Conflict`] so the two can be told apart.

use crate::error::{ConflictKind, CoreError, CoreResult, FieldErrors};
use crate::input::UpdateTaskInput;
use crate::model::{Task, Team, TeamRole, UserId, Workspace, WorkspaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkspaceAction {
    /// View the workspace and its task list
    Read,
    Update,
    Delete,
    CreateTeam,
}

/// Facts about the actor's relationship to a workspace.
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceAccess<'a> {
    pub workspace: &'a Workspace,
    /// Actor holds a membership (any role) in at least one team of the workspace.
    pub is_team_member: bool,
}

pub fn authorize_workspace(
    actor: UserId,
    access: WorkspaceAccess<'_>,
    action: WorkspaceAction,
) -> CoreResult<()> {
    let is_creator = access.workspace.created_by == actor;

    let allowed = match action {
        WorkspaceAction::Read => is_creator || access.is_team_member,
        WorkspaceAction::Update | WorkspaceAction::Delete | WorkspaceAction::CreateTeam => {
            is_creator
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(CoreError::denied(match action {
            WorkspaceAction::Read => "you do not have access to this workspace",
            WorkspaceAction::Update => "only the workspace creator can update it",
            WorkspaceAction::Delete => "only the workspace creator can delete it",
            WorkspaceAction::CreateTeam => "only the workspace creator can create teams in it",
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamAction {
    Read,
    ListTasks,
    ListAvailableUsers,
    Update,
    Delete,
    AddMember,
    RemoveMember,
    ChangeRole,
}

impl TeamAction {
    fn requires_leader(&self) -> bool {
        !matches!(
            self,
            TeamAction::Read | TeamAction::ListTasks | TeamAction::ListAvailableUsers
        )
    }
}

/// `actor_role` is the actor's membership role in the team, `None` when the
/// actor is not a member.
pub fn authorize_team(actor_role: Option<TeamRole>, action: TeamAction) -> CoreResult<()> {
    match actor_role {
        Some(TeamRole::Leader) => Ok(()),
        Some(TeamRole::Member) if !action.requires_leader() => Ok(()),
        Some(TeamRole::Member) => Err(CoreError::denied("only team leaders can do this")),
        None => Err(CoreError::denied("you are not a member of this team")),
    }
}

/// Reject adding a user who already has a membership.
pub fn guard_add_member(existing_role: Option<TeamRole>) -> CoreResult<()> {
    match existing_role {
        Some(_) => Err(CoreError::Conflict(ConflictKind::AlreadyMember)),
        None => Ok(()),
    }
}

/// Reject removing the team's last leader, whoever asks.
pub fn guard_member_removal(target_role: TeamRole, leader_count: u64) -> CoreResult<()> {
    if target_role.is_leader() && leader_count <= 1 {
        return Err(CoreError::Conflict(ConflictKind::LastLeader));
    }
    Ok(())
}

/// Reject demoting the team's last leader.
pub fn guard_role_change(current: TeamRole, new: TeamRole, leader_count: u64) -> CoreResult<()> {
    if current.is_leader() && !new.is_leader() && leader_count <= 1 {
        return Err(CoreError::Conflict(ConflictKind::LastLeader));
    }
    Ok(())
}

/// Creating a task needs leadership of `team`, and `team` must live in the
/// requested workspace. A mismatched pairing is reported as a plain permission
/// failure.
pub fn authorize_task_create(
    actor_role_in_team: Option<TeamRole>,
    team: &Team,
    workspace_id: WorkspaceId,
) -> CoreResult<()> {
    let leads = actor_role_in_team.is_some_and(|r| r.is_leader());
    if leads && team.workspace_id == workspace_id {
        Ok(())
    } else {
        Err(CoreError::denied(
            "you do not have permission to create tasks in this team",
        ))
    }
}

/// Only the assignee and the creator may open a single task.
///
/// This is narrower than the workspace and team task listings, which any
/// member can see.
pub fn authorize_task_read(actor: UserId, task: &Task) -> CoreResult<()> {
    if task.assigned_to == Some(actor) || task.created_by == actor {
        Ok(())
    } else {
        Err(CoreError::denied("you do not have permission to view this task"))
    }
}

/// Fields an actor may change on a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEditScope {
    /// Leader of a team in the task's workspace: every field.
    Full,
    /// Assignee only: progress and done flag.
    ProgressOnly,
}

pub fn task_edit_scope(
    actor: UserId,
    task: &Task,
    leads_in_workspace: bool,
) -> CoreResult<TaskEditScope> {
    if leads_in_workspace {
        Ok(TaskEditScope::Full)
    } else if task.assigned_to == Some(actor) {
        Ok(TaskEditScope::ProgressOnly)
    } else {
        Err(CoreError::denied(
            "you do not have permission to update this task",
        ))
    }
}

pub fn authorize_task_delete(leads_in_workspace: bool) -> CoreResult<()> {
    if leads_in_workspace {
        Ok(())
    } else {
        Err(CoreError::denied("only team leaders can delete tasks"))
    }
}

/// Changes that survive the actor's edit scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    pub assigned_to: Option<UserId>,
    pub progress: Option<u8>,
    pub is_done: Option<bool>,
}

impl TaskChanges {
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(assignee) = self.assigned_to {
            task.assigned_to = Some(assignee);
        }
        if let Some(progress) = self.progress {
            task.progress = progress;
        }
        if let Some(is_done) = self.is_done {
            task.is_done = is_done;
        }
    }
}

/// Narrow an update request to the fields `scope` allows.
///
/// Under [`TaskEditScope::ProgressOnly`] `progress` is required and title,
/// description and assignee are dropped without error. `input` must already
/// have passed its field rules.
pub fn permitted_changes(scope: TaskEditScope, input: &UpdateTaskInput) -> CoreResult<TaskChanges> {
    let progress = input
        .progress
        .map(|p| u8::try_from(p.clamp(0, 100)).unwrap_or(0));

    match scope {
        TaskEditScope::Full => Ok(TaskChanges {
            title: input.title.clone(),
            description: input.description.clone(),
            assigned_to: input.assigned_to,
            progress,
            is_done: input.is_done,
        }),
        TaskEditScope::ProgressOnly => {
            let progress = progress.ok_or_else(|| {
                CoreError::Validation(FieldErrors::single("progress", "progress is required"))
            })?;
            Ok(TaskChanges {
                progress: Some(progress),
                is_done: input.is_done,
                ..TaskChanges::default()
            })
        }
    }
}

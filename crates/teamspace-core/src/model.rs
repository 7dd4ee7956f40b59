//! Domain records shared by the store, the services and the HTTP layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

pub type UserId = Uuid;
pub type WorkspaceId = Uuid;
pub type TeamId = Uuid;
pub type TaskId = Uuid;

/// Public view of a user (never carries the password hash)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct User {
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Stored user row including the credential hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Workspace {
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub id: WorkspaceId,
    pub name: String,
    pub description: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Team {
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub id: TeamId,
    pub name: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub workspace_id: WorkspaceId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Role of a user inside one team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Leader,
    Member,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TeamRole::Leader => "leader",
            TeamRole::Member => "member",
        }
    }

    pub fn is_leader(&self) -> bool {
        matches!(self, TeamRole::Leader)
    }
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (team, user) association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Membership {
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub team_id: TeamId,
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub user_id: UserId,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

/// Team member as listed with a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TeamMember {
    pub user: User,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct Task {
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub id: TaskId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Completion percentage, 0–100
    pub progress: u8,
    pub is_done: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub workspace_id: WorkspaceId,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Uuid>))]
    pub assigned_to: Option<UserId>,
    #[cfg_attr(feature = "openapi", schema(value_type = Uuid))]
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Team with its members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TeamWithMembers {
    #[serde(flatten)]
    pub team: Team,
    pub members: Vec<TeamMember>,
}

/// Team with its workspace and members
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub workspace: Workspace,
    pub members: Vec<TeamMember>,
}

/// Workspace with its teams (and their members) and tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct WorkspaceDetail {
    #[serde(flatten)]
    pub workspace: Workspace,
    pub teams: Vec<TeamWithMembers>,
    pub tasks: Vec<Task>,
}

/// Stored password-reset row; at most one per email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetToken {
    pub email: String,
    /// Argon2 PHC hash of the secret
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Server-side record of an issued session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// JWT `jti`
    pub id: Uuid,
    pub user_id: UserId,
    /// SHA-256 hex of the issued JWT
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

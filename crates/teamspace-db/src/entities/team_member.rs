//! Team membership with a per-team role

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use teamspace_core::TeamRole;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum MemberRole {
    #[sea_orm(string_value = "leader")]
    Leader,

    #[sea_orm(string_value = "member")]
    Member,
}

impl From<TeamRole> for MemberRole {
    fn from(role: TeamRole) -> Self {
        match role {
            TeamRole::Leader => MemberRole::Leader,
            TeamRole::Member => MemberRole::Member,
        }
    }
}

impl From<MemberRole> for TeamRole {
    fn from(role: MemberRole) -> Self {
        match role {
            MemberRole::Leader => TeamRole::Leader,
            MemberRole::Member => TeamRole::Member,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "team_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub team_id: Uuid,

    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: Uuid,

    pub role: MemberRole,

    pub joined_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::team::Entity",
        from = "Column::TeamId",
        to = "super::team::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Team,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::team::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Team.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for teamspace_core::Membership {
    fn from(m: Model) -> Self {
        Self {
            team_id: m.team_id,
            user_id: m.user_id,
            role: m.role.into(),
            joined_at: m.joined_at,
        }
    }
}

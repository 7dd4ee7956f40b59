//! User accounts

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub first_name: String,

    pub last_name: String,

    pub phone: Option<String>,

    /// Login name (unique)
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub created_at: ChronoDateTimeUtc,

    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Workspaces created by the user
    #[sea_orm(has_many = "super::workspace::Entity")]
    Workspaces,

    #[sea_orm(has_many = "super::team_member::Entity")]
    TeamMemberships,

    #[sea_orm(has_many = "super::auth_session::Entity")]
    Sessions,
}

impl Related<super::workspace::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Workspaces.def()
    }
}

impl Related<super::team_member::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TeamMemberships.def()
    }
}

impl Related<super::auth_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for teamspace_core::User {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            first_name: m.first_name,
            last_name: m.last_name,
            phone: m.phone,
            email: m.email,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<Model> for teamspace_core::UserRecord {
    fn from(m: Model) -> Self {
        let password_hash = m.password_hash.clone();
        Self {
            user: m.into(),
            password_hash,
        }
    }
}

//! Server-side session rows backing issued JWTs

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auth_sessions")]
pub struct Model {
    /// JWT `jti`
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub user_id: Uuid,

    /// SHA-256 hex of the token
    #[sea_orm(unique)]
    pub token_hash: String,

    pub expires_at: ChronoDateTimeUtc,

    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for teamspace_core::Session {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            token_hash: m.token_hash,
            expires_at: m.expires_at,
            created_at: m.created_at,
        }
    }
}

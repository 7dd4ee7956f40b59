//! Pending password resets, at most one per email

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "password_reset_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub email: String,

    /// Argon2 hash of the mailed secret
    pub token_hash: String,

    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for teamspace_core::PasswordResetToken {
    fn from(m: Model) -> Self {
        Self {
            email: m.email,
            token_hash: m.token_hash,
            created_at: m.created_at,
        }
    }
}

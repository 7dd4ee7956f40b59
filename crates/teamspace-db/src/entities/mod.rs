//! Database entities

pub mod auth_session;
pub mod password_reset_token;
pub mod task;
pub mod team;
pub mod team_member;
pub mod user;
pub mod workspace;

pub mod prelude {
    pub use super::auth_session::Entity as AuthSession;
    pub use super::password_reset_token::Entity as PasswordResetToken;
    pub use super::task::Entity as Task;
    pub use super::team::Entity as Team;
    pub use super::team_member::Entity as TeamMember;
    pub use super::user::Entity as User;
    pub use super::workspace::Entity as Workspace;
}

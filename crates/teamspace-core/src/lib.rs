//! Teamspace domain core
//!
//! Domain records, the authorization rules, the password-reset flow and one
//! async function per user action. Persistence is reached through the traits
//! in [`store`]; mail goes out through a [`notify::Notifier`].

pub mod authz;
pub mod clock;
pub mod error;
pub mod input;
pub mod model;
pub mod notify;
pub mod reset;
pub mod service;
pub mod session;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConflictKind, CoreError, CoreResult, EntityKind, FieldErrors, TokenFailure};
pub use model::{
    Membership, PasswordResetToken, Session, Task, TaskId, Team, TeamDetail, TeamId, TeamMember,
    TeamRole, TeamWithMembers, User, UserId, UserRecord, Workspace, WorkspaceDetail, WorkspaceId,
};
pub use notify::{HttpNotifier, LogNotifier, Notification, Notifier, NotifyError};
pub use reset::{PasswordResetFlow, ResetConfig, ResetTicket};
pub use session::{IssuedSession, SessionConfig, SessionRejection};
pub use store::{
    ResetTokenStore, SessionStore, Store, TaskStore, TeamStore, UserStore, WorkspaceStore,
};

#[cfg(any(test, feature = "mock"))]
pub use notify::MockNotifier;

//! Registration, login and account maintenance

use chrono::{DateTime, Utc};
use teamspace_auth::{hash_password, verify_dummy_password, verify_password};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{require_team, require_user};
use crate::authz::{authorize_team, TeamAction};
use crate::error::{CoreError, CoreResult, EntityKind};
use crate::input::{check, ChangePasswordInput, LoginInput, RegisterInput};
use crate::model::{TeamId, User, UserId, UserRecord};
use crate::session::{issue_session, IssuedSession, SessionConfig};
use crate::store::Store;

/// A user together with a freshly issued session.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub session: IssuedSession,
}

pub async fn register<S>(
    store: &S,
    sessions: &SessionConfig,
    input: RegisterInput,
    now: DateTime<Utc>,
) -> CoreResult<SignedIn>
where
    S: Store + ?Sized,
{
    check(&input)?;

    if store.find_user_by_email(&input.email).await?.is_some() {
        return Err(CoreError::field("email", "the email has already been taken"));
    }

    let password_hash = hash_password(&input.password)?;
    let record = store
        .insert_user(UserRecord {
            user: User {
                id: Uuid::new_v4(),
                first_name: input.first_name,
                last_name: input.last_name,
                phone: input.phone.filter(|p| !p.is_empty()),
                email: input.email,
                created_at: now,
                updated_at: now,
            },
            password_hash,
        })
        .await?;

    let session = issue_session(store, sessions, record.user.id, now).await?;
    info!(user_id = %record.user.id, "User registered");

    Ok(SignedIn {
        user: record.user,
        session,
    })
}

pub async fn login<S>(
    store: &S,
    sessions: &SessionConfig,
    input: LoginInput,
    now: DateTime<Utc>,
) -> CoreResult<SignedIn>
where
    S: Store + ?Sized,
{
    check(&input)?;

    let bad_credentials = || CoreError::field("email", "these credentials do not match our records");

    let record = match store.find_user_by_email(&input.email).await? {
        Some(record) => record,
        None => {
            verify_dummy_password(&input.password);
            warn!(email = %input.email, "Login attempt for unknown email");
            return Err(bad_credentials());
        }
    };

    if !verify_password(&input.password, &record.password_hash)? {
        warn!(user_id = %record.user.id, "Login attempt with wrong password");
        return Err(bad_credentials());
    }

    let session = issue_session(store, sessions, record.user.id, now).await?;
    info!(user_id = %record.user.id, "User logged in");

    Ok(SignedIn {
        user: record.user,
        session,
    })
}

/// Revoke every session of the actor.
pub async fn logout<S>(store: &S, actor: UserId) -> CoreResult<u64>
where
    S: Store + ?Sized,
{
    let revoked = store.delete_sessions_for_user(actor).await?;
    info!(user_id = %actor, revoked, "User logged out");
    Ok(revoked)
}

pub async fn current_user<S>(store: &S, actor: UserId) -> CoreResult<User>
where
    S: Store + ?Sized,
{
    require_user(store, actor).await
}

pub async fn change_password<S>(
    store: &S,
    actor: UserId,
    input: ChangePasswordInput,
    now: DateTime<Utc>,
) -> CoreResult<()>
where
    S: Store + ?Sized,
{
    check(&input)?;

    let record = store
        .find_user(actor)
        .await?
        .ok_or_else(|| CoreError::not_found(EntityKind::User, actor))?;

    if !verify_password(&input.current_password, &record.password_hash)? {
        warn!(user_id = %actor, "Password change with wrong current password");
        return Err(CoreError::field(
            "current_password",
            "the current password is incorrect",
        ));
    }

    let password_hash = hash_password(&input.password)?;
    store.update_password(actor, &password_hash, now).await?;

    info!(user_id = %actor, "Password changed");
    Ok(())
}

pub async fn list_users<S>(store: &S, actor: UserId) -> CoreResult<Vec<User>>
where
    S: Store + ?Sized,
{
    let users = store.list_users().await?;
    debug!(user_id = %actor, count = users.len(), "Listed users");
    Ok(users)
}

/// Users not yet in the team; the actor must belong to it.
pub async fn available_users<S>(store: &S, actor: UserId, team_id: TeamId) -> CoreResult<Vec<User>>
where
    S: Store + ?Sized,
{
    require_team(store, team_id).await?;
    let role = store.membership_role(team_id, actor).await?;
    authorize_team(role, TeamAction::ListAvailableUsers)?;

    store.list_users_outside_team(team_id).await
}

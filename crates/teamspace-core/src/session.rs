//! Session tokens backed by server-side rows
//!
//! A session is an HS256 JWT whose `jti` names a session row. The row stores
//! the SHA-256 fingerprint of the token, so deleting the row revokes the
//! token even though its signature is still valid.

use chrono::{DateTime, Duration, Utc};
use teamspace_auth::{
    fingerprint, JwtClaims, JwtError, JwtValidator, SESSION_AUDIENCE, SESSION_TOKEN_TYPE,
};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::model::{Session, UserId};
use crate::store::SessionStore;

pub const SESSION_ISSUER: &str = "teamspace";

#[derive(Clone)]
pub struct SessionConfig {
    pub jwt_secret: Vec<u8>,
    pub ttl: Duration,
}

impl SessionConfig {
    pub fn new(jwt_secret: impl AsRef<[u8]>, ttl: Duration) -> Self {
        Self {
            jwt_secret: jwt_secret.as_ref().to_vec(),
            ttl,
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("jwt_secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Why a presented token was refused.
#[derive(Debug, Error)]
pub enum SessionRejection {
    #[error("invalid token")]
    Invalid,

    #[error("token expired")]
    Expired,

    #[error("token is not a session token")]
    WrongType,

    #[error("token does not carry a user id")]
    MissingUserId,

    #[error("session has been revoked")]
    Revoked,

    #[error(transparent)]
    Store(#[from] CoreError),
}

impl SessionRejection {
    pub fn code(&self) -> &'static str {
        match self {
            SessionRejection::Invalid => "INVALID_TOKEN",
            SessionRejection::Expired => "TOKEN_EXPIRED",
            SessionRejection::WrongType => "INVALID_TOKEN_TYPE",
            SessionRejection::MissingUserId => "MISSING_USER_ID",
            SessionRejection::Revoked => "SESSION_REVOKED",
            SessionRejection::Store(e) => e.code(),
        }
    }
}

pub async fn issue_session<S>(
    store: &S,
    config: &SessionConfig,
    user_id: UserId,
    now: DateTime<Utc>,
) -> CoreResult<IssuedSession>
where
    S: SessionStore + ?Sized,
{
    let claims = JwtClaims::session(user_id, SESSION_ISSUER, config.ttl);
    let token = JwtValidator::encode(&config.jwt_secret, &claims)?;
    let id = Uuid::parse_str(&claims.jti).map_err(CoreError::internal)?;
    let expires_at = claims.expires_at();

    store
        .insert_session(Session {
            id,
            user_id,
            token_hash: fingerprint(&token),
            expires_at,
            created_at: now,
        })
        .await?;

    debug!(user_id = %user_id, session_id = %id, "Session issued");
    Ok(IssuedSession { token, expires_at })
}

/// Resolve a bearer token to the user it was issued for.
pub async fn authenticate<S>(
    store: &S,
    config: &SessionConfig,
    token: &str,
    now: DateTime<Utc>,
) -> Result<UserId, SessionRejection>
where
    S: SessionStore + ?Sized,
{
    let claims = JwtValidator::new(&config.jwt_secret)
        .with_issuer(SESSION_ISSUER.to_string())
        .with_audience(SESSION_AUDIENCE.to_string())
        .validate(token)
        .map_err(|e| match e {
            JwtError::TokenExpired => SessionRejection::Expired,
            _ => SessionRejection::Invalid,
        })?;

    if claims.token_type.as_deref() != Some(SESSION_TOKEN_TYPE) {
        return Err(SessionRejection::WrongType);
    }

    let user_id = claims
        .user_id
        .as_deref()
        .ok_or(SessionRejection::MissingUserId)
        .and_then(|id| Uuid::parse_str(id).map_err(|_| SessionRejection::MissingUserId))?;

    let session_id = Uuid::parse_str(&claims.jti).map_err(|_| SessionRejection::Invalid)?;
    let session = store
        .find_session(session_id)
        .await?
        .ok_or(SessionRejection::Revoked)?;

    if session.user_id != user_id || session.token_hash != fingerprint(token) {
        return Err(SessionRejection::Revoked);
    }
    if session.expires_at < now {
        return Err(SessionRejection::Expired);
    }

    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySessions(Mutex<Vec<Session>>);

    #[async_trait]
    impl SessionStore for MemorySessions {
        async fn insert_session(&self, session: Session) -> CoreResult<()> {
            self.0.lock().unwrap().push(session);
            Ok(())
        }

        async fn find_session(&self, id: Uuid) -> CoreResult<Option<Session>> {
            Ok(self.0.lock().unwrap().iter().find(|s| s.id == id).cloned())
        }

        async fn delete_sessions_for_user(&self, user: UserId) -> CoreResult<u64> {
            let mut sessions = self.0.lock().unwrap();
            let before = sessions.len();
            sessions.retain(|s| s.user_id != user);
            Ok((before - sessions.len()) as u64)
        }
    }

    fn config() -> SessionConfig {
        SessionConfig::new("session-test-secret", Duration::hours(1))
    }

    #[tokio::test]
    async fn test_issued_session_authenticates() {
        let store = MemorySessions::default();
        let user = Uuid::new_v4();

        let issued = issue_session(&store, &config(), user, Utc::now()).await.unwrap();
        let resolved = authenticate(&store, &config(), &issued.token, Utc::now())
            .await
            .unwrap();

        assert_eq!(resolved, user);
    }

    #[tokio::test]
    async fn test_revoked_session_is_rejected() {
        let store = MemorySessions::default();
        let user = Uuid::new_v4();
        let issued = issue_session(&store, &config(), user, Utc::now()).await.unwrap();

        assert_eq!(store.delete_sessions_for_user(user).await.unwrap(), 1);

        let result = authenticate(&store, &config(), &issued.token, Utc::now()).await;
        assert!(matches!(result, Err(SessionRejection::Revoked)));
    }

    #[tokio::test]
    async fn test_foreign_secret_is_invalid() {
        let store = MemorySessions::default();
        let issued = issue_session(&store, &config(), Uuid::new_v4(), Utc::now())
            .await
            .unwrap();

        let other = SessionConfig::new("another-secret", Duration::hours(1));
        let result = authenticate(&store, &other, &issued.token, Utc::now()).await;
        assert!(matches!(result, Err(SessionRejection::Invalid)));
    }

    #[tokio::test]
    async fn test_non_session_token_is_wrong_type() {
        let store = MemorySessions::default();
        let claims = JwtClaims::new(
            Uuid::new_v4().to_string(),
            SESSION_ISSUER.to_string(),
            SESSION_AUDIENCE.to_string(),
            Duration::hours(1),
        );
        let token = JwtValidator::encode(&config().jwt_secret, &claims).unwrap();

        let result = authenticate(&store, &config(), &token, Utc::now()).await;
        assert!(matches!(result, Err(SessionRejection::WrongType)));
        assert_eq!(SessionRejection::WrongType.code(), "INVALID_TOKEN_TYPE");
    }

    #[tokio::test]
    async fn test_foreign_audience_is_invalid() {
        let store = MemorySessions::default();
        let user_id = Uuid::new_v4();
        let claims = JwtClaims::new(
            user_id.to_string(),
            SESSION_ISSUER.to_string(),
            "some-other-service".to_string(),
            Duration::hours(1),
        )
        .with_user_id(user_id.to_string())
        .with_token_type(SESSION_TOKEN_TYPE.to_string());
        let token = JwtValidator::encode(&config().jwt_secret, &claims).unwrap();

        let result = authenticate(&store, &config(), &token, Utc::now()).await;
        assert!(matches!(result, Err(SessionRejection::Invalid)));
    }
}

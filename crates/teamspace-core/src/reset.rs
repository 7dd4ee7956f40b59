//! Password-reset request and consumption
//!
//! One pending token per email. The secret is handed out once (inside the
//! mailed link) and only its argon2 hash is stored. A newer request replaces
//! the older row, and a successful reset deletes it in the same transaction
//! that changes the password.

use chrono::{DateTime, Duration, Utc};
use teamspace_auth::{generate_reset_secret, hash_password, verify_password};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::clock::Clock;
use crate::error::{CoreError, CoreResult, TokenFailure};
use crate::input::{check, ForgotPasswordInput, ResetPasswordInput};
use crate::model::PasswordResetToken;
use crate::notify::{render_reset_email, Notification, Notifier};
use crate::store::Store;

pub const DEFAULT_RESET_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone)]
pub struct ResetConfig {
    /// Base URL of the frontend; the link points at `{frontend_url}/reset-password`
    pub frontend_url: String,
    pub ttl: Duration,
    /// Product name shown in the mail
    pub app_name: String,
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            ttl: Duration::minutes(DEFAULT_RESET_TTL_MINUTES),
            app_name: "Teamspace".to_string(),
        }
    }
}

/// What a successful request produced. Callers only expose it in debug mode.
#[derive(Debug, Clone)]
pub struct ResetTicket {
    pub email: String,
    pub secret: String,
    pub reset_url: String,
    pub expires_at: DateTime<Utc>,
}

pub struct PasswordResetFlow<'a, S: ?Sized> {
    store: &'a S,
    notifier: &'a dyn Notifier,
    clock: &'a dyn Clock,
    config: &'a ResetConfig,
}

impl<'a, S> PasswordResetFlow<'a, S>
where
    S: Store + ?Sized,
{
    pub fn new(
        store: &'a S,
        notifier: &'a dyn Notifier,
        clock: &'a dyn Clock,
        config: &'a ResetConfig,
    ) -> Self {
        Self {
            store,
            notifier,
            clock,
            config,
        }
    }

    /// Issue a token for a registered email and mail the link.
    ///
    /// If delivery fails the stored row is removed again and the call fails.
    /// A row that a newer request has already replaced is left alone.
    pub async fn request(&self, input: ForgotPasswordInput) -> CoreResult<ResetTicket> {
        check(&input)?;

        let record = match self.store.find_user_by_email(&input.email).await? {
            Some(record) => record,
            None => {
                warn!(email = %input.email, "Password reset requested for unknown email");
                return Err(CoreError::field(
                    "email",
                    "we can't find a user with that email address",
                ));
            }
        };

        let now = self.clock.now();
        let secret = generate_reset_secret();
        let token_hash = hash_password(&secret)?;

        self.store
            .replace_reset_token(PasswordResetToken {
                email: input.email.clone(),
                token_hash: token_hash.clone(),
                created_at: now,
            })
            .await?;

        let expires_at = now + self.config.ttl;
        let reset_url = match build_reset_url(&self.config.frontend_url, &secret, &input.email) {
            Ok(url) => url,
            Err(e) => {
                self.discard_token(&input.email, &token_hash).await;
                return Err(e);
            }
        };

        let notification = Notification {
            recipient: record.user.email.clone(),
            recipient_name: record.user.full_name(),
            subject: format!("{} password reset", self.config.app_name),
            html_body: render_reset_email(
                &self.config.app_name,
                &record.user.full_name(),
                &reset_url,
                expires_at,
            ),
        };

        if let Err(e) = self.notifier.send(notification).await {
            error!(email = %input.email, "Failed to deliver password reset mail: {}", e);
            self.discard_token(&input.email, &token_hash).await;
            return Err(CoreError::internal(format!(
                "password reset mail could not be delivered: {}",
                e
            )));
        }

        info!(user_id = %record.user.id, "Password reset token issued");

        Ok(ResetTicket {
            email: input.email,
            secret,
            reset_url,
            expires_at,
        })
    }

    /// Exchange a valid secret for a new password.
    pub async fn consume(&self, input: ResetPasswordInput) -> CoreResult<()> {
        check(&input)?;

        let invalid = || CoreError::InvalidOrExpiredToken(TokenFailure::Invalid);

        let token = match self.store.find_reset_token(&input.email).await? {
            Some(token) => token,
            None => {
                warn!(email = %input.email, "Password reset attempted without a pending token");
                return Err(invalid());
            }
        };

        let now = self.clock.now();
        if now > token.created_at + self.config.ttl {
            warn!(email = %input.email, "Password reset attempted with an expired token");
            return Err(CoreError::InvalidOrExpiredToken(TokenFailure::Expired));
        }

        if !verify_password(&input.token, &token.token_hash)? {
            warn!(email = %input.email, "Password reset attempted with a wrong secret");
            return Err(invalid());
        }

        let record = self
            .store
            .find_user_by_email(&input.email)
            .await?
            .ok_or_else(invalid)?;

        let new_hash = hash_password(&input.password)?;
        let consumed = self
            .store
            .consume_reset_token(
                &input.email,
                &token.token_hash,
                record.user.id,
                &new_hash,
                now,
            )
            .await?;

        if !consumed {
            warn!(email = %input.email, "Password reset token was consumed concurrently");
            return Err(invalid());
        }

        info!(user_id = %record.user.id, "Password reset completed");
        Ok(())
    }

    async fn discard_token(&self, email: &str, token_hash: &str) {
        match self.store.delete_reset_token_if(email, token_hash).await {
            Ok(true) => debug!(email = %email, "Discarded undelivered reset token"),
            Ok(false) => debug!(email = %email, "Undelivered reset token was already replaced"),
            Err(e) => error!(email = %email, "Failed to discard undelivered reset token: {}", e),
        }
    }
}

/// `{frontend_url}/reset-password?token=..&email=..` with both values
/// form-encoded.
pub fn build_reset_url(frontend_url: &str, secret: &str, email: &str) -> CoreResult<String> {
    let mut url = Url::parse(frontend_url)
        .map_err(|e| CoreError::internal(format!("invalid frontend url {}: {}", frontend_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| CoreError::internal(format!("frontend url {} cannot be a base", frontend_url)))?
        .pop_if_empty()
        .push("reset-password");

    url.query_pairs_mut()
        .append_pair("token", secret)
        .append_pair("email", email);

    Ok(url.into())
}

//! Registration, sessions, password management and the user directory

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use teamspace_core::{
    input::{
        ChangePasswordInput, ForgotPasswordInput, LoginInput, RegisterInput, ResetPasswordInput,
    },
    service::accounts::{self, SignedIn},
    PasswordResetFlow, User,
};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::{AuthUser, SESSION_COOKIE};
use crate::models::{
    AuthResponse, ErrorResponse, ForgotPasswordResponse, LogoutResponse, MessageResponse,
    ResetDebugInfo,
};
use crate::AppState;

type CookieHeader = [(header::HeaderName, String); 1];

fn session_cookie(token: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> CookieHeader {
    let max_age = (expires_at - now).num_seconds().max(0);
    [(
        header::SET_COOKIE,
        format!(
            "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
            SESSION_COOKIE, token, max_age
        ),
    )]
}

fn cleared_cookie() -> CookieHeader {
    [(
        header::SET_COOKIE,
        format!("{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0", SESSION_COOKIE),
    )]
}

fn auth_response(signed: SignedIn, now: DateTime<Utc>) -> (CookieHeader, Json<AuthResponse>) {
    let cookie = session_cookie(&signed.session.token, signed.session.expires_at, now);
    (
        cookie,
        Json(AuthResponse {
            user: signed.user,
            token: signed.session.token,
            expires_at: signed.session.expires_at,
        }),
    )
}

/// Register a new account and open a session for it
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterInput,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 422, description = "Invalid input or email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<RegisterInput>,
) -> Result<(StatusCode, CookieHeader, Json<AuthResponse>), ApiError> {
    let now = state.clock.now();
    let signed = accounts::register(state.store.as_ref(), &state.sessions, input, now)
        .await
        .map_err(|e| state.fail(e))?;

    let (cookie, body) = auth_response(signed, now);
    Ok((StatusCode::CREATED, cookie, body))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginInput,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 422, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<LoginInput>,
) -> Result<(CookieHeader, Json<AuthResponse>), ApiError> {
    let now = state.clock.now();
    let signed = accounts::login(state.store.as_ref(), &state.sessions, input, now)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(auth_response(signed, now))
}

/// Send a password reset link to a registered email
#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordInput,
    responses(
        (status = 200, description = "Reset link sent", body = ForgotPasswordResponse),
        (status = 422, description = "Unknown or invalid email", body = ErrorResponse),
        (status = 500, description = "Link could not be delivered", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<ForgotPasswordInput>,
) -> Result<Json<ForgotPasswordResponse>, ApiError> {
    let flow = PasswordResetFlow::new(
        state.store.as_ref(),
        state.notifier.as_ref(),
        state.clock.as_ref(),
        &state.reset,
    );
    let ticket = flow.request(input).await.map_err(|e| state.fail(e))?;

    let debug_info = state.debug.then(|| ResetDebugInfo {
        token: ticket.secret,
        reset_url: ticket.reset_url,
        expires_at: ticket.expires_at,
    });

    Ok(Json(ForgotPasswordResponse {
        message: "We have emailed your password reset link.".to_string(),
        debug_info,
    }))
}

/// Set a new password using a reset token
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordInput,
    responses(
        (status = 200, description = "Password reset", body = MessageResponse),
        (status = 400, description = "Token invalid or expired", body = ErrorResponse),
        (status = 422, description = "Invalid input", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ApiJson(input): ApiJson<ResetPasswordInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    let flow = PasswordResetFlow::new(
        state.store.as_ref(),
        state.notifier.as_ref(),
        state.clock.as_ref(),
        &state.reset,
    );
    flow.consume(input).await.map_err(|e| state.fail(e))?;

    Ok(Json(MessageResponse::new("Your password has been reset.")))
}

/// End every session of the current user
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = LogoutResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<(CookieHeader, Json<LogoutResponse>), ApiError> {
    let revoked = accounts::logout(state.store.as_ref(), auth.user_id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok((
        cleared_cookie(),
        Json(LogoutResponse {
            message: "Logged out successfully".to_string(),
            revoked_sessions: revoked,
        }),
    ))
}

/// Get the current authenticated user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn current_user(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<User>, ApiError> {
    let user = accounts::current_user(state.store.as_ref(), auth.user_id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(user))
}

/// Change the current user's password
#[utoipa::path(
    post,
    path = "/api/auth/change-password",
    request_body = ChangePasswordInput,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Wrong current password or invalid input", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    ApiJson(input): ApiJson<ChangePasswordInput>,
) -> Result<Json<MessageResponse>, ApiError> {
    accounts::change_password(state.store.as_ref(), auth.user_id, input, state.clock.now())
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(MessageResponse::new("Password changed successfully")))
}

/// List every registered user
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Users ordered by first name", body = Vec<User>),
        (status = 401, description = "Not authenticated", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = accounts::list_users(state.store.as_ref(), auth.user_id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(users))
}

/// Users that are not yet members of a team
#[utoipa::path(
    get,
    path = "/api/teams/{id}/available-users",
    params(
        ("id" = Uuid, Path, description = "Team ID")
    ),
    responses(
        (status = 200, description = "Users outside the team", body = Vec<User>),
        (status = 403, description = "Caller is not a team member", body = ErrorResponse),
        (status = 404, description = "Team not found", body = ErrorResponse)
    ),
    tag = "users"
)]
pub async fn available_users(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    Path(team_id): Path<Uuid>,
) -> Result<Json<Vec<User>>, ApiError> {
    let users = accounts::available_users(state.store.as_ref(), auth.user_id, team_id)
        .await
        .map_err(|e| state.fail(e))?;

    Ok(Json(users))
}

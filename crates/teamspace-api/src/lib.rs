//! HTTP API for teamspace
//!
//! Routes, the session middleware, the OpenAPI document and the server
//! bootstrap. Every handler hands the authenticated user id to a
//! `teamspace_core` operation and maps its `CoreError` onto a status code.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use chrono::Duration;
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use teamspace_core::{Clock, CoreError, Notifier, ResetConfig, SessionConfig, SystemClock};
use teamspace_db::SeaOrmStore;

pub use error::ApiError;

/// Application state shared across handlers
pub struct AppState {
    pub store: Arc<SeaOrmStore>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub sessions: SessionConfig,
    pub reset: ResetConfig,
    /// Echo reset secrets and internal error details in responses
    pub debug: bool,
}

impl AppState {
    /// Wrap a core failure for the response, honouring the debug flag.
    pub fn fail(&self, err: CoreError) -> ApiError {
        ApiError::from_core(err, self.debug)
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Teamspace API",
        version = "0.1.0",
        description = "REST API for workspaces, teams and tasks",
        contact(
            name = "Teamspace Team",
            email = "team@teamspace.dev"
        )
    ),
    paths(
        handlers::health_check,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::forgot_password,
        handlers::auth::reset_password,
        handlers::auth::logout,
        handlers::auth::current_user,
        handlers::auth::change_password,
        handlers::auth::list_users,
        handlers::auth::available_users,
        handlers::workspaces::list_workspaces,
        handlers::workspaces::create_workspace,
        handlers::workspaces::get_workspace,
        handlers::workspaces::update_workspace,
        handlers::workspaces::delete_workspace,
        handlers::workspaces::list_workspace_tasks,
        handlers::teams::list_teams,
        handlers::teams::create_team,
        handlers::teams::get_team,
        handlers::teams::update_team,
        handlers::teams::delete_team,
        handlers::teams::add_member,
        handlers::teams::update_member,
        handlers::teams::remove_member,
        handlers::teams::list_team_tasks,
        handlers::tasks::list_tasks,
        handlers::tasks::create_task,
        handlers::tasks::get_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::HealthResponse,
            models::AuthResponse,
            models::MessageResponse,
            models::LogoutResponse,
            models::ForgotPasswordResponse,
            models::ResetDebugInfo,
            teamspace_core::User,
            teamspace_core::Workspace,
            teamspace_core::WorkspaceDetail,
            teamspace_core::Team,
            teamspace_core::TeamDetail,
            teamspace_core::TeamWithMembers,
            teamspace_core::TeamMember,
            teamspace_core::TeamRole,
            teamspace_core::Task,
            teamspace_core::input::RegisterInput,
            teamspace_core::input::LoginInput,
            teamspace_core::input::ChangePasswordInput,
            teamspace_core::input::ForgotPasswordInput,
            teamspace_core::input::ResetPasswordInput,
            teamspace_core::input::WorkspaceInput,
            teamspace_core::input::CreateTeamInput,
            teamspace_core::input::RenameTeamInput,
            teamspace_core::input::AddMemberInput,
            teamspace_core::input::ChangeRoleInput,
            teamspace_core::input::CreateTaskInput,
            teamspace_core::input::UpdateTaskInput,
        )
    ),
    tags(
        (name = "auth", description = "Registration, sessions and password management"),
        (name = "users", description = "User directory endpoints"),
        (name = "workspaces", description = "Workspace management endpoints"),
        (name = "teams", description = "Team and membership management endpoints"),
        (name = "tasks", description = "Task management endpoints"),
        (name = "system", description = "System health and info endpoints")
    )
)]
pub struct ApiDoc;

/// API server configuration
pub struct ApiServerConfig {
    /// Address to bind the API server
    pub bind_addr: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// Allowed CORS origins (if None, localhost origins are allowed)
    pub cors_origins: Option<Vec<String>>,
    /// Secret for signing session tokens
    pub jwt_secret: String,
    /// Lifetime of a session token
    pub session_ttl: Duration,
    pub reset: ResetConfig,
    pub debug: bool,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_cors: true,
            cors_origins: None,
            jwt_secret: String::new(),
            session_ttl: Duration::hours(24),
            reset: ResetConfig::default(),
            debug: false,
        }
    }
}

/// API Server
pub struct ApiServer {
    config: ApiServerConfig,
    state: Arc<AppState>,
}

impl ApiServer {
    /// Create a new API server using the system clock
    pub fn new(config: ApiServerConfig, store: SeaOrmStore, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_clock(config, store, notifier, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: ApiServerConfig,
        store: SeaOrmStore,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = Arc::new(AppState {
            store: Arc::new(store),
            notifier,
            clock,
            sessions: SessionConfig::new(&config.jwt_secret, config.session_ttl),
            reset: config.reset.clone(),
            debug: config.debug,
        });

        Self { config, state }
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let api_doc = ApiDoc::openapi();

        // Build PUBLIC routes (no authentication required)
        let public_router = Router::new()
            .route("/api/health", get(handlers::health_check))
            .route("/api/auth/register", post(handlers::auth::register))
            .route("/api/auth/login", post(handlers::auth::login))
            .route(
                "/api/auth/forgot-password",
                post(handlers::auth::forgot_password),
            )
            .route(
                "/api/auth/reset-password",
                post(handlers::auth::reset_password),
            )
            .with_state(self.state.clone());

        // Build PROTECTED routes (require a live session)
        let protected_router = Router::new()
            .route("/api/auth/logout", post(handlers::auth::logout))
            .route("/api/auth/me", get(handlers::auth::current_user))
            .route(
                "/api/auth/change-password",
                post(handlers::auth::change_password),
            )
            .route("/api/users", get(handlers::auth::list_users))
            .route(
                "/api/workspaces",
                get(handlers::workspaces::list_workspaces)
                    .post(handlers::workspaces::create_workspace),
            )
            .route(
                "/api/workspaces/{id}",
                get(handlers::workspaces::get_workspace)
                    .put(handlers::workspaces::update_workspace)
                    .delete(handlers::workspaces::delete_workspace),
            )
            .route(
                "/api/workspaces/{id}/tasks",
                get(handlers::workspaces::list_workspace_tasks),
            )
            .route(
                "/api/teams",
                get(handlers::teams::list_teams).post(handlers::teams::create_team),
            )
            .route(
                "/api/teams/{id}",
                get(handlers::teams::get_team)
                    .put(handlers::teams::update_team)
                    .delete(handlers::teams::delete_team),
            )
            .route(
                "/api/teams/{id}/available-users",
                get(handlers::auth::available_users),
            )
            .route("/api/teams/{id}/members", post(handlers::teams::add_member))
            .route(
                "/api/teams/{id}/members/{user_id}",
                put(handlers::teams::update_member).delete(handlers::teams::remove_member),
            )
            .route("/api/teams/{id}/tasks", get(handlers::teams::list_team_tasks))
            .route(
                "/api/tasks",
                get(handlers::tasks::list_tasks).post(handlers::tasks::create_task),
            )
            .route(
                "/api/tasks/{id}",
                get(handlers::tasks::get_task)
                    .put(handlers::tasks::update_task)
                    .delete(handlers::tasks::delete_task),
            )
            .with_state(self.state.clone())
            .layer(axum_middleware::from_fn_with_state(
                self.state.clone(),
                middleware::require_auth,
            ));

        let api_router = public_router.merge(protected_router);

        // SwaggerUi serves the document at /api/openapi.json
        let router = Router::new()
            .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", api_doc))
            .merge(api_router);

        let mut router = router.layer(TraceLayer::new_for_http());

        if self.config.enable_cors {
            router = router.layer(self.cors_layer());
        }

        router
    }

    /// Credentials are allowed, so origins are listed or matched, never `Any`.
    fn cors_layer(&self) -> CorsLayer {
        let layer = CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::PATCH,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true);

        match &self.config.cors_origins {
            Some(origins) => {
                let allowed: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|origin| match HeaderValue::from_str(origin) {
                        Ok(value) => Some(value),
                        Err(_) => {
                            warn!(origin = %origin, "Ignoring invalid CORS origin");
                            None
                        }
                    })
                    .collect();
                layer.allow_origin(AllowOrigin::list(allowed))
            }
            None => layer.allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str.starts_with("http://localhost:")
                    || origin_str.starts_with("http://127.0.0.1:")
                    || origin_str.starts_with("https://localhost:")
                    || origin_str.starts_with("https://127.0.0.1:")
            })),
        }
    }

    /// Start the API server
    pub async fn start(self) -> Result<(), anyhow::Error> {
        let router = self.build_router();

        info!("Starting API server on {}", self.config.bind_addr);
        info!(
            "OpenAPI spec: http://{}/api/openapi.json",
            self.config.bind_addr
        );
        info!("Swagger UI: http://{}/swagger-ui", self.config.bind_addr);
        if self.config.debug {
            warn!("Debug mode is on: reset tokens and internal errors are echoed in responses");
        }

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        axum::serve(listener, router)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }
}

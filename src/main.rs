//! Teamspace server
//!
//! Serves the workspace/team/task API and manages its database schema.

use anyhow::{Context, Result};
use chrono::Duration;
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use teamspace_api::{ApiServer, ApiServerConfig};
use teamspace_core::{HttpNotifier, LogNotifier, Notifier, ResetConfig};
use teamspace_db::SeaOrmStore;

/// Teamspace - workspaces, teams and tasks over HTTP
#[derive(Parser, Debug)]
#[command(name = "teamspace")]
#[command(about = "Teamspace - workspaces, teams and tasks over HTTP")]
#[command(version)]
struct Cli {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite::memory:", global = true)]
    database_url: String,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run migrations and serve the HTTP API
    #[command(long_about = r#"
Apply pending migrations, then serve the HTTP API.

EXAMPLES:
  # Development server with a throwaway database
  teamspace serve --jwt-secret dev-secret --debug

  # Persistent SQLite database and a mail relay
  teamspace --database-url "sqlite://teamspace.db?mode=rwc" serve \
    --jwt-secret $TEAMSPACE_JWT_SECRET \
    --mail-relay-url http://127.0.0.1:8025/send

ENVIRONMENT VARIABLES:
  DATABASE_URL              Database connection URL
  TEAMSPACE_BIND            Address to bind
  TEAMSPACE_JWT_SECRET      Secret for signing session tokens
  TEAMSPACE_SESSION_HOURS   Session lifetime in hours
  FRONTEND_URL              Base URL used in password reset links
  TEAMSPACE_CORS_ORIGINS    Comma separated list of allowed origins
  TEAMSPACE_DEBUG           Echo reset tokens and internal errors
  TEAMSPACE_MAIL_RELAY_URL  HTTP endpoint that delivers outgoing mail
    "#)]
    Serve {
        /// Address to bind the API server
        #[arg(long, env = "TEAMSPACE_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,

        /// Secret for signing session tokens
        #[arg(long, env = "TEAMSPACE_JWT_SECRET")]
        jwt_secret: String,

        /// Session lifetime in hours
        #[arg(long, env = "TEAMSPACE_SESSION_HOURS", default_value = "24")]
        session_hours: i64,

        /// Frontend base URL for password reset links
        #[arg(long, env = "FRONTEND_URL", default_value = "http://localhost:3000")]
        frontend_url: String,

        /// Allowed CORS origins (defaults to localhost origins)
        #[arg(long = "cors-origin", env = "TEAMSPACE_CORS_ORIGINS", value_delimiter = ',')]
        cors_origins: Vec<String>,

        /// Echo reset tokens and internal error details in responses
        #[arg(long, env = "TEAMSPACE_DEBUG")]
        debug: bool,

        /// HTTP endpoint that delivers outgoing mail (mail is only logged if unset)
        #[arg(long, env = "TEAMSPACE_MAIL_RELAY_URL")]
        mail_relay_url: Option<String>,
    },

    /// Apply pending database migrations and exit
    Migrate,
}

/// Setup logging; RUST_LOG takes precedence over `log_level`
fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

async fn open_store(database_url: &str) -> Result<SeaOrmStore> {
    let db = teamspace_db::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database {}", database_url))?;
    teamspace_db::migrate(&db)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations applied");

    Ok(SeaOrmStore::new(db))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level);

    match cli.command {
        Commands::Migrate => {
            open_store(&cli.database_url).await?;
            Ok(())
        }
        Commands::Serve {
            bind,
            jwt_secret,
            session_hours,
            frontend_url,
            cors_origins,
            debug,
            mail_relay_url,
        } => {
            info!("Teamspace starting...");

            if jwt_secret.trim().is_empty() {
                anyhow::bail!("--jwt-secret must not be empty");
            }
            if session_hours <= 0 {
                anyhow::bail!("--session-hours must be positive");
            }
            if cli.database_url.starts_with("sqlite::memory:") {
                warn!("Using an in-memory database; data is lost on shutdown");
            }

            let store = open_store(&cli.database_url).await?;

            let notifier: Arc<dyn Notifier> = match mail_relay_url {
                Some(url) => {
                    info!("Delivering mail through relay {}", url);
                    Arc::new(HttpNotifier::new(url))
                }
                None => {
                    info!("No mail relay configured; reset mails are logged only");
                    Arc::new(LogNotifier)
                }
            };

            let config = ApiServerConfig {
                bind_addr: bind,
                enable_cors: true,
                cors_origins: (!cors_origins.is_empty()).then_some(cors_origins),
                jwt_secret,
                session_ttl: Duration::hours(session_hours),
                reset: ResetConfig {
                    frontend_url,
                    ..ResetConfig::default()
                },
                debug,
            };

            let server = ApiServer::new(config, store, notifier);

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, shutting down...");
                }
                result = server.start() => {
                    if let Err(e) = result {
                        error!("API server error: {:#}", e);
                        return Err(e);
                    }
                }
            }

            info!("Teamspace stopped");
            Ok(())
        }
    }
}

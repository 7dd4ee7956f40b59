//! Persistence for teamspace on SeaORM (SQLite or PostgreSQL)

pub mod entities;
pub mod migrator;
mod store;

pub use store::SeaOrmStore;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::debug;

/// Open a connection pool for `url` (`sqlite::memory:`, `sqlite://file.db?mode=rwc`,
/// `postgres://...`).
pub async fn connect(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(url.to_owned());
    options.sqlx_logging(false);

    debug!("Opening database connection");
    Database::connect(options).await
}

/// Apply every pending migration.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    migrator::Migrator::up(db, None).await
}

//! Shared setup for the SQLite-backed tests

#![allow(dead_code)]

use chrono::{Duration, Utc};
use teamspace_core::input::RegisterInput;
use teamspace_core::service::accounts;
use teamspace_core::{SessionConfig, User};
use teamspace_db::{connect, migrate, SeaOrmStore};

pub async fn setup_store() -> SeaOrmStore {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    migrate(&db).await.expect("Failed to run migrations");

    SeaOrmStore::new(db)
}

pub fn sessions() -> SessionConfig {
    SessionConfig::new("integration-test-secret", Duration::hours(1))
}

pub async fn register(store: &SeaOrmStore, first_name: &str, email: &str, password: &str) -> User {
    accounts::register(
        store,
        &sessions(),
        RegisterInput {
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            phone: None,
            email: email.to_string(),
            password: password.to_string(),
            password_confirmation: password.to_string(),
        },
        Utc::now(),
    )
    .await
    .expect("Failed to register user")
    .user
}

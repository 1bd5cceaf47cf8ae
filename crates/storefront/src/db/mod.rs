//! Database operations for the storefront `PostgreSQL`.
//!
//! The commerce gateway is the source of truth for carts, products, and
//! orders; `PostgreSQL` holds local data only:
//!
//! ## Tables
//!
//! - `sessions` - Tower-sessions storage (the durable home of the persisted
//!   cart snapshot and gateway session token)
//!
//! # Migrations
//!
//! The sessions table is created via `tower-sessions-sqlx-store`'s
//! `PostgresStore::migrate` at startup.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

//! ChezFlora storefront library.
//!
//! The flower shop's JSON API: catalog, carts, checkout, customer accounts,
//! blog and the back-office. The binary in `main.rs` wires it to a socket;
//! the integration tests drive the same router.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{ConfigError, StorefrontConfig};
use crate::db::{PgStore, StoreBackend};

/// Errors that stop the server from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Open the durable store named by the configuration.
///
/// Without a database URL the volatile in-memory store is used, which loses
/// every order and account on restart.
///
/// # Errors
///
/// Returns `sqlx::Error` if the database cannot be reached.
pub async fn open_store(config: &StorefrontConfig) -> Result<StoreBackend, sqlx::Error> {
    match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            info!("Database pool created");
            Ok(StoreBackend::Postgres(PgStore::new(pool)))
        }
        None => {
            warn!("STOREFRONT_DATABASE_URL is not set, using the in-memory store");
            Ok(StoreBackend::memory())
        }
    }
}

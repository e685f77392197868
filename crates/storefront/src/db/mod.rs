//! Storage layer for ChezFlora.
//!
//! # Model
//!
//! Every logical collection is a single JSON document stored under its own
//! key, with a monotonically increasing version token. Writes are
//! compare-and-set on that token, which gives optimistic concurrency for
//! multi-step operations like checkout.
//!
//! ## Keys
//!
//! - `products`, `categories`, `users`, `newsletter_subscribers`,
//!   `blog_posts`, `blog_comments`, `scheduled_posts`, `audit_logs` - arrays
//! - `cart`, `orders`, `user_addresses`, `quotes` - maps from user id to array
//! - `guest_cart` - session-scoped cart of an anonymous visitor
//!
//! ## Backends
//!
//! - [`MemoryStore`] - volatile, used by tests and local development
//! - [`PgStore`] - durable, one `JSONB` row per key in `storefront.kv_store`
//! - [`SessionKv`] - the visitor's tower-sessions session (guest scope)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p chezflora-cli -- migrate
//! ```

pub mod addresses;
pub mod audit;
pub mod blog;
pub mod carts;
pub mod categories;
pub mod collection;
pub mod memory;
pub mod newsletter;
pub mod orders;
pub mod postgres;
pub mod products;
pub mod quotes;
pub mod session;
pub mod users;

use std::future::Future;
use std::time::Duration;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use collection::{Collection, PerUser};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use session::SessionKv;

/// Storage keys for every persisted collection.
pub mod keys {
    pub const PRODUCTS: &str = "products";
    pub const CATEGORIES: &str = "categories";
    pub const ORDERS: &str = "orders";
    pub const USERS: &str = "users";
    pub const CART: &str = "cart";
    pub const GUEST_CART: &str = "guest_cart";
    pub const NEWSLETTER_SUBSCRIBERS: &str = "newsletter_subscribers";
    pub const BLOG_POSTS: &str = "blog_posts";
    pub const BLOG_COMMENTS: &str = "blog_comments";
    pub const SCHEDULED_POSTS: &str = "scheduled_posts";
    pub const AUDIT_LOGS: &str = "audit_logs";
    pub const USER_ADDRESSES: &str = "user_addresses";
    pub const QUOTES: &str = "quotes";
}

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Session store error from tower-sessions.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// A value could not be encoded to JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Data in the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The key changed since it was read (optimistic concurrency failure).
    #[error("concurrent modification of {0}")]
    Conflict(String),
}

/// Version token of a stored key.
///
/// A key that does not exist has version [`Version::ABSENT`]. Every
/// successful write produces a version greater than any the backend handed
/// out before, so a stale token never matches a key that was removed and
/// written again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// Version of a key that does not exist.
    pub const ABSENT: Self = Self(0);

    /// Wrap a raw version number.
    #[must_use]
    pub const fn new(version: u64) -> Self {
        Self(version)
    }

    /// The raw version number.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The version immediately after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// A stored JSON value with its version token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub value: serde_json::Value,
    pub version: Version,
}

/// A key-value store holding JSON documents with version tokens.
///
/// Implementations must be thread-safe and make `store` atomic with respect
/// to the version check.
pub trait KvStore: Send + Sync {
    /// Load the value stored under `key`.
    fn load(&self, key: &str) -> impl Future<Output = Result<Option<Entry>, RepositoryError>> + Send;

    /// Store `value` under `key` if its current version is `expected`.
    ///
    /// Returns the new version, or `RepositoryError::Conflict` if the key was
    /// modified since `expected` was read.
    fn store(
        &self,
        key: &str,
        value: serde_json::Value,
        expected: Version,
    ) -> impl Future<Output = Result<Version, RepositoryError>> + Send;

    /// Remove `key`, returning what was stored.
    fn remove(&self, key: &str) -> impl Future<Output = Result<Option<Entry>, RepositoryError>> + Send;

    /// Check that the backend is reachable.
    fn ping(&self) -> impl Future<Output = Result<(), RepositoryError>> + Send {
        async { Ok(()) }
    }
}

/// The durable store selected at startup.
#[derive(Clone, Debug)]
pub enum StoreBackend {
    /// Volatile in-process store.
    Memory(MemoryStore),
    /// `PostgreSQL`-backed store.
    Postgres(PgStore),
}

impl StoreBackend {
    /// A fresh, empty in-memory backend.
    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    /// Human-readable backend name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

impl KvStore for StoreBackend {
    async fn load(&self, key: &str) -> Result<Option<Entry>, RepositoryError> {
        match self {
            Self::Memory(store) => store.load(key).await,
            Self::Postgres(store) => store.load(key).await,
        }
    }

    async fn store(
        &self,
        key: &str,
        value: serde_json::Value,
        expected: Version,
    ) -> Result<Version, RepositoryError> {
        match self {
            Self::Memory(store) => store.store(key, value, expected).await,
            Self::Postgres(store) => store.store(key, value, expected).await,
        }
    }

    async fn remove(&self, key: &str) -> Result<Option<Entry>, RepositoryError> {
        match self {
            Self::Memory(store) => store.remove(key).await,
            Self::Postgres(store) => store.remove(key).await,
        }
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        match self {
            Self::Memory(store) => store.ping().await,
            Self::Postgres(store) => store.ping().await,
        }
    }
}

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

//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string, falling back
//!   to `DATABASE_URL`. When neither is set the volatile in-memory store is used.
//! - `SHIPPING_FLAT_RATE` - Shipping cost per order (default: 7.90)
//! - `SHIPPING_FREE_OVER` - Subtotal from which shipping is free
//! - `BLOG_PUBLISH_INTERVAL_SECS` - Scheduled post poll interval (default: 60)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use chezflora_core::Money;

use crate::models::order::{ShippingPolicy, parse_money};

const DEFAULT_FLAT_RATE: &str = "7.90";
const DEFAULT_PUBLISH_INTERVAL_SECS: u64 = 60;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
///
/// Implements `Debug` manually to redact the database URL.
#[derive(Clone)]
pub struct StorefrontConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Flat shipping rate and free-shipping threshold
    pub shipping: ShippingPolicy,
    /// How often scheduled blog posts are checked
    pub publish_interval: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for StorefrontConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("host", &self.host)
            .field("port", &self.port)
            .field("base_url", &self.base_url)
            .field("shipping", &self.shipping)
            .field("publish_interval", &self.publish_interval)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .field("sentry_sample_rate", &self.sentry_sample_rate)
            .field("sentry_traces_sample_rate", &self.sentry_traces_sample_rate)
            .finish()
    }
}

impl Default for StorefrontConfig {
    /// Local development settings with the in-memory store.
    fn default() -> Self {
        Self {
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 3000,
            base_url: "http://localhost:3000".to_owned(),
            shipping: ShippingPolicy::default(),
            publish_interval: Duration::from_secs(DEFAULT_PUBLISH_INTERVAL_SECS),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("STOREFRONT_DATABASE_URL");
        let host = parse_env("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;

        let flat_rate = get_money("SHIPPING_FLAT_RATE", DEFAULT_FLAT_RATE)?;
        let free_over = get_optional_env("SHIPPING_FREE_OVER")
            .map(|raw| {
                parse_money(&raw)
                    .map_err(|e| ConfigError::InvalidEnvVar("SHIPPING_FREE_OVER".to_owned(), e))
            })
            .transpose()?;

        let interval_secs: u64 = parse_env(
            "BLOG_PUBLISH_INTERVAL_SECS",
            &DEFAULT_PUBLISH_INTERVAL_SECS.to_string(),
        )?;
        if interval_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "BLOG_PUBLISH_INTERVAL_SECS".to_owned(),
                "must be at least 1".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            shipping: ShippingPolicy {
                flat_rate,
                free_over,
            },
            publish_interval: Duration::from_secs(interval_secs),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the public URL is served over TLS, which decides secure cookies.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Option<SecretString> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(SecretString::from)
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn get_money(key: &str, default: &str) -> Result<Money, ConfigError> {
    parse_money(&get_env_or_default(key, default))
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_addr() {
        let config = StorefrontConfig::default();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_default_shipping_is_flat_rate() {
        let config = StorefrontConfig::default();
        assert_eq!(config.shipping.flat_rate, Money::from_cents(790));
        assert!(config.shipping.free_over.is_none());
        assert_eq!(config.publish_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_https_detection() {
        let mut config = StorefrontConfig::default();
        assert!(!config.is_https());
        config.base_url = "https://chezflora.fr".to_owned();
        assert!(config.is_https());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = StorefrontConfig {
            database_url: Some(SecretString::from("postgres://florist:hunter2@db/chezflora")),
            ..StorefrontConfig::default()
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("http://localhost:3000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let port: u16 = parse_env("CHEZFLORA_TEST_UNSET_PORT", "4321").unwrap();
        assert_eq!(port, 4321);

        let err = parse_env::<u16>("CHEZFLORA_TEST_UNSET_BAD", "not-a-port").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "CHEZFLORA_TEST_UNSET_BAD"));
    }

    #[test]
    fn test_get_money_rejects_negative() {
        assert_eq!(
            get_money("CHEZFLORA_TEST_UNSET_RATE", "12.50").unwrap(),
            Money::from_cents(1250)
        );
        assert!(get_money("CHEZFLORA_TEST_UNSET_NEG", "-1").is_err());
    }
}

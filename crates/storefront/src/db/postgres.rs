//! `PostgreSQL`-backed key-value store.
//!
//! One row per key in `storefront.kv_store`. The version check is done in the
//! `WHERE` clause of the write, so it is atomic without explicit locking.
//! New versions are drawn from `storefront.kv_store_version_seq`, which keeps
//! growing across deletes.

use sqlx::PgPool;

use super::{Entry, KvStore, RepositoryError, Version};

/// Durable [`KvStore`] storing JSON documents as `JSONB` rows.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn to_version(raw: i64) -> Result<Version, RepositoryError> {
    u64::try_from(raw)
        .map(Version::new)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative version {raw}")))
}

fn to_raw(version: Version) -> Result<i64, RepositoryError> {
    i64::try_from(version.get())
        .map_err(|_| RepositoryError::DataCorruption(format!("version {} overflows", version.get())))
}

impl KvStore for PgStore {
    async fn load(&self, key: &str) -> Result<Option<Entry>, RepositoryError> {
        let row: Option<(serde_json::Value, i64)> =
            sqlx::query_as("SELECT value, version FROM storefront.kv_store WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        row.map(|(value, version)| {
            Ok(Entry {
                value,
                version: to_version(version)?,
            })
        })
        .transpose()
    }

    async fn store(
        &self,
        key: &str,
        value: serde_json::Value,
        expected: Version,
    ) -> Result<Version, RepositoryError> {
        let written: Option<(i64,)> = if expected == Version::ABSENT {
            sqlx::query_as(
                r"
                INSERT INTO storefront.kv_store (key, value, version)
                VALUES ($1, $2, nextval('storefront.kv_store_version_seq'))
                ON CONFLICT (key) DO NOTHING
                RETURNING version
                ",
            )
            .bind(key)
            .bind(&value)
            .fetch_optional(&self.pool)
            .await?
        } else {
            sqlx::query_as(
                r"
                UPDATE storefront.kv_store
                SET value = $2, version = nextval('storefront.kv_store_version_seq'), updated_at = now()
                WHERE key = $1 AND version = $3
                RETURNING version
                ",
            )
            .bind(key)
            .bind(&value)
            .bind(to_raw(expected)?)
            .fetch_optional(&self.pool)
            .await?
        };

        match written {
            Some((version,)) => to_version(version),
            None => Err(RepositoryError::Conflict(key.to_owned())),
        }
    }

    async fn remove(&self, key: &str) -> Result<Option<Entry>, RepositoryError> {
        let row: Option<(serde_json::Value, i64)> = sqlx::query_as(
            "DELETE FROM storefront.kv_store WHERE key = $1 RETURNING value, version",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(value, version)| {
            Ok(Entry {
                value,
                version: to_version(version)?,
            })
        })
        .transpose()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_conversions() {
        assert!(matches!(to_version(3), Ok(v) if v == Version::new(3)));
        assert!(matches!(to_version(-1), Err(RepositoryError::DataCorruption(_))));
        assert!(matches!(to_raw(Version::new(7)), Ok(7)));
        assert!(to_raw(Version::new(u64::MAX)).is_err());
    }
}

//! Process wide database handle, established on first use.
//!
//! Concurrent first callers share a single initialization. A failed attempt
//! leaves the cache empty, so the next request tries again; after a
//! connection failure the cache can be [invalidated](ConnectionCache::invalidate)
//! and the next request reconnects.

use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::{error::Result, Error, Pool};

pub const DATABASE_URL_VAR: &str = "SKATUVE_DATABASE_URL";

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connect_timeout: Duration,
}

impl DbConfig {
    pub fn new(url: impl Into<String>) -> Self {
        DbConfig {
            url: Some(url.into()),
            ..Default::default()
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        DbConfig {
            url: None,
            max_connections: 10,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Clone)]
pub struct ConnectionCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    config: DbConfig,
    cell: RwLock<Arc<OnceCell<Pool>>>,
}

impl ConnectionCache {
    pub fn new(config: DbConfig) -> Self {
        ConnectionCache {
            inner: Arc::new(CacheInner {
                config,
                cell: RwLock::new(Arc::new(OnceCell::new())),
            }),
        }
    }

    /// Cache already holding an open pool, migrations are expected to be done.
    pub fn with_pool(config: DbConfig, pool: Pool) -> Self {
        ConnectionCache {
            inner: Arc::new(CacheInner {
                config,
                cell: RwLock::new(Arc::new(OnceCell::new_with(Some(pool)))),
            }),
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.inner.config
    }

    fn current(&self) -> Arc<OnceCell<Pool>> {
        self.inner
            .cell
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub async fn pool(&self) -> Result<Pool> {
        let config = &self.inner.config;
        let url = config.url.as_deref().ok_or_else(|| {
            Error::MissingConfiguration(format!(
                "database connection string is not set, provide it via {DATABASE_URL_VAR}"
            ))
        })?;
        let cell = self.current();
        let pool = cell
            .get_or_try_init(|| async {
                info!("Opening database connection");
                let pool =
                    crate::new_pool_with(url, config.max_connections, config.connect_timeout)
                        .await
                        .map_err(Error::into_connection_error)
                        .inspect_err(|e| error!("Database connection failed: {e}"))?;
                crate::migrate(&pool).await?;
                Ok::<_, Error>(pool)
            })
            .await?;
        Ok(pool.clone())
    }

    pub fn is_connected(&self) -> bool {
        self.current().initialized()
    }

    /// Drops the cached pool, next [`ConnectionCache::pool`] call reconnects.
    pub fn invalidate(&self) {
        let mut cell = self
            .inner
            .cell
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if cell.initialized() {
            warn!("Invalidating cached database connection");
            *cell = Arc::new(OnceCell::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_url() {
        let cache = ConnectionCache::new(DbConfig::default());
        let res = cache.pool().await;
        assert!(matches!(res, Err(Error::MissingConfiguration(_))));
        assert!(!cache.is_connected());
    }

    #[tokio::test]
    async fn test_lazy_init_and_invalidate() {
        let cache = ConnectionCache::new(DbConfig::new("sqlite::memory:"));
        assert!(!cache.is_connected());
        let (a, b) = tokio::join!(cache.pool(), cache.pool());
        a.unwrap();
        b.unwrap();
        assert!(cache.is_connected());

        cache.invalidate();
        assert!(!cache.is_connected());
        cache.pool().await.unwrap();
        assert!(cache.is_connected());
    }

    #[tokio::test]
    async fn test_malformed_url_is_configuration_error() {
        let cache = ConnectionCache::new(DbConfig::new("sqlite://db.sqlite?mode=sideways"));
        let err = cache.pool().await.unwrap_err();
        assert!(matches!(err, Error::DatabaseError(sqlx::Error::Configuration(_))), "{err:?}");
        assert!(!err.is_connection_error());
    }

    #[tokio::test]
    async fn test_failed_connect_is_not_cached() {
        let dir = std::env::temp_dir().join(format!("skatuve-missing-{}", uuid::Uuid::new_v4()));
        let url = format!("sqlite://{}/nested/db.sqlite", dir.display());
        let cache = ConnectionCache::new(DbConfig {
            url: Some(url),
            max_connections: 1,
            connect_timeout: Duration::from_secs(1),
        });
        let err = cache.pool().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionError(_)), "{err:?}");
        assert!(err.is_connection_error());
        assert!(!cache.is_connected());

        std::fs::create_dir_all(dir.join("nested")).unwrap();
        cache.pool().await.unwrap();
        assert!(cache.is_connected());
        std::fs::remove_dir_all(dir).unwrap();
    }
}

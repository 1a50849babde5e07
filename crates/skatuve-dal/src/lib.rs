pub mod connection;
pub mod error;
pub mod gallery;
pub mod update;

use std::{str::FromStr as _, time::Duration};

pub use connection::{ConnectionCache, DbConfig};
pub use error::Error;
pub use sqlx::Error as SqlxError;
use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::debug;

use crate::error::Result;

pub type ChosenDB = sqlx::Sqlite;
pub type Pool = sqlx::Pool<ChosenDB>;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

pub async fn new_pool(database_url: &str) -> Result<Pool, Error> {
    new_pool_with(database_url, 50, Duration::from_secs(30)).await
}

pub async fn new_pool_with(
    database_url: &str,
    max_connections: u32,
    connect_timeout: Duration,
) -> Result<Pool, Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let mut pool_options = SqlitePoolOptions::new().acquire_timeout(connect_timeout);
    // every in-memory connection is its own database, so keep exactly one alive
    if database_url.contains(":memory:") {
        debug!("Using in-memory database");
        pool_options = pool_options
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    } else {
        pool_options = pool_options.max_connections(max_connections);
    }
    let pool = pool_options.connect_with(options).await?;
    Ok(pool)
}

pub async fn migrate(pool: &Pool) -> Result<()> {
    MIGRATOR.run(pool).await?;
    Ok(())
}

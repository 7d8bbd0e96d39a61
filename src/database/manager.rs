use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config;

/// Errors from DatabaseManager
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Process-wide connection pool, created lazily from DATABASE_URL
pub struct DatabaseManager;

impl DatabaseManager {
    /// Get the shared pool, creating it on first use
    pub async fn pool() -> Result<PgPool, DatabaseError> {
        let pool = POOL
            .get_or_try_init(|| async {
                let connection_string = Self::connection_string()?;
                let db_config = &config::config().database;

                let pool = PgPoolOptions::new()
                    .max_connections(db_config.max_connections)
                    .acquire_timeout(Duration::from_secs(db_config.connection_timeout))
                    .connect(&connection_string)
                    .await?;

                info!("Created database pool");
                Ok::<_, DatabaseError>(pool)
            })
            .await?;

        Ok(pool.clone())
    }

    fn connection_string() -> Result<String, DatabaseError> {
        let base = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

        // Validate early so a malformed URL fails at startup, not mid-request
        url::Url::parse(&base).map_err(|_| DatabaseError::InvalidDatabaseUrl)?;
        Ok(base)
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check() -> Result<(), DatabaseError> {
        let pool = Self::pool().await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
        Ok(())
    }
}

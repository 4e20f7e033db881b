//! Database connection handling
//!
//! This module opens the MySQL pool used for introspection and DDL execution.

use sqlx::mysql::MySqlPoolOptions;
use sqlx::MySqlPool;
use std::time::Duration;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// A MySQL pool plus the schema it introspects
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: MySqlPool,
    schema: Option<String>,
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or(5);
        let timeout_seconds = config.timeout_seconds.unwrap_or(30);

        // sqlx only knows the mysql:// scheme; MariaDB speaks the same protocol
        let url = match config.url.strip_prefix("mariadb://") {
            Some(rest) => format!("mysql://{}", rest),
            None => config.url.clone(),
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(timeout_seconds))
            .connect(&url)
            .await
            .map_err(|e| Error::ConnectionError(e.to_string()))?;

        tracing::info!(pool_size, schema = ?config.schema, "Connected to database");

        Ok(Self {
            pool,
            schema: config.schema.clone(),
        })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: MySqlPool, schema: Option<String>) -> Self {
        Self { pool, schema }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Configured schema; `None` means the connection's current database
    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Execute a single SQL statement
    pub async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

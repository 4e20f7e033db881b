//! DDL execution
//!
//! Encoded statements are handed to a [`DdlExecutor`]. The encoder never looks
//! at the outcome; failures reach the caller as `DdlExecutionError`.

use async_trait::async_trait;
use sqlx::MySqlPool;

use crate::config::DdlConfig;
use crate::db::connection::DatabaseConnection;
use crate::error::Result;

/// Runs DDL statements against a database
#[async_trait]
pub trait DdlExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<()>;
}

#[async_trait]
impl DdlExecutor for MySqlPool {
    async fn execute(&self, sql: &str) -> Result<()> {
        sqlx::query(sql).execute(self).await?;
        Ok(())
    }
}

#[async_trait]
impl DdlExecutor for DatabaseConnection {
    async fn execute(&self, sql: &str) -> Result<()> {
        DatabaseConnection::execute(self, sql).await
    }
}

#[async_trait]
impl<E: DdlExecutor + ?Sized> DdlExecutor for &E {
    async fn execute(&self, sql: &str) -> Result<()> {
        (**self).execute(sql).await
    }
}

/// Executor that logs every statement and honours dry runs
pub struct SqlExecutor<E: DdlExecutor> {
    inner: E,
    dry_run: bool,
}

impl<E: DdlExecutor> SqlExecutor<E> {
    /// Create a new SQL executor
    pub fn new(inner: E, config: &DdlConfig) -> Self {
        Self {
            inner,
            dry_run: config.dry_run,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Execute multiple SQL statements in order, stopping at the first failure
    pub async fn execute_batch(&self, statements: &[String]) -> Result<()> {
        for statement in statements {
            self.execute(statement).await?;
        }

        Ok(())
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: DdlExecutor> DdlExecutor for SqlExecutor<E> {
    async fn execute(&self, sql: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!(sql, "DDL (dry run)");
            return Ok(());
        }

        tracing::info!(sql, "Executing DDL");
        self.inner.execute(sql).await.map_err(|e| {
            tracing::error!(sql, error = %e, "DDL failed");
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        statements: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl DdlExecutor for Recorder {
        async fn execute(&self, sql: &str) -> Result<()> {
            if self.fail_on.as_deref() == Some(sql) {
                return Err(Error::DdlExecutionError(sqlx::Error::RowNotFound));
            }
            self.statements.lock().unwrap().push(sql.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dry_run_executes_nothing() {
        let executor = SqlExecutor::new(Recorder::default(), &DdlConfig { dry_run: true });
        executor
            .execute_batch(&["DROP TABLE `a`".to_string()])
            .await
            .unwrap();
        assert!(executor.inner().statements.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let recorder = Recorder {
            fail_on: Some("B".to_string()),
            ..Recorder::default()
        };
        let executor = SqlExecutor::new(recorder, &DdlConfig::default());
        let statements = vec!["A".to_string(), "B".to_string(), "C".to_string()];

        let err = executor.execute_batch(&statements).await.unwrap_err();
        assert_eq!(err.kind(), "DdlExecutionError");
        assert_eq!(*executor.inner().statements.lock().unwrap(), vec!["A".to_string()]);
    }
}

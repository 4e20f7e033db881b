//! Migration helpers
//!
//! Each helper encodes a statement and hands it to a [`DdlExecutor`]. When
//! encoding fails nothing is executed.

use crate::config::NamingConfig;
use crate::db::executor::DdlExecutor;
use crate::error::Result;
use crate::schema::encoder::SchemaEncoder;
use crate::schema::provider::MetadataProvider;
use crate::schema::types::{
    ColumnOptions, ColumnType, ConstraintSpec, ForeignKeyBuilder, IndexSpec, TableSpec,
};

/// Schema-changing operations for migration authors
pub struct MigrationHelpers<E: DdlExecutor> {
    encoder: SchemaEncoder,
    executor: E,
    naming: NamingConfig,
}

impl<E: DdlExecutor> MigrationHelpers<E> {
    pub fn new(encoder: SchemaEncoder, executor: E) -> Self {
        Self {
            encoder,
            executor,
            naming: NamingConfig::default(),
        }
    }

    pub fn with_naming(mut self, naming: NamingConfig) -> Self {
        self.naming = naming;
        self
    }

    pub fn encoder(&self) -> &SchemaEncoder {
        &self.encoder
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    async fn run(&self, sql: String) -> Result<()> {
        tracing::debug!(sql = %sql, "Running migration statement");
        self.executor.execute(&sql).await
    }

    pub async fn create_table(&self, table: &TableSpec) -> Result<()> {
        for statement in self.encoder.create_table(table)? {
            self.run(statement).await?;
        }
        tracing::info!(table = %table.name, "Created table");
        Ok(())
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        self.run(self.encoder.drop_table(table, false)).await
    }

    pub async fn add_column(
        &self,
        table: &str,
        column: &str,
        column_type: ColumnType,
        options: &ColumnOptions,
    ) -> Result<()> {
        let sql = self.encoder.add_column(table, column, column_type, options)?;
        self.run(sql).await
    }

    /// Redefine a column; the current default is read from `provider` unless
    /// `options` set one
    pub async fn change_column<P: MetadataProvider + Sync + ?Sized>(
        &self,
        provider: &P,
        table: &str,
        column: &str,
        column_type: ColumnType,
        options: &ColumnOptions,
    ) -> Result<()> {
        let sql = self
            .encoder
            .change_column(provider, table, column, column_type, options)?;
        self.run(sql).await
    }

    pub async fn remove_column(&self, table: &str, column: &str) -> Result<()> {
        self.run(self.encoder.remove_column(table, column)).await
    }

    /// Add an index named by the configured index pattern
    pub async fn add_index(&self, table: &str, columns: &[&str], unique: bool) -> Result<IndexSpec> {
        let mut index = IndexSpec::conventional(&self.naming.index_pattern, table, columns);
        index.unique = unique;
        let sql = self.encoder.add_index(table, &index)?;
        self.run(sql).await?;
        Ok(index)
    }

    pub async fn remove_index(&self, table: &str, index_name: &str) -> Result<()> {
        self.run(self.encoder.remove_index(table, index_name)).await
    }

    /// Foreign key builder using the configured name pattern
    pub fn foreign_key(&self, table: &str, ref_table: &str) -> ForeignKeyBuilder {
        ConstraintSpec::foreign_key(table, ref_table).name_pattern(&self.naming.foreign_key_pattern)
    }

    pub async fn add_constraint(&self, constraint: &ConstraintSpec) -> Result<()> {
        let sql = self.encoder.add_constraint(constraint)?;
        self.run(sql).await?;
        tracing::info!(constraint = %constraint.name, table = %constraint.table, "Added constraint");
        Ok(())
    }

    pub async fn remove_constraint(&self, constraint: &ConstraintSpec) -> Result<()> {
        let sql = self.encoder.drop_constraint(constraint)?;
        self.run(sql).await
    }
}

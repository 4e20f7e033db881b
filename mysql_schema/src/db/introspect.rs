//! Live schema introspection
//!
//! Reads `information_schema` into a [`Snapshot`], which then serves as the
//! metadata provider for the decoder and the dumper.

use indexmap::IndexMap;
use sqlx::{FromRow, MySqlPool};

use crate::error::{Error, Result};
use crate::schema::provider::{RawColumn, Snapshot, TableSnapshot};
use crate::schema::types::{ConstraintKind, ConstraintSpec, IndexSpec, PrimaryKey, ReferentialAction};

#[derive(FromRow)]
struct TableRow {
    table_name: String,
}

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    column_type: String,
    is_nullable: String,
    column_default: Option<String>,
}

#[derive(FromRow)]
struct KeyColumnRow {
    column_name: String,
}

#[derive(FromRow)]
struct IndexRow {
    index_name: String,
    /// NULL for the expression parts of functional indexes
    column_name: Option<String>,
    non_unique: i64,
}

#[derive(FromRow)]
struct ForeignKeyRow {
    constraint_name: String,
    column_name: String,
    ref_table: String,
    ref_column: String,
    delete_rule: String,
    update_rule: String,
}

#[derive(FromRow)]
struct CheckRow {
    constraint_name: String,
    check_clause: String,
}

fn metadata_error(e: sqlx::Error) -> Error {
    Error::MetadataError(e.to_string())
}

fn failure_message(e: Error) -> String {
    match e {
        Error::MetadataError(message) => message,
        other => other.to_string(),
    }
}

/// Collect `statistics` rows into indexes. Functional indexes have no column
/// list a dump can express and are left out.
fn group_index_rows(table: &str, rows: Vec<IndexRow>) -> Vec<IndexSpec> {
    let mut indexes: IndexMap<String, Option<IndexSpec>> = IndexMap::new();
    for row in rows {
        let entry = indexes.entry(row.index_name.clone()).or_insert_with(|| {
            Some(IndexSpec {
                name: row.index_name.clone(),
                columns: Vec::new(),
                unique: row.non_unique == 0,
            })
        });

        let Some(index) = entry else { continue };
        match row.column_name {
            Some(column) => index.columns.push(column),
            None => {
                tracing::debug!(table, index = %row.index_name, "Skipping functional index");
                *entry = None;
            }
        }
    }

    indexes.into_values().flatten().collect()
}

/// Schema introspector for a MySQL or MariaDB database
pub struct MySqlIntrospector<'a> {
    pool: &'a MySqlPool,
}

impl<'a> MySqlIntrospector<'a> {
    pub fn new(pool: &'a MySqlPool) -> Self {
        Self { pool }
    }

    /// Load every base table of `schema`, or of the current database when
    /// `schema` is `None`
    pub async fn snapshot(&self, schema: Option<&str>, emulate_booleans: bool) -> Result<Snapshot> {
        let schema = match schema {
            Some(schema) => schema.to_string(),
            None => self.current_database().await?,
        };
        let mariadb = self.is_mariadb().await?;

        let mut snapshot = Snapshot::new().with_emulate_booleans(emulate_booleans);
        snapshot.version = self.schema_version(&schema).await;

        for table in self.tables(&schema).await? {
            let table_snapshot = match self.table(&schema, &table, mariadb).await {
                Ok(table_snapshot) => table_snapshot,
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "Failed to introspect table");
                    TableSnapshot::failed(&failure_message(e))
                }
            };
            snapshot.add_table(&table, table_snapshot);
        }

        tracing::info!(schema = %schema, tables = snapshot.tables.len(), "Loaded schema snapshot");
        Ok(snapshot)
    }

    async fn table(&self, schema: &str, table: &str, mariadb: bool) -> Result<TableSnapshot> {
        Ok(TableSnapshot {
            columns: self.columns(schema, table, mariadb).await?,
            primary_key: self.primary_key(schema, table).await?,
            indexes: self.indexes(schema, table).await?,
            constraints: self.constraints(schema, table).await?,
            error: None,
        })
    }

    async fn current_database(&self) -> Result<String> {
        sqlx::query_scalar::<_, Option<String>>("SELECT CAST(DATABASE() AS CHAR)")
            .fetch_one(self.pool)
            .await
            .map_err(metadata_error)?
            .ok_or_else(|| Error::MetadataError("No database selected".to_string()))
    }

    async fn is_mariadb(&self) -> Result<bool> {
        let version = sqlx::query_scalar::<_, String>("SELECT CAST(VERSION() AS CHAR)")
            .fetch_one(self.pool)
            .await
            .map_err(metadata_error)?;
        Ok(version.to_lowercase().contains("mariadb"))
    }

    /// Latest migration version, if the database keeps a `schema_migrations` table
    async fn schema_version(&self, schema: &str) -> Option<String> {
        let sql = format!(
            "SELECT CAST(MAX(version) AS CHAR) FROM `{}`.`schema_migrations`",
            schema.replace('`', "``")
        );
        match sqlx::query_scalar::<_, Option<String>>(&sql)
            .fetch_one(self.pool)
            .await
        {
            Ok(version) => version,
            Err(e) => {
                tracing::debug!(error = %e, "No schema version available");
                None
            }
        }
    }

    async fn tables(&self, schema: &str) -> Result<Vec<String>> {
        let sql = r#"
            SELECT CAST(table_name AS CHAR) AS table_name
            FROM information_schema.tables
            WHERE table_schema = ?
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(schema)
            .fetch_all(self.pool)
            .await
            .map_err(metadata_error)?;

        Ok(rows.into_iter().map(|r| r.table_name).collect())
    }

    async fn columns(&self, schema: &str, table: &str, mariadb: bool) -> Result<Vec<RawColumn>> {
        let sql = r#"
            SELECT CAST(column_name AS CHAR) AS column_name,
                   CAST(column_type AS CHAR) AS column_type,
                   CAST(is_nullable AS CHAR) AS is_nullable,
                   CAST(column_default AS CHAR) AS column_default
            FROM information_schema.columns
            WHERE table_schema = ? AND table_name = ?
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(schema)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(metadata_error)?;

        Ok(rows
            .into_iter()
            .map(|row| RawColumn {
                name: row.column_name,
                sql_type: row.column_type,
                nullable: row.is_nullable == "YES",
                default: normalize_default(row.column_default, mariadb),
            })
            .collect())
    }

    /// Single-column primary key; composite keys are reported as none
    async fn primary_key(&self, schema: &str, table: &str) -> Result<Option<PrimaryKey>> {
        let sql = r#"
            SELECT CAST(column_name AS CHAR) AS column_name
            FROM information_schema.key_column_usage
            WHERE table_schema = ? AND table_name = ?
              AND constraint_name = 'PRIMARY'
            ORDER BY ordinal_position
        "#;

        let mut rows = sqlx::query_as::<_, KeyColumnRow>(sql)
            .bind(schema)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(metadata_error)?;

        if rows.len() == 1 {
            let row = rows.remove(0);
            Ok(Some(PrimaryKey {
                column: row.column_name,
                sequence: None,
            }))
        } else {
            Ok(None)
        }
    }

    async fn indexes(&self, schema: &str, table: &str) -> Result<Vec<IndexSpec>> {
        let sql = r#"
            SELECT CAST(index_name AS CHAR) AS index_name,
                   CAST(column_name AS CHAR) AS column_name,
                   CAST(non_unique AS SIGNED) AS non_unique
            FROM information_schema.statistics
            WHERE table_schema = ? AND table_name = ?
              AND index_name <> 'PRIMARY'
            ORDER BY index_name, seq_in_index
        "#;

        let rows = sqlx::query_as::<_, IndexRow>(sql)
            .bind(schema)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(metadata_error)?;

        Ok(group_index_rows(table, rows))
    }

    async fn constraints(&self, schema: &str, table: &str) -> Result<Vec<ConstraintSpec>> {
        let mut constraints = self.foreign_keys(schema, table).await?;
        constraints.extend(self.check_constraints(schema, table).await);
        Ok(constraints)
    }

    async fn foreign_keys(&self, schema: &str, table: &str) -> Result<Vec<ConstraintSpec>> {
        let sql = r#"
            SELECT CAST(rc.constraint_name AS CHAR) AS constraint_name,
                   CAST(kcu.column_name AS CHAR) AS column_name,
                   CAST(kcu.referenced_table_name AS CHAR) AS ref_table,
                   CAST(kcu.referenced_column_name AS CHAR) AS ref_column,
                   CAST(rc.delete_rule AS CHAR) AS delete_rule,
                   CAST(rc.update_rule AS CHAR) AS update_rule
            FROM information_schema.referential_constraints rc
            JOIN information_schema.key_column_usage kcu
              ON rc.constraint_schema = kcu.constraint_schema
             AND rc.constraint_name = kcu.constraint_name
             AND rc.table_name = kcu.table_name
            WHERE rc.constraint_schema = ? AND rc.table_name = ?
            ORDER BY rc.constraint_name, kcu.ordinal_position
        "#;

        let rows = sqlx::query_as::<_, ForeignKeyRow>(sql)
            .bind(schema)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(metadata_error)?;

        let mut foreign_keys: IndexMap<String, ConstraintSpec> = IndexMap::new();
        for row in rows {
            let constraint = foreign_keys
                .entry(row.constraint_name.clone())
                .or_insert_with(|| ConstraintSpec {
                    name: row.constraint_name.clone(),
                    table: table.to_string(),
                    kind: ConstraintKind::ForeignKey {
                        columns: Vec::new(),
                        ref_table: row.ref_table.clone(),
                        ref_columns: Vec::new(),
                        on_delete: referential_action(&row.delete_rule),
                        on_update: referential_action(&row.update_rule),
                    },
                });

            if let ConstraintKind::ForeignKey {
                columns,
                ref_columns,
                ..
            } = &mut constraint.kind
            {
                columns.push(row.column_name);
                ref_columns.push(row.ref_column);
            }
        }

        Ok(foreign_keys.into_values().collect())
    }

    /// Check constraints need MySQL 8.0.16 or MariaDB 10.2; older servers
    /// report none
    async fn check_constraints(&self, schema: &str, table: &str) -> Vec<ConstraintSpec> {
        let sql = r#"
            SELECT CAST(cc.constraint_name AS CHAR) AS constraint_name,
                   CAST(cc.check_clause AS CHAR) AS check_clause
            FROM information_schema.check_constraints cc
            JOIN information_schema.table_constraints tc
              ON tc.constraint_schema = cc.constraint_schema
             AND tc.constraint_name = cc.constraint_name
            WHERE tc.table_schema = ? AND tc.table_name = ?
              AND tc.constraint_type = 'CHECK'
            ORDER BY cc.constraint_name
        "#;

        match sqlx::query_as::<_, CheckRow>(sql)
            .bind(schema)
            .bind(table)
            .fetch_all(self.pool)
            .await
        {
            Ok(rows) => rows
                .into_iter()
                .map(|row| ConstraintSpec::check(table, &row.constraint_name, &row.check_clause))
                .collect(),
            Err(e) => {
                tracing::debug!(table, error = %e, "Check constraints unavailable");
                Vec::new()
            }
        }
    }
}

/// Load a snapshot of `schema` through `pool`
pub async fn load_snapshot(
    pool: &MySqlPool,
    schema: Option<&str>,
    emulate_booleans: bool,
) -> Result<Snapshot> {
    MySqlIntrospector::new(pool)
        .snapshot(schema, emulate_booleans)
        .await
}

/// Undeclared actions are reported as `RESTRICT` or `NO ACTION` depending on
/// the server version; both mean the same for InnoDB
fn referential_action(rule: &str) -> Option<ReferentialAction> {
    match rule.parse::<ReferentialAction>() {
        Ok(ReferentialAction::Restrict) | Ok(ReferentialAction::NoAction) | Err(_) => None,
        Ok(action) => Some(action),
    }
}

/// MariaDB 10.2.7+ quotes literal defaults and reports a missing default as
/// `NULL`; MySQL reports string defaults bare
fn normalize_default(raw: Option<String>, mariadb: bool) -> Option<String> {
    let raw = raw?;
    if !mariadb {
        return Some(raw);
    }
    if raw == "NULL" {
        return None;
    }
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        return Some(raw[1..raw.len() - 1].replace("''", "'"));
    }
    Some(raw)
}

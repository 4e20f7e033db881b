//! Database module for mysql_schema
//!
//! This module holds the sqlx-backed collaborators: the connection, DDL
//! execution, introspection into snapshots and the migration helpers.

pub mod connection;
pub mod executor;
pub mod introspect;
pub mod migrations;

// Re-export key types
pub use connection::DatabaseConnection;
pub use executor::{DdlExecutor, SqlExecutor};
pub use introspect::{load_snapshot, MySqlIntrospector};
pub use migrations::MigrationHelpers;

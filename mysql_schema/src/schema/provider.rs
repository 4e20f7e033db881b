//! Metadata providers
//!
//! The decoder reads live schema information through [`MetadataProvider`].
//! [`Snapshot`] is an in-memory provider that can be saved to and loaded from
//! JSON or YAML, or filled from a live database by `db::introspect`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::schema::types::{ColumnMetadata, ConstraintSpec, IndexSpec, PrimaryKey};

/// Source of live table metadata
pub trait MetadataProvider {
    /// Names of all base tables
    fn tables(&self) -> Result<Vec<String>>;

    /// Columns of `table` in ordinal order
    fn columns(&self, table: &str) -> Result<Vec<ColumnMetadata>>;

    /// Primary key of `table`.
    ///
    /// Providers without primary key introspection keep this default, and
    /// callers fall back to `id`.
    fn primary_key(&self, _table: &str) -> Result<Option<PrimaryKey>> {
        Ok(None)
    }

    fn indexes(&self, _table: &str) -> Result<Vec<IndexSpec>> {
        Ok(Vec::new())
    }

    fn constraints(&self, _table: &str) -> Result<Vec<ConstraintSpec>> {
        Ok(Vec::new())
    }
}

/// A column exactly as the database describes it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub name: String,
    pub sql_type: String,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
}

impl RawColumn {
    pub fn new(name: &str, sql_type: &str) -> Self {
        Self {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

/// Everything known about one table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub columns: Vec<RawColumn>,
    #[serde(default)]
    pub primary_key: Option<PrimaryKey>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
    /// Set when the table's metadata could not be read; lookups report it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TableSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table whose metadata could not be loaded
    pub fn failed(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn column(mut self, column: RawColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = Some(PrimaryKey {
            column: column.to_string(),
            sequence: None,
        });
        self
    }

    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn constraint(mut self, constraint: ConstraintSpec) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Serializable point-in-time copy of a schema's metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Schema version printed in the dump header
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub tables: IndexMap<String, TableSnapshot>,
    #[serde(skip, default = "default_true")]
    emulate_booleans: bool,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Self {
            version: None,
            tables: IndexMap::new(),
            emulate_booleans: true,
        }
    }

    /// Decode `tinyint(1)` as boolean (the default) or as a 1-byte integer
    pub fn with_emulate_booleans(mut self, emulate_booleans: bool) -> Self {
        self.emulate_booleans = emulate_booleans;
        self
    }

    pub fn add_table(&mut self, name: &str, table: TableSnapshot) {
        self.tables.insert(name.to_string(), table);
    }

    pub fn table(mut self, name: &str, table: TableSnapshot) -> Self {
        self.add_table(name, table);
        self
    }

    /// Load a snapshot from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        match extension(path).as_str() {
            "json" => Ok(serde_json::from_str(&contents)?),
            "yaml" | "yml" => Ok(serde_yaml::from_str(&contents)?),
            other => Err(Error::SerializationError(format!(
                "Unsupported snapshot format '{}' for {}",
                other,
                path.display()
            ))),
        }
    }

    /// Write the snapshot, choosing the format from the file extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let contents = match extension(path).as_str() {
            "json" => serde_json::to_string_pretty(self)?,
            "yaml" | "yml" => serde_yaml::to_string(self)?,
            other => {
                return Err(Error::SerializationError(format!(
                    "Unsupported snapshot format '{}' for {}",
                    other,
                    path.display()
                )))
            }
        };

        fs::write(path, contents)?;
        Ok(())
    }

    fn lookup(&self, table: &str) -> Result<&TableSnapshot> {
        let snapshot = self
            .tables
            .get(table)
            .ok_or_else(|| Error::MetadataError(format!("Table '{}' doesn't exist", table)))?;
        match &snapshot.error {
            Some(message) => Err(Error::MetadataError(message.clone())),
            None => Ok(snapshot),
        }
    }
}

impl MetadataProvider for Snapshot {
    fn tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.keys().cloned().collect())
    }

    fn columns(&self, table: &str) -> Result<Vec<ColumnMetadata>> {
        Ok(self
            .lookup(table)?
            .columns
            .iter()
            .map(|raw| ColumnMetadata::from_raw(raw, self.emulate_booleans))
            .collect())
    }

    fn primary_key(&self, table: &str) -> Result<Option<PrimaryKey>> {
        Ok(self.lookup(table)?.primary_key.clone())
    }

    fn indexes(&self, table: &str) -> Result<Vec<IndexSpec>> {
        Ok(self.lookup(table)?.indexes.clone())
    }

    fn constraints(&self, table: &str) -> Result<Vec<ConstraintSpec>> {
        Ok(self.lookup(table)?.constraints.clone())
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::ColumnType;

    fn products() -> Snapshot {
        Snapshot::new().table(
            "products",
            TableSnapshot::new()
                .column(RawColumn::new("id", "int(11)").not_null())
                .column(RawColumn::new("flag", "tinyint(1)").default("1"))
                .primary_key("id"),
        )
    }

    #[test]
    fn test_columns_are_decoded() {
        let columns = products().columns("products").unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[1].column_type, Some(ColumnType::Boolean));
    }

    #[test]
    fn test_boolean_emulation_can_be_disabled() {
        let columns = products()
            .with_emulate_booleans(false)
            .columns("products")
            .unwrap();
        assert_eq!(columns[1].column_type, Some(ColumnType::Integer));
        assert_eq!(columns[1].limit, Some(1));
    }

    #[test]
    fn test_missing_table_is_a_metadata_error() {
        let err = products().columns("orders").unwrap_err();
        assert_eq!(err.kind(), "MetadataError");
    }

    #[test]
    fn test_failed_table_reports_its_error() {
        let snapshot = products().table("broken", TableSnapshot::failed("Lost connection"));

        assert_eq!(snapshot.tables().unwrap(), vec!["products", "broken"]);
        let err = snapshot.columns("broken").unwrap_err();
        assert_eq!(err.to_string(), "Metadata error: Lost connection");
        assert!(snapshot.columns("products").is_ok());
    }

    #[test]
    fn test_save_and_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.yaml");

        let snapshot = products();
        snapshot.save(&path).unwrap();
        let loaded = Snapshot::load(&path).unwrap();

        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.txt");
        assert!(products().save(&path).is_err());
    }
}

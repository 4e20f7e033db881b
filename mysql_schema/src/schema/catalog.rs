//! Native type catalog
//!
//! Maps abstract column types to the MySQL type name and the size qualifiers a
//! column gets when none are given. The dumper uses the same defaults to decide
//! which attributes are worth printing.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::TypesConfig;
use crate::error::Result;
use crate::schema::types::ColumnType;

/// Implicit primary key definition
pub const PRIMARY_KEY_SQL: &str = "int(11) DEFAULT NULL auto_increment PRIMARY KEY";

/// Unsigned variant of the implicit primary key, opt-in for new databases
pub const UNSIGNED_PRIMARY_KEY_SQL: &str = "int(10) UNSIGNED DEFAULT NULL auto_increment PRIMARY KEY";

/// Native type name plus its default size qualifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeType {
    pub name: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub precision: Option<u32>,
    #[serde(default)]
    pub scale: Option<u32>,
}

impl NativeType {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            limit: None,
            precision: None,
            scale: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Catalog of native types keyed by abstract column type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeCatalog {
    types: IndexMap<ColumnType, NativeType>,
}

impl TypeCatalog {
    /// The MySQL catalog. Integer limits are byte sizes.
    pub fn mysql() -> Self {
        let types = [
            (ColumnType::PrimaryKey, NativeType::named(PRIMARY_KEY_SQL)),
            (ColumnType::String, NativeType::named("varchar").with_limit(255)),
            (ColumnType::Text, NativeType::named("text")),
            (ColumnType::Integer, NativeType::named("int").with_limit(4)),
            (ColumnType::Float, NativeType::named("float")),
            (ColumnType::Decimal, NativeType::named("decimal")),
            (ColumnType::Datetime, NativeType::named("datetime")),
            (ColumnType::Timestamp, NativeType::named("datetime")),
            (ColumnType::Time, NativeType::named("time")),
            (ColumnType::Date, NativeType::named("date")),
            (ColumnType::Binary, NativeType::named("blob")),
            (ColumnType::Boolean, NativeType::named("tinyint").with_limit(1)),
        ];

        Self {
            types: types.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Build the MySQL catalog with configured overrides applied
    pub fn from_config(config: &TypesConfig) -> Result<Self> {
        let mut catalog = Self::mysql();

        if config.unsigned_primary_key {
            catalog.insert(
                ColumnType::PrimaryKey,
                NativeType::named(UNSIGNED_PRIMARY_KEY_SQL),
            );
        }

        for (type_name, native) in &config.overrides {
            let column_type: ColumnType = type_name.parse()?;
            tracing::debug!(column_type = %column_type, native = %native.name, "Overriding native type");
            catalog.insert(column_type, native.clone());
        }

        Ok(catalog)
    }

    /// Default attributes for a type, or `None` if the type is not mapped
    pub fn defaults_for(&self, column_type: ColumnType) -> Option<&NativeType> {
        self.types.get(&column_type)
    }

    pub fn contains(&self, column_type: ColumnType) -> bool {
        self.types.contains_key(&column_type)
    }

    pub fn insert(&mut self, column_type: ColumnType, native: NativeType) {
        self.types.insert(column_type, native);
    }

    pub fn remove(&mut self, column_type: ColumnType) -> Option<NativeType> {
        self.types.shift_remove(&column_type)
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::mysql()
    }
}

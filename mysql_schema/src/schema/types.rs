//! Type definitions for declarative schema objects

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::utils::naming;

/// Abstract column types understood by the encoder and the dumper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    PrimaryKey,
    String,
    Text,
    Integer,
    Float,
    Decimal,
    Datetime,
    Timestamp,
    Time,
    Date,
    Binary,
    Boolean,
}

impl ColumnType {
    pub const ALL: [ColumnType; 12] = [
        ColumnType::PrimaryKey,
        ColumnType::String,
        ColumnType::Text,
        ColumnType::Integer,
        ColumnType::Float,
        ColumnType::Decimal,
        ColumnType::Datetime,
        ColumnType::Timestamp,
        ColumnType::Time,
        ColumnType::Date,
        ColumnType::Binary,
        ColumnType::Boolean,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::PrimaryKey => "primary_key",
            ColumnType::String => "string",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Decimal => "decimal",
            ColumnType::Datetime => "datetime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Time => "time",
            ColumnType::Date => "date",
            ColumnType::Binary => "binary",
            ColumnType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        ColumnType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == wanted)
            .ok_or_else(|| Error::UnknownTypeError(format!("Unknown column type '{}'", s)))
    }
}

/// A typed default value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Null,
    String(String),
    Integer(i64),
    /// Exact decimal text, never routed through a float
    Decimal(String),
    Float(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl Literal {
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Integer(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Integer(value.into())
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Float(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

/// Declared intent for a single column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub default: Option<Literal>,
    /// Only meaningful for integer columns; ignored for every other type
    pub unsigned: bool,
}

impl ColumnSpec {
    /// Create a new nullable column with no size qualifiers
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            limit: None,
            precision: None,
            scale: None,
            nullable: true,
            default: None,
            unsigned: false,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Set a default value for the column
    pub fn default(mut self, default: impl Into<Literal>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = unsigned;
        self
    }

    pub fn is_unsigned_integer(&self) -> bool {
        self.unsigned && self.column_type == ColumnType::Integer
    }

    /// Options equivalent to this column, as passed to `add_column`
    pub fn options(&self) -> ColumnOptions {
        ColumnOptions {
            limit: self.limit,
            precision: self.precision,
            scale: self.scale,
            default: self.default.clone(),
            null: if self.nullable { None } else { Some(false) },
            unsigned: self.unsigned,
        }
    }
}

/// Options accepted by `add_column` and `change_column`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnOptions {
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    /// `Some(Literal::Null)` asks for an explicit `DEFAULT NULL`
    pub default: Option<Literal>,
    pub null: Option<bool>,
    pub unsigned: bool,
}

impl ColumnOptions {
    pub fn new() -> Self {
        <Self as Default>::default()
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn default(mut self, default: impl Into<Literal>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn default_null(mut self) -> Self {
        self.default = Some(Literal::Null);
        self
    }

    pub fn null(mut self, null: bool) -> Self {
        self.null = Some(null);
        self
    }

    pub fn unsigned(mut self, unsigned: bool) -> Self {
        self.unsigned = unsigned;
        self
    }

    /// Whether a `DEFAULT` clause should be emitted.
    ///
    /// A null default on a `NOT NULL` column counts as no default at all.
    pub fn includes_default(&self) -> bool {
        match &self.default {
            None => false,
            Some(default) => !(self.null == Some(false) && default.is_null()),
        }
    }
}

/// Primary key designation reported by a metadata provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryKey {
    pub column: String,
    pub sequence: Option<String>,
}

/// Represents an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub unique: bool,
}

impl IndexSpec {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    /// Index named after `pattern`, e.g. `index_orders_on_customer_id`
    pub fn conventional(pattern: &str, table: &str, columns: &[&str]) -> Self {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let name = naming::truncate_identifier(
            &naming::get_index_name(pattern, table, &columns),
            naming::MYSQL_MAX_IDENTIFIER_LENGTH,
        );
        Self {
            name,
            columns,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Referential action for `ON DELETE` / `ON UPDATE`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    Cascade,
    SetNull,
    Restrict,
    NoAction,
    SetDefault,
}

impl ReferentialAction {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "CASCADE",
            ReferentialAction::SetNull => "SET NULL",
            ReferentialAction::Restrict => "RESTRICT",
            ReferentialAction::NoAction => "NO ACTION",
            ReferentialAction::SetDefault => "SET DEFAULT",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferentialAction::Cascade => "cascade",
            ReferentialAction::SetNull => "set_null",
            ReferentialAction::Restrict => "restrict",
            ReferentialAction::NoAction => "no_action",
            ReferentialAction::SetDefault => "set_default",
        }
    }
}

impl FromStr for ReferentialAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().replace('_', " ").as_str() {
            "CASCADE" => Ok(ReferentialAction::Cascade),
            "SET NULL" => Ok(ReferentialAction::SetNull),
            "RESTRICT" => Ok(ReferentialAction::Restrict),
            "NO ACTION" => Ok(ReferentialAction::NoAction),
            "SET DEFAULT" => Ok(ReferentialAction::SetDefault),
            _ => Err(Error::ValidationError(format!(
                "Unknown referential action '{}'",
                s
            ))),
        }
    }
}

/// Kind-specific payload of a named constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintKind {
    ForeignKey {
        columns: Vec<String>,
        ref_table: String,
        ref_columns: Vec<String>,
        #[serde(default)]
        on_delete: Option<ReferentialAction>,
        #[serde(default)]
        on_update: Option<ReferentialAction>,
    },
    Check {
        expression: String,
    },
}

/// A named table-level constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintSpec {
    /// Emitted verbatim so migrations stay reversible
    pub name: String,
    pub table: String,
    #[serde(flatten)]
    pub kind: ConstraintKind,
}

impl ConstraintSpec {
    /// Start a foreign key from `table` to `ref_table`
    pub fn foreign_key(table: &str, ref_table: &str) -> ForeignKeyBuilder {
        ForeignKeyBuilder::new(table, ref_table)
    }

    pub fn check(table: &str, name: &str, expression: &str) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            kind: ConstraintKind::Check {
                expression: expression.to_string(),
            },
        }
    }

    pub fn is_foreign_key(&self) -> bool {
        matches!(self.kind, ConstraintKind::ForeignKey { .. })
    }
}

/// Builder filling in the conventional column, key and name of a foreign key
#[derive(Debug, Clone)]
pub struct ForeignKeyBuilder {
    table: String,
    ref_table: String,
    columns: Option<Vec<String>>,
    ref_columns: Option<Vec<String>>,
    name: Option<String>,
    name_pattern: String,
    on_delete: Option<ReferentialAction>,
    on_update: Option<ReferentialAction>,
}

impl ForeignKeyBuilder {
    pub fn new(table: &str, ref_table: &str) -> Self {
        Self {
            table: table.to_string(),
            ref_table: ref_table.to_string(),
            columns: None,
            ref_columns: None,
            name: None,
            name_pattern: naming::DEFAULT_FOREIGN_KEY_PATTERN.to_string(),
            on_delete: None,
            on_update: None,
        }
    }

    pub fn column(mut self, column: &str) -> Self {
        self.columns = Some(vec![column.to_string()]);
        self
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn references(mut self, columns: &[&str]) -> Self {
        self.ref_columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn name_pattern(mut self, pattern: &str) -> Self {
        self.name_pattern = pattern.to_string();
        self
    }

    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        self.on_delete = Some(action);
        self
    }

    pub fn on_update(mut self, action: ReferentialAction) -> Self {
        self.on_update = Some(action);
        self
    }

    pub fn build(self) -> ConstraintSpec {
        let columns = self
            .columns
            .unwrap_or_else(|| vec![naming::foreign_key_column(&self.ref_table)]);
        let ref_columns = self.ref_columns.unwrap_or_else(|| vec!["id".to_string()]);
        let name = self.name.unwrap_or_else(|| {
            let generated =
                naming::get_foreign_key_name(&self.name_pattern, &self.table, &columns.join("_"));
            naming::truncate_identifier(&generated, naming::MYSQL_MAX_IDENTIFIER_LENGTH)
        });

        ConstraintSpec {
            name,
            table: self.table,
            kind: ConstraintKind::ForeignKey {
                columns,
                ref_table: self.ref_table,
                ref_columns,
                on_delete: self.on_delete,
                on_update: self.on_update,
            },
        }
    }
}

/// Declarative description of a whole table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    /// Never contains the implicit primary key column
    pub columns: Vec<ColumnSpec>,
    pub primary_key: String,
    /// False when the table has no implicit primary key
    pub id: bool,
    pub force: bool,
    pub options: Option<String>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    #[serde(default)]
    pub constraints: Vec<ConstraintSpec>,
}

impl TableSpec {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: "id".to_string(),
            id: true,
            force: false,
            options: None,
            indexes: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn primary_key(mut self, column: &str) -> Self {
        self.primary_key = column.to_string();
        self
    }

    pub fn without_id(mut self) -> Self {
        self.id = false;
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Add a column to the table; the primary key column is skipped
    pub fn add_column(&mut self, column: ColumnSpec) {
        if self.id && column.name == self.primary_key {
            return;
        }
        self.columns.push(column);
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.add_column(column);
        self
    }

    pub fn find_column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A live column as described by a metadata provider, after type decoding
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub sql_type: String,
    /// `None` when the SQL type has no abstract counterpart
    pub column_type: Option<ColumnType>,
    pub limit: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub nullable: bool,
    pub default: Option<Literal>,
    pub unsigned: bool,
}

impl ColumnMetadata {
    /// Reconstruct the declared column, failing on unmapped SQL types
    pub fn to_column_spec(&self) -> Result<ColumnSpec> {
        let column_type = self
            .column_type
            .ok_or_else(|| Error::unknown_column_type(&self.sql_type, &self.name))?;

        Ok(ColumnSpec {
            name: self.name.clone(),
            column_type,
            limit: self.limit,
            precision: self.precision,
            scale: self.scale,
            nullable: self.nullable,
            default: self.default.clone(),
            unsigned: self.unsigned && column_type == ColumnType::Integer,
        })
    }
}

//! Schema decoder
//!
//! Turns live column metadata back into declarative specs: MySQL type strings
//! are simplified to abstract column types, size qualifiers and the unsigned
//! flag are extracted, and raw defaults are cast to typed literals.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};
use crate::schema::catalog::TypeCatalog;
use crate::schema::provider::{MetadataProvider, RawColumn};
use crate::schema::types::{ColumnMetadata, ColumnType, Literal, TableSpec};

static SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*(\d+)").expect("size pattern is valid"));

static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:numeric|decimal|number)\((\d+)(?:,\s*(\d+))?\)")
        .expect("decimal pattern is valid")
});

impl ColumnMetadata {
    /// Decode a raw column as reported by the database
    pub fn from_raw(raw: &RawColumn, emulate_booleans: bool) -> Self {
        let column_type = simplified_type(&raw.sql_type, emulate_booleans);
        let (precision, scale) = match column_type {
            Some(ColumnType::Decimal) => extract_precision_and_scale(&raw.sql_type),
            _ => (None, None),
        };

        Self {
            name: raw.name.clone(),
            sql_type: raw.sql_type.clone(),
            column_type,
            limit: extract_limit(&raw.sql_type, column_type),
            precision,
            scale,
            nullable: raw.nullable,
            default: cast_default(raw.default.as_deref(), column_type, raw.nullable),
            unsigned: raw.sql_type.to_lowercase().contains("unsigned"),
        }
    }
}

/// MySQL integer family. Matched by exact name so `point` and `multipoint` stay unknown.
const INTEGER_TYPES: [&str; 6] = ["tinyint", "smallint", "mediumint", "int", "integer", "bigint"];

/// Leading type keyword, e.g. `int` for `int(10) unsigned`
fn base_type(sql_type: &str) -> String {
    sql_type
        .trim()
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Map a MySQL type string to an abstract column type
pub fn simplified_type(sql_type: &str, emulate_booleans: bool) -> Option<ColumnType> {
    let lower = sql_type.trim().to_lowercase();
    if emulate_booleans && lower.starts_with("tinyint(1)") {
        return Some(ColumnType::Boolean);
    }

    let base = base_type(&lower);
    match base.as_str() {
        "enum" => Some(ColumnType::String),
        "bool" | "boolean" => Some(ColumnType::Boolean),
        b if INTEGER_TYPES.contains(&b) => Some(ColumnType::Integer),
        "float" | "double" | "real" => Some(ColumnType::Float),
        "decimal" | "numeric" => Some(ColumnType::Decimal),
        "datetime" => Some(ColumnType::Datetime),
        "timestamp" => Some(ColumnType::Timestamp),
        "time" => Some(ColumnType::Time),
        "date" => Some(ColumnType::Date),
        b if b.contains("text") || b.contains("clob") => Some(ColumnType::Text),
        b if b.contains("blob") || b.contains("binary") => Some(ColumnType::Binary),
        b if b.contains("char") => Some(ColumnType::String),
        _ => None,
    }
}

/// Size limit of a column. Integer limits are byte sizes; decimals carry
/// precision and scale instead.
pub fn extract_limit(sql_type: &str, column_type: Option<ColumnType>) -> Option<u32> {
    let base = base_type(sql_type);

    match column_type {
        Some(ColumnType::Decimal) => None,
        Some(ColumnType::Integer) | Some(ColumnType::Boolean) if INTEGER_TYPES.contains(&base.as_str()) => {
            match base.as_str() {
                "bigint" => Some(8),
                "mediumint" => Some(3),
                "smallint" => Some(2),
                "tinyint" => Some(1),
                _ => Some(4),
            }
        }
        Some(ColumnType::Integer) => Some(4),
        Some(ColumnType::Text) | Some(ColumnType::Binary) if base.starts_with("tiny") => Some(255),
        Some(ColumnType::Text) | Some(ColumnType::Binary) if base.starts_with("medium") => {
            Some(16_777_215)
        }
        Some(ColumnType::Text) | Some(ColumnType::Binary) if base.starts_with("long") => {
            Some(2_147_483_647)
        }
        _ => SIZE_RE
            .captures(sql_type)
            .and_then(|caps| caps[1].parse().ok()),
    }
}

/// Precision and scale of a `decimal(p[,s])` type; a missing scale reads as 0
pub fn extract_precision_and_scale(sql_type: &str) -> (Option<u32>, Option<u32>) {
    match DECIMAL_RE.captures(sql_type.trim()) {
        Some(caps) => {
            let precision = caps[1].parse().ok();
            let scale = match caps.get(2) {
                Some(scale) => scale.as_str().parse().ok(),
                None => Some(0),
            };
            (precision, scale)
        }
        None => (None, None),
    }
}

/// Cast a raw default string to a typed literal
pub fn cast_default(
    raw: Option<&str>,
    column_type: Option<ColumnType>,
    nullable: bool,
) -> Option<Literal> {
    let raw = raw?;

    let stringish = matches!(
        column_type,
        Some(ColumnType::String) | Some(ColumnType::Text) | Some(ColumnType::Binary) | None
    );
    // MySQL reports '' as the default of NOT NULL columns declared without one
    if raw.is_empty() && !nullable && !stringish {
        return None;
    }

    let literal = match column_type {
        None | Some(ColumnType::String) | Some(ColumnType::Text) | Some(ColumnType::Binary) => {
            Some(Literal::String(raw.to_string()))
        }
        Some(ColumnType::Integer) => raw.trim().parse().ok().map(Literal::Integer),
        Some(ColumnType::Float) => raw.trim().parse().ok().map(Literal::Float),
        Some(ColumnType::Decimal) => raw
            .trim()
            .parse::<f64>()
            .ok()
            .map(|_| Literal::Decimal(raw.trim().to_string())),
        Some(ColumnType::Boolean) => Some(Literal::Boolean(matches!(
            raw.trim().to_lowercase().as_str(),
            "1" | "true" | "t"
        ))),
        Some(ColumnType::Datetime) | Some(ColumnType::Timestamp) => {
            NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(Literal::DateTime)
        }
        Some(ColumnType::Date) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .ok()
            .map(Literal::Date),
        Some(ColumnType::Time) => NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S%.f")
            .ok()
            .map(Literal::Time),
        Some(ColumnType::PrimaryKey) => None,
    };

    if literal.is_none() {
        tracing::debug!(default = raw, ?column_type, "Dropping default that does not cast");
    }
    literal
}

/// Rebuild the declarative spec of a live table.
///
/// The primary key defaults to `id` and is left out of the column list. Any
/// column whose type is missing from `catalog`, primary key included, fails the
/// whole table.
pub fn decode_table<P: MetadataProvider + ?Sized>(
    provider: &P,
    catalog: &TypeCatalog,
    table: &str,
) -> Result<TableSpec> {
    let primary_key = provider
        .primary_key(table)?
        .map(|pk| pk.column)
        .unwrap_or_else(|| "id".to_string());
    let columns = provider.columns(table)?;

    let mut spec = TableSpec::new(table).primary_key(&primary_key).force(true);
    spec.id = columns.iter().any(|c| c.name == primary_key);

    for column in &columns {
        match column.column_type {
            Some(column_type) if catalog.contains(column_type) => {}
            _ => return Err(Error::unknown_column_type(&column.sql_type, &column.name)),
        }

        if spec.id && column.name == primary_key {
            continue;
        }
        spec.columns.push(column.to_column_spec()?);
    }

    spec.indexes = provider.indexes(table)?;
    spec.constraints = provider.constraints(table)?;

    tracing::trace!(table, columns = spec.columns.len(), "Decoded table");
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::provider::{Snapshot, TableSnapshot};
    use rstest::rstest;

    #[rstest]
    #[case("int(11)", Some(ColumnType::Integer), Some(4))]
    #[case("int(10) unsigned", Some(ColumnType::Integer), Some(4))]
    #[case("int unsigned", Some(ColumnType::Integer), Some(4))]
    #[case("bigint(20)", Some(ColumnType::Integer), Some(8))]
    #[case("tinyint(4)", Some(ColumnType::Integer), Some(1))]
    #[case("smallint(6)", Some(ColumnType::Integer), Some(2))]
    #[case("mediumint(9)", Some(ColumnType::Integer), Some(3))]
    #[case("tinyint(1)", Some(ColumnType::Boolean), Some(1))]
    #[case("varchar(100)", Some(ColumnType::String), Some(100))]
    #[case("char(2)", Some(ColumnType::String), Some(2))]
    #[case("enum('a','b')", Some(ColumnType::String), None)]
    #[case("text", Some(ColumnType::Text), None)]
    #[case("mediumtext", Some(ColumnType::Text), Some(16_777_215))]
    #[case("longblob", Some(ColumnType::Binary), Some(2_147_483_647))]
    #[case("varbinary(16)", Some(ColumnType::Binary), Some(16))]
    #[case("decimal(8,2)", Some(ColumnType::Decimal), None)]
    #[case("double", Some(ColumnType::Float), None)]
    #[case("datetime", Some(ColumnType::Datetime), None)]
    #[case("timestamp", Some(ColumnType::Timestamp), None)]
    #[case("time", Some(ColumnType::Time), None)]
    #[case("date", Some(ColumnType::Date), None)]
    #[case("geometry", None, None)]
    #[case("point", None, None)]
    #[case("multipoint", None, None)]
    #[case("integer", Some(ColumnType::Integer), Some(4))]
    #[case("bigint unsigned", Some(ColumnType::Integer), Some(8))]
    #[case("json", None, None)]
    fn test_type_and_limit(
        #[case] sql_type: &str,
        #[case] column_type: Option<ColumnType>,
        #[case] limit: Option<u32>,
    ) {
        assert_eq!(simplified_type(sql_type, true), column_type);
        assert_eq!(extract_limit(sql_type, column_type), limit);
    }

    #[test]
    fn test_precision_and_scale() {
        assert_eq!(extract_precision_and_scale("decimal(8,2)"), (Some(8), Some(2)));
        assert_eq!(extract_precision_and_scale("DECIMAL(10)"), (Some(10), Some(0)));
        assert_eq!(extract_precision_and_scale("decimal"), (None, None));
    }

    #[test]
    fn test_unsigned_flag() {
        let raw = RawColumn::new("qty", "int(10) unsigned");
        assert!(ColumnMetadata::from_raw(&raw, true).unsigned);

        let raw = RawColumn::new("qty", "int(11)");
        assert!(!ColumnMetadata::from_raw(&raw, true).unsigned);
    }

    #[test]
    fn test_cast_default() {
        assert_eq!(
            cast_default(Some("0"), Some(ColumnType::Integer), true),
            Some(Literal::Integer(0))
        );
        assert_eq!(
            cast_default(Some("9.99"), Some(ColumnType::Decimal), true),
            Some(Literal::Decimal("9.99".to_string()))
        );
        assert_eq!(
            cast_default(Some("1"), Some(ColumnType::Boolean), false),
            Some(Literal::Boolean(true))
        );
        assert_eq!(
            cast_default(Some("draft"), Some(ColumnType::String), false),
            Some(Literal::String("draft".to_string()))
        );
        assert_eq!(
            cast_default(Some("CURRENT_TIMESTAMP"), Some(ColumnType::Timestamp), false),
            None
        );
        assert_eq!(cast_default(None, Some(ColumnType::Integer), true), None);
    }

    #[test]
    fn test_forged_empty_default_is_dropped() {
        assert_eq!(cast_default(Some(""), Some(ColumnType::Integer), false), None);
        assert_eq!(
            cast_default(Some(""), Some(ColumnType::String), false),
            Some(Literal::String(String::new()))
        );
    }

    #[test]
    fn test_decode_table_without_primary_key_info() {
        let snapshot = Snapshot::new().table(
            "products",
            TableSnapshot::new()
                .column(RawColumn::new("id", "int(11)").not_null())
                .column(RawColumn::new("qty", "int(10) unsigned")),
        );

        let spec = decode_table(&snapshot, &TypeCatalog::mysql(), "products").unwrap();
        assert!(spec.id);
        assert_eq!(spec.primary_key, "id");
        assert_eq!(spec.columns.len(), 1);
        assert!(spec.columns[0].unsigned);
    }

    #[test]
    fn test_decode_table_without_id_column() {
        let snapshot = Snapshot::new().table(
            "tags_posts",
            TableSnapshot::new()
                .column(RawColumn::new("tag_id", "int(11)"))
                .column(RawColumn::new("post_id", "int(11)")),
        );

        let spec = decode_table(&snapshot, &TypeCatalog::mysql(), "tags_posts").unwrap();
        assert!(!spec.id);
        assert_eq!(spec.columns.len(), 2);
    }

    #[test]
    fn test_decode_table_fails_on_unknown_type() {
        let snapshot = Snapshot::new().table(
            "places",
            TableSnapshot::new()
                .column(RawColumn::new("id", "int(11)"))
                .column(RawColumn::new("shape", "geometry")),
        );

        let err = decode_table(&snapshot, &TypeCatalog::mysql(), "places").unwrap_err();
        assert_eq!(err.to_string(), "Unknown type 'geometry' for column 'shape'");
    }

    #[test]
    fn test_decode_table_fails_on_type_missing_from_catalog() {
        let snapshot = Snapshot::new().table(
            "events",
            TableSnapshot::new().column(RawColumn::new("happened_on", "date")),
        );
        let mut catalog = TypeCatalog::mysql();
        catalog.remove(ColumnType::Date);

        assert!(decode_table(&snapshot, &catalog, "events").is_err());
    }
}

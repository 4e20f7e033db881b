//! Encode specs to SQL types, decode them back and compare

use pretty_assertions::assert_eq;
use rstest::*;

use mysql_schema::schema::decoder::decode_table;
use mysql_schema::schema::provider::{RawColumn, Snapshot, TableSnapshot};
use mysql_schema::schema::types::{ColumnMetadata, ColumnSpec, ColumnType, Literal, TableSpec};
use mysql_schema::{SchemaEncoder, TypeCatalog};

/// Decode the type clause the encoder produced for `spec`
fn round_trip(encoder: &SchemaEncoder, spec: &ColumnSpec) -> ColumnSpec {
    let raw = RawColumn::new(&spec.name, &encoder.sql_type_for(spec));
    ColumnMetadata::from_raw(&raw, true).to_column_spec().unwrap()
}

fn effective_limit(catalog: &TypeCatalog, spec: &ColumnSpec) -> Option<u32> {
    spec.limit
        .or_else(|| catalog.defaults_for(spec.column_type).and_then(|d| d.limit))
}

#[rstest]
#[case(ColumnSpec::new("qty", ColumnType::Integer).unsigned(true))]
#[case(ColumnSpec::new("qty", ColumnType::Integer).limit(4).unsigned(true))]
#[case(ColumnSpec::new("big", ColumnType::Integer).limit(8).unsigned(true))]
#[case(ColumnSpec::new("small", ColumnType::Integer).limit(2))]
#[case(ColumnSpec::new("tiny", ColumnType::Integer).limit(1).unsigned(true))]
#[case(ColumnSpec::new("medium", ColumnType::Integer).limit(3))]
#[case(ColumnSpec::new("title", ColumnType::String).limit(40))]
#[case(ColumnSpec::new("title", ColumnType::String))]
#[case(ColumnSpec::new("body", ColumnType::Text))]
#[case(ColumnSpec::new("price", ColumnType::Decimal).precision(8).scale(2))]
#[case(ColumnSpec::new("ratio", ColumnType::Decimal).precision(5).scale(0))]
#[case(ColumnSpec::new("weight", ColumnType::Float))]
#[case(ColumnSpec::new("active", ColumnType::Boolean))]
#[case(ColumnSpec::new("placed_at", ColumnType::Datetime))]
#[case(ColumnSpec::new("placed_on", ColumnType::Date))]
#[case(ColumnSpec::new("opens", ColumnType::Time))]
#[case(ColumnSpec::new("data", ColumnType::Binary))]
fn test_column_round_trip(#[case] spec: ColumnSpec) {
    let catalog = TypeCatalog::mysql();
    let encoder = SchemaEncoder::new(catalog.clone());
    let decoded = round_trip(&encoder, &spec);

    assert_eq!(decoded.column_type, spec.column_type);
    assert_eq!(decoded.unsigned, spec.is_unsigned_integer());
    assert_eq!(decoded.limit, effective_limit(&catalog, &spec));
    if spec.column_type == ColumnType::Decimal {
        assert_eq!(decoded.precision, spec.precision);
        assert_eq!(decoded.scale, spec.scale);
    }
}

#[test]
fn test_unsigned_is_dropped_for_non_integers_on_the_way_back() {
    let encoder = SchemaEncoder::default();
    let spec = ColumnSpec::new("price", ColumnType::Decimal)
        .precision(8)
        .scale(2)
        .unsigned(true);

    let decoded = round_trip(&encoder, &spec);
    assert!(!decoded.unsigned);
}

#[test]
fn test_table_round_trip_through_dumped_metadata() {
    let catalog = TypeCatalog::mysql();
    let encoder = SchemaEncoder::new(catalog.clone());
    let table = TableSpec::new("products")
        .force(true)
        .column(ColumnSpec::new("qty", ColumnType::Integer).unsigned(true).limit(4))
        .column(
            ColumnSpec::new("price", ColumnType::Decimal)
                .precision(8)
                .scale(2)
                .nullable(false)
                .default(Literal::Decimal("0.00".to_string())),
        )
        .column(
            ColumnSpec::new("status", ColumnType::String)
                .limit(20)
                .nullable(false)
                .default("draft"),
        );

    // What the database would report for the created table
    let mut live = TableSnapshot::new()
        .column(RawColumn::new("id", "int(11)").not_null())
        .primary_key("id");
    for column in &table.columns {
        let mut raw = RawColumn::new(&column.name, &encoder.sql_type_for(column).to_lowercase());
        raw.nullable = column.nullable;
        raw.default = match &column.default {
            Some(Literal::Decimal(d)) => Some(d.clone()),
            Some(Literal::String(s)) => Some(s.clone()),
            _ => None,
        };
        live = live.column(raw);
    }
    let snapshot = Snapshot::new().table("products", live);

    let decoded = decode_table(&snapshot, &catalog, "products").unwrap();
    assert_eq!(decoded, table);
}

//! Schema module for mysql_schema
//!
//! This module translates declarative schema specs to DDL (encoder) and live
//! metadata back to specs and canonical dumps (decoder, dumper).

pub mod catalog;
pub mod decoder;
pub mod dialect;
pub mod dumper;
pub mod encoder;
pub mod format;
pub mod provider;
pub mod types;

// Re-export key types
pub use catalog::{NativeType, TypeCatalog};
pub use decoder::decode_table;
pub use dialect::{Dialect, MySqlDialect};
pub use dumper::{render_table, DumpOptions, SchemaDumper};
pub use encoder::SchemaEncoder;
pub use format::HashStyle;
pub use provider::{MetadataProvider, RawColumn, Snapshot, TableSnapshot};
pub use types::{
    ColumnMetadata, ColumnOptions, ColumnSpec, ColumnType, ConstraintKind, ConstraintSpec,
    ForeignKeyBuilder, IndexSpec, Literal, PrimaryKey, ReferentialAction, TableSpec,
};

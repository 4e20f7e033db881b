//! Schema dumper
//!
//! Produces a canonical, re-applicable text dump of a live schema. Each table
//! is rendered independently: a table that cannot be decoded is replaced by a
//! comment block and the rest of the dump still completes.

use regex::Regex;
use std::io::Write;

use crate::config::{regex_source, DumpConfig};
use crate::error::{Error, Result};
use crate::schema::catalog::TypeCatalog;
use crate::schema::decoder::decode_table;
use crate::schema::format::{self, HashStyle};
use crate::schema::provider::MetadataProvider;
use crate::schema::types::ConstraintSpec;

/// Migration versions are numeric; anything else is printed as a string literal
fn version_literal(version: &str) -> String {
    if !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) {
        version.to_string()
    } else {
        tracing::warn!(version, "Non-numeric schema version");
        format::inspect_str(version)
    }
}

/// Table holding migration versions; never dumped
pub const SCHEMA_MIGRATIONS_TABLE: &str = "schema_migrations";

const HEADER: &str = "\
# This file is generated from the current state of the database. Do not edit
# it by hand: change the schema through migrations and dump it again.
#
# Loading this file recreates the schema from scratch, dropping any existing
# table of the same name.

";

/// Options controlling a dump
#[derive(Debug, Clone)]
pub struct DumpOptions {
    /// Table names, or `/regex/` patterns, to leave out
    pub ignore_tables: Vec<String>,
    pub hash_style: HashStyle,
    pub include_indexes: bool,
    pub include_constraints: bool,
    /// Printed in the `define` line when set
    pub version: Option<String>,
}

impl Default for DumpOptions {
    fn default() -> Self {
        Self {
            ignore_tables: Vec::new(),
            hash_style: HashStyle::default(),
            include_indexes: true,
            include_constraints: true,
            version: None,
        }
    }
}

impl From<&DumpConfig> for DumpOptions {
    fn from(config: &DumpConfig) -> Self {
        Self {
            ignore_tables: config.ignore_tables.clone(),
            hash_style: config.hash_style,
            include_indexes: config.include_indexes,
            include_constraints: config.include_constraints,
            version: None,
        }
    }
}

#[derive(Debug)]
enum IgnoreRule {
    Name(String),
    Pattern(Regex),
}

impl IgnoreRule {
    fn parse(entry: &str) -> Result<Self> {
        match regex_source(entry) {
            Some(source) => Regex::new(source).map(IgnoreRule::Pattern).map_err(|e| {
                Error::ValidationError(format!("Invalid ignore_tables pattern '{}': {}", entry, e))
            }),
            None => Ok(IgnoreRule::Name(entry.to_string())),
        }
    }

    fn matches(&self, table: &str) -> bool {
        match self {
            IgnoreRule::Name(name) => name == table,
            IgnoreRule::Pattern(regex) => regex.is_match(table),
        }
    }
}

/// A rendered table plus the foreign keys printed after the last table
struct RenderedTable {
    block: String,
    foreign_keys: Vec<ConstraintSpec>,
}

/// Dumps every table of a metadata provider
pub struct SchemaDumper<'a, P: MetadataProvider + ?Sized> {
    provider: &'a P,
    catalog: &'a TypeCatalog,
    options: DumpOptions,
    ignore: Vec<IgnoreRule>,
}

impl<'a, P: MetadataProvider + ?Sized> SchemaDumper<'a, P> {
    /// Create a dumper; fails if an ignore pattern is not a valid regex
    pub fn new(provider: &'a P, catalog: &'a TypeCatalog, options: DumpOptions) -> Result<Self> {
        let ignore = options
            .ignore_tables
            .iter()
            .map(|entry| IgnoreRule::parse(entry))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            provider,
            catalog,
            options,
            ignore,
        })
    }

    pub fn is_ignored(&self, table: &str) -> bool {
        table == SCHEMA_MIGRATIONS_TABLE || self.ignore.iter().any(|rule| rule.matches(table))
    }

    /// Names of the tables a dump includes, sorted
    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut tables: Vec<String> = self
            .provider
            .tables()?
            .into_iter()
            .filter(|t| !self.is_ignored(t))
            .collect();
        tables.sort();
        Ok(tables)
    }

    /// Write the whole dump
    pub fn dump<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(HEADER.as_bytes())?;
        match &self.options.version {
            Some(version) => writeln!(
                out,
                "ActiveRecord::Schema.define({}) do",
                self.options.hash_style.pair("version", &version_literal(version))
            )?,
            None => writeln!(out, "ActiveRecord::Schema.define do")?,
        }
        writeln!(out)?;

        let mut foreign_keys = Vec::new();
        for table in self.table_names()? {
            let rendered = self.render(&table);
            out.write_all(rendered.block.as_bytes())?;
            foreign_keys.extend(rendered.foreign_keys);
        }

        out.write_all(format::format_constraints(&foreign_keys, self.options.hash_style).as_bytes())?;
        writeln!(out, "end")?;

        tracing::debug!(foreign_keys = foreign_keys.len(), "Schema dump written");
        Ok(())
    }

    pub fn dump_to_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.dump(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::SerializationError(e.to_string()))
    }

    /// Render one table with its indexes and constraints. Never fails; errors
    /// become a comment block.
    pub fn render_table(&self, table: &str) -> String {
        let rendered = self.render(table);
        let mut block = rendered.block;
        block.push_str(&format::format_constraints(
            &rendered.foreign_keys,
            self.options.hash_style,
        ));
        block
    }

    /// Render one table, returning the error instead of a comment block
    pub fn try_render_table(&self, table: &str) -> Result<String> {
        let (mut block, foreign_keys) = self.try_render(table)?;
        block.push_str(&format::format_constraints(&foreign_keys, self.options.hash_style));
        Ok(block)
    }

    fn render(&self, table: &str) -> RenderedTable {
        match self.try_render(table) {
            Ok((block, foreign_keys)) => RenderedTable {
                block,
                foreign_keys,
            },
            Err(e) => {
                tracing::warn!(table, error = %e, "Could not dump table");
                RenderedTable {
                    block: error_block(table, &e),
                    foreign_keys: Vec::new(),
                }
            }
        }
    }

    fn try_render(&self, table: &str) -> Result<(String, Vec<ConstraintSpec>)> {
        let spec = decode_table(self.provider, self.catalog, table)?;
        let style = self.options.hash_style;

        let mut block = format::format_table(&spec, self.catalog, style);
        if self.options.include_indexes {
            block.push_str(&format::format_indexes(&spec.name, &spec.indexes, style));
        }

        let mut foreign_keys = Vec::new();
        if self.options.include_constraints {
            let (fks, checks): (Vec<_>, Vec<_>) =
                spec.constraints.into_iter().partition(|c| c.is_foreign_key());
            block.push_str(&format::format_constraints(&checks, style));
            foreign_keys = fks;
        }

        Ok((block, foreign_keys))
    }
}

/// Comment block printed in place of a table that could not be dumped
pub fn error_block(table: &str, error: &Error) -> String {
    format!(
        "# Could not dump table {} because of following {}\n#   {}\n\n",
        format::inspect_str(table),
        error.kind(),
        error
    )
}

/// Render a single table with default dump options
pub fn render_table<P: MetadataProvider + ?Sized>(
    table: &str,
    provider: &P,
    catalog: &TypeCatalog,
) -> String {
    match SchemaDumper::new(provider, catalog, DumpOptions::default()) {
        Ok(dumper) => dumper.render_table(table),
        Err(e) => error_block(table, &e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::provider::{RawColumn, Snapshot, TableSnapshot};
    use pretty_assertions::assert_eq;

    fn snapshot() -> Snapshot {
        Snapshot::new()
            .table(
                "schema_migrations",
                TableSnapshot::new().column(RawColumn::new("version", "varchar(255)").not_null()),
            )
            .table(
                "tmp_import",
                TableSnapshot::new().column(RawColumn::new("id", "int(11)")),
            )
            .table(
                "users",
                TableSnapshot::new().column(RawColumn::new("id", "int(11)")),
            )
            .table(
                "accounts",
                TableSnapshot::new().column(RawColumn::new("id", "int(11)")),
            )
    }

    #[test]
    fn test_table_names_are_sorted_and_filtered() {
        let snapshot = snapshot();
        let catalog = TypeCatalog::mysql();
        let options = DumpOptions {
            ignore_tables: vec!["/^tmp_/".to_string()],
            ..DumpOptions::default()
        };
        let dumper = SchemaDumper::new(&snapshot, &catalog, options).unwrap();

        assert_eq!(dumper.table_names().unwrap(), vec!["accounts", "users"]);
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        let snapshot = snapshot();
        let catalog = TypeCatalog::mysql();
        let options = DumpOptions {
            ignore_tables: vec!["/(/".to_string()],
            ..DumpOptions::default()
        };
        assert!(SchemaDumper::new(&snapshot, &catalog, options).is_err());
    }

    #[test]
    fn test_missing_table_becomes_comment() {
        let snapshot = snapshot();
        let catalog = TypeCatalog::mysql();
        let dumper = SchemaDumper::new(&snapshot, &catalog, DumpOptions::default()).unwrap();

        assert_eq!(
            dumper.render_table("orders"),
            "# Could not dump table \"orders\" because of following MetadataError\n#   Metadata error: Table 'orders' doesn't exist\n\n"
        );
        assert!(dumper.try_render_table("orders").is_err());
    }

    #[test]
    fn test_non_numeric_version_is_quoted() {
        let snapshot = Snapshot::new();
        let catalog = TypeCatalog::mysql();
        let options = DumpOptions {
            version: Some("1) do; system(\"rm\"); (".to_string()),
            ..DumpOptions::default()
        };
        let dump = SchemaDumper::new(&snapshot, &catalog, options)
            .unwrap()
            .dump_to_string()
            .unwrap();
        assert!(dump.contains(
            "ActiveRecord::Schema.define(version: \"1) do; system(\\\"rm\\\"); (\") do\n"
        ));
    }

    #[test]
    fn test_define_line_with_version() {
        let snapshot = Snapshot::new();
        let catalog = TypeCatalog::mysql();
        let options = DumpOptions {
            version: Some("20240101120000".to_string()),
            hash_style: HashStyle::Rocket,
            ..DumpOptions::default()
        };
        let dump = SchemaDumper::new(&snapshot, &catalog, options)
            .unwrap()
            .dump_to_string()
            .unwrap();

        assert!(dump.contains("ActiveRecord::Schema.define(:version => 20240101120000) do\n"));
        assert!(dump.ends_with("end\n"));
    }
}

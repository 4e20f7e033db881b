//! Schema encoder
//!
//! This module turns declarative column, table and constraint specs into
//! MySQL DDL statements.

use crate::error::{Error, Result};
use crate::schema::catalog::TypeCatalog;
use crate::schema::dialect::{Dialect, MySqlDialect};
use crate::schema::provider::MetadataProvider;
use crate::schema::types::{
    ColumnOptions, ColumnSpec, ColumnType, ConstraintKind, ConstraintSpec, IndexSpec, Literal,
    TableSpec,
};

/// DDL generator for a dialect and a native type catalog
#[derive(Debug, Clone)]
pub struct SchemaEncoder<D: Dialect = MySqlDialect> {
    dialect: D,
    catalog: TypeCatalog,
}

impl SchemaEncoder<MySqlDialect> {
    /// Create an encoder for MySQL
    pub fn new(catalog: TypeCatalog) -> Self {
        Self::with_dialect(MySqlDialect::new(), catalog)
    }
}

impl Default for SchemaEncoder<MySqlDialect> {
    fn default() -> Self {
        Self::new(TypeCatalog::mysql())
    }
}

impl<D: Dialect> SchemaEncoder<D> {
    pub fn with_dialect(dialect: D, catalog: TypeCatalog) -> Self {
        Self { dialect, catalog }
    }

    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    pub fn catalog(&self) -> &TypeCatalog {
        &self.catalog
    }

    /// Map an abstract type to its native SQL type.
    ///
    /// `" UNSIGNED"` is appended once to integer types when `unsigned` is set
    /// and never to any other type.
    pub fn column_type_to_sql(
        &self,
        column_type: ColumnType,
        limit: Option<u32>,
        precision: Option<u32>,
        scale: Option<u32>,
        unsigned: bool,
    ) -> Result<String> {
        let mut sql = self.base_type_to_sql(column_type, limit, precision, scale)?;
        if unsigned && column_type == ColumnType::Integer {
            sql.push_str(self.dialect.unsigned_suffix());
        }
        Ok(sql)
    }

    fn base_type_to_sql(
        &self,
        column_type: ColumnType,
        limit: Option<u32>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> Result<String> {
        let native = self.catalog.defaults_for(column_type).ok_or_else(|| {
            Error::UnknownTypeError(format!("Unknown column type '{}'", column_type))
        })?;

        match column_type {
            ColumnType::PrimaryKey => Ok(native.name.clone()),
            ColumnType::Integer if native.name == "int" => {
                self.dialect.integer_to_sql(limit.or(native.limit))
            }
            ColumnType::Decimal => {
                match (precision.or(native.precision), scale.or(native.scale)) {
                    (Some(precision), Some(scale)) => {
                        Ok(format!("{}({},{})", native.name, precision, scale))
                    }
                    (Some(precision), None) => Ok(format!("{}({})", native.name, precision)),
                    (None, Some(_)) => Err(Error::TypeMappingError(
                        "Error adding decimal column: precision cannot be empty if scale is specified"
                            .to_string(),
                    )),
                    (None, None) => Ok(native.name.clone()),
                }
            }
            _ => match limit.or(native.limit) {
                Some(limit) => Ok(format!("{}({})", native.name, limit)),
                None => Ok(native.name.clone()),
            },
        }
    }

    /// Full type clause of a column. Never fails: a mapping error degrades to
    /// `integer UNSIGNED` or the bare type name.
    pub fn sql_type_for(&self, column: &ColumnSpec) -> String {
        match self.column_type_to_sql(
            column.column_type,
            column.limit,
            column.precision,
            column.scale,
            column.unsigned,
        ) {
            Ok(sql) => sql,
            Err(e) => {
                tracing::warn!(
                    column = %column.name,
                    column_type = %column.column_type,
                    error = %e,
                    "Falling back to literal column type"
                );
                if column.is_unsigned_integer() {
                    format!("integer{}", self.dialect.unsigned_suffix())
                } else {
                    column.column_type.as_str().to_string()
                }
            }
        }
    }

    /// Append `DEFAULT` and `NOT NULL` clauses
    pub fn add_column_options(&self, sql: &mut String, options: &ColumnOptions) {
        if options.includes_default() {
            if let Some(default) = &options.default {
                sql.push_str(" DEFAULT ");
                sql.push_str(&self.dialect.quote_literal(default));
            }
        }
        if options.null == Some(false) {
            sql.push_str(" NOT NULL");
        }
    }

    fn options_type_to_sql(&self, column_type: ColumnType, options: &ColumnOptions) -> Result<String> {
        self.column_type_to_sql(
            column_type,
            options.limit,
            options.precision,
            options.scale,
            options.unsigned,
        )
    }

    /// `ALTER TABLE ... ADD` statement for a new column
    pub fn add_column(
        &self,
        table: &str,
        column: &str,
        column_type: ColumnType,
        options: &ColumnOptions,
    ) -> Result<String> {
        let mut sql = format!(
            "ALTER TABLE {} ADD {} {}",
            self.dialect.quote_table_name(table),
            self.dialect.quote_ident(column),
            self.options_type_to_sql(column_type, options)?
        );
        self.add_column_options(&mut sql, options);
        Ok(sql)
    }

    /// `ALTER TABLE ... CHANGE` statement redefining a column in place.
    ///
    /// When `options` carry no default the current one is kept, which requires
    /// the column to exist in `provider`.
    pub fn change_column<P: MetadataProvider + ?Sized>(
        &self,
        provider: &P,
        table: &str,
        column: &str,
        column_type: ColumnType,
        options: &ColumnOptions,
    ) -> Result<String> {
        let mut options = options.clone();
        if !options.includes_default() {
            let current = provider
                .columns(table)?
                .into_iter()
                .find(|c| c.name == column)
                .ok_or_else(|| Error::NoSuchColumnError {
                    table: table.to_string(),
                    column: column.to_string(),
                })?;
            options.default = Some(current.default.unwrap_or(Literal::Null));
        }

        let quoted = self.dialect.quote_ident(column);
        let mut sql = format!(
            "ALTER TABLE {} CHANGE {} {} {}",
            self.dialect.quote_table_name(table),
            quoted,
            quoted,
            self.options_type_to_sql(column_type, &options)?
        );
        self.add_column_options(&mut sql, &options);
        Ok(sql)
    }

    /// Column definition as used inside `CREATE TABLE`
    pub fn column_definition(&self, column: &ColumnSpec) -> String {
        let mut options = column.options();
        // Table definitions always state the default, so nullable columns get DEFAULT NULL
        if options.default.is_none() {
            options.default = Some(Literal::Null);
        }

        let mut sql = format!(
            "{} {}",
            self.dialect.quote_ident(&column.name),
            self.sql_type_for(column)
        );
        self.add_column_options(&mut sql, &options);
        sql
    }

    /// Statements creating `table` with its indexes and constraints
    pub fn create_table(&self, table: &TableSpec) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        if table.force {
            statements.push(self.drop_table(&table.name, true));
        }

        let mut definitions = Vec::with_capacity(table.columns.len() + 1);
        if table.id {
            let primary_key = self.base_type_to_sql(ColumnType::PrimaryKey, None, None, None)?;
            definitions.push(format!(
                "{} {}",
                self.dialect.quote_ident(&table.primary_key),
                primary_key
            ));
        }
        definitions.extend(table.columns.iter().map(|c| self.column_definition(c)));

        let mut sql = format!(
            "CREATE TABLE {} ({})",
            self.dialect.quote_table_name(&table.name),
            definitions.join(", ")
        );
        if let Some(options) = table
            .options
            .as_deref()
            .or_else(|| self.dialect.default_table_options())
        {
            sql.push(' ');
            sql.push_str(options);
        }
        statements.push(sql);

        for index in &table.indexes {
            statements.push(self.add_index(&table.name, index)?);
        }
        for constraint in &table.constraints {
            statements.push(self.add_constraint(constraint)?);
        }

        Ok(statements)
    }

    pub fn drop_table(&self, table: &str, if_exists: bool) -> String {
        if if_exists {
            format!("DROP TABLE IF EXISTS {}", self.dialect.quote_table_name(table))
        } else {
            format!("DROP TABLE {}", self.dialect.quote_table_name(table))
        }
    }

    pub fn remove_column(&self, table: &str, column: &str) -> String {
        format!(
            "ALTER TABLE {} DROP {}",
            self.dialect.quote_table_name(table),
            self.dialect.quote_ident(column)
        )
    }

    pub fn add_index(&self, table: &str, index: &IndexSpec) -> Result<String> {
        if index.columns.is_empty() {
            return Err(Error::ValidationError(format!(
                "Index '{}' on '{}' has no columns",
                index.name, table
            )));
        }

        Ok(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if index.unique { "UNIQUE " } else { "" },
            self.dialect.quote_ident(&index.name),
            self.dialect.quote_table_name(table),
            self.quote_columns(&index.columns)
        ))
    }

    pub fn remove_index(&self, table: &str, index_name: &str) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.dialect.quote_ident(index_name),
            self.dialect.quote_table_name(table)
        )
    }

    /// `ALTER TABLE ... ADD CONSTRAINT` statement; the name is emitted verbatim
    pub fn add_constraint(&self, constraint: &ConstraintSpec) -> Result<String> {
        validate_constraint(constraint)?;

        let mut sql = format!(
            "ALTER TABLE {} ADD CONSTRAINT {}",
            self.dialect.quote_table_name(&constraint.table),
            self.dialect.quote_ident(&constraint.name)
        );

        match &constraint.kind {
            ConstraintKind::ForeignKey {
                columns,
                ref_table,
                ref_columns,
                on_delete,
                on_update,
            } => {
                sql.push_str(&format!(
                    " FOREIGN KEY ({}) REFERENCES {} ({})",
                    self.quote_columns(columns),
                    self.dialect.quote_table_name(ref_table),
                    self.quote_columns(ref_columns)
                ));
                if let Some(action) = on_delete {
                    sql.push_str(" ON DELETE ");
                    sql.push_str(action.as_sql());
                }
                if let Some(action) = on_update {
                    sql.push_str(" ON UPDATE ");
                    sql.push_str(action.as_sql());
                }
            }
            ConstraintKind::Check { expression } => {
                sql.push_str(&format!(" CHECK ({})", expression));
            }
        }

        Ok(sql)
    }

    /// Statement reversing [`add_constraint`](Self::add_constraint)
    pub fn drop_constraint(&self, constraint: &ConstraintSpec) -> Result<String> {
        validate_constraint(constraint)?;

        let keyword = match constraint.kind {
            ConstraintKind::ForeignKey { .. } => "FOREIGN KEY",
            ConstraintKind::Check { .. } => "CHECK",
        };
        Ok(format!(
            "ALTER TABLE {} DROP {} {}",
            self.dialect.quote_table_name(&constraint.table),
            keyword,
            self.dialect.quote_ident(&constraint.name)
        ))
    }

    fn quote_columns(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.dialect.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn validate_constraint(constraint: &ConstraintSpec) -> Result<()> {
    if constraint.name.trim().is_empty() {
        return Err(Error::ValidationError(format!(
            "Constraint on '{}' must be named",
            constraint.table
        )));
    }

    match &constraint.kind {
        ConstraintKind::ForeignKey {
            columns,
            ref_columns,
            ..
        } => {
            if columns.is_empty() || columns.len() != ref_columns.len() {
                return Err(Error::ValidationError(format!(
                    "Foreign key '{}' needs as many columns as referenced columns",
                    constraint.name
                )));
            }
        }
        ConstraintKind::Check { expression } => {
            if expression.trim().is_empty() {
                return Err(Error::ValidationError(format!(
                    "Check constraint '{}' has an empty expression",
                    constraint.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::catalog::NativeType;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn encoder() -> SchemaEncoder {
        SchemaEncoder::default()
    }

    #[rstest]
    #[case(ColumnType::String, None, None, None, "varchar(255)")]
    #[case(ColumnType::String, Some(40), None, None, "varchar(40)")]
    #[case(ColumnType::Text, None, None, None, "text")]
    #[case(ColumnType::Integer, None, None, None, "int(11)")]
    #[case(ColumnType::Integer, Some(8), None, None, "bigint")]
    #[case(ColumnType::Decimal, None, Some(8), Some(2), "decimal(8,2)")]
    #[case(ColumnType::Decimal, None, Some(10), None, "decimal(10)")]
    #[case(ColumnType::Decimal, None, None, None, "decimal")]
    #[case(ColumnType::Boolean, None, None, None, "tinyint(1)")]
    #[case(ColumnType::Timestamp, None, None, None, "datetime")]
    #[case(ColumnType::Binary, None, None, None, "blob")]
    fn test_column_type_to_sql(
        #[case] column_type: ColumnType,
        #[case] limit: Option<u32>,
        #[case] precision: Option<u32>,
        #[case] scale: Option<u32>,
        #[case] expected: &str,
    ) {
        let sql = encoder()
            .column_type_to_sql(column_type, limit, precision, scale, false)
            .unwrap();
        assert_eq!(sql, expected);
    }

    #[test]
    fn test_decimal_scale_without_precision_fails() {
        let err = encoder()
            .column_type_to_sql(ColumnType::Decimal, None, None, Some(2), false)
            .unwrap_err();
        assert_eq!(err.kind(), "TypeMappingError");
    }

    #[test]
    fn test_missing_catalog_entry_is_unknown_type() {
        let mut catalog = TypeCatalog::mysql();
        catalog.remove(ColumnType::Time);
        let err = SchemaEncoder::new(catalog)
            .column_type_to_sql(ColumnType::Time, None, None, None, false)
            .unwrap_err();
        assert_eq!(err.kind(), "UnknownTypeError");
    }

    #[test]
    fn test_overridden_integer_uses_generic_mapping() {
        let mut catalog = TypeCatalog::mysql();
        catalog.insert(ColumnType::Integer, NativeType::named("bigint"));
        let sql = SchemaEncoder::new(catalog)
            .column_type_to_sql(ColumnType::Integer, None, None, None, true)
            .unwrap();
        assert_eq!(sql, "bigint UNSIGNED");
    }

    #[test]
    fn test_add_column_options() {
        let encoder = encoder();
        let mut sql = String::from("x");
        encoder.add_column_options(&mut sql, &ColumnOptions::new().default("a").null(false));
        assert_eq!(sql, "x DEFAULT 'a' NOT NULL");

        let mut sql = String::from("x");
        encoder.add_column_options(&mut sql, &ColumnOptions::new().default_null().null(false));
        assert_eq!(sql, "x NOT NULL");
    }

    #[test]
    fn test_remove_column_and_index() {
        let encoder = encoder();
        assert_eq!(
            encoder.remove_column("products", "qty"),
            "ALTER TABLE `products` DROP `qty`"
        );
        assert_eq!(
            encoder.remove_index("products", "index_products_on_qty"),
            "DROP INDEX `index_products_on_qty` ON `products`"
        );
    }

    #[test]
    fn test_index_without_columns_is_rejected() {
        let index = IndexSpec::new("empty", &[]);
        assert!(encoder().add_index("products", &index).is_err());
    }
}

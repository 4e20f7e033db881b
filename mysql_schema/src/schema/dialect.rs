//! SQL dialect used by the encoder
//!
//! Identifier quoting, literal quoting and integer sizing differ per database.
//! MySQL is the only dialect shipped.

use crate::error::{Error, Result};
use crate::schema::types::Literal;

/// Dialect-specific SQL syntax
pub trait Dialect: Send + Sync {
    fn name(&self) -> &str;

    /// Quote a single identifier
    fn quote_ident(&self, name: &str) -> String;

    /// Quote a possibly schema-qualified table name
    fn quote_table_name(&self, name: &str) -> String {
        name.split('.')
            .map(|part| self.quote_ident(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Render a literal for use in a `DEFAULT` clause
    fn quote_literal(&self, value: &Literal) -> String;

    /// Integer type for a byte-size limit
    fn integer_to_sql(&self, limit: Option<u32>) -> Result<String>;

    /// Appended to integer types declared unsigned
    fn unsigned_suffix(&self) -> &'static str {
        " UNSIGNED"
    }

    /// Options appended to `CREATE TABLE` when the table declares none
    fn default_table_options(&self) -> Option<&'static str> {
        None
    }
}

/// MySQL/MariaDB dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    pub fn new() -> Self {
        Self
    }

    fn quote_string(value: &str) -> String {
        let mut quoted = String::with_capacity(value.len() + 2);
        quoted.push('\'');
        for c in value.chars() {
            match c {
                '\\' => quoted.push_str("\\\\"),
                '\'' => quoted.push_str("\\'"),
                '\n' => quoted.push_str("\\n"),
                '\r' => quoted.push_str("\\r"),
                '\0' => quoted.push_str("\\0"),
                '\x1a' => quoted.push_str("\\Z"),
                _ => quoted.push(c),
            }
        }
        quoted.push('\'');
        quoted
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &str {
        "mysql"
    }

    fn quote_ident(&self, name: &str) -> String {
        // Backticks inside a name are doubled
        format!("`{}`", name.replace('`', "``"))
    }

    fn quote_literal(&self, value: &Literal) -> String {
        match value {
            Literal::Null => "NULL".to_string(),
            Literal::String(s) => Self::quote_string(s),
            Literal::Integer(i) => i.to_string(),
            Literal::Decimal(d) => d.clone(),
            Literal::Float(f) => f.to_string(),
            Literal::Boolean(true) => "1".to_string(),
            Literal::Boolean(false) => "0".to_string(),
            Literal::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
            Literal::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
            Literal::Time(t) => format!("'{}'", t.format("%H:%M:%S")),
        }
    }

    fn integer_to_sql(&self, limit: Option<u32>) -> Result<String> {
        match limit {
            Some(1) => Ok("tinyint".to_string()),
            Some(2) => Ok("smallint".to_string()),
            Some(3) => Ok("mediumint".to_string()),
            None | Some(4) | Some(11) => Ok("int(11)".to_string()),
            Some(5..=8) => Ok("bigint".to_string()),
            Some(other) => Err(Error::TypeMappingError(format!(
                "No integer type has byte size {}",
                other
            ))),
        }
    }

    fn default_table_options(&self) -> Option<&'static str> {
        Some("ENGINE=InnoDB")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    #[test]
    fn test_quote_ident() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.quote_ident("name"), "`name`");
        assert_eq!(dialect.quote_ident("table`name"), "`table``name`");
        assert_eq!(dialect.quote_table_name("shop.orders"), "`shop`.`orders`");
    }

    #[test]
    fn test_quote_literal() {
        let dialect = MySqlDialect::new();
        assert_eq!(dialect.quote_literal(&Literal::Null), "NULL");
        assert_eq!(dialect.quote_literal(&Literal::from("it's")), "'it\\'s'");
        assert_eq!(dialect.quote_literal(&Literal::from("a\\b")), "'a\\\\b'");
        assert_eq!(dialect.quote_literal(&Literal::Integer(-3)), "-3");
        assert_eq!(dialect.quote_literal(&Literal::Decimal("9.99".into())), "9.99");
        assert_eq!(dialect.quote_literal(&Literal::Boolean(true)), "1");
        assert_eq!(
            dialect.quote_literal(&Literal::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())),
            "'2024-02-29'"
        );
    }

    #[rstest]
    #[case(None, "int(11)")]
    #[case(Some(1), "tinyint")]
    #[case(Some(2), "smallint")]
    #[case(Some(3), "mediumint")]
    #[case(Some(4), "int(11)")]
    #[case(Some(11), "int(11)")]
    #[case(Some(8), "bigint")]
    fn test_integer_to_sql(#[case] limit: Option<u32>, #[case] expected: &str) {
        assert_eq!(MySqlDialect::new().integer_to_sql(limit).unwrap(), expected);
    }

    #[test]
    fn test_integer_to_sql_rejects_unknown_sizes() {
        let err = MySqlDialect::new().integer_to_sql(Some(10)).unwrap_err();
        assert_eq!(err.kind(), "TypeMappingError");
    }
}

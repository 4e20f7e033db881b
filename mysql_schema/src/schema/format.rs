//! Dump formatting
//!
//! Renders decoded table specs as `create_table` blocks whose attribute
//! columns line up vertically, plus the `add_index`, `add_foreign_key` and
//! `add_check_constraint` lines that follow them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::schema::catalog::TypeCatalog;
use crate::schema::types::{ColumnSpec, ColumnType, ConstraintKind, ConstraintSpec, IndexSpec, Literal, TableSpec};

/// Column attribute keys in the order they are printed
const ATTRIBUTE_KEYS: [&str; 7] = ["name", "limit", "precision", "scale", "default", "null", "unsigned"];

/// Syntax for attribute pairs in a dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashStyle {
    /// `limit: 10`
    #[default]
    Keyword,
    /// `:limit => 10`
    Rocket,
}

impl HashStyle {
    pub fn pair(&self, key: &str, value: &str) -> String {
        match self {
            HashStyle::Keyword => format!("{}: {}", key, value),
            HashStyle::Rocket => format!(":{} => {}", key, value),
        }
    }
}

/// Double-quoted string literal with Ruby escaping
pub fn inspect_str(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '#' if matches!(chars.peek(), Some('{') | Some('$') | Some('@')) => out.push_str("\\#"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn inspect_list(values: &[String]) -> String {
    let items: Vec<String> = values.iter().map(|v| inspect_str(v)).collect();
    format!("[{}]", items.join(", "))
}

fn inspect_option(value: Option<u32>) -> String {
    value.map_or_else(|| "nil".to_string(), |v| v.to_string())
}

fn inspect_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Render a default value for a dump
pub fn default_string(value: &Literal) -> String {
    match value {
        Literal::Null => "nil".to_string(),
        Literal::String(s) => inspect_str(s),
        Literal::Integer(i) => i.to_string(),
        Literal::Decimal(d) => d.clone(),
        Literal::Float(f) => inspect_float(*f),
        Literal::Boolean(b) => b.to_string(),
        Literal::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        Literal::DateTime(dt) => format!("'{}'", dt.format("%Y-%m-%d %H:%M:%S")),
        Literal::Time(t) => format!("'{}'", t.format("%H:%M:%S")),
    }
}

/// Printed attributes of one column; the limit only when it differs from the
/// catalog default
struct ColumnAttributes {
    column_type: &'static str,
    values: HashMap<&'static str, String>,
}

fn column_attributes(column: &ColumnSpec, catalog: &TypeCatalog, style: HashStyle) -> ColumnAttributes {
    let defaults = catalog.defaults_for(column.column_type);
    let default_limit = defaults.and_then(|d| d.limit);

    let mut values = HashMap::new();
    values.insert("name", inspect_str(&column.name));

    if column.limit != default_limit && column.column_type != ColumnType::Decimal {
        values.insert("limit", inspect_option(column.limit));
    }
    if column.precision.is_some() {
        values.insert("precision", inspect_option(column.precision));
    }
    if column.scale.is_some() {
        values.insert("scale", inspect_option(column.scale));
    }
    if let Some(default) = column.default.as_ref().filter(|d| !d.is_null()) {
        values.insert("default", default_string(default));
    }
    if !column.nullable {
        values.insert("null", "false".to_string());
    }
    if column.is_unsigned_integer() {
        values.insert("unsigned", "true".to_string());
    }

    for (key, value) in values.iter_mut() {
        if *key != "name" {
            let rendered = style.pair(key, value.as_str());
            *value = rendered;
        }
    }

    ColumnAttributes {
        column_type: column.column_type.as_str(),
        values,
    }
}

/// One `t.<type>` line per column, aligned on every attribute
pub fn column_lines(columns: &[ColumnSpec], catalog: &TypeCatalog, style: HashStyle) -> Vec<String> {
    let specs: Vec<ColumnAttributes> = columns
        .iter()
        .map(|c| column_attributes(c, catalog, style))
        .collect();

    let keys: Vec<&str> = ATTRIBUTE_KEYS
        .iter()
        .copied()
        .filter(|key| specs.iter().any(|s| s.values.contains_key(key)))
        .collect();
    let widths: Vec<usize> = keys
        .iter()
        .map(|key| {
            specs
                .iter()
                .map(|s| s.values.get(key).map_or(0, |v| v.chars().count() + 2))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let type_width = specs.iter().map(|s| s.column_type.len()).max().unwrap_or(0);

    specs
        .iter()
        .map(|spec| {
            let mut line = format!("    t.{:<width$} ", spec.column_type, width = type_width);
            for (key, width) in keys.iter().zip(&widths) {
                match spec.values.get(key) {
                    Some(value) => {
                        let cell = format!("{}, ", value);
                        line.push_str(&format!("{:<width$}", cell, width = *width));
                    }
                    None => line.push_str(&" ".repeat(*width)),
                }
            }
            strip_trailing_separator(&line)
        })
        .collect()
}

fn strip_trailing_separator(line: &str) -> String {
    let trimmed = line.trim_end();
    trimmed.strip_suffix(',').unwrap_or(trimmed).to_string()
}

/// `create_table "t", ... do |t|`
pub fn table_header(table: &TableSpec, style: HashStyle) -> String {
    let mut header = format!("  create_table {}", inspect_str(&table.name));
    if table.id {
        if table.primary_key != "id" {
            header.push_str(", ");
            header.push_str(&style.pair("primary_key", &inspect_str(&table.primary_key)));
        }
    } else {
        header.push_str(", ");
        header.push_str(&style.pair("id", "false"));
    }
    header.push_str(", ");
    header.push_str(&style.pair("force", "true"));
    header.push_str(" do |t|");
    header
}

/// The `create_table` block of a table followed by a blank line
pub fn format_table(table: &TableSpec, catalog: &TypeCatalog, style: HashStyle) -> String {
    let mut out = table_header(table, style);
    out.push('\n');
    for line in column_lines(&table.columns, catalog, style) {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str("  end\n\n");
    out
}

pub fn index_line(table: &str, index: &IndexSpec, style: HashStyle) -> String {
    let mut parts = vec![
        format!("add_index {}", inspect_str(table)),
        inspect_list(&index.columns),
        style.pair("name", &inspect_str(&index.name)),
    ];
    if index.unique {
        parts.push(style.pair("unique", "true"));
    }
    format!("  {}", parts.join(", "))
}

/// Sorted `add_index` lines followed by a blank line, or nothing
pub fn format_indexes(table: &str, indexes: &[IndexSpec], style: HashStyle) -> String {
    let mut lines: Vec<String> = indexes.iter().map(|i| index_line(table, i, style)).collect();
    format_block(&mut lines)
}

fn columns_value(columns: &[String]) -> String {
    match columns {
        [single] => inspect_str(single),
        _ => inspect_list(columns),
    }
}

pub fn constraint_line(constraint: &ConstraintSpec, style: HashStyle) -> String {
    match &constraint.kind {
        ConstraintKind::ForeignKey {
            columns,
            ref_table,
            ref_columns,
            on_delete,
            on_update,
        } => {
            let mut parts = vec![
                format!("add_foreign_key {}", inspect_str(&constraint.table)),
                inspect_str(ref_table),
                style.pair("column", &columns_value(columns)),
                style.pair("primary_key", &columns_value(ref_columns)),
                style.pair("name", &inspect_str(&constraint.name)),
            ];
            if let Some(action) = on_delete {
                parts.push(style.pair("on_delete", &format!(":{}", action.as_str())));
            }
            if let Some(action) = on_update {
                parts.push(style.pair("on_update", &format!(":{}", action.as_str())));
            }
            format!("  {}", parts.join(", "))
        }
        ConstraintKind::Check { expression } => format!(
            "  add_check_constraint {}, {}, {}",
            inspect_str(&constraint.table),
            inspect_str(expression),
            style.pair("name", &inspect_str(&constraint.name))
        ),
    }
}

/// Sorted constraint lines followed by a blank line, or nothing
pub fn format_constraints<'a, I>(constraints: I, style: HashStyle) -> String
where
    I: IntoIterator<Item = &'a ConstraintSpec>,
{
    let mut lines: Vec<String> = constraints
        .into_iter()
        .map(|c| constraint_line(c, style))
        .collect();
    format_block(&mut lines)
}

fn format_block(lines: &mut [String]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    lines.sort();
    format!("{}\n\n", lines.join("\n"))
}

//! Naming utilities for constraints and indexes
//!
//! This module derives conventional names for foreign keys and indexes and keeps
//! generated identifiers within MySQL's limits.

use inflector::Inflector;

/// Pattern used for foreign key names when none is configured
pub const DEFAULT_FOREIGN_KEY_PATTERN: &str = "fk_{table}_{column}";

/// Pattern used for index names when none is configured
pub const DEFAULT_INDEX_PATTERN: &str = "index_{table}_on_{columns}";

/// MySQL rejects identifiers longer than this
pub const MYSQL_MAX_IDENTIFIER_LENGTH: usize = 64;

/// Format a name according to a pattern with placeholders
pub fn format_name(pattern: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = pattern.to_string();

    for (placeholder, value) in replacements {
        result = result.replace(&format!("{{{}}}", placeholder), value);
    }

    result
}

/// Get index name from table and columns according to pattern
pub fn get_index_name(pattern: &str, table_name: &str, columns: &[String]) -> String {
    let columns_str = columns.join("_and_");

    format_name(pattern, &[("table", table_name), ("columns", &columns_str)])
}

/// Get foreign key constraint name according to pattern
pub fn get_foreign_key_name(pattern: &str, table_name: &str, column_name: &str) -> String {
    format_name(pattern, &[("table", table_name), ("column", column_name)])
}

/// Conventional referencing column for a foreign key to `ref_table`
pub fn foreign_key_column(ref_table: &str) -> String {
    format!("{}_id", singularize(&ref_table.to_snake_case()))
}

/// Convert a plural table name to singular
pub fn singularize(name: &str) -> String {
    // Handle special cases first
    match name.to_lowercase().as_str() {
        "people" => "person".to_string(),
        "children" => "child".to_string(),
        "men" => "man".to_string(),
        "women" => "woman".to_string(),
        "feet" => "foot".to_string(),
        "teeth" => "tooth".to_string(),
        "geese" => "goose".to_string(),
        "mice" => "mouse".to_string(),
        _ => name.to_singular(),
    }
}

/// Truncate an identifier to fit database limits.
///
/// Truncated names keep a prefix of the original and end in eight hex digits of
/// its md5 so that distinct long names stay distinct.
pub fn truncate_identifier(name: &str, max_length: usize) -> String {
    if name.len() <= max_length || max_length <= 9 {
        return name.to_string();
    }

    // Room for the underscore and the hash
    let mut keep_length = max_length - 9;
    while !name.is_char_boundary(keep_length) {
        keep_length -= 1;
    }

    let hash = format!("{:x}", md5::compute(name.as_bytes()));

    format!("{}_{}", &name[..keep_length], &hash[0..8])
}

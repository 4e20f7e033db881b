//! Configuration handling for mysql_schema

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

use crate::error::{Error, Result};
use crate::schema::catalog::NativeType;
use crate::schema::format::HashStyle;
use crate::utils::naming;

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    config.validate()?;
    Ok(config)
}

/// Represents the complete mysql_schema configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Absent when dumps are produced from snapshot files only
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub types: TypesConfig,
    #[serde(default)]
    pub dump: DumpConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub ddl: DdlConfig,
    pub logging: Option<LoggingConfig>,
}

impl Config {
    /// Check settings that serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        for type_name in self.types.overrides.keys() {
            type_name
                .parse::<crate::schema::types::ColumnType>()
                .map_err(|e| Error::ValidationError(format!("[types.overrides] {}", e)))?;
        }

        for pattern in &self.dump.ignore_tables {
            if let Some(source) = regex_source(pattern) {
                Regex::new(source).map_err(|e| {
                    Error::ValidationError(format!("Invalid ignore_tables pattern '{}': {}", pattern, e))
                })?;
            }
        }

        if !self.naming.foreign_key_pattern.contains("{table}")
            && !self.naming.foreign_key_pattern.contains("{column}")
        {
            return Err(Error::ValidationError(format!(
                "Foreign key pattern '{}' has no placeholder",
                self.naming.foreign_key_pattern
            )));
        }

        if let Some(database) = &self.database {
            if !database.url.starts_with("mysql://") && !database.url.starts_with("mariadb://") {
                return Err(Error::ValidationError(format!(
                    "Unsupported database url: {}",
                    database.url
                )));
            }
        }

        Ok(())
    }
}

/// Strip the slashes of a `/regex/` ignore entry
pub(crate) fn regex_source(pattern: &str) -> Option<&str> {
    if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        Some(&pattern[1..pattern.len() - 1])
    } else {
        None
    }
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub schema: Option<String>,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Native type settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TypesConfig {
    /// Use `int(10) UNSIGNED` for implicit primary keys. Only for new databases.
    #[serde(default)]
    pub unsigned_primary_key: bool,
    /// Read `tinyint(1)` columns back as booleans
    #[serde(default = "default_true")]
    pub emulate_booleans: bool,
    #[serde(default)]
    pub overrides: HashMap<String, NativeType>,
}

impl Default for TypesConfig {
    fn default() -> Self {
        Self {
            unsigned_primary_key: false,
            emulate_booleans: true,
            overrides: HashMap::new(),
        }
    }
}

/// Schema dump settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DumpConfig {
    /// Table names, or `/regex/` patterns, left out of dumps
    #[serde(default)]
    pub ignore_tables: Vec<String>,
    #[serde(default)]
    pub hash_style: HashStyle,
    #[serde(default = "default_true")]
    pub include_indexes: bool,
    #[serde(default = "default_true")]
    pub include_constraints: bool,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            ignore_tables: Vec::new(),
            hash_style: HashStyle::default(),
            include_indexes: true,
            include_constraints: true,
        }
    }
}

/// Naming conventions configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NamingConfig {
    #[serde(default = "default_foreign_key_pattern")]
    pub foreign_key_pattern: String,
    #[serde(default = "default_index_pattern")]
    pub index_pattern: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            foreign_key_pattern: default_foreign_key_pattern(),
            index_pattern: default_index_pattern(),
        }
    }
}

/// DDL execution settings
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DdlConfig {
    /// Log statements instead of executing them
    #[serde(default)]
    pub dry_run: bool,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
    pub stdout: bool,
}

fn default_true() -> bool {
    true
}

fn default_foreign_key_pattern() -> String {
    naming::DEFAULT_FOREIGN_KEY_PATTERN.to_string()
}

fn default_index_pattern() -> String {
    naming::DEFAULT_INDEX_PATTERN.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(config.database.is_none());
        assert!(config.types.emulate_booleans);
        assert!(!config.types.unsigned_primary_key);
        assert!(config.dump.include_indexes);
        assert_eq!(config.dump.hash_style, HashStyle::Keyword);
        assert_eq!(config.naming.foreign_key_pattern, "fk_{table}_{column}");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_regex_source() {
        assert_eq!(regex_source("/^tmp_/"), Some("^tmp_"));
        assert_eq!(regex_source("sessions"), None);
        assert_eq!(regex_source("/"), None);
    }

    #[test]
    fn test_validate_rejects_bad_ignore_pattern() {
        let mut config = Config::default();
        config.dump.ignore_tables = vec!["/([a-z/".to_string()];
        assert!(matches!(config.validate(), Err(Error::ValidationError(_))));
    }

    #[test]
    fn test_validate_rejects_non_mysql_url() {
        let mut config = Config::default();
        config.database = Some(DatabaseConfig {
            url: "postgres://localhost/app".to_string(),
            schema: None,
            pool_size: None,
            timeout_seconds: None,
        });
        assert!(config.validate().is_err());
    }
}

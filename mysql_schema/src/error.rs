//! Error types for mysql_schema

use thiserror::Error;

/// Result type for mysql_schema operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for mysql_schema
#[derive(Error, Debug)]
pub enum Error {
    /// A column or abstract type has no entry in the type catalog
    #[error("{0}")]
    UnknownTypeError(String),

    #[error("No such column: {table}.{column}")]
    NoSuchColumnError { table: String, column: String },

    /// Raised by the DDL executor when the database rejects a statement
    #[error("DDL execution error: {0}")]
    DdlExecutionError(#[from] sqlx::Error),

    #[error("Type mapping error: {0}")]
    TypeMappingError(String),

    #[error("Metadata error: {0}")]
    MetadataError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl Error {
    /// Name of the error class, as printed in dump comments
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnknownTypeError(_) => "UnknownTypeError",
            Error::NoSuchColumnError { .. } => "NoSuchColumnError",
            Error::DdlExecutionError(_) => "DdlExecutionError",
            Error::TypeMappingError(_) => "TypeMappingError",
            Error::MetadataError(_) => "MetadataError",
            Error::ConnectionError(_) => "ConnectionError",
            Error::ConfigError(_) => "ConfigError",
            Error::ValidationError(_) => "ValidationError",
            Error::IoError(_) => "IoError",
            Error::SerializationError(_) => "SerializationError",
            Error::Unknown(_) => "Unknown",
        }
    }

    /// Build the error reported for a column whose SQL type cannot be mapped
    pub fn unknown_column_type(sql_type: &str, column: &str) -> Self {
        Error::UnknownTypeError(format!(
            "Unknown type '{}' for column '{}'",
            sql_type, column
        ))
    }
}

/// Convert Serde JSON errors to mysql_schema errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to mysql_schema errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        assert_eq!(
            Error::unknown_column_type("geometry", "shape").kind(),
            "UnknownTypeError"
        );
        let err = Error::NoSuchColumnError {
            table: "products".to_string(),
            column: "qty".to_string(),
        };
        assert_eq!(err.kind(), "NoSuchColumnError");
        assert_eq!(err.to_string(), "No such column: products.qty");
    }

    #[test]
    fn test_unknown_column_type_message() {
        let err = Error::unknown_column_type("geometry", "shape");
        assert_eq!(err.to_string(), "Unknown type 'geometry' for column 'shape'");
    }
}

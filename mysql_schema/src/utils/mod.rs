//! Utilities for mysql_schema
//!
//! This module provides utility functions used across the library.

pub mod logging;
pub mod naming;

// Re-export key utility functions
pub use logging::{init_default_logging, init_logging};
pub use naming::{
    foreign_key_column, format_name, get_foreign_key_name, get_index_name, truncate_identifier,
};

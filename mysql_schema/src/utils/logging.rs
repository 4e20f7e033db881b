//! Logging utilities for mysql_schema
//!
//! This module provides logging setup and configuration. Logs go to stderr
//! unless a file or stdout is configured, so dumps written to stdout stay clean.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn env_filter(level: Level) -> Result<EnvFilter> {
    let directive = format!("mysql_schema={}", level)
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log directive: {}", e)))?;
    Ok(EnvFilter::from_default_env().add_directive(directive))
}

fn install<S>(subscriber: S) -> Result<()>
where
    S: tracing::Subscriber + Send + Sync + 'static,
{
    tracing::subscriber::set_global_default(subscriber).map_err(|e| Error::Unknown(e.to_string()))
}

/// Initialize logging based on configuration
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let config = match config {
        Some(cfg) => cfg,
        None => return init_default_logging(Level::WARN),
    };

    let filter = env_filter(parse_level(&config.level))?;
    let json = config.format.eq_ignore_ascii_case("json");

    if let Some(file_path) = &config.file {
        if let Some(parent) = Path::new(file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = Mutex::new(File::create(file_path)?);

        if json {
            install(
                fmt::Subscriber::builder()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(file)
                    .finish(),
            )
        } else {
            install(
                fmt::Subscriber::builder()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(file)
                    .finish(),
            )
        }
    } else if config.stdout {
        if json {
            install(
                fmt::Subscriber::builder()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(std::io::stdout)
                    .finish(),
            )
        } else {
            install(
                fmt::Subscriber::builder()
                    .with_env_filter(filter)
                    .with_writer(std::io::stdout)
                    .finish(),
            )
        }
    } else if json {
        install(
            fmt::Subscriber::builder()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        )
    } else {
        install(
            fmt::Subscriber::builder()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .finish(),
        )
    }
}

/// Plain text logging to stderr at `level`
pub fn init_default_logging(level: Level) -> Result<()> {
    install(
        fmt::Subscriber::builder()
            .with_env_filter(env_filter(level)?)
            .with_writer(std::io::stderr)
            .finish(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warn"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_env_filter_accepts_every_level() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(env_filter(parse_level(level)).is_ok());
        }
    }
}

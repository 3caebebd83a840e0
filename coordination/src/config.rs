//! Shared configuration plumbing: the error type and TOML file loading.

use std::path::Path;

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Configuration errors, raised synchronously before any model call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} out of range: {value} (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn out_of_range(
        field: &'static str,
        value: impl std::fmt::Display,
        expected: &'static str,
    ) -> Self {
        Self::OutOfRange {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

/// Parse a TOML document into a config struct.
pub fn from_toml_str<T: DeserializeOwned>(raw: &str) -> Result<T, ConfigError> {
    Ok(toml::from_str(raw)?)
}

/// Read and parse a TOML config file.
pub fn load_toml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    from_toml_str(&raw)
}

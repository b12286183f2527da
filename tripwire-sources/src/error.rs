//! Errors raised while building sources and loading configuration files

use std::path::PathBuf;

use thiserror::Error;
use tripwire_core::ConfigurationError;

/// Source construction and configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Extension is not one of `.json`, `.yaml`, `.yml`
    #[error("unsupported configuration format: {0:?}")]
    UnsupportedFormat(PathBuf),

    /// Replay data line is not a number
    #[error("line {line}: cannot parse {content:?} as a number")]
    Parse { line: usize, content: String },

    /// Source parameters are inconsistent
    #[error("{0}")]
    Invalid(String),

    /// Rejected by the core engine (bad name, duplicate, bad runtime settings)
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

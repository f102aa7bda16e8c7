//! Error types for footprint estimation
//!
//! Carbon intensity lookups never surface errors to callers (see
//! [`crate::carbon_aware::IntensityError`]); everything here is fatal for the
//! operation that raised it.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A job references a partition the cluster capability table does not define
    #[error("Configuration error: partition '{0}' not found in cluster capability table")]
    MissingPartition(String),

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client could not be constructed
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

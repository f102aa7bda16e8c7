//! Error types for carbon intensity lookups
//!
//! These never escape [`super::CarbonIntensityResolver::resolve`]; they exist
//! so each failure can be reported with its cause before the fallback is used.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IntensityError {
    /// Submission time could not be interpreted as a UTC instant
    #[error("cannot convert '{input}' to UTC: {reason}")]
    TimestampNormalization { input: String, reason: String },

    /// Connection failure, timeout, or non-success HTTP status
    #[error("HTTP request failed: {0}")]
    ProviderTransport(#[from] reqwest::Error),

    /// Response body was not the expected JSON shape
    #[error("unexpected provider response: {0}")]
    ProviderResponseFormat(String),
}

impl From<serde_json::Error> for IntensityError {
    fn from(e: serde_json::Error) -> Self {
        Self::ProviderResponseFormat(e.to_string())
    }
}

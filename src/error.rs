//! Error types for the enrichment engine
//!
//! Transport failures are swallowed inside the query executor (partial
//! results are kept); everything else surfaces through [`EnrichError`].

use std::sync::Arc;

use thiserror::Error;

/// Main error type for enrichment
#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Malformed NetBox payload: {message}")]
    MalformedPayload { message: String },

    /// A failed cache fill, shared by every caller that waited on it
    #[error("Lookup failed: {0}")]
    Lookup(Arc<EnrichError>),
}

impl EnrichError {
    pub fn malformed(message: impl Into<String>) -> Self {
        EnrichError::MalformedPayload {
            message: message.into(),
        }
    }
}

impl From<Arc<EnrichError>> for EnrichError {
    fn from(error: Arc<EnrichError>) -> Self {
        EnrichError::Lookup(error)
    }
}

/// Invalid option values
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{option} must be greater than zero")]
    ZeroBound { option: &'static str },

    #[error("cache_ttl of {seconds}s exceeds the maximum of {max}s")]
    TtlTooLong { seconds: u64, max: u64 },

    #[error("Invalid netbox_url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid field reference '{0}'")]
    InvalidFieldPath(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the NetBox API
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("NetBox API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

pub type Result<T> = std::result::Result<T, EnrichError>;

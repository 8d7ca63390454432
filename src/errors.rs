use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Mimir API operations
pub type Result<T> = std::result::Result<T, MimirError>;

/// Errors that can occur when interacting with the Mimir Alertmanager API
#[derive(Debug, Error)]
pub enum MimirError {
    /// Failed to build HTTP client
    #[error("Failed to build HTTP client: {0}")]
    BuildHttpClient(#[source] reqwest::Error),

    /// The configured address is not a valid URL
    #[error("Invalid Mimir address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    /// Failed to read TLS material from disk
    #[error("Failed to read TLS file {}: {source}", .path.display())]
    ReadTlsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TLS material could not be parsed
    #[error("Invalid TLS material in {}: {source}", .path.display())]
    Tls {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    /// Only one half of the client certificate/key pair was configured
    #[error("Both tls_cert_path and tls_key_path must be set to use a client certificate")]
    IncompleteTlsIdentity,

    /// TLS settings were given but the crate was built without a TLS backend
    #[error("TLS settings require the `native-tls` or `rustls-tls` feature")]
    TlsUnsupported,

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest_middleware::Error),

    /// Failed to serialize the configuration payload
    #[error("Failed to serialize Alertmanager configuration: {0}")]
    Serialize(#[source] serde_yaml::Error),

    /// Failed to parse the configuration returned by Mimir
    #[error("Failed to parse Alertmanager configuration: {0}")]
    Deserialize(#[source] serde_yaml::Error),

    /// No Alertmanager configuration exists for the tenant. Only returned when
    /// fetching; a 404 elsewhere is an [`MimirError::Api`] error.
    #[error("Alertmanager configuration not found")]
    NotFound,

    /// Mimir returned an error response
    #[error("Mimir API error: HTTP {status} - {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from Mimir
        message: String,
    },

    /// The host cancelled the call before it completed
    #[error("Request cancelled")]
    Cancelled,
}

impl MimirError {
    /// Check if the backend reported that no configuration exists
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

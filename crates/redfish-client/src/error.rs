//! Redfish client errors

use thiserror::Error;

/// Errors that can occur when talking to a BMC
#[derive(Debug, Error)]
pub enum RedfishError {
    /// Transport failure (timeout, connection refused, TLS)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// BMC answered with status >= 400
    #[error("BMC communications failure HTTP {status} from {url} - {body}")]
    Api { url: String, status: u16, body: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No known password opens a session, or no account matches
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A field the BMC is expected to report is missing
    #[error("Missing field {field} in response from {path}")]
    MissingField { path: String, field: String },

    /// The BMC does not support what we need
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Invalid caller input (IP address, master key, hostname)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The BMC reported data the chassis model rejects
    #[error(transparent)]
    Chassis(#[from] chassis::ChassisError),
}

impl RedfishError {
    /// True when the BMC rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. })
    }
}

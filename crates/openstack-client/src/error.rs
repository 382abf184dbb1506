//! OpenStack client errors

use thiserror::Error;

/// Errors that can occur when talking to Keystone or Ironic
#[derive(Debug, Error)]
pub enum OpenStackError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an unexpected status
    #[error("OpenStack API error: {0}")]
    Api(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource already exists or is locked by another operation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// clouds.yaml missing, unreadable or without the requested cloud
    #[error("Configuration error: {0}")]
    Config(String),

    /// Keystone rejected the credentials or the token
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The service catalog has no usable endpoint for a service type
    #[error("No {interface} endpoint for service type {service_type}")]
    EndpointNotFound { service_type: String, interface: String },
}

impl OpenStackError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

//! Nautobot client errors

use thiserror::Error;

/// Errors that can occur when interacting with the Nautobot API
#[derive(Debug, Error)]
pub enum NautobotError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Nautobot API returned an error
    #[error("Nautobot API error: {0}")]
    Api(String),

    /// Nautobot rejected the request with HTTP 400
    #[error("{method} {path} rejected: 400 Bad Request - {body}")]
    BadRequest { method: String, path: String, body: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Authentication failed (invalid token, expired, etc.)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// GraphQL query returned errors or no data
    #[error("GraphQL query failed: {0}")]
    GraphQL(String),
}

impl NautobotError {
    /// A create lost a race against another writer of the same object.
    ///
    /// Nautobot reports these as a 400 naming a unique constraint.
    pub fn is_idempotence_collision(&self) -> bool {
        match self {
            Self::BadRequest { body, .. } => {
                let body = body.to_lowercase();
                body.contains("unique set") || body.contains("already exists")
            }
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bad_request(body: &str) -> NautobotError {
        NautobotError::BadRequest {
            method: "POST".to_string(),
            path: "/api/dcim/interfaces/".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_idempotence_collision() {
        assert!(bad_request(r#"{"non_field_errors":["The fields device, name must make a unique set."]}"#).is_idempotence_collision());
        assert!(bad_request(r#"{"id":["interface with this Id already exists."]}"#).is_idempotence_collision());
        assert!(bad_request(r#"{"name":["namespace with this name Already Exists."]}"#).is_idempotence_collision());
        assert!(!bad_request(r#"{"type":["not a valid choice"]}"#).is_idempotence_collision());
        assert!(!NautobotError::Api("already exists".to_string()).is_idempotence_collision());
    }
}

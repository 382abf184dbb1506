//! BmcTrait for mocking
//!
//! Everything above raw HTTP (discovery, credentials, settings, power) is
//! written against this trait so it can run against recorded fixtures.

use crate::error::RedfishError;
use serde_json::Value;
use std::fmt;

/// HTTP methods used against Redfish
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open Redfish session
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Value for the `X-Auth-Token` header
    pub token: String,
    /// Path of the session resource, used to close it
    pub location: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Trait for low-level Redfish access to one BMC
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait BmcTrait: Send + Sync {
    /// BMC IPv4 address
    fn ip_address(&self) -> &str;

    /// Account used for basic auth and password rotation
    fn username(&self) -> &str;

    /// Password used for basic auth
    fn password(&self) -> &str;

    /// Request `path` with basic auth.
    ///
    /// Returns `{}` for an empty 2xx body.
    async fn redfish_request(&self, method: Method, path: &str, payload: Option<&Value>) -> Result<Value, RedfishError>;

    /// Request `path` authenticated by an open session.
    async fn session_request(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, RedfishError>;

    /// Opens a session with `password`; `None` when the BMC rejects it.
    async fn open_session(&self, password: &str) -> Result<Option<Session>, RedfishError>;

    async fn close_session(&self, session: &Session) -> Result<(), RedfishError>;

    async fn get(&self, path: &str) -> Result<Value, RedfishError> {
        self.redfish_request(Method::Get, path, None).await
    }

    async fn patch(&self, path: &str, payload: &Value) -> Result<Value, RedfishError> {
        self.redfish_request(Method::Patch, path, Some(payload)).await
    }

    async fn post(&self, path: &str, payload: &Value) -> Result<Value, RedfishError> {
        self.redfish_request(Method::Post, path, Some(payload)).await
    }
}

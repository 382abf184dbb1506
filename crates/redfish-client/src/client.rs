//! Redfish HTTP client
//!
//! One [`Bmc`] talks to one BMC. Certificates are not verified: BMCs ship
//! with self-signed certificates.

use crate::bmc_trait::{BmcTrait, Method, Session};
use crate::error::RedfishError;
use crate::password::standard_password;
use crate::power::ComputerSystem;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Default account on Dell iDRACs
pub const DEFAULT_USERNAME: &str = "root";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const SESSIONS_PATH: &str = "/redfish/v1/SessionService/Sessions";

enum Auth<'a> {
    Basic,
    Token(&'a str),
    None,
}

/// Redfish client for a single BMC
pub struct Bmc {
    client: Client,
    ip_address: String,
    base_url: String,
    username: String,
    password: String,
}

impl Bmc {
    /// Create a client for `https://<ip_address>`
    pub fn new(ip_address: &str, username: &str, password: &str) -> Result<Self, RedfishError> {
        Self::with_base_url(&format!("https://{ip_address}"), ip_address, username, password)
    }

    /// Create a client against an explicit base URL (e.g. a local test server)
    pub fn with_base_url(
        base_url: &str,
        ip_address: &str,
        username: &str,
        password: &str,
    ) -> Result<Self, RedfishError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            ip_address: ip_address.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    /// Client for the `root` account using the standard password derived
    /// from `master_key`.
    pub fn for_ip_address(ip_address: &str, master_key: &str) -> Result<Self, RedfishError> {
        let password = standard_password(ip_address, master_key)?;
        Self::new(ip_address, DEFAULT_USERNAME, &password)
    }

    /// Get the base URL
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Higher-level handle for power actions on the system.
    pub fn sushy(&self) -> ComputerSystem<'_> {
        ComputerSystem::new(self)
    }

    fn request(&self, method: Method, path: &str, payload: Option<&Value>, auth: Auth<'_>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let builder = match method {
            Method::Get => self.client.get(&url),
            Method::Post => self.client.post(&url),
            Method::Patch => self.client.patch(&url),
            Method::Delete => self.client.delete(&url),
        };
        let builder = builder
            .header("Accept", "application/json")
            .header("Content-Type", "application/json; charset=utf-8");
        let builder = match auth {
            Auth::Basic => builder.basic_auth(&self.username, Some(&self.password)),
            Auth::Token(token) => builder.header("X-Auth-Token", token),
            Auth::None => builder,
        };
        match payload {
            Some(body) => builder.json(body),
            None => builder,
        }
    }

    async fn check(&self, path: &str, response: Response) -> Result<Response, RedfishError> {
        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(RedfishError::Api {
                url: format!("{}{}", self.base_url, path),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn json_body(response: Response) -> Result<Value, RedfishError> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }
        Ok(serde_json::from_str(&text)?)
    }

    // Location may be absolute (https://<bmc>/redfish/...) or a bare path.
    fn session_location(&self, location: &str) -> String {
        match reqwest::Url::parse(location) {
            Ok(url) => url.path().to_string(),
            Err(_) => location.to_string(),
        }
    }
}

impl fmt::Display for Bmc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BMC {}", self.base_url)
    }
}

impl fmt::Debug for Bmc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bmc")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl BmcTrait for Bmc {
    fn ip_address(&self) -> &str {
        &self.ip_address
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        &self.password
    }

    async fn redfish_request(&self, method: Method, path: &str, payload: Option<&Value>) -> Result<Value, RedfishError> {
        let response = self.request(method, path, payload, Auth::Basic).send().await?;
        let response = self.check(path, response).await?;
        Self::json_body(response).await
    }

    async fn session_request(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, RedfishError> {
        let response = self
            .request(method, path, payload, Auth::Token(&session.token))
            .send()
            .await?;
        let response = self.check(path, response).await?;
        Self::json_body(response).await
    }

    async fn open_session(&self, password: &str) -> Result<Option<Session>, RedfishError> {
        let payload = serde_json::json!({"UserName": self.username, "Password": password});
        let response = self
            .request(Method::Post, SESSIONS_PATH, Some(&payload), Auth::None)
            .send()
            .await?;

        let response = match self.check(SESSIONS_PATH, response).await {
            Ok(response) => response,
            Err(e) if e.is_unauthorized() => {
                debug!("{} rejected session credentials", self);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let Some(token) = header("X-Auth-Token") else {
            return Ok(None);
        };
        let location = match header("Location") {
            Some(location) => self.session_location(&location),
            None => {
                let body = Self::json_body(response).await?;
                match body.get("@odata.id").and_then(Value::as_str) {
                    Some(id) => id.to_string(),
                    None => return Ok(None),
                }
            }
        };
        Ok(Some(Session { token, location }))
    }

    async fn close_session(&self, session: &Session) -> Result<(), RedfishError> {
        self.session_request(session, Method::Delete, &session.location, None)
            .await
            .map(|_| ())
    }
}

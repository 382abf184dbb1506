//! Keystone v3 password authentication and service catalog lookup

use crate::config::CloudConfig;
use crate::error::OpenStackError;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEndpoint {
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: TokenInfo,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

/// An issued Keystone token with the catalog it was scoped to
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) http: Client,
    pub(crate) token: String,
    catalog: Vec<CatalogEntry>,
    interface: String,
    region: Option<String>,
}

/// Appends `/v3` to an auth URL that does not already carry it.
pub fn identity_v3_url(auth_url: &str) -> String {
    let trimmed = auth_url.trim_end_matches('/');
    if trimmed.ends_with("/v3") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/v3")
    }
}

impl Session {
    /// Authenticate with the password credentials of `cloud`.
    pub async fn authenticate(http: Client, cloud: &CloudConfig) -> Result<Self, OpenStackError> {
        let auth = &cloud.auth;
        let url = format!("{}/auth/tokens", identity_v3_url(&auth.auth_url));
        let body = json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": auth.username,
                            "domain": {"name": auth.user_domain_name},
                            "password": auth.password,
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": auth.project_name,
                        "domain": {"name": auth.project_domain_name},
                    }
                }
            }
        });

        debug!("POST {}", url);
        let response = http.post(&url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => OpenStackError::Authentication(format!("{} as {}: {text}", url, auth.username)),
                _ => OpenStackError::Api(format!("POST {url} failed: {status} - {text}")),
            });
        }

        let token = response
            .headers()
            .get("X-Subject-Token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| OpenStackError::Authentication("response carried no X-Subject-Token".to_string()))?;
        let body: TokenBody = response.json().await?;
        info!(
            "Authenticated to {} as {} (project {})",
            auth.auth_url, auth.username, auth.project_name
        );

        Ok(Self {
            http,
            token,
            catalog: body.token.catalog,
            interface: cloud.interface.clone(),
            region: cloud.region_name.clone(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Endpoint URL of `service_type` for the configured interface and region
    pub fn endpoint(&self, service_type: &str) -> Result<String, OpenStackError> {
        self.catalog
            .iter()
            .filter(|entry| entry.service_type == service_type)
            .flat_map(|entry| entry.endpoints.iter())
            .find(|ep| {
                ep.interface == self.interface
                    && self.region.as_deref().is_none_or(|region| {
                        ep.region.as_deref() == Some(region) || ep.region_id.as_deref() == Some(region)
                    })
            })
            .map(|ep| ep.url.trim_end_matches('/').to_string())
            .ok_or_else(|| OpenStackError::EndpointNotFound {
                service_type: service_type.to_string(),
                interface: self.interface.clone(),
            })
    }
}

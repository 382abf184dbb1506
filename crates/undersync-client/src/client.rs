//! Undersync HTTP client

use crate::error::UndersyncError;
use crate::undersync_trait::{SyncMode, UndersyncTrait};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// In-cluster service address
pub const DEFAULT_URL: &str = "http://undersync-service.undersync.svc.cluster.local:8080";

/// Pushes to a pair of switches can take a while
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

/// Undersync API client
#[derive(Debug)]
pub struct Undersync {
    client: Client,
    api_url: String,
    token: String,
}

impl Undersync {
    /// Create a new Undersync client
    ///
    /// # Arguments
    /// * `api_url` - Undersync base URL, see [`DEFAULT_URL`]
    /// * `token` - bearer token
    pub fn new(api_url: String, token: String) -> Result<Self, UndersyncError> {
        Self::with_timeout(api_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_url: String, token: String, timeout: Duration) -> Result<Self, UndersyncError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Endpoint for `vlan_group_ids`, comma-joined
    pub fn url(&self, vlan_group_ids: &[Uuid], mode: SyncMode) -> String {
        let ids = vlan_group_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(",");
        format!("{}/v1/vlan-group/{}/{}", self.api_url, ids, mode.as_path())
    }
}

#[async_trait::async_trait]
impl UndersyncTrait for Undersync {
    async fn sync_devices(&self, vlan_group_ids: &[Uuid], mode: SyncMode) -> Result<Value, UndersyncError> {
        let url = self.url(vlan_group_ids, mode);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(UndersyncError::Api {
                status: status.as_u16(),
                body,
            });
        }
        info!("Undersync {} accepted for {} VLAN group(s)", mode.as_path(), vlan_group_ids.len());

        if body.trim().is_empty() {
            return Ok(json!({}));
        }
        // Undersync is not strict about its reply format
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}

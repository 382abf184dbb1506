//! Token-authenticated HTTP wrapper shared by the service clients

use crate::error::OpenStackError;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// HTTP client bound to one service endpoint
#[derive(Debug, Clone)]
pub struct ServiceClient {
    client: Client,
    endpoint: String,
    token: String,
    microversion: Option<(&'static str, &'static str)>,
}

impl ServiceClient {
    pub fn new(client: Client, endpoint: &str, token: String) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
            microversion: None,
        }
    }

    /// Send `header: version` on every request
    pub fn with_microversion(mut self, header: &'static str, version: &'static str) -> Self {
        self.microversion = Some((header, version));
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.endpoint, path)
        }
    }

    fn prepare(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .header("X-Auth-Token", &self.token)
            .header("Accept", "application/json");
        match self.microversion {
            Some((header, version)) => request.header(header, version),
            None => request,
        }
    }

    async fn check(method: &str, url: &str, response: Response) -> Result<Response, OpenStackError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            401 | 403 => OpenStackError::Authentication(format!("{method} {url}: {status} - {body}")),
            404 => OpenStackError::NotFound(format!("{url} - {body}")),
            409 => OpenStackError::Conflict(format!("{method} {url}: {body}")),
            _ => OpenStackError::Api(format!("{method} {url} failed: {status} - {body}")),
        })
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, OpenStackError> {
        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Object(Default::default()))?);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, OpenStackError> {
        let url = self.build_url(path);
        debug!("GET {}", url);
        let response = self.prepare(self.client.get(&url)).send().await?;
        let response = Self::check("GET", &url, response).await?;
        Self::decode(response).await
    }

    /// Make a GET request, mapping 404 to `None`
    pub async fn get_optional<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Option<T>, OpenStackError> {
        match self.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Make a POST request with a JSON body
    pub async fn post<T: for<'de> Deserialize<'de>>(&self, path: &str, body: &Value) -> Result<T, OpenStackError> {
        let url = self.build_url(path);
        debug!("POST {}", url);
        let response = self.prepare(self.client.post(&url)).json(body).send().await?;
        let response = Self::check("POST", &url, response).await?;
        Self::decode(response).await
    }

    /// Make a PATCH request with a JSON body
    pub async fn patch<T: for<'de> Deserialize<'de>>(&self, path: &str, body: &Value) -> Result<T, OpenStackError> {
        let url = self.build_url(path);
        debug!("PATCH {} with body: {}", url, body);
        let response = self.prepare(self.client.patch(&url)).json(body).send().await?;
        let response = Self::check("PATCH", &url, response).await?;
        Self::decode(response).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), OpenStackError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);
        let response = self.prepare(self.client.delete(&url)).send().await?;
        Self::check("DELETE", &url, response).await?;
        Ok(())
    }
}

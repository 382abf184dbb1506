//! Common utilities for the Nautobot API client
//!
//! Provides the authenticated HTTP wrapper used by every endpoint.

pub mod query;

use crate::error::NautobotError;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

/// Paginated response wrapper from the Nautobot REST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// HTTP client wrapper with token authentication
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: String,
}

impl HttpClient {
    /// Create a new HTTP client wrapper
    pub fn new(client: Client, base_url: String, token: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a full URL from a path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    fn auth_header(&self) -> String {
        format!("Token {}", self.token)
    }

    // Maps a non-success status onto the error taxonomy.
    async fn check(method: &str, path: &str, response: Response) -> Result<Response, NautobotError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(match status.as_u16() {
            400 => NautobotError::BadRequest {
                method: method.to_string(),
                path: path.to_string(),
                body,
            },
            401 | 403 => NautobotError::Authentication(format!("{method} {path}: {status} - {body}")),
            404 => NautobotError::NotFound(format!("Resource not found: {path} - {body}")),
            _ => NautobotError::Api(format!("{method} {path} failed: {status} - {body}")),
        })
    }

    async fn decode<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, NautobotError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            NautobotError::Api(format!(
                "error decoding response body: {} - Response (first 500 chars): {}",
                e,
                text.chars().take(500).collect::<String>()
            ))
        })
    }

    /// Fetch all pages of a paginated response
    pub async fn fetch_all_pages<T: for<'de> Deserialize<'de>>(&self, mut url: String) -> Result<Vec<T>, NautobotError> {
        let mut all_results = Vec::new();

        loop {
            debug!("Fetching page: {}", url);

            let response = self
                .client
                .get(&url)
                .header("Authorization", self.auth_header())
                .header("Accept", "application/json")
                .send()
                .await?;
            let response = Self::check("GET", &url, response).await?;
            let page: PaginatedResponse<T> = Self::decode(response).await?;
            all_results.extend(page.results);

            match page.next {
                Some(next_url) => url = self.build_url(&next_url),
                None => break,
            }
        }

        Ok(all_results)
    }

    /// Make a GET request
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, NautobotError> {
        let url = self.build_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;
        let response = Self::check("GET", path, response).await?;
        Self::decode(response).await
    }

    /// Make a GET request, mapping 404 to `None`
    pub async fn get_optional<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<Option<T>, NautobotError> {
        match self.get(path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Make a POST request
    pub async fn post<T: for<'de> Deserialize<'de>>(&self, path: &str, body: &Value) -> Result<T, NautobotError> {
        let url = self.build_url(path);
        debug!("POST {} with body: {}", url, body);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        let response = Self::check("POST", path, response).await?;
        Self::decode(response).await
    }

    /// Make a PATCH request
    pub async fn patch<T: for<'de> Deserialize<'de>>(&self, path: &str, body: &Value) -> Result<T, NautobotError> {
        let url = self.build_url(path);
        debug!("PATCH {} with body: {}", url, body);

        let response = self
            .client
            .patch(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;
        let response = Self::check("PATCH", path, response).await?;
        Self::decode(response).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> Result<(), NautobotError> {
        let url = self.build_url(path);
        debug!("DELETE {}", url);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", self.auth_header())
            .header("Accept", "application/json")
            .send()
            .await?;
        Self::check("DELETE", path, response).await?;
        Ok(())
    }

    /// Run a GraphQL query and return its `data` member
    pub async fn graphql(&self, query: &str, variables: Value) -> Result<Value, NautobotError> {
        let mut result: Value = self
            .post("/api/graphql/", &json!({"query": query, "variables": variables}))
            .await?;
        if let Some(errors) = result.get("errors").filter(|e| !e.is_null()) {
            return Err(NautobotError::GraphQL(errors.to_string()));
        }
        match result.get_mut("data").map(Value::take) {
            Some(data) if !data.is_null() => Ok(data),
            _ => Err(NautobotError::GraphQL(format!("no data in response: {result}"))),
        }
    }

    /// Build query string from filters
    pub fn build_query_string(&self, filters: &[(&str, &str)]) -> String {
        filters
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

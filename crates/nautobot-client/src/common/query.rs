//! Query utilities for the Nautobot REST API

use crate::common::{HttpClient, PaginatedResponse};
use crate::error::NautobotError;
use serde::Deserialize;

/// Query resources with optional filtering and pagination
///
/// `endpoint` is the path below `/api/`, e.g. `dcim/interfaces`.
pub async fn query_resources<T: for<'de> Deserialize<'de>>(
    http: &HttpClient,
    endpoint: &str,
    filters: &[(&str, &str)],
    fetch_all: bool,
) -> Result<Vec<T>, NautobotError> {
    let mut url = format!("/api/{endpoint}/");

    if !filters.is_empty() {
        url = format!("{url}?{}", http.build_query_string(filters));
    }

    if fetch_all {
        http.fetch_all_pages(http.build_url(&url)).await
    } else {
        let response: PaginatedResponse<T> = http.get(&url).await?;
        Ok(response.results)
    }
}

/// First match of a filtered query, if any
pub async fn query_one<T: for<'de> Deserialize<'de>>(
    http: &HttpClient,
    endpoint: &str,
    filters: &[(&str, &str)],
) -> Result<Option<T>, NautobotError> {
    Ok(query_resources(http, endpoint, filters, false).await?.into_iter().next())
}

//! Keystone (identity) API client

use crate::auth::identity_v3_url;
use crate::common::ServiceClient;
use crate::error::OpenStackError;
use crate::models::{Project, ProjectBody};
use crate::openstack_trait::IdentityClientTrait;

/// Keystone client bound to the catalog's identity endpoint
#[derive(Debug, Clone)]
pub struct IdentityClient {
    service: ServiceClient,
}

impl IdentityClient {
    pub fn new(http: reqwest::Client, endpoint: &str, token: String) -> Self {
        Self {
            service: ServiceClient::new(http, &identity_v3_url(endpoint), token),
        }
    }
}

#[async_trait::async_trait]
impl IdentityClientTrait for IdentityClient {
    async fn get_project(&self, id: &str) -> Result<Option<Project>, OpenStackError> {
        let body: Option<ProjectBody> = self.service.get_optional(&format!("/projects/{id}")).await?;
        Ok(body.map(|b| b.project))
    }
}

//! Ironic (baremetal) API client

use crate::common::ServiceClient;
use crate::error::OpenStackError;
use crate::models::{Node, NodeCreate, PatchOperation, Port, PortCreate, PortList};
use crate::openstack_trait::IronicClientTrait;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Microversion that exposes port names
pub const IRONIC_API_VERSION: &str = "1.88";

const VERSION_HEADER: &str = "X-OpenStack-Ironic-API-Version";

/// Ironic client bound to the catalog's baremetal endpoint
#[derive(Debug, Clone)]
pub struct IronicClient {
    service: ServiceClient,
}

impl IronicClient {
    /// Create a client from an already authenticated service endpoint.
    ///
    /// Catalog entries differ on whether they carry the `/v1` suffix, so it is
    /// stripped here and re-added on every path.
    pub fn new(http: reqwest::Client, endpoint: &str, token: String) -> Self {
        let base = endpoint.trim_end_matches('/').trim_end_matches("/v1");
        Self {
            service: ServiceClient::new(http, base, token).with_microversion(VERSION_HEADER, IRONIC_API_VERSION),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.service.endpoint()
    }
}

#[async_trait::async_trait]
impl IronicClientTrait for IronicClient {
    async fn get_node(&self, ident: &str) -> Result<Option<Node>, OpenStackError> {
        self.service.get_optional(&format!("/v1/nodes/{ident}")).await
    }

    async fn create_node(&self, node: &NodeCreate) -> Result<Node, OpenStackError> {
        debug!("Creating Ironic node {} ({})", node.name, node.uuid);
        self.service.post("/v1/nodes", &serde_json::to_value(node)?).await
    }

    async fn patch_node(&self, uuid: Uuid, ops: &[PatchOperation]) -> Result<Node, OpenStackError> {
        let body: Value = serde_json::to_value(ops)?;
        self.service.patch(&format!("/v1/nodes/{uuid}"), &body).await
    }

    async fn list_ports(&self, node_uuid: Uuid) -> Result<Vec<Port>, OpenStackError> {
        let mut ports = Vec::new();
        let mut next = Some(format!("/v1/ports/detail?node_uuid={node_uuid}"));
        while let Some(path) = next {
            let page: PortList = self.service.get(&path).await?;
            ports.extend(page.ports);
            next = page.next;
        }
        Ok(ports)
    }

    async fn create_port(&self, port: &PortCreate) -> Result<Port, OpenStackError> {
        debug!("Creating Ironic port {} ({})", port.name, port.address);
        self.service.post("/v1/ports", &serde_json::to_value(port)?).await
    }

    async fn patch_port(&self, uuid: Uuid, ops: &[PatchOperation]) -> Result<Port, OpenStackError> {
        let body: Value = serde_json::to_value(ops)?;
        self.service.patch(&format!("/v1/ports/{uuid}"), &body).await
    }

    async fn delete_port(&self, uuid: Uuid) -> Result<(), OpenStackError> {
        self.service.delete(&format!("/v1/ports/{uuid}")).await
    }
}

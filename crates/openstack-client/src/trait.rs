//! Traits for the OpenStack clients to enable mocking

use crate::error::OpenStackError;
use crate::models::{Node, NodeCreate, PatchOperation, Port, PortCreate, Project};
use uuid::Uuid;

/// Ironic operations used by the reconcilers
#[async_trait::async_trait]
pub trait IronicClientTrait: Send + Sync {
    /// Get a node by UUID or name, `None` when Ironic has no such node
    async fn get_node(&self, ident: &str) -> Result<Option<Node>, OpenStackError>;

    async fn create_node(&self, node: &NodeCreate) -> Result<Node, OpenStackError>;

    async fn patch_node(&self, uuid: Uuid, ops: &[PatchOperation]) -> Result<Node, OpenStackError>;

    /// All ports belonging to a node
    async fn list_ports(&self, node_uuid: Uuid) -> Result<Vec<Port>, OpenStackError>;

    async fn create_port(&self, port: &PortCreate) -> Result<Port, OpenStackError>;

    async fn patch_port(&self, uuid: Uuid, ops: &[PatchOperation]) -> Result<Port, OpenStackError>;

    async fn delete_port(&self, uuid: Uuid) -> Result<(), OpenStackError>;
}

/// Keystone operations used by the event handlers
#[async_trait::async_trait]
pub trait IdentityClientTrait: Send + Sync {
    /// Get a project by id, `None` when Keystone has no such project
    async fn get_project(&self, id: &str) -> Result<Option<Project>, OpenStackError>;
}

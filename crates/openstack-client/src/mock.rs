//! In-memory Ironic and Keystone for tests
//!
//! The Ironic mock behaves like the real API where the reconcilers care:
//! passwords in `driver_info` come back masked, port MACs and names are
//! unique, and every write is recorded so tests can assert idempotence.

use crate::error::OpenStackError;
use crate::models::{Node, NodeCreate, PatchOperation, Port, PortCreate, Project};
use crate::openstack_trait::{IdentityClientTrait, IronicClientTrait};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const MASK: &str = "******";

/// Mock Ironic client
#[derive(Clone, Default)]
pub struct MockIronicClient {
    nodes: Arc<Mutex<HashMap<Uuid, Node>>>,
    ports: Arc<Mutex<HashMap<Uuid, Port>>>,
    writes: Arc<Mutex<Vec<String>>>,
}

impl MockIronicClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a node without recording a write
    pub fn add_node(&self, node: Node) {
        self.nodes.lock().unwrap().insert(node.uuid, node);
    }

    /// Seed a port without recording a write
    pub fn add_port(&self, port: Port) {
        self.ports.lock().unwrap().insert(port.uuid, port);
    }

    /// Move a node to another provision state, as a conductor would
    pub fn set_provision_state(&self, uuid: Uuid, state: &str) {
        if let Some(node) = self.nodes.lock().unwrap().get_mut(&uuid) {
            node.provision_state = state.to_string();
        }
    }

    /// Unmasked copy of a node
    pub fn node(&self, uuid: Uuid) -> Option<Node> {
        self.nodes.lock().unwrap().get(&uuid).cloned()
    }

    /// Ports of a node sorted by name
    pub fn ports_of(&self, node_uuid: Uuid) -> Vec<Port> {
        let mut ports: Vec<Port> = self
            .ports
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.node_uuid == node_uuid)
            .cloned()
            .collect();
        ports.sort_by(|a, b| a.name.cmp(&b.name));
        ports
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    fn record(&self, write: String) {
        self.writes.lock().unwrap().push(write);
    }
}

fn masked(mut node: Node) -> Node {
    for (key, value) in node.driver_info.iter_mut() {
        if key.ends_with("password") {
            *value = Value::String(MASK.to_string());
        }
    }
    node
}

/// Applies add/replace/remove operations to a serialized resource.
fn apply_patch<T: Serialize + DeserializeOwned>(resource: &T, ops: &[PatchOperation]) -> Result<T, OpenStackError> {
    let mut doc = serde_json::to_value(resource)?;
    for op in ops {
        let (parent_path, key) = op
            .path
            .rsplit_once('/')
            .ok_or_else(|| OpenStackError::Api(format!("invalid patch path {}", op.path)))?;
        let parent = doc
            .pointer_mut(parent_path)
            .and_then(Value::as_object_mut)
            .ok_or_else(|| OpenStackError::Api(format!("patch path {} does not exist", op.path)))?;
        match op.op.as_str() {
            "add" | "replace" => {
                parent.insert(key.to_string(), op.value.clone().unwrap_or(Value::Null));
            }
            "remove" => {
                if parent.remove(key).is_none() {
                    return Err(OpenStackError::Api(format!("can't remove non-existent field {}", op.path)));
                }
            }
            other => return Err(OpenStackError::Api(format!("unsupported patch op {other}"))),
        }
    }
    Ok(serde_json::from_value(doc)?)
}

#[async_trait::async_trait]
impl IronicClientTrait for MockIronicClient {
    async fn get_node(&self, ident: &str) -> Result<Option<Node>, OpenStackError> {
        let nodes = self.nodes.lock().unwrap();
        let found = match Uuid::parse_str(ident) {
            Ok(uuid) => nodes.get(&uuid).cloned(),
            Err(_) => nodes.values().find(|n| n.name.as_deref() == Some(ident)).cloned(),
        };
        Ok(found.map(masked))
    }

    async fn create_node(&self, request: &NodeCreate) -> Result<Node, OpenStackError> {
        self.record(format!("POST nodes {}", request.uuid));
        let mut nodes = self.nodes.lock().unwrap();
        if nodes.contains_key(&request.uuid) {
            return Err(OpenStackError::Conflict(format!(
                "A node with UUID {} already exists.",
                request.uuid
            )));
        }
        if nodes.values().any(|n| n.name.as_deref() == Some(request.name.as_str())) {
            return Err(OpenStackError::Conflict(format!(
                "A node with name {} already exists.",
                request.name
            )));
        }
        let node = Node {
            uuid: request.uuid,
            name: Some(request.name.clone()),
            driver: request.driver.clone(),
            driver_info: request.driver_info.clone(),
            provision_state: "enroll".to_string(),
            boot_interface: request.boot_interface.clone(),
            inspect_interface: request.inspect_interface.clone(),
            resource_class: request.resource_class.clone(),
            lessee: None,
        };
        nodes.insert(node.uuid, node.clone());
        Ok(masked(node))
    }

    async fn patch_node(&self, uuid: Uuid, ops: &[PatchOperation]) -> Result<Node, OpenStackError> {
        self.record(format!("PATCH nodes {uuid}"));
        let mut nodes = self.nodes.lock().unwrap();
        let current = nodes
            .get(&uuid)
            .ok_or_else(|| OpenStackError::NotFound(format!("Node {uuid} could not be found.")))?;
        let updated = apply_patch(current, ops)?;
        nodes.insert(uuid, updated.clone());
        Ok(masked(updated))
    }

    async fn list_ports(&self, node_uuid: Uuid) -> Result<Vec<Port>, OpenStackError> {
        Ok(self.ports_of(node_uuid))
    }

    async fn create_port(&self, request: &PortCreate) -> Result<Port, OpenStackError> {
        self.record(format!("POST ports {}", request.uuid));
        if !self.nodes.lock().unwrap().contains_key(&request.node_uuid) {
            return Err(OpenStackError::Api(format!("Node {} could not be found.", request.node_uuid)));
        }
        let mut ports = self.ports.lock().unwrap();
        let address = request.address.to_lowercase();
        if ports.contains_key(&request.uuid) {
            return Err(OpenStackError::Conflict(format!("A port with UUID {} already exists.", request.uuid)));
        }
        if ports.values().any(|p| p.address == address) {
            return Err(OpenStackError::Conflict(format!("A port with MAC address {address} already exists.")));
        }
        if ports.values().any(|p| p.name.as_deref() == Some(request.name.as_str())) {
            return Err(OpenStackError::Conflict(format!("A port with name {} already exists.", request.name)));
        }
        let port = Port {
            uuid: request.uuid,
            address,
            node_uuid: request.node_uuid,
            name: Some(request.name.clone()),
            pxe_enabled: request.pxe_enabled,
            local_link_connection: request.local_link_connection.clone(),
            physical_network: request.physical_network.clone(),
            portgroup_uuid: None,
        };
        ports.insert(port.uuid, port.clone());
        Ok(port)
    }

    async fn patch_port(&self, uuid: Uuid, ops: &[PatchOperation]) -> Result<Port, OpenStackError> {
        self.record(format!("PATCH ports {uuid}"));
        let mut ports = self.ports.lock().unwrap();
        let current = ports
            .get(&uuid)
            .ok_or_else(|| OpenStackError::NotFound(format!("Port {uuid} could not be found.")))?;
        let updated = apply_patch(current, ops)?;
        ports.insert(uuid, updated.clone());
        Ok(updated)
    }

    async fn delete_port(&self, uuid: Uuid) -> Result<(), OpenStackError> {
        self.record(format!("DELETE ports {uuid}"));
        self.ports
            .lock()
            .unwrap()
            .remove(&uuid)
            .map(|_| ())
            .ok_or_else(|| OpenStackError::NotFound(format!("Port {uuid} could not be found.")))
    }
}

/// Mock Keystone client
#[derive(Clone, Default)]
pub struct MockIdentityClient {
    projects: Arc<Mutex<HashMap<String, Project>>>,
}

impl MockIdentityClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_project(&self, id: &str, name: &str, tags: &[&str]) {
        self.projects.lock().unwrap().insert(
            id.to_string(),
            Project {
                id: id.to_string(),
                name: name.to_string(),
                domain_id: Some("default".to_string()),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                enabled: true,
            },
        );
    }
}

#[async_trait::async_trait]
impl IdentityClientTrait for MockIdentityClient {
    async fn get_project(&self, id: &str) -> Result<Option<Project>, OpenStackError> {
        Ok(self.projects.lock().unwrap().get(id).cloned())
    }
}

/// Builds a `driver_info` map from string pairs.
pub fn driver_info(pairs: &[(&str, &str)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
        .collect()
}

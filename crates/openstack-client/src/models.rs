//! Ironic and Keystone resource models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Baremetal node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub uuid: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub driver_info: Map<String, Value>,
    #[serde(default)]
    pub provision_state: String,
    #[serde(default)]
    pub boot_interface: Option<String>,
    #[serde(default)]
    pub inspect_interface: Option<String>,
    #[serde(default)]
    pub resource_class: Option<String>,
    #[serde(default)]
    pub lessee: Option<String>,
}

/// Body of `POST /v1/nodes`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeCreate {
    pub uuid: Uuid,
    pub name: String,
    pub driver: String,
    pub driver_info: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boot_interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspect_interface: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_class: Option<String>,
}

/// Baremetal port
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub uuid: Uuid,
    pub address: String,
    pub node_uuid: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pxe_enabled: bool,
    #[serde(default)]
    pub local_link_connection: Map<String, Value>,
    #[serde(default)]
    pub physical_network: Option<String>,
    #[serde(default)]
    pub portgroup_uuid: Option<Uuid>,
}

/// Body of `POST /v1/ports`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortCreate {
    pub uuid: Uuid,
    pub address: String,
    pub node_uuid: Uuid,
    pub name: String,
    pub pxe_enabled: bool,
    pub local_link_connection: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_network: Option<String>,
}

/// One RFC 6902 operation of an Ironic PATCH
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl PatchOperation {
    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: "replace".to_string(),
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: "add".to_string(),
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: "remove".to_string(),
            path: path.into(),
            value: None,
        }
    }
}

/// Keystone project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl Project {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct PortList {
    pub ports: Vec<Port>,
    #[serde(default)]
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectBody {
    pub project: Project,
}

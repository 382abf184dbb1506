//! Nautobot API models
//!
//! These models match the Nautobot 2.x REST serializers at depth 0: related
//! objects arrive as `{id, object_type, url}` references.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Object type of a DCIM interface cable termination
pub const INTERFACE_OBJECT_TYPE: &str = "dcim.interface";

/// Reference to a related object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NestedObject {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl NestedObject {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            object_type: None,
            url: None,
            name: None,
        }
    }

    pub fn named(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(id)
        }
    }
}

/// Reference by name, as accepted on writes (`{"name": "Active"}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    pub name: String,
}

impl NameRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Device model matching Nautobot DeviceSerializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub serial: String,
    #[serde(default)]
    pub status: Option<NestedObject>,
    #[serde(default)]
    pub location: Option<NestedObject>,
    #[serde(default)]
    pub rack: Option<NestedObject>,
    #[serde(default)]
    pub tenant: Option<NestedObject>,
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

/// Interface model matching Nautobot InterfaceSerializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interface {
    pub id: Uuid,
    pub name: String,
    pub device: NestedObject,
    #[serde(rename = "type", default)]
    pub interface_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub status: Option<NestedObject>,
    #[serde(default)]
    pub cable: Option<NestedObject>,
}

/// Cable model matching Nautobot CableSerializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cable {
    pub id: Uuid,
    pub termination_a_type: String,
    pub termination_a_id: Uuid,
    pub termination_b_type: String,
    pub termination_b_id: Uuid,
    #[serde(default)]
    pub status: Option<NestedObject>,
}

impl Cable {
    /// True if either end of the cable is `interface_id`.
    pub fn terminates_on(&self, interface_id: Uuid) -> bool {
        self.termination_a_id == interface_id || self.termination_b_id == interface_id
    }

    /// True if the cable joins `a` and `b`, in either orientation.
    pub fn connects(&self, a: Uuid, b: Uuid) -> bool {
        (self.termination_a_id == a && self.termination_b_id == b)
            || (self.termination_a_id == b && self.termination_b_id == a)
    }
}

/// IP address model matching Nautobot IPAddressSerializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddress {
    pub id: Uuid,
    /// CIDR form, e.g. `10.46.96.156/26`
    pub address: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(rename = "type", default)]
    pub ip_type: Option<String>,
    #[serde(default)]
    pub status: Option<NestedObject>,
}

/// IP address to interface assignment (`ipam/ip-address-to-interface`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddressToInterface {
    pub id: Uuid,
    pub ip_address: NestedObject,
    #[serde(default)]
    pub interface: Option<NestedObject>,
    #[serde(default)]
    pub is_primary: bool,
}

/// Prefix model matching Nautobot PrefixSerializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prefix {
    pub id: Uuid,
    pub prefix: String,
    #[serde(default)]
    pub namespace: Option<NestedObject>,
    #[serde(default)]
    pub status: Option<NestedObject>,
    #[serde(default)]
    pub tenant: Option<NestedObject>,
}

/// IPAM namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: Uuid,
    pub name: String,
}

/// VLAN group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VlanGroup {
    pub id: Uuid,
    pub name: String,
}

/// UCVNI from the `undercloud_vni` plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ucvni {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub ucvni_id: Option<u32>,
    #[serde(default)]
    pub ucvni_group: Option<NestedObject>,
    #[serde(default)]
    pub tenant: Option<NestedObject>,
    #[serde(default)]
    pub status: Option<NestedObject>,
}

/// Reply of the `prep_switch_interface` plugin endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrepSwitchInterfaceResponse {
    pub vlan_group_id: Uuid,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// Request bodies

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTypeRef {
    pub manufacturer: NameRef,
    pub model: String,
}

/// Request body for creating a device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRequest {
    pub name: String,
    pub serial: String,
    pub status: NameRef,
    pub role: NameRef,
    pub device_type: DeviceTypeRef,
    pub location: Uuid,
    pub rack: Uuid,
}

/// Request body for creating an interface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceRequest {
    /// Client-chosen UUID (Ironic port and portgroup UUIDs are reused)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub device: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub interface_type: String,
    pub status: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
}

/// Request body for creating a cable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CableRequest {
    pub termination_a_type: String,
    pub termination_a_id: Uuid,
    pub termination_b_type: String,
    pub termination_b_id: Uuid,
    pub status: String,
}

impl CableRequest {
    /// A connected cable between two interfaces
    pub fn between_interfaces(a: Uuid, b: Uuid) -> Self {
        Self {
            termination_a_type: INTERFACE_OBJECT_TYPE.to_string(),
            termination_a_id: a,
            termination_b_type: INTERFACE_OBJECT_TYPE.to_string(),
            termination_b_id: b,
            status: "Connected".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentPrefix {
    #[serde(rename = "type")]
    pub prefix_type: String,
    pub prefix: String,
}

/// Request body for creating an IP address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpAddressRequest {
    /// Host address without mask; the mask comes from the parent prefix
    pub address: String,
    pub status: String,
    pub parent: ParentPrefix,
}

/// Request body for creating a prefix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrefixRequest {
    pub id: Uuid,
    pub prefix: String,
    pub status: String,
    pub namespace: NameRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<Uuid>,
}

/// Request body for creating a UCVNI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UcvniRequest {
    pub id: Uuid,
    pub name: String,
    pub status: NameRef,
    pub tenant: Uuid,
    pub ucvni_group: NameRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ucvni_id: Option<u32>,
}

//! GraphQL read path
//!
//! A server device is fetched in one query together with its interfaces,
//! cables, IP addresses and connected switch ports, and flattened into
//! plain records keyed by UUID. Records are read-only snapshots; writes go
//! through the REST endpoints.

use crate::error::NautobotError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub(crate) const SERVER_BY_SERIAL: &str = r"
query($serial: [String]) {
  devices(serial: $serial) {
    id name serial
    location { id name }
    rack { id name }
    interfaces {
      id name type description mac_address
      status { name }
      cable { id }
      connected_interface {
        id name
        device { id name location { id name } rack { id name } }
      }
      ip_addresses { id address }
    }
  }
}";

pub(crate) const SERVER_BY_ID: &str = r"
query($id: [String]) {
  devices(id: $id) {
    id name serial
    location { id name }
    rack { id name }
    interfaces {
      id name type description mac_address
      status { name }
      cable { id }
      connected_interface {
        id name
        device { id name location { id name } rack { id name } }
      }
      ip_addresses { id address }
    }
  }
}";

pub(crate) const SWITCHES_BY_NAME: &str = r"
query($names: [String]) {
  devices(name: $names) {
    id name
    location { id name }
    rack { id name }
  }
}";

pub(crate) const SWITCH_VLAN_GROUP: &str = r"
query($id: ID!) {
  device(id: $id) {
    rel_vlan_group_to_devices { id }
  }
}";

/// A server device as seen through GraphQL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NautobotDevice {
    pub id: Uuid,
    pub name: String,
    pub serial: String,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    pub rack_id: Option<Uuid>,
    pub rack_name: Option<String>,
    pub interfaces: Vec<NautobotInterface>,
}

impl NautobotDevice {
    pub fn interface(&self, name: &str) -> Option<&NautobotInterface> {
        self.interfaces.iter().find(|i| i.name == name)
    }

    pub fn interface_by_mac(&self, mac_address: &str) -> Option<&NautobotInterface> {
        self.interfaces.iter().find(|i| {
            i.mac_address
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case(mac_address))
        })
    }
}

/// One interface of a [`NautobotDevice`], with its cabled neighbour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NautobotInterface {
    pub id: Uuid,
    pub name: String,
    /// REST slug form, e.g. `25gbase-x-sfp28`
    pub interface_type: String,
    pub description: String,
    pub mac_address: Option<String>,
    pub status: Option<String>,
    pub cable_id: Option<Uuid>,
    /// First assigned address in CIDR form
    pub ip_address: Option<String>,
    pub neighbor_interface_id: Option<Uuid>,
    pub neighbor_interface_name: Option<String>,
    pub neighbor_device_id: Option<Uuid>,
    pub neighbor_device_name: Option<String>,
    pub neighbor_location_name: Option<String>,
    pub neighbor_rack_name: Option<String>,
}

/// A switch device with its placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchRecord {
    pub id: Uuid,
    pub name: String,
    pub location_id: Option<Uuid>,
    pub location_name: Option<String>,
    pub rack_id: Option<Uuid>,
    pub rack_name: Option<String>,
}

/// GraphQL reports interface types as enum names (`A_25GBASE_X_SFP28`);
/// REST uses slugs (`25gbase-x-sfp28`).
pub fn normalize_interface_type(graphql_type: &str) -> String {
    let lower = graphql_type.to_lowercase();
    let stripped = lower.strip_prefix("a_").unwrap_or(&lower);
    stripped.replace('_', "-")
}

#[derive(Deserialize)]
struct GqlRef {
    id: Uuid,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct GqlStatus {
    name: String,
}

#[derive(Deserialize)]
struct GqlNeighborDevice {
    id: Uuid,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    location: Option<GqlRef>,
    #[serde(default)]
    rack: Option<GqlRef>,
}

#[derive(Deserialize)]
struct GqlConnected {
    id: Uuid,
    name: String,
    device: GqlNeighborDevice,
}

#[derive(Deserialize)]
struct GqlIp {
    address: String,
}

#[derive(Deserialize)]
struct GqlInterface {
    id: Uuid,
    name: String,
    #[serde(rename = "type", default)]
    interface_type: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    mac_address: Option<String>,
    #[serde(default)]
    status: Option<GqlStatus>,
    #[serde(default)]
    cable: Option<GqlRef>,
    #[serde(default)]
    connected_interface: Option<GqlConnected>,
    #[serde(default)]
    ip_addresses: Vec<GqlIp>,
}

#[derive(Deserialize)]
struct GqlDevice {
    id: Uuid,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    serial: String,
    #[serde(default)]
    location: Option<GqlRef>,
    #[serde(default)]
    rack: Option<GqlRef>,
    #[serde(default)]
    interfaces: Vec<GqlInterface>,
}

fn split_ref(r: Option<GqlRef>) -> (Option<Uuid>, Option<String>) {
    match r {
        Some(r) => (Some(r.id), r.name),
        None => (None, None),
    }
}

impl From<GqlInterface> for NautobotInterface {
    fn from(data: GqlInterface) -> Self {
        let connected = data.connected_interface;
        let neighbor_device = connected.as_ref().map(|c| &c.device);
        Self {
            id: data.id,
            name: data.name,
            interface_type: normalize_interface_type(&data.interface_type),
            description: data.description,
            mac_address: data.mac_address.filter(|m| !m.is_empty()),
            status: data.status.map(|s| s.name),
            cable_id: data.cable.map(|c| c.id),
            ip_address: data.ip_addresses.into_iter().next().map(|ip| ip.address),
            neighbor_interface_id: connected.as_ref().map(|c| c.id),
            neighbor_interface_name: connected.as_ref().map(|c| c.name.clone()),
            neighbor_device_id: neighbor_device.map(|d| d.id),
            neighbor_device_name: neighbor_device.and_then(|d| d.name.clone()),
            neighbor_location_name: neighbor_device
                .and_then(|d| d.location.as_ref())
                .and_then(|l| l.name.clone()),
            neighbor_rack_name: neighbor_device
                .and_then(|d| d.rack.as_ref())
                .and_then(|r| r.name.clone()),
        }
    }
}

impl From<GqlDevice> for NautobotDevice {
    fn from(data: GqlDevice) -> Self {
        let (location_id, location_name) = split_ref(data.location);
        let (rack_id, rack_name) = split_ref(data.rack);
        Self {
            id: data.id,
            name: data.name.unwrap_or_default(),
            serial: data.serial,
            location_id,
            location_name,
            rack_id,
            rack_name,
            interfaces: data.interfaces.into_iter().map(NautobotInterface::from).collect(),
        }
    }
}

fn devices_list<T: for<'de> Deserialize<'de>>(mut data: Value) -> Result<Vec<T>, NautobotError> {
    let devices = data
        .get_mut("devices")
        .map(Value::take)
        .ok_or_else(|| NautobotError::GraphQL("response has no devices".to_string()))?;
    Ok(serde_json::from_value(devices)?)
}

/// Parses a `devices { ... }` server query; more than one match is an error.
pub(crate) fn parse_single_device(data: Value, key: &str) -> Result<Option<NautobotDevice>, NautobotError> {
    let mut devices: Vec<GqlDevice> = devices_list(data)?;
    if devices.len() > 1 {
        return Err(NautobotError::GraphQL(format!("Multiple nautobot devices found with {key}")));
    }
    Ok(devices.pop().map(NautobotDevice::from))
}

pub(crate) fn parse_switches(data: Value) -> Result<Vec<SwitchRecord>, NautobotError> {
    let devices: Vec<GqlDevice> = devices_list(data)?;
    Ok(devices
        .into_iter()
        .map(|d| {
            let (location_id, location_name) = split_ref(d.location);
            let (rack_id, rack_name) = split_ref(d.rack);
            SwitchRecord {
                id: d.id,
                name: d.name.unwrap_or_default(),
                location_id,
                location_name,
                rack_id,
                rack_name,
            }
        })
        .collect())
}

pub(crate) fn parse_vlan_group_id(data: &Value) -> Result<Option<Uuid>, NautobotError> {
    match data.pointer("/device/rel_vlan_group_to_devices/id").and_then(Value::as_str) {
        Some(id) => Uuid::parse_str(id)
            .map(Some)
            .map_err(|e| NautobotError::GraphQL(format!("invalid vlan group id {id}: {e}"))),
        None => Ok(None),
    }
}

//! Ironic node and port reconciliation
//!
//! A node is only ever changed while Ironic allows reconfiguration
//! (`enroll` or `manageable`). In any other state the node is in use and the
//! reconciler reports success without touching it.

use super::Reconciler;
use crate::error::ControllerError;
use chassis::provision_state::allows_updates;
use chassis::pxe::pxe_score;
use chassis::switch_registry::vlan_group_name;
use chassis::{InterfaceInfo, Manufacturer};
use nautobot_client::{NautobotDevice, NautobotInterface};
use openstack_client::{Node, NodeCreate, OpenStackError, PatchOperation, Port, PortCreate};
use redfish_client::BmcTrait;
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};
use uuid::Uuid;

/// Boot interface every enrolled node uses
pub const BOOT_INTERFACE: &str = "http-ipxe";
/// How Ironic reports secrets in `driver_info`
const MASKED: &str = "******";

/// What `sync_ports` did, or would have done in a dry run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSyncSummary {
    /// Node was not in a state that allows changes
    pub locked: bool,
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<Uuid>,
}

impl PortSyncSummary {
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }
}

/// Desired Ironic configuration of a node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    pub uuid: Uuid,
    pub name: String,
    pub driver: String,
    pub driver_info: Map<String, Value>,
    pub boot_interface: String,
    pub inspect_interface: String,
    pub resource_class: Option<String>,
}

impl NodeSpec {
    /// Redfish access through `bmc` for the Nautobot `device`.
    pub fn new(device: &NautobotDevice, bmc: &dyn BmcTrait, manufacturer: Manufacturer) -> Self {
        let mut driver_info = Map::new();
        driver_info.insert("redfish_address".to_string(), json!(format!("https://{}", bmc.ip_address())));
        driver_info.insert("redfish_verify_ca".to_string(), json!(false));
        driver_info.insert("redfish_username".to_string(), json!(bmc.username()));
        driver_info.insert("redfish_password".to_string(), json!(bmc.password()));
        Self {
            uuid: device.id,
            name: device.name.clone(),
            driver: manufacturer.ironic_driver().to_string(),
            driver_info,
            boot_interface: BOOT_INTERFACE.to_string(),
            inspect_interface: manufacturer.inspect_interface().to_string(),
            resource_class: None,
        }
    }

    #[must_use]
    pub fn with_resource_class(mut self, resource_class: Option<String>) -> Self {
        self.resource_class = resource_class;
        self
    }

    fn create_request(&self) -> NodeCreate {
        NodeCreate {
            uuid: self.uuid,
            name: self.name.clone(),
            driver: self.driver.clone(),
            driver_info: self.driver_info.clone(),
            boot_interface: Some(self.boot_interface.clone()),
            inspect_interface: Some(self.inspect_interface.clone()),
            resource_class: self.resource_class.clone(),
        }
    }

    /// Patch operations that bring `node` to this spec.
    ///
    /// Masked secrets cannot be compared and are left alone; the password
    /// is derived from the BMC address, which is compared.
    pub fn diff(&self, node: &Node) -> Vec<PatchOperation> {
        let mut ops = Vec::new();
        if node.driver != self.driver {
            ops.push(PatchOperation::replace("/driver", json!(self.driver)));
        }
        if node.name.as_deref() != Some(self.name.as_str()) {
            ops.push(PatchOperation::replace("/name", json!(self.name)));
        }
        for (key, desired) in &self.driver_info {
            let current = node.driver_info.get(key);
            if current == Some(desired) {
                continue;
            }
            if key.ends_with("password") && current.and_then(Value::as_str) == Some(MASKED) {
                continue;
            }
            ops.push(PatchOperation::add(format!("/driver_info/{key}"), desired.clone()));
        }
        if node.boot_interface.as_deref() != Some(self.boot_interface.as_str()) {
            ops.push(PatchOperation::replace("/boot_interface", json!(self.boot_interface)));
        }
        if node.inspect_interface.as_deref() != Some(self.inspect_interface.as_str()) {
            ops.push(PatchOperation::replace("/inspect_interface", json!(self.inspect_interface)));
        }
        if let Some(resource_class) = &self.resource_class
            && node.resource_class.as_ref() != Some(resource_class)
        {
            ops.push(PatchOperation::replace("/resource_class", json!(resource_class)));
        }
        ops
    }
}

impl Reconciler {
    /// Create the Ironic node for `spec`, or bring an existing one in line.
    ///
    /// # Returns
    /// The node as Ironic reports it afterwards
    pub async fn create_or_update_node(&self, spec: &NodeSpec) -> Result<Node, ControllerError> {
        let existing = match self.ironic.get_node(&spec.uuid.to_string()).await? {
            Some(node) => node,
            None => {
                info!("Creating Ironic node {} ({})", spec.name, spec.uuid);
                match self.ironic.create_node(&spec.create_request()).await {
                    Ok(node) => {
                        info!("✅ Created Ironic node {}", node.uuid);
                        return Ok(node);
                    }
                    Err(OpenStackError::Conflict(message)) => {
                        info!("Ironic node {} was created concurrently: {message}", spec.uuid);
                        self.ironic
                            .get_node(&spec.uuid.to_string())
                            .await?
                            .ok_or_else(|| ControllerError::NotFound(format!("Ironic node {}", spec.uuid)))?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        if !allows_updates(&existing.provision_state) {
            info!(
                "Ironic node {} is in provision state {:?}, leaving it alone",
                existing.uuid, existing.provision_state
            );
            return Ok(existing);
        }

        let ops = spec.diff(&existing);
        if ops.is_empty() {
            debug!("Ironic node {} is up to date", existing.uuid);
            return Ok(existing);
        }
        info!(
            "Updating Ironic node {}: {:?}",
            existing.uuid,
            ops.iter().map(|op| op.path.as_str()).collect::<Vec<_>>()
        );
        Ok(self.ironic.patch_node(existing.uuid, &ops).await?)
    }

    /// Make the Ironic ports of a node mirror the Nautobot interfaces of
    /// the device with the same UUID.
    ///
    /// Ports are matched by UUID: extra ports are deleted first (freeing
    /// their MAC addresses), then existing ports are patched and missing
    /// ones created. With `dry_run` nothing is written.
    pub async fn sync_ports(&self, device_id: Uuid, dry_run: bool) -> Result<PortSyncSummary, ControllerError> {
        let node = self
            .ironic
            .get_node(&device_id.to_string())
            .await?
            .ok_or_else(|| ControllerError::NotFound(format!("Ironic node {device_id}")))?;
        if !allows_updates(&node.provision_state) {
            info!(
                "Ironic node {device_id} is in provision state {:?}, not syncing ports",
                node.provision_state
            );
            return Ok(PortSyncSummary {
                locked: true,
                ..PortSyncSummary::default()
            });
        }

        let device = self
            .nautobot
            .find_device_by_id(device_id)
            .await?
            .ok_or_else(|| ControllerError::NotFound(format!("Nautobot device {device_id}")))?;
        let desired: BTreeMap<Uuid, PortCreate> = self
            .desired_ports(&device, node.uuid)
            .into_iter()
            .map(|p| (p.uuid, p))
            .collect();
        let actual = self.ironic.list_ports(node.uuid).await?;
        let mut summary = PortSyncSummary::default();

        for port in actual.iter().filter(|p| !desired.contains_key(&p.uuid)) {
            info!("Deleting Ironic port {} ({})", port.uuid, port.address);
            if !dry_run {
                match self.ironic.delete_port(port.uuid).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => debug!("Port {} already gone", port.uuid),
                    Err(e) => return Err(e.into()),
                }
            }
            summary.deleted.push(port.uuid);
        }

        let existing: BTreeSet<Uuid> = actual.iter().map(|p| p.uuid).collect();
        for port in actual.iter().filter(|p| desired.contains_key(&p.uuid)) {
            let Some(want) = desired.get(&port.uuid) else { continue };
            let ops = port_diff(port, want);
            if ops.is_empty() {
                continue;
            }
            info!(
                "Updating Ironic port {}: {:?}",
                want.name,
                ops.iter().map(|op| op.path.as_str()).collect::<Vec<_>>()
            );
            if !dry_run {
                self.ironic.patch_port(port.uuid, &ops).await?;
            }
            summary.updated.push(want.name.clone());
        }

        for want in desired.values().filter(|p| !existing.contains(&p.uuid)) {
            info!("Creating Ironic port {} ({})", want.name, want.address);
            if !dry_run {
                match self.ironic.create_port(want).await {
                    Ok(_) => {}
                    Err(OpenStackError::Conflict(message)) => {
                        info!("Ironic port {} was created concurrently: {message}", want.uuid);
                        self.ironic.patch_port(want.uuid, &full_port_patch(want)).await?;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            summary.created.push(want.name.clone());
        }

        info!(
            "Port sync for {}: {} created, {} updated, {} deleted{}",
            device.name,
            summary.created.len(),
            summary.updated.len(),
            summary.deleted.len(),
            if dry_run { " (dry run)" } else { "" }
        );
        Ok(summary)
    }

    /// Ironic ports for every Nautobot interface with a MAC address,
    /// except the BMC port.
    pub fn desired_ports(&self, device: &NautobotDevice, node_uuid: Uuid) -> Vec<PortCreate> {
        let candidates: Vec<(&NautobotInterface, InterfaceInfo)> = device
            .interfaces
            .iter()
            .filter(|i| i.mac_address.as_deref().is_some_and(|m| !m.is_empty()))
            .map(|i| (i, self.interface_info(i)))
            .filter(|(_, info)| !is_management(&info.name))
            .collect();

        // Same election as the BIOS settings; ties go to the earliest name
        let pxe = candidates
            .iter()
            .rev()
            .max_by_key(|(_, info)| pxe_score(info))
            .map(|(i, _)| i.id);

        candidates
            .iter()
            .map(|(interface, info)| PortCreate {
                uuid: interface.id,
                address: info.mac_address.to_lowercase(),
                node_uuid,
                name: format!("{}:{}", device.name, interface.name),
                pxe_enabled: pxe == Some(interface.id),
                local_link_connection: self.local_link_connection(interface),
                physical_network: interface.neighbor_device_name.as_deref().and_then(vlan_group_name),
            })
            .collect()
    }

    fn interface_info(&self, interface: &NautobotInterface) -> InterfaceInfo {
        let info = InterfaceInfo::new(
            interface.name.as_str(),
            interface.description.as_str(),
            interface.mac_address.clone().unwrap_or_default(),
        );
        match (&interface.neighbor_device_name, &interface.neighbor_interface_name) {
            (Some(switch), Some(port)) => {
                let switch_mac = self.registry.mac_for(switch).unwrap_or_default();
                info.with_neighbor(switch_mac, port.as_str())
            }
            _ => info,
        }
    }

    fn local_link_connection(&self, interface: &NautobotInterface) -> Map<String, Value> {
        let mut llc = Map::new();
        let (Some(switch), Some(port)) = (&interface.neighbor_device_name, &interface.neighbor_interface_name) else {
            return llc;
        };
        if let Some(mac) = self.registry.mac_for(switch) {
            llc.insert("switch_id".to_string(), json!(mac.to_lowercase()));
        }
        llc.insert("port_id".to_string(), json!(port));
        llc.insert("switch_info".to_string(), json!(switch));
        llc
    }
}

fn is_management(name: &str) -> bool {
    let upper = name.to_uppercase();
    upper.contains("DRAC") || upper.contains("ILO")
}

fn port_diff(port: &Port, want: &PortCreate) -> Vec<PatchOperation> {
    let mut ops = Vec::new();
    if !port.address.eq_ignore_ascii_case(&want.address) {
        ops.push(PatchOperation::replace("/address", json!(want.address)));
    }
    if port.name.as_deref() != Some(want.name.as_str()) {
        ops.push(PatchOperation::replace("/name", json!(want.name)));
    }
    if port.pxe_enabled != want.pxe_enabled {
        ops.push(PatchOperation::replace("/pxe_enabled", json!(want.pxe_enabled)));
    }
    if port.local_link_connection != want.local_link_connection {
        ops.push(PatchOperation::replace("/local_link_connection", json!(want.local_link_connection)));
    }
    if port.physical_network != want.physical_network {
        ops.push(PatchOperation::replace("/physical_network", json!(want.physical_network)));
    }
    ops
}

fn full_port_patch(want: &PortCreate) -> Vec<PatchOperation> {
    vec![
        PatchOperation::replace("/address", json!(want.address)),
        PatchOperation::replace("/name", json!(want.name)),
        PatchOperation::replace("/pxe_enabled", json!(want.pxe_enabled)),
        PatchOperation::replace("/local_link_connection", json!(want.local_link_connection)),
        PatchOperation::replace("/physical_network", json!(want.physical_network)),
    ]
}

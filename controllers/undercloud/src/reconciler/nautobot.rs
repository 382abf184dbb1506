//! Nautobot device, interface, cable and BMC address reconciliation
//!
//! The device is read once through GraphQL; each interface is then compared
//! field by field against that snapshot and only differences are written
//! through REST. Creates that lose a race against a concurrent workflow are
//! recovered by re-reading the winner and continuing from it.

use super::Reconciler;
use crate::error::ControllerError;
use chassis::topology::{self, Connection, Topology};
use chassis::{ChassisInfo, InterfaceInfo, Ipv4Interface, VlanCategory};
use nautobot_client::{
    CableRequest, DeviceRequest, DeviceTypeRef, Interface, InterfaceRequest, IpAddress, IpAddressRequest, NameRef,
    NautobotDevice, NautobotInterface, ParentPrefix, SwitchRecord,
};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Nautobot type of the dedicated BMC port
pub const BMC_INTERFACE_TYPE: &str = "1000base-t";
const ACTIVE: &str = "Active";

impl Reconciler {
    /// Find the server's device in Nautobot, creating or correcting it and
    /// its interfaces, cables and BMC address to match `chassis`.
    ///
    /// The topology is checked before anything is written, so a chassis
    /// that violates the cabling rules leaves Nautobot untouched.
    ///
    /// # Returns
    /// The device as read back from Nautobot after all writes
    pub async fn find_or_create(&self, chassis: &ChassisInfo) -> Result<NautobotDevice, ControllerError> {
        chassis.validate()?;
        let topology = topology::resolve(chassis, &self.registry)?;
        let switches = self.switches(&topology).await?;

        let device = match self.nautobot.find_device_by_serial(&chassis.serial_number).await? {
            Some(device) => {
                debug!("Found existing device {} ({})", device.name, device.id);
                device
            }
            None => self.create_device(chassis, &topology, &switches).await?,
        };

        for interface in &chassis.interfaces {
            let nautobot_interface = self.ensure_interface(&device, interface).await?;

            if let Some(connection) = topology.connection_for(&interface.name) {
                let switch = switches.get(&connection.switch.name).ok_or_else(|| {
                    ControllerError::NotFound(format!("switch {} in Nautobot", connection.switch.name))
                })?;
                self.ensure_cable(&nautobot_interface, switch, connection).await?;
            }

            if interface.is_bmc()
                && let Some(address) = &interface.ipv4_address
            {
                self.ensure_ip_address(&nautobot_interface, address).await?;
            }
        }

        self.nautobot
            .find_device_by_id(device.id)
            .await?
            .ok_or_else(|| ControllerError::NotFound(format!("device {} vanished from Nautobot", device.id)))
    }

    /// Nautobot records of every switch in the topology, keyed by name.
    async fn switches(&self, topology: &Topology) -> Result<BTreeMap<String, SwitchRecord>, ControllerError> {
        let names: Vec<String> = topology.switch_names().into_iter().map(str::to_string).collect();
        let found: BTreeMap<String, SwitchRecord> = self
            .nautobot
            .find_switches(&names)
            .await?
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();

        if let Some(missing) = names.iter().find(|n| !found.contains_key(*n)) {
            return Err(ControllerError::NotFound(format!("switch {missing} in Nautobot")));
        }
        Ok(found)
    }

    async fn create_device(
        &self,
        chassis: &ChassisInfo,
        topology: &Topology,
        switches: &BTreeMap<String, SwitchRecord>,
    ) -> Result<NautobotDevice, ControllerError> {
        let name = chassis.device_name()?;
        let location = switches
            .values()
            .find_map(|s| s.location_id)
            .ok_or_else(|| ControllerError::NotFound("location of connected switches".to_string()))?;

        // The server lives in the rack of its redundant leaf pair
        let network_switches: Vec<&SwitchRecord> = topology
            .switches_in(VlanCategory::Network)
            .into_iter()
            .filter_map(|name| switches.get(name))
            .collect();
        let racks: Vec<&str> = network_switches.iter().filter_map(|s| s.rack_name.as_deref()).collect();
        if racks.windows(2).any(|w| w[0] != w[1]) {
            warn!("Network switches of {name} are in different racks {racks:?}, using the first");
        }
        let rack = network_switches
            .iter()
            .find_map(|s| s.rack_id)
            .ok_or_else(|| ControllerError::NotFound(format!("rack of the network switches of {name}")))?;

        let request = DeviceRequest {
            name: name.clone(),
            serial: chassis.serial_number.clone(),
            status: NameRef::new("Planned"),
            role: NameRef::new("server"),
            device_type: DeviceTypeRef {
                manufacturer: NameRef::new(chassis.manufacturer()?.as_str()),
                model: chassis.model_number.clone(),
            },
            location,
            rack,
        };

        info!("Creating Nautobot device {name}");
        match self.nautobot.create_device(&request).await {
            Ok(created) => info!("✅ Created device {name} ({})", created.id),
            Err(e) if e.is_idempotence_collision() => {
                info!("Device {name} was created concurrently, using the existing one");
            }
            Err(e) => return Err(e.into()),
        }

        self.nautobot
            .find_device_by_serial(&chassis.serial_number)
            .await?
            .ok_or_else(|| ControllerError::NotFound(format!("device with serial {}", chassis.serial_number)))
    }

    fn desired_interface_type(&self, interface: &InterfaceInfo) -> &str {
        if interface.is_bmc() {
            BMC_INTERFACE_TYPE
        } else {
            &self.interface_type
        }
    }

    /// Upsert one server interface; returns its current state.
    async fn ensure_interface(
        &self,
        device: &NautobotDevice,
        interface: &InterfaceInfo,
    ) -> Result<NautobotInterface, ControllerError> {
        if let Some(existing) = device.interface(&interface.name) {
            let patch = interface_patch(existing, interface, self.desired_interface_type(interface));
            if !patch.is_empty() {
                info!("Updating interface {} on {}: {:?}", interface.name, device.name, patch.keys());
                self.nautobot.update_interface(existing.id, &Value::Object(patch)).await?;
            }
            return Ok(existing.clone());
        }

        let request = InterfaceRequest {
            id: None,
            device: device.id,
            name: interface.name.clone(),
            interface_type: self.desired_interface_type(interface).to_string(),
            status: ACTIVE.to_string(),
            description: interface.description.clone(),
            mac_address: Some(interface.mac_address.clone()).filter(|m| !m.is_empty()),
        };
        let created = match self.nautobot.create_interface(&request).await {
            Ok(created) => {
                info!("Created interface {} on {}", interface.name, device.name);
                created
            }
            Err(e) if e.is_idempotence_collision() => {
                info!("Interface {} on {} was created concurrently", interface.name, device.name);
                let winner = self
                    .nautobot
                    .find_interface(&device.id.to_string(), &interface.name)
                    .await?
                    .ok_or(e)?;
                self.nautobot
                    .update_interface(winner.id, &interface_body(&request))
                    .await?
            }
            Err(e) => return Err(e.into()),
        };
        Ok(snapshot(&created))
    }

    /// Make sure exactly one cable joins `server` and the switch port of
    /// `connection`.
    async fn ensure_cable(
        &self,
        server: &NautobotInterface,
        switch: &SwitchRecord,
        connection: &Connection,
    ) -> Result<(), ControllerError> {
        let switch_interface = self
            .nautobot
            .find_interface(&switch.id.to_string(), &connection.switch_port_name)
            .await?
            .ok_or_else(|| {
                ControllerError::NotFound(format!("interface {} on switch {}", connection.switch_port_name, switch.name))
            })?;

        if server.neighbor_interface_id == Some(switch_interface.id) {
            debug!("Cable {} <-> {} {} already in place", server.name, switch.name, switch_interface.name);
            return Ok(());
        }

        info!(
            "Connecting {} to {} {}",
            server.name, connection.switch.name, connection.switch_port_name
        );
        self.attach_cable(server.id, server.cable_id, &switch_interface).await
    }

    /// Join `server_id` to `switch_interface` with a single cable, reusing
    /// the cable either end already has.
    pub(crate) async fn attach_cable(
        &self,
        server_id: Uuid,
        server_cable: Option<Uuid>,
        switch_interface: &Interface,
    ) -> Result<(), ControllerError> {
        let desired = CableRequest::between_interfaces(server_id, switch_interface.id);
        let switch_cable = switch_interface.cable.as_ref().map(|c| c.id);

        match (server_cable, switch_cable) {
            (Some(ours), Some(theirs)) if ours == theirs => {
                debug!("Cable {ours} already joins {server_id} and {}", switch_interface.name);
            }
            (Some(ours), Some(theirs)) => {
                // Both ends are cabled elsewhere; free the switch port first
                self.nautobot.delete_cable(theirs).await?;
                self.nautobot.update_cable(ours, &desired).await?;
            }
            (Some(cable), None) | (None, Some(cable)) => {
                self.nautobot.update_cable(cable, &desired).await?;
            }
            (None, None) => match self.nautobot.create_cable(&desired).await {
                Ok(cable) => debug!("Created cable {}", cable.id),
                Err(e) if e.is_idempotence_collision() => {
                    let Some(cable) = self
                        .nautobot
                        .get_interface(switch_interface.id)
                        .await?
                        .and_then(|i| i.cable)
                    else {
                        return Err(e.into());
                    };
                    self.nautobot.update_cable(cable.id, &desired).await?;
                }
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }

    /// Record the BMC address in IPAM and assign it to the BMC port.
    async fn ensure_ip_address(&self, interface: &NautobotInterface, address: &Ipv4Interface) -> Result<(), ControllerError> {
        let cidr = address.to_string();
        if interface.ip_address.as_deref() == Some(cidr.as_str()) {
            return Ok(());
        }

        let host = address.address.to_string();
        let ip = match self.nautobot.find_ip_address(&host).await? {
            Some(ip) => ip,
            None => self.create_ip_address(&host, address).await?,
        };

        if self
            .nautobot
            .find_ip_address_assignment(ip.id, interface.id)
            .await?
            .is_none()
        {
            info!("Assigning {} to {}", ip.address, interface.name);
            self.nautobot.assign_ip_address(ip.id, interface.id, false).await?;
        }
        Ok(())
    }

    async fn create_ip_address(&self, host: &str, address: &Ipv4Interface) -> Result<IpAddress, ControllerError> {
        let request = IpAddressRequest {
            address: host.to_string(),
            status: ACTIVE.to_string(),
            parent: ParentPrefix {
                prefix_type: "network".to_string(),
                prefix: address.network_cidr(),
            },
        };
        match self.nautobot.create_ip_address(&request).await {
            Ok(ip) => {
                info!("Created IP address {}", ip.address);
                Ok(ip)
            }
            Err(e) if e.is_idempotence_collision() => {
                Ok(self.nautobot.find_ip_address(host).await?.ok_or(e)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Fields of `existing` that differ from what `interface` says.
fn interface_patch(existing: &NautobotInterface, interface: &InterfaceInfo, interface_type: &str) -> Map<String, Value> {
    let mut patch = Map::new();
    if existing.interface_type != interface_type {
        patch.insert("type".to_string(), json!(interface_type));
    }
    if existing.description != interface.description {
        patch.insert("description".to_string(), json!(interface.description));
    }
    let mac_matches = match existing.mac_address.as_deref() {
        Some(mac) => mac.eq_ignore_ascii_case(&interface.mac_address),
        None => interface.mac_address.is_empty(),
    };
    if !mac_matches {
        patch.insert("mac_address".to_string(), json!(interface.mac_address));
    }
    if existing.status.as_deref() != Some(ACTIVE) {
        patch.insert("status".to_string(), json!({"name": ACTIVE}));
    }
    patch
}

fn interface_body(request: &InterfaceRequest) -> Value {
    json!({
        "type": request.interface_type,
        "description": request.description,
        "mac_address": request.mac_address,
        "status": {"name": request.status},
    })
}

/// GraphQL-shaped view of a freshly written interface.
fn snapshot(interface: &Interface) -> NautobotInterface {
    NautobotInterface {
        id: interface.id,
        name: interface.name.clone(),
        interface_type: interface.interface_type.clone(),
        description: interface.description.clone(),
        mac_address: interface.mac_address.clone(),
        status: interface.status.as_ref().and_then(|s| s.name.clone()),
        cable_id: interface.cable.as_ref().map(|c| c.id),
        ip_address: None,
        neighbor_interface_id: None,
        neighbor_interface_name: None,
        neighbor_device_id: None,
        neighbor_device_name: None,
        neighbor_location_name: None,
        neighbor_rack_name: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn existing() -> NautobotInterface {
        NautobotInterface {
            id: Uuid::new_v4(),
            name: "NIC.Slot.1-1".to_string(),
            interface_type: "25gbase-x-sfp28".to_string(),
            description: "NIC in Slot 1 Port 1".to_string(),
            mac_address: Some("14:23:f3:f5:25:f0".to_string()),
            status: Some("Active".to_string()),
            cable_id: None,
            ip_address: None,
            neighbor_interface_id: None,
            neighbor_interface_name: None,
            neighbor_device_id: None,
            neighbor_device_name: None,
            neighbor_location_name: None,
            neighbor_rack_name: None,
        }
    }

    #[test]
    fn test_interface_patch_ignores_mac_case() {
        let interface = InterfaceInfo::new("NIC.Slot.1-1", "NIC in Slot 1 Port 1", "14:23:F3:F5:25:F0");
        assert!(interface_patch(&existing(), &interface, "25gbase-x-sfp28").is_empty());
    }

    #[test]
    fn test_interface_patch_lists_changed_fields() {
        let interface = InterfaceInfo::new("NIC.Slot.1-1", "Embedded NIC", "14:23:F3:F5:25:F1");
        let mut current = existing();
        current.status = Some("Planned".to_string());

        let patch = interface_patch(&current, &interface, "100gbase-x-qsfp28");
        let mut keys: Vec<&str> = patch.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["description", "mac_address", "status", "type"]);
        assert_eq!(patch["status"], json!({"name": "Active"}));
    }
}

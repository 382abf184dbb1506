//! `baremetal.port.*` notifications
//!
//! Ironic ports are mirrored as Nautobot interfaces sharing the port's UUID,
//! cabled to the switch port named in `local_link_connection`.

use super::{Event, EventRouter, ignore_missing};
use crate::error::ControllerError;
use nautobot_client::{Interface, InterfaceRequest};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use uuid::Uuid;

const ACTIVE: &str = "Active";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LocalLinkConnection {
    #[serde(default)]
    pub port_id: Option<String>,
    #[serde(default)]
    pub switch_info: Option<String>,
    #[serde(default)]
    pub switch_id: Option<String>,
}

/// `ironic_object.data` of a port notification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortEvent {
    pub uuid: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub address: String,
    pub node_uuid: Uuid,
    #[serde(default)]
    pub local_link_connection: Option<LocalLinkConnection>,
}

impl PortEvent {
    pub fn from_event(event: &Event) -> Result<Self, ControllerError> {
        event.payload_field("ironic_object.data")
    }

    /// Nautobot interface name: the part after `<device>:`, the whole name
    /// when there is no prefix, or the UUID when the port has no name.
    pub fn interface_name(&self) -> String {
        match self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => match name.split_once(':') {
                Some((_, interface)) if !interface.is_empty() => interface.to_string(),
                _ => name.to_string(),
            },
            None => self.uuid.to_string(),
        }
    }

    /// Switch device and port to cable to, when both are known.
    pub fn remote(&self) -> Option<(&str, &str)> {
        let llc = self.local_link_connection.as_ref()?;
        match (llc.switch_info.as_deref(), llc.port_id.as_deref()) {
            (Some(switch), Some(port)) if !switch.is_empty() && !port.is_empty() => Some((switch, port)),
            _ => None,
        }
    }
}

impl EventRouter {
    pub(crate) async fn handle_port_upsert(&self, event: &Event) -> Result<(), ControllerError> {
        let port = PortEvent::from_event(event)?;
        let nautobot = self.reconciler.nautobot();
        let name = port.interface_name();
        let interface_type = self.reconciler.interface_type.as_str();

        let existing = match nautobot.get_interface(port.uuid).await? {
            Some(interface) => interface,
            None => {
                let request = InterfaceRequest {
                    id: Some(port.uuid),
                    device: port.node_uuid,
                    name: name.clone(),
                    interface_type: interface_type.to_string(),
                    status: ACTIVE.to_string(),
                    description: String::new(),
                    mac_address: Some(port.address.clone()),
                };
                info!("Creating interface {name} ({}) on {}", port.uuid, port.node_uuid);
                match nautobot.create_interface(&request).await {
                    Ok(created) => created,
                    Err(e) if e.is_idempotence_collision() => {
                        info!("Interface {} already exists, fetching", port.uuid);
                        nautobot
                            .get_interface(port.uuid)
                            .await?
                            .ok_or_else(|| ControllerError::NotFound(format!("interface {}", port.uuid)))?
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let patch = port_interface_patch(&existing, &port, &name, interface_type);
        if patch.is_empty() {
            debug!("Interface {} already matches the port", port.uuid);
        } else {
            info!("Updating interface {}: {:?}", port.uuid, patch.keys().collect::<Vec<_>>());
            nautobot.update_interface(port.uuid, &Value::Object(patch)).await?;
        }

        match port.remote() {
            Some((switch, switch_port)) => self.cable_port(&port, switch, switch_port).await,
            None => {
                debug!("No remote connection info for interface {}", port.uuid);
                Ok(())
            }
        }
    }

    async fn cable_port(&self, port: &PortEvent, switch: &str, switch_port: &str) -> Result<(), ControllerError> {
        let nautobot = self.reconciler.nautobot();
        let switch_interface = nautobot
            .find_interface(switch, switch_port)
            .await?
            .ok_or_else(|| ControllerError::NotFound(format!("interface {switch_port} on switch {switch}")))?;
        let server_cable = nautobot.get_interface(port.uuid).await?.and_then(|i| i.cable).map(|c| c.id);

        if server_cable.is_some() && server_cable == switch_interface.cable.as_ref().map(|c| c.id) {
            debug!("Interface {} already cabled to {switch}:{switch_port}", port.uuid);
            return Ok(());
        }
        info!("Cabling {} to {switch}:{switch_port}", port.uuid);
        self.reconciler
            .attach_cable(port.uuid, server_cable, &switch_interface)
            .await
    }

    pub(crate) async fn handle_port_delete(&self, event: &Event) -> Result<(), ControllerError> {
        let port = PortEvent::from_event(event)?;
        let nautobot = self.reconciler.nautobot();

        let Some(interface) = nautobot.get_interface(port.uuid).await? else {
            debug!("Interface {} not in Nautobot, nothing to delete", port.uuid);
            return Ok(());
        };
        if let Some(cable) = interface.cable {
            info!("Deleting cable {} of interface {}", cable.id, port.uuid);
            ignore_missing(nautobot.delete_cable(cable.id).await, "cable")?;
        }
        info!("Deleting interface {}", port.uuid);
        ignore_missing(nautobot.delete_interface(port.uuid).await, "interface")
    }
}

fn port_interface_patch(existing: &Interface, port: &PortEvent, name: &str, interface_type: &str) -> Map<String, Value> {
    let mut patch = Map::new();
    if existing.name != name {
        patch.insert("name".to_string(), json!(name));
    }
    if existing.interface_type != interface_type {
        patch.insert("type".to_string(), json!(interface_type));
    }
    if existing.status.as_ref().and_then(|s| s.name.as_deref()) != Some(ACTIVE) {
        patch.insert("status".to_string(), json!({"name": ACTIVE}));
    }
    if !existing
        .mac_address
        .as_deref()
        .is_some_and(|mac| mac.eq_ignore_ascii_case(&port.address))
    {
        patch.insert("mac_address".to_string(), json!(port.address));
    }
    if existing.device.id != port.node_uuid {
        patch.insert("device".to_string(), json!(port.node_uuid));
    }
    patch
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn port(name: Option<&str>) -> PortEvent {
        PortEvent {
            uuid: Uuid::parse_str("d8d5d4c8-4b6c-4e24-9d9a-3c6a0b9d4a11").unwrap(),
            name: name.map(str::to_string),
            address: "14:23:f3:f5:25:f0".to_string(),
            node_uuid: Uuid::new_v4(),
            local_link_connection: None,
        }
    }

    #[test]
    fn test_interface_name() {
        assert_eq!(port(Some("Dell-33GSW04:NIC.Slot.1-1")).interface_name(), "NIC.Slot.1-1");
        assert_eq!(port(Some("NIC.Slot.1-1")).interface_name(), "NIC.Slot.1-1");
        assert_eq!(port(Some("")).interface_name(), "d8d5d4c8-4b6c-4e24-9d9a-3c6a0b9d4a11");
        assert_eq!(port(None).interface_name(), "d8d5d4c8-4b6c-4e24-9d9a-3c6a0b9d4a11");
    }

    #[test]
    fn test_remote_needs_switch_and_port() {
        let mut event = port(None);
        assert_eq!(event.remote(), None);
        event.local_link_connection = Some(LocalLinkConnection {
            port_id: Some("Ethernet1/5".to_string()),
            switch_info: None,
            switch_id: Some("c4:7e:e0:e4:32:df".to_string()),
        });
        assert_eq!(event.remote(), None);
        event.local_link_connection.as_mut().unwrap().switch_info = Some("f20-2-2.iad3.rackspace.net".to_string());
        assert_eq!(event.remote(), Some(("f20-2-2.iad3.rackspace.net", "Ethernet1/5")));
    }
}

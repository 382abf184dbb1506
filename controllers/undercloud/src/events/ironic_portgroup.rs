//! `baremetal.portgroup.*` notifications, mirrored as LAG interfaces

use super::{Event, EventRouter, ignore_missing};
use crate::error::ControllerError;
use chassis::portgroup::lag_name;
use nautobot_client::InterfaceRequest;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use uuid::Uuid;

pub const LAG_INTERFACE_TYPE: &str = "lag";

/// `ironic_object.data` of a portgroup notification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PortgroupEvent {
    pub uuid: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    pub node_uuid: Uuid,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl PortgroupEvent {
    pub fn from_event(event: &Event) -> Result<Self, ControllerError> {
        event.payload_field("ironic_object.data")
    }

    pub fn lag_name(&self) -> String {
        lag_name(self.name.as_deref(), &self.uuid.to_string())
    }

    fn body(&self) -> Value {
        json!({
            "name": self.lag_name(),
            "type": LAG_INTERFACE_TYPE,
            "status": {"name": "Active"},
            "device": self.node_uuid,
        })
    }
}

impl EventRouter {
    pub(crate) async fn handle_portgroup_upsert(&self, event: &Event) -> Result<(), ControllerError> {
        let portgroup = PortgroupEvent::from_event(event)?;
        let nautobot = self.reconciler.nautobot();
        let name = portgroup.lag_name();

        if nautobot.get_interface(portgroup.uuid).await?.is_some() {
            info!("Updating LAG interface {name} ({})", portgroup.uuid);
            nautobot.update_interface(portgroup.uuid, &portgroup.body()).await?;
            return Ok(());
        }

        let request = InterfaceRequest {
            id: Some(portgroup.uuid),
            device: portgroup.node_uuid,
            name: name.clone(),
            interface_type: LAG_INTERFACE_TYPE.to_string(),
            status: "Active".to_string(),
            description: String::new(),
            mac_address: portgroup.address.clone().filter(|a| !a.is_empty()),
        };
        match nautobot.create_interface(&request).await {
            Ok(created) => {
                info!("Created LAG interface {name} ({})", created.id);
                Ok(())
            }
            Err(e) if e.is_idempotence_collision() => {
                // Lost the race; converge on the winner
                info!("LAG interface {name} was created concurrently, updating it");
                let winner = match nautobot.get_interface(portgroup.uuid).await? {
                    Some(interface) => interface,
                    None => nautobot
                        .find_interface(&portgroup.node_uuid.to_string(), &name)
                        .await?
                        .ok_or(e)?,
                };
                nautobot.update_interface(winner.id, &portgroup.body()).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) async fn handle_portgroup_delete(&self, event: &Event) -> Result<(), ControllerError> {
        let portgroup = PortgroupEvent::from_event(event)?;
        info!("Deleting LAG interface {}", portgroup.uuid);
        ignore_missing(
            self.reconciler.nautobot().delete_interface(portgroup.uuid).await,
            "LAG interface",
        )
    }
}

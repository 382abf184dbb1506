//! `baremetal.node.provision_set.end` notifications

use super::{Event, EventRouter};
use crate::error::ControllerError;
use crate::reconciler::provision_state::NodeState;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

/// `ironic_object.data` of a provision state change
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProvisionSetEvent {
    pub uuid: Uuid,
    pub provision_state: String,
    #[serde(default)]
    pub lessee: Option<String>,
    #[serde(default)]
    pub resource_class: Option<String>,
}

impl ProvisionSetEvent {
    pub fn from_event(event: &Event) -> Result<Self, ControllerError> {
        event.payload_field("ironic_object.data")
    }

    pub fn node_state(&self) -> NodeState {
        NodeState::new(self.provision_state.clone())
            .with_lessee(self.lessee.clone())
            .with_resource_class(self.resource_class.clone())
    }
}

impl EventRouter {
    pub(crate) async fn handle_provision_set(&self, event: &Event) -> Result<(), ControllerError> {
        let node = ProvisionSetEvent::from_event(event)?;
        info!("Node {} is now {:?}", node.uuid, node.provision_state);
        self.reconciler.sync_provision_state(node.uuid, &node.node_state()).await?;
        Ok(())
    }
}

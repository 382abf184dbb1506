//! Mirror of Ironic node state onto the Nautobot device

use super::Reconciler;
use crate::error::ControllerError;
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use uuid::Uuid;

pub const PROVISION_STATE_FIELD: &str = "ironic_provision_state";
pub const RESOURCE_CLASS_FIELD: &str = "resource_class";

/// Node state as Ironic reports it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeState {
    pub provision_state: String,
    /// Keystone project leasing the node
    pub lessee: Option<String>,
    pub resource_class: Option<String>,
}

impl NodeState {
    pub fn new(provision_state: impl Into<String>) -> Self {
        Self {
            provision_state: provision_state.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_lessee(mut self, lessee: Option<String>) -> Self {
        self.lessee = lessee.filter(|l| !l.is_empty());
        self
    }

    #[must_use]
    pub fn with_resource_class(mut self, resource_class: Option<String>) -> Self {
        self.resource_class = resource_class.filter(|r| !r.is_empty());
        self
    }
}

impl Reconciler {
    /// Copy `state` into the device's custom fields, status and tenant.
    ///
    /// Unknown provision states are rejected before anything is written.
    ///
    /// # Returns
    /// `true` when the device was patched
    pub async fn sync_provision_state(&self, device_id: Uuid, state: &NodeState) -> Result<bool, ControllerError> {
        let status = self.provision_states.translate(&state.provision_state)?;
        let tenant = state
            .lessee
            .as_deref()
            .map(|lessee| {
                Uuid::parse_str(lessee)
                    .map_err(|_| ControllerError::InvalidConfig(format!("lessee {lessee:?} is not a project UUID")))
            })
            .transpose()?;

        let device = self
            .nautobot
            .get_device(device_id)
            .await?
            .ok_or_else(|| ControllerError::NotFound(format!("Nautobot device {device_id}")))?;

        let mut custom_fields = Map::new();
        let provision_state = json!(state.provision_state);
        if device.custom_fields.get(PROVISION_STATE_FIELD) != Some(&provision_state) {
            custom_fields.insert(PROVISION_STATE_FIELD.to_string(), provision_state);
        }
        if let Some(resource_class) = &state.resource_class {
            let resource_class = json!(resource_class);
            if device.custom_fields.get(RESOURCE_CLASS_FIELD) != Some(&resource_class) {
                custom_fields.insert(RESOURCE_CLASS_FIELD.to_string(), resource_class);
            }
        }

        let mut patch = Map::new();
        if !custom_fields.is_empty() {
            patch.insert("custom_fields".to_string(), Value::Object(custom_fields));
        }
        if let Some(status) = status {
            let current = device.status.as_ref().and_then(|s| s.name.as_deref());
            if current != Some(status.as_str()) {
                patch.insert("status".to_string(), json!({ "name": status.as_str() }));
            }
        }
        if let Some(tenant) = tenant
            && device.tenant.as_ref().map(|t| t.id) != Some(tenant)
        {
            patch.insert("tenant".to_string(), json!(tenant));
        }

        if patch.is_empty() {
            debug!("Device {device_id} already reflects {:?}", state.provision_state);
            return Ok(false);
        }
        info!(
            "Updating device {device_id} for provision state {:?}: {:?}",
            state.provision_state,
            patch.keys().collect::<Vec<_>>()
        );
        self.nautobot.update_device(device_id, &Value::Object(patch)).await?;
        Ok(true)
    }
}

//! Reconciliation of Nautobot and Ironic against a physical server.
//!
//! This module is organized by target system:
//! - `nautobot`: device, interfaces, cables and BMC address from a `ChassisInfo`
//! - `ironic`: node and ports from the Nautobot device
//! - `provision_state`: Ironic provision state mirrored back into Nautobot
//! - `inspection`: both of the above driven by an inspection inventory
//!
//! Every operation reads first and writes only the fields that differ, so a
//! second run against an unchanged server performs no writes.

pub mod inspection;
pub mod ironic;
pub mod nautobot;
pub mod provision_state;

#[cfg(test)]
mod inspection_test;

use crate::config::DEFAULT_INTERFACE_TYPE;
use chassis::{ProvisionStateMap, SwitchRegistry};
use nautobot_client::NautobotClientTrait;
use openstack_client::IronicClientTrait;

/// Reconciles one server across Nautobot and Ironic.
pub struct Reconciler {
    pub(crate) nautobot: Box<dyn NautobotClientTrait>,
    pub(crate) ironic: Box<dyn IronicClientTrait>,
    pub(crate) registry: SwitchRegistry,
    pub(crate) provision_states: ProvisionStateMap,
    pub(crate) interface_type: String,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("nautobot", &self.nautobot.base_url())
            .field("interface_type", &self.interface_type)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(nautobot: Box<dyn NautobotClientTrait>, ironic: Box<dyn IronicClientTrait>) -> Self {
        Self {
            nautobot,
            ironic,
            registry: SwitchRegistry::default(),
            provision_states: ProvisionStateMap::default(),
            interface_type: DEFAULT_INTERFACE_TYPE.to_string(),
        }
    }

    #[must_use]
    pub fn with_registry(mut self, registry: SwitchRegistry) -> Self {
        self.registry = registry;
        self
    }

    #[must_use]
    pub fn with_provision_states(mut self, provision_states: ProvisionStateMap) -> Self {
        self.provision_states = provision_states;
        self
    }

    #[must_use]
    pub fn with_interface_type(mut self, interface_type: impl Into<String>) -> Self {
        self.interface_type = interface_type.into();
        self
    }

    pub fn nautobot(&self) -> &dyn NautobotClientTrait {
        self.nautobot.as_ref()
    }

    pub fn ironic(&self) -> &dyn IronicClientTrait {
        self.ironic.as_ref()
    }

    pub fn registry(&self) -> &SwitchRegistry {
        &self.registry
    }
}

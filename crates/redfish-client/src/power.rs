//! Power control of the computer system behind a BMC

use crate::bmc_trait::BmcTrait;
use crate::error::RedfishError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

/// Dell system resource
pub const SYSTEM_PATH: &str = "/redfish/v1/Systems/System.Embedded.1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerState {
    On,
    Off,
    PoweringOn,
    PoweringOff,
    #[serde(other)]
    Unknown,
}

/// `ResetType` values of `ComputerSystem.Reset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetType {
    On,
    ForceOff,
    GracefulShutdown,
    GracefulRestart,
    ForceRestart,
    PowerCycle,
}

/// Handle on one Redfish `ComputerSystem`
pub struct ComputerSystem<'a> {
    bmc: &'a dyn BmcTrait,
    path: String,
}

impl std::fmt::Debug for ComputerSystem<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputerSystem")
            .field("bmc", &self.bmc.ip_address())
            .field("path", &self.path)
            .finish()
    }
}

impl<'a> ComputerSystem<'a> {
    pub fn new(bmc: &'a dyn BmcTrait) -> Self {
        Self::at(bmc, SYSTEM_PATH)
    }

    pub fn at(bmc: &'a dyn BmcTrait, path: &str) -> Self {
        Self {
            bmc,
            path: path.trim_end_matches('/').to_string(),
        }
    }

    pub async fn power_state(&self) -> Result<PowerState, RedfishError> {
        let system = self.bmc.get(&self.path).await?;
        let state = system
            .get("PowerState")
            .cloned()
            .ok_or_else(|| RedfishError::MissingField {
                path: self.path.clone(),
                field: "PowerState".to_string(),
            })?;
        Ok(serde_json::from_value(state)?)
    }

    pub async fn reset(&self, reset_type: ResetType) -> Result<(), RedfishError> {
        let path = format!("{}/Actions/ComputerSystem.Reset", self.path);
        self.bmc.post(&path, &json!({"ResetType": reset_type})).await?;
        Ok(())
    }

    /// Powers the system on unless it already is.
    pub async fn power_on(&self) -> Result<(), RedfishError> {
        if self.power_state().await? == PowerState::On {
            return Ok(());
        }
        info!("Powering on server behind BMC {}", self.bmc.ip_address());
        self.reset(ResetType::On).await
    }
}

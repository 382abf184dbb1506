//! Ironic provision state → Nautobot device status
//!
//! Only some transitions change the Nautobot status. States that are valid
//! in Ironic but carry no status change translate to `None`; anything else
//! is rejected.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Every provision state of the Ironic state machine.
pub const IRONIC_STATES: &[&str] = &[
    "enroll",
    "verifying",
    "manageable",
    "inspecting",
    "inspect wait",
    "inspect failed",
    "cleaning",
    "clean wait",
    "clean failed",
    "available",
    "deploying",
    "wait call-back",
    "deploy failed",
    "active",
    "deleting",
    "error",
    "adopting",
    "rescuing",
    "rescue wait",
    "rescue failed",
    "rescue",
    "unrescuing",
    "unrescue failed",
    "servicing",
    "service wait",
    "service failed",
];

/// States that still allow node configuration changes.
pub const STATES_ALLOWING_UPDATES: &[&str] = &["enroll", "manageable"];

const DEFAULT_STATUS_MAP: &[(&str, NautobotStatus)] = &[
    ("active", NautobotStatus::Active),
    ("enroll", NautobotStatus::Planned),
    ("available", NautobotStatus::Inventory),
    ("deploy failed", NautobotStatus::Quarantine),
    ("error", NautobotStatus::Quarantine),
    ("rescue", NautobotStatus::Quarantine),
    ("rescue failed", NautobotStatus::Quarantine),
    ("unrescueing", NautobotStatus::Quarantine),
    ("manageable", NautobotStatus::Quarantine),
    ("cleaning", NautobotStatus::Quarantine),
    ("inspecting", NautobotStatus::Provisioning),
    ("deploying", NautobotStatus::Provisioning),
    ("deleting", NautobotStatus::Decom),
];

/// Nautobot device statuses driven by Ironic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NautobotStatus {
    Active,
    Planned,
    Inventory,
    Quarantine,
    Provisioning,
    Decom,
}

impl NautobotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Planned => "Planned",
            Self::Inventory => "Inventory",
            Self::Quarantine => "Quarantine",
            Self::Provisioning => "Provisioning",
            Self::Decom => "Decom",
        }
    }
}

impl fmt::Display for NautobotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionStateError {
    #[error("Unknown provision_state={0:?}")]
    Unknown(String),

    #[error("Invalid provision state map: {0}")]
    InvalidMap(String),
}

/// Returns true when Ironic allows the node to be reconfigured.
pub fn allows_updates(provision_state: &str) -> bool {
    STATES_ALLOWING_UPDATES.contains(&provision_state)
}

/// Table-driven translation; operators may override individual entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionStateMap {
    entries: BTreeMap<String, Option<NautobotStatus>>,
}

impl Default for ProvisionStateMap {
    fn default() -> Self {
        let mut entries: BTreeMap<String, Option<NautobotStatus>> =
            IRONIC_STATES.iter().map(|s| ((*s).to_string(), None)).collect();
        for (state, status) in DEFAULT_STATUS_MAP {
            entries.insert((*state).to_string(), Some(*status));
        }
        Self { entries }
    }
}

impl ProvisionStateMap {
    /// Applies overrides from YAML, e.g. `manageable: null` or `available: Active`.
    ///
    /// Only known states may be overridden.
    pub fn with_overrides_yaml(mut self, yaml: &str) -> Result<Self, ProvisionStateError> {
        let overrides: BTreeMap<String, Option<NautobotStatus>> =
            serde_yaml::from_str(yaml).map_err(|e| ProvisionStateError::InvalidMap(e.to_string()))?;
        for (state, status) in overrides {
            if !self.entries.contains_key(&state) {
                return Err(ProvisionStateError::Unknown(state));
            }
            self.entries.insert(state, status);
        }
        Ok(self)
    }

    /// Nautobot status for `provision_state`, `None` when unchanged.
    pub fn translate(&self, provision_state: &str) -> Result<Option<NautobotStatus>, ProvisionStateError> {
        self.entries
            .get(provision_state)
            .copied()
            .ok_or_else(|| ProvisionStateError::Unknown(provision_state.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table() {
        let map = ProvisionStateMap::default();
        assert_eq!(map.translate("active").unwrap(), Some(NautobotStatus::Active));
        assert_eq!(map.translate("enroll").unwrap(), Some(NautobotStatus::Planned));
        assert_eq!(map.translate("available").unwrap(), Some(NautobotStatus::Inventory));
        assert_eq!(map.translate("manageable").unwrap(), Some(NautobotStatus::Quarantine));
        assert_eq!(map.translate("unrescueing").unwrap(), Some(NautobotStatus::Quarantine));
        assert_eq!(map.translate("deploying").unwrap(), Some(NautobotStatus::Provisioning));
        assert_eq!(map.translate("deleting").unwrap(), Some(NautobotStatus::Decom));
        assert_eq!(map.translate("clean wait").unwrap(), None);
        assert_eq!(map.translate("inspect failed").unwrap(), None);
    }

    #[test]
    fn test_every_ironic_state_translates() {
        let map = ProvisionStateMap::default();
        for state in IRONIC_STATES {
            assert!(map.translate(state).is_ok(), "{state}");
        }
    }

    #[test]
    fn test_unknown_state_is_an_error() {
        let map = ProvisionStateMap::default();
        assert_eq!(
            map.translate("bogus"),
            Err(ProvisionStateError::Unknown("bogus".to_string()))
        );
        assert!(map.translate("Active").is_err());
        assert!(map.translate("").is_err());
    }

    #[test]
    fn test_overrides() {
        let map = ProvisionStateMap::default()
            .with_overrides_yaml("manageable: null\nservicing: Provisioning\n")
            .unwrap();
        assert_eq!(map.translate("manageable").unwrap(), None);
        assert_eq!(map.translate("servicing").unwrap(), Some(NautobotStatus::Provisioning));
        assert_eq!(map.translate("active").unwrap(), Some(NautobotStatus::Active));

        let err = ProvisionStateMap::default().with_overrides_yaml("made-up: Active\n").unwrap_err();
        assert_eq!(err, ProvisionStateError::Unknown("made-up".to_string()));
        assert!(ProvisionStateMap::default().with_overrides_yaml("active: Broken\n").is_err());
    }

    #[test]
    fn test_update_gate() {
        assert!(allows_updates("enroll"));
        assert!(allows_updates("manageable"));
        assert!(!allows_updates("active"));
        assert!(!allows_updates("available"));
    }
}

//! BIOS, DRAC and hostname convergence
//!
//! Each operation reads the current values, patches only what differs and
//! returns the changes it made, so a converged BMC sees no writes.

use crate::bmc_trait::BmcTrait;
use crate::chassis::{BMC_NIC_PATH, MANAGER_PATH};
use crate::error::RedfishError;
use crate::power::SYSTEM_PATH;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Marker in the BMC's reply when a BIOS job is already queued
const PENDING_JOB: &str = "Pending configuration values";

/// BIOS attributes required for HTTP/PXE boot from `pxe_interface`.
pub fn required_bios_settings(pxe_interface: &str) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([
        ("PxeDev1EnDis", json!("Enabled")),
        ("PxeDev1Interface", json!(pxe_interface)),
        ("HttpDev1EnDis", json!("Enabled")),
        ("HttpDev1Interface", json!(pxe_interface)),
        // ironic serves plain http from its own server
        ("HttpDev1TlsMode", json!("None")),
        ("TimeZone", json!("UTC")),
        ("InteractiveMode", json!("Disabled")),
    ])
}

/// Converges the BIOS attributes; changes apply on the next server boot.
///
/// Attributes this BIOS does not expose are logged and skipped. Returns
/// the attributes that were patched.
pub async fn update_bios_settings(
    bmc: &dyn BmcTrait,
    pxe_interface: &str,
) -> Result<BTreeMap<String, Value>, RedfishError> {
    let bios_path = format!("{SYSTEM_PATH}/Bios");
    let current = attributes(bmc, &bios_path).await?;

    let mut changes = BTreeMap::new();
    for (key, required) in required_bios_settings(pxe_interface) {
        match current.get(key) {
            None => warn!("BMC {} BIOS has no attribute {key}, skipping", bmc.ip_address()),
            Some(value) if *value == required => {}
            Some(_) => {
                changes.insert(key.to_string(), required);
            }
        }
    }

    if changes.is_empty() {
        info!("BMC {} all required BIOS settings present and correct", bmc.ip_address());
        return Ok(changes);
    }

    info!("BMC {} updating BIOS settings: {:?}", bmc.ip_address(), changes);
    let payload = json!({
        "@Redfish.SettingsApplyTime": {"ApplyTime": "OnReset"},
        "Attributes": changes,
    });
    match bmc.patch(&format!("{bios_path}/Settings"), &payload).await {
        Ok(_) => info!("BMC {} BIOS settings will be updated on next server boot", bmc.ip_address()),
        Err(RedfishError::Api { body, .. }) if body.contains(PENDING_JOB) => {
            info!("BMC {} BIOS settings job already queued, ignoring", bmc.ip_address());
        }
        Err(e) => return Err(e),
    }
    Ok(changes)
}

struct DracSetting {
    key: &'static str,
    // enum attributes read back as names but are written as ordinals
    expect: Value,
    new_value: Value,
}

fn drac_standard() -> [DracSetting; 5] {
    [
        DracSetting {
            key: "SNMP.1.AgentEnable",
            expect: json!("Enabled"),
            new_value: json!("1"),
        },
        DracSetting {
            key: "SNMP.1.SNMPProtocol",
            expect: json!("All"),
            new_value: json!("0"),
        },
        DracSetting {
            key: "SNMP.1.AgentCommunity",
            expect: json!("public"),
            new_value: json!("public"),
        },
        DracSetting {
            key: "SNMP.1.AlertPort",
            expect: json!(161),
            new_value: json!(161),
        },
        DracSetting {
            key: "SwitchConnectionView.1.Enable",
            expect: json!("Enabled"),
            new_value: json!("Enabled"),
        },
    ]
}

/// Converges the iDRAC SNMP and LLDP view attributes.
///
/// Every standard attribute must exist on the BMC. Returns the attributes
/// that were patched.
pub async fn update_drac_settings(bmc: &dyn BmcTrait) -> Result<BTreeMap<String, Value>, RedfishError> {
    let path = format!("{MANAGER_PATH}/Attributes");
    let current = attributes(bmc, &path).await?;

    let standard = drac_standard();
    if let Some(missing) = standard.iter().find(|s| !current.contains_key(s.key)) {
        return Err(RedfishError::MissingField {
            path,
            field: missing.key.to_string(),
        });
    }

    let changes: BTreeMap<String, Value> = standard
        .iter()
        .filter(|s| current.get(s.key) != Some(&s.expect))
        .map(|s| (s.key.to_string(), s.new_value.clone()))
        .collect();

    if changes.is_empty() {
        info!("BMC {} all required DRAC settings present and correct", bmc.ip_address());
        return Ok(changes);
    }

    for setting in standard.iter().filter(|s| changes.contains_key(s.key)) {
        info!("  {}: {}->{}", setting.key, current[setting.key], setting.expect);
    }
    bmc.patch(&path, &json!({"Attributes": changes})).await?;
    info!("BMC {} DRAC settings have been updated", bmc.ip_address());
    Ok(changes)
}

/// Sets the BMC hostname unless it already is `new_name`.
///
/// Returns true when a change was made.
pub async fn set_hostname(bmc: &dyn BmcTrait, current_name: Option<&str>, new_name: &str) -> Result<bool, RedfishError> {
    if new_name.is_empty() {
        return Err(RedfishError::InvalidInput("BMC hostname must not be empty".to_string()));
    }
    if current_name == Some(new_name) {
        info!("BMC hostname is already set to {new_name}");
        return Ok(false);
    }

    info!(
        "Changing BMC hostname from {} to {new_name}",
        current_name.unwrap_or("<unset>")
    );
    bmc.patch(BMC_NIC_PATH, &json!({"HostName": new_name})).await?;
    Ok(true)
}

async fn attributes(bmc: &dyn BmcTrait, path: &str) -> Result<Map<String, Value>, RedfishError> {
    match bmc.get(path).await?.get_mut("Attributes").map(Value::take) {
        Some(Value::Object(attributes)) => Ok(attributes),
        _ => Err(RedfishError::MissingField {
            path: path.to_string(),
            field: "Attributes".to_string(),
        }),
    }
}

//! Switch-port preparation for one server interface, followed by an
//! Undersync push of the switch's VLAN group.

use crate::error::ControllerError;
use clap::ValueEnum;
use nautobot_client::NautobotClientTrait;
use serde_json::{Value, json};
use tracing::{debug, info};
use undersync_client::{SyncMode, UndersyncTrait};
use uuid::Uuid;

/// Switch interface status while a server PXE boots from it
pub const PROVISIONING_STATUS: &str = "Provisioning-Interface";

/// Which network the server interface moves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NetworkName {
    Tenant,
    Provisioning,
}

/// One `undersync-device` invocation
#[derive(Debug, Clone)]
pub struct DeviceNetworkRequest {
    pub interface_mac: String,
    pub network_name: NetworkName,
    /// UCVNI the interface joins on the tenant network
    pub network_id: Uuid,
    pub device_id: Option<Uuid>,
    pub mode: SyncMode,
}

/// Prepare the switch port in Nautobot, then push its VLAN group.
///
/// Nautobot failures surface as [`ControllerError::Nautobot`] (exit 1),
/// push failures as [`ControllerError::Undersync`] (exit 2).
pub async fn undersync_device(
    nautobot: &dyn NautobotClientTrait,
    undersync: &dyn UndersyncTrait,
    request: &DeviceNetworkRequest,
) -> Result<Value, ControllerError> {
    info!(
        "Updating Nautobot device_id={:?} interface_mac={} network_name={:?}",
        request.device_id, request.interface_mac, request.network_name
    );
    let vlan_group_id = match request.network_name {
        NetworkName::Tenant => {
            let prepared = nautobot
                .prep_switch_interface(request.network_id, &request.interface_mac)
                .await?;
            prepared.vlan_group_id
        }
        NetworkName::Provisioning => {
            let device_id = request.device_id.ok_or_else(|| {
                ControllerError::InvalidConfig("--device-id is required for the provisioning network".to_string())
            })?;
            prepare_for_provisioning(nautobot, device_id, &request.interface_mac).await?
        }
    };

    info!("Requesting Undersync {} of VLAN group {vlan_group_id}", request.mode.as_path());
    let response = undersync.sync_devices(&[vlan_group_id], request.mode).await?;
    info!("Undersync returned: {response}");
    Ok(response)
}

/// Mark the switch port cabled to the server interface with `mac` as
/// provisioning, returning the switch's VLAN group.
async fn prepare_for_provisioning(
    nautobot: &dyn NautobotClientTrait,
    device_id: Uuid,
    mac: &str,
) -> Result<Uuid, ControllerError> {
    let device = nautobot
        .find_device_by_id(device_id)
        .await?
        .ok_or_else(|| ControllerError::NotFound(format!("device {device_id}")))?;
    let interface = device
        .interface_by_mac(mac)
        .ok_or_else(|| ControllerError::NotFound(format!("interface with MAC {mac} on {}", device.name)))?;
    let (Some(switch_interface_id), Some(switch_id)) = (interface.neighbor_interface_id, interface.neighbor_device_id)
    else {
        return Err(ControllerError::NotFound(format!(
            "cable from {} {} to a switch",
            device.name, interface.name
        )));
    };

    let switch_interface = nautobot
        .get_interface(switch_interface_id)
        .await?
        .ok_or_else(|| ControllerError::NotFound(format!("switch interface {switch_interface_id}")))?;
    if switch_interface.status.as_ref().and_then(|s| s.name.as_deref()) == Some(PROVISIONING_STATUS) {
        debug!("Switch interface {} is already {PROVISIONING_STATUS}", switch_interface.name);
    } else {
        info!(
            "Setting {} {} to {PROVISIONING_STATUS}",
            interface.neighbor_device_name.as_deref().unwrap_or("switch"),
            switch_interface.name
        );
        nautobot
            .update_interface(switch_interface_id, &json!({"status": {"name": PROVISIONING_STATUS}}))
            .await?;
    }

    nautobot
        .switch_vlan_group_id(switch_id)
        .await?
        .ok_or_else(|| ControllerError::NotFound(format!("VLAN group of switch {switch_id}")))
}

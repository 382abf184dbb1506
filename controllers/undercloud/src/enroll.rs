//! Server enrollment
//!
//! Brings one server, identified by its BMC address, from "racked" to
//! "known to Nautobot and Ironic, switches configured":
//!
//! 1. BMC password rotated onto the standard password
//! 2. Chassis read over Redfish, waiting for LLDP to see the switches
//! 3. iDRAC, hostname and BIOS settings converged
//! 4. Nautobot device, interfaces, cables and BMC address reconciled
//! 5. Ironic node and ports reconciled
//! 6. Undersync pushes the network VLAN group
//!
//! Each step only starts after the previous one's writes landed, and a
//! rerun against an unchanged server performs no writes.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::reconciler::ironic::NodeSpec;
use chassis::flavor::{DeviceType, Machine, Matcher};
use chassis::pxe::guess_pxe_interface;
use chassis::{ChassisInfo, Manufacturer, VlanCategory, topology};
use redfish_client::credentials::{DEFAULT_LOGIN_DELAY, set_bmc_password};
use redfish_client::power::ComputerSystem;
use redfish_client::settings::{set_hostname, update_bios_settings, update_drac_settings};
use redfish_client::{BmcTrait, chassis_info};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use undersync_client::{SyncMode, UndersyncTrait};
use uuid::Uuid;

/// Distinct switches a healthy server sees: two leaves and the BMC switch
pub const REQUIRED_NEIGHBORS: usize = 3;
pub const DEFAULT_LLDP_ATTEMPTS: u32 = 6;
pub const DEFAULT_LLDP_INTERVAL: Duration = Duration::from_secs(30);

/// Knobs of one enrollment run
#[derive(Debug, Clone)]
pub struct EnrollOptions {
    /// Password to try before the factory defaults
    pub old_bmc_password: Option<String>,
    pub lldp_attempts: u32,
    pub lldp_interval: Duration,
    /// Pause between failed BMC logins
    pub login_delay: Duration,
    /// Device type library used to pick the Ironic resource class
    pub matcher: Matcher,
}

impl Default for EnrollOptions {
    fn default() -> Self {
        Self {
            old_bmc_password: None,
            lldp_attempts: DEFAULT_LLDP_ATTEMPTS,
            lldp_interval: DEFAULT_LLDP_INTERVAL,
            login_delay: DEFAULT_LOGIN_DELAY,
            matcher: Matcher::default(),
        }
    }
}

impl EnrollOptions {
    #[must_use]
    pub fn with_old_bmc_password(mut self, password: Option<String>) -> Self {
        self.old_bmc_password = password.filter(|p| !p.is_empty());
        self
    }

    /// Load the device type library below `dir`.
    #[must_use]
    pub fn with_device_types(mut self, dir: &Path) -> Self {
        let device_types = DeviceType::from_directory(dir);
        info!("Loaded {} device types from {}", device_types.len(), dir.display());
        self.matcher = Matcher::new(device_types);
        self
    }
}

/// Enroll the server behind `bmc`, returning its device UUID.
pub async fn enroll_server(
    bmc: &dyn BmcTrait,
    reconciler: &Reconciler,
    undersync: &dyn UndersyncTrait,
    options: &EnrollOptions,
) -> Result<Uuid, ControllerError> {
    info!("Enrolling server with BMC {}", bmc.ip_address());
    set_bmc_password(bmc, bmc.password(), options.old_bmc_password.as_deref(), options.login_delay).await?;

    let chassis = discover_chassis(bmc, options).await?;
    let manufacturer = chassis.manufacturer()?;
    let device_name = chassis.device_name()?;
    info!(
        "Discovered {device_name}: {} with {} interfaces",
        chassis.model_number,
        chassis.interfaces.len()
    );

    update_drac_settings(bmc).await?;
    set_hostname(bmc, chassis.bmc_hostname(), &device_name).await?;
    // A DRAC settings change can drop pending BIOS jobs, so BIOS goes last
    converge_bios(bmc, &chassis).await?;

    let device = reconciler.find_or_create(&chassis).await?;
    info!("Nautobot device {} is {}", device.name, device.id);

    let resource_class = options
        .matcher
        .matches(&Machine::from_chassis(&chassis))
        .map(|(_, rc)| rc.name.clone());
    if resource_class.is_none() && !options.matcher.is_empty() {
        warn!("No resource class matches {device_name}");
    }
    let spec = NodeSpec::new(&device, bmc, manufacturer).with_resource_class(resource_class);
    let node = reconciler.create_or_update_node(&spec).await?;
    info!("Ironic node {} is {}", node.uuid, node.provision_state);

    let ports = reconciler.sync_ports(device.id, false).await?;
    if !ports.is_noop() {
        info!(
            "Ironic ports: {} created, {} updated, {} deleted",
            ports.created.len(),
            ports.updated.len(),
            ports.deleted.len()
        );
    }

    let topology = topology::resolve(&chassis, reconciler.registry())?;
    let group_name = topology
        .vlan_group(VlanCategory::Network)
        .ok_or_else(|| ControllerError::NotFound(format!("network VLAN group for {device_name}")))?;
    let vlan_group = reconciler
        .nautobot()
        .find_vlan_group(group_name)
        .await?
        .ok_or_else(|| ControllerError::NotFound(format!("VLAN group {group_name}")))?;
    info!("Pushing switch configuration for VLAN group {} ({})", vlan_group.name, vlan_group.id);
    undersync.sync_devices(&[vlan_group.id], SyncMode::Sync).await?;

    info!("Enrollment of {} complete", bmc.ip_address());
    Ok(device.id)
}

/// Read the chassis until LLDP sees [`REQUIRED_NEIGHBORS`] switches.
///
/// A powered-off server has no link, so it is powered on after the first
/// read. Only Dell BMCs report LLDP neighbors.
pub async fn discover_chassis(bmc: &dyn BmcTrait, options: &EnrollOptions) -> Result<ChassisInfo, ControllerError> {
    let attempts = options.lldp_attempts.max(1);
    let mut found = 0;
    for attempt in 1..=attempts {
        let chassis = chassis_info(bmc).await?;
        let manufacturer = chassis.manufacturer()?;
        if manufacturer != Manufacturer::Dell {
            return Err(ControllerError::ManufacturerNotSupported(manufacturer.to_string()));
        }

        found = chassis.neighbors().len();
        if found >= REQUIRED_NEIGHBORS {
            return Ok(chassis);
        }
        info!("LLDP sees {found} of {REQUIRED_NEIGHBORS} switches (attempt {attempt}/{attempts})");

        if !chassis.power_on {
            ComputerSystem::new(bmc).power_on().await?;
        }
        if attempt < attempts {
            tokio::time::sleep(options.lldp_interval).await;
        }
    }
    Err(ControllerError::LldpUnderdiscovery { found, attempts })
}

async fn converge_bios(bmc: &dyn BmcTrait, chassis: &ChassisInfo) -> Result<BTreeMap<String, Value>, ControllerError> {
    let pxe = guess_pxe_interface(chassis)
        .ok_or_else(|| ControllerError::NotFound(format!("PXE interface on {}", chassis.serial_number)))?;
    info!("Selected {} as PXE interface", pxe.name);
    Ok(update_bios_settings(bmc, &pxe.name).await?)
}

/// Apply the standard BIOS settings to the server behind `bmc`.
///
/// Returns the attributes that changed; they take effect on the next boot.
pub async fn bios_settings(bmc: &dyn BmcTrait) -> Result<BTreeMap<String, Value>, ControllerError> {
    let chassis = chassis_info(bmc).await?;
    converge_bios(bmc, &chassis).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use redfish_client::MockBmc;
    use redfish_client::power::SYSTEM_PATH;
    use serde_json::json;

    const IP: &str = "10.46.96.156";
    const PASSWORD: &str = "f2FksaT0qcJuiT6XH4+G";

    fn lldp_path() -> String {
        format!("{SYSTEM_PATH}/NetworkPorts/Oem/Dell/DellSwitchConnections")
    }

    fn quick(attempts: u32) -> EnrollOptions {
        EnrollOptions {
            lldp_attempts: attempts,
            lldp_interval: Duration::ZERO,
            login_delay: Duration::ZERO,
            ..EnrollOptions::default()
        }
    }

    fn power_off(bmc: &MockBmc) {
        let mut system = bmc.resource(SYSTEM_PATH).unwrap();
        system["PowerState"] = json!("Off");
        bmc.set_resource(SYSTEM_PATH, system);
    }

    #[tokio::test]
    async fn test_discover_chassis_with_full_lldp() {
        let bmc = MockBmc::r7615(IP, PASSWORD);

        let chassis = discover_chassis(&bmc, &quick(1)).await.unwrap();

        assert_eq!(chassis.serial_number, "33GSW04");
        assert_eq!(chassis.neighbors().len(), REQUIRED_NEIGHBORS);
        assert_eq!(bmc.write_count(), 0);
    }

    #[tokio::test]
    async fn test_lldp_underdiscovery() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        bmc.set_resource(&lldp_path(), json!({"Members": []}));

        let err = discover_chassis(&bmc, &quick(3)).await.unwrap_err();

        assert!(matches!(err, ControllerError::LldpUnderdiscovery { found: 0, attempts: 3 }));
        assert_eq!(bmc.write_count(), 0);
    }

    #[tokio::test]
    async fn test_powered_off_server_is_started_and_polled_again() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        power_off(&bmc);
        let full = bmc.resource(&lldp_path()).unwrap();
        bmc.set_resource(&lldp_path(), json!({"Members": []}));
        bmc.push_resource(&lldp_path(), full);

        let chassis = discover_chassis(&bmc, &quick(2)).await.unwrap();

        assert!(chassis.power_on);
        let resets: Vec<_> = bmc
            .writes()
            .into_iter()
            .filter(|w| w.path.ends_with("ComputerSystem.Reset"))
            .collect();
        assert_eq!(resets.len(), 1);
        assert_eq!(resets[0].payload, Some(json!({"ResetType": "On"})));
    }

    #[tokio::test]
    async fn test_non_dell_is_rejected() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        let mut system = bmc.resource(SYSTEM_PATH).unwrap();
        system["Manufacturer"] = json!("HPE");
        bmc.set_resource(SYSTEM_PATH, system);

        let err = discover_chassis(&bmc, &quick(1)).await.unwrap_err();

        assert!(matches!(err, ControllerError::ManufacturerNotSupported(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_bios_settings_pick_integrated_port() {
        let bmc = MockBmc::r7615(IP, PASSWORD);

        let changed = bios_settings(&bmc).await.unwrap();

        assert_eq!(changed.get("PxeDev1Interface"), Some(&json!("NIC.Integrated.1-1")));
        assert_eq!(changed.get("HttpDev1Interface"), Some(&json!("NIC.Integrated.1-1")));
    }

    #[test]
    fn test_blank_old_password_is_ignored() {
        let options = EnrollOptions::default().with_old_bmc_password(Some(String::new()));
        assert_eq!(options.old_bmc_password, None);
        assert_eq!(options.lldp_attempts, DEFAULT_LLDP_ATTEMPTS);
        assert!(options.matcher.is_empty());
    }
}

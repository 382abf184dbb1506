//! Servers described by an Ironic inspection inventory instead of a BMC
//! crawl.
//!
//! The inventory is converted to a [`ChassisInfo`](chassis::ChassisInfo),
//! reconciled into Nautobot, and the node's ports are then synced from the
//! resulting device.

use super::Reconciler;
use super::ironic::PortSyncSummary;
use crate::error::ControllerError;
use chassis::ChassisError;
use chassis::inspection::{InspectionData, Inventory, chassis_info_from_inspection};
use nautobot_client::NautobotDevice;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Either the full inspection data or its bare `inventory` document
#[derive(Deserialize)]
#[serde(untagged)]
enum InventoryDocument {
    Wrapped(InspectionData),
    Bare(Inventory),
}

/// Parse an inspection document, with or without the `inventory` wrapper.
pub fn parse_inventory(raw: &str) -> Result<Inventory, ChassisError> {
    match serde_json::from_str(raw) {
        Ok(InventoryDocument::Wrapped(data)) => Ok(data.inventory),
        Ok(InventoryDocument::Bare(inventory)) => Ok(inventory),
        Err(e) => Err(ChassisError::Malformed(format!("inspection inventory: {e}"))),
    }
}

pub fn read_inventory(path: &Path) -> Result<Inventory, ControllerError> {
    info!("Reading inspection inventory from {}", path.display());
    Ok(parse_inventory(&std::fs::read_to_string(path)?)?)
}

impl Reconciler {
    /// Bring Nautobot and the node's Ironic ports in line with an
    /// inspection inventory.
    ///
    /// `dry_run` applies to the Ironic ports only; the Nautobot device is
    /// always reconciled since the port sync reads it back.
    pub async fn sync_inspected(
        &self,
        inventory: &Inventory,
        dry_run: bool,
    ) -> Result<(NautobotDevice, PortSyncSummary), ControllerError> {
        let chassis = chassis_info_from_inspection(inventory)?;
        info!(
            "Inspected {} {} with {} interfaces",
            chassis.manufacturer,
            chassis.serial_number,
            chassis.interfaces.len()
        );
        let device = self.find_or_create(&chassis).await?;
        let summary = self.sync_ports(device.id, dry_run).await?;
        Ok((device, summary))
    }
}

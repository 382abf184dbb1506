//! Ironic inspection payloads
//!
//! Converts the `inventory` document collected by the Ironic inspection agent
//! into a [`ChassisInfo`], and back. Interface names arrive as Linux kernel
//! names and are mapped onto Dell Redfish names; LLDP arrives as raw TLVs.

use crate::chassis_info::{normalize_mac, ChassisInfo, InterfaceInfo, Ipv4Interface, LldpNeighbor, Manufacturer};
use crate::error::ChassisError;
use crate::interface_name::{canonicalize_port_name, map_linux_names, redfish_to_linux};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use tracing::{debug, info};

/// Prefix length assumed for BMC addresses; inspection does not report it.
pub const BMC_PREFIX_LEN: u8 = 26;

const TLV_CHASSIS_ID: u8 = 1;
const TLV_PORT_ID: u8 = 2;
const TLV_PORT_DESCRIPTION: u8 = 4;
const CHASSIS_ID_SUBTYPE_MAC: u8 = 4;
const PORT_ID_SUBTYPE_INTERFACE_NAME: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionData {
    pub inventory: Inventory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub system_vendor: SystemVendor,
    #[serde(default)]
    pub bmc_address: Option<String>,
    #[serde(default)]
    pub bmc_mac: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    pub memory: Memory,
    pub cpu: Cpu,
    #[serde(default)]
    pub interfaces: Vec<InspectedInterface>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemVendor {
    pub manufacturer: String,
    pub product_name: String,
    pub serial_number: String,
    pub firmware: Firmware,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Firmware {
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub physical_mb: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cpu {
    pub model_name: String,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectedInterface {
    pub name: String,
    pub mac_address: String,
    #[serde(default)]
    pub driver: Option<String>,
    /// Raw TLVs as `[type, hex-encoded value]` pairs.
    #[serde(default)]
    pub lldp: Vec<(u8, String)>,
}

/// Decodes the chassis MAC and port name from raw LLDP TLVs.
///
/// Returns `None` unless both a MAC chassis-id and a port name are present.
pub fn parse_lldp(tlvs: &[(u8, String)]) -> Option<LldpNeighbor> {
    let mut mac = None;
    let mut port_id = None;
    let mut port_description = None;

    for (tlv_type, value) in tlvs {
        let data = match hex::decode(value) {
            Ok(data) if !data.is_empty() => data,
            Ok(_) => continue,
            Err(e) => {
                debug!("Failed to parse LLDP TLV type {tlv_type}: {e}");
                continue;
            }
        };
        match *tlv_type {
            TLV_CHASSIS_ID if data.len() == 7 && data[0] == CHASSIS_ID_SUBTYPE_MAC => {
                mac = Some(data[1..].iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(":"));
            }
            TLV_PORT_ID if data.len() > 1 => {
                port_id = Some(String::from_utf8_lossy(&data[1..]).into_owned());
            }
            TLV_PORT_DESCRIPTION => {
                port_description = Some(String::from_utf8_lossy(&data).into_owned());
            }
            _ => {}
        }
    }

    let port = port_id.or(port_description)?;
    Some(LldpNeighbor {
        switch_mac_address: mac?,
        switch_port_name: canonicalize_port_name(port.trim()),
        stale: false,
    })
}

/// Builds a [`ChassisInfo`] from an inspection inventory.
pub fn chassis_info_from_inspection(inventory: &Inventory) -> Result<ChassisInfo, ChassisError> {
    let hostname = inventory.hostname.clone();
    let bmc_address: Ipv4Addr = inventory
        .bmc_address
        .as_deref()
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            ChassisError::Malformed(format!(
                "bmc_address is required but not present in inventory for {}",
                hostname.as_deref().unwrap_or("unknown")
            ))
        })?
        .parse()
        .map_err(|_| ChassisError::InvalidIpv4(inventory.bmc_address.clone().unwrap_or_default()))?;
    let bmc_mac = inventory
        .bmc_mac
        .as_deref()
        .ok_or_else(|| ChassisError::Malformed("bmc_mac missing from inventory".to_string()))
        .and_then(normalize_mac)?;

    let mut bmc = InterfaceInfo::new("iDRAC", "Dedicated iDRAC interface", bmc_mac);
    bmc.hostname = hostname.clone();
    bmc.ipv4_address = Some(Ipv4Interface::new(bmc_address, BMC_PREFIX_LEN)?);

    let vendor = &inventory.system_vendor;
    let is_dell = matches!(Manufacturer::parse(&vendor.manufacturer), Ok(Manufacturer::Dell));
    let names = if is_dell {
        map_linux_names(inventory.interfaces.iter().map(|i| i.name.as_str()))?
    } else {
        inventory.interfaces.iter().map(|i| (i.name.clone(), i.name.clone())).collect()
    };

    let mut interfaces = vec![bmc];
    for inspected in &inventory.interfaces {
        let name = names.get(&inspected.name).cloned().unwrap_or_else(|| inspected.name.clone());
        let driver = inspected.driver.as_deref().unwrap_or("Unknown");
        let mut interface = InterfaceInfo::new(name, format!("{driver} interface"), normalize_mac(&inspected.mac_address)?);
        interface.hostname = hostname.clone();
        interface.neighbor = parse_lldp(&inspected.lldp);
        interfaces.push(interface);
    }

    let chassis = ChassisInfo {
        manufacturer: vendor.manufacturer.clone(),
        model_number: vendor
            .product_name
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
        serial_number: vendor.serial_number.clone(),
        bios_version: vendor.firmware.version.clone(),
        bmc_ip_address: bmc_address,
        interfaces,
        power_on: true,
        memory_gib: u32::try_from(inventory.memory.physical_mb / 1024).unwrap_or(u32::MAX),
        cpu: inventory.cpu.model_name.clone(),
        cpu_cores: inventory.cpu.count,
    };
    chassis.validate()?;

    info!(
        "Processed Ironic inspection data for {} ({}): {} interfaces, {} neighbors",
        hostname.as_deref().unwrap_or("unknown"),
        chassis.serial_number,
        chassis.interfaces.len(),
        chassis.neighbors().len()
    );
    Ok(chassis)
}

/// Renders `chassis` as the inventory an inspection of it would report.
///
/// The BMC port's own LLDP neighbour is not part of inspection data and is
/// dropped.
pub fn inspection_from_chassis(chassis: &ChassisInfo) -> Inventory {
    let is_dell = matches!(chassis.manufacturer(), Ok(Manufacturer::Dell));
    let interfaces = chassis
        .in_band_interfaces()
        .map(|interface| {
            let name = if is_dell {
                redfish_to_linux(&interface.name).unwrap_or_else(|| interface.name.clone())
            } else {
                interface.name.clone()
            };
            InspectedInterface {
                name,
                mac_address: interface.mac_address.to_lowercase(),
                driver: interface.description.strip_suffix(" interface").map(str::to_string),
                lldp: interface.neighbor.as_ref().map(encode_lldp).unwrap_or_default(),
            }
        })
        .collect();

    Inventory {
        system_vendor: SystemVendor {
            manufacturer: chassis.manufacturer.clone(),
            product_name: chassis.model_number.clone(),
            serial_number: chassis.serial_number.clone(),
            firmware: Firmware {
                version: chassis.bios_version.clone(),
            },
        },
        bmc_address: Some(chassis.bmc_ip_address.to_string()),
        bmc_mac: chassis.bmc_interface().map(|i| i.mac_address.to_lowercase()),
        hostname: chassis.bmc_hostname().map(str::to_string),
        memory: Memory {
            physical_mb: u64::from(chassis.memory_gib) * 1024,
        },
        cpu: Cpu {
            model_name: chassis.cpu.clone(),
            count: chassis.cpu_cores,
        },
        interfaces,
    }
}

fn encode_lldp(neighbor: &LldpNeighbor) -> Vec<(u8, String)> {
    let mut tlvs = Vec::new();
    if let Ok(mac) = hex::decode(neighbor.switch_mac_address.replace(':', "")) {
        let mut chassis_id = vec![CHASSIS_ID_SUBTYPE_MAC];
        chassis_id.extend(mac);
        tlvs.push((TLV_CHASSIS_ID, hex::encode(chassis_id)));
    }
    let mut port_id = vec![PORT_ID_SUBTYPE_INTERFACE_NAME];
    port_id.extend(neighbor.switch_port_name.as_bytes());
    tlvs.push((TLV_PORT_ID, hex::encode(port_id)));
    tlvs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const INVENTORY: &str = r#"{
        "inventory": {
            "system_vendor": {
                "manufacturer": "Dell Inc.",
                "product_name": "PowerEdge R7615 (SKU=0AF7;ModelName=PowerEdge R7615)",
                "serial_number": "33GSW04",
                "firmware": {"version": "1.6.10"}
            },
            "bmc_address": "10.46.96.156",
            "bmc_mac": "a8:3c:a5:35:43:86",
            "hostname": "33GSW04",
            "memory": {"physical_mb": 98304},
            "cpu": {"model_name": "AMD EPYC 9124 16-Core Processor", "count": 16},
            "interfaces": [
                {
                    "name": "eno3np0",
                    "mac_address": "d4:04:e6:4f:8d:b4",
                    "driver": "bnxt_en",
                    "lldp": [
                        [1, "04c47ee0e4107f"],
                        [2, "0545746865726e6574312f35"],
                        [5, "6632302d322d31"]
                    ]
                },
                {
                    "name": "ens2f0np0",
                    "mac_address": "14:23:f3:f5:25:f0",
                    "driver": "bnxt_en",
                    "lldp": [
                        [1, "04c47ee0e432df"],
                        [4, "457468312f36"]
                    ]
                },
                {"name": "lo", "mac_address": "00:00:00:00:00:01", "lldp": [[1, "zz"]]}
            ]
        }
    }"#;

    fn inventory() -> Inventory {
        serde_json::from_str::<InspectionData>(INVENTORY).unwrap().inventory
    }

    #[test]
    fn test_chassis_info_from_inspection() {
        let chassis = chassis_info_from_inspection(&inventory()).unwrap();
        assert_eq!(chassis.model_number, "PowerEdge R7615");
        assert_eq!(chassis.memory_gib, 96);
        assert_eq!(chassis.cpu_cores, 16);
        assert_eq!(chassis.bmc_interface().unwrap().ipv4_address.unwrap().to_string(), "10.46.96.156/26");
        assert_eq!(chassis.bmc_interface().unwrap().mac_address, "A8:3C:A5:35:43:86");

        let names: Vec<&str> = chassis.interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["iDRAC", "NIC.Integrated.1-1", "NIC.Slot.1-1", "lo"]);

        let integrated = &chassis.interfaces[1];
        assert_eq!(integrated.description, "bnxt_en interface");
        assert_eq!(integrated.remote_switch_mac_address(), Some("C4:7E:E0:E4:10:7F"));
        assert_eq!(integrated.remote_switch_port_name(), Some("Ethernet1/5"));

        // port description stands in for a missing port id
        assert_eq!(chassis.interfaces[2].remote_switch_port_name(), Some("Ethernet1/6"));
        assert_eq!(chassis.interfaces[3].neighbor, None);
        assert_eq!(chassis.interfaces[3].description, "Unknown interface");
    }

    #[test]
    fn test_missing_bmc_address() {
        let mut inventory = inventory();
        inventory.bmc_address = None;
        assert!(matches!(
            chassis_info_from_inspection(&inventory),
            Err(ChassisError::Malformed(_))
        ));
    }

    #[test]
    fn test_colliding_linux_names() {
        let mut inventory = inventory();
        inventory.interfaces[0].name = "ens3f0np0".to_string();
        assert!(matches!(
            chassis_info_from_inspection(&inventory),
            Err(ChassisError::DuplicateInterfaceName { .. })
        ));
    }

    #[test]
    fn test_non_dell_names_pass_through() {
        let mut inventory = inventory();
        inventory.system_vendor.manufacturer = "HPE".to_string();
        let chassis = chassis_info_from_inspection(&inventory).unwrap();
        assert_eq!(chassis.interfaces[1].name, "eno3np0");
    }

    #[test]
    fn test_round_trip() {
        let mut original = ChassisInfo {
            manufacturer: "Dell Inc.".to_string(),
            model_number: "PowerEdge R7615".to_string(),
            serial_number: "33GSW04".to_string(),
            bios_version: "1.6.10".to_string(),
            bmc_ip_address: Ipv4Addr::new(10, 46, 96, 156),
            interfaces: vec![
                InterfaceInfo::new("iDRAC", "Dedicated iDRAC interface", "A8:3C:A5:35:43:86"),
                InterfaceInfo::new("NIC.Integrated.1-1", "bnxt_en interface", "D4:04:E6:4F:8D:B4")
                    .with_neighbor("C4:7E:E0:E4:10:7F", "Ethernet1/5"),
                InterfaceInfo::new("NIC.Integrated.1-2", "bnxt_en interface", "D4:04:E6:4F:8D:B5")
                    .with_neighbor("C4:7E:E0:E4:32:DF", "Ethernet1/5"),
                InterfaceInfo::new("NIC.Slot.1-1", "bnxt_en interface", "14:23:F3:F5:25:F0")
                    .with_neighbor("C4:7E:E0:E4:32:DF", "Ethernet1/6"),
                InterfaceInfo::new("NIC.Slot.1-2", "bnxt_en interface", "14:23:F3:F5:25:F1")
                    .with_neighbor("C4:7E:E0:E4:10:7F", "Ethernet1/6"),
            ],
            power_on: true,
            memory_gib: 96,
            cpu: "AMD EPYC 9124 16-Core Processor".to_string(),
            cpu_cores: 16,
        };
        for interface in &mut original.interfaces {
            interface.hostname = Some("33GSW04".to_string());
        }
        original.interfaces[0].ipv4_address = Some(Ipv4Interface::new(original.bmc_ip_address, 26).unwrap());

        let inventory = inspection_from_chassis(&original);
        assert_eq!(inventory.interfaces[0].name, "eno3np0");
        assert_eq!(inventory.interfaces[3].name, "ens2f1np1");

        let round_tripped = chassis_info_from_inspection(&inventory).unwrap();
        assert_eq!(round_tripped, original);
    }
}

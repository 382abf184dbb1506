//! Chassis discovery over Redfish
//!
//! Crawls a fixed set of Dell resources and folds them into a
//! [`ChassisInfo`]:
//!
//! - the system resource (identity, power, memory, CPU)
//! - the manager's dedicated NIC (BMC port and its IPv4 configuration)
//! - the system's Ethernet interfaces (in-band NICs)
//! - `DellSwitchConnections` (LLDP neighbours)

use crate::bmc_trait::BmcTrait;
use crate::error::RedfishError;
use crate::power::SYSTEM_PATH;
use chassis::chassis_info::normalize_mac;
use chassis::interface_name::{canonical_server_interface_name, canonicalize_port_name};
use chassis::{ChassisInfo, InterfaceInfo, Ipv4Interface, LldpNeighbor, Manufacturer};
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Dell manager resource
pub const MANAGER_PATH: &str = "/redfish/v1/Managers/iDRAC.Embedded.1";
/// The manager's dedicated NIC
pub const BMC_NIC_PATH: &str = "/redfish/v1/Managers/iDRAC.Embedded.1/EthernetInterfaces/NIC.1";

const NO_NEIGHBOR: &[&str] = &["NOT AVAILABLE", "NO LINK", "NOT SUPPORTED"];

static IN_BAND_NIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^NIC\.(Integrated|Slot)\.\d+-\d+(-\d+)?$")
        .unwrap_or_else(|e| panic!("built-in pattern is invalid: {e}"))
});

/// Reads the chassis record of the server behind `bmc`.
pub async fn chassis_info(bmc: &dyn BmcTrait) -> Result<ChassisInfo, RedfishError> {
    let system = bmc.get(SYSTEM_PATH).await?;
    let manufacturer = Manufacturer::parse(&required_str(&system, SYSTEM_PATH, "Manufacturer")?)?;

    let mut interfaces = vec![bmc_interface(bmc, manufacturer).await?];
    interfaces.extend(in_band_interfaces(bmc).await?);

    if manufacturer == Manufacturer::Dell {
        let lldp = lldp_data_by_name(bmc).await?;
        for interface in &mut interfaces {
            match lldp.get(&interface.name) {
                Some(neighbor) => interface.neighbor = neighbor.clone(),
                None => info!(
                    "LLDP info from BMC is missing for {}, we only have LLDP info for {:?}",
                    interface.name,
                    lldp.keys().collect::<Vec<_>>()
                ),
            }
        }
    }

    let bmc_ip_address = bmc
        .ip_address()
        .parse::<Ipv4Addr>()
        .map_err(|_| RedfishError::InvalidInput(format!("BMC address {} is not IPv4", bmc.ip_address())))?;

    let chassis = ChassisInfo {
        manufacturer: manufacturer.as_str().to_string(),
        model_number: required_str(&system, SYSTEM_PATH, "Model")?,
        serial_number: required_str(&system, SYSTEM_PATH, "SKU")?,
        bios_version: required_str(&system, SYSTEM_PATH, "BiosVersion")?,
        bmc_ip_address,
        interfaces,
        power_on: system.get("PowerState").and_then(Value::as_str) == Some("On"),
        memory_gib: system
            .pointer("/MemorySummary/TotalSystemMemoryGiB")
            .and_then(Value::as_f64)
            .map_or(0, |gib| gib.round() as u32),
        cpu: system
            .pointer("/ProcessorSummary/Model")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        cpu_cores: system
            .pointer("/ProcessorSummary/CoreCount")
            .and_then(Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or_default(),
    };
    chassis.validate()?;
    Ok(chassis)
}

async fn bmc_interface(bmc: &dyn BmcTrait, manufacturer: Manufacturer) -> Result<InterfaceInfo, RedfishError> {
    let data = bmc.get(BMC_NIC_PATH).await?;
    let (name, description) = match manufacturer {
        Manufacturer::Dell => ("iDRAC", "Dedicated iDRAC interface".to_string()),
        Manufacturer::Hp => ("iLO", optional_str(&data, "Name").unwrap_or_default()),
    };
    let mac = optional_str(&data, "MACAddress").unwrap_or_default();
    let mut interface = InterfaceInfo::new(name, description, normalize_optional_mac(&mac)?);
    interface.hostname = optional_str(&data, "HostName").filter(|h| !h.is_empty());

    if let Some(ipv4) = data
        .get("IPv4Addresses")
        .and_then(Value::as_array)
        .and_then(|a| a.first())
    {
        let (address, netmask, gateway, dhcp) = parse_ipv4(ipv4)?;
        interface.ipv4_address = Some(Ipv4Interface::from_netmask(address, netmask)?);
        interface.ipv4_gateway = gateway;
        interface.dhcp = dhcp;
    }
    Ok(interface)
}

// Only the first configured address is considered.
fn parse_ipv4(data: &Value) -> Result<(Ipv4Addr, Ipv4Addr, Option<Ipv4Addr>, bool), RedfishError> {
    let parse = |field: &str| -> Result<Ipv4Addr, RedfishError> {
        let value = required_str(data, BMC_NIC_PATH, field)?;
        value
            .parse()
            .map_err(|_| RedfishError::Chassis(chassis::ChassisError::InvalidIpv4(value)))
    };
    let gateway = match optional_str(data, "Gateway") {
        Some(g) if !g.is_empty() => Some(parse("Gateway")?),
        _ => None,
    };
    let dhcp = optional_str(data, "AddressOrigin").as_deref() == Some("DHCP");
    Ok((parse("Address")?, parse("SubnetMask")?, gateway, dhcp))
}

/// In-band NICs of the system.
///
/// A partition (`NIC.Slot.1-1-1`) is used only when its base interface
/// (`NIC.Slot.1-1`) is not listed; names are canonicalized either way.
async fn in_band_interfaces(bmc: &dyn BmcTrait) -> Result<Vec<InterfaceInfo>, RedfishError> {
    let index_path = format!("{SYSTEM_PATH}/EthernetInterfaces/");
    let index = bmc.get(&index_path).await?;
    let urls = member_urls(&index, &index_path)?;

    let ids: Vec<(&str, &str)> = urls
        .iter()
        .map(|url| (url.as_str(), last_segment(url)))
        .filter(|(_, id)| IN_BAND_NIC.is_match(id))
        .collect();
    let all_ids: BTreeSet<&str> = ids.iter().map(|(_, id)| *id).collect();

    let mut seen = BTreeSet::new();
    let mut interfaces = Vec::new();
    for (url, id) in ids {
        if let Some(base) = partition_base(id) {
            if all_ids.contains(base) {
                debug!("Skipping partition {id}, {base} is listed");
                continue;
            }
        }
        let interface = interface_detail(bmc, url).await?;
        if seen.insert(interface.name.clone()) {
            interfaces.push(interface);
        }
    }
    Ok(interfaces)
}

async fn interface_detail(bmc: &dyn BmcTrait, path: &str) -> Result<InterfaceInfo, RedfishError> {
    let data = bmc.get(path).await?;
    let id = required_str(&data, path, "Id")?;
    let description = optional_str(&data, "Description")
        .filter(|d| !d.is_empty())
        .or_else(|| optional_str(&data, "Name"))
        .unwrap_or_default();
    let mac = optional_str(&data, "MACAddress").unwrap_or_default();
    let mut interface = InterfaceInfo::new(
        canonical_server_interface_name(&id),
        description,
        normalize_optional_mac(&mac)?,
    );
    interface.hostname = optional_str(&data, "HostName").filter(|h| !h.is_empty());
    Ok(interface)
}

/// LLDP neighbours keyed by canonical server interface name.
///
/// `None` means the BMC reported the port but has no neighbour for it.
async fn lldp_data_by_name(bmc: &dyn BmcTrait) -> Result<BTreeMap<String, Option<LldpNeighbor>>, RedfishError> {
    let path = format!("{SYSTEM_PATH}/NetworkPorts/Oem/Dell/DellSwitchConnections/");
    let data = bmc.get(&path).await?;
    let members = data
        .get("Members")
        .and_then(Value::as_array)
        .ok_or_else(|| missing(&path, "Members"))?;

    let mut lldp = BTreeMap::new();
    for member in members {
        // Some firmware only links the members
        let port = if member.get("Id").is_some() {
            member.clone()
        } else {
            match member.get("@odata.id").and_then(Value::as_str) {
                Some(url) => bmc.get(url).await?,
                None => continue,
            }
        };
        let id = required_str(&port, &path, "Id")?;
        lldp.insert(canonical_server_interface_name(&id), parse_lldp_port(&port)?);
    }
    Ok(lldp)
}

fn parse_lldp_port(port: &Value) -> Result<Option<LldpNeighbor>, RedfishError> {
    let mac = value_string(port.get("SwitchConnectionID")).to_uppercase();
    let port_name = value_string(port.get("SwitchPortConnectionID"));
    let stale = value_string(port.get("StaleData")) != "NotStale";

    if mac.is_empty() || NO_NEIGHBOR.contains(&mac.as_str()) {
        return Ok(None);
    }
    if port_name.is_empty() || NO_NEIGHBOR.contains(&port_name.to_uppercase().as_str()) {
        return Ok(None);
    }
    Ok(Some(LldpNeighbor {
        switch_mac_address: normalize_mac(&mac)?,
        switch_port_name: canonicalize_port_name(&port_name),
        stale,
    }))
}

fn member_urls(index: &Value, path: &str) -> Result<Vec<String>, RedfishError> {
    Ok(index
        .get("Members")
        .and_then(Value::as_array)
        .ok_or_else(|| missing(path, "Members"))?
        .iter()
        .filter_map(|m| m.get("@odata.id").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

// `NIC.Slot.1-1-1` -> `NIC.Slot.1-1`
fn partition_base(id: &str) -> Option<&str> {
    let partition = IN_BAND_NIC.captures(id)?.get(2)?;
    Some(&id[..partition.start()])
}

fn last_segment(url: &str) -> &str {
    url.trim_end_matches('/').rsplit('/').next().unwrap_or_default()
}

fn normalize_optional_mac(mac: &str) -> Result<String, RedfishError> {
    if mac.is_empty() {
        return Ok(String::new());
    }
    Ok(normalize_mac(mac)?)
}

fn value_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn optional_str(data: &Value, field: &str) -> Option<String> {
    data.get(field).and_then(Value::as_str).map(str::to_string)
}

fn required_str(data: &Value, path: &str, field: &str) -> Result<String, RedfishError> {
    optional_str(data, field).ok_or_else(|| missing(path, field))
}

fn missing(path: &str, field: &str) -> RedfishError {
    RedfishError::MissingField {
        path: path.to_string(),
        field: field.to_string(),
    }
}

//! Canonical chassis record
//!
//! A [`ChassisInfo`] is built once per enrollment run and never persisted.
//! Element 0 of [`ChassisInfo::interfaces`] is always the dedicated BMC port.

use crate::error::ChassisError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 host address together with its prefix length, e.g. `10.46.96.156/26`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ipv4Interface {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
}

impl Ipv4Interface {
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, ChassisError> {
        if prefix_len > 32 {
            return Err(ChassisError::InvalidIpv4(format!("{address}/{prefix_len}")));
        }
        Ok(Self { address, prefix_len })
    }

    /// Builds the interface from a dotted subnet mask such as `255.255.255.192`.
    pub fn from_netmask(address: Ipv4Addr, netmask: Ipv4Addr) -> Result<Self, ChassisError> {
        let bits = u32::from(netmask);
        let prefix_len = bits.leading_ones();
        if bits.checked_shl(prefix_len).unwrap_or(0) != 0 {
            return Err(ChassisError::InvalidIpv4(format!("{address} mask {netmask}")));
        }
        Self::new(address, u8::try_from(prefix_len).unwrap_or(32))
    }

    /// Network address of the enclosing prefix.
    pub fn network(&self) -> Ipv4Addr {
        let mask = u32::MAX.checked_shl(32 - u32::from(self.prefix_len)).unwrap_or(0);
        Ipv4Addr::from(u32::from(self.address) & mask)
    }

    /// The enclosing prefix in CIDR notation, e.g. `10.46.96.128/26`.
    pub fn network_cidr(&self) -> String {
        format!("{}/{}", self.network(), self.prefix_len)
    }
}

impl fmt::Display for Ipv4Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for Ipv4Interface {
    type Err = ChassisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s.split_once('/').unwrap_or((s, "32"));
        let address = addr
            .parse::<Ipv4Addr>()
            .map_err(|_| ChassisError::InvalidIpv4(s.to_string()))?;
        let prefix_len = len
            .parse::<u8>()
            .map_err(|_| ChassisError::InvalidIpv4(s.to_string()))?;
        Self::new(address, prefix_len)
    }
}

impl TryFrom<String> for Ipv4Interface {
    type Error = ChassisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Ipv4Interface> for String {
    fn from(value: Ipv4Interface) -> Self {
        value.to_string()
    }
}

/// LLDP neighbour as reported by the server side of a link.
///
/// Both fields are present or the neighbour is absent altogether.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LldpNeighbor {
    /// Upper-hex, colon separated chassis (or port) MAC of the switch.
    pub switch_mac_address: String,
    /// Cisco-expanded port name, e.g. `Ethernet1/5`.
    pub switch_port_name: String,
    #[serde(default)]
    pub stale: bool,
}

/// One physical port of a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub description: String,
    pub mac_address: String,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub ipv4_address: Option<Ipv4Interface>,
    #[serde(default)]
    pub ipv4_gateway: Option<Ipv4Addr>,
    #[serde(default)]
    pub dhcp: bool,
    #[serde(default)]
    pub neighbor: Option<LldpNeighbor>,
}

impl InterfaceInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>, mac_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            mac_address: mac_address.into(),
            hostname: None,
            ipv4_address: None,
            ipv4_gateway: None,
            dhcp: false,
            neighbor: None,
        }
    }

    #[must_use]
    pub fn with_neighbor(mut self, switch_mac_address: impl Into<String>, switch_port_name: impl Into<String>) -> Self {
        self.neighbor = Some(LldpNeighbor {
            switch_mac_address: switch_mac_address.into(),
            switch_port_name: switch_port_name.into(),
            stale: false,
        });
        self
    }

    pub fn remote_switch_mac_address(&self) -> Option<&str> {
        self.neighbor.as_ref().map(|n| n.switch_mac_address.as_str())
    }

    pub fn remote_switch_port_name(&self) -> Option<&str> {
        self.neighbor.as_ref().map(|n| n.switch_port_name.as_str())
    }

    /// True for the dedicated out-of-band management port.
    pub fn is_bmc(&self) -> bool {
        matches!(self.name.as_str(), "iDRAC" | "iLO")
    }
}

/// Server vendors we know how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Manufacturer {
    Dell,
    Hp,
}

impl Manufacturer {
    /// Normalizes a vendor string such as `Dell Inc.` or `HPE`.
    pub fn parse(name: &str) -> Result<Self, ChassisError> {
        let upper = name.to_uppercase();
        if upper.contains("DELL") {
            Ok(Self::Dell)
        } else if upper.contains("HP") {
            Ok(Self::Hp)
        } else {
            Err(ChassisError::UnsupportedManufacturer(name.to_string()))
        }
    }

    /// Short name as used in Nautobot and device names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dell => "Dell",
            Self::Hp => "HP",
        }
    }

    /// Ironic hardware type for this vendor.
    pub fn ironic_driver(self) -> &'static str {
        match self {
            Self::Dell => "idrac",
            Self::Hp => "redfish",
        }
    }

    /// Ironic inspect interface for this vendor.
    pub fn inspect_interface(self) -> &'static str {
        match self {
            Self::Dell => "idrac-redfish",
            Self::Hp => "redfish",
        }
    }
}

impl fmt::Display for Manufacturer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vendor-agnostic record of one physical server at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChassisInfo {
    pub manufacturer: String,
    pub model_number: String,
    pub serial_number: String,
    pub bios_version: String,
    pub bmc_ip_address: Ipv4Addr,
    pub interfaces: Vec<InterfaceInfo>,
    pub power_on: bool,
    pub memory_gib: u32,
    pub cpu: String,
    #[serde(default)]
    pub cpu_cores: u32,
}

impl ChassisInfo {
    /// Checks the structural invariants: at least one interface, unique MACs.
    pub fn validate(&self) -> Result<(), ChassisError> {
        if self.interfaces.is_empty() {
            return Err(ChassisError::NoInterfaces);
        }
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for interface in &self.interfaces {
            if interface.mac_address.is_empty() {
                continue;
            }
            if let Some(first) = seen.insert(&interface.mac_address, &interface.name) {
                return Err(ChassisError::DuplicateMac {
                    mac: interface.mac_address.clone(),
                    first: first.to_string(),
                    second: interface.name.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn bmc_interface(&self) -> Option<&InterfaceInfo> {
        self.interfaces.first()
    }

    /// Hostname the BMC currently reports for itself.
    pub fn bmc_hostname(&self) -> Option<&str> {
        self.bmc_interface().and_then(|i| i.hostname.as_deref())
    }

    pub fn manufacturer(&self) -> Result<Manufacturer, ChassisError> {
        Manufacturer::parse(&self.manufacturer)
    }

    /// `"<Manufacturer>-<Serial>"`, e.g. `Dell-33GSW04`.
    pub fn device_name(&self) -> Result<String, ChassisError> {
        Ok(format!("{}-{}", self.manufacturer()?, self.serial_number))
    }

    /// Distinct switch MACs seen over LLDP.
    pub fn neighbors(&self) -> BTreeSet<&str> {
        self.interfaces
            .iter()
            .filter_map(InterfaceInfo::remote_switch_mac_address)
            .collect()
    }

    pub fn in_band_interfaces(&self) -> impl Iterator<Item = &InterfaceInfo> {
        self.interfaces.iter().skip(1)
    }
}

/// Normalizes a MAC address to upper-hex, colon separated form.
///
/// Accepts colon or dash separated groups (short groups are zero padded)
/// and bare or dotted hex strings.
pub fn normalize_mac(mac: &str) -> Result<String, ChassisError> {
    let trimmed = mac.trim();
    let groups: Vec<&str> = trimmed.split([':', '-']).collect();
    let hex = if groups.len() == 6 {
        let mut out = String::with_capacity(12);
        for group in &groups {
            if group.is_empty() || group.len() > 2 {
                return Err(ChassisError::InvalidMac(mac.to_string()));
            }
            out.push_str(&format!("{group:0>2}"));
        }
        out
    } else {
        trimmed.chars().filter(|c| *c != '.').collect()
    };

    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ChassisError::InvalidMac(mac.to_string()));
    }

    let upper = hex.to_uppercase();
    let pairs: Vec<&str> = (0..12).step_by(2).map(|i| &upper[i..i + 2]).collect();
    Ok(pairs.join(":"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChassisInfo {
        ChassisInfo {
            manufacturer: "Dell Inc.".to_string(),
            model_number: "PowerEdge R7615".to_string(),
            serial_number: "33GSW04".to_string(),
            bios_version: "1.6.10".to_string(),
            bmc_ip_address: Ipv4Addr::new(10, 46, 96, 156),
            interfaces: vec![
                InterfaceInfo::new("iDRAC", "Dedicated iDRAC interface", "A8:3C:A5:35:43:86")
                    .with_neighbor("C4:4D:84:48:61:80", "GigabitEthernet1/0/3"),
                InterfaceInfo::new("NIC.Integrated.1-1", "Integrated NIC 1 Port 1", "D4:04:E6:4F:8D:B4")
                    .with_neighbor("C4:7E:E0:E4:10:7F", "Ethernet1/5"),
            ],
            power_on: true,
            memory_gib: 96,
            cpu_cores: 16,
            cpu: "AMD EPYC 9124 16-Core Processor".to_string(),
        }
    }

    #[test]
    fn test_device_name() {
        assert_eq!(sample().device_name().unwrap(), "Dell-33GSW04");
    }

    #[test]
    fn test_validate_rejects_duplicate_mac() {
        let mut chassis = sample();
        chassis.interfaces[1].mac_address = "A8:3C:A5:35:43:86".to_string();
        assert!(matches!(chassis.validate(), Err(ChassisError::DuplicateMac { .. })));
    }

    #[test]
    fn test_validate_rejects_empty() {
        let mut chassis = sample();
        chassis.interfaces.clear();
        assert_eq!(chassis.validate(), Err(ChassisError::NoInterfaces));
    }

    #[test]
    fn test_neighbors_are_distinct() {
        let mut chassis = sample();
        chassis.interfaces.push(
            InterfaceInfo::new("NIC.Slot.1-2", "", "14:23:F3:F5:25:F1").with_neighbor("C4:7E:E0:E4:10:7F", "Ethernet1/6"),
        );
        assert_eq!(chassis.neighbors().len(), 2);
    }

    #[test]
    fn test_manufacturer_parse() {
        assert_eq!(Manufacturer::parse("Dell Inc.").unwrap(), Manufacturer::Dell);
        assert_eq!(Manufacturer::parse("HPE").unwrap(), Manufacturer::Hp);
        assert!(Manufacturer::parse("Supermicro").is_err());
        assert_eq!(Manufacturer::Dell.ironic_driver(), "idrac");
        assert_eq!(Manufacturer::Hp.inspect_interface(), "redfish");
    }

    #[test]
    fn test_normalize_mac() {
        assert_eq!(normalize_mac("d4:4:e6:4f:8d:b4").unwrap(), "D4:04:E6:4F:8D:B4");
        assert_eq!(normalize_mac("d4-04-e6-4f-8d-b4").unwrap(), "D4:04:E6:4F:8D:B4");
        assert_eq!(normalize_mac("d404.e64f.8db4").unwrap(), "D4:04:E6:4F:8D:B4");
        assert!(normalize_mac("not a mac").is_err());
        assert!(normalize_mac("").is_err());
    }

    #[test]
    fn test_ipv4_interface() {
        let ip = Ipv4Interface::from_netmask(Ipv4Addr::new(10, 46, 96, 156), Ipv4Addr::new(255, 255, 255, 192)).unwrap();
        assert_eq!(ip.to_string(), "10.46.96.156/26");
        assert_eq!(ip.network_cidr(), "10.46.96.128/26");
        assert!(Ipv4Interface::from_netmask(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(255, 0, 255, 0)).is_err());
        assert_eq!("10.0.0.1/8".parse::<Ipv4Interface>().unwrap().network_cidr(), "10.0.0.0/8");
    }

    #[test]
    fn test_ipv4_interface_serde() {
        let ip: Ipv4Interface = serde_json::from_str("\"192.168.1.10/24\"").unwrap();
        assert_eq!(serde_json::to_string(&ip).unwrap(), "\"192.168.1.10/24\"");
    }
}

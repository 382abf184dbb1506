//! Switch registry and VLAN group naming convention
//!
//! Servers learn their switch over LLDP, and the iDRAC reports the switch's
//! MAC address rather than its hostname. Some Cisco Nexus switches report a
//! per-port MAC (base MAC + port number) instead of the chassis MAC, so a
//! lookup tries the reported MAC first and then the computed base MAC.

use crate::chassis_info::normalize_mac;
use crate::error::ChassisError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Built-in MAC → switch table.
const DEFAULT_SWITCHES: &[(&str, &str)] = &[
    ("C4:7E:E0:E3:EC:2B", "f20-1-1.iad3.rackspace.net"),
    ("C4:7E:E0:E4:2E:2F", "f20-1-2.iad3.rackspace.net"),
    ("C4:4D:84:48:7A:00", "f20-1-1d.iad3.rackspace.net"),
    ("C4:7E:E0:E4:10:7F", "f20-2-1.iad3.rackspace.net"),
    ("C4:7E:E0:E4:32:DF", "f20-2-2.iad3.rackspace.net"),
    ("C4:4D:84:48:61:80", "f20-2-1d.iad3.rackspace.net"),
    ("C4:7E:E0:E4:55:3F", "f20-3-1.iad3.rackspace.net"),
    ("C4:7E:E0:E4:03:37", "f20-3-2.iad3.rackspace.net"),
    ("C4:B3:6A:C8:33:80", "f20-3-1d.iad3.rackspace.net"),
    ("40:14:82:81:3E:E3", "f20-3-1f.iad3.rackspace.net"),
    ("C4:7E:E0:E7:A0:37", "f20-3-2f.iad3.rackspace.net"),
];

/// Switch-name suffix → VLAN group category. Longer suffixes are listed
/// before the ones they end with.
const VLAN_GROUP_SUFFIXES: &[(&str, VlanCategory)] = &[
    ("-1f", VlanCategory::Storage),
    ("-2f", VlanCategory::Storage),
    ("-3f", VlanCategory::StorageAppliance),
    ("-4f", VlanCategory::StorageAppliance),
    ("-1d", VlanCategory::Bmc),
    ("-1", VlanCategory::Network),
    ("-2", VlanCategory::Network),
];

/// Role of a VLAN group in the fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VlanCategory {
    Network,
    Storage,
    StorageAppliance,
    Bmc,
}

impl VlanCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Storage => "storage",
            Self::StorageAppliance => "storage-appliance",
            Self::Bmc => "bmc",
        }
    }
}

impl fmt::Display for VlanCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fabric switch as resolved from LLDP.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Switch {
    /// FQDN, e.g. `f20-2-1.iad3.rackspace.net`.
    pub name: String,
    pub vlan_group_name: Option<String>,
}

impl Switch {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let vlan_group_name = vlan_group_name(&name);
        Self { name, vlan_group_name }
    }

    /// Host part of the FQDN.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Second label of the FQDN, e.g. `iad3`.
    pub fn data_center(&self) -> Option<&str> {
        self.name.split('.').nth(1).filter(|s| !s.is_empty())
    }

    /// Cabinet (rack) and category parsed from the naming convention.
    pub fn placement(&self) -> Option<(&str, VlanCategory)> {
        split_suffix(self.local_name())
    }
}

/// Static MAC → switch FQDN table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchRegistry {
    by_mac: BTreeMap<String, String>,
}

impl Default for SwitchRegistry {
    fn default() -> Self {
        Self {
            by_mac: DEFAULT_SWITCHES
                .iter()
                .map(|(mac, name)| ((*mac).to_string(), (*name).to_string()))
                .collect(),
        }
    }
}

impl SwitchRegistry {
    /// Builds a registry from arbitrary `(mac, fqdn)` pairs.
    pub fn from_entries<I, M, N>(entries: I) -> Result<Self, ChassisError>
    where
        I: IntoIterator<Item = (M, N)>,
        M: AsRef<str>,
        N: Into<String>,
    {
        let mut by_mac = BTreeMap::new();
        for (mac, name) in entries {
            by_mac.insert(normalize_mac(mac.as_ref())?, name.into());
        }
        Ok(Self { by_mac })
    }

    /// Loads a YAML mapping of `MAC: fqdn`.
    pub fn from_yaml(yaml: &str) -> Result<Self, ChassisError> {
        let raw: BTreeMap<String, String> =
            serde_yaml::from_str(yaml).map_err(|e| ChassisError::Malformed(format!("switch registry: {e}")))?;
        Self::from_entries(raw)
    }

    pub fn from_file(path: &Path) -> Result<Self, ChassisError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ChassisError::Malformed(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&yaml)
    }

    pub fn len(&self) -> usize {
        self.by_mac.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mac.is_empty()
    }

    pub fn switch_names(&self) -> impl Iterator<Item = &str> {
        self.by_mac.values().map(String::as_str)
    }

    pub fn get(&self, mac: &str) -> Option<&str> {
        self.by_mac.get(mac).map(String::as_str)
    }

    /// Chassis MAC registered for the switch named `name`.
    pub fn mac_for(&self, name: &str) -> Option<&str> {
        self.by_mac
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(mac, _)| mac.as_str())
    }

    /// Resolves an LLDP `(remote_mac, remote_port_name)` pair to a switch.
    pub fn switch_for_mac(&self, mac: &str, port_name: &str) -> Result<Switch, ChassisError> {
        let mac = normalize_mac(mac)?;
        let base = base_mac_offset(&mac, port_name)?;

        let direct = self.get(&mac);
        let via_base = self.get(&base);
        debug!("switch lookup {mac} / base {base}: {direct:?} / {via_base:?}");

        match (direct, via_base) {
            (Some(a), Some(b)) if a != b => Err(ChassisError::AmbiguousSwitch {
                port_name: port_name.to_string(),
                first: a.to_string(),
                second: b.to_string(),
            }),
            (Some(name), _) | (None, Some(name)) => Ok(Switch::new(name)),
            (None, None) => Err(ChassisError::UnknownSwitch {
                mac,
                base_mac: base,
                port_name: port_name.to_string(),
            }),
        }
    }
}

/// Subtracts the trailing port number of `port_name` from `mac`.
///
/// ```
/// use chassis::switch_registry::base_mac_offset;
/// assert_eq!(base_mac_offset("11:22:33:44:55:66", "Eth1/6").unwrap(), "11:22:33:44:55:60");
/// ```
pub fn base_mac_offset(mac: &str, port_name: &str) -> Result<String, ChassisError> {
    let digits: String = port_name
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let port_number: u64 = digits
        .parse()
        .map_err(|_| ChassisError::NonNumericPort(port_name.to_string()))?;

    let hex: String = mac.chars().filter(char::is_ascii_hexdigit).collect();
    let mac_number = u64::from_str_radix(&hex, 16).map_err(|_| ChassisError::InvalidMac(mac.to_string()))?;
    if hex.len() != 12 {
        return Err(ChassisError::InvalidMac(mac.to_string()));
    }
    let base = mac_number
        .checked_sub(port_number)
        .ok_or_else(|| ChassisError::InvalidMac(format!("{mac} minus {port_number}")))?;

    Ok(format_mac(base))
}

fn format_mac(value: u64) -> String {
    let hex = format!("{value:012X}");
    (0..12).step_by(2).map(|i| &hex[i..i + 2]).collect::<Vec<_>>().join(":")
}

fn local_part(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

fn split_suffix(local: &str) -> Option<(&str, VlanCategory)> {
    VLAN_GROUP_SUFFIXES.iter().find_map(|(suffix, category)| {
        local
            .strip_suffix(suffix)
            .filter(|cabinet| !cabinet.is_empty())
            .map(|cabinet| (cabinet, *category))
    })
}

/// VLAN group name for a switch, or `None` for an unknown suffix.
///
/// ```
/// use chassis::switch_registry::vlan_group_name;
/// assert_eq!(vlan_group_name("a1-1-1.abc1").as_deref(), Some("a1-1-network"));
/// assert_eq!(vlan_group_name("a1-1-9.abc1"), None);
/// ```
pub fn vlan_group_name(switch_name: &str) -> Option<String> {
    split_suffix(local_part(switch_name)).map(|(cabinet, category)| format!("{cabinet}-{category}"))
}

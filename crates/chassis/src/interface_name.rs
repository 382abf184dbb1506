//! Interface name canonicalization
//!
//! Switch ports are expanded to their Cisco canonical prefix (`Eth1/5` →
//! `Ethernet1/5`). Server ports are reduced to the Dell Redfish id without
//! the partition suffix (`NIC.Slot.1-1-1` → `NIC.Slot.1-1`). Linux kernel
//! names reported by Ironic inspection are mapped onto the same Redfish form.

use crate::error::ChassisError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Abbreviation → canonical prefix, matched in order against the lower-cased
/// name. Every canonical prefix maps back onto itself.
const PORT_ABBREVIATIONS: &[(&str, &str)] = &[
    ("bundle-e", "Bundle-Ether"),
    ("be", "Bundle-Ether"),
    ("e", "Ethernet"),
    ("fa", "FastEthernet"),
    ("four", "FourHundredGigE"),
    ("fo", "FortyGigabitEthernet"),
    ("gi", "GigabitEthernet"),
    ("hu", "HundredGigE"),
    ("te", "TenGigE"),
    ("tw", "TwentyFiveGigE"),
];

/// Linux names that never have a Redfish counterpart.
const SPECIAL_INTERFACES: &[&str] = &["idrac", "lo", "docker0", "virbr0"];

fn pattern(re: &str) -> Regex {
    Regex::new(re).unwrap_or_else(|e| panic!("built-in pattern {re} is invalid: {e}"))
}

static PARTITIONED_NIC: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"^(NIC\.(?:Integrated|Slot|Embedded)\.\d+-\d+)-\d+$"));
static LINUX_EMBEDDED: LazyLock<Regex> = LazyLock::new(|| pattern(r"^eno8(\d)03$"));
static LINUX_INTEGRATED_NP: LazyLock<Regex> = LazyLock::new(|| pattern(r"^eno(\d+)n?p(\d+)$"));
static LINUX_INTEGRATED: LazyLock<Regex> = LazyLock::new(|| pattern(r"^eno(\d+)$"));
static LINUX_SLOT: LazyLock<Regex> = LazyLock::new(|| pattern(r"^ens\d+f(\d+)n?p\d+$"));
static REDFISH_EMBEDDED: LazyLock<Regex> = LazyLock::new(|| pattern(r"^NIC\.Embedded\.(\d+)-1(?:-1)?$"));
static REDFISH_INTEGRATED: LazyLock<Regex> = LazyLock::new(|| pattern(r"^NIC\.Integrated\.1-(\d+)$"));
static REDFISH_SLOT: LazyLock<Regex> = LazyLock::new(|| pattern(r"^NIC\.Slot\.(\d+)-(\d+)$"));

/// Expands an abbreviated switch port name to its canonical form.
///
/// ```
/// use chassis::interface_name::canonicalize_port_name;
/// assert_eq!(canonicalize_port_name("Eth1/5"), "Ethernet1/5");
/// assert_eq!(canonicalize_port_name("gi1/0/3"), "GigabitEthernet1/0/3");
/// ```
pub fn canonicalize_port_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let Some((_, full)) = PORT_ABBREVIATIONS
        .iter()
        .find(|(abbreviation, _)| lower.starts_with(abbreviation))
    else {
        return name.to_string();
    };

    let prefix_len = name
        .find(|c: char| !(c.is_ascii_alphabetic() || c == '-'))
        .unwrap_or(name.len());
    format!("{full}{}", &name[prefix_len..])
}

/// Canonical server interface name for a Dell Redfish interface id.
pub fn canonical_server_interface_name(id: &str) -> String {
    if id.starts_with("iDRAC.Embedded") {
        return "iDRAC".to_string();
    }
    match PARTITIONED_NIC.captures(id) {
        Some(caps) => caps[1].to_string(),
        None => id.to_string(),
    }
}

/// Maps a Linux kernel interface name onto the Dell Redfish name.
///
/// Names that match none of the known patterns are returned unchanged.
pub fn linux_to_redfish(linux_name: &str) -> String {
    if SPECIAL_INTERFACES.contains(&linux_name) {
        return linux_name.to_string();
    }

    if let Some(n) = capture_number(&LINUX_EMBEDDED, linux_name, 1) {
        if n >= 3 {
            return format!("NIC.Embedded.{}-1-1", n - 2);
        }
    } else if let Some(slot) = capture_number(&LINUX_INTEGRATED_NP, linux_name, 1) {
        if slot >= 3 {
            return format!("NIC.Integrated.1-{}", slot - 2);
        }
    } else if let Some(n) = capture_number(&LINUX_INTEGRATED, linux_name, 1) {
        return format!("NIC.Integrated.1-{n}-1");
    } else if let Some(func) = capture_number(&LINUX_SLOT, linux_name, 1) {
        return format!("NIC.Slot.1-{}", func + 1);
    }

    linux_name.to_string()
}

/// Inverse of [`linux_to_redfish`] for the names it produces.
///
/// Returns `None` for Redfish names with no Linux counterpart.
pub fn redfish_to_linux(redfish_name: &str) -> Option<String> {
    if let Some(k) = capture_number(&REDFISH_EMBEDDED, redfish_name, 1) {
        return Some(format!("eno8{}03", k + 2));
    }
    if let Some(m) = capture_number(&REDFISH_INTEGRATED, redfish_name, 1) {
        return (m >= 1).then(|| format!("eno{}np{}", m + 2, m - 1));
    }
    if let Some(caps) = REDFISH_SLOT.captures(redfish_name) {
        let slot: u32 = caps[1].parse().ok()?;
        let port: u32 = caps[2].parse().ok()?;
        return (port >= 1).then(|| format!("ens{}f{}np{}", slot + 1, port - 1, port - 1));
    }
    None
}

/// Maps every Linux name of one chassis, rejecting two names that would
/// collapse onto the same Redfish name.
pub fn map_linux_names<'a, I>(linux_names: I) -> Result<BTreeMap<String, String>, ChassisError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut by_redfish: BTreeMap<String, String> = BTreeMap::new();
    let mut mapping = BTreeMap::new();
    for linux_name in linux_names {
        let redfish = canonical_server_interface_name(&linux_to_redfish(linux_name));
        if let Some(first) = by_redfish.insert(redfish.clone(), linux_name.to_string()) {
            return Err(ChassisError::DuplicateInterfaceName {
                redfish_name: redfish,
                first,
                second: linux_name.to_string(),
            });
        }
        mapping.insert(linux_name.to_string(), redfish);
    }
    Ok(mapping)
}

fn capture_number(re: &Regex, haystack: &str, group: usize) -> Option<u32> {
    re.captures(haystack)?.get(group)?.as_str().parse().ok()
}

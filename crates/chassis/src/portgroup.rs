//! Portgroup naming rules

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Inclusive range of port-channel numbers a portgroup may claim.
pub const PORT_CHANNEL_RANGE: std::ops::RangeInclusive<u16> = 100..=998;

static PORT_CHANNEL_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.+-port-channel(\d+)$").unwrap_or_else(|e| panic!("built-in pattern is invalid: {e}"))
});

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortgroupNameError {
    #[error("Portgroup name must not be empty")]
    Empty,

    #[error("Portgroup name {0:?} must match <node>-port-channel<number>")]
    Format(String),

    #[error("Portgroup name {name:?} uses port-channel {number}, allowed range is 100-998")]
    OutOfRange { name: String, number: u64 },
}

/// Validates a portgroup name and returns its port-channel number.
///
/// ```
/// use chassis::portgroup::validate_portgroup_name;
/// assert_eq!(validate_portgroup_name("server-1-port-channel101"), Ok(101));
/// assert!(validate_portgroup_name("server-1-port-channel999").is_err());
/// ```
pub fn validate_portgroup_name(name: &str) -> Result<u16, PortgroupNameError> {
    if name.trim().is_empty() {
        return Err(PortgroupNameError::Empty);
    }
    let caps = PORT_CHANNEL_NAME
        .captures(name)
        .ok_or_else(|| PortgroupNameError::Format(name.to_string()))?;
    let number: u64 = caps[1]
        .parse()
        .map_err(|_| PortgroupNameError::Format(name.to_string()))?;
    u16::try_from(number)
        .ok()
        .filter(|n| PORT_CHANNEL_RANGE.contains(n))
        .ok_or_else(|| PortgroupNameError::OutOfRange {
            name: name.to_string(),
            number,
        })
}

/// Nautobot LAG interface name for an Ironic portgroup.
///
/// Strips a `<node>_` prefix; names without an underscore are kept and a
/// missing name falls back to the portgroup UUID.
pub fn lag_name(portgroup_name: Option<&str>, portgroup_uuid: &str) -> String {
    match portgroup_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => match name.split_once('_') {
            Some((_, rest)) if !rest.is_empty() => rest.to_string(),
            _ => name.to_string(),
        },
        None => portgroup_uuid.to_string(),
    }
}

//! Error types for the chassis model

use thiserror::Error;

/// Errors raised while building or interpreting a [`crate::ChassisInfo`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChassisError {
    #[error("Invalid MAC address: {0}")]
    InvalidMac(String),

    #[error("Invalid IPv4 address: {0}")]
    InvalidIpv4(String),

    #[error("Need numeric interface, not {0:?}")]
    NonNumericPort(String),

    #[error(
        "We don't have a switch that matches the LLDP info reported by server BMC for {port_name}, \
         neither {mac}, or the calculated base mac {base_mac}"
    )]
    UnknownSwitch {
        mac: String,
        base_mac: String,
        port_name: String,
    },

    #[error("LLDP info for {port_name} matches two switches: {first} and {second}")]
    AmbiguousSwitch {
        port_name: String,
        first: String,
        second: String,
    },

    #[error("Server manufacturer {0} not supported")]
    UnsupportedManufacturer(String),

    #[error("Chassis has no interfaces")]
    NoInterfaces,

    #[error("Duplicate MAC address {mac} on interfaces {first} and {second}")]
    DuplicateMac {
        mac: String,
        first: String,
        second: String,
    },

    #[error("Interfaces {first} and {second} both map to {redfish_name}")]
    DuplicateInterfaceName {
        redfish_name: String,
        first: String,
        second: String,
    },

    #[error("Malformed data: {0}")]
    Malformed(String),
}

/// Cabling rule violations detected by [`crate::topology::resolve`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Connected switches span multiple data centers: {0:?}")]
    MultipleDataCenters(Vec<String>),

    #[error("Connected switches span more than two racks: {0:?}")]
    TooManyRacks(Vec<String>),

    #[error("Expected exactly two network switches, found {0:?}")]
    NetworkSwitchCount(Vec<String>),

    #[error("Switch {0} does not follow the VLAN group naming convention")]
    UnknownSwitchSuffix(String),

    #[error("No LLDP neighbours to resolve")]
    NoConnections,

    #[error(transparent)]
    Chassis(#[from] ChassisError),
}

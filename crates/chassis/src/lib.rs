//! Baremetal chassis model and topology conventions
//!
//! Pure, I/O-free building blocks shared by the enrollment and event
//! reconcilers:
//!
//! - [`ChassisInfo`] / [`InterfaceInfo`]: the vendor-agnostic record of one
//!   physical server, produced either from a Redfish crawl or from an Ironic
//!   inspection payload ([`inspection`]).
//! - [`interface_name`]: switch-port and server-interface canonicalization,
//!   including the Linux → Redfish name mapping.
//! - [`switch_registry`]: the MAC → switch table, the base-MAC offset rule and
//!   the VLAN-group naming convention.
//! - [`topology`]: per-chassis cabling assertions.
//! - [`pxe`], [`provision_state`], [`portgroup`], [`flavor`]: small policy
//!   tables used by the reconcilers.
//!
//! # Example
//!
//! ```
//! use chassis::switch_registry::{vlan_group_name, SwitchRegistry};
//!
//! let registry = SwitchRegistry::default();
//! let switch = registry
//!     .switch_for_mac("C4:7E:E0:E4:10:84", "Ethernet1/5")
//!     .unwrap();
//! assert_eq!(switch.name, "f20-2-1.iad3.rackspace.net");
//! assert_eq!(vlan_group_name(&switch.name).as_deref(), Some("f20-2-network"));
//! ```

pub mod chassis_info;
pub mod error;
pub mod flavor;
pub mod inspection;
pub mod interface_name;
pub mod portgroup;
pub mod provision_state;
pub mod pxe;
pub mod switch_registry;
pub mod topology;

pub use chassis_info::{ChassisInfo, InterfaceInfo, Ipv4Interface, LldpNeighbor, Manufacturer};
pub use error::{ChassisError, TopologyError};
pub use provision_state::{NautobotStatus, ProvisionStateMap};
pub use switch_registry::{Switch, SwitchRegistry, VlanCategory};
pub use topology::{Connection, Topology};

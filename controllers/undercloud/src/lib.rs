//! Undercloud Controller
//!
//! Keeps Nautobot, Ironic and the switch fabric consistent for bare-metal
//! servers:
//! - Enrollment: BMC credentials, Redfish discovery, BIOS/iDRAC settings,
//!   Nautobot device and cabling, Ironic node and ports, Undersync push
//! - Interface and provision-state sync between Ironic and Nautobot
//! - Oslo notification routing for Ironic, Neutron and Keystone changes
//! - Switch-port preparation for tenant and provisioning networks
//!
//! Every workflow is a single command run by Argo; the scheduler owns
//! retries, so each step is idempotent and safe to rerun.

pub mod argo;
pub mod config;
pub mod enroll;
pub mod error;
pub mod events;
pub mod reconciler;
pub mod undersync_device;

#[cfg(test)]
mod test_utils;

pub use config::{Config, GlobalArgs};
pub use error::{ControllerError, EventError};
pub use reconciler::Reconciler;

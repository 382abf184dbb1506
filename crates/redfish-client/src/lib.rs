//! Redfish BMC Client
//!
//! Talks to Dell iDRACs (and anything else speaking Redfish closely enough)
//! to bring a freshly racked server to a known state and describe it.
//!
//! # Example
//!
//! ```no_run
//! use redfish_client::{Bmc, chassis_info};
//! use redfish_client::credentials::{DEFAULT_LOGIN_DELAY, set_bmc_password};
//! use redfish_client::BmcTrait;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bmc = Bmc::for_ip_address("10.46.96.156", "master-secret")?;
//!
//! // Rotate factory credentials onto the standard password
//! set_bmc_password(&bmc, bmc.password(), None, DEFAULT_LOGIN_DELAY).await?;
//!
//! // Read identity, interfaces and LLDP neighbors
//! let info = chassis_info(&bmc).await?;
//! println!("{} has {} interfaces", info.device_name()?, info.interfaces.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **Standard passwords**: per-BMC password derived from a master secret
//! - **Credential rotation**: factory defaults are replaced on first contact
//! - **Chassis discovery**: identity, NICs and Dell LLDP switch connections
//! - **Settings convergence**: BIOS boot and iDRAC SNMP attributes, hostname
//! - **Power control**: power state and reset actions

pub mod chassis;
pub mod client;
pub mod credentials;
pub mod error;
pub mod password;
pub mod power;
pub mod settings;
#[path = "trait.rs"]
pub mod bmc_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use bmc_trait::{BmcTrait, Method, Session};
pub use chassis::chassis_info;
pub use client::Bmc;
pub use error::RedfishError;
pub use password::standard_password;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockBmc;

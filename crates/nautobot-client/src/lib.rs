//! Nautobot API Client
//!
//! A Rust client library for the parts of the Nautobot API the undercloud
//! reconcilers use: DCIM devices, interfaces and cables, IPAM addresses,
//! prefixes and namespaces, and the undercloud-vni plugin.
//!
//! # Example
//!
//! ```no_run
//! use nautobot_client::{NautobotClient, NautobotClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = NautobotClient::new(
//!     "http://nautobot-default.nautobot.svc.cluster.local".to_string(),
//!     "your-api-token".to_string(),
//! )?;
//!
//! // One GraphQL round trip for the device, its interfaces and neighbours
//! if let Some(device) = client.find_device_by_serial("33GSW04").await? {
//!     for interface in &device.interfaces {
//!         println!("{} -> {:?}", interface.name, interface.neighbor_device_name);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - **GraphQL reads**: a server with interfaces, cables and IPs in one query
//! - **REST writes**: typed request bodies for every object created
//! - **Race detection**: 400 "unique set" replies are recognisable as lost races
//! - **Pagination**: Support for fetching all pages of large result sets

pub mod client;
pub mod common;
pub mod error;
pub mod graphql;
pub mod models;
#[path = "trait.rs"]
pub mod nautobot_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::NautobotClient;
pub use common::{HttpClient, PaginatedResponse};
pub use error::NautobotError;
pub use graphql::{NautobotDevice, NautobotInterface, SwitchRecord};
pub use models::*;
pub use nautobot_trait::NautobotClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockNautobotClient;

//! OpenStack Client
//!
//! Keystone v3 password authentication driven by clouds.yaml, plus the small
//! slices of the Ironic and Keystone APIs the undercloud workflows need.
//!
//! # Example
//!
//! ```no_run
//! use openstack_client::{CloudConfig, Connection, IronicClientTrait, config};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cloud = CloudConfig::load(config::DEFAULT_CLOUD, &config::default_paths())?;
//! let conn = Connection::connect(&cloud).await?;
//! if let Some(node) = conn.ironic.get_node("Dell-33GSW04").await? {
//!     println!("{} is {}", node.uuid, node.provision_state);
//! }
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod common;
pub mod config;
pub mod error;
pub mod identity;
pub mod ironic;
pub mod models;
#[path = "trait.rs"]
pub mod openstack_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use auth::Session;
pub use config::CloudConfig;
pub use error::OpenStackError;
pub use identity::IdentityClient;
pub use ironic::{IRONIC_API_VERSION, IronicClient};
pub use models::*;
pub use openstack_trait::{IdentityClientTrait, IronicClientTrait};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockIdentityClient, MockIronicClient};

use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated clients for the services in one cloud
#[derive(Debug, Clone)]
pub struct Connection {
    pub ironic: IronicClient,
    pub identity: IdentityClient,
}

impl Connection {
    /// Authenticate against Keystone and resolve service endpoints from the catalog.
    pub async fn connect(cloud: &CloudConfig) -> Result<Self, OpenStackError> {
        let http = reqwest::Client::builder().timeout(DEFAULT_TIMEOUT).build()?;
        let session = Session::authenticate(http.clone(), cloud).await?;
        let ironic = IronicClient::new(http.clone(), &session.endpoint("baremetal")?, session.token.clone());
        let identity = IdentityClient::new(http, &session.endpoint("identity")?, session.token.clone());
        Ok(Self { ironic, identity })
    }
}

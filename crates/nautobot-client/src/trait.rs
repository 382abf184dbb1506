//! NautobotClient trait for mocking
//!
//! The reconcilers and event handlers only talk to Nautobot through this
//! trait, so tests can swap in [`crate::MockNautobotClient`].

use crate::error::NautobotError;
use crate::graphql::{NautobotDevice, SwitchRecord};
use crate::models::*;
use serde_json::Value;
use uuid::Uuid;

/// Trait for Nautobot API client operations
///
/// Reads of a whole server go through GraphQL; every write goes through REST.
/// Lookups that may legitimately miss return `Ok(None)`.
#[async_trait::async_trait]
pub trait NautobotClientTrait: Send + Sync {
    /// Get the base URL
    fn base_url(&self) -> &str;

    /// Validate the API token
    async fn validate_token(&self) -> Result<(), NautobotError>;

    // GraphQL reads
    async fn find_device_by_serial(&self, serial: &str) -> Result<Option<NautobotDevice>, NautobotError>;
    async fn find_device_by_id(&self, id: Uuid) -> Result<Option<NautobotDevice>, NautobotError>;
    /// Switch devices whose name is one of `names`
    async fn find_switches(&self, names: &[String]) -> Result<Vec<SwitchRecord>, NautobotError>;
    /// The VLAN group a switch belongs to (`rel_vlan_group_to_devices`)
    async fn switch_vlan_group_id(&self, switch_id: Uuid) -> Result<Option<Uuid>, NautobotError>;

    // DCIM Operations
    async fn get_device(&self, id: Uuid) -> Result<Option<Device>, NautobotError>;
    async fn create_device(&self, request: &DeviceRequest) -> Result<Device, NautobotError>;
    async fn update_device(&self, id: Uuid, patch: &Value) -> Result<Device, NautobotError>;
    async fn get_interface(&self, id: Uuid) -> Result<Option<Interface>, NautobotError>;
    /// Interface `name` on `device`, where `device` is a device UUID or name
    async fn find_interface(&self, device: &str, name: &str) -> Result<Option<Interface>, NautobotError>;
    async fn create_interface(&self, request: &InterfaceRequest) -> Result<Interface, NautobotError>;
    async fn update_interface(&self, id: Uuid, patch: &Value) -> Result<Interface, NautobotError>;
    async fn delete_interface(&self, id: Uuid) -> Result<(), NautobotError>;
    async fn get_cable(&self, id: Uuid) -> Result<Option<Cable>, NautobotError>;
    async fn create_cable(&self, request: &CableRequest) -> Result<Cable, NautobotError>;
    async fn update_cable(&self, id: Uuid, request: &CableRequest) -> Result<Cable, NautobotError>;
    async fn delete_cable(&self, id: Uuid) -> Result<(), NautobotError>;

    // IPAM Operations
    /// VLAN group by name, case-insensitive
    async fn find_vlan_group(&self, name: &str) -> Result<Option<VlanGroup>, NautobotError>;
    async fn find_ip_address(&self, host: &str) -> Result<Option<IpAddress>, NautobotError>;
    async fn create_ip_address(&self, request: &IpAddressRequest) -> Result<IpAddress, NautobotError>;
    async fn update_ip_address(&self, id: Uuid, patch: &Value) -> Result<IpAddress, NautobotError>;
    async fn find_ip_address_assignment(&self, ip_address_id: Uuid, interface_id: Uuid) -> Result<Option<IpAddressToInterface>, NautobotError>;
    async fn assign_ip_address(&self, ip_address_id: Uuid, interface_id: Uuid, is_primary: bool) -> Result<IpAddressToInterface, NautobotError>;
    async fn get_prefix(&self, id: Uuid) -> Result<Option<Prefix>, NautobotError>;
    async fn prefixes_in_namespace(&self, namespace: &str) -> Result<Vec<Prefix>, NautobotError>;
    async fn create_prefix(&self, request: &PrefixRequest) -> Result<Prefix, NautobotError>;
    async fn update_prefix(&self, id: Uuid, patch: &Value) -> Result<Prefix, NautobotError>;
    async fn delete_prefix(&self, id: Uuid) -> Result<(), NautobotError>;
    async fn find_namespace(&self, name: &str) -> Result<Option<Namespace>, NautobotError>;
    async fn create_namespace(&self, name: &str) -> Result<Namespace, NautobotError>;
    async fn delete_namespace(&self, id: Uuid) -> Result<(), NautobotError>;

    // Plugin Operations
    async fn get_ucvni(&self, id: Uuid) -> Result<Option<Ucvni>, NautobotError>;
    async fn create_ucvni(&self, request: &UcvniRequest) -> Result<Ucvni, NautobotError>;
    async fn update_ucvni(&self, id: Uuid, patch: &Value) -> Result<Ucvni, NautobotError>;
    async fn delete_ucvni(&self, id: Uuid) -> Result<(), NautobotError>;

    /// Ask the undercloud-vni plugin to configure the switch port facing
    /// `server_interface_mac` for a tenant network.
    ///
    /// # Returns
    /// The plugin reply, carrying the VLAN group that needs an Undersync push
    async fn prep_switch_interface(&self, ucvni_id: Uuid, server_interface_mac: &str) -> Result<PrepSwitchInterfaceResponse, NautobotError>;
}

//! Mock NautobotClient for unit testing
//!
//! This module provides an in-memory implementation of NautobotClientTrait
//! that enforces the uniqueness rules the reconcilers depend on and records
//! every write attempt, so tests can assert "zero writes" on a rerun.
//!
//! The mock is organized into domain-specific modules:
//! - `dcim.rs` - devices, interfaces, cables
//! - `ipam.rs` - VLAN groups, IP addresses, prefixes, namespaces
//! - `plugins.rs` - undercloud-vni UCVNIs and switch interface preparation
//! - `graphql.rs` - flattened server and switch reads
//! - `helpers.rs` - nested references and error bodies

mod dcim;
mod graphql;
mod helpers;
mod ipam;
mod plugins;

use crate::error::NautobotError;
use crate::graphql::{NautobotDevice, SwitchRecord};
use crate::models::*;
use crate::nautobot_trait::NautobotClientTrait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Mock NautobotClient for testing
#[derive(Clone)]
pub struct MockNautobotClient {
    pub(crate) base_url: String,
    pub(crate) devices: Arc<Mutex<HashMap<Uuid, Device>>>,
    pub(crate) interfaces: Arc<Mutex<HashMap<Uuid, Interface>>>,
    pub(crate) cables: Arc<Mutex<HashMap<Uuid, Cable>>>,
    pub(crate) ip_addresses: Arc<Mutex<HashMap<Uuid, IpAddress>>>,
    pub(crate) ip_assignments: Arc<Mutex<HashMap<Uuid, IpAddressToInterface>>>,
    pub(crate) prefixes: Arc<Mutex<HashMap<Uuid, Prefix>>>,
    pub(crate) namespaces: Arc<Mutex<HashMap<Uuid, Namespace>>>,
    pub(crate) vlan_groups: Arc<Mutex<HashMap<Uuid, VlanGroup>>>,
    pub(crate) switch_vlan_groups: Arc<Mutex<HashMap<Uuid, Uuid>>>,
    pub(crate) ucvnis: Arc<Mutex<HashMap<Uuid, Ucvni>>>,
    pub(crate) locations: Arc<Mutex<HashMap<Uuid, String>>>,
    pub(crate) racks: Arc<Mutex<HashMap<Uuid, String>>>,
    // "POST dcim/interfaces" style log of every write attempt
    pub(crate) writes: Arc<Mutex<Vec<String>>>,
    // Endpoints whose next create is beaten by a concurrent writer
    pub(crate) races: Arc<Mutex<HashSet<String>>>,
    pub(crate) unavailable: Arc<Mutex<bool>>,
}

impl MockNautobotClient {
    /// Create a new mock client holding only the `Global` namespace
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Self {
            base_url: base_url.into(),
            devices: Arc::new(Mutex::new(HashMap::new())),
            interfaces: Arc::new(Mutex::new(HashMap::new())),
            cables: Arc::new(Mutex::new(HashMap::new())),
            ip_addresses: Arc::new(Mutex::new(HashMap::new())),
            ip_assignments: Arc::new(Mutex::new(HashMap::new())),
            prefixes: Arc::new(Mutex::new(HashMap::new())),
            namespaces: Arc::new(Mutex::new(HashMap::new())),
            vlan_groups: Arc::new(Mutex::new(HashMap::new())),
            switch_vlan_groups: Arc::new(Mutex::new(HashMap::new())),
            ucvnis: Arc::new(Mutex::new(HashMap::new())),
            locations: Arc::new(Mutex::new(HashMap::new())),
            racks: Arc::new(Mutex::new(HashMap::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            races: Arc::new(Mutex::new(HashSet::new())),
            unavailable: Arc::new(Mutex::new(false)),
        };
        client.add_namespace("Global");
        client
    }

    /// Add a switch device placed in `location` / `rack` (for test setup)
    ///
    /// Locations and racks are created on first mention and reused by name.
    pub fn add_switch(&self, name: &str, location: &str, rack: &str) -> Uuid {
        let location_id = Self::id_for_name(&self.locations, location);
        let rack_id = Self::id_for_name(&self.racks, rack);
        let helpers = self.helpers();
        let device = Device {
            id: Uuid::new_v4(),
            name: Some(name.to_string()),
            serial: String::new(),
            status: Some(helpers.status("Active")),
            location: Some(helpers.nested("dcim/locations", "dcim.location", location_id, Some(location))),
            rack: Some(helpers.nested("dcim/racks", "dcim.rack", rack_id, Some(rack))),
            tenant: None,
            custom_fields: Map::new(),
        };
        let id = device.id;
        self.add_device(device);
        id
    }

    /// Add a device to the mock store (for test setup)
    pub fn add_device(&self, device: Device) {
        self.devices.lock().unwrap().insert(device.id, device);
    }

    /// Add an interface named `name` to `device_id` (for test setup)
    pub fn add_interface(&self, device_id: Uuid, name: &str, interface_type: &str) -> Uuid {
        let helpers = self.helpers();
        let interface = Interface {
            id: Uuid::new_v4(),
            name: name.to_string(),
            device: helpers.nested("dcim/devices", "dcim.device", device_id, None),
            interface_type: interface_type.to_string(),
            description: String::new(),
            mac_address: None,
            status: Some(helpers.status("Active")),
            cable: None,
        };
        let id = interface.id;
        self.interfaces.lock().unwrap().insert(id, interface);
        id
    }

    /// Add a connected cable between two interfaces (for test setup)
    pub fn add_cable(&self, a: Uuid, b: Uuid) -> Uuid {
        let cable = Cable {
            id: Uuid::new_v4(),
            termination_a_type: INTERFACE_OBJECT_TYPE.to_string(),
            termination_a_id: a,
            termination_b_type: INTERFACE_OBJECT_TYPE.to_string(),
            termination_b_id: b,
            status: Some(self.helpers().status("Connected")),
        };
        let id = cable.id;
        self.cables.lock().unwrap().insert(id, cable);
        id
    }

    /// Add a VLAN group (for test setup)
    pub fn add_vlan_group(&self, name: &str) -> Uuid {
        let group = VlanGroup {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        let id = group.id;
        self.vlan_groups.lock().unwrap().insert(id, group);
        id
    }

    /// Relate a switch to its VLAN group (for test setup)
    pub fn set_switch_vlan_group(&self, switch_id: Uuid, vlan_group_id: Uuid) {
        self.switch_vlan_groups.lock().unwrap().insert(switch_id, vlan_group_id);
    }

    /// Add an IPAM namespace (for test setup)
    pub fn add_namespace(&self, name: &str) -> Uuid {
        let namespace = Namespace {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        let id = namespace.id;
        self.namespaces.lock().unwrap().insert(id, namespace);
        id
    }

    /// Add a prefix to the mock store (for test setup)
    pub fn add_prefix(&self, prefix: Prefix) {
        self.prefixes.lock().unwrap().insert(prefix.id, prefix);
    }

    /// Add a UCVNI to the mock store (for test setup)
    pub fn add_ucvni(&self, ucvni: Ucvni) {
        self.ucvnis.lock().unwrap().insert(ucvni.id, ucvni);
    }

    /// Make the next create on `endpoint` (e.g. `dcim/interfaces`) lose a
    /// race: an identical object appears just before it lands.
    pub fn race_next_create(&self, endpoint: &str) {
        self.races.lock().unwrap().insert(endpoint.to_string());
    }

    /// Make every call fail as if Nautobot were down
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Every write attempted so far, e.g. `"PATCH dcim/interfaces"`
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn clear_writes(&self) {
        self.writes.lock().unwrap().clear();
    }

    pub fn device(&self, id: Uuid) -> Option<Device> {
        self.devices.lock().unwrap().get(&id).cloned()
    }

    pub fn device_named(&self, name: &str) -> Option<Device> {
        self.devices
            .lock()
            .unwrap()
            .values()
            .find(|d| d.name.as_deref() == Some(name))
            .cloned()
    }

    pub fn interface(&self, id: Uuid) -> Option<Interface> {
        self.interfaces
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .map(|i| dcim::with_cable(self, i))
    }

    /// Interfaces of a device, sorted by name
    pub fn interfaces_of(&self, device_id: Uuid) -> Vec<Interface> {
        let mut interfaces: Vec<Interface> = self
            .interfaces
            .lock()
            .unwrap()
            .values()
            .filter(|i| i.device.id == device_id)
            .cloned()
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name));
        interfaces
    }

    pub fn cables(&self) -> Vec<Cable> {
        self.cables.lock().unwrap().values().cloned().collect()
    }

    pub fn ip_addresses(&self) -> Vec<IpAddress> {
        self.ip_addresses.lock().unwrap().values().cloned().collect()
    }

    pub fn prefix(&self, id: Uuid) -> Option<Prefix> {
        self.prefixes.lock().unwrap().get(&id).cloned()
    }

    pub fn namespace_named(&self, name: &str) -> Option<Namespace> {
        self.namespaces.lock().unwrap().values().find(|n| n.name == name).cloned()
    }

    pub fn ucvni(&self, id: Uuid) -> Option<Ucvni> {
        self.ucvnis.lock().unwrap().get(&id).cloned()
    }

    pub(crate) fn helpers(&self) -> helpers::Helpers {
        helpers::Helpers::new(self.base_url.clone())
    }

    pub(crate) fn check_available(&self) -> Result<(), NautobotError> {
        if *self.unavailable.lock().unwrap() {
            return Err(NautobotError::Api("503 Service Unavailable".to_string()));
        }
        Ok(())
    }

    // Records a write attempt, failing first if Nautobot is down.
    pub(crate) fn record(&self, method: &str, endpoint: &str) -> Result<(), NautobotError> {
        self.check_available()?;
        self.writes.lock().unwrap().push(format!("{method} {endpoint}"));
        Ok(())
    }

    pub(crate) fn take_race(&self, endpoint: &str) -> bool {
        self.races.lock().unwrap().remove(endpoint)
    }

    fn id_for_name(store: &Arc<Mutex<HashMap<Uuid, String>>>, name: &str) -> Uuid {
        let mut store = store.lock().unwrap();
        if let Some((id, _)) = store.iter().find(|(_, n)| n.as_str() == name) {
            return *id;
        }
        let id = Uuid::new_v4();
        store.insert(id, name.to_string());
        id
    }
}

#[async_trait::async_trait]
impl NautobotClientTrait for MockNautobotClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn validate_token(&self) -> Result<(), NautobotError> {
        self.check_available()
    }

    async fn find_device_by_serial(&self, serial: &str) -> Result<Option<NautobotDevice>, NautobotError> {
        graphql::find_device_by_serial(self, serial)
    }

    async fn find_device_by_id(&self, id: Uuid) -> Result<Option<NautobotDevice>, NautobotError> {
        graphql::find_device_by_id(self, id)
    }

    async fn find_switches(&self, names: &[String]) -> Result<Vec<SwitchRecord>, NautobotError> {
        graphql::find_switches(self, names)
    }

    async fn switch_vlan_group_id(&self, switch_id: Uuid) -> Result<Option<Uuid>, NautobotError> {
        graphql::switch_vlan_group_id(self, switch_id)
    }

    async fn get_device(&self, id: Uuid) -> Result<Option<Device>, NautobotError> {
        dcim::get_device(self, id)
    }

    async fn create_device(&self, request: &DeviceRequest) -> Result<Device, NautobotError> {
        dcim::create_device(self, request)
    }

    async fn update_device(&self, id: Uuid, patch: &Value) -> Result<Device, NautobotError> {
        dcim::update_device(self, id, patch)
    }

    async fn get_interface(&self, id: Uuid) -> Result<Option<Interface>, NautobotError> {
        dcim::get_interface(self, id)
    }

    async fn find_interface(&self, device: &str, name: &str) -> Result<Option<Interface>, NautobotError> {
        dcim::find_interface(self, device, name)
    }

    async fn create_interface(&self, request: &InterfaceRequest) -> Result<Interface, NautobotError> {
        dcim::create_interface(self, request)
    }

    async fn update_interface(&self, id: Uuid, patch: &Value) -> Result<Interface, NautobotError> {
        dcim::update_interface(self, id, patch)
    }

    async fn delete_interface(&self, id: Uuid) -> Result<(), NautobotError> {
        dcim::delete_interface(self, id)
    }

    async fn get_cable(&self, id: Uuid) -> Result<Option<Cable>, NautobotError> {
        dcim::get_cable(self, id)
    }

    async fn create_cable(&self, request: &CableRequest) -> Result<Cable, NautobotError> {
        dcim::create_cable(self, request)
    }

    async fn update_cable(&self, id: Uuid, request: &CableRequest) -> Result<Cable, NautobotError> {
        dcim::update_cable(self, id, request)
    }

    async fn delete_cable(&self, id: Uuid) -> Result<(), NautobotError> {
        dcim::delete_cable(self, id)
    }

    async fn find_vlan_group(&self, name: &str) -> Result<Option<VlanGroup>, NautobotError> {
        ipam::find_vlan_group(self, name)
    }

    async fn find_ip_address(&self, host: &str) -> Result<Option<IpAddress>, NautobotError> {
        ipam::find_ip_address(self, host)
    }

    async fn create_ip_address(&self, request: &IpAddressRequest) -> Result<IpAddress, NautobotError> {
        ipam::create_ip_address(self, request)
    }

    async fn update_ip_address(&self, id: Uuid, patch: &Value) -> Result<IpAddress, NautobotError> {
        ipam::update_ip_address(self, id, patch)
    }

    async fn find_ip_address_assignment(&self, ip_address_id: Uuid, interface_id: Uuid) -> Result<Option<IpAddressToInterface>, NautobotError> {
        ipam::find_ip_address_assignment(self, ip_address_id, interface_id)
    }

    async fn assign_ip_address(&self, ip_address_id: Uuid, interface_id: Uuid, is_primary: bool) -> Result<IpAddressToInterface, NautobotError> {
        ipam::assign_ip_address(self, ip_address_id, interface_id, is_primary)
    }

    async fn get_prefix(&self, id: Uuid) -> Result<Option<Prefix>, NautobotError> {
        ipam::get_prefix(self, id)
    }

    async fn prefixes_in_namespace(&self, namespace: &str) -> Result<Vec<Prefix>, NautobotError> {
        ipam::prefixes_in_namespace(self, namespace)
    }

    async fn create_prefix(&self, request: &PrefixRequest) -> Result<Prefix, NautobotError> {
        ipam::create_prefix(self, request)
    }

    async fn update_prefix(&self, id: Uuid, patch: &Value) -> Result<Prefix, NautobotError> {
        ipam::update_prefix(self, id, patch)
    }

    async fn delete_prefix(&self, id: Uuid) -> Result<(), NautobotError> {
        ipam::delete_prefix(self, id)
    }

    async fn find_namespace(&self, name: &str) -> Result<Option<Namespace>, NautobotError> {
        ipam::find_namespace(self, name)
    }

    async fn create_namespace(&self, name: &str) -> Result<Namespace, NautobotError> {
        ipam::create_namespace(self, name)
    }

    async fn delete_namespace(&self, id: Uuid) -> Result<(), NautobotError> {
        ipam::delete_namespace(self, id)
    }

    async fn get_ucvni(&self, id: Uuid) -> Result<Option<Ucvni>, NautobotError> {
        plugins::get_ucvni(self, id)
    }

    async fn create_ucvni(&self, request: &UcvniRequest) -> Result<Ucvni, NautobotError> {
        plugins::create_ucvni(self, request)
    }

    async fn update_ucvni(&self, id: Uuid, patch: &Value) -> Result<Ucvni, NautobotError> {
        plugins::update_ucvni(self, id, patch)
    }

    async fn delete_ucvni(&self, id: Uuid) -> Result<(), NautobotError> {
        plugins::delete_ucvni(self, id)
    }

    async fn prep_switch_interface(&self, ucvni_id: Uuid, server_interface_mac: &str) -> Result<PrepSwitchInterfaceResponse, NautobotError> {
        plugins::prep_switch_interface(self, ucvni_id, server_interface_mac)
    }
}

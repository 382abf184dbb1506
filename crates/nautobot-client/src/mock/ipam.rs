//! IPAM operations for MockNautobotClient
//!
//! Handles VLAN groups, IP addresses and their interface assignments,
//! prefixes and namespaces

use super::MockNautobotClient;
use super::helpers::{already_exists, bad_request, name_of, not_found, unique_set, uuid_of};
use crate::error::NautobotError;
use crate::models::*;
use serde_json::{Value, json};
use uuid::Uuid;

const IP_ADDRESSES: &str = "ipam/ip-addresses";
const ASSIGNMENTS: &str = "ipam/ip-address-to-interface";
const PREFIXES: &str = "ipam/prefixes";
const NAMESPACES: &str = "ipam/namespaces";

fn host_part(address: &str) -> &str {
    address.split('/').next().unwrap_or(address)
}

pub fn find_vlan_group(client: &MockNautobotClient, name: &str) -> Result<Option<VlanGroup>, NautobotError> {
    client.check_available()?;
    Ok(client
        .vlan_groups
        .lock()
        .unwrap()
        .values()
        .find(|g| g.name.eq_ignore_ascii_case(name))
        .cloned())
}

pub fn find_ip_address(client: &MockNautobotClient, host: &str) -> Result<Option<IpAddress>, NautobotError> {
    client.check_available()?;
    let host = host_part(host);
    Ok(client
        .ip_addresses
        .lock()
        .unwrap()
        .values()
        .find(|ip| host_part(&ip.address) == host)
        .cloned())
}

pub fn create_ip_address(client: &MockNautobotClient, request: &IpAddressRequest) -> Result<IpAddress, NautobotError> {
    client.record("POST", IP_ADDRESSES)?;
    let host = host_part(&request.address).to_string();
    if find_ip_address(client, &host)?.is_some() {
        return Err(unique_set("POST", IP_ADDRESSES, "parent, host"));
    }
    let Some((_, mask)) = request.parent.prefix.split_once('/') else {
        return Err(bad_request("POST", IP_ADDRESSES, json!({"parent": ["Invalid prefix."]})));
    };
    let ip = IpAddress {
        id: Uuid::new_v4(),
        address: format!("{host}/{mask}"),
        host: Some(host),
        ip_type: Some("host".to_string()),
        status: Some(client.helpers().status(&request.status)),
    };
    client.ip_addresses.lock().unwrap().insert(ip.id, ip.clone());
    Ok(ip)
}

pub fn update_ip_address(client: &MockNautobotClient, id: Uuid, patch: &Value) -> Result<IpAddress, NautobotError> {
    client.record("PATCH", IP_ADDRESSES)?;
    let helpers = client.helpers();
    let mut ips = client.ip_addresses.lock().unwrap();
    let ip = ips.get_mut(&id).ok_or_else(|| not_found("IP address", id))?;
    if let Some(t) = patch.get("type").and_then(Value::as_str) {
        ip.ip_type = Some(t.to_string());
    }
    if let Some(status) = patch.get("status").and_then(name_of) {
        ip.status = Some(helpers.status(&status));
    }
    Ok(ip.clone())
}

pub fn find_ip_address_assignment(client: &MockNautobotClient, ip_address_id: Uuid, interface_id: Uuid) -> Result<Option<IpAddressToInterface>, NautobotError> {
    client.check_available()?;
    Ok(client
        .ip_assignments
        .lock()
        .unwrap()
        .values()
        .find(|a| a.ip_address.id == ip_address_id && a.interface.as_ref().map(|i| i.id) == Some(interface_id))
        .cloned())
}

pub fn assign_ip_address(client: &MockNautobotClient, ip_address_id: Uuid, interface_id: Uuid, is_primary: bool) -> Result<IpAddressToInterface, NautobotError> {
    client.record("POST", ASSIGNMENTS)?;
    if find_ip_address_assignment(client, ip_address_id, interface_id)?.is_some() {
        return Err(unique_set("POST", ASSIGNMENTS, "ip_address, interface"));
    }
    let helpers = client.helpers();
    let assignment = IpAddressToInterface {
        id: Uuid::new_v4(),
        ip_address: helpers.nested(IP_ADDRESSES, "ipam.ipaddress", ip_address_id, None),
        interface: Some(helpers.nested("dcim/interfaces", "dcim.interface", interface_id, None)),
        is_primary,
    };
    client.ip_assignments.lock().unwrap().insert(assignment.id, assignment.clone());
    Ok(assignment)
}

pub fn get_prefix(client: &MockNautobotClient, id: Uuid) -> Result<Option<Prefix>, NautobotError> {
    client.check_available()?;
    Ok(client.prefix(id))
}

pub fn prefixes_in_namespace(client: &MockNautobotClient, namespace: &str) -> Result<Vec<Prefix>, NautobotError> {
    client.check_available()?;
    let mut prefixes: Vec<Prefix> = client
        .prefixes
        .lock()
        .unwrap()
        .values()
        .filter(|p| p.namespace.as_ref().and_then(|n| n.name.as_deref()) == Some(namespace))
        .cloned()
        .collect();
    prefixes.sort_by(|a, b| a.prefix.cmp(&b.prefix));
    Ok(prefixes)
}

pub fn create_prefix(client: &MockNautobotClient, request: &PrefixRequest) -> Result<Prefix, NautobotError> {
    client.record("POST", PREFIXES)?;
    if client.take_race(PREFIXES) {
        insert_prefix(client, request)?;
    }
    insert_prefix(client, request)
}

fn insert_prefix(client: &MockNautobotClient, request: &PrefixRequest) -> Result<Prefix, NautobotError> {
    if client.prefix(request.id).is_some() {
        return Err(already_exists("POST", PREFIXES, "prefix", "id"));
    }
    let Some(namespace) = client.namespace_named(&request.namespace.name) else {
        return Err(bad_request("POST", PREFIXES, json!({"namespace": ["Related object not found."]})));
    };
    let helpers = client.helpers();
    let prefix = Prefix {
        id: request.id,
        prefix: request.prefix.clone(),
        namespace: Some(helpers.nested(NAMESPACES, "ipam.namespace", namespace.id, Some(&namespace.name))),
        status: Some(helpers.status(&request.status)),
        tenant: request
            .tenant
            .map(|t| helpers.nested("tenancy/tenants", "tenancy.tenant", t, None)),
    };
    client.add_prefix(prefix.clone());
    Ok(prefix)
}

pub fn update_prefix(client: &MockNautobotClient, id: Uuid, patch: &Value) -> Result<Prefix, NautobotError> {
    client.record("PATCH", PREFIXES)?;
    let namespace = match patch.get("namespace").and_then(name_of) {
        Some(name) => Some(
            client
                .namespace_named(&name)
                .ok_or_else(|| bad_request("PATCH", PREFIXES, json!({"namespace": ["Related object not found."]})))?,
        ),
        None => None,
    };
    let helpers = client.helpers();
    let mut prefixes = client.prefixes.lock().unwrap();
    let prefix = prefixes.get_mut(&id).ok_or_else(|| not_found("Prefix", id))?;
    if let Some(p) = patch.get("prefix").and_then(Value::as_str) {
        prefix.prefix = p.to_string();
    }
    if let Some(status) = patch.get("status").and_then(name_of) {
        prefix.status = Some(helpers.status(&status));
    }
    if let Some(tenant) = patch.get("tenant") {
        prefix.tenant = uuid_of(tenant).map(|t| helpers.nested("tenancy/tenants", "tenancy.tenant", t, None));
    }
    if let Some(namespace) = namespace {
        prefix.namespace = Some(helpers.nested(NAMESPACES, "ipam.namespace", namespace.id, Some(&namespace.name)));
    }
    Ok(prefix.clone())
}

pub fn delete_prefix(client: &MockNautobotClient, id: Uuid) -> Result<(), NautobotError> {
    client.record("DELETE", PREFIXES)?;
    client
        .prefixes
        .lock()
        .unwrap()
        .remove(&id)
        .map(|_| ())
        .ok_or_else(|| not_found("Prefix", id))
}

pub fn find_namespace(client: &MockNautobotClient, name: &str) -> Result<Option<Namespace>, NautobotError> {
    client.check_available()?;
    Ok(client.namespace_named(name))
}

pub fn create_namespace(client: &MockNautobotClient, name: &str) -> Result<Namespace, NautobotError> {
    client.record("POST", NAMESPACES)?;
    if client.namespace_named(name).is_some() {
        return Err(already_exists("POST", NAMESPACES, "namespace", "name"));
    }
    let id = client.add_namespace(name);
    Ok(Namespace {
        id,
        name: name.to_string(),
    })
}

pub fn delete_namespace(client: &MockNautobotClient, id: Uuid) -> Result<(), NautobotError> {
    client.record("DELETE", NAMESPACES)?;
    let in_use = client
        .prefixes
        .lock()
        .unwrap()
        .values()
        .any(|p| p.namespace.as_ref().map(|n| n.id) == Some(id));
    if in_use {
        return Err(NautobotError::Api(format!(
            "DELETE /api/{NAMESPACES}/{id}/ failed: 409 Conflict - namespace is referenced by prefixes"
        )));
    }
    client
        .namespaces
        .lock()
        .unwrap()
        .remove(&id)
        .map(|_| ())
        .ok_or_else(|| not_found("Namespace", id))
}

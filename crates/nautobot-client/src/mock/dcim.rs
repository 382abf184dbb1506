//! DCIM operations for MockNautobotClient
//!
//! Handles devices, interfaces and cables

use super::MockNautobotClient;
use super::helpers::{already_exists, bad_request, name_of, not_found, unique_set, uuid_of};
use crate::error::NautobotError;
use crate::models::*;
use serde_json::{Value, json};
use uuid::Uuid;

const DEVICES: &str = "dcim/devices";
const INTERFACES: &str = "dcim/interfaces";
const CABLES: &str = "dcim/cables";

pub(crate) fn with_cable(client: &MockNautobotClient, mut interface: Interface) -> Interface {
    let cable = client
        .cables
        .lock()
        .unwrap()
        .values()
        .find(|c| c.terminates_on(interface.id))
        .map(|c| client.helpers().nested(CABLES, "dcim.cable", c.id, None));
    interface.cable = cable;
    interface
}

pub fn get_device(client: &MockNautobotClient, id: Uuid) -> Result<Option<Device>, NautobotError> {
    client.check_available()?;
    Ok(client.device(id))
}

pub fn create_device(client: &MockNautobotClient, request: &DeviceRequest) -> Result<Device, NautobotError> {
    client.record("POST", DEVICES)?;
    if client.device_named(&request.name).is_some() {
        return Err(unique_set("POST", DEVICES, "location, tenant, name"));
    }
    if client.devices.lock().unwrap().values().any(|d| d.serial == request.serial) {
        return Err(already_exists("POST", DEVICES, "device", "serial"));
    }
    let location = client.locations.lock().unwrap().get(&request.location).cloned();
    let rack = client.racks.lock().unwrap().get(&request.rack).cloned();
    let (Some(location), Some(rack)) = (location, rack) else {
        return Err(bad_request("POST", DEVICES, json!({"location": ["Related object not found."]})));
    };

    let helpers = client.helpers();
    let device = Device {
        id: Uuid::new_v4(),
        name: Some(request.name.clone()),
        serial: request.serial.clone(),
        status: Some(helpers.status(&request.status.name)),
        location: Some(helpers.nested("dcim/locations", "dcim.location", request.location, Some(&location))),
        rack: Some(helpers.nested("dcim/racks", "dcim.rack", request.rack, Some(&rack))),
        tenant: None,
        custom_fields: Default::default(),
    };
    client.add_device(device.clone());
    Ok(device)
}

pub fn update_device(client: &MockNautobotClient, id: Uuid, patch: &Value) -> Result<Device, NautobotError> {
    client.record("PATCH", DEVICES)?;
    let helpers = client.helpers();
    let mut devices = client.devices.lock().unwrap();
    let device = devices.get_mut(&id).ok_or_else(|| not_found("Device", id))?;

    if let Some(name) = patch.get("name").and_then(Value::as_str) {
        device.name = Some(name.to_string());
    }
    if let Some(status) = patch.get("status").and_then(name_of) {
        device.status = Some(helpers.status(&status));
    }
    if let Some(tenant) = patch.get("tenant") {
        device.tenant = uuid_of(tenant).map(|t| helpers.nested("tenancy/tenants", "tenancy.tenant", t, None));
    }
    if let Some(fields) = patch.get("custom_fields").and_then(Value::as_object) {
        for (key, value) in fields {
            device.custom_fields.insert(key.clone(), value.clone());
        }
    }
    Ok(device.clone())
}

pub fn get_interface(client: &MockNautobotClient, id: Uuid) -> Result<Option<Interface>, NautobotError> {
    client.check_available()?;
    Ok(client.interface(id))
}

pub fn find_interface(client: &MockNautobotClient, device: &str, name: &str) -> Result<Option<Interface>, NautobotError> {
    client.check_available()?;
    let device_id = match Uuid::parse_str(device) {
        Ok(id) => Some(id),
        Err(_) => client.device_named(device).map(|d| d.id),
    };
    let Some(device_id) = device_id else {
        return Ok(None);
    };
    let found = client
        .interfaces
        .lock()
        .unwrap()
        .values()
        .find(|i| i.device.id == device_id && i.name == name)
        .cloned();
    Ok(found.map(|i| with_cable(client, i)))
}

fn insert_interface(client: &MockNautobotClient, request: &InterfaceRequest) -> Result<Interface, NautobotError> {
    let mut interfaces = client.interfaces.lock().unwrap();
    if let Some(id) = request.id
        && interfaces.contains_key(&id)
    {
        return Err(already_exists("POST", INTERFACES, "interface", "id"));
    }
    if interfaces
        .values()
        .any(|i| i.device.id == request.device && i.name == request.name)
    {
        return Err(unique_set("POST", INTERFACES, "device, name"));
    }

    let helpers = client.helpers();
    let interface = Interface {
        id: request.id.unwrap_or_else(Uuid::new_v4),
        name: request.name.clone(),
        device: helpers.nested(DEVICES, "dcim.device", request.device, None),
        interface_type: request.interface_type.clone(),
        description: request.description.clone(),
        mac_address: request.mac_address.clone(),
        status: Some(helpers.status(&request.status)),
        cable: None,
    };
    interfaces.insert(interface.id, interface.clone());
    Ok(interface)
}

pub fn create_interface(client: &MockNautobotClient, request: &InterfaceRequest) -> Result<Interface, NautobotError> {
    client.record("POST", INTERFACES)?;
    if client.device(request.device).is_none() {
        return Err(bad_request("POST", INTERFACES, json!({"device": ["Related object not found."]})));
    }
    if client.take_race(INTERFACES) {
        insert_interface(client, request)?;
    }
    insert_interface(client, request)
}

pub fn update_interface(client: &MockNautobotClient, id: Uuid, patch: &Value) -> Result<Interface, NautobotError> {
    client.record("PATCH", INTERFACES)?;
    let helpers = client.helpers();
    let updated = {
        let mut interfaces = client.interfaces.lock().unwrap();
        let interface = interfaces.get_mut(&id).ok_or_else(|| not_found("Interface", id))?;
        if let Some(name) = patch.get("name").and_then(Value::as_str) {
            interface.name = name.to_string();
        }
        if let Some(t) = patch.get("type").and_then(Value::as_str) {
            interface.interface_type = t.to_string();
        }
        if let Some(description) = patch.get("description").and_then(Value::as_str) {
            interface.description = description.to_string();
        }
        if let Some(mac) = patch.get("mac_address") {
            interface.mac_address = mac.as_str().map(str::to_string);
        }
        if let Some(status) = patch.get("status").and_then(name_of) {
            interface.status = Some(helpers.status(&status));
        }
        interface.clone()
    };
    Ok(with_cable(client, updated))
}

pub fn delete_interface(client: &MockNautobotClient, id: Uuid) -> Result<(), NautobotError> {
    client.record("DELETE", INTERFACES)?;
    client
        .interfaces
        .lock()
        .unwrap()
        .remove(&id)
        .ok_or_else(|| not_found("Interface", id))?;
    // Terminations cascade
    client.cables.lock().unwrap().retain(|_, c| !c.terminates_on(id));
    client
        .ip_assignments
        .lock()
        .unwrap()
        .retain(|_, a| a.interface.as_ref().map(|i| i.id) != Some(id));
    Ok(())
}

pub fn get_cable(client: &MockNautobotClient, id: Uuid) -> Result<Option<Cable>, NautobotError> {
    client.check_available()?;
    Ok(client.cables.lock().unwrap().get(&id).cloned())
}

fn check_terminations(client: &MockNautobotClient, method: &str, request: &CableRequest, except: Option<Uuid>) -> Result<(), NautobotError> {
    for end in [request.termination_a_id, request.termination_b_id] {
        if client.interface(end).is_none() {
            return Err(bad_request(method, CABLES, json!({"termination": [format!("Interface {end} not found.")]})));
        }
        let taken = client
            .cables
            .lock()
            .unwrap()
            .values()
            .any(|c| Some(c.id) != except && c.terminates_on(end));
        if taken {
            return Err(bad_request(
                method,
                CABLES,
                json!({"termination": [format!("Interface {end} has a cable attached.")]}),
            ));
        }
    }
    Ok(())
}

pub fn create_cable(client: &MockNautobotClient, request: &CableRequest) -> Result<Cable, NautobotError> {
    client.record("POST", CABLES)?;
    check_terminations(client, "POST", request, None)?;
    let cable = Cable {
        id: Uuid::new_v4(),
        termination_a_type: request.termination_a_type.clone(),
        termination_a_id: request.termination_a_id,
        termination_b_type: request.termination_b_type.clone(),
        termination_b_id: request.termination_b_id,
        status: Some(client.helpers().status(&request.status)),
    };
    client.cables.lock().unwrap().insert(cable.id, cable.clone());
    Ok(cable)
}

pub fn update_cable(client: &MockNautobotClient, id: Uuid, request: &CableRequest) -> Result<Cable, NautobotError> {
    client.record("PATCH", CABLES)?;
    if !client.cables.lock().unwrap().contains_key(&id) {
        return Err(not_found("Cable", id));
    }
    check_terminations(client, "PATCH", request, Some(id))?;
    let status = client.helpers().status(&request.status);
    let mut cables = client.cables.lock().unwrap();
    let cable = cables.get_mut(&id).ok_or_else(|| not_found("Cable", id))?;
    cable.termination_a_type = request.termination_a_type.clone();
    cable.termination_a_id = request.termination_a_id;
    cable.termination_b_type = request.termination_b_type.clone();
    cable.termination_b_id = request.termination_b_id;
    cable.status = Some(status);
    Ok(cable.clone())
}

pub fn delete_cable(client: &MockNautobotClient, id: Uuid) -> Result<(), NautobotError> {
    client.record("DELETE", CABLES)?;
    client
        .cables
        .lock()
        .unwrap()
        .remove(&id)
        .map(|_| ())
        .ok_or_else(|| not_found("Cable", id))
}

//! GraphQL reads for MockNautobotClient, assembled from the REST stores

use super::MockNautobotClient;
use crate::error::NautobotError;
use crate::graphql::{NautobotDevice, NautobotInterface, SwitchRecord};
use crate::models::{Device, Interface};
use uuid::Uuid;

fn placement(device: &Device) -> (Option<Uuid>, Option<String>, Option<Uuid>, Option<String>) {
    (
        device.location.as_ref().map(|l| l.id),
        device.location.as_ref().and_then(|l| l.name.clone()),
        device.rack.as_ref().map(|r| r.id),
        device.rack.as_ref().and_then(|r| r.name.clone()),
    )
}

fn flatten_interface(client: &MockNautobotClient, interface: Interface) -> NautobotInterface {
    let cable = client
        .cables
        .lock()
        .unwrap()
        .values()
        .find(|c| c.terminates_on(interface.id))
        .cloned();
    let neighbor = cable
        .as_ref()
        .map(|c| {
            if c.termination_a_id == interface.id {
                c.termination_b_id
            } else {
                c.termination_a_id
            }
        })
        .and_then(|id| client.interface(id));
    let neighbor_device = neighbor.as_ref().and_then(|n| client.device(n.device.id));
    let ip_address = client
        .ip_assignments
        .lock()
        .unwrap()
        .values()
        .find(|a| a.interface.as_ref().map(|i| i.id) == Some(interface.id))
        .map(|a| a.ip_address.id)
        .and_then(|ip| client.ip_addresses.lock().unwrap().get(&ip).map(|ip| ip.address.clone()));

    NautobotInterface {
        id: interface.id,
        name: interface.name,
        interface_type: interface.interface_type,
        description: interface.description,
        mac_address: interface.mac_address,
        status: interface.status.and_then(|s| s.name),
        cable_id: cable.map(|c| c.id),
        ip_address,
        neighbor_interface_id: neighbor.as_ref().map(|n| n.id),
        neighbor_interface_name: neighbor.as_ref().map(|n| n.name.clone()),
        neighbor_device_id: neighbor_device.as_ref().map(|d| d.id),
        neighbor_device_name: neighbor_device.as_ref().and_then(|d| d.name.clone()),
        neighbor_location_name: neighbor_device
            .as_ref()
            .and_then(|d| d.location.as_ref())
            .and_then(|l| l.name.clone()),
        neighbor_rack_name: neighbor_device
            .as_ref()
            .and_then(|d| d.rack.as_ref())
            .and_then(|r| r.name.clone()),
    }
}

fn flatten_device(client: &MockNautobotClient, device: Device) -> NautobotDevice {
    let (location_id, location_name, rack_id, rack_name) = placement(&device);
    let interfaces = client
        .interfaces_of(device.id)
        .into_iter()
        .map(|i| flatten_interface(client, i))
        .collect();
    NautobotDevice {
        id: device.id,
        name: device.name.unwrap_or_default(),
        serial: device.serial,
        location_id,
        location_name,
        rack_id,
        rack_name,
        interfaces,
    }
}

pub fn find_device_by_serial(client: &MockNautobotClient, serial: &str) -> Result<Option<NautobotDevice>, NautobotError> {
    client.check_available()?;
    let matches: Vec<Device> = client
        .devices
        .lock()
        .unwrap()
        .values()
        .filter(|d| d.serial == serial)
        .cloned()
        .collect();
    if matches.len() > 1 {
        return Err(NautobotError::GraphQL(format!(
            "Multiple nautobot devices found with serial {serial}"
        )));
    }
    Ok(matches.into_iter().next().map(|d| flatten_device(client, d)))
}

pub fn find_device_by_id(client: &MockNautobotClient, id: Uuid) -> Result<Option<NautobotDevice>, NautobotError> {
    client.check_available()?;
    Ok(client.device(id).map(|d| flatten_device(client, d)))
}

pub fn find_switches(client: &MockNautobotClient, names: &[String]) -> Result<Vec<SwitchRecord>, NautobotError> {
    client.check_available()?;
    let mut switches: Vec<SwitchRecord> = client
        .devices
        .lock()
        .unwrap()
        .values()
        .filter(|d| d.name.as_ref().is_some_and(|n| names.contains(n)))
        .map(|d| {
            let (location_id, location_name, rack_id, rack_name) = placement(d);
            SwitchRecord {
                id: d.id,
                name: d.name.clone().unwrap_or_default(),
                location_id,
                location_name,
                rack_id,
                rack_name,
            }
        })
        .collect();
    switches.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(switches)
}

pub fn switch_vlan_group_id(client: &MockNautobotClient, switch_id: Uuid) -> Result<Option<Uuid>, NautobotError> {
    client.check_available()?;
    Ok(client.switch_vlan_groups.lock().unwrap().get(&switch_id).copied())
}

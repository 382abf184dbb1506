//! undercloud-vni plugin operations for MockNautobotClient

use super::MockNautobotClient;
use super::helpers::{already_exists, bad_request, name_of, not_found, uuid_of};
use crate::error::NautobotError;
use crate::models::*;
use serde_json::{Map, Value, json};
use uuid::Uuid;

const UCVNIS: &str = "plugins/undercloud-vni/ucvnis";
const PREP: &str = "plugins/undercloud-vni/prep_switch_interface";

pub fn get_ucvni(client: &MockNautobotClient, id: Uuid) -> Result<Option<Ucvni>, NautobotError> {
    client.check_available()?;
    Ok(client.ucvni(id))
}

pub fn create_ucvni(client: &MockNautobotClient, request: &UcvniRequest) -> Result<Ucvni, NautobotError> {
    client.record("POST", UCVNIS)?;
    if client.ucvni(request.id).is_some() {
        return Err(already_exists("POST", UCVNIS, "ucvni", "id"));
    }
    let helpers = client.helpers();
    let ucvni = Ucvni {
        id: request.id,
        name: request.name.clone(),
        ucvni_id: request.ucvni_id,
        ucvni_group: Some(helpers.nested(
            "plugins/undercloud-vni/ucvni-groups",
            "undercloud_vni.ucvnigroup",
            Uuid::nil(),
            Some(&request.ucvni_group.name),
        )),
        tenant: Some(helpers.nested("tenancy/tenants", "tenancy.tenant", request.tenant, None)),
        status: Some(helpers.status(&request.status.name)),
    };
    client.add_ucvni(ucvni.clone());
    Ok(ucvni)
}

pub fn update_ucvni(client: &MockNautobotClient, id: Uuid, patch: &Value) -> Result<Ucvni, NautobotError> {
    client.record("PATCH", UCVNIS)?;
    let helpers = client.helpers();
    let mut ucvnis = client.ucvnis.lock().unwrap();
    let ucvni = ucvnis.get_mut(&id).ok_or_else(|| not_found("UCVNI", id))?;
    if let Some(name) = patch.get("name").and_then(Value::as_str) {
        ucvni.name = name.to_string();
    }
    if let Some(vni) = patch.get("ucvni_id") {
        ucvni.ucvni_id = vni.as_u64().and_then(|v| u32::try_from(v).ok());
    }
    if let Some(status) = patch.get("status").and_then(name_of) {
        ucvni.status = Some(helpers.status(&status));
    }
    if let Some(tenant) = patch.get("tenant").and_then(uuid_of) {
        ucvni.tenant = Some(helpers.nested("tenancy/tenants", "tenancy.tenant", tenant, None));
    }
    Ok(ucvni.clone())
}

pub fn delete_ucvni(client: &MockNautobotClient, id: Uuid) -> Result<(), NautobotError> {
    client.record("DELETE", UCVNIS)?;
    client
        .ucvnis
        .lock()
        .unwrap()
        .remove(&id)
        .map(|_| ())
        .ok_or_else(|| not_found("UCVNI", id))
}

/// Follows the server interface's cable to its switch and answers with the
/// switch's VLAN group.
pub fn prep_switch_interface(client: &MockNautobotClient, ucvni_id: Uuid, server_interface_mac: &str) -> Result<PrepSwitchInterfaceResponse, NautobotError> {
    client.record("POST", PREP)?;
    if client.ucvni(ucvni_id).is_none() {
        return Err(bad_request("POST", PREP, json!({"ucvni_id": [format!("No UCVNI {ucvni_id}")]})));
    }
    let server_interface = client
        .interfaces
        .lock()
        .unwrap()
        .values()
        .find(|i| {
            i.mac_address
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case(server_interface_mac))
        })
        .map(|i| i.id);
    let Some(server_interface) = server_interface else {
        return Err(bad_request(
            "POST",
            PREP,
            json!({"server_interface_mac": [format!("No interface with MAC {server_interface_mac}")]}),
        ));
    };
    let switch_interface = client
        .cables
        .lock()
        .unwrap()
        .values()
        .find(|c| c.terminates_on(server_interface))
        .map(|c| {
            if c.termination_a_id == server_interface {
                c.termination_b_id
            } else {
                c.termination_a_id
            }
        });
    let switch = switch_interface
        .and_then(|id| client.interface(id))
        .map(|i| i.device.id);
    let vlan_group_id = switch.and_then(|s| client.switch_vlan_groups.lock().unwrap().get(&s).copied());
    let Some(vlan_group_id) = vlan_group_id else {
        return Err(bad_request(
            "POST",
            PREP,
            json!({"server_interface_mac": ["Interface is not connected to a switch in a VLAN group"]}),
        ));
    };
    Ok(PrepSwitchInterfaceResponse {
        vlan_group_id,
        extra: Map::new(),
    })
}

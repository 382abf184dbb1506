//! HTTP behaviour of the Nautobot client against a local server

use nautobot_client::{CableRequest, NautobotClient, NautobotClientTrait, NautobotError};
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const DEVICE_ID: &str = "4c4c4544-0033-3310-8047-b3c04f533034";
const INTERFACE_A: &str = "3a3c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d03";
const INTERFACE_B: &str = "5c5c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d05";

fn client(server: &MockServer) -> NautobotClient {
    NautobotClient::new(format!("{}/", server.uri()), "0123456789abcdef".to_string()).unwrap()
}

#[tokio::test]
async fn test_token_header_on_every_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/status/"))
        .and(header("Authorization", "Token 0123456789abcdef"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"nautobot-version": "2.3.2"})))
        .expect(1)
        .mount(&server)
        .await;

    client(&server).validate_token().await.unwrap();
}

#[tokio::test]
async fn test_find_device_by_serial_uses_graphql() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graphql/"))
        .and(body_partial_json(json!({"variables": {"serial": ["33GSW04"]}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"devices": [{
            "id": DEVICE_ID,
            "name": "Dell-33GSW04",
            "serial": "33GSW04",
            "location": {"id": "1e1c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d01", "name": "IAD3"},
            "rack": {"id": "2f2c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d02", "name": "F20-2"},
            "interfaces": [{
                "id": INTERFACE_A,
                "name": "iDRAC",
                "type": "A_1000BASE_T",
                "description": "Dedicated iDRAC interface",
                "mac_address": "A8:3C:A5:35:43:86",
                "status": {"name": "Active"},
                "cable": null,
                "connected_interface": null,
                "ip_addresses": [{"id": "7e7c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d07", "address": "10.46.96.156/26"}]
            }]
        }]}})))
        .expect(1)
        .mount(&server)
        .await;

    let device = client(&server).find_device_by_serial("33GSW04").await.unwrap().unwrap();
    assert_eq!(device.id, Uuid::parse_str(DEVICE_ID).unwrap());
    let idrac = device.interface("iDRAC").unwrap();
    assert_eq!(idrac.interface_type, "1000base-t");
    assert_eq!(idrac.ip_address.as_deref(), Some("10.46.96.156/26"));
    assert_eq!(idrac.neighbor_device_name, None);
}

#[tokio::test]
async fn test_graphql_errors_surface() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/graphql/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"data": null, "errors": [{"message": "Cannot query field"}]})),
        )
        .mount(&server)
        .await;

    let err = client(&server).find_device_by_serial("33GSW04").await.unwrap_err();
    assert!(matches!(err, NautobotError::GraphQL(msg) if msg.contains("Cannot query field")));
}

#[tokio::test]
async fn test_unique_set_is_a_collision() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/dcim/cables/"))
        .and(body_json(json!({
            "termination_a_type": "dcim.interface",
            "termination_a_id": INTERFACE_A,
            "termination_b_type": "dcim.interface",
            "termination_b_id": INTERFACE_B,
            "status": "Connected",
        })))
        .respond_with(ResponseTemplate::new(400).set_body_json(
            json!({"non_field_errors": ["The fields termination_a_type, termination_a_id must make a unique set."]}),
        ))
        .mount(&server)
        .await;

    let request = CableRequest::between_interfaces(
        Uuid::parse_str(INTERFACE_A).unwrap(),
        Uuid::parse_str(INTERFACE_B).unwrap(),
    );
    let err = client(&server).create_cable(&request).await.unwrap_err();
    assert!(err.is_idempotence_collision());
}

#[tokio::test]
async fn test_get_missing_is_none_and_delete_missing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/api/dcim/interfaces/{INTERFACE_A}/")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/api/dcim/interfaces/{INTERFACE_A}/")))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
        .mount(&server)
        .await;

    let client = client(&server);
    let id = Uuid::parse_str(INTERFACE_A).unwrap();
    assert_eq!(client.get_interface(id).await.unwrap(), None);
    assert!(client.delete_interface(id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_find_interface_filters_by_device_and_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dcim/interfaces/"))
        .and(query_param("device", "f20-2-1.iad3.rackspace.net"))
        .and(query_param("name", "Ethernet1/5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "next": null,
            "previous": null,
            "results": [{
                "id": INTERFACE_B,
                "name": "Ethernet1/5",
                "device": {"id": DEVICE_ID, "name": "f20-2-1.iad3.rackspace.net"},
                "type": "25gbase-x-sfp28",
                "description": "",
                "mac_address": null,
                "status": {"id": "9a9c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d09", "name": "Active"},
                "cable": null
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let interface = client(&server)
        .find_interface("f20-2-1.iad3.rackspace.net", "Ethernet1/5")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(interface.id, Uuid::parse_str(INTERFACE_B).unwrap());
    assert_eq!(interface.device.name.as_deref(), Some("f20-2-1.iad3.rackspace.net"));
}

#[tokio::test]
async fn test_prep_switch_interface() {
    let server = MockServer::start().await;
    let ucvni = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/api/plugins/undercloud-vni/prep_switch_interface"))
        .and(body_json(json!({"ucvni_id": ucvni, "server_interface_mac": "14:23:F3:F5:25:F0"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "vlan_group_id": "7e7c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d07",
            "status": "ok"
        })))
        .mount(&server)
        .await;

    let reply = client(&server)
        .prep_switch_interface(ucvni, "14:23:F3:F5:25:F0")
        .await
        .unwrap();
    assert_eq!(reply.vlan_group_id, Uuid::parse_str("7e7c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d07").unwrap());
    assert_eq!(reply.extra["status"], "ok");
}

#[tokio::test]
async fn test_server_error_maps_to_api() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(format!("/api/dcim/devices/{DEVICE_ID}/")))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let err = client(&server)
        .update_device(Uuid::parse_str(DEVICE_ID).unwrap(), &json!({"status": {"name": "Active"}}))
        .await
        .unwrap_err();
    assert!(matches!(err, NautobotError::Api(msg) if msg.contains("500") && msg.contains("boom")));
}

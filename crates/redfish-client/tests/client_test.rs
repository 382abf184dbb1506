//! HTTP behaviour of the Redfish client against a local server

use pretty_assertions::assert_eq;
use redfish_client::{Bmc, BmcTrait, Method, RedfishError, Session};
use serde_json::json;
use wiremock::matchers::{basic_auth, body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IP: &str = "10.46.96.156";

fn bmc(server: &MockServer) -> Bmc {
    Bmc::with_base_url(&server.uri(), IP, "root", "f2FksaT0qcJuiT6XH4+G").unwrap()
}

#[tokio::test]
async fn test_get_uses_basic_auth_and_json_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/redfish/v1/Systems/System.Embedded.1"))
        .and(basic_auth("root", "f2FksaT0qcJuiT6XH4+G"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"PowerState": "On"})))
        .expect(1)
        .mount(&server)
        .await;

    let value = bmc(&server).get("/redfish/v1/Systems/System.Embedded.1").await.unwrap();
    assert_eq!(value, json!({"PowerState": "On"}));
}

#[tokio::test]
async fn test_empty_body_is_empty_object() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/redfish/v1/Managers/iDRAC.Embedded.1/EthernetInterfaces/NIC.1"))
        .and(body_json(json!({"HostName": "Dell-33GSW04"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let value = bmc(&server)
        .patch(
            "/redfish/v1/Managers/iDRAC.Embedded.1/EthernetInterfaces/NIC.1",
            &json!({"HostName": "Dell-33GSW04"}),
        )
        .await
        .unwrap();
    assert_eq!(value, json!({}));
}

#[tokio::test]
async fn test_error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/redfish/v1/Missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such resource"))
        .mount(&server)
        .await;

    let err = bmc(&server).get("/redfish/v1/Missing").await.unwrap_err();
    match err {
        RedfishError::Api { status, body, url } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such resource");
            assert!(url.ends_with("/redfish/v1/Missing"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_open_session_reads_token_and_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/redfish/v1/SessionService/Sessions"))
        .and(body_json(json!({"UserName": "root", "Password": "calvin"})))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("X-Auth-Token", "abc123")
                .insert_header("Location", "https://10.46.96.156/redfish/v1/SessionService/Sessions/7")
                .set_body_json(json!({"@odata.id": "/redfish/v1/SessionService/Sessions/7"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/redfish/v1"))
        .and(header("X-Auth-Token", "abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"RedfishVersion": "1.17.0"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/redfish/v1/SessionService/Sessions/7"))
        .and(header("X-Auth-Token", "abc123"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let bmc = bmc(&server);
    let session = bmc.open_session("calvin").await.unwrap().unwrap();
    assert_eq!(
        session,
        Session {
            token: "abc123".to_string(),
            location: "/redfish/v1/SessionService/Sessions/7".to_string(),
        }
    );

    let root = bmc
        .session_request(&session, Method::Get, "/redfish/v1", None)
        .await
        .unwrap();
    assert_eq!(root["RedfishVersion"], "1.17.0");
    bmc.close_session(&session).await.unwrap();
}

#[tokio::test]
async fn test_open_session_location_from_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/redfish/v1/SessionService/Sessions"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("X-Auth-Token", "abc123")
                .set_body_json(json!({"@odata.id": "/redfish/v1/SessionService/Sessions/9"})),
        )
        .mount(&server)
        .await;

    let session = bmc(&server).open_session("calvin").await.unwrap().unwrap();
    assert_eq!(session.location, "/redfish/v1/SessionService/Sessions/9");
}

#[tokio::test]
async fn test_rejected_login_is_none() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/redfish/v1/SessionService/Sessions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    assert!(bmc(&server).open_session("wrong").await.unwrap().is_none());
}

#[tokio::test]
async fn test_session_server_error_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/redfish/v1/SessionService/Sessions"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = bmc(&server).open_session("calvin").await.unwrap_err();
    assert!(matches!(err, RedfishError::Api { status: 503, .. }));
}

#[test]
fn test_for_ip_address_uses_standard_password() {
    let bmc = Bmc::for_ip_address(IP, "secret").unwrap();
    assert_eq!(bmc.username(), "root");
    assert_eq!(bmc.password(), "f2FksaT0qcJuiT6XH4+G");
    assert_eq!(bmc.url(), "https://10.46.96.156");
}

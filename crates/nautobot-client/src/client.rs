//! Nautobot API client
//!
//! Implements the REST endpoints below `/api/dcim/`, `/api/ipam/` and
//! `/api/plugins/undercloud-vni/`, plus the GraphQL endpoint for reads of a
//! whole server.

use crate::common::HttpClient;
use crate::common::query::{query_one, query_resources};
use crate::error::NautobotError;
use crate::graphql::{self, NautobotDevice, SwitchRecord};
use crate::models::*;
use crate::nautobot_trait::NautobotClientTrait;
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Nautobot API client
#[derive(Debug)]
pub struct NautobotClient {
    http: HttpClient,
}

impl NautobotClient {
    /// Create a new Nautobot client
    ///
    /// # Arguments
    /// * `base_url` - Nautobot base URL (e.g., "http://nautobot-default.nautobot.svc.cluster.local")
    /// * `token` - API token for authentication
    pub fn new(base_url: String, token: String) -> Result<Self, NautobotError> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: String, token: String, timeout: Duration) -> Result<Self, NautobotError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    fn to_body<T: serde::Serialize>(request: &T) -> Result<Value, NautobotError> {
        Ok(serde_json::to_value(request)?)
    }
}

#[async_trait::async_trait]
impl NautobotClientTrait for NautobotClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }

    async fn validate_token(&self) -> Result<(), NautobotError> {
        debug!("Validating Nautobot token and connectivity");
        let _: Value = self.http.get("/api/status/").await?;
        Ok(())
    }

    async fn find_device_by_serial(&self, serial: &str) -> Result<Option<NautobotDevice>, NautobotError> {
        let data = self
            .http
            .graphql(graphql::SERVER_BY_SERIAL, json!({"serial": [serial]}))
            .await?;
        graphql::parse_single_device(data, &format!("serial {serial}"))
    }

    async fn find_device_by_id(&self, id: Uuid) -> Result<Option<NautobotDevice>, NautobotError> {
        let data = self
            .http
            .graphql(graphql::SERVER_BY_ID, json!({"id": [id.to_string()]}))
            .await?;
        graphql::parse_single_device(data, &format!("id {id}"))
    }

    async fn find_switches(&self, names: &[String]) -> Result<Vec<SwitchRecord>, NautobotError> {
        let data = self
            .http
            .graphql(graphql::SWITCHES_BY_NAME, json!({"names": names}))
            .await?;
        graphql::parse_switches(data)
    }

    async fn switch_vlan_group_id(&self, switch_id: Uuid) -> Result<Option<Uuid>, NautobotError> {
        let data = self
            .http
            .graphql(graphql::SWITCH_VLAN_GROUP, json!({"id": switch_id.to_string()}))
            .await?;
        graphql::parse_vlan_group_id(&data)
    }

    async fn get_device(&self, id: Uuid) -> Result<Option<Device>, NautobotError> {
        self.http.get_optional(&format!("/api/dcim/devices/{id}/?depth=1")).await
    }

    async fn create_device(&self, request: &DeviceRequest) -> Result<Device, NautobotError> {
        self.http.post("/api/dcim/devices/", &Self::to_body(request)?).await
    }

    async fn update_device(&self, id: Uuid, patch: &Value) -> Result<Device, NautobotError> {
        self.http.patch(&format!("/api/dcim/devices/{id}/"), patch).await
    }

    async fn get_interface(&self, id: Uuid) -> Result<Option<Interface>, NautobotError> {
        self.http.get_optional(&format!("/api/dcim/interfaces/{id}/?depth=1")).await
    }

    async fn find_interface(&self, device: &str, name: &str) -> Result<Option<Interface>, NautobotError> {
        query_one(&self.http, "dcim/interfaces", &[("device", device), ("name", name), ("depth", "1")]).await
    }

    async fn create_interface(&self, request: &InterfaceRequest) -> Result<Interface, NautobotError> {
        self.http.post("/api/dcim/interfaces/", &Self::to_body(request)?).await
    }

    async fn update_interface(&self, id: Uuid, patch: &Value) -> Result<Interface, NautobotError> {
        self.http.patch(&format!("/api/dcim/interfaces/{id}/"), patch).await
    }

    async fn delete_interface(&self, id: Uuid) -> Result<(), NautobotError> {
        self.http.delete(&format!("/api/dcim/interfaces/{id}/")).await
    }

    async fn get_cable(&self, id: Uuid) -> Result<Option<Cable>, NautobotError> {
        self.http.get_optional(&format!("/api/dcim/cables/{id}/")).await
    }

    async fn create_cable(&self, request: &CableRequest) -> Result<Cable, NautobotError> {
        self.http.post("/api/dcim/cables/", &Self::to_body(request)?).await
    }

    async fn update_cable(&self, id: Uuid, request: &CableRequest) -> Result<Cable, NautobotError> {
        self.http.patch(&format!("/api/dcim/cables/{id}/"), &Self::to_body(request)?).await
    }

    async fn delete_cable(&self, id: Uuid) -> Result<(), NautobotError> {
        self.http.delete(&format!("/api/dcim/cables/{id}/")).await
    }

    async fn find_vlan_group(&self, name: &str) -> Result<Option<VlanGroup>, NautobotError> {
        query_one(&self.http, "ipam/vlan-groups", &[("name__ie", name)]).await
    }

    async fn find_ip_address(&self, host: &str) -> Result<Option<IpAddress>, NautobotError> {
        query_one(&self.http, "ipam/ip-addresses", &[("address", host)]).await
    }

    async fn create_ip_address(&self, request: &IpAddressRequest) -> Result<IpAddress, NautobotError> {
        self.http.post("/api/ipam/ip-addresses/", &Self::to_body(request)?).await
    }

    async fn update_ip_address(&self, id: Uuid, patch: &Value) -> Result<IpAddress, NautobotError> {
        self.http.patch(&format!("/api/ipam/ip-addresses/{id}/"), patch).await
    }

    async fn find_ip_address_assignment(&self, ip_address_id: Uuid, interface_id: Uuid) -> Result<Option<IpAddressToInterface>, NautobotError> {
        let ip = ip_address_id.to_string();
        let interface = interface_id.to_string();
        query_one(
            &self.http,
            "ipam/ip-address-to-interface",
            &[("ip_address", ip.as_str()), ("interface", interface.as_str())],
        )
        .await
    }

    async fn assign_ip_address(&self, ip_address_id: Uuid, interface_id: Uuid, is_primary: bool) -> Result<IpAddressToInterface, NautobotError> {
        let body = json!({
            "ip_address": ip_address_id,
            "interface": interface_id,
            "is_primary": is_primary,
        });
        self.http.post("/api/ipam/ip-address-to-interface/", &body).await
    }

    async fn get_prefix(&self, id: Uuid) -> Result<Option<Prefix>, NautobotError> {
        self.http.get_optional(&format!("/api/ipam/prefixes/{id}/")).await
    }

    async fn prefixes_in_namespace(&self, namespace: &str) -> Result<Vec<Prefix>, NautobotError> {
        query_resources(&self.http, "ipam/prefixes", &[("namespace", namespace)], true).await
    }

    async fn create_prefix(&self, request: &PrefixRequest) -> Result<Prefix, NautobotError> {
        self.http.post("/api/ipam/prefixes/", &Self::to_body(request)?).await
    }

    async fn update_prefix(&self, id: Uuid, patch: &Value) -> Result<Prefix, NautobotError> {
        self.http.patch(&format!("/api/ipam/prefixes/{id}/"), patch).await
    }

    async fn delete_prefix(&self, id: Uuid) -> Result<(), NautobotError> {
        self.http.delete(&format!("/api/ipam/prefixes/{id}/")).await
    }

    async fn find_namespace(&self, name: &str) -> Result<Option<Namespace>, NautobotError> {
        query_one(&self.http, "ipam/namespaces", &[("name", name)]).await
    }

    async fn create_namespace(&self, name: &str) -> Result<Namespace, NautobotError> {
        self.http.post("/api/ipam/namespaces/", &json!({"name": name})).await
    }

    async fn delete_namespace(&self, id: Uuid) -> Result<(), NautobotError> {
        self.http.delete(&format!("/api/ipam/namespaces/{id}/")).await
    }

    async fn get_ucvni(&self, id: Uuid) -> Result<Option<Ucvni>, NautobotError> {
        self.http
            .get_optional(&format!("/api/plugins/undercloud-vni/ucvnis/{id}/?depth=1"))
            .await
    }

    async fn create_ucvni(&self, request: &UcvniRequest) -> Result<Ucvni, NautobotError> {
        self.http
            .post("/api/plugins/undercloud-vni/ucvnis/", &Self::to_body(request)?)
            .await
    }

    async fn update_ucvni(&self, id: Uuid, patch: &Value) -> Result<Ucvni, NautobotError> {
        self.http
            .patch(&format!("/api/plugins/undercloud-vni/ucvnis/{id}/"), patch)
            .await
    }

    async fn delete_ucvni(&self, id: Uuid) -> Result<(), NautobotError> {
        self.http.delete(&format!("/api/plugins/undercloud-vni/ucvnis/{id}/")).await
    }

    async fn prep_switch_interface(&self, ucvni_id: Uuid, server_interface_mac: &str) -> Result<PrepSwitchInterfaceResponse, NautobotError> {
        let body = json!({
            "ucvni_id": ucvni_id,
            "server_interface_mac": server_interface_mac,
        });
        self.http
            .post("/api/plugins/undercloud-vni/prep_switch_interface", &body)
            .await
    }
}

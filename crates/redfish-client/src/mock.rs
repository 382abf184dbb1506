//! Mock BMC for unit testing
//!
//! Serves Redfish resources from an in-memory map of path to JSON body and
//! records every write. A few writes change state the way a real iDRAC
//! does: account password patches, hostname and attribute patches, reset
//! actions, and queued BIOS jobs.

use crate::bmc_trait::{BmcTrait, Method, Session};
use crate::chassis::{BMC_NIC_PATH, MANAGER_PATH};
use crate::error::RedfishError;
use crate::power::SYSTEM_PATH;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

const R7615: &str = include_str!("../tests/fixtures/r7615.json");
const PENDING_JOB_BODY: &str =
    r#"{"error":{"@Message.ExtendedInfo":[{"Message":"Pending configuration values are already committed, unable to perform another set operation.","MessageId":"IDRAC.2.9.SYS011"}]}}"#;

/// One write seen by the mock
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub method: Method,
    pub path: String,
    pub payload: Option<Value>,
}

/// Mock BMC for testing
///
/// Clones share state, so a test can keep a handle while the code under
/// test owns another.
#[derive(Clone)]
pub struct MockBmc {
    pub(crate) ip_address: String,
    pub(crate) username: String,
    pub(crate) password: String,
    // GET responses; a queue with more than one entry is consumed one per GET
    pub(crate) resources: Arc<Mutex<HashMap<String, VecDeque<Value>>>>,
    // Password the BMC currently accepts
    pub(crate) accepted_password: Arc<Mutex<String>>,
    pub(crate) sessions: Arc<Mutex<HashSet<String>>>,
    pub(crate) writes: Arc<Mutex<Vec<RecordedWrite>>>,
    pub(crate) failures: Arc<Mutex<HashMap<(Method, String), (u16, String)>>>,
    pub(crate) bios_job_queued: Arc<Mutex<bool>>,
    pub(crate) rejected_logins: Arc<Mutex<u32>>,
    pub(crate) next_session: Arc<Mutex<u64>>,
}

impl MockBmc {
    /// Create an empty mock BMC that accepts `password` for `root`
    pub fn new(ip_address: impl Into<String>, password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            ip_address: ip_address.into(),
            username: "root".to_string(),
            password: password.clone(),
            resources: Arc::new(Mutex::new(HashMap::new())),
            accepted_password: Arc::new(Mutex::new(password)),
            sessions: Arc::new(Mutex::new(HashSet::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            bios_job_queued: Arc::new(Mutex::new(false)),
            rejected_logins: Arc::new(Mutex::new(0)),
            next_session: Arc::new(Mutex::new(1)),
        }
    }

    /// A Dell PowerEdge R7615 cabled to a redundant switch pair
    pub fn r7615(ip_address: impl Into<String>, password: impl Into<String>) -> Self {
        let mock = Self::new(ip_address, password);
        let fixtures: Value = serde_json::from_str(R7615).unwrap();
        mock.load_fixtures(&fixtures);
        mock
    }

    /// Add every `path -> body` pair of a fixture object (for test setup)
    pub fn load_fixtures(&self, fixtures: &Value) {
        if let Some(map) = fixtures.as_object() {
            for (path, body) in map {
                self.set_resource(path, body.clone());
            }
        }
    }

    /// Replace the resource at `path` (for test setup)
    pub fn set_resource(&self, path: &str, body: Value) {
        self.resources
            .lock()
            .unwrap()
            .insert(normalize(path), VecDeque::from([body]));
    }

    /// Queue another body for `path`; GETs walk the queue and then keep
    /// returning the last body (for test setup)
    pub fn push_resource(&self, path: &str, body: Value) {
        self.resources
            .lock()
            .unwrap()
            .entry(normalize(path))
            .or_default()
            .push_back(body);
    }

    /// Current body at `path`
    pub fn resource(&self, path: &str) -> Option<Value> {
        self.resources
            .lock()
            .unwrap()
            .get(&normalize(path))
            .and_then(|queue| queue.front().cloned())
    }

    /// The BMC now only accepts `password` (for test setup)
    pub fn set_accepted_password(&self, password: impl Into<String>) {
        *self.accepted_password.lock().unwrap() = password.into();
    }

    pub fn accepted_password(&self) -> String {
        self.accepted_password.lock().unwrap().clone()
    }

    /// Answer `method path` with `status` and `body` (for test setup)
    pub fn fail(&self, method: Method, path: &str, status: u16, body: impl Into<String>) {
        self.failures
            .lock()
            .unwrap()
            .insert((method, normalize(path)), (status, body.into()));
    }

    /// Every write the BMC has accepted, in order
    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes.lock().unwrap().clone()
    }

    /// Accepted writes, not counting session bookkeeping
    pub fn write_count(&self) -> usize {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|w| !w.path.starts_with("/redfish/v1/SessionService"))
            .count()
    }

    pub fn rejected_logins(&self) -> u32 {
        *self.rejected_logins.lock().unwrap()
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    fn api_error(&self, path: &str, status: u16, body: impl Into<String>) -> RedfishError {
        RedfishError::Api {
            url: format!("https://{}{}", self.ip_address, path),
            status,
            body: body.into(),
        }
    }

    fn dispatch(&self, method: Method, path: &str, payload: Option<&Value>) -> Result<Value, RedfishError> {
        let path = normalize(path);
        if let Some((status, body)) = self.failures.lock().unwrap().get(&(method, path.clone())) {
            return Err(self.api_error(&path, *status, body.clone()));
        }

        if method == Method::Get {
            let mut resources = self.resources.lock().unwrap();
            let queue = resources
                .get_mut(&path)
                .ok_or_else(|| self.api_error(&path, 404, "Resource not found"))?;
            let body = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
            return body.ok_or_else(|| self.api_error(&path, 404, "Resource not found"));
        }

        self.apply_write(method, &path, payload)?;
        self.writes.lock().unwrap().push(RecordedWrite {
            method,
            path,
            payload: payload.cloned(),
        });
        Ok(json!({}))
    }

    fn apply_write(&self, method: Method, path: &str, payload: Option<&Value>) -> Result<(), RedfishError> {
        let empty = Map::new();
        let body = payload.and_then(Value::as_object).unwrap_or(&empty);

        if path == format!("{SYSTEM_PATH}/Bios/Settings") {
            let mut queued = self.bios_job_queued.lock().unwrap();
            if *queued {
                return Err(self.api_error(path, 400, PENDING_JOB_BODY));
            }
            *queued = true;
            return Ok(());
        }

        if path == format!("{SYSTEM_PATH}/Actions/ComputerSystem.Reset") {
            let state = match body.get("ResetType").and_then(Value::as_str) {
                Some("On") | Some("ForceRestart") | Some("GracefulRestart") | Some("PowerCycle") => "On",
                Some(_) => "Off",
                None => return Err(self.api_error(path, 400, "ResetType is required")),
            };
            self.merge(SYSTEM_PATH, &json!({"PowerState": state}));
            return Ok(());
        }

        if method == Method::Patch && path.starts_with("/redfish/v1/AccountService/Accounts/") {
            if let Some(password) = body.get("Password").and_then(Value::as_str) {
                self.set_accepted_password(password);
            }
            return Ok(());
        }

        if method == Method::Patch && (path == BMC_NIC_PATH || path == format!("{MANAGER_PATH}/Attributes")) {
            self.merge(path, &Value::Object(body.clone()));
        }
        Ok(())
    }

    // Shallow merge, one level deeper for "Attributes"; applied to every
    // queued body so later GETs see the write too
    fn merge(&self, path: &str, patch: &Value) {
        let Some(patch) = patch.as_object() else {
            return;
        };
        let mut resources = self.resources.lock().unwrap();
        let Some(queue) = resources.get_mut(path) else {
            return;
        };
        for body in queue.iter_mut() {
            let Value::Object(current) = body else {
                continue;
            };
            for (key, value) in patch {
                match (current.get_mut(key), value) {
                    (Some(Value::Object(existing)), Value::Object(update)) if key == "Attributes" => {
                        for (k, v) in update {
                            existing.insert(k.clone(), v.clone());
                        }
                    }
                    _ => {
                        current.insert(key.clone(), value.clone());
                    }
                }
            }
        }
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() }
}

#[async_trait::async_trait]
impl BmcTrait for MockBmc {
    fn ip_address(&self) -> &str {
        &self.ip_address
    }

    fn username(&self) -> &str {
        &self.username
    }

    fn password(&self) -> &str {
        &self.password
    }

    async fn redfish_request(&self, method: Method, path: &str, payload: Option<&Value>) -> Result<Value, RedfishError> {
        if self.password != self.accepted_password() {
            return Err(self.api_error(path, 401, "Unauthorized"));
        }
        self.dispatch(method, path, payload)
    }

    async fn session_request(
        &self,
        session: &Session,
        method: Method,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<Value, RedfishError> {
        if !self.sessions.lock().unwrap().contains(&session.token) {
            return Err(self.api_error(path, 401, "Unauthorized"));
        }
        if method == Method::Delete && normalize(path) == session.location {
            self.sessions.lock().unwrap().remove(&session.token);
            return Ok(json!({}));
        }
        self.dispatch(method, path, payload)
    }

    async fn open_session(&self, password: &str) -> Result<Option<Session>, RedfishError> {
        if password != self.accepted_password() {
            *self.rejected_logins.lock().unwrap() += 1;
            return Ok(None);
        }
        let id = {
            let mut next = self.next_session.lock().unwrap();
            let id = *next;
            *next += 1;
            id
        };
        let session = Session {
            token: format!("mock-token-{id}"),
            location: format!("/redfish/v1/SessionService/Sessions/{id}"),
        };
        self.sessions.lock().unwrap().insert(session.token.clone());
        Ok(Some(session))
    }

    async fn close_session(&self, session: &Session) -> Result<(), RedfishError> {
        self.session_request(session, Method::Delete, &session.location, None)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chassis::chassis_info;
    use crate::credentials::set_bmc_password;
    use crate::power::PowerState;
    use crate::settings::{set_hostname, update_bios_settings, update_drac_settings};
    use chassis::LldpNeighbor;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    const IP: &str = "10.46.96.156";
    const PASSWORD: &str = "f2FksaT0qcJuiT6XH4+G";

    #[tokio::test]
    async fn test_chassis_info_r7615() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        let info = chassis_info(&bmc).await.unwrap();

        assert_eq!(info.manufacturer, "Dell");
        assert_eq!(info.model_number, "PowerEdge R7615");
        assert_eq!(info.serial_number, "33GSW04");
        assert_eq!(info.bios_version, "1.6.10");
        assert_eq!(info.memory_gib, 96);
        assert_eq!(info.cpu_cores, 16);
        assert!(info.power_on);
        assert_eq!(info.bmc_ip_address.to_string(), IP);

        let names: Vec<&str> = info.interfaces.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "iDRAC",
                "NIC.Integrated.1-1",
                "NIC.Integrated.1-2",
                "NIC.Slot.1-1",
                "NIC.Slot.1-2"
            ]
        );

        let idrac = info.bmc_interface().unwrap();
        assert_eq!(idrac.mac_address, "A8:3C:A5:35:43:86");
        assert_eq!(idrac.hostname.as_deref(), Some("idrac-33GSW04"));
        assert_eq!(
            idrac.neighbor,
            Some(LldpNeighbor {
                switch_mac_address: "C4:4D:84:48:61:80".to_string(),
                switch_port_name: "GigabitEthernet1/0/3".to_string(),
                stale: false,
            })
        );

        let slot = info.interfaces.iter().find(|i| i.name == "NIC.Slot.1-1").unwrap();
        assert_eq!(slot.description, "NIC in Slot 1 Port 1");
        assert_eq!(slot.mac_address, "14:23:F3:F5:25:F0");
        assert_eq!(slot.remote_switch_port_name(), Some("Ethernet1/6"));
    }

    #[tokio::test]
    async fn test_chassis_info_non_dell_has_no_lldp() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        let mut system = bmc.resource(SYSTEM_PATH).unwrap();
        system["Manufacturer"] = json!("HPE");
        bmc.set_resource(SYSTEM_PATH, system);

        let info = chassis_info(&bmc).await.unwrap();
        assert_eq!(info.manufacturer, "HP");
        assert!(info.interfaces.iter().all(|i| i.neighbor.is_none()));
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        bmc.set_accepted_password("calvin");

        let err = chassis_info(&bmc).await.unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_bios_settings_converge() {
        let bmc = MockBmc::r7615(IP, PASSWORD);

        let changes = update_bios_settings(&bmc, "NIC.Slot.1-1").await.unwrap();
        assert_eq!(
            changes.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["HttpDev1EnDis", "HttpDev1Interface", "HttpDev1TlsMode", "PxeDev1EnDis", "PxeDev1Interface", "TimeZone"]
        );
        assert_eq!(bmc.write_count(), 1);

        // The job stays queued until reboot; a second run must not fail
        let again = update_bios_settings(&bmc, "NIC.Slot.1-1").await.unwrap();
        assert_eq!(again, changes);
        assert_eq!(bmc.write_count(), 1);
    }

    #[tokio::test]
    async fn test_bios_settings_already_correct() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        bmc.set_resource(
            &format!("{SYSTEM_PATH}/Bios"),
            json!({"Attributes": {
                "PxeDev1EnDis": "Enabled",
                "PxeDev1Interface": "NIC.Slot.1-1",
                "HttpDev1EnDis": "Enabled",
                "HttpDev1Interface": "NIC.Slot.1-1",
                "HttpDev1TlsMode": "None",
                "TimeZone": "UTC",
                "InteractiveMode": "Disabled"
            }}),
        );

        let changes = update_bios_settings(&bmc, "NIC.Slot.1-1").await.unwrap();
        assert!(changes.is_empty());
        assert_eq!(bmc.write_count(), 0);
    }

    #[tokio::test]
    async fn test_bios_settings_other_errors_propagate() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        bmc.fail(Method::Patch, &format!("{SYSTEM_PATH}/Bios/Settings"), 500, "Internal error");

        let err = update_bios_settings(&bmc, "NIC.Slot.1-1").await.unwrap_err();
        assert!(matches!(err, RedfishError::Api { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_drac_settings() {
        let bmc = MockBmc::r7615(IP, PASSWORD);

        let changes = update_drac_settings(&bmc).await.unwrap();
        assert_eq!(changes.get("SNMP.1.AgentEnable"), Some(&json!("1")));
        assert_eq!(changes.get("SwitchConnectionView.1.Enable"), Some(&json!("Enabled")));
        assert_eq!(changes.len(), 2);

        let write = bmc.writes().pop().unwrap();
        assert_eq!(write.method, Method::Patch);
        assert_eq!(write.path, format!("{MANAGER_PATH}/Attributes"));
    }

    #[tokio::test]
    async fn test_drac_settings_missing_attribute() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        bmc.set_resource(
            &format!("{MANAGER_PATH}/Attributes"),
            json!({"Attributes": {"SNMP.1.AgentEnable": "Enabled"}}),
        );

        let err = update_drac_settings(&bmc).await.unwrap_err();
        assert!(matches!(err, RedfishError::MissingField { .. }));
        assert_eq!(bmc.write_count(), 0);
    }

    #[tokio::test]
    async fn test_set_hostname() {
        let bmc = MockBmc::r7615(IP, PASSWORD);

        assert!(set_hostname(&bmc, Some("idrac-33GSW04"), "Dell-33GSW04").await.unwrap());
        assert_eq!(bmc.resource(BMC_NIC_PATH).unwrap()["HostName"], "Dell-33GSW04");
        assert!(!set_hostname(&bmc, Some("Dell-33GSW04"), "Dell-33GSW04").await.unwrap());
        assert_eq!(bmc.write_count(), 1);

        assert!(set_hostname(&bmc, None, "").await.is_err());
    }

    #[tokio::test]
    async fn test_password_already_standard() {
        let bmc = MockBmc::r7615(IP, PASSWORD);

        let changed = set_bmc_password(&bmc, PASSWORD, None, Duration::ZERO).await.unwrap();
        assert!(!changed);
        assert_eq!(bmc.write_count(), 0);
        assert_eq!(bmc.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_password_rotated_from_factory_default() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        bmc.set_accepted_password("calvin1");

        let changed = set_bmc_password(&bmc, PASSWORD, Some("old-password"), Duration::ZERO)
            .await
            .unwrap();
        assert!(changed);
        assert_eq!(bmc.accepted_password(), PASSWORD);
        // standard, old, calvin, calvincalvin
        assert_eq!(bmc.rejected_logins(), 4);
        assert_eq!(bmc.open_sessions(), 0);

        let write = bmc
            .writes()
            .into_iter()
            .find(|w| w.path.starts_with("/redfish/v1/AccountService"))
            .unwrap();
        assert_eq!(write.path, "/redfish/v1/AccountService/Accounts/2");
        assert_eq!(write.payload, Some(json!({"Password": PASSWORD})));
    }

    #[tokio::test]
    async fn test_password_no_known_password() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        bmc.set_accepted_password("something-else");

        let err = set_bmc_password(&bmc, PASSWORD, None, Duration::ZERO).await.unwrap_err();
        assert!(matches!(err, RedfishError::Authentication(_)));
        assert_eq!(bmc.write_count(), 0);
    }

    #[tokio::test]
    async fn test_power_on() {
        let bmc = MockBmc::r7615(IP, PASSWORD);
        let mut system = bmc.resource(SYSTEM_PATH).unwrap();
        system["PowerState"] = json!("Off");
        bmc.set_resource(SYSTEM_PATH, system);

        let computer = crate::power::ComputerSystem::new(&bmc);
        assert_eq!(computer.power_state().await.unwrap(), PowerState::Off);
        computer.power_on().await.unwrap();
        assert_eq!(computer.power_state().await.unwrap(), PowerState::On);

        // Already on: no second reset
        computer.power_on().await.unwrap();
        assert_eq!(bmc.write_count(), 1);
    }

    #[tokio::test]
    async fn test_queued_resources() {
        let bmc = MockBmc::new(IP, PASSWORD);
        bmc.push_resource("/redfish/v1/Example", json!({"n": 1}));
        bmc.push_resource("/redfish/v1/Example", json!({"n": 2}));

        assert_eq!(bmc.get("/redfish/v1/Example").await.unwrap()["n"], 1);
        assert_eq!(bmc.get("/redfish/v1/Example/").await.unwrap()["n"], 2);
        assert_eq!(bmc.get("/redfish/v1/Example").await.unwrap()["n"], 2);
        assert!(bmc.get("/redfish/v1/Missing").await.is_err());
    }
}

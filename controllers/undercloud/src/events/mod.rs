//! Oslo notification routing
//!
//! One notification is read per invocation. Its `event_type` selects a
//! handler from a static table, and the handler mirrors the change into
//! Nautobot. Delivery is at-least-once, so every handler tolerates replays:
//! creates that collide become updates, and deleting something already gone
//! succeeds.
//!
//! Failures are classified by stage so the workflow can tell them apart:
//! unreadable input, unknown event type, client setup, and the handler
//! itself (see [`EventError`]).

pub mod ironic_node;
pub mod ironic_port;
pub mod ironic_portgroup;
pub mod keystone_project;
pub mod neutron_network;
pub mod neutron_subnet;

#[cfg(test)]
mod events_test;

use crate::config::DEFAULT_ARGO_OUTPUT_DIR;
use crate::error::{ControllerError, EventError};
use crate::reconciler::Reconciler;
use openstack_client::IdentityClientTrait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// A parsed notification
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub payload: Value,
}

impl Event {
    /// Deserialize `payload[key]`, e.g. `ironic_object.data` or `network`.
    pub(crate) fn payload_field<T: DeserializeOwned>(&self, key: &str) -> Result<T, ControllerError> {
        let value = self
            .payload
            .get(key)
            .ok_or_else(|| EventError::Parse(format!("{}: payload has no {key:?}", self.event_type)))?;
        serde_json::from_value(value.clone())
            .map_err(|e| EventError::Parse(format!("{}: invalid {key:?}: {e}", self.event_type)).into())
    }
}

/// Parse a notification, unwrapping the `oslo.message` envelope when present.
pub fn parse_event(raw: &str) -> Result<Event, EventError> {
    let mut value: Value = serde_json::from_str(raw).map_err(|e| EventError::Parse(format!("Invalid JSON: {e}")))?;
    if let Some(inner) = value.get("oslo.message").and_then(Value::as_str) {
        value = serde_json::from_str(inner).map_err(|e| EventError::Parse(format!("Invalid oslo.message: {e}")))?;
    }

    let event_type = match value.get("event_type") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::String(_)) | None => {
            return Err(EventError::Parse("Event must contain 'event_type' field".to_string()));
        }
        Some(_) => return Err(EventError::Parse("Event type must be a string".to_string())),
    };
    let payload = value.get("payload").cloned().unwrap_or(Value::Null);
    Ok(Event { event_type, payload })
}

/// Read a notification from `file`, or from stdin when `None`.
pub fn read_event(file: Option<&Path>) -> Result<Event, EventError> {
    let raw = match file {
        Some(path) => {
            debug!("Reading event from file: {}", path.display());
            std::fs::read_to_string(path).map_err(|e| EventError::Parse(format!("{}: {e}", path.display())))?
        }
        None => {
            debug!("Reading event from stdin");
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .map_err(|e| EventError::Parse(format!("stdin: {e}")))?;
            raw
        }
    };
    parse_event(&raw)
}

/// What to do with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    PortUpsert,
    PortDelete,
    PortgroupUpsert,
    PortgroupDelete,
    NodeProvisionSet,
    NetworkUpsert,
    NetworkDelete,
    SubnetUpsert,
    SubnetDelete,
    Project,
}

const HANDLERS: &[(&str, Handler)] = &[
    ("baremetal.port.create.end", Handler::PortUpsert),
    ("baremetal.port.update.end", Handler::PortUpsert),
    ("baremetal.port.delete.end", Handler::PortDelete),
    ("baremetal.portgroup.create.end", Handler::PortgroupUpsert),
    ("baremetal.portgroup.update.end", Handler::PortgroupUpsert),
    ("baremetal.portgroup.delete.end", Handler::PortgroupDelete),
    ("baremetal.node.provision_set.end", Handler::NodeProvisionSet),
    ("network.create.end", Handler::NetworkUpsert),
    ("network.update.end", Handler::NetworkUpsert),
    ("network.delete.end", Handler::NetworkDelete),
    ("subnet.create.end", Handler::SubnetUpsert),
    ("subnet.update.end", Handler::SubnetUpsert),
    ("subnet.delete.end", Handler::SubnetDelete),
    ("identity.project.created", Handler::Project),
    ("identity.project.updated", Handler::Project),
    ("identity.project.deleted", Handler::Project),
];

impl Handler {
    /// Look up the handler for `event_type`.
    pub fn for_event_type(event_type: &str) -> Result<Self, EventError> {
        HANDLERS
            .iter()
            .find(|(name, _)| *name == event_type)
            .map(|(_, handler)| *handler)
            .ok_or_else(|| EventError::NoHandler(event_type.to_string()))
    }

    pub fn event_types() -> impl Iterator<Item = &'static str> {
        HANDLERS.iter().map(|(name, _)| *name)
    }
}

/// Runs handlers against Nautobot, Ironic and Keystone.
pub struct EventRouter {
    pub(crate) reconciler: Reconciler,
    pub(crate) identity: Box<dyn IdentityClientTrait>,
    pub(crate) ucvni_group_name: Option<String>,
    pub(crate) argo_output_dir: PathBuf,
}

impl EventRouter {
    pub fn new(reconciler: Reconciler, identity: Box<dyn IdentityClientTrait>) -> Self {
        Self {
            reconciler,
            identity,
            ucvni_group_name: None,
            argo_output_dir: PathBuf::from(DEFAULT_ARGO_OUTPUT_DIR),
        }
    }

    #[must_use]
    pub fn with_ucvni_group_name(mut self, ucvni_group_name: Option<String>) -> Self {
        self.ucvni_group_name = ucvni_group_name;
        self
    }

    #[must_use]
    pub fn with_argo_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.argo_output_dir = dir.into();
        self
    }

    /// Run `handler` for `event`.
    pub async fn dispatch(&self, handler: Handler, event: &Event) -> Result<(), EventError> {
        info!("Executing {handler:?} for {}", event.event_type);
        let result = match handler {
            Handler::PortUpsert => self.handle_port_upsert(event).await,
            Handler::PortDelete => self.handle_port_delete(event).await,
            Handler::PortgroupUpsert => self.handle_portgroup_upsert(event).await,
            Handler::PortgroupDelete => self.handle_portgroup_delete(event).await,
            Handler::NodeProvisionSet => self.handle_provision_set(event).await,
            Handler::NetworkUpsert => self.handle_network_upsert(event).await,
            Handler::NetworkDelete => self.handle_network_delete(event).await,
            Handler::SubnetUpsert => self.handle_subnet_upsert(event).await,
            Handler::SubnetDelete => self.handle_subnet_delete(event).await,
            Handler::Project => self.handle_project(event).await,
        };
        // A payload the handler cannot read is still a parse failure
        result.map_err(|source| match source {
            ControllerError::Event(e) => e,
            source => EventError::Handler {
                event_type: event.event_type.clone(),
                source: Box::new(source),
            },
        })?;
        info!("✅ Handled {}", event.event_type);
        Ok(())
    }
}

/// Handle one notification from `file` (stdin when `None`).
///
/// The event is parsed and matched to a handler before `router` runs, so
/// a malformed or unknown event never needs configuration or credentials.
/// Any failure building the router is a client initialization error.
pub async fn route_event<F, Fut>(file: Option<&Path>, router: F) -> Result<(), EventError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<EventRouter, ControllerError>>,
{
    let event = read_event(file)?;
    let handler = Handler::for_event_type(&event.event_type)?;
    let router = router().await.map_err(|e| EventError::ClientInit(e.to_string()))?;
    router.dispatch(handler, &event).await
}

/// Treat "not found" from a delete as success.
pub(crate) fn ignore_missing(result: Result<(), nautobot_client::NautobotError>, what: &str) -> Result<(), ControllerError> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_not_found() => {
            debug!("{what} already gone");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

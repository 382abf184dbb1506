//! `network.*` notifications
//!
//! Every Neutron network is a UCVNI in Nautobot plus an IPAM namespace,
//! named after the network UUID, that holds the network's subnets.

use super::{Event, EventRouter, ignore_missing};
use crate::error::ControllerError;
use nautobot_client::{NameRef, Ucvni, UcvniRequest};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use uuid::Uuid;

/// `payload.network` of a network notification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NetworkEvent {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub project_id: Uuid,
    #[serde(rename = "router:external", default)]
    pub external: bool,
    #[serde(rename = "provider:segmentation_id", default)]
    pub segmentation_id: Option<u32>,
}

impl NetworkEvent {
    pub fn from_event(event: &Event) -> Result<Self, ControllerError> {
        event.payload_field("network")
    }

    fn namespace(&self) -> String {
        self.id.to_string()
    }
}

impl EventRouter {
    pub(crate) async fn handle_network_upsert(&self, event: &Event) -> Result<(), ControllerError> {
        let network = NetworkEvent::from_event(event)?;
        info!("Handling network create/update for {} ({})", network.name, network.id);
        let group = self
            .ucvni_group_name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("Please set environment variable UCVNI_GROUP_NAME".to_string()))?;

        self.ensure_namespace(&network.namespace()).await?;

        let nautobot = self.reconciler.nautobot();
        if let Some(existing) = nautobot.get_ucvni(network.id).await? {
            return self.update_ucvni(&existing, &network).await;
        }
        let request = UcvniRequest {
            id: network.id,
            name: network.name.clone(),
            status: NameRef::new("Active"),
            tenant: network.project_id,
            ucvni_group: NameRef::new(group),
            ucvni_id: network.segmentation_id,
        };
        match nautobot.create_ucvni(&request).await {
            Ok(created) => {
                info!("Created UCVNI {} ({})", created.name, created.id);
                Ok(())
            }
            Err(e) if e.is_idempotence_collision() => {
                debug!("UCVNI {} already existed in Nautobot", network.id);
                match nautobot.get_ucvni(network.id).await? {
                    Some(existing) => self.update_ucvni(&existing, &network).await,
                    None => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_namespace(&self, name: &str) -> Result<(), ControllerError> {
        let nautobot = self.reconciler.nautobot();
        if nautobot.find_namespace(name).await?.is_some() {
            debug!("Namespace {name} already exists");
            return Ok(());
        }
        match nautobot.create_namespace(name).await {
            Ok(namespace) => {
                info!("Created namespace {name} ({})", namespace.id);
                Ok(())
            }
            Err(e) if e.is_idempotence_collision() => {
                debug!("Namespace {name} was created concurrently");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn update_ucvni(&self, existing: &Ucvni, network: &NetworkEvent) -> Result<(), ControllerError> {
        let mut patch = Map::new();
        if existing.name != network.name {
            patch.insert("name".to_string(), json!(network.name));
        }
        if existing.tenant.as_ref().map(|t| t.id) != Some(network.project_id) {
            patch.insert("tenant".to_string(), json!(network.project_id));
        }
        if network.segmentation_id.is_some() && existing.ucvni_id != network.segmentation_id {
            patch.insert("ucvni_id".to_string(), json!(network.segmentation_id));
        }
        if patch.is_empty() {
            debug!("UCVNI {} is up to date", network.id);
            return Ok(());
        }
        info!("Updating UCVNI {}: {:?}", network.id, patch.keys().collect::<Vec<_>>());
        self.reconciler
            .nautobot()
            .update_ucvni(network.id, &Value::Object(patch))
            .await?;
        Ok(())
    }

    pub(crate) async fn handle_network_delete(&self, event: &Event) -> Result<(), ControllerError> {
        let network = NetworkEvent::from_event(event)?;
        let nautobot = self.reconciler.nautobot();
        let name = network.namespace();

        match nautobot.find_namespace(&name).await? {
            Some(namespace) => {
                for prefix in nautobot.prefixes_in_namespace(&name).await? {
                    info!("Deleting prefix {} from namespace {name}", prefix.prefix);
                    ignore_missing(nautobot.delete_prefix(prefix.id).await, "prefix")?;
                }
                info!("Deleting namespace {name}");
                ignore_missing(nautobot.delete_namespace(namespace.id).await, "namespace")?;
            }
            None => debug!("No namespace {name} to clean up"),
        }

        info!("Deleting UCVNI {}", network.id);
        ignore_missing(nautobot.delete_ucvni(network.id).await, "UCVNI")
    }
}

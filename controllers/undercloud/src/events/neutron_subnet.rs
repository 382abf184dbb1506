//! `subnet.*` notifications, mirrored as Nautobot prefixes keyed by subnet UUID

use super::{Event, EventRouter, ignore_missing};
use crate::error::ControllerError;
use nautobot_client::{NameRef, Prefix, PrefixRequest};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use uuid::Uuid;

/// Namespace of subnets on external (provider) networks
pub const GLOBAL_NAMESPACE: &str = "Global";

/// `payload.subnet` of a subnet notification
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubnetEvent {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    pub project_id: Uuid,
    pub network_id: Uuid,
    pub cidr: String,
    #[serde(rename = "router:external", default)]
    pub external: bool,
}

impl SubnetEvent {
    pub fn from_event(event: &Event) -> Result<Self, ControllerError> {
        event.payload_field("subnet")
    }

    pub fn namespace(&self) -> String {
        if self.external {
            GLOBAL_NAMESPACE.to_string()
        } else {
            self.network_id.to_string()
        }
    }

    fn patch_for(&self, prefix: &Prefix) -> Map<String, Value> {
        let mut patch = Map::new();
        if prefix.prefix != self.cidr {
            patch.insert("prefix".to_string(), json!(self.cidr));
        }
        let namespace = self.namespace();
        if prefix.namespace.as_ref().and_then(|n| n.name.as_deref()) != Some(namespace.as_str()) {
            patch.insert("namespace".to_string(), json!({"name": namespace}));
        }
        if prefix.tenant.as_ref().map(|t| t.id) != Some(self.project_id) {
            patch.insert("tenant".to_string(), json!({"id": self.project_id}));
        }
        if prefix.status.as_ref().and_then(|s| s.name.as_deref()) != Some("Active") {
            patch.insert("status".to_string(), json!("Active"));
        }
        patch
    }
}

impl EventRouter {
    pub(crate) async fn handle_subnet_upsert(&self, event: &Event) -> Result<(), ControllerError> {
        let subnet = SubnetEvent::from_event(event)?;
        let nautobot = self.reconciler.nautobot();

        if let Some(existing) = nautobot.get_prefix(subnet.id).await? {
            return self.refresh_prefix(&subnet, &existing).await;
        }

        let request = PrefixRequest {
            id: subnet.id,
            prefix: subnet.cidr.clone(),
            status: "Active".to_string(),
            namespace: NameRef::new(subnet.namespace()),
            tenant: Some(subnet.project_id),
        };
        match nautobot.create_prefix(&request).await {
            Ok(created) => {
                info!("Created prefix {} in namespace {}", created.prefix, subnet.namespace());
                Ok(())
            }
            Err(e) if e.is_idempotence_collision() => {
                info!("Prefix {} was created concurrently, updating", subnet.id);
                let existing = nautobot.get_prefix(subnet.id).await?.ok_or(e)?;
                self.refresh_prefix(&subnet, &existing).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn refresh_prefix(&self, subnet: &SubnetEvent, existing: &Prefix) -> Result<(), ControllerError> {
        let patch = subnet.patch_for(existing);
        if patch.is_empty() {
            debug!("Prefix {} is up to date", subnet.id);
        } else {
            info!("Updating prefix {} ({}): {:?}", subnet.id, subnet.cidr, patch.keys().collect::<Vec<_>>());
            self.reconciler
                .nautobot()
                .update_prefix(subnet.id, &Value::Object(patch))
                .await?;
        }
        Ok(())
    }

    pub(crate) async fn handle_subnet_delete(&self, event: &Event) -> Result<(), ControllerError> {
        let subnet = SubnetEvent::from_event(event)?;
        info!("Deleting prefix {}", subnet.id);
        ignore_missing(self.reconciler.nautobot().delete_prefix(subnet.id).await, "prefix")
    }
}

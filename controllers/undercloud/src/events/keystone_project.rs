//! `identity.project.*` notifications
//!
//! Storage for tenant projects is provisioned by a later workflow step. The
//! router only decides whether that step runs, by publishing the project id
//! and the kind of change as Argo outputs for projects tagged
//! [`SVM_PROJECT_TAG`].

use super::{Event, EventRouter};
use crate::argo::save_output;
use crate::error::{ControllerError, EventError};
use tracing::{debug, info};

pub const SVM_PROJECT_TAG: &str = "UNDERSTACK_SVM";
const DELETED: &str = "deleted";

/// Project id from `payload.target.id`
pub fn project_id(event: &Event) -> Result<String, ControllerError> {
    event
        .payload
        .get("target")
        .and_then(|t| t.get("id"))
        .and_then(|id| id.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| EventError::Parse(format!("{}: no project id in payload.target", event.event_type)).into())
}

/// `created`, `updated` or `deleted`
fn change(event_type: &str) -> &str {
    event_type.rsplit('.').next().unwrap_or(event_type)
}

impl EventRouter {
    pub(crate) async fn handle_project(&self, event: &Event) -> Result<(), ControllerError> {
        let id = project_id(event)?;
        let change = change(&event.event_type);
        match self.identity.get_project(&id).await? {
            Some(project) => {
                debug!("Project {id} has tags {:?}", project.tags);
                if !project.has_tag(SVM_PROJECT_TAG) {
                    info!("Project {id} is not tagged {SVM_PROJECT_TAG}, skipping storage workflow");
                    return Ok(());
                }
                info!("Project {id} ({}) {change}, requesting storage workflow", project.name);
            }
            // Tags are gone with the project; the storage step checks for an SVM itself
            None if change == DELETED => {
                info!("Project {id} deleted, requesting storage cleanup");
            }
            None => {
                info!("Project {id} not found in Keystone, nothing to do");
                return Ok(());
            }
        }

        save_output(&self.argo_output_dir, "svm_project_id", &id)?;
        save_output(&self.argo_output_dir, "svm_event", change)?;
        Ok(())
    }
}

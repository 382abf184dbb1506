//! Mock Undersync for unit testing

use crate::error::UndersyncError;
use crate::undersync_trait::{SyncMode, UndersyncTrait};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Records every push instead of talking to switches
#[derive(Clone, Default)]
pub struct MockUndersync {
    pub(crate) calls: Arc<Mutex<Vec<(Vec<Uuid>, SyncMode)>>>,
    pub(crate) failure: Arc<Mutex<Option<(u16, String)>>>,
}

impl MockUndersync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call with `status` and `body`
    pub fn fail_with(&self, status: u16, body: &str) {
        *self.failure.lock().unwrap() = Some((status, body.to_string()));
    }

    /// Calls received so far, in order
    pub fn calls(&self) -> Vec<(Vec<Uuid>, SyncMode)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl UndersyncTrait for MockUndersync {
    async fn sync_devices(&self, vlan_group_ids: &[Uuid], mode: SyncMode) -> Result<Value, UndersyncError> {
        self.calls.lock().unwrap().push((vlan_group_ids.to_vec(), mode));
        if let Some((status, body)) = self.failure.lock().unwrap().clone() {
            return Err(UndersyncError::Api { status, body });
        }
        Ok(json!({}))
    }
}

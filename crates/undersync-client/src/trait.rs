//! Undersync trait for mocking

use crate::error::UndersyncError;
use serde_json::Value;
use uuid::Uuid;

/// What Undersync should do with the rendered configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncMode {
    /// Push only if the switch is in the expected state
    Sync,
    /// Render and diff without pushing
    DryRun,
    /// Push regardless of the switch's current state
    Force,
}

impl SyncMode {
    /// `dry_run` wins over `force`.
    pub fn from_flags(force: bool, dry_run: bool) -> Self {
        if dry_run {
            Self::DryRun
        } else if force {
            Self::Force
        } else {
            Self::Sync
        }
    }

    /// Final URL path segment
    pub fn as_path(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::DryRun => "dry-run",
            Self::Force => "force",
        }
    }
}

/// Trait for Undersync operations
#[async_trait::async_trait]
pub trait UndersyncTrait: Send + Sync {
    /// Render and push the configuration of every switch in `vlan_group_ids`
    ///
    /// # Returns
    /// The JSON body Undersync answered with (`{}` when empty)
    async fn sync_devices(&self, vlan_group_ids: &[Uuid], mode: SyncMode) -> Result<Value, UndersyncError>;
}

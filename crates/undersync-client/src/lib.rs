//! Undersync Client
//!
//! Undersync renders switch configuration from Nautobot and pushes it to the
//! switches of one or more VLAN groups. The reconcilers call it after any
//! Nautobot change that is visible on a switch.
//!
//! # Example
//!
//! ```no_run
//! use undersync_client::{SyncMode, Undersync, UndersyncTrait};
//! use uuid::Uuid;
//!
//! # async fn example(vlan_group: Uuid) -> Result<(), Box<dyn std::error::Error>> {
//! let undersync = Undersync::new(
//!     undersync_client::DEFAULT_URL.to_string(),
//!     "your-token".to_string(),
//! )?;
//! undersync.sync_devices(&[vlan_group], SyncMode::from_flags(false, true)).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
#[path = "trait.rs"]
pub mod undersync_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::{DEFAULT_URL, Undersync};
pub use error::UndersyncError;
pub use undersync_trait::{SyncMode, UndersyncTrait};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockUndersync;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_wins_over_force() {
        assert_eq!(SyncMode::from_flags(true, true), SyncMode::DryRun);
        assert_eq!(SyncMode::from_flags(true, false), SyncMode::Force);
        assert_eq!(SyncMode::from_flags(false, false), SyncMode::Sync);
    }

    #[test]
    fn test_url_joins_groups() {
        let undersync = Undersync::new("http://undersync:8080/".to_string(), "t".to_string()).unwrap();
        let a = uuid::Uuid::parse_str("7e7c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d07").unwrap();
        let b = uuid::Uuid::parse_str("8f8c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d08").unwrap();
        assert_eq!(
            undersync.url(&[a, b], SyncMode::Force),
            "http://undersync:8080/v1/vlan-group/7e7c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d07,8f8c7f3a-8d57-4d4c-9e0e-0a4c9c7f1d08/force"
        );
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let mock = MockUndersync::new();
        let group = uuid::Uuid::new_v4();
        mock.sync_devices(&[group], SyncMode::Sync).await.unwrap();
        mock.fail_with(502, "switch unreachable");
        assert!(mock.sync_devices(&[group], SyncMode::Sync).await.is_err());
        assert_eq!(mock.calls().len(), 2);
    }
}

//! Unit tests for inspection-driven sync

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconciler::inspection::{parse_inventory, read_inventory};
    use crate::test_utils::*;
    use chassis::inspection::inspection_from_chassis;
    use nautobot_client::MockNautobotClient;
    use openstack_client::MockIronicClient;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_inspected_server_syncs_device_and_ports() {
        let nautobot = MockNautobotClient::new("http://nautobot.test");
        let ironic = MockIronicClient::new();
        seed_switches(&nautobot);
        let reconciler = create_test_reconciler(&nautobot, &ironic);
        let enrolled = reconciler.find_or_create(&create_test_chassis()).await.unwrap();
        ironic.add_node(create_test_node(enrolled.id, "manageable"));
        let inventory = inspection_from_chassis(&create_test_chassis());

        let (device, summary) = reconciler.sync_inspected(&inventory, false).await.unwrap();

        assert_eq!(device.id, enrolled.id);
        assert!(!summary.locked);
        assert_eq!(summary.created.len(), 4);
        let mut macs: Vec<String> = ironic.ports_of(device.id).into_iter().map(|p| p.address.to_lowercase()).collect();
        macs.sort_unstable();
        assert_eq!(
            macs,
            vec!["14:23:f3:f5:25:f0", "14:23:f3:f5:25:f1", "d4:04:e6:4f:8d:b4", "d4:04:e6:4f:8d:b5"]
        );
    }

    #[tokio::test]
    async fn test_inspected_dry_run_leaves_ironic_alone() {
        let nautobot = MockNautobotClient::new("http://nautobot.test");
        let ironic = MockIronicClient::new();
        seed_switches(&nautobot);
        let reconciler = create_test_reconciler(&nautobot, &ironic);
        let enrolled = reconciler.find_or_create(&create_test_chassis()).await.unwrap();
        ironic.add_node(create_test_node(enrolled.id, "manageable"));
        ironic.clear_writes();

        let inventory = inspection_from_chassis(&create_test_chassis());
        let (_, summary) = reconciler.sync_inspected(&inventory, true).await.unwrap();

        assert_eq!(summary.created.len(), 4);
        assert_eq!(ironic.write_count(), 0);
    }

    #[test]
    fn test_inventory_with_or_without_wrapper() {
        let inventory = inspection_from_chassis(&create_test_chassis());
        let bare = serde_json::to_value(&inventory).unwrap();

        assert_eq!(parse_inventory(&bare.to_string()).unwrap(), inventory);
        assert_eq!(parse_inventory(&json!({"inventory": bare}).to_string()).unwrap(), inventory);
        assert!(parse_inventory(r#"{"inventory": {"hostname": "x"}}"#).is_err());
    }

    #[test]
    fn test_missing_inventory_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_inventory(&dir.path().join("inventory.json")).unwrap_err();
        assert!(matches!(err, ControllerError::Io(_)));
        assert_eq!(err.exit_code(), 1);
    }
}

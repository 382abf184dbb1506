//! Unit tests for the event router and its handlers

#[cfg(test)]
mod tests {
    use crate::config::{Config, GlobalArgs};
    use crate::error::{ControllerError, EventError};
    use crate::events::{EventRouter, Handler, parse_event, route_event};
    use clap::Parser;
    use crate::test_utils::*;
    use nautobot_client::{MockNautobotClient, NautobotDevice};
    use openstack_client::{MockIdentityClient, MockIronicClient};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use std::fs;
    use std::path::Path;
    use uuid::Uuid;

    const PROJECT: &str = "b8b2a5d1c0e14ef8a0d7d3fbb1d1e4a0";

    struct Fixture {
        nautobot: MockNautobotClient,
        identity: MockIdentityClient,
        router: EventRouter,
        device: NautobotDevice,
    }

    async fn enrolled() -> Fixture {
        let nautobot = MockNautobotClient::new("http://nautobot.test");
        let ironic = MockIronicClient::new();
        let identity = MockIdentityClient::new();
        seed_switches(&nautobot);
        let reconciler = create_test_reconciler(&nautobot, &ironic);
        let device = reconciler.find_or_create(&create_test_chassis()).await.unwrap();
        nautobot.clear_writes();
        let router = EventRouter::new(reconciler, Box::new(identity.clone()))
            .with_ucvni_group_name(Some("FABRIC-UCVNI".to_string()));
        Fixture {
            nautobot,
            identity,
            router,
            device,
        }
    }

    async fn handle(f: &Fixture, event: Value) -> Result<(), EventError> {
        let event = parse_event(&event.to_string())?;
        let handler = Handler::for_event_type(&event.event_type)?;
        f.router.dispatch(handler, &event).await
    }

    fn port_event(event_type: &str, uuid: Uuid, node: Uuid, name: &str, switch: &str, port: &str) -> Value {
        json!({
            "event_type": event_type,
            "payload": {"ironic_object.data": {
                "uuid": uuid,
                "name": name,
                "address": "14:23:f3:f5:26:00",
                "node_uuid": node,
                "local_link_connection": {
                    "switch_info": switch,
                    "port_id": port,
                    "switch_id": "c4:7e:e0:e4:10:7f",
                },
            }},
        })
    }

    fn network_event(event_type: &str, id: Uuid, name: &str) -> Value {
        json!({
            "event_type": event_type,
            "payload": {"network": {
                "id": id,
                "name": name,
                "project_id": PROJECT,
                "router:external": false,
                "provider:segmentation_id": 1800,
            }},
        })
    }

    fn subnet_event(event_type: &str, id: Uuid, network: Uuid, cidr: &str, external: bool) -> Value {
        json!({
            "event_type": event_type,
            "payload": {"subnet": {
                "id": id,
                "name": "tenant-subnet",
                "project_id": PROJECT,
                "network_id": network,
                "cidr": cidr,
                "router:external": external,
            }},
        })
    }

    #[test]
    fn test_parse_oslo_message_wrapper() {
        let inner = json!({"event_type": "network.create.end", "payload": {"network": {}}}).to_string();
        let event = parse_event(&json!({"oslo.version": "2.0", "oslo.message": inner}).to_string()).unwrap();
        assert_eq!(event.event_type, "network.create.end");
        assert_eq!(event.payload, json!({"network": {}}));
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(parse_event("{not json").unwrap_err().exit_code(), 5);
        assert_eq!(parse_event(r#"{"payload": {}}"#).unwrap_err().exit_code(), 5);
        assert_eq!(parse_event(r#"{"event_type": 42}"#).unwrap_err().exit_code(), 5);
        assert_eq!(parse_event(r#"{"event_type": ""}"#).unwrap_err().exit_code(), 5);
    }

    #[test]
    fn test_handler_table() {
        assert_eq!(Handler::for_event_type("baremetal.port.update.end").unwrap(), Handler::PortUpsert);
        assert_eq!(Handler::for_event_type("identity.project.deleted").unwrap(), Handler::Project);
        assert_eq!(Handler::for_event_type("compute.instance.create.end").unwrap_err().exit_code(), 6);
        assert_eq!(Handler::event_types().count(), 16);
    }

    #[tokio::test]
    async fn test_port_create_and_replay() {
        let f = enrolled().await;
        let uuid = Uuid::new_v4();
        let event = port_event(
            "baremetal.port.create.end",
            uuid,
            f.device.id,
            "Dell-33GSW04:NIC.Slot.2-1",
            LEAF_1,
            "Ethernet1/6",
        );

        handle(&f, event.clone()).await.unwrap();

        let interface = f.nautobot.interface(uuid).unwrap();
        assert_eq!(interface.name, "NIC.Slot.2-1");
        assert_eq!(interface.device.id, f.device.id);
        assert!(interface.cable.is_some());
        assert_eq!(
            f.nautobot.writes(),
            vec!["POST dcim/interfaces".to_string(), "POST dcim/cables".to_string()]
        );

        f.nautobot.clear_writes();
        handle(&f, event).await.unwrap();
        assert_eq!(f.nautobot.write_count(), 0);
    }

    #[tokio::test]
    async fn test_port_replacing_a_cabled_switch_port() {
        let f = enrolled().await;
        let old = Uuid::new_v4();
        let old_port = port_event("baremetal.port.create.end", old, f.device.id, "NIC.Slot.2-1", LEAF_1, "Ethernet1/6");
        handle(&f, old_port).await.unwrap();
        f.nautobot.clear_writes();

        // New NIC, same switch port
        let new = Uuid::new_v4();
        let new_port = port_event("baremetal.port.create.end", new, f.device.id, "NIC.Slot.2-2", LEAF_1, "Ethernet1/6");
        handle(&f, new_port.clone()).await.unwrap();

        assert_eq!(
            f.nautobot.writes(),
            vec!["POST dcim/interfaces".to_string(), "PATCH dcim/cables".to_string()]
        );
        let leaf = f.nautobot.device_named(LEAF_1).unwrap().id;
        let leaf_port = f
            .nautobot
            .interfaces_of(leaf)
            .into_iter()
            .find(|i| i.name == "Ethernet1/6")
            .unwrap()
            .id;
        let cables = f.nautobot.cables();
        assert!(cables.iter().any(|c| c.connects(new, leaf_port)));
        assert!(!cables.iter().any(|c| c.terminates_on(old)));

        f.nautobot.clear_writes();
        handle(&f, new_port).await.unwrap();
        assert_eq!(f.nautobot.write_count(), 0);
    }

    #[tokio::test]
    async fn test_port_update_moves_cable() {
        let f = enrolled().await;
        let slot = f.device.interface("NIC.Slot.1-1").unwrap().id;
        let event = port_event(
            "baremetal.port.update.end",
            slot,
            f.device.id,
            "Dell-33GSW04:NIC.Slot.1-1",
            LEAF_2,
            "Ethernet1/6",
        );

        handle(&f, event).await.unwrap();

        assert_eq!(f.nautobot.writes(), vec!["PATCH dcim/cables".to_string()]);
        let leaf = f.nautobot.device_named(LEAF_2).unwrap().id;
        let leaf_port = f
            .nautobot
            .interfaces_of(leaf)
            .into_iter()
            .find(|i| i.name == "Ethernet1/6")
            .unwrap()
            .id;
        let cable = f.nautobot.cables().into_iter().find(|c| c.terminates_on(slot)).unwrap();
        assert!(cable.connects(slot, leaf_port));
    }

    #[tokio::test]
    async fn test_port_on_unknown_switch_port_fails() {
        let f = enrolled().await;
        let event = port_event(
            "baremetal.port.create.end",
            Uuid::new_v4(),
            f.device.id,
            "NIC.Slot.2-1",
            LEAF_1,
            "Ethernet9/9",
        );

        let err = handle(&f, event).await.unwrap_err();
        assert!(matches!(err, EventError::Handler { .. }));
        assert_eq!(err.exit_code(), 8);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_parse_error() {
        let f = enrolled().await;
        let event = json!({"event_type": "baremetal.port.create.end", "payload": {"ironic_object.data": {"uuid": "nope"}}});

        assert_eq!(handle(&f, event).await.unwrap_err().exit_code(), 5);
        assert_eq!(f.nautobot.write_count(), 0);
    }

    #[tokio::test]
    async fn test_port_delete_is_replayable() {
        let f = enrolled().await;
        let slot = f.device.interface("NIC.Slot.1-1").unwrap().id;
        let event = port_event("baremetal.port.delete.end", slot, f.device.id, "NIC.Slot.1-1", LEAF_2, "Ethernet1/5");

        handle(&f, event.clone()).await.unwrap();
        assert_eq!(
            f.nautobot.writes(),
            vec!["DELETE dcim/cables".to_string(), "DELETE dcim/interfaces".to_string()]
        );
        assert!(f.nautobot.interface(slot).is_none());

        f.nautobot.clear_writes();
        handle(&f, event).await.unwrap();
        assert_eq!(f.nautobot.write_count(), 0);
    }

    #[tokio::test]
    async fn test_portgroup_create_race() {
        let f = enrolled().await;
        let uuid = Uuid::new_v4();
        let event = json!({
            "event_type": "baremetal.portgroup.create.end",
            "payload": {"ironic_object.data": {
                "uuid": uuid,
                "name": "Dell-33GSW04_bond0",
                "node_uuid": f.device.id,
                "mode": "802.3ad",
            }},
        });
        f.nautobot.race_next_create("dcim/interfaces");

        handle(&f, event).await.unwrap();

        let lag = f.nautobot.interface(uuid).unwrap();
        assert_eq!(lag.name, "bond0");
        assert_eq!(lag.interface_type, "lag");
        assert_eq!(
            f.nautobot.writes(),
            vec!["POST dcim/interfaces".to_string(), "PATCH dcim/interfaces".to_string()]
        );

        let delete = json!({
            "event_type": "baremetal.portgroup.delete.end",
            "payload": {"ironic_object.data": {"uuid": uuid, "node_uuid": f.device.id}},
        });
        handle(&f, delete.clone()).await.unwrap();
        assert!(f.nautobot.interface(uuid).is_none());
        handle(&f, delete).await.unwrap();
    }

    #[tokio::test]
    async fn test_network_create_update_and_replay() {
        let f = enrolled().await;
        let id = Uuid::new_v4();

        handle(&f, network_event("network.create.end", id, "tenant-net")).await.unwrap();

        assert!(f.nautobot.namespace_named(&id.to_string()).is_some());
        let ucvni = f.nautobot.ucvni(id).unwrap();
        assert_eq!(ucvni.name, "tenant-net");
        assert_eq!(ucvni.ucvni_id, Some(1800));
        assert_eq!(ucvni.ucvni_group.and_then(|g| g.name).as_deref(), Some("FABRIC-UCVNI"));
        assert_eq!(
            f.nautobot.writes(),
            vec![
                "POST ipam/namespaces".to_string(),
                "POST plugins/undercloud-vni/ucvnis".to_string()
            ]
        );

        f.nautobot.clear_writes();
        handle(&f, network_event("network.create.end", id, "tenant-net")).await.unwrap();
        assert_eq!(f.nautobot.write_count(), 0);

        handle(&f, network_event("network.update.end", id, "renamed-net")).await.unwrap();
        assert_eq!(f.nautobot.ucvni(id).unwrap().name, "renamed-net");
        assert_eq!(f.nautobot.writes(), vec!["PATCH plugins/undercloud-vni/ucvnis".to_string()]);
    }

    #[tokio::test]
    async fn test_network_create_needs_ucvni_group() {
        let nautobot = MockNautobotClient::new("http://nautobot.test");
        let ironic = MockIronicClient::new();
        let router = EventRouter::new(create_test_reconciler(&nautobot, &ironic), Box::new(MockIdentityClient::new()));
        let event = parse_event(&network_event("network.create.end", Uuid::new_v4(), "net").to_string()).unwrap();

        let err = router.dispatch(Handler::NetworkUpsert, &event).await.unwrap_err();

        assert_eq!(err.exit_code(), 8);
        assert!(err.to_string().contains("UCVNI_GROUP_NAME"));
        assert_eq!(nautobot.write_count(), 0);
    }

    #[tokio::test]
    async fn test_network_delete_removes_subnets() {
        let f = enrolled().await;
        let network = Uuid::new_v4();
        let subnet = Uuid::new_v4();
        handle(&f, network_event("network.create.end", network, "tenant-net")).await.unwrap();
        handle(&f, subnet_event("subnet.create.end", subnet, network, "192.168.10.0/24", false))
            .await
            .unwrap();

        let delete = network_event("network.delete.end", network, "tenant-net");
        handle(&f, delete.clone()).await.unwrap();

        assert!(f.nautobot.prefix(subnet).is_none());
        assert!(f.nautobot.namespace_named(&network.to_string()).is_none());
        assert!(f.nautobot.ucvni(network).is_none());

        // Replayed delete finds nothing left and still succeeds
        handle(&f, delete).await.unwrap();
    }

    #[tokio::test]
    async fn test_subnet_lifecycle() {
        let f = enrolled().await;
        let network = Uuid::new_v4();
        let subnet = Uuid::new_v4();
        handle(&f, network_event("network.create.end", network, "tenant-net")).await.unwrap();
        f.nautobot.clear_writes();

        handle(&f, subnet_event("subnet.create.end", subnet, network, "192.168.10.0/24", false))
            .await
            .unwrap();
        let prefix = f.nautobot.prefix(subnet).unwrap();
        assert_eq!(prefix.prefix, "192.168.10.0/24");
        assert_eq!(
            prefix.namespace.and_then(|n| n.name),
            Some(network.to_string())
        );
        assert_eq!(prefix.tenant.map(|t| t.id), Some(Uuid::parse_str(PROJECT).unwrap()));
        assert_eq!(f.nautobot.writes(), vec!["POST ipam/prefixes".to_string()]);

        f.nautobot.clear_writes();
        handle(&f, subnet_event("subnet.update.end", subnet, network, "192.168.10.0/24", false))
            .await
            .unwrap();
        assert_eq!(f.nautobot.write_count(), 0);

        handle(&f, subnet_event("subnet.update.end", subnet, network, "192.168.10.0/23", false))
            .await
            .unwrap();
        assert_eq!(f.nautobot.prefix(subnet).unwrap().prefix, "192.168.10.0/23");

        let delete = subnet_event("subnet.delete.end", subnet, network, "192.168.10.0/23", false);
        handle(&f, delete.clone()).await.unwrap();
        assert!(f.nautobot.prefix(subnet).is_none());
        handle(&f, delete).await.unwrap();
    }

    #[tokio::test]
    async fn test_subnet_create_race() {
        let f = enrolled().await;
        let network = Uuid::new_v4();
        let subnet = Uuid::new_v4();
        handle(&f, network_event("network.create.end", network, "tenant-net")).await.unwrap();
        f.nautobot.clear_writes();

        // The other consumer's create lands first
        f.nautobot.race_next_create("ipam/prefixes");
        handle(&f, subnet_event("subnet.create.end", subnet, network, "192.168.20.0/24", false))
            .await
            .unwrap();

        assert_eq!(f.nautobot.prefix(subnet).unwrap().prefix, "192.168.20.0/24");
        assert_eq!(f.nautobot.writes(), vec!["POST ipam/prefixes".to_string()]);
    }

    #[tokio::test]
    async fn test_external_subnet_goes_to_global() {
        let f = enrolled().await;
        let subnet = Uuid::new_v4();

        handle(&f, subnet_event("subnet.create.end", subnet, Uuid::new_v4(), "203.0.113.0/24", true))
            .await
            .unwrap();

        let prefix = f.nautobot.prefix(subnet).unwrap();
        assert_eq!(prefix.namespace.and_then(|n| n.name).as_deref(), Some("Global"));
    }

    #[tokio::test]
    async fn test_provision_set() {
        let f = enrolled().await;
        let lessee = Uuid::new_v4();
        let event = json!({
            "event_type": "baremetal.node.provision_set.end",
            "payload": {"ironic_object.data": {
                "uuid": f.device.id,
                "provision_state": "active",
                "lessee": lessee.to_string(),
                "resource_class": "gp2.small",
            }},
        });

        handle(&f, event).await.unwrap();

        let stored = f.nautobot.device(f.device.id).unwrap();
        assert_eq!(stored.status.and_then(|s| s.name).as_deref(), Some("Active"));
        assert_eq!(stored.tenant.map(|t| t.id), Some(lessee));
        assert_eq!(stored.custom_fields["resource_class"], json!("gp2.small"));
    }

    #[tokio::test]
    async fn test_svm_project_writes_outputs() {
        let output = tempfile::tempdir().unwrap();
        let mut f = enrolled().await;
        f.router = f.router.with_argo_output_dir(output.path());
        f.identity.add_project(PROJECT, "storage-tenant", &["UNDERSTACK_SVM"]);
        let event = json!({"event_type": "identity.project.created", "payload": {"target": {"id": PROJECT}}});

        handle(&f, event).await.unwrap();

        let read = |name: &str| fs::read_to_string(output.path().join(format!("output.{name}"))).unwrap();
        assert_eq!(read("svm_project_id"), PROJECT);
        assert_eq!(read("svm_event"), "created");
    }

    #[tokio::test]
    async fn test_deleted_project_requests_cleanup() {
        let output = tempfile::tempdir().unwrap();
        let mut f = enrolled().await;
        f.router = f.router.with_argo_output_dir(output.path());
        let event = json!({"event_type": "identity.project.deleted", "payload": {"target": {"id": PROJECT}}});

        handle(&f, event).await.unwrap();

        let read = |name: &str| fs::read_to_string(output.path().join(format!("output.{name}"))).unwrap();
        assert_eq!(read("svm_project_id"), PROJECT);
        assert_eq!(read("svm_event"), "deleted");
    }

    #[tokio::test]
    async fn test_untagged_or_missing_project_writes_nothing() {
        let output = tempfile::tempdir().unwrap();
        let mut f = enrolled().await;
        f.router = f.router.with_argo_output_dir(output.path());
        f.identity.add_project(PROJECT, "plain-tenant", &[]);

        for id in [PROJECT, "0d1f0c6e5b0a4d0c9f2b7e1a3c5d7e9f"] {
            let event = json!({"event_type": "identity.project.updated", "payload": {"target": {"id": id}}});
            handle(&f, event).await.unwrap();
        }

        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        global: GlobalArgs,
    }

    async fn mock_router(global: &GlobalArgs, secrets_root: &Path) -> Result<EventRouter, ControllerError> {
        let config = Config::load(global, secrets_root)?;
        let reconciler = create_test_reconciler(&MockNautobotClient::new("http://nautobot.test"), &MockIronicClient::new())
            .with_registry(config.switch_registry.clone());
        Ok(EventRouter::new(reconciler, Box::new(MockIdentityClient::new())).with_argo_output_dir(config.argo_output_dir))
    }

    #[tokio::test]
    async fn test_event_is_checked_before_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("argo");
        let missing_registry = format!("--switch-registry={}", dir.path().join("registry.yaml").display());
        let output_dir = format!("--argo-output-dir={}", output.display());
        let broken = TestCli::parse_from(["undercloud", missing_registry.as_str(), output_dir.as_str()]).global;
        let healthy = TestCli::parse_from(["undercloud", output_dir.as_str()]).global;

        let write = |name: &str, body: Value| {
            let path = dir.path().join(name);
            fs::write(&path, body.to_string()).unwrap();
            path
        };
        let project = write(
            "project.json",
            json!({"event_type": "identity.project.updated", "payload": {"target": {"id": PROJECT}}}),
        );
        let unknown = write("unknown.json", json!({"event_type": "compute.instance.create.end", "payload": {}}));
        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, "{not json").unwrap();

        let route = |file: &Path, global: &GlobalArgs| {
            let (file, global, root) = (file.to_path_buf(), global.clone(), dir.path().to_path_buf());
            async move { route_event(Some(&file), || mock_router(&global, &root)).await }
        };

        assert_eq!(route(&garbage, &broken).await.unwrap_err().exit_code(), 5);
        assert_eq!(route(&unknown, &broken).await.unwrap_err().exit_code(), 6);
        assert_eq!(route(&project, &broken).await.unwrap_err().exit_code(), 7);
        route(&project, &healthy).await.unwrap();
    }
}

//! Test utilities for unit testing reconcilers and event handlers
//!
//! The fixtures describe one Dell R7615 in rack F20-2 of IAD3, cabled to the
//! leaf pair `f20-2-1`/`f20-2-2` and the BMC switch `f20-2-1d`.

#[cfg(test)]
use crate::reconciler::Reconciler;
#[cfg(test)]
use chassis::{ChassisInfo, InterfaceInfo, Ipv4Interface};
#[cfg(test)]
use nautobot_client::MockNautobotClient;
#[cfg(test)]
use openstack_client::{MockIronicClient, Node};
#[cfg(test)]
use std::net::Ipv4Addr;
#[cfg(test)]
use uuid::Uuid;

#[cfg(test)]
pub const LEAF_1: &str = "f20-2-1.iad3.rackspace.net";
#[cfg(test)]
pub const LEAF_2: &str = "f20-2-2.iad3.rackspace.net";
#[cfg(test)]
pub const BMC_SWITCH: &str = "f20-2-1d.iad3.rackspace.net";
#[cfg(test)]
pub const BMC_IP: &str = "10.46.96.156";
#[cfg(test)]
pub const SERIAL: &str = "33GSW04";
#[cfg(test)]
pub const DEVICE_NAME: &str = "Dell-33GSW04";

/// Switch ids created by `seed_switches`
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct SeededSwitches {
    pub leaf_1: Uuid,
    pub leaf_2: Uuid,
    pub bmc: Uuid,
    pub network_vlan_group: Uuid,
}

/// Helper to create the R7615 chassis as the BMC reports it
#[cfg(test)]
pub fn create_test_chassis() -> ChassisInfo {
    let mut idrac = InterfaceInfo::new("iDRAC", "Dedicated iDRAC interface", "A8:3C:A5:35:43:86")
        .with_neighbor("C4:4D:84:48:61:80", "GigabitEthernet1/0/3");
    idrac.ipv4_address = Some(Ipv4Interface::new(BMC_IP.parse().unwrap(), 26).unwrap());
    idrac.ipv4_gateway = Some(Ipv4Addr::new(10, 46, 96, 129));
    idrac.hostname = Some("idrac-33GSW04".to_string());

    ChassisInfo {
        manufacturer: "Dell Inc.".to_string(),
        model_number: "PowerEdge R7615".to_string(),
        serial_number: SERIAL.to_string(),
        bios_version: "1.6.10".to_string(),
        bmc_ip_address: BMC_IP.parse().unwrap(),
        interfaces: vec![
            idrac,
            InterfaceInfo::new("NIC.Integrated.1-1", "Embedded NIC 1 Port 1", "D4:04:E6:4F:8D:B4"),
            InterfaceInfo::new("NIC.Integrated.1-2", "Embedded NIC 1 Port 2", "D4:04:E6:4F:8D:B5"),
            InterfaceInfo::new("NIC.Slot.1-1", "NIC in Slot 1 Port 1", "14:23:F3:F5:25:F0")
                .with_neighbor("C4:7E:E0:E4:32:DF", "Ethernet1/5"),
            InterfaceInfo::new("NIC.Slot.1-2", "NIC in Slot 1 Port 2", "14:23:F3:F5:25:F1")
                .with_neighbor("C4:7E:E0:E4:10:7F", "Ethernet1/5"),
        ],
        power_on: true,
        memory_gib: 96,
        cpu: "AMD EPYC 9124 16-Core Processor".to_string(),
        cpu_cores: 16,
    }
}

/// Helper to seed the three switches of rack F20-2 with the ports the test
/// chassis is cabled to
#[cfg(test)]
pub fn seed_switches(nautobot: &MockNautobotClient) -> SeededSwitches {
    let leaf_1 = nautobot.add_switch(LEAF_1, "IAD3", "F20-2");
    let leaf_2 = nautobot.add_switch(LEAF_2, "IAD3", "F20-2");
    let bmc = nautobot.add_switch(BMC_SWITCH, "IAD3", "F20-2");
    for leaf in [leaf_1, leaf_2] {
        nautobot.add_interface(leaf, "Ethernet1/5", "25gbase-x-sfp28");
        nautobot.add_interface(leaf, "Ethernet1/6", "25gbase-x-sfp28");
    }
    nautobot.add_interface(bmc, "GigabitEthernet1/0/3", "1000base-t");

    let network_vlan_group = nautobot.add_vlan_group("F20-2-network");
    nautobot.set_switch_vlan_group(leaf_1, network_vlan_group);
    nautobot.set_switch_vlan_group(leaf_2, network_vlan_group);
    let bmc_vlan_group = nautobot.add_vlan_group("F20-2-bmc");
    nautobot.set_switch_vlan_group(bmc, bmc_vlan_group);

    SeededSwitches {
        leaf_1,
        leaf_2,
        bmc,
        network_vlan_group,
    }
}

/// Helper to create a reconciler over mock clients that the test keeps
/// handles to
#[cfg(test)]
pub fn create_test_reconciler(nautobot: &MockNautobotClient, ironic: &MockIronicClient) -> Reconciler {
    Reconciler::new(Box::new(nautobot.clone()), Box::new(ironic.clone()))
}

/// Helper to create an Ironic node in `provision_state`
#[cfg(test)]
pub fn create_test_node(uuid: Uuid, provision_state: &str) -> Node {
    Node {
        uuid,
        name: Some(DEVICE_NAME.to_string()),
        driver: "idrac".to_string(),
        driver_info: Default::default(),
        provision_state: provision_state.to_string(),
        boot_interface: None,
        inspect_interface: None,
        resource_class: None,
        lessee: None,
    }
}

//! Per-chassis topology resolution
//!
//! Maps every LLDP neighbour of a chassis onto a registered switch and checks
//! the cabling rules: one data center, at most two racks, and exactly one
//! redundant pair of `network` switches.

use crate::chassis_info::ChassisInfo;
use crate::error::TopologyError;
use crate::switch_registry::{Switch, SwitchRegistry, VlanCategory};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One server port cabled to one switch port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub interface_name: String,
    pub switch: Switch,
    pub switch_port_name: String,
    pub cabinet: String,
    pub category: VlanCategory,
}

/// Resolved cabling of one chassis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub connections: Vec<Connection>,
    pub data_center: String,
    /// VLAN group name per category present on this chassis.
    pub vlan_groups: BTreeMap<VlanCategory, String>,
}

impl Topology {
    pub fn switch_names(&self) -> BTreeSet<&str> {
        self.connections.iter().map(|c| c.switch.name.as_str()).collect()
    }

    pub fn racks(&self) -> BTreeSet<&str> {
        self.connections.iter().map(|c| c.cabinet.as_str()).collect()
    }

    /// Distinct switches of the given category.
    pub fn switches_in(&self, category: VlanCategory) -> BTreeSet<&str> {
        self.connections
            .iter()
            .filter(|c| c.category == category)
            .map(|c| c.switch.name.as_str())
            .collect()
    }

    pub fn vlan_group(&self, category: VlanCategory) -> Option<&str> {
        self.vlan_groups.get(&category).map(String::as_str)
    }

    pub fn connection_for(&self, interface_name: &str) -> Option<&Connection> {
        self.connections.iter().find(|c| c.interface_name == interface_name)
    }
}

/// Resolves and validates the topology of `chassis`.
pub fn resolve(chassis: &ChassisInfo, registry: &SwitchRegistry) -> Result<Topology, TopologyError> {
    let mut connections = Vec::new();
    for interface in &chassis.interfaces {
        let Some(neighbor) = &interface.neighbor else {
            continue;
        };
        let switch = registry.switch_for_mac(&neighbor.switch_mac_address, &neighbor.switch_port_name)?;
        let (cabinet, category) = switch
            .placement()
            .map(|(cabinet, category)| (cabinet.to_string(), category))
            .ok_or_else(|| TopologyError::UnknownSwitchSuffix(switch.name.clone()))?;

        debug!(
            "{} connects to {} {} ({category})",
            interface.name, switch.name, neighbor.switch_port_name
        );
        connections.push(Connection {
            interface_name: interface.name.clone(),
            switch,
            switch_port_name: neighbor.switch_port_name.clone(),
            cabinet,
            category,
        });
    }

    if connections.is_empty() {
        return Err(TopologyError::NoConnections);
    }

    let data_centers: BTreeSet<&str> = connections
        .iter()
        .map(|c| c.switch.data_center().unwrap_or_default())
        .collect();
    if data_centers.len() > 1 {
        return Err(TopologyError::MultipleDataCenters(
            data_centers.into_iter().map(str::to_string).collect(),
        ));
    }
    let data_center = data_centers.into_iter().next().unwrap_or_default().to_string();

    let racks: BTreeSet<&str> = connections.iter().map(|c| c.cabinet.as_str()).collect();
    if racks.len() > 2 {
        return Err(TopologyError::TooManyRacks(racks.into_iter().map(str::to_string).collect()));
    }

    let network: BTreeSet<&str> = connections
        .iter()
        .filter(|c| c.category == VlanCategory::Network)
        .map(|c| c.switch.name.as_str())
        .collect();
    if network.len() != 2 {
        return Err(TopologyError::NetworkSwitchCount(
            network.into_iter().map(str::to_string).collect(),
        ));
    }

    let mut cabinets_by_category: BTreeMap<VlanCategory, BTreeSet<&str>> = BTreeMap::new();
    for connection in &connections {
        cabinets_by_category
            .entry(connection.category)
            .or_default()
            .insert(connection.cabinet.as_str());
    }
    let vlan_groups = cabinets_by_category
        .into_iter()
        .map(|(category, cabinets)| {
            let racks: Vec<&str> = cabinets.into_iter().collect();
            (category, format!("{}-{category}", racks.join("/")))
        })
        .collect();

    Ok(Topology {
        connections,
        data_center,
        vlan_groups,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chassis_info::InterfaceInfo;
    use crate::error::ChassisError;
    use std::net::Ipv4Addr;

    fn chassis(interfaces: Vec<InterfaceInfo>) -> ChassisInfo {
        ChassisInfo {
            manufacturer: "Dell Inc.".to_string(),
            model_number: "PowerEdge R7615".to_string(),
            serial_number: "33GSW04".to_string(),
            bios_version: "1.6.10".to_string(),
            bmc_ip_address: Ipv4Addr::new(10, 46, 96, 156),
            interfaces,
            power_on: true,
            memory_gib: 96,
            cpu_cores: 16,
            cpu: "AMD EPYC".to_string(),
        }
    }

    fn r7615() -> ChassisInfo {
        chassis(vec![
            InterfaceInfo::new("iDRAC", "", "A8:3C:A5:35:43:86").with_neighbor("C4:4D:84:48:61:80", "GigabitEthernet1/0/3"),
            InterfaceInfo::new("NIC.Integrated.1-1", "", "D4:04:E6:4F:8D:B4").with_neighbor("C4:7E:E0:E4:10:7F", "Ethernet1/5"),
            InterfaceInfo::new("NIC.Integrated.1-2", "", "D4:04:E6:4F:8D:B5").with_neighbor("C4:7E:E0:E4:32:DF", "Ethernet1/5"),
            InterfaceInfo::new("NIC.Slot.1-1", "", "14:23:F3:F5:25:F0").with_neighbor("C4:7E:E0:E4:32:DF", "Ethernet1/6"),
            InterfaceInfo::new("NIC.Slot.1-2", "", "14:23:F3:F5:25:F1").with_neighbor("C4:7E:E0:E4:10:7F", "Ethernet1/6"),
        ])
    }

    #[test]
    fn test_resolve_single_rack() {
        let topology = resolve(&r7615(), &SwitchRegistry::default()).unwrap();
        assert_eq!(topology.connections.len(), 5);
        assert_eq!(topology.data_center, "iad3");
        assert_eq!(topology.vlan_group(VlanCategory::Network), Some("f20-2-network"));
        assert_eq!(topology.vlan_group(VlanCategory::Bmc), Some("f20-2-bmc"));
        assert_eq!(topology.racks().into_iter().collect::<Vec<_>>(), vec!["f20-2"]);
        assert_eq!(
            topology.connection_for("NIC.Slot.1-1").unwrap().switch.name,
            "f20-2-2.iad3.rackspace.net"
        );
    }

    #[test]
    fn test_resolve_two_racks_joins_names() {
        let registry = SwitchRegistry::from_entries([
            ("00:00:00:00:01:00", "a1-1-1.dfw1.rackspace.net"),
            ("00:00:00:00:02:00", "a2-1-2.dfw1.rackspace.net"),
            ("00:00:00:00:03:00", "a1-1-1d.dfw1.rackspace.net"),
        ])
        .unwrap();
        let topology = resolve(
            &chassis(vec![
                InterfaceInfo::new("iDRAC", "", "A8:3C:A5:35:43:86").with_neighbor("00:00:00:00:03:00", "Gi1/0/1"),
                InterfaceInfo::new("NIC.Slot.1-1", "", "14:23:F3:F5:25:F0").with_neighbor("00:00:00:00:01:00", "Ethernet1/0"),
                InterfaceInfo::new("NIC.Slot.1-2", "", "14:23:F3:F5:25:F1").with_neighbor("00:00:00:00:02:00", "Ethernet1/0"),
            ]),
            &registry,
        )
        .unwrap();
        assert_eq!(topology.vlan_group(VlanCategory::Network), Some("a1-1/a2-1-network"));
        assert_eq!(topology.vlan_group(VlanCategory::Bmc), Some("a1-1-bmc"));
    }

    #[test]
    fn test_resolve_rejects_two_data_centers() {
        let registry = SwitchRegistry::from_entries([
            ("00:00:00:00:01:00", "a1-1-1.dfw1.rackspace.net"),
            ("00:00:00:00:02:00", "a1-1-2.iad3.rackspace.net"),
        ])
        .unwrap();
        let err = resolve(
            &chassis(vec![
                InterfaceInfo::new("NIC.Slot.1-1", "", "14:23:F3:F5:25:F0").with_neighbor("00:00:00:00:01:00", "Ethernet1/0"),
                InterfaceInfo::new("NIC.Slot.1-2", "", "14:23:F3:F5:25:F1").with_neighbor("00:00:00:00:02:00", "Ethernet1/0"),
            ]),
            &registry,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TopologyError::MultipleDataCenters(vec!["dfw1".to_string(), "iad3".to_string()])
        );
    }

    #[test]
    fn test_resolve_rejects_three_racks() {
        let registry = SwitchRegistry::from_entries([
            ("00:00:00:00:01:00", "a1-1-1.dfw1.rackspace.net"),
            ("00:00:00:00:02:00", "a2-1-2.dfw1.rackspace.net"),
            ("00:00:00:00:03:00", "a3-1-1d.dfw1.rackspace.net"),
        ])
        .unwrap();
        let err = resolve(
            &chassis(vec![
                InterfaceInfo::new("iDRAC", "", "A8:3C:A5:35:43:86").with_neighbor("00:00:00:00:03:00", "Gi1/0/1"),
                InterfaceInfo::new("NIC.Slot.1-1", "", "14:23:F3:F5:25:F0").with_neighbor("00:00:00:00:01:00", "Ethernet1/0"),
                InterfaceInfo::new("NIC.Slot.1-2", "", "14:23:F3:F5:25:F1").with_neighbor("00:00:00:00:02:00", "Ethernet1/0"),
            ]),
            &registry,
        )
        .unwrap_err();
        assert!(matches!(err, TopologyError::TooManyRacks(_)));
    }

    #[test]
    fn test_resolve_requires_network_pair() {
        let mut single = r7615();
        single.interfaces.truncate(2);
        let err = resolve(&single, &SwitchRegistry::default()).unwrap_err();
        assert_eq!(
            err,
            TopologyError::NetworkSwitchCount(vec!["f20-2-1.iad3.rackspace.net".to_string()])
        );
    }

    #[test]
    fn test_resolve_rejects_unknown_suffix() {
        let registry = SwitchRegistry::from_entries([("00:00:00:00:01:00", "border-router.dfw1.rackspace.net")]).unwrap();
        let err = resolve(
            &chassis(vec![
                InterfaceInfo::new("NIC.Slot.1-1", "", "14:23:F3:F5:25:F0").with_neighbor("00:00:00:00:01:00", "Ethernet1/0"),
            ]),
            &registry,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TopologyError::UnknownSwitchSuffix("border-router.dfw1.rackspace.net".to_string())
        );
    }

    #[test]
    fn test_resolve_unknown_switch_mac() {
        let err = resolve(
            &chassis(vec![
                InterfaceInfo::new("NIC.Slot.1-1", "", "14:23:F3:F5:25:F0").with_neighbor("00:11:22:33:44:55", "Ethernet1/1"),
            ]),
            &SwitchRegistry::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TopologyError::Chassis(ChassisError::UnknownSwitch { .. })));
    }

    #[test]
    fn test_resolve_without_neighbors() {
        let err = resolve(&chassis(vec![InterfaceInfo::new("iDRAC", "", "A8:3C:A5:35:43:86")]), &SwitchRegistry::default())
            .unwrap_err();
        assert_eq!(err, TopologyError::NoConnections);
    }
}

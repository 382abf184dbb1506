//! PXE interface election

use crate::chassis_info::{ChassisInfo, InterfaceInfo};

/// Static preference for Dell NIC ids. Unlisted names score 0.
const NIC_PREFERENCE: &[(&str, u32)] = &[
    ("NIC.Integrated.1-1-1", 100),
    ("NIC.Integrated.1-1", 99),
    ("NIC.Slot.1-1-1", 98),
    ("NIC.Slot.1-1", 97),
    ("NIC.Integrated.1-2-1", 96),
    ("NIC.Integrated.1-2", 95),
    ("NIC.Slot.1-2-1", 94),
    ("NIC.Slot.1-2", 93),
    ("NIC.Slot.1-3-1", 92),
    ("NIC.Slot.1-3", 91),
    ("NIC.Slot.2-1-1", 90),
    ("NIC.Slot.2-1", 89),
    ("NIC.Integrated.2-1-1", 88),
    ("NIC.Integrated.2-1", 87),
    ("NIC.Slot.2-2-1", 86),
    ("NIC.Slot.2-2", 85),
    ("NIC.Integrated.2-2-1", 84),
    ("NIC.Integrated.2-2", 83),
    ("NIC.Slot.3-1-1", 82),
    ("NIC.Slot.3-1", 81),
    ("NIC.Slot.3-2-1", 80),
    ("NIC.Slot.3-2", 79),
];

/// Lexicographic score: (eligible, has link, table preference).
pub fn pxe_score(interface: &InterfaceInfo) -> (bool, bool, u32) {
    let upper = interface.name.to_uppercase();
    let eligible = !["DRAC", "ILO", "NIC.EMBEDDED"].iter().any(|s| upper.contains(s));
    let link = interface.remote_switch_port_name().is_some();
    let preference = NIC_PREFERENCE
        .iter()
        .find(|(name, _)| *name == interface.name)
        .map_or(0, |(_, score)| *score);
    (eligible, link, preference)
}

/// Picks the most probable PXE interface; ties go to the earliest interface.
pub fn guess_pxe_interface(chassis: &ChassisInfo) -> Option<&InterfaceInfo> {
    chassis
        .interfaces
        .iter()
        .rev()
        .max_by_key(|interface| pxe_score(interface))
}

#[cfg(test)]
mod tests {
    use super::*;
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
            cpu: String::new(),
        }
    }

    #[test]
    fn test_prefers_integrated_with_link() {
        let chassis = chassis(vec![
            InterfaceInfo::new("iDRAC", "", "A8:3C:A5:35:43:86").with_neighbor("C4:4D:84:48:61:80", "Gi1/0/3"),
            InterfaceInfo::new("NIC.Integrated.1-1", "", "D4:04:E6:4F:8D:B4").with_neighbor("C4:7E:E0:E4:10:7F", "Ethernet1/5"),
            InterfaceInfo::new("NIC.Slot.1-1", "", "14:23:F3:F5:25:F0").with_neighbor("C4:7E:E0:E4:32:DF", "Ethernet1/6"),
        ]);
        assert_eq!(guess_pxe_interface(&chassis).unwrap().name, "NIC.Integrated.1-1");
    }

    #[test]
    fn test_link_beats_preference() {
        let chassis = chassis(vec![
            InterfaceInfo::new("iDRAC", "", "A8:3C:A5:35:43:86"),
            InterfaceInfo::new("NIC.Integrated.1-1", "", "D4:04:E6:4F:8D:B4"),
            InterfaceInfo::new("NIC.Slot.1-2", "", "14:23:F3:F5:25:F1").with_neighbor("C4:7E:E0:E4:10:7F", "Ethernet1/6"),
        ]);
        assert_eq!(guess_pxe_interface(&chassis).unwrap().name, "NIC.Slot.1-2");
    }

    #[test]
    fn test_bmc_and_embedded_are_never_preferred() {
        let chassis = chassis(vec![
            InterfaceInfo::new("iDRAC", "", "A8:3C:A5:35:43:86").with_neighbor("C4:4D:84:48:61:80", "Gi1/0/3"),
            InterfaceInfo::new("NIC.Embedded.1-1", "", "D4:04:E6:4F:8D:B0").with_neighbor("C4:7E:E0:E4:10:7F", "Ethernet1/1"),
            InterfaceInfo::new("eth9", "", "D4:04:E6:4F:8D:B9"),
        ]);
        assert_eq!(guess_pxe_interface(&chassis).unwrap().name, "eth9");
    }

    #[test]
    fn test_unlisted_names_score_zero() {
        assert_eq!(pxe_score(&InterfaceInfo::new("eth0", "", "")), (true, false, 0));
        assert_eq!(pxe_score(&InterfaceInfo::new("NIC.Slot.3-2", "", "")), (true, false, 79));
        assert!(!pxe_score(&InterfaceInfo::new("iLO", "", "")).0);
    }

    #[test]
    fn test_empty_chassis() {
        assert!(guess_pxe_interface(&chassis(vec![])).is_none());
    }
}

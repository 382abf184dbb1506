//! Device-type library and resource class matching
//!
//! Device types are YAML documents describing a hardware model and the
//! resource classes (Ironic flavors) it can satisfy.

use crate::chassis_info::ChassisInfo;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSpec {
    pub cores: u32,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySpec {
    /// Size in MB.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveSpec {
    /// Size in GB.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub interface_type: String,
    #[serde(default)]
    pub mgmt_only: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerPortSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub port_type: String,
    #[serde(default)]
    pub maximum_draw: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceClass {
    pub name: String,
    pub cpu: CpuSpec,
    pub memory: MemorySpec,
    #[serde(default)]
    pub drives: Vec<DriveSpec>,
    pub nic_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceType {
    #[serde(rename = "class")]
    pub class: String,
    pub manufacturer: String,
    pub model: String,
    pub u_height: f32,
    pub is_full_depth: bool,
    #[serde(default)]
    pub resource_class: Vec<ResourceClass>,
    #[serde(default)]
    pub interfaces: Option<Vec<InterfaceSpec>>,
    #[serde(default, rename = "power-ports")]
    pub power_ports: Option<Vec<PowerPortSpec>>,
}

impl DeviceType {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Loads every `*.yaml` / `*.yml` file below `dir`. Unparseable files are
    /// logged and skipped; a missing directory yields an empty library.
    pub fn from_directory(dir: &Path) -> Vec<Self> {
        let mut device_types = Vec::new();
        let Ok(entries) = std::fs::read_dir(dir) else {
            return device_types;
        };
        let mut paths: Vec<_> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
        paths.sort();
        for path in paths {
            if path.is_dir() {
                device_types.extend(Self::from_directory(&path));
                continue;
            }
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "yaml" || e == "yml");
            if !is_yaml {
                continue;
            }
            match std::fs::read_to_string(&path).map(|s| Self::from_yaml(&s)) {
                Ok(Ok(device_type)) => device_types.push(device_type),
                Ok(Err(e)) => warn!("Error parsing YAML file {}: {}", path.display(), e),
                Err(e) => warn!("Error reading file {}: {}", path.display(), e),
            }
        }
        device_types
    }

    pub fn get_resource_class(&self, name: &str) -> Option<&ResourceClass> {
        self.resource_class.iter().find(|rc| rc.name == name)
    }
}

/// Hardware facts of one machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Machine {
    pub memory_mb: u64,
    pub cpu: String,
    pub cpu_cores: u32,
    /// `None` when disks were not inventoried; the drive check is skipped.
    pub disk_gb: Option<u64>,
    pub manufacturer: String,
    pub model: String,
}

impl Machine {
    pub fn memory_gb(&self) -> u64 {
        self.memory_mb / 1024
    }

    pub fn from_chassis(chassis: &ChassisInfo) -> Self {
        let manufacturer = chassis
            .manufacturer()
            .map_or_else(|_| chassis.manufacturer.clone(), |m| m.as_str().to_string());
        Self {
            memory_mb: u64::from(chassis.memory_gib) * 1024,
            cpu: chassis.cpu.clone(),
            cpu_cores: chassis.cpu_cores,
            disk_gb: None,
            manufacturer,
            model: chassis.model_number.clone(),
        }
    }
}

/// Finds the resource class a machine satisfies.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    device_types: Vec<DeviceType>,
}

impl Matcher {
    pub fn new(device_types: Vec<DeviceType>) -> Self {
        Self { device_types }
    }

    pub fn is_empty(&self) -> bool {
        self.device_types.is_empty()
    }

    /// Manufacturer, model, CPU model, core count and memory must match
    /// exactly; the machine's disk must be at least the smallest drive.
    pub fn matches(&self, machine: &Machine) -> Option<(&DeviceType, &ResourceClass)> {
        self.device_types
            .iter()
            .filter(|dt| dt.manufacturer == machine.manufacturer && dt.model == machine.model)
            .find_map(|dt| {
                dt.resource_class
                    .iter()
                    .find(|rc| resource_class_fits(rc, machine))
                    .map(|rc| (dt, rc))
            })
    }
}

fn resource_class_fits(rc: &ResourceClass, machine: &Machine) -> bool {
    if rc.cpu.model != machine.cpu || rc.cpu.cores != machine.cpu_cores || rc.memory.size != machine.memory_mb {
        return false;
    }
    let min_drive = rc.drives.iter().map(|d| d.size).min();
    match (min_drive, machine.disk_gb) {
        (Some(min), Some(disk)) if disk < min => {
            debug!("{} rejected: disk {disk} GB below {min} GB", rc.name);
            false
        }
        _ => true,
    }
}

//! Runtime configuration
//!
//! Settings come from command line flags, each of which can also be given
//! as an environment variable. Secrets may instead be mounted as files
//! (the way Argo workflows hand them to us), e.g. `/etc/nb-token/token`.

use crate::error::ControllerError;
use chassis::{ProvisionStateMap, SwitchRegistry};
use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_NAUTOBOT_URL: &str = "http://nautobot-default.nautobot.svc.cluster.local";
pub const DEFAULT_INTERFACE_TYPE: &str = "25gbase-x-sfp28";
pub const DEFAULT_ARGO_OUTPUT_DIR: &str = "/tmp/argo-output";
/// Root below which mounted secrets live
pub const SECRETS_ROOT: &str = "/etc";
/// Shortest master key considered strong; shorter ones still work
pub const MIN_BMC_MASTER_LEN: usize = 32;

/// Flags shared by every subcommand
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Nautobot base URL
    #[arg(long, env = "NAUTOBOT_URL", default_value = DEFAULT_NAUTOBOT_URL, global = true)]
    pub nautobot_url: String,

    /// Nautobot API token; falls back to /etc/nb-token/token
    #[arg(long, env = "NAUTOBOT_TOKEN", hide_env_values = true, global = true)]
    pub nautobot_token: Option<String>,

    /// Seed for per-BMC passwords; falls back to /etc/bmc_master/key
    #[arg(long, env = "BMC_MASTER", hide_env_values = true, global = true)]
    pub bmc_master: Option<String>,

    /// Undersync base URL
    #[arg(long, env = "UNDERSYNC_URL", default_value = undersync_client::DEFAULT_URL, global = true)]
    pub undersync_url: String,

    /// Undersync bearer token; falls back to /etc/undersync/token
    #[arg(long, env = "UNDERSYNC_TOKEN", hide_env_values = true, global = true)]
    pub undersync_token: Option<String>,

    /// clouds.yaml entry to use
    #[arg(long, env = "OS_CLOUD", default_value = openstack_client::config::DEFAULT_CLOUD, global = true)]
    pub os_cloud: String,

    /// UCVNI group for networks created through Neutron events
    #[arg(long, env = "UCVNI_GROUP_NAME", global = true)]
    pub ucvni_group_name: Option<String>,

    /// YAML file of `MAC: switch-fqdn` replacing the built-in switch table
    #[arg(long, env = "SWITCH_REGISTRY", global = true)]
    pub switch_registry: Option<PathBuf>,

    /// YAML file of `provision_state: status` overrides
    #[arg(long, env = "PROVISION_STATE_MAP", global = true)]
    pub provision_state_map: Option<PathBuf>,

    /// Nautobot type for in-band server interfaces
    #[arg(long, env = "NAUTOBOT_INTERFACE_TYPE", default_value = DEFAULT_INTERFACE_TYPE, global = true)]
    pub interface_type: String,

    /// Directory for Argo step outputs
    #[arg(long, env = "ARGO_OUTPUT_DIR", default_value = DEFAULT_ARGO_OUTPUT_DIR, global = true)]
    pub argo_output_dir: PathBuf,

    /// Device type library used to pick the Ironic resource class
    #[arg(long, env = "DEVICE_TYPES_DIR", global = true)]
    pub device_types_dir: Option<PathBuf>,
}

/// Reads a mounted secret at `<root>/<subpath>/<item>`.
///
/// # Returns
/// The trimmed content, or `None` when the file is missing or blank
pub fn credential(root: &Path, subpath: &str, item: &str) -> Option<String> {
    let path = root.join(subpath).join(item);
    match fs::read_to_string(&path) {
        Ok(content) => Some(content.trim().to_string()).filter(|s| !s.is_empty()),
        Err(e) => {
            debug!("No credential at {}: {}", path.display(), e);
            None
        }
    }
}

/// Configuration resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub nautobot_url: String,
    nautobot_token: Option<String>,
    bmc_master: Option<String>,
    pub undersync_url: String,
    undersync_token: Option<String>,
    pub os_cloud: String,
    pub ucvni_group_name: Option<String>,
    pub switch_registry: SwitchRegistry,
    pub provision_states: ProvisionStateMap,
    pub interface_type: String,
    pub argo_output_dir: PathBuf,
    pub device_types_dir: Option<PathBuf>,
}

impl Config {
    /// Resolve flags, falling back to secret files below `secrets_root`.
    pub fn load(args: &GlobalArgs, secrets_root: &Path) -> Result<Self, ControllerError> {
        let nautobot_token = args
            .nautobot_token
            .clone()
            .or_else(|| credential(secrets_root, "nb-token", "token"));
        let bmc_master = args
            .bmc_master
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| credential(secrets_root, "bmc_master", "key"));
        if let Some(key) = bmc_master.as_deref().filter(|k| k.len() < MIN_BMC_MASTER_LEN) {
            warn!(
                "BMC master key is {} bytes, expected at least {MIN_BMC_MASTER_LEN}",
                key.len()
            );
        }
        let undersync_token = args
            .undersync_token
            .clone()
            .or_else(|| credential(secrets_root, "undersync", "token"));

        let switch_registry = match &args.switch_registry {
            Some(path) => {
                info!("Loading switch registry from {}", path.display());
                SwitchRegistry::from_file(path)?
            }
            None => SwitchRegistry::default(),
        };
        let provision_states = match &args.provision_state_map {
            Some(path) => {
                info!("Loading provision state overrides from {}", path.display());
                ProvisionStateMap::default().with_overrides_yaml(&fs::read_to_string(path)?)?
            }
            None => ProvisionStateMap::default(),
        };

        Ok(Self {
            nautobot_url: args.nautobot_url.clone(),
            nautobot_token,
            bmc_master,
            undersync_url: args.undersync_url.clone(),
            undersync_token,
            os_cloud: args.os_cloud.clone(),
            ucvni_group_name: args.ucvni_group_name.clone(),
            switch_registry,
            provision_states,
            interface_type: args.interface_type.clone(),
            argo_output_dir: args.argo_output_dir.clone(),
            device_types_dir: args.device_types_dir.clone(),
        })
    }

    pub fn nautobot_token(&self) -> Result<&str, ControllerError> {
        self.nautobot_token.as_deref().ok_or_else(|| {
            ControllerError::InvalidConfig("NAUTOBOT_TOKEN or /etc/nb-token/token is required".to_string())
        })
    }

    pub fn bmc_master(&self) -> Result<&str, ControllerError> {
        self.bmc_master.as_deref().ok_or_else(|| {
            ControllerError::InvalidConfig("BMC_MASTER or /etc/bmc_master/key is required".to_string())
        })
    }

    pub fn undersync_token(&self) -> Result<&str, ControllerError> {
        self.undersync_token.as_deref().ok_or_else(|| {
            ControllerError::InvalidConfig("UNDERSYNC_TOKEN or /etc/undersync/token is required".to_string())
        })
    }

    pub fn ucvni_group_name(&self) -> Result<&str, ControllerError> {
        self.ucvni_group_name
            .as_deref()
            .ok_or_else(|| ControllerError::InvalidConfig("Please set environment variable UCVNI_GROUP_NAME".to_string()))
    }
}

//! clouds.yaml loading
//!
//! Only password authentication against Keystone v3 is supported, which is
//! what the in-cluster service accounts use.

use crate::error::OpenStackError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Cloud selected when `OS_CLOUD` is unset
pub const DEFAULT_CLOUD: &str = "default";

fn default_domain() -> String {
    "Default".to_string()
}

fn default_interface() -> String {
    "public".to_string()
}

/// `auth:` section of one cloud
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    #[serde(default = "default_domain")]
    pub user_domain_name: String,
    #[serde(default = "default_domain")]
    pub project_domain_name: String,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("project_name", &self.project_name)
            .field("user_domain_name", &self.user_domain_name)
            .field("project_domain_name", &self.project_domain_name)
            .finish()
    }
}

/// One entry below `clouds:`
#[derive(Debug, Clone, Deserialize)]
pub struct CloudConfig {
    pub auth: AuthConfig,
    #[serde(default)]
    pub region_name: Option<String>,
    /// Endpoint interface to pick from the catalog
    #[serde(default = "default_interface")]
    pub interface: String,
}

#[derive(Debug, Deserialize)]
struct CloudsFile {
    clouds: BTreeMap<String, CloudConfig>,
}

impl CloudConfig {
    /// Parses `cloud` out of a clouds.yaml document.
    pub fn from_yaml(yaml: &str, cloud: &str) -> Result<Self, OpenStackError> {
        let mut file: CloudsFile =
            serde_yaml::from_str(yaml).map_err(|e| OpenStackError::Config(format!("invalid clouds.yaml: {e}")))?;
        file.clouds
            .remove(cloud)
            .ok_or_else(|| OpenStackError::Config(format!("cloud {cloud} not found in clouds.yaml")))
    }

    /// Loads `cloud` from the first clouds.yaml that exists in `paths`.
    pub fn load(cloud: &str, paths: &[PathBuf]) -> Result<Self, OpenStackError> {
        let path = paths
            .iter()
            .find(|p| p.is_file())
            .ok_or_else(|| OpenStackError::Config(format!("no clouds.yaml found in {paths:?}")))?;
        debug!("Loading cloud {} from {}", cloud, path.display());
        Self::from_file(path, cloud)
    }

    pub fn from_file(path: &Path, cloud: &str) -> Result<Self, OpenStackError> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| OpenStackError::Config(format!("{}: {e}", path.display())))?;
        Self::from_yaml(&yaml, cloud)
    }
}

/// Standard clouds.yaml search path: `$OS_CLIENT_CONFIG_FILE`, the current
/// directory, `~/.config/openstack`, then `/etc/openstack`.
pub fn default_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(file) = std::env::var("OS_CLIENT_CONFIG_FILE") {
        paths.push(PathBuf::from(file));
    }
    paths.push(PathBuf::from("clouds.yaml"));
    if let Ok(home) = std::env::var("HOME") {
        paths.push(Path::new(&home).join(".config/openstack/clouds.yaml"));
    }
    paths.push(PathBuf::from("/etc/openstack/clouds.yaml"));
    paths
}

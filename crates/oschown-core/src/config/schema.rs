//! Configuration schema for oschown.toml
//!
//! ```toml
//! state_dir = "/var/lib/oschown"
//!
//! [nova]
//! state_file = "/var/lib/oschown/nova.json"
//!
//! [cinder]
//! transfer_name = "oschown"
//!
//! [neutron]
//! enabled = true
//!
//! [identity.users]
//! alice = "6f1c..."
//!
//! [identity.projects]
//! demo = "a93b..."
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::identity::IdentityConfig;
use crate::provider::{CinderConfig, NeutronConfig, NovaConfig};

/// Root configuration structure for oschown.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OschownConfig {
    /// Directory for service state files without an explicit `state_file`
    #[serde(default)]
    pub state_dir: Option<PathBuf>,

    #[serde(default)]
    pub nova: NovaConfig,

    #[serde(default)]
    pub cinder: CinderConfig,

    #[serde(default)]
    pub neutron: NeutronConfig,

    /// Name to id mappings for users and projects
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl OschownConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_state_file(self.nova.state_file.as_deref()).context("Invalid [nova] section")?;
        validate_state_file(self.cinder.state_file.as_deref())
            .context("Invalid [cinder] section")?;
        if self.cinder.transfer_name.trim().is_empty() {
            anyhow::bail!("Invalid [cinder] section: transfer_name cannot be empty");
        }
        self.identity
            .validate()
            .context("Invalid [identity] section")?;
        Ok(())
    }

    /// State file for a service: the configured one, or `<state_dir>/<service>.json`.
    pub fn state_file_for(&self, service: &str, fallback_dir: &Path) -> PathBuf {
        let configured = match service {
            "nova" => self.nova.state_file.clone(),
            "cinder" => self.cinder.state_file.clone(),
            _ => None,
        };
        configured.unwrap_or_else(|| {
            self.state_dir
                .as_deref()
                .unwrap_or(fallback_dir)
                .join(format!("{service}.json"))
        })
    }
}

fn validate_state_file(path: Option<&Path>) -> anyhow::Result<()> {
    if let Some(path) = path
        && path.as_os_str().is_empty()
    {
        anyhow::bail!("state_file cannot be empty");
    }
    Ok(())
}

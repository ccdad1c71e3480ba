//! Locating and loading oschown.toml.

use std::path::{Path, PathBuf};

use super::{OschownConfig, parser, paths::default_config_path};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    pub fn from_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Store at the platform config location.
    pub fn with_defaults() -> anyhow::Result<Self> {
        Ok(Self::from_path(default_config_path()?))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the config. A missing file yields the defaults.
    pub fn load(&self) -> anyhow::Result<OschownConfig> {
        if !self.config_path.exists() {
            return Ok(OschownConfig::new());
        }
        parser::parse_oschown_toml(&self.config_path)
    }
}

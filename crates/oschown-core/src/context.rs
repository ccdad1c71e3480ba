//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backend::{JsonComputeStore, JsonVolumeStore};
use crate::config::{ConfigStore, OschownConfig, default_state_dir};
use crate::identity::StaticDirectory;
use crate::provider::cinder::CINDER;
use crate::provider::nova::NOVA;
use crate::provider::{CinderProvider, NeutronProvider, NovaProvider, ProviderRegistry};

/// Loaded configuration plus the paths derived from it.
///
/// Frontends build this once and ask it for the provider registry and the
/// identity directory; nothing else reads configuration.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: OschownConfig,
    config_path: PathBuf,
    state_dir: PathBuf,
}

impl AppContext {
    /// Create a context with explicit paths.
    pub fn new(config: OschownConfig, config_path: PathBuf, state_dir: PathBuf) -> Self {
        let state_dir = config.state_dir.clone().unwrap_or(state_dir);
        Self {
            config,
            config_path,
            state_dir,
        }
    }

    /// Load the config from the platform location.
    pub fn with_defaults() -> anyhow::Result<Self> {
        Self::load(ConfigStore::with_defaults()?)
    }

    /// Load the config from an explicit path.
    pub fn from_config_path(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::load(ConfigStore::from_path(path))
    }

    fn load(store: ConfigStore) -> anyhow::Result<Self> {
        let config = store.load()?;
        let state_dir = match &config.state_dir {
            Some(dir) => dir.clone(),
            None => default_state_dir()?,
        };
        Ok(Self::new(config, store.config_path().to_path_buf(), state_dir))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn state_file(&self, service: &str) -> PathBuf {
        self.config.state_file_for(service, &self.state_dir)
    }

    /// Registry with every enabled provider wired to its state file.
    pub fn provider_registry(&self) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();

        if self.config.nova.enabled {
            let store = JsonComputeStore::new(self.state_file(NOVA));
            registry.register(Box::new(NovaProvider::new(Arc::new(store))));
        }
        if self.config.cinder.enabled {
            let store = JsonVolumeStore::new(self.state_file(CINDER));
            registry.register(Box::new(CinderProvider::new(
                Arc::new(store),
                &self.config.cinder,
            )));
        }
        if self.config.neutron.enabled {
            registry.register(Box::new(NeutronProvider::new(
                self.config.neutron.clone(),
            )));
        }

        registry
    }

    pub fn identity_directory(&self) -> StaticDirectory {
        StaticDirectory::new(&self.config.identity)
    }
}

//! Network provider. Ports cannot change owners, so every lookup fails.

use serde::{Deserialize, Serialize};

use super::{Resource, ResourceProvider};
use crate::error::{ChownError, Result};
use crate::types::ChownContext;

pub const NEUTRON: &str = "neutron";

/// `[neutron]` section of oschown.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeutronConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for NeutronConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Default)]
pub struct NeutronProvider;

impl NeutronProvider {
    pub fn new(_config: NeutronConfig) -> Self {
        Self
    }
}

impl ResourceProvider for NeutronProvider {
    fn name(&self) -> &'static str {
        NEUTRON
    }

    fn collect_by_id(&self, _ctx: &ChownContext, local_id: &str) -> Result<Box<dyn Resource>> {
        Err(ChownError::UnsupportedOperation {
            id: self.resource_id(local_id),
            reason: "Neutron resources cannot be transferred. Please detach from all networks."
                .to_string(),
        })
    }
}

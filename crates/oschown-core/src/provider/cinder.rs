//! Block-storage provider: volumes and the instances they are attached to.
//!
//! Ownership moves through the service's transfer API, which refuses volumes
//! that are not `available`. Attached volumes are forced to `available` for
//! the duration of the transfer by a [`StatusGuard`], which puts the original
//! status back when it goes out of scope.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{Resource, ResourceProvider};
use crate::backend::volume::{STATUS_AVAILABLE, STATUS_IN_USE};
use crate::backend::{Volume, VolumeApi};
use crate::error::{ChownError, Result};
use crate::types::{ChownContext, ResourceId};

pub const CINDER: &str = "cinder";

/// `[cinder]` section of oschown.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CinderConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Block-storage state file (defaults to `<state_dir>/cinder.json`)
    #[serde(default)]
    pub state_file: Option<PathBuf>,

    /// Name recorded on the transfers created during chown
    #[serde(default = "default_transfer_name")]
    pub transfer_name: String,
}

impl Default for CinderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            state_file: None,
            transfer_name: default_transfer_name(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_transfer_name() -> String {
    "oschown".to_string()
}

/// Temporarily overrides a volume's status and restores it on drop.
struct StatusGuard<'a> {
    api: &'a dyn VolumeApi,
    volume_id: &'a str,
    original: &'a str,
}

impl<'a> StatusGuard<'a> {
    fn force(
        api: &'a dyn VolumeApi,
        volume_id: &'a str,
        original: &'a str,
        status: &str,
    ) -> Result<Self> {
        api.volume_set_status(volume_id, status)?;
        Ok(Self {
            api,
            volume_id,
            original,
        })
    }
}

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        match self.api.volume_set_status(self.volume_id, self.original) {
            Ok(()) => debug!(
                "Restored cinder volume {} status to {}",
                self.volume_id, self.original
            ),
            Err(e) => error!(
                "Failed to restore cinder volume {} status to {}: {}",
                self.volume_id, self.original, e
            ),
        }
    }
}

/// A volume together with the instances it is attached to.
#[derive(Debug)]
pub struct CinderResource {
    id: ResourceId,
    volume: Volume,
    deps: Vec<ResourceId>,
    api: Arc<dyn VolumeApi>,
    transfer_name: String,
}

impl CinderResource {
    fn collect(api: Arc<dyn VolumeApi>, volume: Volume, transfer_name: &str) -> Self {
        let deps = volume
            .attachments
            .iter()
            .map(|attachment| {
                info!(
                    "Cinder volume {} requires attached instance {}",
                    volume.id, attachment.instance_uuid
                );
                ResourceId::new(super::nova::NOVA, attachment.instance_uuid.clone())
            })
            .collect();

        Self {
            id: ResourceId::new(CINDER, volume.id.clone()),
            volume,
            deps,
            api,
            transfer_name: transfer_name.to_string(),
        }
    }

    fn transfer(&self, ctx: &ChownContext) -> Result<()> {
        let volume_id = self.volume.id.as_str();
        let _guard =
            StatusGuard::force(self.api.as_ref(), volume_id, &self.volume.status, STATUS_AVAILABLE)?;

        let transfer = self.api.transfer_create(volume_id, &self.transfer_name)?;
        self.api.transfer_accept(
            &transfer.id,
            &transfer.auth_key,
            ctx.target_user_id(),
            ctx.target_project_id(),
        )
    }
}

impl Resource for CinderResource {
    fn identifier(&self) -> &ResourceId {
        &self.id
    }

    fn dependencies(&self) -> &[ResourceId] {
        &self.deps
    }

    fn chown(&self, ctx: &ChownContext) -> Result<()> {
        if self.volume.status == STATUS_IN_USE {
            warn!(
                "Cinder volume {} is in use; forcing status to {} for the transfer",
                self.volume.id, STATUS_AVAILABLE
            );
        }
        self.transfer(ctx).map_err(|e| ChownError::MutationFailed {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct CinderProvider {
    api: Arc<dyn VolumeApi>,
    transfer_name: String,
}

impl CinderProvider {
    pub fn new(api: Arc<dyn VolumeApi>, config: &CinderConfig) -> Self {
        Self {
            api,
            transfer_name: config.transfer_name.clone(),
        }
    }
}

impl ResourceProvider for CinderProvider {
    fn name(&self) -> &'static str {
        CINDER
    }

    fn collect_by_id(&self, _ctx: &ChownContext, local_id: &str) -> Result<Box<dyn Resource>> {
        let volume = self
            .api
            .volume_get(local_id)?
            .ok_or_else(|| ChownError::ResourceNotFound {
                id: self.resource_id(local_id),
            })?;
        Ok(Box::new(CinderResource::collect(
            self.api.clone(),
            volume,
            &self.transfer_name,
        )))
    }

    fn collect_by_owner(
        &self,
        _ctx: &ChownContext,
        user_id: Option<&str>,
        project_id: &str,
    ) -> Result<Vec<Box<dyn Resource>>> {
        Ok(self
            .api
            .volume_list_by_owner(user_id, project_id)?
            .into_iter()
            .map(|volume| {
                Box::new(CinderResource::collect(
                    self.api.clone(),
                    volume,
                    &self.transfer_name,
                )) as Box<dyn Resource>
            })
            .collect())
    }

    fn check(&self, _ctx: &ChownContext) -> Result<()> {
        self.api.check().map_err(|e| ChownError::CheckFailed {
            provider: CINDER.to_string(),
            reason: e.to_string(),
        })
    }
}

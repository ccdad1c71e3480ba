//! Compute provider: instances and the volumes and ports attached to them.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Resource, ResourceProvider};
use crate::backend::{ComputeApi, Instance};
use crate::error::{ChownError, Result};
use crate::types::{ChownContext, ResourceId};

pub const NOVA: &str = "nova";

/// `[nova]` section of oschown.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NovaConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Compute state file (defaults to `<state_dir>/nova.json`)
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for NovaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            state_file: None,
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// A compute instance together with the resources it requires.
#[derive(Debug)]
pub struct NovaResource {
    id: ResourceId,
    instance: Instance,
    deps: Vec<ResourceId>,
    api: Arc<dyn ComputeApi>,
}

impl NovaResource {
    fn collect(api: Arc<dyn ComputeApi>, instance: Instance) -> Result<Self> {
        let mut deps = Vec::new();

        for bdm in api.block_device_mappings(&instance.uuid)? {
            if let Some(volume_id) = bdm.volume_id.as_deref().filter(|_| bdm.is_volume()) {
                info!(
                    "Nova instance {} requires attached volume {}",
                    instance.uuid, volume_id
                );
                deps.push(ResourceId::new(super::cinder::CINDER, volume_id));
            }
        }

        for port in api.network_info(&instance.uuid)? {
            info!("Nova instance {} requires port {}", instance.uuid, port.id);
            deps.push(ResourceId::new(super::neutron::NEUTRON, port.id));
        }

        Ok(Self {
            id: ResourceId::new(NOVA, instance.uuid.clone()),
            instance,
            deps,
            api,
        })
    }
}

impl Resource for NovaResource {
    fn identifier(&self) -> &ResourceId {
        &self.id
    }

    fn dependencies(&self) -> &[ResourceId] {
        &self.deps
    }

    fn chown(&self, ctx: &ChownContext) -> Result<()> {
        let uuid = &self.instance.uuid;
        let mutation_failed = |e: ChownError| ChownError::MutationFailed {
            id: self.id.clone(),
            reason: e.to_string(),
        };

        self.api
            .instance_update_owner(uuid, ctx.target_user_id(), ctx.target_project_id())
            .map_err(mutation_failed)?;
        self.api
            .instance_mapping_update_project(uuid, ctx.target_project_id())
            .map_err(mutation_failed)?;
        let action_ids = self
            .api
            .instance_actions_update_owner(uuid, ctx.target_user_id(), ctx.target_project_id())
            .map_err(mutation_failed)?;
        for action_id in action_ids {
            info!("Changing ownership of instance action {}", action_id);
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct NovaProvider {
    api: Arc<dyn ComputeApi>,
}

impl NovaProvider {
    pub fn new(api: Arc<dyn ComputeApi>) -> Self {
        Self { api }
    }
}

impl ResourceProvider for NovaProvider {
    fn name(&self) -> &'static str {
        NOVA
    }

    fn collect_by_id(&self, _ctx: &ChownContext, local_id: &str) -> Result<Box<dyn Resource>> {
        let instance = self
            .api
            .instance_get(local_id)?
            .filter(|i| !i.deleted)
            .ok_or_else(|| ChownError::ResourceNotFound {
                id: self.resource_id(local_id),
            })?;
        Ok(Box::new(NovaResource::collect(self.api.clone(), instance)?))
    }

    fn collect_by_owner(
        &self,
        _ctx: &ChownContext,
        user_id: Option<&str>,
        project_id: &str,
    ) -> Result<Vec<Box<dyn Resource>>> {
        self.api
            .instance_list_by_owner(user_id, project_id)?
            .into_iter()
            .map(|instance| {
                NovaResource::collect(self.api.clone(), instance)
                    .map(|r| Box::new(r) as Box<dyn Resource>)
            })
            .collect()
    }

    fn check(&self, _ctx: &ChownContext) -> Result<()> {
        self.api.check().map_err(|e| ChownError::CheckFailed {
            provider: NOVA.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        BlockDeviceMapping, ComputeState, InstanceAction, InstanceMapping, JsonComputeStore,
        NetworkPort,
    };
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn provider() -> (TempDir, Arc<JsonComputeStore>, NovaProvider) {
        let temp = TempDir::new().expect("temp dir");
        let store = Arc::new(JsonComputeStore::new(temp.path().join("nova.json")));
        let state = ComputeState {
            instances: vec![
                Instance {
                    uuid: "INSTANCE1".into(),
                    user_id: "alice".into(),
                    project_id: "p-1".into(),
                    deleted: false,
                },
                Instance {
                    uuid: "GONE".into(),
                    user_id: "alice".into(),
                    project_id: "p-1".into(),
                    deleted: true,
                },
            ],
            block_device_mappings: vec![
                BlockDeviceMapping {
                    instance_uuid: "INSTANCE1".into(),
                    source_type: "image".into(),
                    volume_id: None,
                },
                BlockDeviceMapping {
                    instance_uuid: "INSTANCE1".into(),
                    source_type: "volume".into(),
                    volume_id: Some("VOL1".into()),
                },
            ],
            info_cache: HashMap::from([(
                "INSTANCE1".to_string(),
                vec![NetworkPort {
                    id: "PORT1".into(),
                    address: None,
                }],
            )]),
            instance_mappings: vec![InstanceMapping {
                instance_uuid: "INSTANCE1".into(),
                project_id: "p-1".into(),
            }],
            instance_actions: vec![InstanceAction {
                id: 1,
                instance_uuid: "INSTANCE1".into(),
                action: "create".into(),
                user_id: "alice".into(),
                project_id: "p-1".into(),
            }],
        };
        store.save(&state).expect("seed");
        let provider = NovaProvider::new(store.clone());
        (temp, store, provider)
    }

    #[test]
    fn collect_reports_volumes_then_ports() {
        let (_temp, _store, provider) = provider();
        let ctx = ChownContext::new("bob", "p-2", false);
        let resource = provider.collect_by_id(&ctx, "INSTANCE1").expect("collect");

        assert_eq!(resource.identifier().to_string(), "nova:INSTANCE1");
        let deps: Vec<String> = resource
            .dependencies()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(deps, vec!["cinder:VOL1", "neutron:PORT1"]);
    }

    #[test]
    fn deleted_instance_is_not_found() {
        let (_temp, _store, provider) = provider();
        let ctx = ChownContext::new("bob", "p-2", false);
        let err = provider.collect_by_id(&ctx, "GONE").expect_err("deleted");
        assert_eq!(
            err,
            ChownError::ResourceNotFound {
                id: ResourceId::new(NOVA, "GONE")
            }
        );
    }

    #[test]
    fn chown_updates_record_mapping_and_actions() {
        let (_temp, store, provider) = provider();
        let ctx = ChownContext::new("bob", "p-2", false);
        provider
            .collect_by_id(&ctx, "INSTANCE1")
            .expect("collect")
            .chown(&ctx)
            .expect("chown");

        let state = store.load().expect("load");
        assert_eq!(state.instances[0].user_id, "bob");
        assert_eq!(state.instances[0].project_id, "p-2");
        assert_eq!(state.instance_mappings[0].project_id, "p-2");
        assert_eq!(state.instance_actions[0].user_id, "bob");
    }

    #[test]
    fn collect_by_owner_lists_live_instances() {
        let (_temp, _store, provider) = provider();
        let ctx = ChownContext::new("bob", "p-2", false);
        let found = provider
            .collect_by_owner(&ctx, None, "p-1")
            .expect("collect");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].identifier().local_id(), "INSTANCE1");
    }
}

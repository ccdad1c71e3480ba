//! Compute service records and the API the nova provider talks to.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{load_state, save_state};
use crate::error::{ChownError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub uuid: String,
    pub user_id: String,
    pub project_id: String,
    #[serde(default)]
    pub deleted: bool,
}

/// How a disk is attached to an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDeviceMapping {
    pub instance_uuid: String,
    /// `volume`, `image`, `snapshot` or `blank`
    pub source_type: String,
    #[serde(default)]
    pub volume_id: Option<String>,
}

impl BlockDeviceMapping {
    /// Whether the mapping refers to a block-storage volume.
    pub fn is_volume(&self) -> bool {
        self.source_type == "volume" && self.volume_id.is_some()
    }
}

/// A network port from an instance's cached network info.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPort {
    pub id: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceMapping {
    pub instance_uuid: String,
    pub project_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceAction {
    pub id: i64,
    pub instance_uuid: String,
    pub action: String,
    pub user_id: String,
    pub project_id: String,
}

/// Full compute state as persisted by [`JsonComputeStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeState {
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(default)]
    pub block_device_mappings: Vec<BlockDeviceMapping>,
    /// Cached network info keyed by instance uuid
    #[serde(default)]
    pub info_cache: HashMap<String, Vec<NetworkPort>>,
    #[serde(default)]
    pub instance_mappings: Vec<InstanceMapping>,
    #[serde(default)]
    pub instance_actions: Vec<InstanceAction>,
}

/// Operations the nova provider needs from the compute service.
pub trait ComputeApi: fmt::Debug {
    /// Verify the service is reachable and its state readable.
    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn instance_get(&self, uuid: &str) -> Result<Option<Instance>>;

    /// Non-deleted instances owned by `project_id` (and `user_id`, if given).
    fn instance_list_by_owner(&self, user_id: Option<&str>, project_id: &str)
    -> Result<Vec<Instance>>;

    fn block_device_mappings(&self, instance_uuid: &str) -> Result<Vec<BlockDeviceMapping>>;

    fn network_info(&self, instance_uuid: &str) -> Result<Vec<NetworkPort>>;

    fn instance_update_owner(&self, uuid: &str, user_id: &str, project_id: &str) -> Result<()>;

    fn instance_mapping_update_project(&self, uuid: &str, project_id: &str) -> Result<()>;

    /// Rewrite the owner of every action recorded for the instance.
    ///
    /// Returns the ids of the actions that were changed.
    fn instance_actions_update_owner(
        &self,
        uuid: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<Vec<i64>>;
}

/// Compute state kept in a single JSON file.
///
/// Every call reads the file, and mutating calls write it back.
#[derive(Debug, Clone)]
pub struct JsonComputeStore {
    path: PathBuf,
}

impl JsonComputeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<ComputeState> {
        load_state(&self.path)
    }

    pub fn save(&self, state: &ComputeState) -> Result<()> {
        save_state(&self.path, state)
    }

    fn update<T>(&self, f: impl FnOnce(&mut ComputeState) -> Result<T>) -> Result<T> {
        let mut state = self.load()?;
        let out = f(&mut state)?;
        self.save(&state)?;
        Ok(out)
    }
}

impl ComputeApi for JsonComputeStore {
    fn check(&self) -> Result<()> {
        self.load().map(|_| ())
    }

    fn instance_get(&self, uuid: &str) -> Result<Option<Instance>> {
        let state = self.load()?;
        Ok(state.instances.into_iter().find(|i| i.uuid == uuid))
    }

    fn instance_list_by_owner(
        &self,
        user_id: Option<&str>,
        project_id: &str,
    ) -> Result<Vec<Instance>> {
        let state = self.load()?;
        Ok(state
            .instances
            .into_iter()
            .filter(|i| !i.deleted && i.project_id == project_id)
            .filter(|i| user_id.is_none_or(|u| i.user_id == u))
            .collect())
    }

    fn block_device_mappings(&self, instance_uuid: &str) -> Result<Vec<BlockDeviceMapping>> {
        let state = self.load()?;
        Ok(state
            .block_device_mappings
            .into_iter()
            .filter(|bdm| bdm.instance_uuid == instance_uuid)
            .collect())
    }

    fn network_info(&self, instance_uuid: &str) -> Result<Vec<NetworkPort>> {
        let mut state = self.load()?;
        Ok(state.info_cache.remove(instance_uuid).unwrap_or_default())
    }

    fn instance_update_owner(&self, uuid: &str, user_id: &str, project_id: &str) -> Result<()> {
        self.update(|state| {
            let instance = state
                .instances
                .iter_mut()
                .find(|i| i.uuid == uuid)
                .ok_or_else(|| ChownError::Backend(format!("instance {uuid} disappeared")))?;
            instance.user_id = user_id.to_string();
            instance.project_id = project_id.to_string();
            Ok(())
        })
    }

    fn instance_mapping_update_project(&self, uuid: &str, project_id: &str) -> Result<()> {
        self.update(|state| {
            let mapping = state
                .instance_mappings
                .iter_mut()
                .find(|m| m.instance_uuid == uuid)
                .ok_or_else(|| {
                    ChownError::Backend(format!("instance mapping for {uuid} not found"))
                })?;
            mapping.project_id = project_id.to_string();
            Ok(())
        })
    }

    fn instance_actions_update_owner(
        &self,
        uuid: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<Vec<i64>> {
        self.update(|state| {
            let mut ids = Vec::new();
            for action in state
                .instance_actions
                .iter_mut()
                .filter(|a| a.instance_uuid == uuid)
            {
                action.user_id = user_id.to_string();
                action.project_id = project_id.to_string();
                ids.push(action.id);
            }
            Ok(ids)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn seeded_store() -> (TempDir, JsonComputeStore) {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonComputeStore::new(temp.path().join("nova.json"));
        let state = ComputeState {
            instances: vec![
                Instance {
                    uuid: "i-1".into(),
                    user_id: "alice".into(),
                    project_id: "p-1".into(),
                    deleted: false,
                },
                Instance {
                    uuid: "i-2".into(),
                    user_id: "bob".into(),
                    project_id: "p-1".into(),
                    deleted: true,
                },
            ],
            instance_actions: vec![
                InstanceAction {
                    id: 7,
                    instance_uuid: "i-1".into(),
                    action: "create".into(),
                    user_id: "alice".into(),
                    project_id: "p-1".into(),
                },
                InstanceAction {
                    id: 8,
                    instance_uuid: "i-2".into(),
                    action: "create".into(),
                    user_id: "bob".into(),
                    project_id: "p-1".into(),
                },
            ],
            ..Default::default()
        };
        store.save(&state).expect("seed state");
        (temp, store)
    }

    #[test]
    fn missing_file_is_empty_state() {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonComputeStore::new(temp.path().join("absent.json"));
        assert_eq!(store.load().expect("load"), ComputeState::default());
        assert!(store.instance_get("i-1").expect("get").is_none());
    }

    #[test]
    fn list_by_owner_skips_deleted() {
        let (_temp, store) = seeded_store();
        let listed = store.instance_list_by_owner(None, "p-1").expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].uuid, "i-1");

        let by_user = store
            .instance_list_by_owner(Some("bob"), "p-1")
            .expect("list");
        assert!(by_user.is_empty());
    }

    #[test]
    fn actions_update_only_touches_instance() {
        let (_temp, store) = seeded_store();
        let ids = store
            .instance_actions_update_owner("i-1", "carol", "p-2")
            .expect("update");
        assert_eq!(ids, vec![7]);

        let state = store.load().expect("load");
        assert_eq!(state.instance_actions[0].project_id, "p-2");
        assert_eq!(state.instance_actions[1].project_id, "p-1");
    }

    #[test]
    fn update_missing_mapping_is_backend_error() {
        let (_temp, store) = seeded_store();
        let err = store
            .instance_mapping_update_project("i-1", "p-2")
            .expect_err("no mapping seeded");
        assert!(matches!(err, ChownError::Backend(_)));
    }
}

//! Block-storage records and the API the cinder provider talks to.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{load_state, save_state};
use crate::error::{ChownError, Result};

pub const STATUS_AVAILABLE: &str = "available";
pub const STATUS_IN_USE: &str = "in-use";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeAttachment {
    pub instance_uuid: String,
    #[serde(default)]
    pub mountpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub status: String,
    #[serde(default)]
    pub attachments: Vec<VolumeAttachment>,
}

/// A pending or accepted ownership transfer of a volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub volume_id: String,
    pub name: String,
    pub auth_key: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub accepted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeState {
    #[serde(default)]
    pub volumes: Vec<Volume>,
    #[serde(default)]
    pub transfers: Vec<Transfer>,
}

/// Operations the cinder provider needs from the block-storage service.
pub trait VolumeApi: fmt::Debug {
    fn check(&self) -> Result<()> {
        Ok(())
    }

    fn volume_get(&self, id: &str) -> Result<Option<Volume>>;

    fn volume_list_by_owner(&self, user_id: Option<&str>, project_id: &str)
    -> Result<Vec<Volume>>;

    fn volume_set_status(&self, id: &str, status: &str) -> Result<()>;

    /// Offer a volume for transfer. Only `available` volumes may be offered.
    fn transfer_create(&self, volume_id: &str, name: &str) -> Result<Transfer>;

    /// Accept a transfer on behalf of the new owner.
    fn transfer_accept(
        &self,
        transfer_id: &str,
        auth_key: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<()>;
}

/// Block-storage state kept in a single JSON file.
#[derive(Debug, Clone)]
pub struct JsonVolumeStore {
    path: PathBuf,
}

impl JsonVolumeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<VolumeState> {
        load_state(&self.path)
    }

    pub fn save(&self, state: &VolumeState) -> Result<()> {
        save_state(&self.path, state)
    }

    fn update<T>(&self, f: impl FnOnce(&mut VolumeState) -> Result<T>) -> Result<T> {
        let mut state = self.load()?;
        let out = f(&mut state)?;
        self.save(&state)?;
        Ok(out)
    }
}

fn find_volume<'a>(state: &'a mut VolumeState, id: &str) -> Result<&'a mut Volume> {
    state
        .volumes
        .iter_mut()
        .find(|v| v.id == id)
        .ok_or_else(|| ChownError::Backend(format!("volume {id} not found")))
}

impl VolumeApi for JsonVolumeStore {
    fn check(&self) -> Result<()> {
        self.load().map(|_| ())
    }

    fn volume_get(&self, id: &str) -> Result<Option<Volume>> {
        let state = self.load()?;
        Ok(state.volumes.into_iter().find(|v| v.id == id))
    }

    fn volume_list_by_owner(
        &self,
        user_id: Option<&str>,
        project_id: &str,
    ) -> Result<Vec<Volume>> {
        let state = self.load()?;
        Ok(state
            .volumes
            .into_iter()
            .filter(|v| v.project_id == project_id)
            .filter(|v| user_id.is_none_or(|u| v.user_id == u))
            .collect())
    }

    fn volume_set_status(&self, id: &str, status: &str) -> Result<()> {
        self.update(|state| {
            find_volume(state, id)?.status = status.to_string();
            Ok(())
        })
    }

    fn transfer_create(&self, volume_id: &str, name: &str) -> Result<Transfer> {
        self.update(|state| {
            let volume = find_volume(state, volume_id)?;
            if volume.status != STATUS_AVAILABLE {
                return Err(ChownError::Backend(format!(
                    "volume {volume_id} status must be {STATUS_AVAILABLE} to transfer, not {}",
                    volume.status
                )));
            }
            let transfer = Transfer {
                id: Uuid::new_v4().to_string(),
                volume_id: volume_id.to_string(),
                name: name.to_string(),
                auth_key: Uuid::new_v4().simple().to_string(),
                created_at: Utc::now(),
                accepted_at: None,
            };
            state.transfers.push(transfer.clone());
            Ok(transfer)
        })
    }

    fn transfer_accept(
        &self,
        transfer_id: &str,
        auth_key: &str,
        user_id: &str,
        project_id: &str,
    ) -> Result<()> {
        self.update(|state| {
            let transfer = state
                .transfers
                .iter_mut()
                .find(|t| t.id == transfer_id && t.accepted_at.is_none())
                .ok_or_else(|| {
                    ChownError::Backend(format!("transfer {transfer_id} not found"))
                })?;
            if transfer.auth_key != auth_key {
                return Err(ChownError::Backend(format!(
                    "invalid auth key for transfer {transfer_id}"
                )));
            }
            transfer.accepted_at = Some(Utc::now());
            let volume_id = transfer.volume_id.clone();

            let volume = find_volume(state, &volume_id)?;
            volume.user_id = user_id.to_string();
            volume.project_id = project_id.to_string();
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_with(status: &str) -> (TempDir, JsonVolumeStore) {
        let temp = TempDir::new().expect("temp dir");
        let store = JsonVolumeStore::new(temp.path().join("cinder.json"));
        let state = VolumeState {
            volumes: vec![Volume {
                id: "v-1".into(),
                user_id: "alice".into(),
                project_id: "p-1".into(),
                status: status.into(),
                attachments: Vec::new(),
            }],
            transfers: Vec::new(),
        };
        store.save(&state).expect("seed state");
        (temp, store)
    }

    #[test]
    fn transfer_blocked_for_in_use_volume() {
        let (_temp, store) = store_with(STATUS_IN_USE);
        let err = store.transfer_create("v-1", "oschown").expect_err("in-use");
        assert!(matches!(err, ChownError::Backend(_)));
        assert!(store.load().expect("load").transfers.is_empty());
    }

    #[test]
    fn transfer_roundtrip_changes_owner() {
        let (_temp, store) = store_with(STATUS_AVAILABLE);
        let transfer = store.transfer_create("v-1", "oschown").expect("create");
        store
            .transfer_accept(&transfer.id, &transfer.auth_key, "bob", "p-2")
            .expect("accept");

        let volume = store.volume_get("v-1").expect("get").expect("exists");
        assert_eq!(volume.user_id, "bob");
        assert_eq!(volume.project_id, "p-2");

        let state = store.load().expect("load");
        assert!(state.transfers[0].accepted_at.is_some());
    }

    #[test]
    fn transfer_accept_rejects_bad_key() {
        let (_temp, store) = store_with(STATUS_AVAILABLE);
        let transfer = store.transfer_create("v-1", "oschown").expect("create");
        assert!(
            store
                .transfer_accept(&transfer.id, "wrong", "bob", "p-2")
                .is_err()
        );
        let volume = store.volume_get("v-1").expect("get").expect("exists");
        assert_eq!(volume.project_id, "p-1");
    }
}

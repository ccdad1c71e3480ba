//! Service backends used by the concrete providers.
//!
//! Each service is reached through a small API trait ([`ComputeApi`],
//! [`VolumeApi`]) so providers can be exercised against fakes. The bundled
//! implementations keep service state in JSON files, one per service.

pub mod compute;
pub mod volume;

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ChownError, Result};

pub use compute::{
    BlockDeviceMapping, ComputeApi, ComputeState, Instance, InstanceAction, InstanceMapping,
    JsonComputeStore, NetworkPort,
};
pub use volume::{JsonVolumeStore, Transfer, Volume, VolumeApi, VolumeAttachment, VolumeState};

/// Load service state from a JSON file, or the default state if it is absent.
pub(crate) fn load_state<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        return Ok(T::default());
    }
    let bytes = std::fs::read(path).map_err(|e| {
        ChownError::Backend(format!("failed to read state file {}: {e}", path.display()))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        ChownError::Backend(format!("failed to parse state file {}: {e}", path.display()))
    })
}

/// Write service state back to its JSON file atomically (tmp + rename).
pub(crate) fn save_state<T: Serialize>(path: &Path, state: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ChownError::Backend(format!(
                "failed to create state directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    let bytes = serde_json::to_vec_pretty(state)
        .map_err(|e| ChownError::Backend(format!("failed to serialize state: {e}")))?;

    let tmp_path = tmp_path_for(path);
    std::fs::write(&tmp_path, bytes).map_err(|e| {
        ChownError::Backend(format!(
            "failed to write tmp state file {}: {e}",
            tmp_path.display()
        ))
    })?;

    // rename does not replace an existing file on Windows
    #[cfg(windows)]
    if path.exists() {
        std::fs::remove_file(path).map_err(|e| {
            ChownError::Backend(format!(
                "failed to remove existing state file {}: {e}",
                path.display()
            ))
        })?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        ChownError::Backend(format!(
            "failed to rename tmp state file {}: {e}",
            tmp_path.display()
        ))
    })
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "state.json".to_string());
    path.with_file_name(format!("{}.{}.tmp", name, std::process::id()))
}

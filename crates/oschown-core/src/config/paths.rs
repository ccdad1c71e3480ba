//! Default locations for configuration and service state.

use std::path::PathBuf;

pub const CONFIG_FILE_NAME: &str = "oschown.toml";

/// `~/.config/oschown/oschown.toml` (platform equivalent).
pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dir.join("oschown").join(CONFIG_FILE_NAME))
}

/// Directory holding the service state files when none are configured.
pub fn default_state_dir() -> anyhow::Result<PathBuf> {
    let dir = dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .ok_or_else(|| anyhow::anyhow!("Could not determine state directory"))?;
    Ok(dir.join("oschown"))
}

//! Workspace configuration stored in `.kintree/config.json`.

use kintree_server::DEFAULT_PORT;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Directory holding the workspace configuration and the default store.
pub const WORKSPACE_DIR: &str = ".kintree";

const CONFIG_FILE: &str = "config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    /// Store location, relative to the workspace directory.
    pub store: PathBuf,
    /// Default number of results per bucket for `kintree search`.
    pub search_limit: usize,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            store: PathBuf::from("db"),
            search_limit: 20,
            port: DEFAULT_PORT,
        }
    }
}

impl Config {
    pub fn workspace(root: &Path) -> PathBuf {
        root.join(WORKSPACE_DIR)
    }

    /// Reads the config under `root`, or the defaults if there is none.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::workspace(root).join(CONFIG_FILE);
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes the config under `root`, creating the workspace directory.
    pub fn save(&self, root: &Path) -> Result<PathBuf, ConfigError> {
        let dir = Self::workspace(root);
        fs::create_dir_all(&dir)?;

        let path = dir.join(CONFIG_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    /// Resolves the store path.
    ///
    /// An initialized workspace keeps its store inside `.kintree`; otherwise
    /// the per-user data directory is used.
    pub fn store_path(&self, root: &Path) -> PathBuf {
        let workspace = Self::workspace(root);
        if workspace.exists() {
            return workspace.join(&self.store);
        }

        dirs::data_local_dir()
            .unwrap_or(workspace)
            .join("kintree")
            .join(&self.store)
    }
}

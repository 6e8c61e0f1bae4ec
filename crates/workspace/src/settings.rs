//! Presence settings and persistence.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Application id registered with the chat client; owns the image assets.
pub const DEFAULT_CLIENT_ID: &str = "383226320970055681";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("no settings directory available")]
    NoSettingsDir,

    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// User-facing options. Every key is optional in the settings file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PresenceSettings {
    /// Whether presence reporting starts on activation
    pub enabled: bool,
    /// Chat client application id
    pub client_id: String,
    /// Upper line while no file is open
    pub details_idling: String,
    /// Upper line while editing
    pub details_editing: String,
    /// Lower line while no file is open
    pub lower_details_idling: String,
    /// Lower line while editing
    pub lower_details_editing: String,
    /// Replacement for workspace tokens outside any workspace folder
    pub lower_details_no_workspace_found: String,
    /// Large image hover text while idle
    pub large_image_idling: String,
    /// Large image hover text while editing
    pub large_image: String,
    /// Small image hover text
    pub small_image: String,
    /// Hide connection failure notifications
    pub suppress_notifications: bool,
    /// Gitignore-style patterns for workspaces that never report
    pub workspace_exclude_patterns: Vec<String>,
    /// Show the language icon small and the editor icon large
    pub swap_big_and_small_image: bool,
    /// Do not report an elapsed-time timestamp
    pub remove_timestamp: bool,
    /// Seconds without window focus before switching to idle, 0 disables
    pub idle_timeout: u64,
    /// Minimum interval between refreshes caused by edits
    pub edit_throttle_ms: u64,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            client_id: DEFAULT_CLIENT_ID.to_string(),
            details_idling: "Idling".to_string(),
            details_editing: "Editing {file_name}".to_string(),
            lower_details_idling: "Idling".to_string(),
            lower_details_editing: "Workspace: {workspace}".to_string(),
            lower_details_no_workspace_found: "No workspace".to_string(),
            large_image_idling: "Idling".to_string(),
            large_image: "Editing a {LANG} file".to_string(),
            small_image: "{app_name}".to_string(),
            suppress_notifications: false,
            workspace_exclude_patterns: Vec::new(),
            swap_big_and_small_image: false,
            remove_timestamp: false,
            idle_timeout: 300,
            edit_throttle_ms: 2000,
        }
    }
}

impl PresenceSettings {
    /// Default settings file location.
    pub fn default_path() -> Option<PathBuf> {
        let dirs = ProjectDirs::from("dev", "editor_presence", "editor-presence")?;
        Some(dirs.config_dir().join("settings.json"))
    }

    /// Load settings from disk. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let data = match std::fs::read_to_string(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(&data).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings, logging and falling back to defaults on error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("using default settings: {e}");
            Self::default()
        })
    }

    /// Save settings to disk.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    /// Persist the `enabled` flag, keeping every other key as stored.
    pub fn update_enabled(path: &Path, enabled: bool) -> Result<(), SettingsError> {
        let mut stored = Self::load(path)?;
        stored.enabled = enabled;
        stored.save(path)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout > 0).then(|| Duration::from_secs(self.idle_timeout))
    }

    pub fn edit_throttle(&self) -> Duration {
        Duration::from_millis(self.edit_throttle_ms)
    }
}

//! Workspace state for the presence companion.
//!
//! Provides settings persistence, workspace folder resolution, exclusion
//! patterns, git metadata discovery and file watching.

pub mod exclude;
pub mod git;
pub mod settings;
pub mod watcher;

pub use exclude::ExcludeMatcher;
pub use git::GitInfo;
pub use settings::{PresenceSettings, SettingsError, DEFAULT_CLIENT_ID};
pub use watcher::{FileWatcher, WatchEvent};

use presence_core::{HostState, WorkspaceFolder};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Marker some hosts append to the names of multi-root workspaces.
pub const WORKSPACE_SUFFIX: &str = "(Workspace)";

/// The workspace folder containing `path`; the deepest one wins for nested folders.
pub fn workspace_folder_for<'a>(
    folders: &'a [WorkspaceFolder],
    path: &Path,
) -> Option<&'a WorkspaceFolder> {
    folders
        .iter()
        .filter(|f| path.starts_with(&f.path))
        .max_by_key(|f| f.path.components().count())
}

/// Directory components between a workspace folder and a file inside it.
pub fn relative_dirs(folder: &Path, file: &Path) -> Vec<String> {
    let Ok(relative) = file.strip_prefix(folder) else {
        return Vec::new();
    };
    let mut dirs: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    dirs.pop();
    dirs
}

/// Host workspace name without the multi-root suffix.
pub fn workspace_display_name(state: &HostState) -> Option<String> {
    state
        .workspace_name
        .as_deref()
        .map(|n| n.replace(WORKSPACE_SUFFIX, "").trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Coordinates settings, exclusion and watching for one host session.
#[derive(Debug)]
pub struct WorkspaceService {
    /// Settings file location
    settings_path: PathBuf,
    /// Current settings
    settings: PresenceSettings,
    /// Compiled exclude patterns
    exclude: ExcludeMatcher,
    /// File watcher
    watcher: Option<FileWatcher>,
    /// HEAD file currently followed for branch changes
    watched_head: Option<PathBuf>,
}

impl WorkspaceService {
    /// Load settings from `settings_path`, falling back to defaults.
    pub fn open(settings_path: PathBuf) -> Self {
        let settings = PresenceSettings::load_or_default(&settings_path);
        Self::with_settings(settings_path, settings)
    }

    pub fn with_settings(settings_path: PathBuf, settings: PresenceSettings) -> Self {
        let exclude = ExcludeMatcher::new(&settings.workspace_exclude_patterns);
        Self {
            settings_path,
            settings,
            exclude,
            watcher: None,
            watched_head: None,
        }
    }

    pub fn settings(&self) -> &PresenceSettings {
        &self.settings
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Re-read the settings file. Returns true when anything changed.
    pub fn reload_settings(&mut self) -> bool {
        let settings = PresenceSettings::load_or_default(&self.settings_path);
        if settings == self.settings {
            return false;
        }
        self.exclude = ExcludeMatcher::new(&settings.workspace_exclude_patterns);
        self.settings = settings;
        true
    }

    /// Persist the enabled flag. Failures are logged and otherwise ignored.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.settings.enabled = enabled;
        if let Err(e) = PresenceSettings::update_enabled(&self.settings_path, enabled) {
            tracing::debug!("could not persist enabled={enabled}: {e}");
        }
    }

    /// Whether any open workspace folder matches an exclude pattern.
    pub fn is_excluded(&self, state: &HostState) -> bool {
        self.exclude
            .any_excluded(state.workspace_folders.iter().map(|f| f.path.as_path()))
    }

    /// Start the file watcher and follow the settings file.
    ///
    /// The settings directory is created when missing. If it still cannot be
    /// watched the watcher is kept so repository `HEAD` files can be followed.
    pub fn start_watching(&mut self) -> Result<(), String> {
        let mut watcher = FileWatcher::new()?;
        if let Some(dir) = self.settings_path.parent() {
            if let Err(e) = fs::create_dir_all(dir) {
                tracing::debug!("cannot create {}: {e}", dir.display());
            }
        }
        if let Err(e) = watcher.watch_file(&self.settings_path) {
            tracing::warn!("settings changes will not be picked up: {e}");
        }
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Get watch event receiver.
    pub fn watch_events(&self) -> Option<tokio::sync::broadcast::Receiver<WatchEvent>> {
        self.watcher.as_ref().map(|w| w.subscribe())
    }

    /// Follow the HEAD file of the repository containing `dir`, dropping the previous one.
    pub fn follow_repository(&mut self, dir: Option<&Path>) {
        let head = dir.and_then(GitInfo::discover).map(|info| info.head_path);
        if head == self.watched_head {
            return;
        }
        let Some(watcher) = self.watcher.as_mut() else {
            return;
        };
        if let Some(old) = self.watched_head.take() {
            if old.parent() != self.settings_path.parent() {
                watcher.unwatch_file(&old);
            }
        }
        if let Some(new) = &head {
            if let Err(e) = watcher.watch_file(new) {
                tracing::debug!("cannot watch {}: {e}", new.display());
                return;
            }
        }
        self.watched_head = head;
    }

    /// Classify a watch event against the files this service follows.
    pub fn classify(&self, event: &WatchEvent) -> Option<WatchedFile> {
        let path = event.path()?;
        if path == self.settings_path {
            return Some(WatchedFile::Settings);
        }
        if self.watched_head.as_deref() == Some(path) {
            return Some(WatchedFile::GitHead);
        }
        None
    }
}

/// Files whose changes affect the presence.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WatchedFile {
    Settings,
    GitHead,
}

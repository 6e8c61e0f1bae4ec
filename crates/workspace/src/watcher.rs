//! File watching for the settings file and git HEAD files.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Events emitted by the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// File created
    Created(PathBuf),
    /// File modified
    Modified(PathBuf),
    /// File deleted
    Deleted(PathBuf),
    /// Error occurred
    Error(String),
}

impl WatchEvent {
    /// The path this event concerns, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            WatchEvent::Created(p) | WatchEvent::Modified(p) | WatchEvent::Deleted(p) => Some(p),
            WatchEvent::Error(_) => None,
        }
    }
}

/// Watches individual files by watching their parent directories, so that
/// files replaced through rename still report changes.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    watched_dirs: HashSet<PathBuf>,
    event_tx: broadcast::Sender<WatchEvent>,
}

impl FileWatcher {
    /// Create a watcher with nothing watched yet.
    pub fn new() -> Result<Self, String> {
        let (event_tx, _) = broadcast::channel(256);
        let tx_clone = event_tx.clone();

        let (sync_tx, sync_rx) = mpsc::channel::<notify::Result<Event>>();

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = sync_tx.send(res);
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )
        .map_err(|e| e.to_string())?;

        // Spawn thread to process events
        std::thread::spawn(move || {
            while let Ok(res) = sync_rx.recv() {
                match res {
                    Ok(event) => {
                        for we in Self::convert_event(event) {
                            let _ = tx_clone.send(we);
                        }
                    }
                    Err(e) => {
                        let _ = tx_clone.send(WatchEvent::Error(e.to_string()));
                    }
                }
            }
        });

        Ok(Self {
            watcher,
            watched_dirs: HashSet::new(),
            event_tx,
        })
    }

    /// Start reporting changes to `file`. Watching the same directory twice is a no-op.
    pub fn watch_file(&mut self, file: &Path) -> Result<(), String> {
        let dir = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| format!("no parent directory: {}", file.display()))?;
        if self.watched_dirs.contains(dir) {
            return Ok(());
        }
        self.watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|e| e.to_string())?;
        tracing::debug!("watching {}", dir.display());
        self.watched_dirs.insert(dir.to_path_buf());
        Ok(())
    }

    /// Stop reporting changes to files in the directory of `file`.
    pub fn unwatch_file(&mut self, file: &Path) {
        let Some(dir) = file.parent() else {
            return;
        };
        if self.watched_dirs.remove(dir) {
            if let Err(e) = self.watcher.unwatch(dir) {
                tracing::debug!("unwatch {} failed: {e}", dir.display());
            }
        }
    }

    /// Subscribe to watch events.
    pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
        self.event_tx.subscribe()
    }

    /// Convert notify event to our watch event.
    fn convert_event(event: Event) -> Vec<WatchEvent> {
        let paths = event.paths;
        match event.kind {
            EventKind::Create(_) => paths.into_iter().map(WatchEvent::Created).collect(),
            EventKind::Modify(_) => paths.into_iter().map(WatchEvent::Modified).collect(),
            EventKind::Remove(_) => paths.into_iter().map(WatchEvent::Deleted).collect(),
            EventKind::Any | EventKind::Access(_) | EventKind::Other => Vec::new(),
        }
    }
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watched_dirs", &self.watched_dirs)
            .finish()
    }
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// User-invoked commands forwarded by the host plugin.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresenceCommand {
    Enable,
    Disable,
    Reconnect,
    Disconnect,
}

/// Messages the host editor writes to us, one JSON object per line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Hello {
        app_name: String,
        #[serde(default)]
        workspace_name: Option<String>,
        #[serde(default)]
        workspace_folders: Vec<WorkspaceFolder>,
    },
    WorkspaceChanged {
        #[serde(default)]
        workspace_name: Option<String>,
        #[serde(default)]
        workspace_folders: Vec<WorkspaceFolder>,
    },
    ActiveEditorChanged {
        #[serde(default)]
        document: Option<ActiveDocument>,
    },
    DocumentChanged {
        document: ActiveDocument,
    },
    WindowFocusChanged {
        focused: bool,
    },
    Command {
        command: PresenceCommand,
    },
    Shutdown,
}

impl HostMessage {
    pub fn parse_line(line: &str) -> Result<Self> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CoreError::InvalidInput("empty host message".to_string()));
        }
        Ok(serde_json::from_str(line)?)
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Messages we write back to the host editor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostNotice {
    Notify { level: NoticeLevel, message: String },
    Status { connected: bool },
}

impl HostNotice {
    pub fn info(message: impl Into<String>) -> Self {
        HostNotice::Notify {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        HostNotice::Notify {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

pub type NoticeSender = mpsc::Sender<HostNotice>;
pub type NoticeReceiver = mpsc::Receiver<HostNotice>;

pub fn new_notice_channel(buffer: usize) -> (NoticeSender, NoticeReceiver) {
    mpsc::channel(buffer)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkspaceFolder {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct CursorPosition {
    pub line: usize,
    pub character: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveDocument {
    pub path: PathBuf,
    #[serde(default)]
    pub language_id: String,
    #[serde(default)]
    pub line_count: usize,
    #[serde(default)]
    pub cursor: CursorPosition,
    #[serde(default)]
    pub text_len: u64,
}

impl Default for ActiveDocument {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            language_id: "plaintext".to_string(),
            line_count: 1,
            cursor: CursorPosition::default(),
            text_len: 0,
        }
    }
}

/// Live editor state as last reported by the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostState {
    pub app_name: String,
    pub workspace_name: Option<String>,
    pub workspace_folders: Vec<WorkspaceFolder>,
    pub active_document: Option<ActiveDocument>,
    pub window_focused: bool,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            app_name: "Editor".to_string(),
            workspace_name: None,
            workspace_folders: Vec::new(),
            active_document: None,
            window_focused: true,
        }
    }
}

impl HostState {
    /// Folds a host message into the snapshot. Returns false for messages
    /// that carry no state.
    pub fn apply(&mut self, message: &HostMessage) -> bool {
        match message {
            HostMessage::Hello {
                app_name,
                workspace_name,
                workspace_folders,
            } => {
                self.app_name = app_name.clone();
                self.workspace_name = workspace_name.clone();
                self.workspace_folders = workspace_folders.clone();
                true
            }
            HostMessage::WorkspaceChanged {
                workspace_name,
                workspace_folders,
            } => {
                self.workspace_name = workspace_name.clone();
                self.workspace_folders = workspace_folders.clone();
                true
            }
            HostMessage::ActiveEditorChanged { document } => {
                self.active_document = document.clone();
                true
            }
            HostMessage::DocumentChanged { document } => {
                self.active_document = Some(document.clone());
                true
            }
            HostMessage::WindowFocusChanged { focused } => {
                self.window_focused = *focused;
                true
            }
            HostMessage::Command { .. } | HostMessage::Shutdown => false,
        }
    }
}

/// The status payload handed to the IPC client. Rebuilt on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Presence {
    pub details: String,
    pub state: Option<String>,
    pub start_timestamp: Option<i64>,
    pub large_image_key: String,
    pub large_image_text: String,
    pub small_image_key: String,
    pub small_image_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document_changed() {
        let line = r#"{"type":"document_changed","document":{"path":"/w/src/main.rs","language_id":"rust","line_count":40,"cursor":{"line":3,"character":7}}}"#;
        let msg = HostMessage::parse_line(line).unwrap();
        match msg {
            HostMessage::DocumentChanged { document } => {
                assert_eq!(document.path, PathBuf::from("/w/src/main.rs"));
                assert_eq!(document.line_count, 40);
                assert_eq!(document.cursor.character, 7);
                assert_eq!(document.text_len, 0);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_parse_command_and_shutdown() {
        let msg = HostMessage::parse_line(r#"{"type":"command","command":"reconnect"}"#).unwrap();
        assert_eq!(
            msg,
            HostMessage::Command {
                command: PresenceCommand::Reconnect
            }
        );
        let msg = HostMessage::parse_line(r#"{"type":"shutdown"}"#).unwrap();
        assert_eq!(msg, HostMessage::Shutdown);
    }

    #[test]
    fn test_parse_rejects_blank_and_garbage() {
        assert!(matches!(
            HostMessage::parse_line("   "),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            HostMessage::parse_line("{\"type\":\"nope\"}"),
            Err(CoreError::Json(_))
        ));
    }

    #[test]
    fn test_apply_updates_state() {
        let mut state = HostState::default();
        state.apply(&HostMessage::Hello {
            app_name: "Helix".to_string(),
            workspace_name: Some("proj".to_string()),
            workspace_folders: vec![WorkspaceFolder {
                name: "proj".to_string(),
                path: PathBuf::from("/proj"),
            }],
        });
        assert_eq!(state.app_name, "Helix");
        assert!(state.apply(&HostMessage::WindowFocusChanged { focused: false }));
        assert!(!state.window_focused);
        assert!(!state.apply(&HostMessage::Shutdown));
        state.apply(&HostMessage::ActiveEditorChanged { document: None });
        assert!(state.active_document.is_none());
    }

    #[test]
    fn test_notice_line() {
        let line = HostNotice::error("boom").to_line().unwrap();
        assert_eq!(line, r#"{"type":"notify","level":"error","message":"boom"}"#);
        let line = HostNotice::Status { connected: true }.to_line().unwrap();
        assert_eq!(line, r#"{"type":"status","connected":true}"#);
    }
}

//! Builds the presence record from live host state.

use crate::language::IconRegistry;
use crate::template::{
    format_count, format_file_size, pad_text, substitute, to_lower, to_title, to_upper, Token,
    FAKE_EMPTY,
};
use presence_core::{ActiveDocument, HostState, Presence, WorkspaceFolder};
use std::cell::OnceCell;
use std::path::{Path, MAIN_SEPARATOR_STR};
use workspace::{
    relative_dirs, workspace_display_name, workspace_folder_for, GitInfo, PresenceSettings,
};

pub const IDLE_IMAGE_KEY: &str = "vscode-big";
pub const APP_IMAGE_KEY: &str = "vscode";
pub const INSIDERS_IMAGE_KEY: &str = "vscode-insiders";

pub const UNKNOWN_GIT_BRANCH: &str = "Unknown";
pub const UNKNOWN_GIT_REPO_NAME: &str = "Unknown";

/// Filesystem lookups the builder needs. Failures yield `None`.
pub trait DocumentProbe {
    fn file_size(&self, document: &ActiveDocument) -> Option<u64>;
    fn git_info(&self, dir: &Path) -> Option<GitInfo>;
}

/// Reads sizes and git metadata from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl DocumentProbe for FsProbe {
    fn file_size(&self, document: &ActiveDocument) -> Option<u64> {
        std::fs::metadata(&document.path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }

    fn git_info(&self, dir: &Path) -> Option<GitInfo> {
        GitInfo::discover(dir)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ActivityBuilder<P = FsProbe> {
    icons: IconRegistry,
    probe: P,
}

impl ActivityBuilder<FsProbe> {
    pub fn new() -> Self {
        Self::with_probe(FsProbe)
    }
}

impl<P: DocumentProbe> ActivityBuilder<P> {
    pub fn with_probe(probe: P) -> Self {
        Self {
            icons: IconRegistry::new(),
            probe,
        }
    }

    /// Build using the current wall clock for a fresh start timestamp.
    pub fn build_now(
        &self,
        previous: &Presence,
        state: &HostState,
        settings: &PresenceSettings,
        idle: bool,
    ) -> Presence {
        self.build(
            previous,
            state,
            settings,
            idle,
            chrono::Utc::now().timestamp_millis(),
        )
    }

    /// Recompute the presence. Only the start timestamp carries over from `previous`.
    pub fn build(
        &self,
        previous: &Presence,
        state: &HostState,
        settings: &PresenceSettings,
        idle: bool,
        now_ms: i64,
    ) -> Presence {
        let app_only = |token: Token| (token == Token::AppName).then(|| state.app_name.clone());

        let app_image_key = if state.app_name.contains("Insiders") {
            INSIDERS_IMAGE_KEY
        } else {
            APP_IMAGE_KEY
        };
        let small_image_text = pad_text(substitute(&settings.small_image, app_only));
        let idle_image_text = pad_text(substitute(&settings.large_image_idling, app_only));

        let mut presence = Presence {
            details: pad_text(substitute(&settings.details_idling, app_only)),
            state: optional_line(substitute(&settings.lower_details_idling, app_only)),
            start_timestamp: if settings.remove_timestamp {
                None
            } else {
                Some(previous.start_timestamp.unwrap_or(now_ms))
            },
            large_image_key: IDLE_IMAGE_KEY.to_string(),
            large_image_text: idle_image_text,
            small_image_key: app_image_key.to_string(),
            small_image_text,
        };

        if settings.swap_big_and_small_image {
            std::mem::swap(&mut presence.large_image_key, &mut presence.small_image_key);
            std::mem::swap(&mut presence.large_image_text, &mut presence.small_image_text);
        }

        let document = match (&state.active_document, idle) {
            (Some(document), false) => document,
            _ => return presence,
        };

        let ctx = DocumentContext {
            icon: self.icons.resolve(document),
            folder: workspace_folder_for(&state.workspace_folders, &document.path),
            document,
            state,
            settings,
            probe: &self.probe,
            git: OnceCell::new(),
        };
        let resolve = |token: Token| Some(ctx.resolve(token));

        presence.details = pad_text(substitute(&settings.details_editing, resolve));
        presence.state = optional_line(substitute(&settings.lower_details_editing, resolve));

        let language_text = pad_text(substitute(&settings.large_image, resolve));
        if settings.swap_big_and_small_image {
            presence.small_image_key = ctx.icon.to_string();
            presence.small_image_text = language_text;
        } else {
            presence.large_image_key = ctx.icon.to_string();
            presence.large_image_text = language_text;
        }

        tracing::trace!(
            language_id = %document.language_id,
            icon = ctx.icon,
            "built editing presence"
        );
        presence
    }
}

fn optional_line(line: String) -> Option<String> {
    (!line.trim().is_empty()).then(|| pad_text(line))
}

struct DocumentContext<'a, P> {
    document: &'a ActiveDocument,
    state: &'a HostState,
    settings: &'a PresenceSettings,
    probe: &'a P,
    icon: &'static str,
    folder: Option<&'a WorkspaceFolder>,
    git: OnceCell<Option<GitInfo>>,
}

impl<P: DocumentProbe> DocumentContext<'_, P> {
    fn resolve(&self, token: Token) -> String {
        match token {
            Token::FileName => self
                .document
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.document.path.display().to_string()),
            Token::DirName => self.dir_name(),
            Token::FullDirName => match self.folder {
                Some(folder) => {
                    let dirs = relative_dirs(&folder.path, &self.document.path);
                    format!("{}{MAIN_SEPARATOR_STR}{}", folder.name, dirs.join(MAIN_SEPARATOR_STR))
                }
                None => self.dir_name(),
            },
            Token::Workspace => self.workspace_name(),
            Token::WorkspaceFolder => self.folder_name(),
            Token::WorkspaceAndFolder => {
                let workspace = self.workspace_name();
                let folder = self.folder_name();
                if folder == FAKE_EMPTY {
                    workspace
                } else {
                    format!("{workspace} - {folder}")
                }
            }
            Token::LanguageLowerCase => to_lower(self.icon),
            Token::LanguageTitleCase => to_title(self.icon),
            Token::LanguageUpperCase => to_upper(self.icon),
            Token::TotalLines => format_count(self.document.line_count),
            Token::CurrentLine => format_count(self.document.cursor.line + 1),
            Token::CurrentColumn => format_count(self.document.cursor.character + 1),
            Token::FileSize => format_file_size(
                self.probe
                    .file_size(self.document)
                    .unwrap_or(self.document.text_len),
            ),
            Token::AppName => self.state.app_name.clone(),
            Token::GitRepoName => self
                .git()
                .map_or_else(|| UNKNOWN_GIT_REPO_NAME.to_string(), |g| g.name.clone()),
            Token::GitBranch => self
                .git()
                .map_or_else(|| UNKNOWN_GIT_BRANCH.to_string(), |g| g.branch.clone()),
        }
    }

    fn dir_name(&self) -> String {
        self.document
            .path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn folder_name(&self) -> String {
        self.folder.map_or_else(
            || self.settings.lower_details_no_workspace_found.clone(),
            |f| f.name.clone(),
        )
    }

    fn workspace_name(&self) -> String {
        workspace_display_name(self.state).unwrap_or_else(|| self.folder_name())
    }

    fn git(&self) -> Option<&GitInfo> {
        self.git
            .get_or_init(|| {
                let dir = self.document.path.parent()?;
                tracing::debug!("reading git metadata near {}", dir.display());
                self.probe.git_info(dir)
            })
            .as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presence_core::CursorPosition;
    use std::cell::Cell;
    use std::path::PathBuf;

    #[derive(Default)]
    struct FakeProbe {
        size: Option<u64>,
        git: Option<GitInfo>,
        git_reads: Cell<usize>,
    }

    impl DocumentProbe for FakeProbe {
        fn file_size(&self, _document: &ActiveDocument) -> Option<u64> {
            self.size
        }

        fn git_info(&self, _dir: &Path) -> Option<GitInfo> {
            self.git_reads.set(self.git_reads.get() + 1);
            self.git.clone()
        }
    }

    fn editing_state() -> HostState {
        HostState {
            app_name: "Visual Studio Code".to_string(),
            workspace_name: None,
            workspace_folders: vec![WorkspaceFolder {
                name: "presence".to_string(),
                path: PathBuf::from("/home/me/presence"),
            }],
            active_document: Some(ActiveDocument {
                path: PathBuf::from("/home/me/presence/crates/app/main.rs"),
                language_id: "rust".to_string(),
                line_count: 1204,
                cursor: CursorPosition {
                    line: 9,
                    character: 4,
                },
                text_len: 512,
            }),
            window_focused: true,
        }
    }

    fn git_info() -> GitInfo {
        GitInfo {
            name: "presence".to_string(),
            branch: "main".to_string(),
            work_tree: PathBuf::from("/home/me/presence"),
            head_path: PathBuf::from("/home/me/presence/.git/HEAD"),
        }
    }

    #[test]
    fn test_idle_presence() {
        let builder = ActivityBuilder::with_probe(FakeProbe::default());
        let state = HostState {
            app_name: "Code - Insiders".to_string(),
            ..Default::default()
        };
        let settings = PresenceSettings::default();

        let p = builder.build(&Presence::default(), &state, &settings, false, 42);
        assert_eq!(p.details, "Idling");
        assert_eq!(p.state.as_deref(), Some("Idling"));
        assert_eq!(p.start_timestamp, Some(42));
        assert_eq!(p.large_image_key, IDLE_IMAGE_KEY);
        assert_eq!(p.large_image_text, "Idling");
        assert_eq!(p.small_image_key, INSIDERS_IMAGE_KEY);
        assert_eq!(p.small_image_text, "Code - Insiders");
    }

    #[test]
    fn test_editing_presence_defaults() {
        let builder = ActivityBuilder::with_probe(FakeProbe::default());
        let p = builder.build(
            &Presence::default(),
            &editing_state(),
            &PresenceSettings::default(),
            false,
            7,
        );
        assert_eq!(p.details, "Editing main.rs");
        assert_eq!(p.state.as_deref(), Some("Workspace: presence"));
        assert_eq!(p.large_image_key, "rust");
        assert_eq!(p.large_image_text, "Editing a RUST file");
        assert_eq!(p.small_image_key, APP_IMAGE_KEY);
        assert_eq!(p.small_image_text, "Visual Studio Code");
    }

    #[test]
    fn test_all_document_tokens() {
        let probe = FakeProbe {
            size: Some(15_360),
            git: Some(git_info()),
            ..Default::default()
        };
        let builder = ActivityBuilder::with_probe(probe);
        let settings = PresenceSettings {
            details_editing: "{file_name} in {dir_name} ({full_dir_name}) {Lang}/{lang}".to_string(),
            lower_details_editing:
                "{current_line}:{current_column} of {total_lines}, {file_size} on {git_repo_name}@{git_branch}, {git_branch}"
                    .to_string(),
            ..Default::default()
        };

        let p = builder.build(&Presence::default(), &editing_state(), &settings, false, 0);
        let sep = MAIN_SEPARATOR_STR;
        assert_eq!(
            p.details,
            format!("main.rs in app (presence{sep}crates{sep}app) Rust/rust")
        );
        assert_eq!(
            p.state.as_deref(),
            Some("10:5 of 1,204, 15.36kb on presence@main, main")
        );
        assert_eq!(builder.probe.git_reads.get(), 1);
    }

    #[test]
    fn test_git_not_read_unless_referenced() {
        let builder = ActivityBuilder::with_probe(FakeProbe::default());
        builder.build(
            &Presence::default(),
            &editing_state(),
            &PresenceSettings::default(),
            false,
            0,
        );
        assert_eq!(builder.probe.git_reads.get(), 0);
    }

    #[test]
    fn test_fallbacks_without_git_or_stat() {
        let builder = ActivityBuilder::with_probe(FakeProbe::default());
        let settings = PresenceSettings {
            lower_details_editing: "{git_repo_name} {git_branch} {file_size}".to_string(),
            ..Default::default()
        };
        let p = builder.build(&Presence::default(), &editing_state(), &settings, false, 0);
        assert_eq!(p.state.as_deref(), Some("Unknown Unknown 512 bytes"));
    }

    #[test]
    fn test_workspace_tokens() {
        let builder = ActivityBuilder::with_probe(FakeProbe::default());
        let settings = PresenceSettings {
            lower_details_editing: "{workspace} | {workspace_folder} | {workspace_and_folder}"
                .to_string(),
            ..Default::default()
        };

        let mut state = editing_state();
        state.workspace_name = Some("mono (Workspace)".to_string());
        let p = builder.build(&Presence::default(), &state, &settings, false, 0);
        assert_eq!(p.state.as_deref(), Some("mono | presence | mono - presence"));

        state.workspace_name = None;
        let p = builder.build(&Presence::default(), &state, &settings, false, 0);
        assert_eq!(p.state.as_deref(), Some("presence | presence | presence - presence"));

        state.workspace_folders.clear();
        let p = builder.build(&Presence::default(), &state, &settings, false, 0);
        assert_eq!(
            p.state.as_deref(),
            Some("No workspace | No workspace | No workspace - No workspace")
        );
    }

    #[test]
    fn test_full_dir_name_outside_workspace_uses_dir_name() {
        let builder = ActivityBuilder::with_probe(FakeProbe::default());
        let settings = PresenceSettings {
            details_editing: "{full_dir_name}".to_string(),
            ..Default::default()
        };
        let mut state = editing_state();
        state.workspace_folders.clear();
        let p = builder.build(&Presence::default(), &state, &settings, false, 0);
        assert_eq!(p.details, "app");
    }

    #[test]
    fn test_swap_images() {
        let builder = ActivityBuilder::with_probe(FakeProbe::default());
        let settings = PresenceSettings {
            swap_big_and_small_image: true,
            ..Default::default()
        };

        let p = builder.build(&Presence::default(), &editing_state(), &settings, false, 0);
        assert_eq!(p.large_image_key, APP_IMAGE_KEY);
        assert_eq!(p.large_image_text, "Visual Studio Code");
        assert_eq!(p.small_image_key, "rust");
        assert_eq!(p.small_image_text, "Editing a RUST file");

        let p = builder.build(&Presence::default(), &editing_state(), &settings, true, 0);
        assert_eq!(p.large_image_key, APP_IMAGE_KEY);
        assert_eq!(p.small_image_key, IDLE_IMAGE_KEY);
        assert_eq!(p.small_image_text, "Idling");
    }

    #[test]
    fn test_idle_flag_hides_document() {
        let builder = ActivityBuilder::with_probe(FakeProbe::default());
        let p = builder.build(
            &Presence::default(),
            &editing_state(),
            &PresenceSettings::default(),
            true,
            0,
        );
        assert_eq!(p.details, "Idling");
        assert_eq!(p.large_image_key, IDLE_IMAGE_KEY);
    }

    #[test]
    fn test_timestamp_rules() {
        let builder = ActivityBuilder::with_probe(FakeProbe::default());
        let previous = Presence {
            start_timestamp: Some(1_000),
            ..Default::default()
        };
        let settings = PresenceSettings::default();
        let p = builder.build(&previous, &editing_state(), &settings, false, 9_000);
        assert_eq!(p.start_timestamp, Some(1_000));

        let settings = PresenceSettings {
            remove_timestamp: true,
            ..Default::default()
        };
        let p = builder.build(&previous, &editing_state(), &settings, false, 9_000);
        assert_eq!(p.start_timestamp, None);
    }

    #[test]
    fn test_short_and_empty_lines() {
        let builder = ActivityBuilder::with_probe(FakeProbe::default());
        let settings = PresenceSettings {
            details_editing: "{lang}".to_string(),
            lower_details_editing: "  ".to_string(),
            large_image: "".to_string(),
            ..Default::default()
        };
        let mut state = editing_state();
        if let Some(doc) = state.active_document.as_mut() {
            doc.path = PathBuf::from("/home/me/presence/x.c");
            doc.language_id = "c".to_string();
        }
        let p = builder.build(&Presence::default(), &state, &settings, false, 0);
        assert_eq!(p.details, "c\u{200b}");
        assert_eq!(p.state, None);
        assert_eq!(p.large_image_text, FAKE_EMPTY);
    }
}

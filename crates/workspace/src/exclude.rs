//! Workspace exclusion using gitignore-style patterns.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Matches workspace folder paths against user exclude patterns.
///
/// Patterns follow gitignore rules: a bare name such as `secret-*` matches
/// a folder of that name anywhere, a pattern containing a slash is anchored
/// at the filesystem root.
#[derive(Debug, Clone)]
pub struct ExcludeMatcher {
    matcher: Option<Gitignore>,
}

impl ExcludeMatcher {
    pub fn new(patterns: &[String]) -> Self {
        if patterns.iter().all(|p| p.trim().is_empty()) {
            return Self { matcher: None };
        }

        let root = std::env::current_dir()
            .ok()
            .and_then(|d| d.ancestors().last().map(Path::to_path_buf))
            .unwrap_or_else(|| Path::new("/").to_path_buf());

        let root_str = root.to_string_lossy().into_owned();
        let mut builder = GitignoreBuilder::new(&root);
        for pattern in patterns {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            let pattern = pattern.strip_prefix(root_str.as_str()).map_or_else(
                || pattern.to_string(),
                |rest| format!("/{}", rest.trim_start_matches(['/', '\\'])),
            );
            if let Err(e) = builder.add_line(None, &pattern) {
                tracing::warn!("ignoring invalid exclude pattern {pattern:?}: {e}");
            }
        }

        match builder.build() {
            Ok(matcher) => Self {
                matcher: Some(matcher),
            },
            Err(e) => {
                tracing::warn!("failed to build exclude patterns: {e}");
                Self { matcher: None }
            }
        }
    }

    /// Whether a workspace folder (or one of its parents) is excluded.
    pub fn is_excluded(&self, folder: &Path) -> bool {
        let Some(matcher) = &self.matcher else {
            return false;
        };
        if !folder.starts_with(matcher.path()) {
            return false;
        }
        matcher
            .matched_path_or_any_parents(folder, true)
            .is_ignore()
    }

    pub fn any_excluded<'a>(&self, folders: impl IntoIterator<Item = &'a Path>) -> bool {
        folders.into_iter().any(|f| self.is_excluded(f))
    }
}

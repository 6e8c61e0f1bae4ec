//! Git repository metadata read straight from the `.git` directory.

use std::fs;
use std::path::{Path, PathBuf};

/// Repository name and checked-out branch for a working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitInfo {
    /// Repository name, from the `origin` remote when one is configured
    pub name: String,
    /// Branch name, or an abbreviated commit id when HEAD is detached
    pub branch: String,
    /// Root of the working tree
    pub work_tree: PathBuf,
    /// The HEAD file that changes on branch switches
    pub head_path: PathBuf,
}

impl GitInfo {
    /// Find the repository containing `dir` and read its metadata.
    pub fn discover(dir: &Path) -> Option<Self> {
        let (work_tree, git_dir) = dir.ancestors().find_map(|candidate| {
            resolve_git_dir(candidate).map(|git_dir| (candidate.to_path_buf(), git_dir))
        })?;

        let head_path = git_dir.join("HEAD");
        let branch = read_branch(&head_path)?;
        let name = read_origin_name(&git_dir)
            .or_else(|| {
                work_tree
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| work_tree.display().to_string());

        Some(Self {
            name,
            branch,
            work_tree,
            head_path,
        })
    }
}

/// Resolve the git directory for a working tree root, handling linked
/// worktrees where `.git` is a file containing `gitdir: <path>`.
fn resolve_git_dir(repo_path: &Path) -> Option<PathBuf> {
    let git_entry = repo_path.join(".git");
    if git_entry.is_dir() {
        return Some(git_entry);
    }
    if git_entry.is_file() {
        let content = fs::read_to_string(&git_entry).ok()?;
        let gitdir = content.trim().strip_prefix("gitdir:")?.trim();
        let gitdir_path = if Path::new(gitdir).is_absolute() {
            PathBuf::from(gitdir)
        } else {
            repo_path.join(gitdir)
        };
        if gitdir_path.is_dir() {
            return Some(gitdir_path);
        }
    }
    None
}

fn read_branch(head_path: &Path) -> Option<String> {
    let head = fs::read_to_string(head_path).ok()?;
    let head = head.trim();
    if let Some(reference) = head.strip_prefix("ref:") {
        let reference = reference.trim();
        let branch = reference.strip_prefix("refs/heads/").unwrap_or(reference);
        return (!branch.is_empty()).then(|| branch.to_string());
    }
    if head.len() >= 7 && head.chars().all(|c| c.is_ascii_hexdigit()) {
        return Some(head[..7].to_string());
    }
    None
}

/// Linked worktrees keep the shared config one level up, next to `commondir`.
fn config_path(git_dir: &Path) -> PathBuf {
    let common = fs::read_to_string(git_dir.join("commondir"))
        .ok()
        .map(|c| git_dir.join(c.trim()));
    common.unwrap_or_else(|| git_dir.to_path_buf()).join("config")
}

fn read_origin_name(git_dir: &Path) -> Option<String> {
    let config = fs::read_to_string(config_path(git_dir)).ok()?;
    let mut in_origin = false;
    for line in config.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_origin = line == r#"[remote "origin"]"#;
            continue;
        }
        if !in_origin {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() == "url" {
            return repo_name_from_url(value.trim());
        }
    }
    None
}

/// `git@github.com:owner/repo.git` and `https://host/owner/repo` both yield `repo`.
fn repo_name_from_url(url: &str) -> Option<String> {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()?
        .trim_end_matches(".git");
    (!last.is_empty()).then(|| last.to_string())
}

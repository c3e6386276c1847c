//! Advisory git information.
//!
//! The reconciler does not need git; the CLI uses this to warn before
//! overwriting the ledger while the working tree has uncommitted changes.
//! Everything degrades to "unknown": git being absent is never an error.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Snapshot of repository state relevant to a ledger write.
#[derive(Debug, Clone)]
pub struct GitInfo {
    pub branch: String,
    pub commit: String,
    pub user_name: String,
    pub user_email: String,
    pub is_clean: bool,
    pub has_uncommitted: bool,
}

impl Default for GitInfo {
    fn default() -> Self {
        Self {
            branch: "unknown".to_string(),
            commit: "unknown".to_string(),
            user_name: "unknown".to_string(),
            user_email: "unknown".to_string(),
            is_clean: false,
            has_uncommitted: false,
        }
    }
}

/// Run a git subcommand, returning (success, stdout, stderr).
///
/// Spawn failures (git not installed) report as unsuccessful rather than
/// erroring; callers treat git as advisory.
#[must_use]
pub fn run_git_command(repo: &Path, args: &[&str]) -> (bool, String, String) {
    match Command::new("git").args(args).current_dir(repo).output() {
        Ok(output) => (
            output.status.success(),
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ),
        Err(e) => (false, String::new(), e.to_string()),
    }
}

/// Gather repository information for the given directory.
#[must_use]
pub fn get_git_info(repo: &Path) -> GitInfo {
    let mut info = GitInfo::default();

    let (ok, branch, _) = run_git_command(repo, &["rev-parse", "--abbrev-ref", "HEAD"]);
    if ok {
        info.branch = branch;
    }

    let (ok, commit, _) = run_git_command(repo, &["rev-parse", "HEAD"]);
    if ok {
        info.commit = commit.chars().take(8).collect();
    }

    let (ok, name, _) = run_git_command(repo, &["config", "user.name"]);
    if ok {
        info.user_name = name;
    }

    let (ok, email, _) = run_git_command(repo, &["config", "user.email"]);
    if ok {
        info.user_email = email;
    }

    let (ok, status, _) = run_git_command(repo, &["status", "--porcelain"]);
    if ok {
        info.is_clean = status.is_empty();
        info.has_uncommitted = !status.is_empty();
    }

    debug!(branch = %info.branch, clean = info.is_clean, "gathered git info");
    info
}

/// Current branch name with slashes flattened, for use in filenames.
#[must_use]
pub fn branch_slug(repo: &Path) -> String {
    let (ok, branch, _) = run_git_command(repo, &["rev-parse", "--abbrev-ref", "HEAD"]);
    if ok && !branch.is_empty() {
        branch.replace('/', "-")
    } else {
        "unknown-branch".to_string()
    }
}

/// Convenience: info for the current directory.
#[must_use]
pub fn current_git_info() -> GitInfo {
    get_git_info(&PathBuf::from("."))
}

// ============================================================================
// Tests
// ============================================================================

//! Changelog entry generation.
//!
//! Gathers change title, author, branch, and package version, and renders
//! a changelog entry file with a UTC timestamp slug. The first open ledger
//! task is referenced so entries tie back to tracked work.

use chrono::{DateTime, Utc};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::error::{LedgerError, Result};
use crate::git;

/// First open task in a markdown ledger: `- [ ] **Title**:`.
static OPEN_TASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^- \[ \] \*\*(.+?)\*\*:").unwrap());

/// A fully gathered changelog entry, ready to render.
#[derive(Debug, Clone)]
pub struct ChangeEntry {
    pub title: String,
    pub author: String,
    pub branch: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub first_open_task: Option<String>,
}

impl ChangeEntry {
    /// UTC timestamp slug for the entry filename (`YYYYMMDDTHHMMSSZ`).
    #[must_use]
    pub fn slug(&self) -> String {
        self.timestamp.format("%Y%m%dT%H%M%SZ").to_string()
    }

    /// Entry filename: slug, branch, and version with dots flattened.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}_{}_{}.md",
            self.slug(),
            self.branch,
            self.version.replace('.', "-")
        )
    }

    /// Render the entry body.
    #[must_use]
    pub fn render(&self) -> String {
        let task = self.first_open_task.as_deref().unwrap_or("None");
        format!(
            "# {title}\n\n\
             - **Date**: {date}\n\
             - **Author**: {author}\n\
             - **Branch**: {branch}\n\
             - **Version**: {version}\n\n\
             ## Summary\n\n\
             {title}\n\n\
             ## Related Task\n\n\
             {task}\n",
            title = self.title,
            date = self.timestamp.format("%Y-%m-%dT%H:%M:%SZ"),
            author = self.author,
            branch = self.branch,
            version = self.version,
            task = task,
        )
    }
}

/// Builds changelog entries from repository state.
#[derive(Debug, Clone)]
pub struct ChangeEntryBuilder {
    root: PathBuf,
    changelog_dir: PathBuf,
    ledger_path: PathBuf,
}

impl ChangeEntryBuilder {
    /// Create a builder rooted at the given project directory.
    ///
    /// Entries land in `docs/changelog/`; the first open task comes from
    /// the given markdown ledger.
    #[must_use]
    pub fn new(root: impl AsRef<Path>, ledger_path: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            changelog_dir: root.join("docs").join("changelog"),
            ledger_path: ledger_path.as_ref().to_path_buf(),
            root,
        }
    }

    /// Gather an entry for the given title at the given time.
    #[must_use]
    pub fn gather(&self, title: &str, now: DateTime<Utc>) -> ChangeEntry {
        let info = git::get_git_info(&self.root);
        ChangeEntry {
            title: title.to_string(),
            author: info.user_name,
            branch: git::branch_slug(&self.root),
            version: self.package_version(),
            timestamp: now,
            first_open_task: self.first_open_task(),
        }
    }

    /// Write an entry file and return its path.
    pub fn write(&self, title: &str, now: DateTime<Utc>) -> Result<PathBuf> {
        if title.trim().is_empty() {
            return Err(LedgerError::changelog("change title cannot be empty"));
        }

        let entry = self.gather(title, now);
        fs::create_dir_all(&self.changelog_dir)?;
        let path = self.changelog_dir.join(entry.file_name());
        fs::write(&path, entry.render())?;
        debug!(path = %path.display(), "changelog entry written");
        Ok(path)
    }

    /// Package version from Cargo.toml, defaulting to "0.0.0".
    fn package_version(&self) -> String {
        let manifest = self.root.join("Cargo.toml");
        let version = fs::read_to_string(&manifest)
            .ok()
            .and_then(|content| content.parse::<toml::Table>().ok())
            .and_then(|table| {
                table
                    .get("package")?
                    .get("version")?
                    .as_str()
                    .map(|s| s.to_string())
            });

        match version {
            Some(v) => v,
            None => {
                warn!(manifest = %manifest.display(), "could not read package version");
                "0.0.0".to_string()
            }
        }
    }

    /// Title of the first unchecked task in the markdown ledger, if any.
    fn first_open_task(&self) -> Option<String> {
        let content = fs::read_to_string(&self.ledger_path).ok()?;
        OPEN_TASK_RE
            .captures(&content)
            .map(|caps| caps[1].to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Ledger file backups.
//!
//! A timestamped snapshot is taken immediately before any ledger overwrite,
//! so a bad reconciliation is always one restore away from undone. Restores
//! snapshot the current file first for the same reason.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{LedgerError, Result};

/// Manages snapshots of a single ledger file.
#[derive(Debug, Clone)]
pub struct BackupManager {
    ledger_path: PathBuf,
    backup_dir: PathBuf,
}

impl BackupManager {
    /// Create a manager for the given ledger file and backup directory.
    #[must_use]
    pub fn new(ledger_path: impl AsRef<Path>, backup_dir: impl AsRef<Path>) -> Self {
        Self {
            ledger_path: ledger_path.as_ref().to_path_buf(),
            backup_dir: backup_dir.as_ref().to_path_buf(),
        }
    }

    /// Snapshot the ledger file with the current timestamp.
    ///
    /// Returns the path of the created backup.
    pub fn snapshot(&self, suffix: Option<&str>) -> Result<PathBuf> {
        self.snapshot_at(suffix, Utc::now())
    }

    /// Snapshot with an explicit timestamp (separated out for tests).
    pub fn snapshot_at(&self, suffix: Option<&str>, now: DateTime<Utc>) -> Result<PathBuf> {
        if !self.ledger_path.exists() {
            return Err(LedgerError::MissingLedger {
                path: self.ledger_path.clone(),
            });
        }

        fs::create_dir_all(&self.backup_dir)?;

        let stem = self
            .ledger_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("ledger");
        let extension = self
            .ledger_path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("bak");
        let timestamp = now.format("%Y%m%dT%H%M%S");
        let suffix = suffix.map(|s| format!("_{s}")).unwrap_or_default();
        let backup_path = self
            .backup_dir
            .join(format!("{stem}_{timestamp}{suffix}.{extension}"));

        fs::copy(&self.ledger_path, &backup_path)
            .map_err(|e| LedgerError::backup(format!("snapshot failed: {e}")))?;

        info!(backup = %backup_path.display(), "ledger snapshot created");
        Ok(backup_path)
    }

    /// Restore the ledger from a backup file.
    ///
    /// The current ledger, if present, is snapshotted first with a
    /// `pre_restore` suffix.
    pub fn restore(&self, backup_path: &Path) -> Result<()> {
        if !backup_path.exists() {
            return Err(LedgerError::RestoreFailed {
                path: backup_path.to_path_buf(),
            });
        }

        if self.ledger_path.exists() {
            let saved = self.snapshot(Some("pre_restore"))?;
            debug!(saved = %saved.display(), "current ledger saved before restore");
        }

        if let Some(parent) = self.ledger_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::copy(backup_path, &self.ledger_path)
            .map_err(|e| LedgerError::backup(format!("restore failed: {e}")))?;

        info!(from = %backup_path.display(), "ledger restored from backup");
        Ok(())
    }

    /// List backup files, oldest first.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.backup_dir.exists() {
            return Ok(Vec::new());
        }

        let mut backups: Vec<PathBuf> = WalkDir::new(&self.backup_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .collect();
        backups.sort();
        Ok(backups)
    }

    /// Delete the oldest backups, keeping at most `keep` files.
    ///
    /// Returns the number of backups removed.
    pub fn prune(&self, keep: usize) -> Result<usize> {
        let backups = self.list()?;
        if backups.len() <= keep {
            return Ok(0);
        }

        let excess = backups.len() - keep;
        for path in &backups[..excess] {
            fs::remove_file(path)
                .map_err(|e| LedgerError::backup(format!("prune failed for {}: {e}", path.display())))?;
        }

        debug!(removed = excess, kept = keep, "pruned old backups");
        Ok(excess)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn setup(temp: &TempDir) -> BackupManager {
        let ledger = temp.path().join("docs").join("tasks.yaml");
        fs::create_dir_all(ledger.parent().unwrap()).unwrap();
        fs::write(&ledger, "critical: []\n").unwrap();
        BackupManager::new(ledger, temp.path().join(".task_backups"))
    }

    fn at(secs: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, secs).unwrap()
    }

    #[test]
    fn test_snapshot_creates_timestamped_copy() {
        let temp = TempDir::new().unwrap();
        let manager = setup(&temp);

        let backup = manager.snapshot_at(None, at(0)).unwrap();
        assert!(backup.exists());
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert_eq!(name, "tasks_20260201T120000.yaml");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "critical: []\n");
    }

    #[test]
    fn test_snapshot_with_suffix() {
        let temp = TempDir::new().unwrap();
        let manager = setup(&temp);

        let backup = manager.snapshot_at(Some("pre_restore"), at(0)).unwrap();
        let name = backup.file_name().unwrap().to_str().unwrap();
        assert!(name.contains("_pre_restore."));
    }

    #[test]
    fn test_snapshot_missing_ledger_is_error() {
        let temp = TempDir::new().unwrap();
        let manager = BackupManager::new(
            temp.path().join("missing.yaml"),
            temp.path().join("backups"),
        );
        assert!(matches!(
            manager.snapshot_at(None, at(0)),
            Err(LedgerError::MissingLedger { .. })
        ));
    }

    #[test]
    fn test_restore_replaces_ledger_and_keeps_safety_copy() {
        let temp = TempDir::new().unwrap();
        let manager = setup(&temp);

        let backup = manager.snapshot_at(None, at(0)).unwrap();
        fs::write(temp.path().join("docs/tasks.yaml"), "high: []\n").unwrap();

        manager.restore(&backup).unwrap();
        assert_eq!(
            fs::read_to_string(temp.path().join("docs/tasks.yaml")).unwrap(),
            "critical: []\n"
        );

        // A pre-restore snapshot of the replaced content exists.
        let listed = manager.list().unwrap();
        assert!(listed
            .iter()
            .any(|p| p.to_str().unwrap().contains("pre_restore")));
    }

    #[test]
    fn test_restore_missing_backup_is_error() {
        let temp = TempDir::new().unwrap();
        let manager = setup(&temp);
        let err = manager.restore(&temp.path().join("nope.yaml")).unwrap_err();
        assert!(matches!(err, LedgerError::RestoreFailed { .. }));
    }

    #[test]
    fn test_list_empty_when_no_backup_dir() {
        let temp = TempDir::new().unwrap();
        let manager = setup(&temp);
        assert!(manager.list().unwrap().is_empty());
    }

    #[test]
    fn test_prune_keeps_newest() {
        let temp = TempDir::new().unwrap();
        let manager = setup(&temp);

        for i in 0..5 {
            manager.snapshot_at(None, at(i)).unwrap();
        }
        assert_eq!(manager.list().unwrap().len(), 5);

        let removed = manager.prune(2).unwrap();
        assert_eq!(removed, 3);

        let remaining = manager.list().unwrap();
        assert_eq!(remaining.len(), 2);
        // Timestamped names sort chronologically, so the newest survive.
        let names: Vec<&str> = remaining
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["tasks_20260201T120003.yaml", "tasks_20260201T120004.yaml"]
        );
    }

    #[test]
    fn test_prune_noop_under_limit() {
        let temp = TempDir::new().unwrap();
        let manager = setup(&temp);
        manager.snapshot_at(None, at(0)).unwrap();
        assert_eq!(manager.prune(5).unwrap(), 0);
    }
}

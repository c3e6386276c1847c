//! YAML bucket form of the ledger.
//!
//! The structured form organizes tasks under five named buckets
//! (`critical`, `high`, `medium`, `low`, `archive`), each a list of task
//! records with the same field set as the markdown form. The `status` enum
//! lives here; the markdown form only carries the checkbox.
//!
//! Loading and saving go through a shadow representation so the in-memory
//! [`Task`] can keep fields the wire form does not carry (`raw_block`,
//! `archived`) and so `checked`/`status` stay one fact.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::{LedgerError, Result};

use super::{Subtask, Task, TaskLedger, TaskStatus};

// ============================================================================
// Wire Representation
// ============================================================================

/// Task record as stored in YAML.
#[derive(Debug, Serialize, Deserialize)]
struct TaskRepr {
    id: Option<u32>,
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    priority: String,
    #[serde(default = "default_status")]
    status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    create_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    finish_date: Option<String>,
    #[serde(default)]
    prerequisites: Vec<String>,
    #[serde(default)]
    subtasks: Vec<Subtask>,
}

fn default_status() -> TaskStatus {
    TaskStatus::Pending
}

/// Whole-document YAML layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerRepr {
    #[serde(default, skip_serializing_if = "serde_yaml::Mapping::is_empty")]
    metadata: serde_yaml::Mapping,
    #[serde(default)]
    critical: Vec<TaskRepr>,
    #[serde(default)]
    high: Vec<TaskRepr>,
    #[serde(default)]
    medium: Vec<TaskRepr>,
    #[serde(default)]
    low: Vec<TaskRepr>,
    #[serde(default)]
    archive: Vec<TaskRepr>,
}

impl TaskRepr {
    fn into_task(self, archived: bool) -> Task {
        Task {
            id: self.id,
            title: self.title,
            checked: self.status == TaskStatus::Completed,
            status: Some(self.status),
            priority: self.priority,
            description: self.description,
            assignee: self.assignee,
            estimated_time: self.estimated_time,
            create_date: self.create_date,
            start_date: self.start_date,
            finish_date: self.finish_date,
            prerequisites: self.prerequisites,
            subtasks: self.subtasks,
            raw_block: String::new(),
            archived,
        }
    }

    fn from_task(task: &Task) -> Self {
        let status = task.status.unwrap_or(if task.checked {
            TaskStatus::Completed
        } else {
            TaskStatus::Pending
        });
        Self {
            id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority.clone(),
            status,
            assignee: task.assignee.clone(),
            estimated_time: task.estimated_time.clone(),
            create_date: task.create_date.clone(),
            start_date: task.start_date.clone(),
            finish_date: task.finish_date.clone(),
            prerequisites: task.prerequisites.clone(),
            subtasks: task.subtasks.clone(),
        }
    }
}

// ============================================================================
// Parse / Render
// ============================================================================

/// Parse YAML content into a ledger.
///
/// Empty content yields an empty ledger. Structural problems (bad YAML,
/// wrong field types) are a hard parse error, distinct from the soft
/// validation the schema validator performs afterwards.
pub fn from_yaml_str(content: &str) -> Result<TaskLedger> {
    if content.trim().is_empty() {
        return Ok(TaskLedger::new());
    }

    let repr: LedgerRepr = serde_yaml::from_str(content)
        .map_err(|e| LedgerError::ledger_parse(format!("YAML parsing failed: {e}")))?;

    let into_bucket =
        |tasks: Vec<TaskRepr>, archived: bool| -> Vec<Task> {
            tasks.into_iter().map(|t| t.into_task(archived)).collect()
        };

    Ok(TaskLedger {
        metadata: repr.metadata,
        critical: into_bucket(repr.critical, false),
        high: into_bucket(repr.high, false),
        medium: into_bucket(repr.medium, false),
        low: into_bucket(repr.low, false),
        archive: into_bucket(repr.archive, true),
    })
}

/// Render a ledger to YAML.
pub fn to_yaml_string(ledger: &TaskLedger) -> Result<String> {
    let repr = LedgerRepr {
        metadata: ledger.metadata.clone(),
        critical: ledger.critical.iter().map(TaskRepr::from_task).collect(),
        high: ledger.high.iter().map(TaskRepr::from_task).collect(),
        medium: ledger.medium.iter().map(TaskRepr::from_task).collect(),
        low: ledger.low.iter().map(TaskRepr::from_task).collect(),
        archive: ledger.archive.iter().map(TaskRepr::from_task).collect(),
    };
    Ok(serde_yaml::to_string(&repr)?)
}

// ============================================================================
// File I/O
// ============================================================================

/// Load a ledger from a YAML file.
///
/// Missing or unreadable files are fatal for the run; they never corrupt
/// the file on disk because nothing is written on the load path.
pub fn load_ledger(path: &Path) -> Result<TaskLedger> {
    if !path.exists() {
        return Err(LedgerError::MissingLedger {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path).map_err(|e| LedgerError::UnreadableLedger {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    debug!(path = %path.display(), bytes = content.len(), "loaded ledger file");
    from_yaml_str(&content)
}

/// Save a ledger to a YAML file.
///
/// The full replacement buffer is rendered first and swapped in with a
/// rename, so readers never observe a torn file.
pub fn save_ledger(ledger: &TaskLedger, path: &Path) -> Result<()> {
    let content = to_yaml_string(ledger)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = path.with_extension("yaml.tmp");
    fs::write(&tmp, &content)?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), bytes = content.len(), "saved ledger file");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

//! Task ledger domain model.
//!
//! This module defines the task record types and the ledger container that
//! organizes them into priority buckets plus an archive.
//!
//! # Architecture
//!
//! ```text
//! TaskLedger
//!   ├── critical: Vec<Task>
//!   ├── high:     Vec<Task>
//!   ├── medium:   Vec<Task>
//!   ├── low:      Vec<Task>
//!   └── archive:  Vec<Task>
//!
//! Task
//!   ├── id: Option<u32>
//!   ├── title / checked / status / priority
//!   ├── prerequisites: Vec<String>
//!   └── subtasks: Vec<Subtask>   (order is append-only)
//! ```
//!
//! Tasks are created by the markdown parser ([`parser`]), loaded from the
//! YAML bucket form ([`yaml`]), or constructed directly. Validation never
//! happens here: the parser degrades bad input to `None`s and the
//! [`crate::validate`] module judges the result.

pub mod parser;
pub mod render;
pub mod yaml;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Priority
// ============================================================================

/// Task priority levels, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    /// All priorities in the literal order used for document sections.
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    /// Canonical string form ("Critical", "High", "Medium", "Low").
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Critical" => Ok(Priority::Critical),
            "High" => Ok(Priority::High),
            "Medium" => Ok(Priority::Medium),
            "Low" => Ok(Priority::Low),
            other => Err(format!("invalid priority: {other}")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Task Status
// ============================================================================

/// Refined completion status carried by the structured ledger form.
///
/// The markdown form only carries the `checked` flag; the YAML form refines
/// it with this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Blocked,
    Cancelled,
}

impl TaskStatus {
    /// All statuses, for summary counting.
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Blocked,
        TaskStatus::Cancelled,
    ];

    /// Canonical string form ("pending", "in_progress", ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "blocked" => Ok(TaskStatus::Blocked),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("invalid status: {other}")),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Subtask
// ============================================================================

/// Individual subtask within a task.
///
/// Subtasks form an ordered list: new entries are appended at the end and
/// existing entries are never reordered, so line-based diffs stay minimal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

impl Subtask {
    /// Create a subtask with the given completion state.
    #[must_use]
    pub fn new(name: impl Into<String>, completed: bool) -> Self {
        Self {
            name: name.into(),
            completed,
        }
    }
}

// ============================================================================
// Task
// ============================================================================

/// A single work item in the ledger.
///
/// Field values mirror what the text forms can carry. Dates are kept as the
/// raw ISO-8601 strings from the document; the validator owns judging them.
/// `raw_block` retains the exact original text span so untouched records can
/// be re-emitted verbatim during document regeneration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Positive integer, unique across the whole ledger. `None` when the
    /// source block had no parseable ID.
    pub id: Option<u32>,
    /// Natural identity key during parsing and merge.
    pub title: String,
    /// The markdown checkbox state.
    #[serde(default)]
    pub checked: bool,
    /// Refined status, carried by the YAML form only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// Raw priority token. Kept as a string so out-of-enum values survive
    /// to validation instead of being silently coerced.
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_date: Option<String>,
    /// Titles of tasks that must complete before this one.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Ordered subtask list; order is append-only.
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    /// Exact original text span, for round-trip fidelity.
    #[serde(skip)]
    pub raw_block: String,
    /// Whether this task was parsed from the Archive section.
    #[serde(skip)]
    pub archived: bool,
}

impl Task {
    /// Create a new task with the given title and defaults.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: None,
            title: title.into(),
            checked: false,
            status: None,
            priority: Priority::Medium.as_str().to_string(),
            description: None,
            assignee: None,
            estimated_time: None,
            create_date: None,
            start_date: None,
            finish_date: None,
            prerequisites: Vec::new(),
            subtasks: Vec::new(),
            raw_block: String::new(),
            archived: false,
        }
    }

    /// Builder method to set the ID.
    #[must_use]
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    /// Builder method to set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority.as_str().to_string();
        self
    }

    /// Whether this task counts as done.
    ///
    /// The markdown checkbox and the YAML `completed` status are the same
    /// fact expressed by two forms.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.checked || self.status == Some(TaskStatus::Completed)
    }

    /// The priority parsed into the closed enum, if the token is valid.
    #[must_use]
    pub fn priority_enum(&self) -> Option<Priority> {
        self.priority.parse().ok()
    }

    /// Look up a subtask's completion state by name.
    #[must_use]
    pub fn subtask(&self, name: &str) -> Option<bool> {
        self.subtasks
            .iter()
            .find(|st| st.name == name)
            .map(|st| st.completed)
    }

    /// Set a subtask's completion state, appending it if new.
    ///
    /// Existing entries keep their position; new entries go to the end.
    pub fn set_subtask(&mut self, name: &str, completed: bool) {
        if let Some(st) = self.subtasks.iter_mut().find(|st| st.name == name) {
            st.completed = completed;
        } else {
            self.subtasks.push(Subtask::new(name, completed));
        }
    }

    /// Count of completed subtasks.
    #[must_use]
    pub fn subtasks_completed(&self) -> usize {
        self.subtasks.iter().filter(|st| st.completed).count()
    }

    /// Fraction of subtasks completed (0.0 to 1.0).
    ///
    /// A task without subtasks reports 1.0 when done and 0.0 otherwise.
    #[must_use]
    pub fn subtask_progress(&self) -> f64 {
        if self.subtasks.is_empty() {
            return if self.is_completed() { 1.0 } else { 0.0 };
        }
        self.subtasks_completed() as f64 / self.subtasks.len() as f64
    }

    /// One-line summary: "ID: title [status] (priority)".
    #[must_use]
    pub fn summary_line(&self) -> String {
        let id = self
            .id
            .map_or_else(|| "?".to_string(), |id| id.to_string());
        let status = self
            .status
            .unwrap_or(if self.checked {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            });
        format!("{}: {} [{}] ({})", id, self.title, status, self.priority)
    }
}

// ============================================================================
// Task Ledger
// ============================================================================

/// Container for tasks organized into priority buckets plus an archive.
#[derive(Debug, Clone, Default)]
pub struct TaskLedger {
    /// Free-form document metadata (project name, version, last updated).
    pub metadata: serde_yaml::Mapping,
    pub critical: Vec<Task>,
    pub high: Vec<Task>,
    pub medium: Vec<Task>,
    pub low: Vec<Task>,
    pub archive: Vec<Task>,
}

impl TaskLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All tasks across every bucket, archive included.
    #[must_use]
    pub fn all_tasks(&self) -> Vec<&Task> {
        self.critical
            .iter()
            .chain(&self.high)
            .chain(&self.medium)
            .chain(&self.low)
            .chain(&self.archive)
            .collect()
    }

    /// All non-archived tasks.
    #[must_use]
    pub fn active_tasks(&self) -> Vec<&Task> {
        self.critical
            .iter()
            .chain(&self.high)
            .chain(&self.medium)
            .chain(&self.low)
            .collect()
    }

    /// Tasks in a single priority bucket.
    #[must_use]
    pub fn bucket(&self, priority: Priority) -> &Vec<Task> {
        match priority {
            Priority::Critical => &self.critical,
            Priority::High => &self.high,
            Priority::Medium => &self.medium,
            Priority::Low => &self.low,
        }
    }

    fn bucket_mut(&mut self, priority: Priority) -> &mut Vec<Task> {
        match priority {
            Priority::Critical => &mut self.critical,
            Priority::High => &mut self.high,
            Priority::Medium => &mut self.medium,
            Priority::Low => &mut self.low,
        }
    }

    /// Find a task by ID across all buckets.
    #[must_use]
    pub fn task_by_id(&self, id: u32) -> Option<&Task> {
        self.all_tasks().into_iter().find(|t| t.id == Some(id))
    }

    /// Next available task ID: one past the largest in use, archive included.
    #[must_use]
    pub fn next_task_id(&self) -> u32 {
        self.all_tasks()
            .iter()
            .filter_map(|t| t.id)
            .max()
            .map_or(1, |max| max + 1)
    }

    /// Add a task to the bucket matching its priority field.
    ///
    /// Tasks whose priority token is not in the closed enum land in the
    /// medium bucket; validation flags them separately.
    pub fn add_task(&mut self, task: Task) {
        let bucket = task.priority_enum().unwrap_or(Priority::Medium);
        self.bucket_mut(bucket).push(task);
    }

    /// Update a task's status by ID, in any bucket. Returns `false` if the
    /// ID is unknown.
    pub fn update_status(&mut self, id: u32, status: TaskStatus) -> bool {
        for bucket in [
            &mut self.critical,
            &mut self.high,
            &mut self.medium,
            &mut self.low,
            &mut self.archive,
        ] {
            if let Some(task) = bucket.iter_mut().find(|t| t.id == Some(id)) {
                task.status = Some(status);
                task.checked = status == TaskStatus::Completed;
                return true;
            }
        }
        false
    }

    /// Move a task to the archive by ID, marking it completed and stamping
    /// the finish date. Returns `false` if the ID is unknown or already
    /// archived.
    pub fn archive_task(&mut self, id: u32, finished_at: &str) -> bool {
        for priority in Priority::ALL {
            let bucket = self.bucket_mut(priority);
            if let Some(pos) = bucket.iter().position(|t| t.id == Some(id)) {
                let mut task = bucket.remove(pos);
                task.checked = true;
                task.status = Some(TaskStatus::Completed);
                task.finish_date = Some(finished_at.to_string());
                task.archived = true;
                self.archive.push(task);
                return true;
            }
        }
        false
    }

    /// Summary statistics over the ledger.
    #[must_use]
    pub fn summary(&self) -> LedgerSummary {
        let active = self.active_tasks();

        let mut status_counts = HashMap::new();
        for status in TaskStatus::ALL {
            let count = active
                .iter()
                .filter(|t| {
                    t.status.unwrap_or(if t.checked {
                        TaskStatus::Completed
                    } else {
                        TaskStatus::Pending
                    }) == status
                })
                .count();
            status_counts.insert(status.as_str().to_string(), count);
        }

        let mut priority_counts = HashMap::new();
        for priority in Priority::ALL {
            let count = active
                .iter()
                .filter(|t| t.priority_enum() == Some(priority))
                .count();
            priority_counts.insert(priority.as_str().to_string(), count);
        }

        let completed = active.iter().filter(|t| t.is_completed()).count();
        let completion_rate = if active.is_empty() {
            0.0
        } else {
            (completed as f64 / active.len() as f64 * 10000.0).round() / 100.0
        };

        LedgerSummary {
            total_tasks: active.len(),
            archived_tasks: self.archive.len(),
            completion_rate,
            status_counts,
            priority_counts,
        }
    }

    /// Find tasks matching the given filter.
    #[must_use]
    pub fn find_tasks(&self, filter: &TaskFilter) -> Vec<&Task> {
        let tasks = if filter.include_archived {
            self.all_tasks()
        } else {
            self.active_tasks()
        };

        tasks
            .into_iter()
            .filter(|t| {
                if let Some(p) = filter.priority {
                    if t.priority_enum() != Some(p) {
                        return false;
                    }
                }
                if let Some(s) = filter.status {
                    if t.status != Some(s) {
                        return false;
                    }
                }
                if let Some(ref a) = filter.assignee {
                    if t.assignee.as_deref() != Some(a.as_str()) {
                        return false;
                    }
                }
                if let Some(has) = filter.has_subtasks {
                    if t.subtasks.is_empty() == has {
                        return false;
                    }
                }
                true
            })
            .collect()
    }
}

/// Summary statistics for a ledger.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSummary {
    pub total_tasks: usize,
    pub archived_tasks: usize,
    /// Percentage of active tasks completed, rounded to two decimals.
    pub completion_rate: f64,
    pub status_counts: HashMap<String, usize>,
    pub priority_counts: HashMap<String, usize>,
}

/// Criteria for [`TaskLedger::find_tasks`].
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
    pub assignee: Option<String>,
    pub has_subtasks: Option<bool>,
    pub include_archived: bool,
}

impl TaskFilter {
    /// Create an empty filter matching every active task.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Filter by status.
    #[must_use]
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filter by assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Filter by presence of subtasks.
    #[must_use]
    pub fn with_subtasks(mut self, has: bool) -> Self {
        self.has_subtasks = Some(has);
        self
    }

    /// Include archived tasks in the search.
    #[must_use]
    pub fn including_archived(mut self) -> Self {
        self.include_archived = true;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Ledger validation.
//!
//! Validation never panics and never mutates: it returns a structured
//! [`ValidationReport`] separating hard errors (structurally unusable data
//! that blocks a save) from warnings (soft inconsistencies that are normal
//! in a human-edited ledger and only get surfaced).
//!
//! Per-task schema checks live here; set-wide graph checks (duplicate IDs,
//! prerequisite resolution, cycles) live in [`graph`].

pub mod graph;

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::ledger::{Priority, Task, TaskLedger, TaskStatus};

/// Strict ISO-8601 datetime: `YYYY-MM-DDTHH:MM:SS[.ffffff]` with optional
/// trailing `Z`.
static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z?$").unwrap()
});

/// Recognized humane duration shapes: "30 minutes", "2 hours", "1 day",
/// "2h", "30m", "2:30".
static TIME_ESTIMATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+\s*(?:minutes?|hours?|days?|weeks?)|\d+[hm]|\d+:\d+)").unwrap()
});

// ============================================================================
// Validation Report
// ============================================================================

/// Structured result of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Create an empty (valid) report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the data is structurally usable: no hard errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record a hard error.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Record a warning.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Fold another report into this one, prefixing each message.
    pub fn absorb(&mut self, other: ValidationReport, prefix: &str) {
        self.errors
            .extend(other.errors.into_iter().map(|e| format!("{prefix}: {e}")));
        self.warnings
            .extend(other.warnings.into_iter().map(|w| format!("{prefix}: {w}")));
    }
}

// ============================================================================
// Per-Task Schema Validation
// ============================================================================

/// Validate a single task's field-level validity and soft consistency.
///
/// Hard errors: empty title, missing or non-positive ID, priority outside
/// the closed enum, any populated date failing the strict ISO-8601 pattern.
/// Everything else is a warning: human-edited ledgers routinely carry soft
/// inconsistencies, and only structurally unusable data should block a save.
#[must_use]
pub fn validate_task(task: &Task) -> ValidationReport {
    let mut report = ValidationReport::new();

    if task.title.trim().is_empty() {
        report.error("Task title is required and cannot be empty");
    }

    match task.id {
        None => report.error("Task ID must be a positive integer, got: none"),
        Some(0) => report.error("Task ID must be a positive integer, got: 0"),
        Some(_) => {}
    }

    if task.priority.parse::<Priority>().is_err() {
        report.error(format!(
            "Priority must be one of Critical, High, Medium, Low, got: {}",
            task.priority
        ));
    }

    for (field, value) in [
        ("create_date", &task.create_date),
        ("start_date", &task.start_date),
        ("finish_date", &task.finish_date),
    ] {
        if let Some(value) = value {
            if !DATETIME_RE.is_match(value) {
                report.error(format!("{field} must be in ISO-8601 format, got: {value}"));
            }
        }
    }

    // Date ordering is advisory only; both dates must already be well-formed.
    if let (Some(create), Some(start)) = (&task.create_date, &task.start_date) {
        if let (Some(create_dt), Some(start_dt)) = (parse_datetime(create), parse_datetime(start)) {
            if start_dt < create_dt {
                report.warn("Start date is before create date");
            }
        }
    }

    let completed = task.is_completed();
    if completed && task.finish_date.is_none() {
        report.warn("Completed task should have a finish date");
    }
    if !completed && task.finish_date.is_some() {
        report.warn("Incomplete task should not have a finish date");
    }
    if task.status == Some(TaskStatus::InProgress) && task.start_date.is_none() {
        report.warn("Task is in progress but has no start date");
    }

    if !task.subtasks.is_empty() {
        let all_done = task.subtasks.iter().all(|st| st.completed);
        if completed && !all_done {
            report.warn("Main task is completed but some subtasks are not");
        } else if !completed && all_done {
            report.warn("All subtasks completed but main task is not");
        }
    }

    if let Some(estimate) = &task.estimated_time {
        if !TIME_ESTIMATE_RE.is_match(&estimate.trim().to_lowercase()) {
            report.warn("Estimated time should be in a form like '30 minutes', '2 hours', '1 day'");
        }
    }

    report
}

/// Parse a strict ISO-8601 string into a comparable datetime.
fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim_end_matches('Z'), "%Y-%m-%dT%H:%M:%S%.f").ok()
}

// ============================================================================
// Set-Level Validation
// ============================================================================

/// Validate a full task set: per-task schema checks plus the graph checks.
///
/// Each message is prefixed with the owning task so file-level reports read
/// well. Graph errors come first, in their fixed order.
#[must_use]
pub fn validate_task_set(tasks: &[&Task]) -> ValidationReport {
    let mut report = graph::validate_graph(tasks);

    for task in tasks {
        let label = match task.id {
            Some(id) => format!("Task {id}"),
            None => format!("Task '{}'", task.title),
        };
        report.absorb(validate_task(task), &label);
    }

    debug!(
        tasks = tasks.len(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "validated task set"
    );
    report
}

/// Validate a ledger, optionally including the archive bucket.
#[must_use]
pub fn validate_ledger(ledger: &TaskLedger, include_archived: bool) -> ValidationReport {
    let tasks = if include_archived {
        ledger.all_tasks()
    } else {
        ledger.active_tasks()
    };
    validate_task_set(&tasks)
}

// ============================================================================
// Tests
// ============================================================================

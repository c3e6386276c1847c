//! Test-result reconciliation.
//!
//! This module merges a test run's pass/fail results into the ledger's
//! test-fix records, classifies what changed, and regenerates the managed
//! region of the ledger document deterministically.
//!
//! # Data flow
//!
//! ```text
//! runner output ──> TestRun (grouped by file, last-wins per test)
//!                         │
//! ledger text ──> parse ──┤
//!                         ▼
//!               classify + merge per file
//!                         │
//!                         ▼
//!            regenerated document (priority sections + archive)
//! ```
//!
//! The managed middle region of the document is regenerated wholesale from
//! current data rather than patched incrementally. That is a load-bearing
//! choice: re-running reconciliation with unchanged inputs produces
//! byte-identical output, which incremental text edits could not guarantee.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::ledger::parser::{next_task_id, parse_tasks};
use crate::ledger::render::render_task;
use crate::ledger::{Priority, Task};

/// Title convention tying a ledger record to a test file.
const FIX_TITLE_PREFIX: &str = "Fix failing tests in ";

/// Subtask label prefix for an individual test.
const FIX_SUBTASK_PREFIX: &str = "Fix ";

/// One result line: `path::test PASSED` or `path::test FAILED`. Trailing
/// decoration (progress percentages and the like) is tolerated.
static RESULT_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(.+?)::(\S+?) (PASSED|FAILED)\b").unwrap());

// ============================================================================
// Test Run Results
// ============================================================================

/// Outcome of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed,
}

/// Results for one test file, in first-appearance order.
#[derive(Debug, Clone, Default)]
pub struct FileOutcomes {
    pub file_path: String,
    tests: Vec<(String, TestStatus)>,
}

impl FileOutcomes {
    /// Record a result, replacing any earlier entry for the same test
    /// (last-wins) without moving its position.
    fn record(&mut self, test_name: &str, status: TestStatus) {
        if let Some(entry) = self.tests.iter_mut().find(|(name, _)| name == test_name) {
            entry.1 = status;
        } else {
            self.tests.push((test_name.to_string(), status));
        }
    }

    /// Status of a named test in this run, if it ran.
    #[must_use]
    pub fn status_of(&self, test_name: &str) -> Option<TestStatus> {
        self.tests
            .iter()
            .find(|(name, _)| name == test_name)
            .map(|(_, status)| *status)
    }

    /// All test results in first-appearance order.
    #[must_use]
    pub fn tests(&self) -> &[(String, TestStatus)] {
        &self.tests
    }

    /// Whether any test in this file failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.tests.iter().any(|(_, s)| *s == TestStatus::Failed)
    }

    /// Count of failing tests.
    #[must_use]
    pub fn failing_count(&self) -> usize {
        self.tests.iter().filter(|(_, s)| *s == TestStatus::Failed).count()
    }
}

/// A full test run, grouped by file in first-appearance order.
#[derive(Debug, Clone, Default)]
pub struct TestRun {
    files: Vec<FileOutcomes>,
}

impl TestRun {
    /// Parse runner output into grouped results.
    ///
    /// Accepts lines of the literal shape `path::test PASSED|FAILED` in any
    /// order; anything else is ignored. Duplicate `(file, test)` entries use
    /// last-wins semantics, in input order.
    #[must_use]
    pub fn parse(output: &str) -> Self {
        let mut run = TestRun::default();
        for caps in RESULT_LINE_RE.captures_iter(output) {
            let status = if &caps[3] == "PASSED" {
                TestStatus::Passed
            } else {
                TestStatus::Failed
            };
            run.record(&caps[1], &caps[2], status);
        }
        debug!(files = run.files.len(), "parsed test run output");
        run
    }

    fn record(&mut self, file_path: &str, test_name: &str, status: TestStatus) {
        if let Some(file) = self.files.iter_mut().find(|f| f.file_path == file_path) {
            file.record(test_name, status);
        } else {
            let mut file = FileOutcomes {
                file_path: file_path.to_string(),
                tests: Vec::new(),
            };
            file.record(test_name, status);
            self.files.push(file);
        }
    }

    /// Per-file results in first-appearance order.
    #[must_use]
    pub fn files(&self) -> &[FileOutcomes] {
        &self.files
    }

    /// Whether the run produced no results at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

// ============================================================================
// Classification
// ============================================================================

/// Ordered lists of `file::test` strings describing how the run compares
/// to the ledger's prior state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    /// Passing now, previously recorded as an unchecked subtask.
    pub newly_fixed: Vec<String>,
    /// Failing now, not present as any existing subtask.
    pub newly_broken: Vec<String>,
    /// Failing now and already recorded as an unchecked subtask.
    pub still_failing: Vec<String>,
}

impl ReconcileReport {
    /// Whether the report carries anything worth telling the user.
    #[must_use]
    pub fn is_quiet(&self) -> bool {
        self.newly_fixed.is_empty() && self.newly_broken.is_empty() && self.still_failing.is_empty()
    }
}

/// Classify every `(file, test)` pair in the run against the open records.
///
/// Pure: nothing is mutated. Subtasks recorded as checked stay invisible
/// to `newly_fixed`; a failing test whose subtask is already checked still
/// counts as `still_failing`.
#[must_use]
pub fn classify(run: &TestRun, open_records: &HashMap<String, &Task>) -> ReconcileReport {
    let mut report = ReconcileReport::default();

    for file in run.files() {
        let record = open_records.get(file.file_path.as_str());

        for (test_name, status) in file.tests() {
            let key = format!("{}::{}", file.file_path, test_name);
            let recorded = record.and_then(|task| task.subtask(&subtask_label(test_name)));

            match status {
                TestStatus::Passed => {
                    if recorded == Some(false) {
                        report.newly_fixed.push(key);
                    }
                }
                TestStatus::Failed => {
                    if recorded.is_none() {
                        report.newly_broken.push(key);
                    } else {
                        report.still_failing.push(key);
                    }
                }
            }
        }
    }

    report
}

/// Subtask label for a test name ("Fix {test}").
fn subtask_label(test_name: &str) -> String {
    format!("{FIX_SUBTASK_PREFIX}{test_name}")
}

/// Recover the test name from a subtask label.
fn subtask_test_name(label: &str) -> &str {
    label.strip_prefix(FIX_SUBTASK_PREFIX).unwrap_or(label)
}

/// Ledger title for a test file's fix record.
#[must_use]
pub fn fix_task_title(file_path: &str) -> String {
    format!("{FIX_TITLE_PREFIX}{file_path}")
}

/// Recover the file path from a fix record title.
fn fix_task_path(title: &str) -> Option<&str> {
    title.strip_prefix(FIX_TITLE_PREFIX)
}

// ============================================================================
// Reconciler
// ============================================================================

/// Configuration for the reconciler.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Assignee stamped on records the reconciler touches.
    pub assignee: String,
    /// Priority for newly created fix records.
    pub new_task_priority: Priority,
    /// Estimated-time stamp for new fix records.
    pub estimated_time: String,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            assignee: "Roo".to_string(),
            new_task_priority: Priority::Critical,
            estimated_time: "30 minutes".to_string(),
        }
    }
}

impl ReconcilerConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the assignee for touched records.
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = assignee.into();
        self
    }

    /// Set the priority for new fix records.
    #[must_use]
    pub fn with_new_task_priority(mut self, priority: Priority) -> Self {
        self.new_task_priority = priority;
        self
    }
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// Classification of the run against prior ledger state.
    pub report: ReconcileReport,
    /// Whether the regenerated document differs from the input.
    pub changed: bool,
    /// The full replacement document. Only meaningful to write when
    /// `changed` is true; computing it unconditionally keeps the pass pure.
    pub new_document: String,
}

/// Merges test runs into the ledger document.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconcilerConfig,
}

impl Reconciler {
    /// Create a reconciler with the given configuration.
    #[must_use]
    pub fn new(config: ReconcilerConfig) -> Self {
        Self { config }
    }

    /// Reconcile using the current wall clock.
    #[must_use]
    pub fn reconcile(&self, document: &str, run: &TestRun) -> ReconcileOutcome {
        self.reconcile_at(document, run, Utc::now())
    }

    /// Reconcile against a fixed timestamp.
    ///
    /// The whole pass is a pure function of `(document, run, now)`, which is
    /// what makes it testable and idempotent.
    #[must_use]
    pub fn reconcile_at(
        &self,
        document: &str,
        run: &TestRun,
        now: DateTime<Utc>,
    ) -> ReconcileOutcome {
        let now_stamp = format_timestamp(now);
        let tasks = parse_tasks(document);

        // Open fix records: active, unchecked, titled by the file convention.
        // Later duplicates win, matching historical behavior.
        let mut open_records: HashMap<String, &Task> = HashMap::new();
        for task in &tasks {
            if task.archived || task.checked {
                continue;
            }
            if let Some(path) = fix_task_path(&task.title) {
                open_records.insert(path.to_string(), task);
            }
        }

        let report = classify(run, &open_records);

        let mut next_id = next_task_id(document);
        let mut changed = false;
        // Replacement blocks keyed by the source record's title.
        let mut replacements: HashMap<String, String> = HashMap::new();
        let mut appended: Vec<(Priority, String)> = Vec::new();

        for file in run.files() {
            let existing = open_records.get(file.file_path.as_str()).copied();

            // A fully healthy file with no history produces no ledger entry.
            if !file.has_failures() && existing.is_none() {
                continue;
            }

            let (task, file_changed) = match existing {
                Some(record) => self.merge_existing(record, file, &now_stamp),
                None => {
                    let task = self.new_record(file, next_id, &now_stamp);
                    next_id += 1;
                    (task, true)
                }
            };
            changed |= file_changed;

            let block = render_task(&task);
            match existing {
                Some(record) => {
                    replacements.insert(record.title.clone(), block);
                }
                None => {
                    let priority = task.priority_enum().unwrap_or(Priority::Medium);
                    appended.push((priority, block));
                }
            }
        }

        let new_document = regenerate_document(document, &tasks, &replacements, &appended);

        info!(
            fixed = report.newly_fixed.len(),
            broken = report.newly_broken.len(),
            still_failing = report.still_failing.len(),
            changed,
            "reconciled test run"
        );

        ReconcileOutcome {
            report,
            changed,
            new_document,
        }
    }

    /// Merge the current run into an existing open record.
    ///
    /// The record keeps its ID, creation and start dates, and its subtask
    /// order exactly; only checkbox states move. New failures append at the
    /// end, never reordering existing entries.
    fn merge_existing(&self, record: &Task, file: &FileOutcomes, now: &str) -> (Task, bool) {
        let mut task = self.base_record(file, record.id, now);
        task.create_date = record.create_date.clone().or_else(|| Some(now.to_string()));
        task.start_date = record.start_date.clone().or_else(|| Some(now.to_string()));
        task.assignee = record
            .assignee
            .clone()
            .or_else(|| Some(self.config.assignee.clone()));
        task.priority = record.priority.clone();
        if record.estimated_time.is_some() {
            task.estimated_time = record.estimated_time.clone();
        }

        let mut file_changed = false;

        for subtask in &record.subtasks {
            let test_name = subtask_test_name(&subtask.name);
            // A recorded test absent from the current run is treated as
            // fixed. That default is ambiguous (the test may have been
            // renamed rather than repaired), so it is applied here in one
            // place, deliberately.
            let still_failing = file.status_of(test_name) == Some(TestStatus::Failed);
            task.set_subtask(&subtask.name, !still_failing);
            if subtask.completed == still_failing {
                file_changed = true;
            }
        }

        for (test_name, status) in file.tests() {
            if *status == TestStatus::Failed && record.subtask(&subtask_label(test_name)).is_none()
            {
                task.set_subtask(&subtask_label(test_name), false);
                file_changed = true;
            }
        }

        if task.checked != record.checked {
            file_changed = true;
        }

        (task, file_changed)
    }

    /// Build a brand-new record for a file with failures and no history.
    fn new_record(&self, file: &FileOutcomes, id: u32, now: &str) -> Task {
        let mut task = self.base_record(file, Some(id), now);
        task.create_date = Some(now.to_string());
        task.start_date = Some(now.to_string());
        task.assignee = Some(self.config.assignee.clone());
        task.priority = self.config.new_task_priority.as_str().to_string();

        for (test_name, status) in file.tests() {
            if *status == TestStatus::Failed {
                task.set_subtask(&subtask_label(test_name), false);
            }
        }
        task
    }

    /// Shared skeleton for merged and new records: title, description,
    /// parent checkbox, and the finish-date rule.
    fn base_record(&self, file: &FileOutcomes, id: Option<u32>, now: &str) -> Task {
        let failing = file.failing_count();
        let mut task = Task::new(fix_task_title(&file.file_path));
        task.id = id;
        task.checked = !file.has_failures();
        task.description = Some(format!(
            "Fix {failing} failing test{} in {}",
            if failing == 1 { "" } else { "s" },
            file.file_path
        ));
        task.estimated_time = Some(self.config.estimated_time.clone());
        // Stamped exactly when the parent transitions to checked, cleared
        // while failures remain.
        task.finish_date = if task.checked {
            Some(now.to_string())
        } else {
            None
        };
        task
    }
}

// ============================================================================
// Document Regeneration
// ============================================================================

/// The structural separator delimiting the managed region.
fn separator() -> String {
    format!("---{}", "-".repeat(90))
}

/// Whether a line is a structural separator.
fn is_separator(line: &str) -> bool {
    line.starts_with("---") && line.trim().len() > 10
}

/// Regenerate the managed region of the document.
///
/// The preamble up to and including the first separator and everything from
/// the second separator onward are preserved verbatim. In between, tasks are
/// regrouped into the four priority sections (in their literal order) and an
/// always-present Archive section. Updated records use their freshly
/// rendered blocks; untouched records are re-emitted verbatim from their
/// retained raw blocks so nothing is ever silently dropped.
fn regenerate_document(
    original: &str,
    tasks: &[Task],
    replacements: &HashMap<String, String>,
    appended: &[(Priority, String)],
) -> String {
    let lines: Vec<&str> = original.lines().collect();
    let first_sep = lines.iter().position(|l| is_separator(l));

    let mut out: Vec<String> = Vec::new();
    match first_sep {
        Some(idx) => out.extend(lines[..=idx].iter().map(|l| l.to_string())),
        None => {
            // No separator: keep the literal preamble before the first
            // structural element and open a managed region after it.
            let boundary = lines
                .iter()
                .position(|l| l.starts_with("- [") || l.starts_with("## "))
                .unwrap_or(lines.len());
            out.extend(lines[..boundary].iter().map(|l| l.to_string()));
            out.push(String::new());
            out.push(separator());
        }
    }
    out.push(String::new());

    // Blocks per active task, in document order, replaced where updated.
    let mut grouped: HashMap<Priority, Vec<String>> = HashMap::new();
    for task in tasks.iter().filter(|t| !t.archived) {
        let (priority, block) = match replacements.get(&task.title) {
            Some(block) => {
                let parsed = parse_priority_of_block(block);
                (parsed, block.clone())
            }
            None => (
                task.priority_enum().unwrap_or(Priority::Medium),
                task.raw_block.clone(),
            ),
        };
        grouped.entry(priority).or_default().push(block);
    }
    for (priority, block) in appended {
        grouped.entry(*priority).or_default().push(block.clone());
    }

    for priority in Priority::ALL {
        out.push(format!("## {} Priority Tasks", priority.as_str()));
        out.push(String::new());
        if let Some(blocks) = grouped.get(&priority) {
            for block in blocks {
                out.extend(block.trim_end().lines().map(|l| l.to_string()));
                out.push(String::new());
            }
        }
        out.push(String::new());
    }

    out.push("## Archive".to_string());
    out.push(String::new());
    out.push("*Completed tasks are moved here for historical reference.*".to_string());
    out.push(String::new());
    for task in tasks.iter().filter(|t| t.archived) {
        out.extend(task.raw_block.trim_end().lines().map(|l| l.to_string()));
        out.push(String::new());
    }

    // Preserve everything after the second separator.
    let second_sep = first_sep.and_then(|first| {
        lines[first + 1..]
            .iter()
            .position(|l| is_separator(l))
            .map(|offset| first + 1 + offset)
    });
    out.push(separator());
    if let Some(idx) = second_sep {
        out.extend(lines[idx + 1..].iter().map(|l| l.to_string()));
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}

/// Read the priority out of a rendered block.
fn parse_priority_of_block(block: &str) -> Priority {
    block
        .lines()
        .find_map(|line| line.trim().strip_prefix("- **Priority**: "))
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(Priority::Medium)
}

/// Format a timestamp in the ledger's strict ISO-8601 shape.
fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap()
    }

    fn doc_with(blocks: &str) -> String {
        format!(
            "# Task List\n\nIntro prose.\n\n{}\n\n## Critical Priority Tasks\n\n{}\n\n## Archive\n\n*Completed tasks are moved here for historical reference.*\n\n{}\n",
            separator(),
            blocks.trim_end(),
            separator(),
        )
    }

    const OPEN_RECORD: &str = "\
- [ ] **Fix failing tests in tests/test_x.py**:
  - **ID**: 4
  - **Description**: Fix 2 failing tests in tests/test_x.py
  - **Pre-requisites**:
    - None
  - **Priority**: Critical
  - **Estimated Time**: 30 minutes
  - **Assignee**: Roo
  - **Create Date**: 2026-01-05T10:00:00Z
  - **Start Date**: 2026-01-05T10:00:00Z
  - **Finish Date**: None
  - **Subtasks**:
    - [ ] Fix test_foo
    - [x] Fix test_bar
";

    // ------------------------------------------------------------------
    // TestRun parsing
    // ------------------------------------------------------------------

    #[test]
    fn test_parse_run_groups_by_file() {
        let run = TestRun::parse(
            "tests/a.py::test_one PASSED\ntests/b.py::test_two FAILED\ntests/a.py::test_three FAILED\n",
        );
        assert_eq!(run.files().len(), 2);
        assert_eq!(run.files()[0].file_path, "tests/a.py");
        assert_eq!(run.files()[0].tests().len(), 2);
        assert!(run.files()[0].has_failures());
    }

    #[test]
    fn test_parse_run_ignores_noise() {
        let run = TestRun::parse("collecting...\ntests/a.py::test_one PASSED\n== 1 passed ==\n");
        assert_eq!(run.files().len(), 1);
        assert!(!run.files()[0].has_failures());
    }

    #[test]
    fn test_parse_run_last_wins() {
        let run = TestRun::parse(
            "tests/a.py::flaky FAILED\ntests/a.py::flaky PASSED\n",
        );
        assert_eq!(
            run.files()[0].status_of("flaky"),
            Some(TestStatus::Passed)
        );
        assert_eq!(run.files()[0].tests().len(), 1);
    }

    // ------------------------------------------------------------------
    // Classification
    // ------------------------------------------------------------------

    #[test]
    fn test_classification_scenario() {
        let document = doc_with(OPEN_RECORD);
        let run = TestRun::parse(
            "tests/test_x.py::test_foo PASSED\n\
             tests/test_x.py::test_bar PASSED\n\
             tests/test_x.py::test_baz FAILED\n",
        );

        let outcome = Reconciler::default().reconcile_at(&document, &run, fixed_now());

        assert_eq!(outcome.report.newly_fixed, vec!["tests/test_x.py::test_foo"]);
        assert_eq!(outcome.report.newly_broken, vec!["tests/test_x.py::test_baz"]);
        assert!(outcome.report.still_failing.is_empty());
        assert!(outcome.changed);

        let updated = parse_tasks(&outcome.new_document);
        let record = updated
            .iter()
            .find(|t| t.title == "Fix failing tests in tests/test_x.py")
            .unwrap();
        assert!(!record.checked);
        assert_eq!(record.id, Some(4));
        let states: Vec<(String, bool)> = record
            .subtasks
            .iter()
            .map(|st| (st.name.clone(), st.completed))
            .collect();
        assert_eq!(
            states,
            vec![
                ("Fix test_foo".to_string(), true),
                ("Fix test_bar".to_string(), true),
                ("Fix test_baz".to_string(), false),
            ]
        );
        // Dates survive the merge.
        assert_eq!(record.create_date.as_deref(), Some("2026-01-05T10:00:00Z"));
        assert_eq!(record.finish_date, None);
    }

    #[test]
    fn test_still_failing_classification() {
        let document = doc_with(OPEN_RECORD);
        let run = TestRun::parse("tests/test_x.py::test_foo FAILED\n");
        let outcome = Reconciler::default().reconcile_at(&document, &run, fixed_now());

        assert_eq!(outcome.report.still_failing, vec!["tests/test_x.py::test_foo"]);
        assert!(outcome.report.newly_broken.is_empty());
    }

    // ------------------------------------------------------------------
    // Merge behavior
    // ------------------------------------------------------------------

    #[test]
    fn test_healthy_file_with_no_history_produces_nothing() {
        let document = doc_with("");
        let run = TestRun::parse("tests/clean.py::test_ok PASSED\n");
        let outcome = Reconciler::default().reconcile_at(&document, &run, fixed_now());

        assert!(!outcome.changed);
        assert!(!outcome.new_document.contains("tests/clean.py"));
    }

    #[test]
    fn test_new_failures_allocate_monotonic_ids() {
        let document = doc_with(OPEN_RECORD);
        let run = TestRun::parse(
            "tests/new_a.py::test_one FAILED\ntests/new_b.py::test_two FAILED\n",
        );
        let outcome = Reconciler::default().reconcile_at(&document, &run, fixed_now());

        let updated = parse_tasks(&outcome.new_document);
        let a = updated
            .iter()
            .find(|t| t.title.ends_with("tests/new_a.py"))
            .unwrap();
        let b = updated
            .iter()
            .find(|t| t.title.ends_with("tests/new_b.py"))
            .unwrap();
        // Max existing ID is 4, so the two new files get 5 and 6 in
        // processing order.
        assert_eq!(a.id, Some(5));
        assert_eq!(b.id, Some(6));
        assert_eq!(a.create_date.as_deref(), Some("2026-02-01T12:00:00Z"));
        assert!(!a.checked);
        assert_eq!(a.subtasks.len(), 1);
        assert!(!a.subtasks[0].completed);
    }

    #[test]
    fn test_all_passing_checks_parent_and_stamps_finish() {
        let document = doc_with(OPEN_RECORD);
        let run = TestRun::parse(
            "tests/test_x.py::test_foo PASSED\ntests/test_x.py::test_bar PASSED\n",
        );
        let outcome = Reconciler::default().reconcile_at(&document, &run, fixed_now());

        let updated = parse_tasks(&outcome.new_document);
        let record = updated
            .iter()
            .find(|t| t.title.ends_with("tests/test_x.py"))
            .unwrap();
        assert!(record.checked);
        assert_eq!(record.finish_date.as_deref(), Some("2026-02-01T12:00:00Z"));
        assert!(record.subtasks.iter().all(|st| st.completed));
        assert!(outcome.changed);
    }

    #[test]
    fn test_vanished_subtask_treated_as_fixed() {
        let document = doc_with(OPEN_RECORD);
        // test_foo is neither passing nor failing in this run.
        let run = TestRun::parse("tests/test_x.py::test_bar PASSED\n");
        let outcome = Reconciler::default().reconcile_at(&document, &run, fixed_now());

        let updated = parse_tasks(&outcome.new_document);
        let record = updated
            .iter()
            .find(|t| t.title.ends_with("tests/test_x.py"))
            .unwrap();
        assert_eq!(record.subtask("Fix test_foo"), Some(true));
        assert!(record.checked);
        // Not reported as newly fixed: no PASSED evidence exists.
        assert!(outcome.report.newly_fixed.is_empty());
        assert!(outcome.changed);
    }

    #[test]
    fn test_still_failing_only_is_unchanged() {
        let document = doc_with(OPEN_RECORD);
        // test_foo still failing, test_bar still passing: nothing moves.
        let run = TestRun::parse(
            "tests/test_x.py::test_foo FAILED\ntests/test_x.py::test_bar PASSED\n",
        );
        let outcome = Reconciler::default().reconcile_at(&document, &run, fixed_now());
        assert!(!outcome.changed);
    }

    // ------------------------------------------------------------------
    // Document regeneration
    // ------------------------------------------------------------------

    #[test]
    fn test_preamble_and_trailer_preserved() {
        let document = format!(
            "# Task List\n\nHand-written intro.\n\n{}\n\n## Critical Priority Tasks\n\n{}\n{}\nHand-written footer.\n",
            separator(),
            OPEN_RECORD.trim_end(),
            separator(),
        );
        let run = TestRun::parse("tests/test_x.py::test_foo FAILED\n");
        let outcome = Reconciler::default().reconcile_at(&document, &run, fixed_now());

        assert!(outcome.new_document.starts_with("# Task List\n\nHand-written intro.\n"));
        assert!(outcome.new_document.trim_end().ends_with("Hand-written footer."));
        // All four sections plus the archive are always present.
        for section in [
            "## Critical Priority Tasks",
            "## High Priority Tasks",
            "## Medium Priority Tasks",
            "## Low Priority Tasks",
            "## Archive",
        ] {
            assert!(outcome.new_document.contains(section), "missing {section}");
        }
    }

    #[test]
    fn test_untouched_and_archived_records_survive() {
        let unrelated = "\
- [ ] **Refactor config loading**:
  - **ID**: 9
  - **Priority**: Medium
";
        let archived = "\
- [x] **Fix failing tests in tests/old.py**:
  - **ID**: 2
  - **Priority**: Critical
";
        let document = format!(
            "# Task List\n\n{}\n\n## Critical Priority Tasks\n\n{}\n\n## Medium Priority Tasks\n\n{}\n\n## Archive\n\n{}\n\n{}\n",
            separator(),
            OPEN_RECORD.trim_end(),
            unrelated.trim_end(),
            archived.trim_end(),
            separator(),
        );
        let run = TestRun::parse("tests/test_x.py::test_foo FAILED\n");
        let outcome = Reconciler::default().reconcile_at(&document, &run, fixed_now());

        let updated = parse_tasks(&outcome.new_document);
        let refactor = updated
            .iter()
            .find(|t| t.title == "Refactor config loading")
            .unwrap();
        assert!(!refactor.archived);
        let old = updated
            .iter()
            .find(|t| t.title.ends_with("tests/old.py"))
            .unwrap();
        assert!(old.archived);
        // The untouched block sits in its own priority section.
        let medium_idx = outcome.new_document.find("## Medium Priority Tasks").unwrap();
        let refactor_idx = outcome.new_document.find("**Refactor config loading**").unwrap();
        let low_idx = outcome.new_document.find("## Low Priority Tasks").unwrap();
        assert!(medium_idx < refactor_idx && refactor_idx < low_idx);
    }

    #[test]
    fn test_idempotent_reconciliation() {
        let document = doc_with(OPEN_RECORD);
        let run = TestRun::parse(
            "tests/test_x.py::test_foo PASSED\n\
             tests/test_x.py::test_bar PASSED\n\
             tests/test_x.py::test_baz FAILED\n",
        );

        let reconciler = Reconciler::default();
        let first = reconciler.reconcile_at(&document, &run, fixed_now());
        assert!(first.changed);

        let second = reconciler.reconcile_at(&first.new_document, &run, fixed_now());
        assert!(!second.changed);
        assert_eq!(second.new_document, first.new_document);
        // Already-recorded states classify quietly the second time.
        assert!(second.report.newly_fixed.is_empty());
        assert!(second.report.newly_broken.is_empty());
        assert_eq!(
            second.report.still_failing,
            vec!["tests/test_x.py::test_baz"]
        );
    }

    #[test]
    fn test_document_without_separator_gains_structure() {
        let document = "# Fresh Ledger\n\nNothing here yet.\n";
        let run = TestRun::parse("tests/a.py::test_one FAILED\n");
        let outcome = Reconciler::default().reconcile_at(document, &run, fixed_now());

        assert!(outcome.changed);
        assert!(outcome.new_document.starts_with("# Fresh Ledger\n\nNothing here yet.\n"));
        assert!(outcome.new_document.contains("## Critical Priority Tasks"));
        assert!(outcome.new_document.contains("Fix failing tests in tests/a.py"));

        // The grown document reconciles idempotently afterwards.
        let again = Reconciler::default().reconcile_at(&outcome.new_document, &run, fixed_now());
        assert!(!again.changed);
        assert_eq!(again.new_document, outcome.new_document);
    }

    #[test]
    fn test_config_assignee_applied_to_new_records() {
        let document = doc_with("");
        let run = TestRun::parse("tests/a.py::test_one FAILED\n");
        let reconciler =
            Reconciler::new(ReconcilerConfig::new().with_assignee("Dana"));
        let outcome = reconciler.reconcile_at(&document, &run, fixed_now());

        let updated = parse_tasks(&outcome.new_document);
        assert_eq!(updated[0].assignee.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_fix_title_round_trip() {
        let title = fix_task_title("tests/test_x.py");
        assert_eq!(title, "Fix failing tests in tests/test_x.py");
        assert_eq!(fix_task_path(&title), Some("tests/test_x.py"));
        assert_eq!(fix_task_path("Unrelated title"), None);
    }
}

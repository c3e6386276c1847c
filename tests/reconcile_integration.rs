//! End-to-end reconciliation scenarios against realistic ledger documents.

use chrono::{TimeZone, Utc};
use tasksmith::ledger::parser::parse_tasks;
use tasksmith::reconcile::{Reconciler, TestRun};
use tasksmith::validate::validate_task_set;
use tasksmith::{render_task, Priority, Task};

fn separator() -> String {
    format!("---{}", "-".repeat(90))
}

fn ledger_with(blocks: &str) -> String {
    format!(
        "# Project Task List\n\nSee the contributor guide for conventions.\n\n{}\n\n\
         ## Critical Priority Tasks\n\n{}\n\n\
         ## High Priority Tasks\n\n\
         ## Medium Priority Tasks\n\n\
         ## Low Priority Tasks\n\n\
         ## Archive\n\n*Completed tasks are moved here for historical reference.*\n\n{}\n",
        separator(),
        blocks.trim_end(),
        separator(),
    )
}

const OPEN_RECORD: &str = "\
- [ ] **Fix failing tests in tests/test_x.py**:
  - **ID**: 7
  - **Description**: Fix 1 failing test in tests/test_x.py
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

#[test]
fn full_reconcile_cycle_updates_ledger_and_classifies() {
    let document = ledger_with(OPEN_RECORD);
    let run = TestRun::parse(
        "tests/test_x.py::test_foo PASSED\n\
         tests/test_x.py::test_bar PASSED\n\
         tests/test_x.py::test_baz FAILED\n\
         tests/test_y.py::test_new FAILED\n",
    );
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();

    let outcome = Reconciler::default().reconcile_at(&document, &run, now);

    assert_eq!(outcome.report.newly_fixed, vec!["tests/test_x.py::test_foo"]);
    assert_eq!(
        outcome.report.newly_broken,
        vec!["tests/test_x.py::test_baz", "tests/test_y.py::test_new"]
    );
    assert!(outcome.report.still_failing.is_empty());

    let tasks = parse_tasks(&outcome.new_document);

    // The existing record kept its identity and gained the new failure.
    let x = tasks
        .iter()
        .find(|t| t.title == "Fix failing tests in tests/test_x.py")
        .expect("record for test_x.py");
    assert_eq!(x.id, Some(7));
    assert_eq!(x.create_date.as_deref(), Some("2026-01-05T10:00:00Z"));
    assert!(!x.checked);
    let names: Vec<&str> = x.subtasks.iter().map(|st| st.name.as_str()).collect();
    assert_eq!(names, vec!["Fix test_foo", "Fix test_bar", "Fix test_baz"]);
    assert!(x.subtasks[0].completed && x.subtasks[1].completed);
    assert!(!x.subtasks[2].completed);

    // The brand-new record allocated the next free ID ledger-wide.
    let y = tasks
        .iter()
        .find(|t| t.title == "Fix failing tests in tests/test_y.py")
        .expect("record for test_y.py");
    assert_eq!(y.id, Some(8));
    assert_eq!(y.create_date.as_deref(), Some("2026-03-01T09:30:00Z"));

    // The regenerated document still validates cleanly.
    let active: Vec<&Task> = tasks.iter().filter(|t| !t.archived).collect();
    assert!(validate_task_set(&active).is_valid());
}

#[test]
fn reconcile_is_idempotent_across_full_documents() {
    let document = ledger_with(OPEN_RECORD);
    let run = TestRun::parse(
        "tests/test_x.py::test_foo FAILED\n\
         tests/test_x.py::test_bar PASSED\n\
         tests/test_z.py::test_one FAILED\n",
    );
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    let reconciler = Reconciler::default();

    let first = reconciler.reconcile_at(&document, &run, now);
    assert!(first.changed);

    let second = reconciler.reconcile_at(&first.new_document, &run, now);
    assert!(!second.changed);
    assert_eq!(second.new_document, first.new_document);

    let third = reconciler.reconcile_at(&second.new_document, &run, now);
    assert_eq!(third.new_document, first.new_document);
}

#[test]
fn archived_and_handwritten_records_survive_regeneration() {
    let handwritten = "\
- [ ] **Design the storage layer**:
  - **ID**: 2
  - **Priority**: Medium
";
    let archived = "\
- [x] **Fix failing tests in tests/test_old.py**:
  - **ID**: 1
  - **Priority**: Critical
  - **Finish Date**: 2025-12-01T08:00:00Z
";
    let document = format!(
        "# Project Task List\n\n{}\n\n\
         ## Critical Priority Tasks\n\n{}\n\n\
         ## Medium Priority Tasks\n\n{}\n\n\
         ## Archive\n\n{}\n\n{}\n",
        separator(),
        OPEN_RECORD.trim_end(),
        handwritten.trim_end(),
        archived.trim_end(),
        separator(),
    );

    let run = TestRun::parse("tests/test_x.py::test_foo PASSED\n");
    let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
    let outcome = Reconciler::default().reconcile_at(&document, &run, now);

    let tasks = parse_tasks(&outcome.new_document);
    assert!(tasks.iter().any(|t| t.title == "Design the storage layer"));
    let old = tasks
        .iter()
        .find(|t| t.title == "Fix failing tests in tests/test_old.py")
        .unwrap();
    assert!(old.archived);
    assert_eq!(old.finish_date.as_deref(), Some("2025-12-01T08:00:00Z"));
}

#[test]
fn round_trip_survives_a_reconciled_document() {
    // Render an arbitrary valid task, push it through a document cycle,
    // and confirm parsing recovers it field-for-field.
    let mut task = Task::new("Fix failing tests in tests/test_q.py")
        .with_id(3)
        .with_priority(Priority::High);
    task.description = Some("Fix 1 failing test in tests/test_q.py".to_string());
    task.estimated_time = Some("2 hours".to_string());
    task.assignee = Some("Dana".to_string());
    task.create_date = Some("2026-01-01T00:00:00Z".to_string());
    task.start_date = Some("2026-01-02T00:00:00Z".to_string());
    task.prerequisites = vec!["Design the storage layer".to_string()];
    task.set_subtask("Fix test_q", false);

    let document = ledger_with(&render_task(&task));
    let parsed = parse_tasks(&document);
    let recovered = parsed
        .iter()
        .find(|t| t.title == task.title)
        .expect("task recovered from document");

    assert_eq!(recovered.id, task.id);
    assert_eq!(recovered.checked, task.checked);
    assert_eq!(recovered.description, task.description);
    assert_eq!(recovered.priority, task.priority);
    assert_eq!(recovered.estimated_time, task.estimated_time);
    assert_eq!(recovered.assignee, task.assignee);
    assert_eq!(recovered.create_date, task.create_date);
    assert_eq!(recovered.start_date, task.start_date);
    assert_eq!(recovered.finish_date, task.finish_date);
    assert_eq!(recovered.prerequisites, task.prerequisites);
    assert_eq!(recovered.subtasks, task.subtasks);
}

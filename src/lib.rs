//! tasksmith - Task Ledger Automation
//!
//! A Rust toolkit for keeping a human-and-machine-editable task ledger
//! consistent: parsing task records out of markdown, validating schema and
//! prerequisite-graph invariants, and reconciling test-run results into the
//! ledger deterministically.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`ledger`] - Task data model, markdown parser/renderer, YAML bucket form
//! - [`validate`] - Schema and dependency-graph validation
//! - [`reconcile`] - Test-result classification and ledger merging
//! - [`runner`] - Test-suite subprocess invocation
//! - [`git`] / [`backup`] / [`changelog`] - Thin collaborators around writes
//! - [`error`] - Custom error types and exit codes
//!
//! # Example
//!
//! ```rust
//! use tasksmith::reconcile::{Reconciler, TestRun};
//!
//! let ledger = "# Task List\n";
//! let run = TestRun::parse("tests/api.rs::test_login FAILED\n");
//!
//! let outcome = Reconciler::default().reconcile(ledger, &run);
//! assert!(outcome.changed);
//! assert_eq!(outcome.report.newly_broken, vec!["tests/api.rs::test_login"]);
//! ```

pub mod backup;
pub mod changelog;
pub mod error;
pub mod git;
pub mod ledger;
pub mod reconcile;
pub mod report;
pub mod runner;
pub mod validate;

// Re-export commonly used types
pub use error::{ExitCode, LedgerError, Result};

// Re-export ledger types
pub use ledger::{
    parser::parse_tasks, render::render_task, LedgerSummary, Priority, Subtask, Task, TaskFilter,
    TaskLedger, TaskStatus,
};

// Re-export validation types
pub use validate::{validate_ledger, validate_task, validate_task_set, ValidationReport};

// Re-export reconcile types
pub use reconcile::{
    classify, fix_task_title, ReconcileOutcome, ReconcileReport, Reconciler, ReconcilerConfig,
    TestRun, TestStatus,
};

// Re-export collaborator types
pub use backup::BackupManager;
pub use changelog::ChangeEntryBuilder;
pub use git::GitInfo;
pub use runner::{TestRunner, TestRunOutput, DEFAULT_TEST_COMMAND};

//! Test-suite subprocess invocation.
//!
//! Thin plumbing around the core: builds the test command, runs it once
//! per top-level invocation, and hands the combined output to the
//! reconciler. Never interleaved with core computation.

use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

use crate::error::{LedgerError, Result};

/// Default test command: verbose mode, so individual results appear as
/// `path::test PASSED|FAILED` lines.
pub const DEFAULT_TEST_COMMAND: &str = "pytest -v";

/// Output of a completed test run.
#[derive(Debug, Clone)]
pub struct TestRunOutput {
    /// Process exit code (-1 if terminated by signal).
    pub exit_code: i32,
    /// Combined stdout and stderr.
    pub output: String,
}

impl TestRunOutput {
    /// Whether the suite itself reported success.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs the configured test command.
#[derive(Debug, Clone)]
pub struct TestRunner {
    command: String,
    working_dir: PathBuf,
}

impl TestRunner {
    /// Create a runner for the given shell command and working directory.
    #[must_use]
    pub fn new(command: impl Into<String>, working_dir: impl AsRef<Path>) -> Self {
        Self {
            command: command.into(),
            working_dir: working_dir.as_ref().to_path_buf(),
        }
    }

    /// The shell command this runner executes.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Check that the command's program exists on PATH.
    pub fn check_available(&self) -> Result<()> {
        let program = self
            .command
            .split_whitespace()
            .next()
            .unwrap_or(&self.command);
        which::which(program).map_err(|_| LedgerError::MissingTestCommand {
            command: program.to_string(),
        })?;
        Ok(())
    }

    /// Run the test command and capture combined output.
    ///
    /// A non-zero exit code is not an error here: failing tests are exactly
    /// what reconciliation consumes. Only failure to launch the process is.
    pub fn run(&self) -> Result<TestRunOutput> {
        info!(command = %self.command, "running test suite");

        let output = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .current_dir(&self.working_dir)
            .output()
            .map_err(|e| LedgerError::RunnerSpawn {
                command: self.command.clone(),
                message: e.to_string(),
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        let exit_code = output.status.code().unwrap_or(-1);
        debug!(exit_code, bytes = combined.len(), "test suite finished");

        Ok(TestRunOutput {
            exit_code,
            output: combined,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

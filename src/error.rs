//! Custom error types for tasksmith.
//!
//! This module provides structured error types that enable better
//! error handling, reporting, and recovery throughout the application.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for tasksmith operations
#[derive(Error, Debug)]
pub enum LedgerError {
    // =========================================================================
    // Ledger File Errors
    // =========================================================================
    /// Ledger file missing
    #[error("Ledger file not found: {path}")]
    MissingLedger { path: PathBuf },

    /// Ledger file could not be read
    #[error("Cannot read ledger file {path}: {message}")]
    UnreadableLedger { path: PathBuf, message: String },

    /// Ledger content could not be parsed into the structured form
    #[error("Ledger parse error: {message}")]
    LedgerParse { message: String },

    // =========================================================================
    // Validation Errors
    // =========================================================================
    /// Validation produced hard errors that block the write
    #[error("Validation failed with {} error(s)", errors.len())]
    Validation { errors: Vec<String> },

    /// A task lookup by ID found nothing
    #[error("No task found with ID: {id}")]
    TaskNotFound { id: u32 },

    // =========================================================================
    // Runner Errors
    // =========================================================================
    /// Test command binary is not installed
    #[error("Test command not found: {command}")]
    MissingTestCommand { command: String },

    /// Test command could not be spawned
    #[error("Failed to run test command '{command}': {message}")]
    RunnerSpawn { command: String, message: String },

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    /// Git operation failed
    #[error("Git operation failed: {operation} - {message}")]
    Git { operation: String, message: String },

    /// Backup operation failed
    #[error("Backup error: {message}")]
    Backup { message: String },

    /// Restore failed
    #[error("Failed to restore from backup: {path}")]
    RestoreFailed { path: PathBuf },

    /// Changelog entry generation failed
    #[error("Changelog entry error: {message}")]
    Changelog { message: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// YAML error wrapper
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LedgerError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a validation error from a list of messages
    pub fn validation(errors: Vec<String>) -> Self {
        Self::Validation { errors }
    }

    /// Create a ledger parse error
    pub fn ledger_parse(message: impl Into<String>) -> Self {
        Self::LedgerParse {
            message: message.into(),
        }
    }

    /// Create a git error
    pub fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Git {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a backup error
    pub fn backup(message: impl Into<String>) -> Self {
        Self::Backup {
            message: message.into(),
        }
    }

    /// Create a changelog error
    pub fn changelog(message: impl Into<String>) -> Self {
        Self::Changelog {
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error means the existing ledger must not be overwritten
    pub fn is_fatal_for_write(&self) -> bool {
        matches!(
            self,
            Self::MissingLedger { .. }
                | Self::UnreadableLedger { .. }
                | Self::LedgerParse { .. }
                | Self::Validation { .. }
        )
    }

    /// Check if this error is a validation problem rather than a system one
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. } | Self::LedgerParse { .. } | Self::TaskNotFound { .. }
        )
    }

    /// Get error code for exit status.
    ///
    /// Follows the standardized codes used by every subcommand:
    /// 0 success, 1 no work, 2 validation error, 3 system error, 4 user abort.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation { .. } | Self::LedgerParse { .. } | Self::TaskNotFound { .. } => 2,
            _ => 3,
        }
    }
}

/// Type alias for tasksmith results
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Standardized exit codes for all subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Operation completed successfully
    Success = 0,
    /// No work needed (e.g., all tests passing, nothing to update)
    NoWork = 1,
    /// Validation failed (bad data, missing requirements)
    ValidationError = 2,
    /// System error (file I/O, git, subprocess)
    SystemError = 3,
    /// User aborted operation
    UserAbort = 4,
}

impl ExitCode {
    /// Get the numeric process exit code.
    #[must_use]
    pub fn code(self) -> i32 {
        self as i32
    }
}

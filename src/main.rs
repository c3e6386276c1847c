//! tasksmith - Task Ledger Automation
//!
//! Runs the test suite, reconciles results into the task ledger, and keeps
//! the ledger valid. Report-only by default; nothing is written without
//! `--update`.

use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;
use std::process::exit;

use tasksmith::backup::BackupManager;
use tasksmith::changelog::ChangeEntryBuilder;
use tasksmith::error::{ExitCode, LedgerError};
use tasksmith::ledger::{parser, yaml, Priority, Task, TaskStatus};
use tasksmith::reconcile::{Reconciler, ReconcilerConfig, TestRun};
use tasksmith::report;
use tasksmith::runner::{TestRunner, DEFAULT_TEST_COMMAND};
use tasksmith::validate::{validate_ledger, validate_task, validate_task_set};
use tasksmith::{git, ReconcileOutcome};

#[derive(Parser)]
#[command(name = "tasksmith")]
#[command(version = "0.1.0")]
#[command(about = "Task ledger automation - reconcile test results into a task ledger", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress extra output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the test suite and reconcile results into the markdown ledger
    Run {
        /// Actually update the ledger (default: report-only mode)
        #[arg(long)]
        update: bool,

        /// Test command to run
        #[arg(long, default_value = DEFAULT_TEST_COMMAND)]
        command: String,

        /// Markdown ledger file (defaults to docs/TASKS.md in the project)
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Assignee stamped on records the reconciler touches
        #[arg(long, default_value = "Roo")]
        assignee: String,

        /// Reconcile pre-captured runner output from a file instead of
        /// running the test command ("-" reads stdin)
        #[arg(long, value_name = "FILE")]
        from_output: Option<PathBuf>,
    },

    /// Validate a ledger file (markdown or YAML, by extension)
    Validate {
        /// Ledger file (defaults to docs/TASKS.md in the project)
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Also validate archived tasks
        #[arg(long)]
        include_archived: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a task to the YAML ledger
    Add {
        /// Task title
        #[arg(long)]
        title: String,

        /// Priority: Critical, High, Medium, or Low
        #[arg(long, default_value = "Medium")]
        priority: String,

        /// Task description
        #[arg(long)]
        description: Option<String>,

        /// Assignee
        #[arg(long)]
        assignee: Option<String>,

        /// Estimated time (e.g. "30 minutes")
        #[arg(long)]
        estimated_time: Option<String>,

        /// Prerequisite task title (repeatable)
        #[arg(long = "prereq")]
        prerequisites: Vec<String>,

        /// YAML ledger file (defaults to docs/tasks.yaml in the project)
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Update a task's status in the YAML ledger
    Status {
        /// ID of the task to update
        id: u32,

        /// New status: pending, in_progress, completed, blocked, or cancelled
        status: String,

        /// YAML ledger file (defaults to docs/tasks.yaml in the project)
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Archive a task in the YAML ledger by ID
    Archive {
        /// ID of the task to archive
        id: u32,

        /// YAML ledger file (defaults to docs/tasks.yaml in the project)
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Show summary statistics for the YAML ledger
    Summary {
        /// YAML ledger file (defaults to docs/tasks.yaml in the project)
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a changelog entry file
    ChangeEntry {
        /// Change title
        #[arg(long)]
        title: String,

        /// Markdown ledger to pull the first open task from
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Manage ledger backups
    Backup {
        #[command(subcommand)]
        action: BackupAction,
    },
}

#[derive(Subcommand)]
enum BackupAction {
    /// Snapshot the ledger now
    Create {
        /// Ledger file (defaults to docs/TASKS.md in the project)
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// List existing backups, oldest first
    List,

    /// Restore the ledger from a backup file
    Restore {
        /// Path to the backup file
        path: PathBuf,

        /// Ledger file to restore over (defaults to docs/TASKS.md)
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Delete old backups, keeping the newest N
    Prune {
        /// Number of backups to keep
        #[arg(long, default_value = "10")]
        keep: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "tasksmith=debug,info"
    } else {
        "tasksmith=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let project = cli.project.canonicalize().unwrap_or(cli.project.clone());
    if !project.exists() {
        eprintln!(
            "{} Project directory does not exist: {}",
            "Error:".red().bold(),
            project.display()
        );
        exit(ExitCode::SystemError.code());
    }

    let code = match dispatch(&cli, &project) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let LedgerError::Validation { errors } = &e {
                for error in errors {
                    eprintln!("  - {error}");
                }
            }
            e.exit_code()
        }
    };
    exit(code);
}

fn dispatch(cli: &Cli, project: &PathBuf) -> tasksmith::Result<i32> {
    let markdown_default = project.join("docs").join("TASKS.md");
    let yaml_default = project.join("docs").join("tasks.yaml");
    let backup_dir = project.join(".task_backups");

    match &cli.command {
        Commands::Run {
            update,
            command,
            ledger,
            assignee,
            from_output,
        } => {
            let ledger_path = ledger.clone().unwrap_or(markdown_default);

            let (suite_exit, output) = match from_output {
                Some(path) if path.as_os_str() == "-" => {
                    let mut buffer = String::new();
                    std::io::Read::read_to_string(&mut std::io::stdin(), &mut buffer)?;
                    (0, buffer)
                }
                Some(path) => (0, fs::read_to_string(path)?),
                None => {
                    let runner = TestRunner::new(command.as_str(), project);
                    runner.check_available()?;
                    if !cli.quiet {
                        println!("Running: {command}");
                    }
                    let result = runner.run()?;
                    (result.exit_code, result.output)
                }
            };

            let run = TestRun::parse(&output);

            let document = if ledger_path.exists() {
                fs::read_to_string(&ledger_path).map_err(|e| LedgerError::UnreadableLedger {
                    path: ledger_path.clone(),
                    message: e.to_string(),
                })?
            } else {
                "# Task List\n\n## Tasks\n".to_string()
            };

            let reconciler =
                Reconciler::new(ReconcilerConfig::new().with_assignee(assignee.clone()));
            let outcome = reconciler.reconcile(&document, &run);

            if !cli.quiet {
                report::print_reconcile_report(&outcome.report);
            }

            if *update && outcome.changed {
                write_reconciled(&outcome, &ledger_path, &backup_dir, project, cli.quiet)?;
            }
            if !cli.quiet {
                report::print_write_status(&ledger_path, outcome.changed, *update);
            }

            // Mirror the suite's exit code so CI pipelines see test failures.
            Ok(suite_exit)
        }

        Commands::Validate {
            ledger,
            include_archived,
            json,
        } => {
            let ledger_path = ledger.clone().unwrap_or(markdown_default);
            let is_yaml = ledger_path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

            let validation = if is_yaml {
                let ledger = yaml::load_ledger(&ledger_path)?;
                validate_ledger(&ledger, *include_archived)
            } else {
                if !ledger_path.exists() {
                    return Err(LedgerError::MissingLedger { path: ledger_path });
                }
                let content =
                    fs::read_to_string(&ledger_path).map_err(|e| LedgerError::UnreadableLedger {
                        path: ledger_path.clone(),
                        message: e.to_string(),
                    })?;
                let tasks = parser::parse_tasks(&content);
                let selected: Vec<&Task> = tasks
                    .iter()
                    .filter(|t| *include_archived || !t.archived)
                    .collect();
                validate_task_set(&selected)
            };

            if *json {
                println!(
                    "{}",
                    serde_json::json!({
                        "is_valid": validation.is_valid(),
                        "errors": validation.errors,
                        "warnings": validation.warnings,
                    })
                );
            } else {
                report::print_validation_report(&validation);
            }

            Ok(if validation.is_valid() {
                ExitCode::Success.code()
            } else {
                ExitCode::ValidationError.code()
            })
        }

        Commands::Add {
            title,
            priority,
            description,
            assignee,
            estimated_time,
            prerequisites,
            ledger,
        } => {
            let ledger_path = ledger.clone().unwrap_or(yaml_default);
            let mut task_list = if ledger_path.exists() {
                yaml::load_ledger(&ledger_path)?
            } else {
                tasksmith::TaskLedger::new()
            };

            let priority: Priority = priority
                .parse()
                .map_err(|e: String| LedgerError::validation(vec![e]))?;

            let mut task = Task::new(title.clone())
                .with_id(task_list.next_task_id())
                .with_priority(priority);
            task.status = Some(TaskStatus::Pending);
            task.description = description.clone();
            task.assignee = assignee.clone();
            task.estimated_time = estimated_time.clone();
            task.create_date = Some(Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string());
            task.prerequisites = prerequisites.clone();

            let validation = validate_task(&task);
            if !validation.is_valid() {
                return Err(LedgerError::validation(validation.errors));
            }

            task_list.add_task(task);
            backup_if_exists(&ledger_path, &backup_dir)?;
            yaml::save_ledger(&task_list, &ledger_path)?;

            if !cli.quiet {
                println!("{} Added task: {}", "✓".green().bold(), title);
            }
            Ok(ExitCode::Success.code())
        }

        Commands::Status { id, status, ledger } => {
            let ledger_path = ledger.clone().unwrap_or(yaml_default);
            let mut task_list = yaml::load_ledger(&ledger_path)?;

            let status: TaskStatus = status
                .parse()
                .map_err(|e: String| LedgerError::validation(vec![e]))?;
            if !task_list.update_status(*id, status) {
                return Err(LedgerError::TaskNotFound { id: *id });
            }

            backup_if_exists(&ledger_path, &backup_dir)?;
            yaml::save_ledger(&task_list, &ledger_path)?;

            if !cli.quiet {
                println!("{} Task {id} is now {status}", "✓".green().bold());
            }
            Ok(ExitCode::Success.code())
        }

        Commands::Archive { id, ledger } => {
            let ledger_path = ledger.clone().unwrap_or(yaml_default);
            let mut task_list = yaml::load_ledger(&ledger_path)?;

            let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
            if !task_list.archive_task(*id, &now) {
                return Err(LedgerError::TaskNotFound { id: *id });
            }

            backup_if_exists(&ledger_path, &backup_dir)?;
            yaml::save_ledger(&task_list, &ledger_path)?;

            if !cli.quiet {
                println!("{} Archived task {id}", "✓".green().bold());
            }
            Ok(ExitCode::Success.code())
        }

        Commands::Summary { ledger, json } => {
            let ledger_path = ledger.clone().unwrap_or(yaml_default);
            let task_list = yaml::load_ledger(&ledger_path)?;
            let summary = task_list.summary();

            if *json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Total tasks:     {}", summary.total_tasks);
                println!("Archived tasks:  {}", summary.archived_tasks);
                println!("Completion rate: {:.2}%", summary.completion_rate);
                for priority in Priority::ALL {
                    let count = summary.priority_counts.get(priority.as_str()).unwrap_or(&0);
                    println!("  {:<8} {}", format!("{priority}:"), count);
                }
            }
            Ok(ExitCode::Success.code())
        }

        Commands::ChangeEntry { title, ledger } => {
            let ledger_path = ledger.clone().unwrap_or(markdown_default);
            let builder = ChangeEntryBuilder::new(project, &ledger_path);
            let path = builder.write(title, Utc::now())?;
            if !cli.quiet {
                println!("{} Changelog entry: {}", "✓".green().bold(), path.display());
            }
            Ok(ExitCode::Success.code())
        }

        Commands::Backup { action } => {
            match action {
                BackupAction::Create { ledger } => {
                    let ledger_path = ledger.clone().unwrap_or(markdown_default);
                    let manager = BackupManager::new(&ledger_path, &backup_dir);
                    let backup = manager.snapshot(None)?;
                    println!("{} Backup created: {}", "✓".green().bold(), backup.display());
                }
                BackupAction::List => {
                    let manager = BackupManager::new(&markdown_default, &backup_dir);
                    let backups = manager.list()?;
                    if backups.is_empty() {
                        println!("No backups found");
                    }
                    for backup in backups {
                        println!("{}", backup.display());
                    }
                }
                BackupAction::Restore { path, ledger } => {
                    let ledger_path = ledger.clone().unwrap_or(markdown_default);
                    let manager = BackupManager::new(&ledger_path, &backup_dir);
                    manager.restore(path)?;
                    println!("{} Restored from {}", "✓".green().bold(), path.display());
                }
                BackupAction::Prune { keep } => {
                    let manager = BackupManager::new(&markdown_default, &backup_dir);
                    let removed = manager.prune(*keep)?;
                    println!("Removed {removed} backup(s), kept at most {keep}");
                }
            }
            Ok(ExitCode::Success.code())
        }
    }
}

/// Validate, back up, and atomically write the reconciled document.
fn write_reconciled(
    outcome: &ReconcileOutcome,
    ledger_path: &PathBuf,
    backup_dir: &PathBuf,
    project: &PathBuf,
    quiet: bool,
) -> tasksmith::Result<()> {
    // Hard validation errors block the save; warnings do not.
    let tasks = parser::parse_tasks(&outcome.new_document);
    let active: Vec<&Task> = tasks.iter().filter(|t| !t.archived).collect();
    let validation = validate_task_set(&active);
    if !validation.is_valid() {
        return Err(LedgerError::validation(validation.errors));
    }

    let info = git::get_git_info(project);
    if info.has_uncommitted && !quiet {
        println!(
            "{} Working directory has uncommitted changes",
            "⚠".yellow().bold()
        );
    }

    backup_if_exists(ledger_path, backup_dir)?;

    if let Some(parent) = ledger_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let tmp = ledger_path.with_extension("md.tmp");
    fs::write(&tmp, &outcome.new_document)?;
    fs::rename(&tmp, ledger_path)?;
    tracing::debug!(
        hash = %parser::compute_ledger_hash(&outcome.new_document),
        "ledger written; structure hash recorded"
    );
    Ok(())
}

/// Snapshot the ledger before an overwrite, if it exists.
fn backup_if_exists(ledger_path: &PathBuf, backup_dir: &PathBuf) -> tasksmith::Result<()> {
    if ledger_path.exists() {
        BackupManager::new(ledger_path, backup_dir).snapshot(None)?;
    }
    Ok(())
}

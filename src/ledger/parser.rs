//! Markdown ledger parsing.
//!
//! This module recovers structured [`Task`] records from free-form ledger
//! markdown. Parsing never fails: malformed or missing fields degrade to
//! `None` and the validator judges the result afterwards.
//!
//! # Grammar
//!
//! A task block is a top-level checkbox bullet with a bold title, followed
//! by indented metadata lines, two of which open nested list scans:
//!
//! ```text
//! - [ ] **Fix failing tests in tests/api.rs**:
//!   - **ID**: 12
//!   - **Pre-requisites**:
//!     - None
//!   - **Priority**: Critical
//!   - **Subtasks**:
//!     - [ ] Fix test_login
//! ```
//!
//! The scan is a single forward pass over lines with an explicit state
//! machine (`Scanning -> InTaskBody -> {InPrerequisites | InSubtasks}`),
//! using one line of lookahead to detect block boundaries. No line index
//! ever moves backwards.

use regex::Regex;
use std::sync::LazyLock;

use super::{Subtask, Task};

// ============================================================================
// Patterns
// ============================================================================

/// Top-level task header: `- [x] **Title**:`.
static TASK_HEADER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \[([ xX])\] \*\*(.+?)\*\*:").unwrap());

/// Indented metadata line: `- **Key**: value`.
static METADATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^- \*\*(.+?)\*\*:\s*(.*)$").unwrap());

/// Nested subtask line: `    - [x] name`.
static SUBTASK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^    - \[([ xX])\] (.+?)\s*$").unwrap());

/// Priority section header: `## Critical Priority Tasks`.
static PRIORITY_SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^## (.+) Priority Tasks?$").unwrap());

/// Archive section header.
static ARCHIVE_SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^## Archive\s*$").unwrap());

/// Task ID metadata anywhere in a document: `- **ID**: 12`.
static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"- \*\*ID\*\*: (\d+)").unwrap());

// ============================================================================
// Parser State Machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Between blocks, looking for the next task header.
    Scanning,
    /// Inside a task block, consuming metadata lines.
    InTaskBody,
    /// Inside the nested `Pre-requisites` list.
    InPrerequisites,
    /// Inside the nested `Subtasks` list.
    InSubtasks,
}

/// Task block under construction, with the raw span bookkeeping.
struct OpenBlock {
    task: Task,
    start: usize,
    last_content: usize,
}

/// Parse ledger markdown into an ordered list of tasks.
///
/// Tasks appear in document order; duplicate titles are kept (consumers
/// that need title keying apply last-wins). Tasks found after an
/// `## Archive` header carry `archived = true`.
///
/// # Example
///
/// ```
/// use tasksmith::ledger::parser::parse_tasks;
///
/// let text = "- [ ] **Write docs**:\n  - **ID**: 3\n  - **Priority**: Low\n";
/// let tasks = parse_tasks(text);
/// assert_eq!(tasks.len(), 1);
/// assert_eq!(tasks[0].title, "Write docs");
/// assert_eq!(tasks[0].id, Some(3));
/// ```
#[must_use]
pub fn parse_tasks(text: &str) -> Vec<Task> {
    let lines: Vec<&str> = text.lines().collect();
    let mut tasks: Vec<Task> = Vec::new();
    let mut state = ParseState::Scanning;
    let mut open: Option<OpenBlock> = None;
    let mut in_archive = false;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        match state {
            ParseState::Scanning => {
                if update_section(line, &mut in_archive) {
                    i += 1;
                    continue;
                }
                if let Some(block) = open_block(line, i, in_archive) {
                    open = Some(block);
                    state = ParseState::InTaskBody;
                }
                i += 1;
            }

            ParseState::InTaskBody => {
                // A new header closes the current block and opens the next.
                if let Some(block) = open_block(line, i, in_archive) {
                    finalize(&mut tasks, open.take(), &lines);
                    open = Some(block);
                    i += 1;
                    continue;
                }

                // Section headers and separators end the block; reprocess
                // them in Scanning so archive tracking stays correct.
                if line.starts_with("## ") || line.starts_with("---") {
                    finalize(&mut tasks, open.take(), &lines);
                    state = ParseState::Scanning;
                    continue;
                }

                // Blank line followed by a new top-level bullet ends the block.
                if line.trim().is_empty() {
                    if lines.get(i + 1).is_some_and(|next| next.starts_with("- [")) {
                        finalize(&mut tasks, open.take(), &lines);
                        state = ParseState::Scanning;
                    }
                    i += 1;
                    continue;
                }

                let block = open.as_mut().expect("InTaskBody requires an open block");
                block.last_content = i;

                if let Some(caps) = METADATA_RE.captures(line.trim()) {
                    let key = normalize_key(&caps[1]);
                    let value = caps[2].trim();

                    match key.as_str() {
                        "pre_requisites" | "prerequisites" => {
                            state = ParseState::InPrerequisites;
                        }
                        "subtasks" => {
                            state = ParseState::InSubtasks;
                        }
                        _ => apply_metadata(&mut block.task, &key, value),
                    }
                }
                // Unrecognized lines stay part of the raw block and are
                // otherwise ignored, for forward compatibility.
                i += 1;
            }

            ParseState::InPrerequisites => {
                if let Some(rest) = line.strip_prefix("    - ") {
                    let block = open.as_mut().expect("list scan requires an open block");
                    block.last_content = i;
                    let item = rest.trim();
                    // The reserved title "None" means "no prerequisites".
                    if !item.eq_ignore_ascii_case("none") && !item.is_empty() {
                        block.task.prerequisites.push(item.to_string());
                    }
                    i += 1;
                } else {
                    // Indentation dropped: hand the line back to the body scan.
                    state = ParseState::InTaskBody;
                }
            }

            ParseState::InSubtasks => {
                if let Some(caps) = SUBTASK_RE.captures(line) {
                    let block = open.as_mut().expect("list scan requires an open block");
                    block.last_content = i;
                    let checked = &caps[1] != " ";
                    let name = caps[2].to_string();
                    if !name.eq_ignore_ascii_case("none") {
                        block.task.subtasks.push(Subtask::new(name, checked));
                    }
                    i += 1;
                } else {
                    state = ParseState::InTaskBody;
                }
            }
        }
    }

    finalize(&mut tasks, open.take(), &lines);
    tasks
}

/// Scan a whole document for the largest task ID in use.
///
/// Covers every block, archived ones included, so newly allocated IDs are
/// unique ledger-wide.
#[must_use]
pub fn next_task_id(text: &str) -> u32 {
    ID_RE
        .captures_iter(text)
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
        .map_or(1, |max| max + 1)
}

/// Compute a hash of the ledger structure for change detection.
///
/// Only structural elements contribute: task titles and section headers.
/// Checkbox flips do not change the hash; adding, removing, or retitling
/// tasks does.
#[must_use]
pub fn compute_ledger_hash(content: &str) -> String {
    let structural: String = content
        .lines()
        .filter_map(|line| {
            if let Some(caps) = TASK_HEADER_RE.captures(line) {
                Some(caps[2].to_string())
            } else if line.starts_with("## ") {
                Some(line.to_string())
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("{:x}", md5::compute(structural.as_bytes()))
}

// ============================================================================
// Helpers
// ============================================================================

/// Track which document section the scan is in. Returns true if the line
/// was a section header.
fn update_section(line: &str, in_archive: &mut bool) -> bool {
    if ARCHIVE_SECTION_RE.is_match(line) {
        *in_archive = true;
        true
    } else if PRIORITY_SECTION_RE.is_match(line) {
        *in_archive = false;
        true
    } else {
        false
    }
}

/// Try to open a new task block from a header line.
fn open_block(line: &str, index: usize, in_archive: bool) -> Option<OpenBlock> {
    let caps = TASK_HEADER_RE.captures(line)?;
    let mut task = Task::new(caps[2].to_string());
    task.checked = &caps[1] != " ";
    // The parser's historical default; the validator owns judging it.
    task.priority = "Critical".to_string();
    task.archived = in_archive;
    Some(OpenBlock {
        task,
        start: index,
        last_content: index,
    })
}

/// Close a block: capture the raw span and push the task.
fn finalize(tasks: &mut Vec<Task>, open: Option<OpenBlock>, lines: &[&str]) {
    if let Some(block) = open {
        let mut task = block.task;
        task.raw_block = lines[block.start..=block.last_content].join("\n");
        tasks.push(task);
    }
}

/// Normalize a metadata key: lowercase, spaces to underscores.
fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

/// Apply a recognized scalar metadata value to the task.
///
/// Values of "None" or empty normalize to `None`. Unrecognized keys are
/// ignored for forward compatibility.
fn apply_metadata(task: &mut Task, key: &str, value: &str) {
    let normalized = normalize_value(value);
    match key {
        "id" => task.id = value.parse::<u32>().ok(),
        "description" => task.description = normalized,
        "priority" => {
            if let Some(v) = normalized {
                task.priority = v;
            }
        }
        "estimated_time" => task.estimated_time = normalized,
        "assignee" => task.assignee = normalized,
        "create_date" => task.create_date = normalized,
        "start_date" => task.start_date = normalized,
        // "Finished Date" appears in older documents.
        "finish_date" | "finished_date" => task.finish_date = normalized,
        _ => {}
    }
}

/// Normalize a metadata value: "None" and empty become `None`.
fn normalize_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

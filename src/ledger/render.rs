//! Canonical markdown rendering for task blocks.
//!
//! One fixed field order, so line-based diffing tools produce minimal,
//! stable diffs across reconciliation runs. [`render_task`] and
//! [`super::parser::parse_tasks`] are inverses: for any valid task,
//! parsing the rendered block reproduces it field-for-field.

use super::Task;

/// Render a task into its canonical markdown block.
///
/// Field order: checkbox+title, ID, description, prerequisites (or a
/// literal "None" item), priority, estimated time, assignee, create/start/
/// finish dates, subtasks (or a literal "None" item). Missing optional
/// values render as "None", which the parser normalizes back to `None`.
///
/// The block ends with a trailing newline.
#[must_use]
pub fn render_task(task: &Task) -> String {
    let checkbox = if task.checked { "[x]" } else { "[ ]" };

    let mut lines = vec![
        format!("- {} **{}**:", checkbox, task.title),
        format!("  - **ID**: {}", opt_u32(task.id)),
        format!("  - **Description**: {}", opt(&task.description)),
        "  - **Pre-requisites**:".to_string(),
    ];

    if task.prerequisites.is_empty() {
        lines.push("    - None".to_string());
    } else {
        for prereq in &task.prerequisites {
            lines.push(format!("    - {prereq}"));
        }
    }

    lines.extend([
        format!("  - **Priority**: {}", task.priority),
        format!("  - **Estimated Time**: {}", opt(&task.estimated_time)),
        format!("  - **Assignee**: {}", opt(&task.assignee)),
        format!("  - **Create Date**: {}", opt(&task.create_date)),
        format!("  - **Start Date**: {}", opt(&task.start_date)),
        format!("  - **Finish Date**: {}", opt(&task.finish_date)),
        "  - **Subtasks**:".to_string(),
    ]);

    if task.subtasks.is_empty() {
        lines.push("    - None".to_string());
    } else {
        for subtask in &task.subtasks {
            let mark = if subtask.completed { "[x]" } else { "[ ]" };
            lines.push(format!("    - {} {}", mark, subtask.name));
        }
    }

    let mut block = lines.join("\n");
    block.push('\n');
    block
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("None")
}

fn opt_u32(value: Option<u32>) -> String {
    value.map_or_else(|| "None".to_string(), |v| v.to_string())
}

// ============================================================================
// Tests
// ============================================================================

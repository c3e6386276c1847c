//! Ledger-wide dependency graph validation.
//!
//! Checks that span the whole task set, applied in a fixed order:
//!
//! 1. Duplicate IDs (hard error, names all conflicting titles)
//! 2. Unresolved prerequisites (hard error, names dependent and missing)
//! 3. Cycle detection over the `task -> prerequisite` graph
//! 4. Completion consistency with prerequisites (warning only)
//!
//! Cycle detection runs a DFS from every task as an independent root. The
//! visited set tracks titles on the *current path only* and unwinds on
//! backtrack, so state never leaks between separate root traversals.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::ledger::Task;

use super::ValidationReport;

/// Validate the whole task set's graph invariants.
#[must_use]
pub fn validate_graph(tasks: &[&Task]) -> ValidationReport {
    let mut report = ValidationReport::new();

    check_duplicate_ids(tasks, &mut report);

    let by_title: HashMap<&str, &Task> = tasks.iter().map(|t| (t.title.as_str(), *t)).collect();

    check_prerequisites_exist(tasks, &by_title, &mut report);
    check_cycles(tasks, &by_title, &mut report);
    check_completion_consistency(tasks, &by_title, &mut report);

    report
}

/// Any ID shared by more than one task is a hard error naming every
/// conflicting title.
fn check_duplicate_ids(tasks: &[&Task], report: &mut ValidationReport) {
    let mut by_id: BTreeMap<u32, Vec<&str>> = BTreeMap::new();
    for task in tasks {
        if let Some(id) = task.id {
            by_id.entry(id).or_default().push(task.title.as_str());
        }
    }

    for (id, titles) in by_id {
        if titles.len() > 1 {
            let joined = titles
                .iter()
                .map(|t| format!("'{t}'"))
                .collect::<Vec<_>>()
                .join(" and ");
            report.error(format!("Duplicate task ID {id}: {joined}"));
        }
    }
}

/// Every prerequisite must name an existing title in the set.
fn check_prerequisites_exist(
    tasks: &[&Task],
    by_title: &HashMap<&str, &Task>,
    report: &mut ValidationReport,
) {
    for task in tasks {
        for prereq in &task.prerequisites {
            if !by_title.contains_key(prereq.as_str()) {
                report.error(format!(
                    "Task '{}' has unknown prerequisite: '{}'",
                    task.title, prereq
                ));
            }
        }
    }
}

/// Run a DFS from each task and report any title revisited on the current
/// path.
fn check_cycles(tasks: &[&Task], by_title: &HashMap<&str, &Task>, report: &mut ValidationReport) {
    for task in tasks {
        let mut path = HashSet::new();
        if on_cycle(task.title.as_str(), by_title, &mut path) {
            report.error(format!(
                "Circular dependency detected involving task: '{}'",
                task.title
            ));
        }
    }
}

/// DFS with on-path marking. The path set unwinds on backtrack so sibling
/// branches never see each other's titles.
fn on_cycle<'a>(
    title: &'a str,
    by_title: &HashMap<&str, &'a Task>,
    path: &mut HashSet<&'a str>,
) -> bool {
    if !path.insert(title) {
        return true;
    }

    if let Some(task) = by_title.get(title) {
        for prereq in &task.prerequisites {
            if by_title.contains_key(prereq.as_str()) && on_cycle(prereq, by_title, path) {
                return true;
            }
        }
    }

    path.remove(title);
    false
}

/// A completed task whose prerequisites are not all completed is flagged
/// but not rejected.
fn check_completion_consistency(
    tasks: &[&Task],
    by_title: &HashMap<&str, &Task>,
    report: &mut ValidationReport,
) {
    for task in tasks {
        if !task.is_completed() {
            continue;
        }

        let incomplete: Vec<&str> = task
            .prerequisites
            .iter()
            .filter_map(|p| by_title.get(p.as_str()))
            .filter(|prereq| !prereq.is_completed())
            .map(|prereq| prereq.title.as_str())
            .collect();

        if !incomplete.is_empty() {
            report.warn(format!(
                "Task '{}' is complete but has incomplete prerequisites: {}",
                task.title,
                incomplete.join(", ")
            ));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Terminal presentation of reconcile and validation results.

use colored::Colorize;
use std::path::Path;

use crate::reconcile::ReconcileReport;
use crate::validate::ValidationReport;

/// Print the reconcile report in the standard layout.
pub fn print_reconcile_report(report: &ReconcileReport) {
    if !report.newly_fixed.is_empty() {
        println!(
            "\n{} Tests fixed since last update ({}):",
            "✓".green().bold(),
            report.newly_fixed.len()
        );
        for test in &report.newly_fixed {
            println!("  - {test}");
        }
    }

    if !report.newly_broken.is_empty() {
        println!(
            "\n{} Newly failing tests ({}):",
            "✗".red().bold(),
            report.newly_broken.len()
        );
        for test in &report.newly_broken {
            println!("  - {test}");
        }
    }

    if !report.still_failing.is_empty() {
        println!(
            "\n{} Still failing tests ({}):",
            "⚠".yellow().bold(),
            report.still_failing.len()
        );
        for test in &report.still_failing {
            println!("  - {test}");
        }
    }

    if report.is_quiet() {
        println!(
            "\n{} All tests passing, no task updates needed",
            "✓".green().bold()
        );
    }
}

/// Print what happened (or would happen) to the ledger file.
pub fn print_write_status(path: &Path, changed: bool, update_mode: bool) {
    let path = path.display();
    match (update_mode, changed) {
        (true, true) => println!("\n{} {} updated", "📝".bold(), path),
        (true, false) => println!("\n📝 No changes needed to {path}"),
        (false, true) => {
            println!("\n📝 {path} would be updated (use --update to apply)");
        }
        (false, false) => println!("\n📝 No changes would be made to {path}"),
    }
}

/// Print a validation report: errors in red, warnings in yellow.
pub fn print_validation_report(report: &ValidationReport) {
    for error in &report.errors {
        println!("{} {}", "error:".red().bold(), error);
    }
    for warning in &report.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }

    if report.is_valid() {
        if report.warnings.is_empty() {
            println!("{} ledger is valid", "✓".green().bold());
        } else {
            println!(
                "{} ledger is valid ({} warning{})",
                "✓".green().bold(),
                report.warnings.len(),
                if report.warnings.len() == 1 { "" } else { "s" }
            );
        }
    } else {
        println!(
            "{} ledger has {} error{}",
            "✗".red().bold(),
            report.errors.len(),
            if report.errors.len() == 1 { "" } else { "s" }
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

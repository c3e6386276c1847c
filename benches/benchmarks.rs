//! Benchmark suite for tasksmith subsystems.
//!
//! This module provides performance benchmarks for:
//! - Ledger parsing (markdown block scanning)
//! - Validation (schema + dependency graph)
//! - Reconciliation (classify, merge, regenerate)
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Save baseline for comparison
//! cargo bench -- --save-baseline main
//!
//! # Compare against baseline
//! cargo bench -- --baseline main
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tasksmith::ledger::parser::parse_tasks;
use tasksmith::ledger::render::render_task;
use tasksmith::reconcile::{Reconciler, TestRun};
use tasksmith::validate::validate_task_set;
use tasksmith::{Priority, Task};

// ============================================================================
// Fixtures
// ============================================================================

/// Build a ledger document with `n` open test-fix records.
fn synthetic_ledger(n: usize) -> String {
    let separator = format!("---{}", "-".repeat(90));
    let mut blocks = String::new();
    for i in 1..=n {
        let mut task = Task::new(format!("Fix failing tests in tests/test_{i}.py"))
            .with_id(i as u32)
            .with_priority(Priority::Critical);
        task.description = Some(format!("Fix 2 failing tests in tests/test_{i}.py"));
        task.estimated_time = Some("30 minutes".to_string());
        task.create_date = Some("2026-01-05T10:00:00Z".to_string());
        task.start_date = Some("2026-01-05T10:00:00Z".to_string());
        task.set_subtask("Fix test_alpha", false);
        task.set_subtask("Fix test_beta", true);
        blocks.push_str(&render_task(&task));
        blocks.push('\n');
    }
    format!(
        "# Task List\n\n{separator}\n\n## Critical Priority Tasks\n\n{blocks}\n## Archive\n\n{separator}\n"
    )
}

/// Build runner output exercising every record in the synthetic ledger.
fn synthetic_run_output(n: usize) -> String {
    let mut output = String::new();
    for i in 1..=n {
        output.push_str(&format!("tests/test_{i}.py::test_alpha PASSED\n"));
        output.push_str(&format!("tests/test_{i}.py::test_beta PASSED\n"));
        output.push_str(&format!("tests/test_{i}.py::test_gamma FAILED\n"));
    }
    output
}

// ============================================================================
// Parser Benchmarks
// ============================================================================

fn bench_parse_ledger(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_ledger");

    for size in [10, 50, 200] {
        let document = synthetic_ledger(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("parse_tasks", size), &document, |b, doc| {
            b.iter(|| black_box(parse_tasks(black_box(doc))));
        });
    }

    group.finish();
}

// ============================================================================
// Validation Benchmarks
// ============================================================================

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");

    for size in [10, 50, 200] {
        let document = synthetic_ledger(size);
        let tasks = parse_tasks(&document);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("task_set", size), &tasks, |b, tasks| {
            b.iter(|| {
                let refs: Vec<&Task> = tasks.iter().collect();
                black_box(validate_task_set(&refs))
            });
        });
    }

    group.finish();
}

// ============================================================================
// Reconciliation Benchmarks
// ============================================================================

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for size in [10, 50, 200] {
        let document = synthetic_ledger(size);
        let run = TestRun::parse(&synthetic_run_output(size));
        let reconciler = Reconciler::default();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(
            BenchmarkId::new("full_pass", size),
            &(document, run),
            |b, (document, run)| {
                b.iter(|| black_box(reconciler.reconcile(black_box(document), black_box(run))));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_parse_ledger, bench_validate, bench_reconcile);
criterion_main!(benches);

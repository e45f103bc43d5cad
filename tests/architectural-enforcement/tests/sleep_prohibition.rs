//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT block a thread with `thread::sleep`.
//! Every delay (reply latency, reveal ticks, the post-clear greeting) is an
//! async sleep inside a task the scheduler can cancel.
//!
//! **Exceptions**: `tokio::time::sleep` inside the scheduler and the
//! simulated responder; test code.

use architectural_enforcement::{production_lines, relative, rust_files};

/// Files allowed to await `tokio::time::sleep`
const ASYNC_SLEEP_ALLOWED: &[&str] = &[
    "conductor/core/src/scheduler.rs",
    "conductor/core/src/responder/simulated.rs",
];

const CHECKED_DIRS: &[&str] = &["conductor/core/src", "conductor/cli/src"];

#[test]
fn test_no_blocking_sleep_in_production_code() {
    let mut violations = Vec::new();

    for dir in CHECKED_DIRS {
        for file in rust_files(dir) {
            for (line_number, code) in production_lines(&file) {
                if code.contains("thread::sleep(") {
                    violations.push(format!("{}:{} - {}", relative(&file), line_number, code.trim()));
                }
            }
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        panic!(
            "\nFound {} blocking sleep(s) in production code.\nSchedule a cancellable task instead.",
            violations.len()
        );
    }
}

#[test]
fn test_async_sleep_only_in_scheduled_tasks() {
    let mut violations = Vec::new();

    for dir in CHECKED_DIRS {
        for file in rust_files(dir) {
            let rel = relative(&file);
            if ASYNC_SLEEP_ALLOWED.contains(&rel.as_str()) {
                continue;
            }
            for (line_number, code) in production_lines(&file) {
                if code.contains("time::sleep(") || code.contains("sleep_until(") {
                    violations.push(format!("{rel}:{line_number} - {}", code.trim()));
                }
            }
        }
    }

    if !violations.is_empty() {
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ ACCEPTABLE sleep uses:");
        for allowed in ASYNC_SLEEP_ALLOWED {
            eprintln!("  - {allowed}");
        }
        panic!(
            "\nFound {} sleep(s) outside the scheduler.\nDelays must be cancellable scheduled tasks.",
            violations.len()
        );
    }
}

#[test]
fn test_allowed_files_exist() {
    let files: Vec<String> = rust_files("conductor/core/src")
        .iter()
        .map(|p| relative(p))
        .collect();
    for allowed in ASYNC_SLEEP_ALLOWED {
        assert!(
            files.iter().any(|f| f == allowed),
            "{allowed} is allowed to sleep but no longer exists"
        );
    }
}

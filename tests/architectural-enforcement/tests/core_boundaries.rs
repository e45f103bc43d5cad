//! Integration Test: Core Boundaries
//!
//! **Policy**: The core is headless. It talks to surfaces only through
//! `SurfaceMessage`s, so it must not print, and it must not depend on any
//! terminal or GUI framework.

use std::fs;

use architectural_enforcement::{production_lines, relative, rust_files, workspace_root};

const UI_CRATES: &[&str] = &["ratatui", "crossterm", "termion", "cursive", "egui", "iced"];

/// Tokio features already enabled by `full`
const TOKIO_FULL_SUBSET: &[&str] = &["rt-multi-thread", "macros", "sync", "time", "io-std", "fs"];

const MANIFESTS: &[&str] = &["conductor/core/Cargo.toml", "conductor/cli/Cargo.toml"];

#[test]
fn test_core_never_prints() {
    let mut violations = Vec::new();

    for file in rust_files("conductor/core/src") {
        for (line_number, code) in production_lines(&file) {
            if ["println!(", "print!(", "eprintln!(", "eprint!("]
                .iter()
                .any(|mac| code.contains(mac))
            {
                violations.push(format!("{}:{} - {}", relative(&file), line_number, code.trim()));
            }
        }
    }

    assert!(
        violations.is_empty(),
        "Core writes to the terminal directly:\n{}",
        violations.join("\n")
    );
}

#[test]
fn test_core_has_no_ui_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("conductor/core/Cargo.toml"))
        .expect("core manifest readable");

    for krate in UI_CRATES {
        assert!(
            !manifest.lines().any(|l| l.trim_start().starts_with(krate)),
            "conductor/core depends on UI crate {krate}"
        );
    }
}

#[test]
fn test_tokio_features_not_repeated_next_to_full() {
    for manifest in MANIFESTS {
        let content = fs::read_to_string(workspace_root().join(manifest))
            .expect("manifest readable");

        for line in content.lines().filter(|l| l.trim_start().starts_with("tokio ")) {
            if !line.contains("\"full\"") {
                continue;
            }
            for feature in TOKIO_FULL_SUBSET {
                assert!(
                    !line.contains(&format!("\"{feature}\"")),
                    "{manifest}: tokio feature {feature} is already part of \"full\""
                );
            }
        }
    }
}

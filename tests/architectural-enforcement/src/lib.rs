//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - Every delay is a cancellable scheduled task, never a blocking sleep
//! - The core never writes to the terminal; only surfaces do
//! - The core carries no UI framework dependencies
//!
//! The helpers here walk the workspace sources for the tests in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Root of the workspace
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// All `.rs` files below `dir` (relative to the workspace root)
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let path = workspace_root().join(dir);
    if !path.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Non-comment code lines of `path` with 1-based line numbers
///
/// Scanning stops at the first `#[cfg(test)]`, since test modules sit at the
/// bottom of each file.
pub fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }
        let code = line.split("//").next().unwrap_or(line);
        lines.push((idx + 1, code.to_string()));
    }
    lines
}

/// Path of `path` relative to the workspace root, with `/` separators
pub fn relative(path: &Path) -> String {
    let root = workspace_root();
    let rel = path.strip_prefix(&root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_core_sources() {
        let files = rust_files("conductor/core/src");
        assert!(files.iter().any(|p| relative(p) == "conductor/core/src/lib.rs"));
    }

    #[test]
    fn test_production_lines_stop_at_tests() {
        let dir = std::env::temp_dir().join("arch-enforcement-lines");
        fs::create_dir_all(&dir).unwrap();
        let file = dir.join("sample.rs");
        fs::write(&file, "fn a() {}\n// note\n#[cfg(test)]\nfn b() {}\n").unwrap();

        let lines = production_lines(&file);
        assert_eq!(lines, vec![(1, "fn a() {}".to_string())]);
    }
}

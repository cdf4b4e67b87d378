//! Architectural Enforcement Helpers
//!
//! Source-scanning utilities shared by the enforcement tests:
//! - No sleep() calls in production code
//! - No panicking shortcuts in production code
//! - The core crate stays free of server and terminal dependencies
//!
//! These tests are designed to catch violations early in the development cycle.

use std::fs;
use std::path::{Path, PathBuf};

/// Production source directories, relative to the workspace root
pub const PRODUCTION_DIRS: &[&str] = &["parley/core/src", "parley/server/src", "cli/src"];

/// Root of the workspace this crate lives in
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Every `.rs` file under `dir` (relative to the workspace root)
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let path = workspace_root().join(dir);
    if !path.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// The code part of a line, without any trailing `//` comment
#[must_use]
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Lines of a file that belong to production code, with 1-based numbers
///
/// Everything from the first `#[cfg(test)]` onwards is treated as test code.
#[must_use]
pub fn production_lines(path: &Path) -> Vec<(usize, String)> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };

    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
        .map(|(idx, line)| (idx + 1, line.to_string()))
        .collect()
}

/// Find production lines in `dirs` whose code contains any of `patterns`
#[must_use]
pub fn find_violations(dirs: &[&str], patterns: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();

    for dir in dirs {
        for file in rust_files(dir) {
            for (line_number, line) in production_lines(&file) {
                let code = code_part(&line);
                if patterns.iter().any(|p| code.contains(p)) {
                    violations.push(format!(
                        "{}:{} - {}",
                        file.display(),
                        line_number,
                        line.trim()
                    ));
                }
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_part_strips_comments() {
        assert_eq!(code_part("let x = 1; // sleep(1)"), "let x = 1; ");
        assert_eq!(code_part("// all comment"), "");
    }

    #[test]
    fn test_workspace_root_has_manifest() {
        assert!(workspace_root().join("Cargo.toml").exists());
    }
}

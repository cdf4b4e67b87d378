//! Integration Test: Layering and Error Propagation
//!
//! - `parley-core` is headless: no HTTP server, terminal, or CLI parsing
//!   dependencies, so any surface can embed it.
//! - Production code propagates errors instead of panicking.

use std::fs;

use architectural_enforcement::{find_violations, workspace_root, PRODUCTION_DIRS};

/// Crates that belong to surfaces, not the core
const SURFACE_CRATES: &[&str] = &[
    "axum",
    "tower-http",
    "clap",
    "tracing-subscriber",
    "ratatui",
    "crossterm",
];

#[test]
fn test_core_manifest_has_no_surface_dependencies() {
    let manifest = fs::read_to_string(workspace_root().join("parley/core/Cargo.toml")).unwrap();

    let offending: Vec<&str> = manifest
        .lines()
        .filter_map(|line| line.split('=').next())
        .map(str::trim)
        .filter(|name| SURFACE_CRATES.contains(name))
        .collect();

    assert!(
        offending.is_empty(),
        "parley-core must stay headless, found: {offending:?}"
    );
}

#[test]
fn test_core_source_has_no_surface_imports() {
    let violations = find_violations(
        &["parley/core/src"],
        &["axum::", "tower_http::", "clap::", "tracing_subscriber::"],
    );
    assert!(violations.is_empty(), "Surface imports in core:\n{}", violations.join("\n"));
}

#[test]
fn test_no_panicking_shortcuts_in_production_code() {
    let violations = find_violations(PRODUCTION_DIRS, &[".unwrap()", ".expect("]);
    assert!(
        violations.is_empty(),
        "Propagate errors instead of panicking:\n{}",
        violations.join("\n")
    );
}

//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep methods. Streaming waits on
//! I/O and cancellation, never on a timer.
//! **Exceptions**: test code

use architectural_enforcement::{find_violations, PRODUCTION_DIRS};

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = find_violations(PRODUCTION_DIRS, &["::sleep(", ".sleep("]);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");

        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }

        eprintln!("\n✅ Instead:");
        eprintln!("  - Await the next chunk or event");
        eprintln!("  - Use a CancellationToken to stop early");
        eprintln!("  - Use connect timeouts on the HTTP client");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

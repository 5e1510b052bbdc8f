//! Panic Enforcement
//!
//! Library code propagates errors with `?`. `unwrap()` and `expect()` are
//! reserved for tests.

use std::fs;
use std::path::Path;

use super::source_scan::{self, Violation};

fn is_panicking_call(line: &str) -> bool {
    let code = line.split("//").next().unwrap_or_default();
    code.contains(".unwrap()") || code.contains(".expect(")
}

fn check_content(path: &Path, content: &str, violations: &mut Vec<Violation>) {
    for (line_number, line) in source_scan::production_lines(content) {
        if is_panicking_call(line) {
            violations.push(Violation::new(&path.to_string_lossy(), line_number, line));
        }
    }
}

#[test]
fn test_panicking_call_detection() {
    assert!(is_panicking_call("    let x = y.unwrap();"));
    assert!(is_panicking_call("    let x = y.expect(\"present\");"));
    assert!(!is_panicking_call("    let x = y.unwrap_or(0);"));
    assert!(!is_panicking_call("    let x = y.unwrap_or_default();"));
    assert!(!is_panicking_call("    // never call .unwrap() here"));
}

#[test]
fn test_test_modules_are_exempt() {
    let content = "fn a() -> u8 { 1 }\n#[cfg(test)]\nmod tests {\n    fn b() { Some(1).unwrap(); }\n}\n";
    let mut violations = Vec::new();
    check_content(Path::new("lib.rs"), content, &mut violations);
    assert!(violations.is_empty());
}

#[test]
fn panic_enforcement() {
    let files = source_scan::production_files().unwrap();
    let mut violations = Vec::new();
    let mut files_checked = 0;

    for file in files.iter().filter(|f| !source_scan::is_test_file(f)) {
        let content = fs::read_to_string(file).unwrap();
        check_content(file, &content, &mut violations);
        files_checked += 1;
    }

    assert!(
        source_scan::report("Panic enforcement", &violations, files_checked),
        "Found unwrap() or expect() in production code. Propagate the error instead."
    );
}

//! Dead Code Enforcement
//!
//! Production code must not contain #[allow(dead_code)] attributes. Test
//! modules are exempt.

use std::fs;
use std::path::Path;

use super::source_scan::{self, Violation};

fn is_dead_code_allowance(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.contains("#[allow(dead_code)]")
        || (trimmed.contains("allow(") && trimmed.contains("dead_code"))
}

fn check_content(path: &Path, content: &str, violations: &mut Vec<Violation>) {
    for (line_number, line) in source_scan::production_lines(content) {
        if is_dead_code_allowance(line) {
            violations.push(Violation::new(&path.to_string_lossy(), line_number, line));
        }
    }
}

#[test]
fn test_dead_code_detection() {
    let content = r#"
use std::collections::HashMap;

#[allow(dead_code)]
struct UnusedStruct {
    field: u32,
}

#[allow(clippy::missing_docs, dead_code)]
fn unused_function() {}

#[cfg(test)]
mod tests {
    #[allow(dead_code)]
    fn helper() {}
}
"#;
    let mut violations = Vec::new();
    check_content(Path::new("pool.rs"), content, &mut violations);

    assert_eq!(violations.len(), 2);
    assert_eq!(violations[0].line_number, 4);
    assert_eq!(violations[1].line_number, 9);
}

#[test]
fn dead_code_enforcement() {
    let files = source_scan::production_files().unwrap();
    let mut violations = Vec::new();
    let mut files_checked = 0;

    for file in files.iter().filter(|f| !source_scan::is_test_file(f)) {
        let content = fs::read_to_string(file).unwrap();
        check_content(file, &content, &mut violations);
        files_checked += 1;
    }

    assert!(files_checked > 0, "no production files found");
    assert!(
        source_scan::report("Dead code enforcement", &violations, files_checked),
        "Found #[allow(dead_code)] in production code. Remove the unused code or use it."
    );
}

//! Shared helpers for scanning production sources.

use std::fs;
use std::path::{Path, PathBuf};

/// Library source roots, relative to this crate.
pub const PRODUCTION_ROOTS: [&str; 2] = ["../floodgate-core/src", "../floodgate-sim/src"];

/// A line that breaks a style rule
#[derive(Debug)]
pub struct Violation {
    pub file_path: String,
    pub line_number: usize,
    pub context: String,
}

impl Violation {
    pub fn new(file_path: &str, line_number: usize, context: &str) -> Self {
        Self {
            file_path: file_path.to_string(),
            line_number,
            context: context.to_string(),
        }
    }
}

/// Finds all Rust files under the production roots.
pub fn production_files() -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for root in PRODUCTION_ROOTS {
        find_rust_files_recursive(Path::new(root), &mut files, 0)?;
    }
    files.sort();
    Ok(files)
}

fn find_rust_files_recursive(
    dir: &Path,
    files: &mut Vec<PathBuf>,
    depth: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    // Prevent infinite recursion
    if depth > 10 {
        return Ok(());
    }

    if dir.is_dir() {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                find_rust_files_recursive(&path, files, depth + 1)?;
            } else if path.extension().is_some_and(|s| s == "rs") {
                files.push(path);
            }
        }
    }
    Ok(())
}

/// Whole-file test modules such as `deterministic/tests.rs`.
pub fn is_test_file(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with("/tests.rs") || path_str.contains("/tests/") || path_str.contains("_test")
}

/// Lines before the first `#[cfg(test)]`, numbered from 1.
pub fn production_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .map(|(index, line)| (index + 1, line))
}

/// Prints violations, returns whether there were none.
pub fn report(rule: &str, violations: &[Violation], files_checked: usize) -> bool {
    if violations.is_empty() {
        println!("{rule}: {files_checked} files checked, no violations found");
        return true;
    }

    println!("{rule} violations found:");
    for violation in violations {
        println!("{}:{}", violation.file_path, violation.line_number);
        println!("  {}", violation.context.trim());
    }
    println!(
        "Found {} violation(s) in {} file(s) checked",
        violations.len(),
        files_checked
    );
    false
}

//! Style Enforcement Tests
//!
//! Validates patterns in production code that clippy does not catch on its own.
//!
//! # Test Organization
//!
//! - `dead_code_enforcement` - Prevents #[allow(dead_code)] in production code
//! - `panic_enforcement` - Prevents unwrap() and expect() outside test code
//!
//! These tests scan the library crates and fail if violations are found.

#[path = "style/source_scan.rs"]
mod source_scan;

#[path = "style/dead_code_enforcement.rs"]
mod dead_code_enforcement;

#[path = "style/panic_enforcement.rs"]
mod panic_enforcement;

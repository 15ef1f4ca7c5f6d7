//! Rule-file linting library for the Formfill engine.
//!
//! Validates exported rule files before import, reporting the issues the
//! engine's all-or-nothing importer would reject on, plus warnings for
//! constructs that import but misbehave (unknown placeholder regex bodies,
//! empty field lists). Usable as a standalone library or through the
//! `formfill-lint` CLI binary.
//!
//! # Example
//!
//! ```no_run
//! use formfill_lint::{lint_file, lint_directory, LintOptions};
//! use std::path::Path;
//!
//! let result = lint_file(Path::new("rules.json"), &LintOptions::default());
//! if result.has_errors() {
//!     eprintln!("Found {} errors", result.errors);
//! }
//! ```

mod types;
mod validator;

use std::path::Path;

// Re-export public types
pub use types::{LintIssue, LintOptions, LintResult, Severity};

// Re-export validation functions for advanced usage
pub use validator::{
    validate_action, validate_field, validate_payload, validate_rule, SUPPORTED_VERSIONS,
};

/// Lint a single exported rule file.
///
/// Returns a `LintResult` containing all issues found.
pub fn lint_file(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();
    result.files_checked = 1;

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            result.push(LintIssue::error(
                "E001",
                format!("Failed to read file: {e}"),
                path.to_path_buf(),
            ));
            return result;
        }
    };

    let payload: serde_json::Value = match serde_json::from_str(&content) {
        Ok(payload) => payload,
        Err(e) => {
            result.push(
                LintIssue::error(
                    "E001",
                    format!("Failed to parse JSON: {e}"),
                    path.to_path_buf(),
                )
                .with_suggestion("Check for JSON syntax errors"),
            );
            return result;
        }
    };

    validate_payload(path, &payload, &mut result, options);
    result
}

/// Lint every `.json` file directly inside a directory.
pub fn lint_directory(path: &Path, options: &LintOptions) -> LintResult {
    let mut result = LintResult::new();

    let Ok(entries) = std::fs::read_dir(path) else {
        result.push(LintIssue::error(
            "E001",
            format!("Failed to read directory: {}", path.display()),
            path.to_path_buf(),
        ));
        return result;
    };

    let mut files: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    for file in files {
        let file_result = lint_file(&file, options);
        result.files_checked += file_result.files_checked;
        result.merge(file_result);
    }
    result
}

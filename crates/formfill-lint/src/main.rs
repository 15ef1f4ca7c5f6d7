//! Formfill Rule-File Linter CLI
//!
//! Validates exported rule files before import, detecting the issues the
//! engine's all-or-nothing importer would reject on.
//!
//! Usage:
//!   formfill-lint <directory_or_file> [OPTIONS]

use clap::Parser;
use formfill_lint::{lint_directory, lint_file, LintIssue, LintOptions, LintResult, Severity};
use std::collections::HashMap;
use std::path::PathBuf;

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";

/// Formfill Rule-File Linter
#[derive(Parser, Debug)]
#[command(name = "formfill-lint")]
#[command(author, version, about = "Validate exported rule files for Formfill import")]
struct Args {
    /// Path to a rule file or a directory containing rule files
    #[arg(required = true)]
    path: PathBuf,

    /// Output format: text (default), json
    #[arg(short, long, default_value = "text")]
    output: String,

    /// Only show errors (hide warnings)
    #[arg(short = 'e', long)]
    errors_only: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Strict mode - treat warnings as errors
    #[arg(short, long)]
    strict: bool,
}

fn main() {
    let args = Args::parse();
    let options = LintOptions {
        verbose: args.verbose,
    };

    let result = if args.path.is_dir() {
        lint_directory(&args.path, &options)
    } else {
        lint_file(&args.path, &options)
    };

    if args.output == "json" {
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else {
        print_results(&result, &args);
    }

    // Exit with error code if there were errors (or warnings in strict mode)
    let has_errors = result.errors > 0 || (args.strict && result.warnings > 0);
    std::process::exit(if has_errors { 1 } else { 0 });
}

fn print_results(result: &LintResult, args: &Args) {
    println!("{BOLD}{CYAN}Formfill Rule Linter{RESET}");
    println!("{DIM}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{RESET}");
    println!(
        "{DIM}Checked:{RESET} {BOLD}{}{RESET} file(s)\n",
        result.files_checked
    );

    if result.issues.is_empty() {
        println!("{GREEN}{BOLD}No issues found!{RESET}");
    } else {
        // Group issues by file
        let mut issues_by_file: HashMap<&PathBuf, Vec<&LintIssue>> = HashMap::new();
        for issue in &result.issues {
            issues_by_file.entry(&issue.file).or_default().push(issue);
        }

        // Sort files for consistent output
        let mut files: Vec<_> = issues_by_file.keys().collect();
        files.sort();

        for file in files {
            let issues = &issues_by_file[file];

            let filtered: Vec<_> = if args.errors_only {
                issues
                    .iter()
                    .filter(|i| i.severity == Severity::Error)
                    .collect()
            } else {
                issues.iter().collect()
            };
            if filtered.is_empty() {
                continue;
            }

            let file_errors = filtered
                .iter()
                .filter(|i| i.severity == Severity::Error)
                .count();
            let file_name = file.file_name().unwrap_or_default().to_string_lossy();
            let status = if file_errors > 0 {
                format!("{RED}FAIL{RESET}")
            } else {
                format!("{YELLOW}WARN{RESET}")
            };
            println!("{status} {BOLD}{CYAN}{file_name}{RESET}");

            for issue in filtered {
                let severity_str = format!(
                    "{BOLD}{}{}{RESET}",
                    severity_color(&issue.severity),
                    issue.severity
                );
                let location_str = issue
                    .location
                    .as_ref()
                    .map(|l| format!("{DIM}[{RESET}{CYAN}{l}{RESET}{DIM}]{RESET}"))
                    .unwrap_or_default();
                let code_str = format!(
                    "{DIM}({}{}{DIM}){RESET}",
                    severity_color(&issue.severity),
                    issue.code
                );

                println!("  {location_str} {severity_str}: {} {code_str}", issue.message);
                if let Some(suggestion) = &issue.suggestion {
                    println!("    {GREEN}-> {suggestion}{RESET}");
                }
            }
            println!();
        }
    }

    // Summary
    println!("{DIM}━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━{RESET}");
    if result.errors > 0 {
        println!("  {RED}Errors:{RESET}   {BOLD}{RED}{}{RESET}", result.errors);
    } else {
        println!("  {GREEN}Errors:{RESET}   {BOLD}{GREEN}0{RESET}");
    }
    if result.warnings > 0 {
        println!(
            "  {YELLOW}Warnings:{RESET} {BOLD}{YELLOW}{}{RESET}",
            result.warnings
        );
    } else {
        println!("  {DIM}Warnings:{RESET} {BOLD}0{RESET}");
    }
    println!();

    if result.errors == 0 && result.warnings == 0 {
        println!("{GREEN}{BOLD}All checks passed!{RESET}");
    } else if result.errors == 0 {
        println!("{YELLOW}{BOLD}Passed with warnings{RESET}");
    } else {
        println!("{RED}{BOLD}Linting failed with errors{RESET}");
    }
}

fn severity_color(severity: &Severity) -> &'static str {
    match severity {
        Severity::Error => RED,
        Severity::Warning => YELLOW,
        Severity::Info => CYAN,
    }
}

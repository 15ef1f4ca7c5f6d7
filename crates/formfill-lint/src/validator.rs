//! Core validation logic for exported rule files.

use crate::types::{LintIssue, LintOptions, LintResult};
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;

/// Export versions the engine accepts on import.
pub const SUPPORTED_VERSIONS: &[u64] = &[1, 2];

const MATCH_KINDS: &[&str] = &["id", "name", "querySelector"];
const VALUE_KINDS: &[&str] = &["static", "template", "title", "desc", "image"];
const ACTION_KINDS: &[&str] = &["click", "focus", "pressKey", "wait"];

/// Validate a complete export payload.
pub fn validate_payload(
    file: &Path,
    payload: &Value,
    result: &mut LintResult,
    options: &LintOptions,
) {
    check_required_fields(file, payload, result);
    check_version(file, payload, result);

    if let Some(rules) = payload.get("rules").and_then(|v| v.as_array()) {
        let mut seen_ids: HashSet<&str> = HashSet::new();
        for (idx, rule) in rules.iter().enumerate() {
            if let Some(id) = rule.get("id").and_then(|v| v.as_str()) {
                if !seen_ids.insert(id) {
                    result.push(
                        LintIssue::warning(
                            "W003",
                            format!("Duplicate rule id: {id}"),
                            file.to_path_buf(),
                        )
                        .with_location(format!("rules[{idx}].id"))
                        .with_suggestion("Imported rules receive fresh ids, but duplicates usually indicate a hand-edited file"),
                    );
                }
            }
            validate_rule(file, rule, idx, result, options);
        }
    }
}

/// Check that required top-level fields are present.
fn check_required_fields(file: &Path, payload: &Value, result: &mut LintResult) {
    for field in ["version", "exportedAt", "rules"] {
        if payload.get(field).is_none() {
            result.push(
                LintIssue::error(
                    "E002",
                    format!("Missing required field: {field}"),
                    file.to_path_buf(),
                )
                .with_suggestion(format!("Add \"{field}\" to the export payload")),
            );
        }
    }
}

/// Check that the export version is one the engine supports.
fn check_version(file: &Path, payload: &Value, result: &mut LintResult) {
    if let Some(version) = payload.get("version") {
        match version.as_u64() {
            Some(v) if SUPPORTED_VERSIONS.contains(&v) => {}
            Some(v) => {
                result.push(
                    LintIssue::error(
                        "E003",
                        format!("Unsupported export version: {v}"),
                        file.to_path_buf(),
                    )
                    .with_location("version")
                    .with_suggestion(format!(
                        "Supported versions: {}",
                        SUPPORTED_VERSIONS
                            .iter()
                            .map(u64::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    )),
                );
            }
            None => {
                result.push(
                    LintIssue::error(
                        "E003",
                        "Export version must be an integer".to_string(),
                        file.to_path_buf(),
                    )
                    .with_location("version"),
                );
            }
        }
    }
}

/// Validate a single rule.
pub fn validate_rule(
    file: &Path,
    rule: &Value,
    idx: usize,
    result: &mut LintResult,
    options: &LintOptions,
) {
    let location = format!("rules[{idx}]");

    for field in ["name", "pattern", "variants", "activeVariantId"] {
        if rule.get(field).is_none() {
            result.push(
                LintIssue::error(
                    "E004",
                    format!("Rule is missing required field: {field}"),
                    file.to_path_buf(),
                )
                .with_location(location.clone()),
            );
        }
    }

    check_pattern(file, rule, &location, result);
    check_variant_references(file, rule, &location, result);

    let fields = rule.get("fields").and_then(|v| v.as_array());
    if fields.map_or(true, |f| f.is_empty()) {
        result.push(
            LintIssue::warning(
                "W002",
                "Rule has no field mappings and will fill nothing".to_string(),
                file.to_path_buf(),
            )
            .with_location(location.clone()),
        );
    }
    if let Some(fields) = fields {
        for (field_idx, field) in fields.iter().enumerate() {
            validate_field(
                file,
                field,
                &format!("{location}.fields[{field_idx}]"),
                result,
                options,
            );
        }
    }

    if let Some(actions) = rule.get("postActions").and_then(|v| v.as_array()) {
        for (action_idx, action) in actions.iter().enumerate() {
            validate_action(
                file,
                action,
                &format!("{location}.postActions[{action_idx}]"),
                result,
            );
        }
    }
}

fn check_pattern(file: &Path, rule: &Value, location: &str, result: &mut LintResult) {
    let Some(pattern) = rule.get("pattern").and_then(|v| v.as_str()) else {
        return;
    };
    if pattern.trim().is_empty() {
        result.push(
            LintIssue::error("E005", "URL pattern is empty".to_string(), file.to_path_buf())
                .with_location(format!("{location}.pattern"))
                .with_suggestion("Use '*' to match every URL"),
        );
        return;
    }
    if let Some(expr) = wrapped_regex(pattern) {
        if let Err(e) = Regex::new(expr) {
            result.push(
                LintIssue::error(
                    "E006",
                    format!("Invalid regex pattern: {e}"),
                    file.to_path_buf(),
                )
                .with_location(format!("{location}.pattern")),
            );
        }
    }
}

fn check_variant_references(file: &Path, rule: &Value, location: &str, result: &mut LintResult) {
    let variants = rule
        .get("variants")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();
    if rule.get("variants").is_some() && variants.is_empty() {
        result.push(
            LintIssue::error(
                "E010",
                "Rule has no variants; at least the primary is required".to_string(),
                file.to_path_buf(),
            )
            .with_location(format!("{location}.variants")),
        );
    }

    let variant_ids: HashSet<&str> = variants
        .iter()
        .filter_map(|v| v.get("id").and_then(|id| id.as_str()))
        .collect();
    if let Some(active) = rule.get("activeVariantId").and_then(|v| v.as_str()) {
        if !variants.is_empty() && !variant_ids.contains(active) {
            result.push(
                LintIssue::error(
                    "E010",
                    format!("activeVariantId {active} does not reference a variant"),
                    file.to_path_buf(),
                )
                .with_location(format!("{location}.activeVariantId")),
            );
        }
    }

    let field_ids: HashSet<&str> = rule
        .get("fields")
        .and_then(|v| v.as_array())
        .map(|fields| {
            fields
                .iter()
                .filter_map(|f| f.get("id").and_then(|id| id.as_str()))
                .collect()
        })
        .unwrap_or_default();
    for (variant_idx, variant) in variants.iter().enumerate() {
        if let Some(values) = variant.get("values").and_then(|v| v.as_object()) {
            for key in values.keys() {
                if !field_ids.contains(key.as_str()) {
                    result.push(
                        LintIssue::error(
                            "E010",
                            format!("Variant value key {key} does not reference a field"),
                            file.to_path_buf(),
                        )
                        .with_location(format!("{location}.variants[{variant_idx}].values")),
                    );
                }
            }
        }
    }
}

/// Validate a single field mapping.
pub fn validate_field(
    file: &Path,
    field: &Value,
    location: &str,
    result: &mut LintResult,
    _options: &LintOptions,
) {
    let match_kind = field.get("matchKind").and_then(|v| v.as_str());
    match match_kind {
        Some(kind) if MATCH_KINDS.contains(&kind) => {}
        Some(kind) => {
            result.push(
                LintIssue::error(
                    "E007",
                    format!("Unknown matchKind: {kind}"),
                    file.to_path_buf(),
                )
                .with_location(format!("{location}.matchKind"))
                .with_suggestion("Use 'id', 'name', or 'querySelector'"),
            );
        }
        None => {
            result.push(
                LintIssue::error(
                    "E004",
                    "Field is missing required field: matchKind".to_string(),
                    file.to_path_buf(),
                )
                .with_location(location.to_string()),
            );
        }
    }

    if let Some(kind) = field.get("valueKind").and_then(|v| v.as_str()) {
        if !VALUE_KINDS.contains(&kind) {
            result.push(
                LintIssue::error(
                    "E008",
                    format!("Unknown valueKind: {kind}"),
                    file.to_path_buf(),
                )
                .with_location(format!("{location}.valueKind")),
            );
        }
    }

    match field.get("selector").and_then(|v| v.as_str()) {
        Some(selector) if selector.trim().is_empty() => {
            result.push(
                LintIssue::error("E005", "Selector is empty".to_string(), file.to_path_buf())
                    .with_location(format!("{location}.selector")),
            );
        }
        Some(selector) => {
            // Regex-wrapped selectors only apply to attribute lookups.
            if matches!(match_kind, Some("id") | Some("name")) {
                if let Some(expr) = wrapped_regex(selector) {
                    if let Err(e) = Regex::new(expr) {
                        result.push(
                            LintIssue::error(
                                "E006",
                                format!("Invalid regex selector: {e}"),
                                file.to_path_buf(),
                            )
                            .with_location(format!("{location}.selector")),
                        );
                    }
                }
            }
        }
        None => {
            result.push(
                LintIssue::error(
                    "E004",
                    "Field is missing required field: selector".to_string(),
                    file.to_path_buf(),
                )
                .with_location(location.to_string()),
            );
        }
    }

    if let (Some(min), Some(max)) = (
        field.get("minLength").and_then(|v| v.as_u64()),
        field.get("maxLength").and_then(|v| v.as_u64()),
    ) {
        if min > max {
            result.push(
                LintIssue::error(
                    "E009",
                    format!("minLength {min} exceeds maxLength {max}"),
                    file.to_path_buf(),
                )
                .with_location(location.to_string()),
            );
        }
    }

    if let Some(value) = field.get("value").and_then(|v| v.as_str()) {
        check_template_regex_bodies(file, value, location, result);
    }

    if let Some(actions) = field.get("postActions").and_then(|v| v.as_array()) {
        for (action_idx, action) in actions.iter().enumerate() {
            validate_action(
                file,
                action,
                &format!("{location}.postActions[{action_idx}]"),
                result,
            );
        }
    }
}

/// Validate a single post-action.
pub fn validate_action(file: &Path, action: &Value, location: &str, result: &mut LintResult) {
    match action.get("action").and_then(|v| v.as_str()) {
        Some(kind) if ACTION_KINDS.contains(&kind) => {
            if matches!(kind, "click" | "focus") {
                let selector = action.get("selector").and_then(|v| v.as_str());
                if selector.map_or(true, |s| s.trim().is_empty()) {
                    result.push(
                        LintIssue::error(
                            "E004",
                            format!("{kind} action needs a selector"),
                            file.to_path_buf(),
                        )
                        .with_location(location.to_string()),
                    );
                }
            }
            if kind == "pressKey"
                && action
                    .get("key")
                    .and_then(|v| v.as_str())
                    .map_or(true, |k| k.is_empty())
            {
                result.push(
                    LintIssue::error(
                        "E004",
                        "pressKey action needs a key name".to_string(),
                        file.to_path_buf(),
                    )
                    .with_location(location.to_string()),
                );
            }
        }
        Some(kind) => {
            result.push(
                LintIssue::error(
                    "E011",
                    format!("Unknown action kind: {kind}"),
                    file.to_path_buf(),
                )
                .with_location(location.to_string())
                .with_suggestion("Use 'click', 'focus', 'pressKey', or 'wait'"),
            );
        }
        None => {
            result.push(
                LintIssue::error(
                    "E004",
                    "Post-action is missing required field: action".to_string(),
                    file.to_path_buf(),
                )
                .with_location(location.to_string()),
            );
        }
    }
}

/// Compile every `{{regex:[...]}}` body in a template; the engine degrades
/// these to inline error markers at fill time, which rule authors usually
/// want to know about before importing.
fn check_template_regex_bodies(file: &Path, value: &str, location: &str, result: &mut LintResult) {
    let mut rest = value;
    while let Some(open) = find_regex_placeholder(rest) {
        let after = &rest[open + "{{regex:[".len()..];
        let Some(close) = after.find("]}}") else {
            break;
        };
        let body = &after[..close];
        if let Err(e) = Regex::new(body) {
            result.push(
                LintIssue::warning(
                    "W001",
                    format!("Template regex placeholder will not generate: {e}"),
                    file.to_path_buf(),
                )
                .with_location(format!("{location}.value")),
            );
        }
        rest = &after[close + "]}}".len()..];
    }
}

fn find_regex_placeholder(s: &str) -> Option<usize> {
    let lower = s.to_ascii_lowercase();
    lower.find("{{regex:[")
}

fn wrapped_regex(s: &str) -> Option<&str> {
    if s.len() >= 2 && s.starts_with('/') && s.ends_with('/') {
        Some(&s[1..s.len() - 1])
    } else {
        None
    }
}

//! Serialized export/import of rule collections.
//!
//! The payload shape is `{ version, exportedAt, rules }`. Import is
//! all-or-nothing: the payload is validated structurally first, and any
//! violation aborts the entire import with the joined list of `path: message`
//! strings - zero rules applied. Rules that do import receive fresh
//! identities throughout (imported ids are never reused) and timestamps
//! stamped to now.

use crate::rules::types::{now_ms, wrapped_regex, Rule};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Version stamped on new exports.
pub const EXPORT_VERSION: u32 = 2;

/// Versions accepted on import.
pub const SUPPORTED_VERSIONS: &[u32] = &[1, 2];

/// A serialized rule collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPayload {
    pub version: u32,
    /// Epoch milliseconds at export time.
    pub exported_at: i64,
    pub rules: Vec<Rule>,
}

/// Error types for import.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Payload is not valid JSON: {0}")]
    Parse(String),
    #[error("Import rejected:\n{}", .violations.join("\n"))]
    Invalid { violations: Vec<String> },
}

/// Snapshot rules into a payload stamped with the current version and time.
pub fn export_rules(rules: &[Rule]) -> ExportPayload {
    ExportPayload {
        version: EXPORT_VERSION,
        exported_at: now_ms(),
        rules: rules.to_vec(),
    }
}

/// Parse a serialized payload without validating it.
pub fn parse_payload(json: &str) -> Result<ExportPayload, ImportError> {
    serde_json::from_str(json).map_err(|e| ImportError::Parse(e.to_string()))
}

/// Validate a payload structurally. Returns every violation as a
/// `path: message` string; an empty list means the payload is importable.
pub fn validate_payload(payload: &ExportPayload) -> Vec<String> {
    let mut violations = Vec::new();

    if !SUPPORTED_VERSIONS.contains(&payload.version) {
        violations.push(format!(
            "version: unsupported export version {} (supported: {})",
            payload.version,
            SUPPORTED_VERSIONS
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }

    for (i, rule) in payload.rules.iter().enumerate() {
        validate_rule(rule, &format!("rules[{i}]"), &mut violations);
    }

    violations
}

fn validate_rule(rule: &Rule, path: &str, violations: &mut Vec<String>) {
    if rule.name.trim().is_empty() {
        violations.push(format!("{path}.name: must not be empty"));
    }
    if rule.pattern.trim().is_empty() {
        violations.push(format!("{path}.pattern: must not be empty"));
    } else if let Some(expr) = wrapped_regex(&rule.pattern) {
        if let Err(e) = Regex::new(expr) {
            violations.push(format!("{path}.pattern: invalid regular expression ({e})"));
        }
    }

    for (j, field) in rule.fields.iter().enumerate() {
        let field_path = format!("{path}.fields[{j}]");
        if field.selector.trim().is_empty() {
            violations.push(format!("{field_path}.selector: must not be empty"));
        } else if let Some(expr) = field.regex_selector() {
            if let Err(e) = Regex::new(expr) {
                violations.push(format!(
                    "{field_path}.selector: invalid regular expression ({e})"
                ));
            }
        }
        if let (Some(min), Some(max)) = (field.min_length, field.max_length) {
            if min > max {
                violations.push(format!(
                    "{field_path}: minLength {min} exceeds maxLength {max}"
                ));
            }
        }
    }

    if rule.variants.is_empty() {
        violations.push(format!("{path}.variants: at least one variant is required"));
    } else if rule.variant(&rule.active_variant_id).is_none() {
        violations.push(format!(
            "{path}.activeVariantId: does not reference a variant"
        ));
    }

    for (j, variant) in rule.variants.iter().enumerate() {
        let variant_path = format!("{path}.variants[{j}]");
        for field_id in variant.values.keys() {
            if rule.field(field_id).is_none() {
                violations.push(format!(
                    "{variant_path}.values.{field_id}: does not reference a field"
                ));
            }
        }
        for group_id in variant.rows.keys() {
            if !rule.repeat_groups.iter().any(|g| &g.id == group_id) {
                violations.push(format!(
                    "{variant_path}.rows.{group_id}: does not reference a repeat group"
                ));
            }
        }
    }

    for (j, group) in rule.repeat_groups.iter().enumerate() {
        if group.row_selector.trim().is_empty() {
            violations.push(format!(
                "{path}.repeatGroups[{j}].rowSelector: must not be empty"
            ));
        }
    }
}

/// Validate and accept a payload. On success every rule comes back with
/// fresh identities and now-stamped timestamps, ready to append to the
/// stored collection.
pub fn import_rules(payload: ExportPayload) -> Result<Vec<Rule>, ImportError> {
    let violations = validate_payload(&payload);
    if !violations.is_empty() {
        return Err(ImportError::Invalid { violations });
    }
    Ok(payload
        .rules
        .iter()
        .map(Rule::with_fresh_identity)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::types::{FieldMapping, MatchKind, Variant};

    fn sample_rule() -> Rule {
        let mut rule = Rule::new("Checkout", "https://shop.example.com/checkout");
        let mut field = FieldMapping::new(MatchKind::Id, "email");
        field.value = "user-{{inc}}@example.com".to_string();
        rule.fields.push(field);
        rule
    }

    #[test]
    fn test_round_trip_preserves_structure_with_fresh_ids() {
        let mut original = sample_rule();
        // Ensure stamps are observably older than import time.
        original.created_at -= 60_000;
        original.updated_at -= 60_000;

        let payload = export_rules(std::slice::from_ref(&original));
        let json = serde_json::to_string(&payload).unwrap();
        let imported = import_rules(parse_payload(&json).unwrap()).unwrap();

        assert_eq!(imported.len(), 1);
        let copy = &imported[0];
        assert_eq!(copy.name, original.name);
        assert_eq!(copy.pattern, original.pattern);
        assert_eq!(copy.fields.len(), 1);
        assert_eq!(copy.fields[0].value, original.fields[0].value);
        // Ids and timestamps must differ.
        assert_ne!(copy.id, original.id);
        assert_ne!(copy.fields[0].id, original.fields[0].id);
        assert_ne!(copy.created_at, original.created_at);
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let mut payload = export_rules(&[sample_rule()]);
        payload.version = 99;

        let err = import_rules(payload).unwrap_err();
        match err {
            ImportError::Invalid { violations } => {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].starts_with("version:"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_violations_joined_as_path_message() {
        let mut bad = sample_rule();
        bad.name = String::new();
        bad.fields[0].selector = String::new();
        bad.active_variant_id = "dangling".to_string();
        let mut payload = export_rules(&[bad]);
        payload.version = 99;

        let err = import_rules(payload).unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Import rejected:\n"));
        assert!(message.contains("version: unsupported"));
        assert!(message.contains("rules[0].name: must not be empty"));
        assert!(message.contains("rules[0].fields[0].selector: must not be empty"));
        assert!(message.contains("rules[0].activeVariantId: does not reference a variant"));
    }

    #[test]
    fn test_all_or_nothing() {
        let good = sample_rule();
        let mut bad = sample_rule();
        bad.pattern = String::new();
        let payload = export_rules(&[good, bad]);

        // One bad rule aborts the whole import.
        assert!(import_rules(payload).is_err());
    }

    #[test]
    fn test_invalid_regex_pattern_rejected() {
        let mut rule = sample_rule();
        rule.pattern = "/[unclosed/".to_string();
        let payload = export_rules(&[rule]);

        let err = import_rules(payload).unwrap_err();
        assert!(err.to_string().contains("invalid regular expression"));
    }

    #[test]
    fn test_variant_value_keys_validated() {
        let mut rule = sample_rule();
        let mut variant = Variant::new("Alt");
        variant.values.insert("nope".to_string(), "x".to_string());
        rule.variants.push(variant);
        let payload = export_rules(&[rule]);

        let err = import_rules(payload).unwrap_err();
        assert!(err
            .to_string()
            .contains("variants[1].values.nope: does not reference a field"));
    }

    #[test]
    fn test_length_bounds_validated() {
        let mut rule = sample_rule();
        rule.fields[0].min_length = Some(50);
        rule.fields[0].max_length = Some(10);
        let payload = export_rules(&[rule]);

        let err = import_rules(payload).unwrap_err();
        assert!(err.to_string().contains("minLength 50 exceeds maxLength 10"));
    }

    #[test]
    fn test_older_supported_version_accepted() {
        let mut payload = export_rules(&[sample_rule()]);
        payload.version = 1;
        assert!(import_rules(payload).is_ok());
    }
}

//! Default-rule resolution: pick the rule to run unattended for a URL.

use crate::matcher::{calculate_pattern_specificity, matches_url};
use crate::rules::types::{DefaultMapping, Rule};

/// A resolved default: the winning mapping and the rule it references.
#[derive(Debug, Clone, Copy)]
pub struct DefaultMatch<'a> {
    pub rule: &'a Rule,
    pub mapping: &'a DefaultMapping,
}

/// Resolve the default rule for `url` among the recorded mappings.
///
/// A mapping is a candidate only if its pattern matches the URL and the
/// referenced rule exists, is enabled, is not archived, and still carries the
/// exact pattern the mapping remembers. A rule-pattern edit leaves the old
/// mapping behind as stale; stale mappings are excluded here, not honored.
///
/// Among candidates the highest specificity wins; ties go to the
/// first-inserted mapping. Returns `None` when nothing survives, in which
/// case the caller falls back to a manual rule picker.
pub fn resolve_default<'a>(
    url: &str,
    mappings: &'a [DefaultMapping],
    rules: &'a [Rule],
) -> Option<DefaultMatch<'a>> {
    let mut best: Option<(u32, DefaultMatch<'a>)> = None;

    for mapping in mappings {
        if !matches_url(&mapping.pattern, url) {
            continue;
        }
        let Some(rule) = rules.iter().find(|r| r.id == mapping.rule_id) else {
            continue;
        };
        if !rule.enabled || rule.archived || rule.pattern != mapping.pattern {
            continue;
        }

        let score = calculate_pattern_specificity(&mapping.pattern);
        let replace = match best {
            Some((top, _)) => score > top,
            None => true,
        };
        if replace {
            best = Some((score, DefaultMatch { rule, mapping }));
        }
    }

    best.map(|(_, matched)| matched)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(pattern: &str, rule_id: &str) -> DefaultMapping {
        DefaultMapping {
            pattern: pattern.to_string(),
            rule_id: rule_id.to_string(),
            created_at: 0,
        }
    }

    #[test]
    fn test_highest_specificity_wins() {
        let broad = Rule::new("broad", "https://example.com/*");
        let narrow = Rule::new("narrow", "https://example.com/login");
        let rules = vec![broad.clone(), narrow.clone()];
        let mappings = vec![
            mapping("https://example.com/*", &broad.id),
            mapping("https://example.com/login", &narrow.id),
        ];

        let matched = resolve_default("https://example.com/login", &mappings, &rules).unwrap();
        assert_eq!(matched.rule.id, narrow.id);
    }

    #[test]
    fn test_stale_mapping_excluded() {
        // The rule's pattern was edited after the mapping was recorded; the
        // mapping still textually matches the URL but must not resolve.
        let mut rule = Rule::new("edited", "https://example.com/*");
        let mappings = vec![mapping("https://example.com/*", &rule.id)];
        rule.pattern = "https://example.com/other/*".to_string();
        let rules = vec![rule];

        assert!(resolve_default("https://example.com/login", &mappings, &rules).is_none());
    }

    #[test]
    fn test_disabled_and_archived_rules_excluded() {
        let mut disabled = Rule::new("off", "https://example.com/*");
        disabled.enabled = false;
        let mut archived = Rule::new("archived", "https://example.com/*");
        archived.archived = true;
        let mappings = vec![
            mapping("https://example.com/*", &disabled.id),
            mapping("https://example.com/*", &archived.id),
        ];
        let rules = vec![disabled, archived];

        assert!(resolve_default("https://example.com/x", &mappings, &rules).is_none());
    }

    #[test]
    fn test_missing_rule_excluded() {
        let mappings = vec![mapping("*", "gone")];
        assert!(resolve_default("https://example.com/", &mappings, &[]).is_none());
    }

    #[test]
    fn test_tie_breaks_to_first_inserted() {
        // Two regex patterns of equal length score identically and both match
        // the URL; the first-inserted mapping must win.
        let first = Rule::new("first", "/login$/");
        let second = Rule::new("second", "/.ogin$/");
        let rules = vec![first.clone(), second.clone()];
        let mappings = vec![
            mapping(&first.pattern, &first.id),
            mapping(&second.pattern, &second.id),
        ];

        let matched = resolve_default("https://example.com/login", &mappings, &rules).unwrap();
        assert_eq!(matched.rule.id, first.id);
    }
}

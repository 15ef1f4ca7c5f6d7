//! Placeholder scanning and template resolution for dynamic field values.
//!
//! Templates are ordinary strings with embedded `{{...}}` placeholders:
//!
//! - `{{inc}}` / `{{inc:N}}` - the rule's carry-through counter
//! - `{{random}}` / `{{random:N}}` - N random alphanumeric characters
//! - `{{pick:a,b,c}}` - one item chosen at random
//! - `{{date}}` / `{{date:FORMAT}}` - the current local date/time
//! - `{{regex:[PATTERN]}}` - a generated string matching PATTERN
//! - `{{title:MIN,MAX}}` / `{{desc:MIN,MAX}}` - length-constrained generated text
//!
//! Placeholders resolve independently, left to right; only `inc` advances the
//! counter, and later occurrences in the same template observe the counter
//! value left by earlier ones. A string with no placeholders is a static
//! value, not a malformed template.

pub mod generators;
mod regex_gen;

pub use regex_gen::generate_from_pattern;

use chrono::Local;

/// Placeholder type tags recognized by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    Inc,
    Random,
    Pick,
    Date,
    Regex,
    Title,
    Desc,
    /// Unrecognized type: resolves to its own verbatim text (fail-soft).
    Unknown,
}

/// One scanned placeholder. Ephemeral: produced and consumed within a single
/// template resolution call.
#[derive(Debug, Clone)]
pub struct Placeholder<'a> {
    pub kind: PlaceholderKind,
    /// The verbatim matched text, used for substring replacement.
    pub raw: &'a str,
    /// Byte offset of `raw` within the template.
    pub start: usize,
    /// The parameter string after the `:`, if any.
    pub param: Option<&'a str>,
}

/// Result of resolving a template: the produced value and the counter after
/// any `inc` placeholders advanced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub counter: u64,
}

/// Scan a template for placeholders, in order of appearance.
pub fn scan(template: &str) -> Vec<Placeholder<'_>> {
    let mut found = Vec::new();
    let mut i = 0;

    while let Some(open) = template[i..].find("{{").map(|p| p + i) {
        let body_start = open + 2;
        let rest = &template[body_start..];

        // The regex form is bracket-delimited so the pattern may itself
        // contain `}`.
        if prefix_matches_ci(rest, "regex:[") {
            if let Some(close) = rest["regex:[".len()..].find("]}}") {
                let pattern_start = body_start + "regex:[".len();
                let end = pattern_start + close + "]}}".len();
                found.push(Placeholder {
                    kind: PlaceholderKind::Regex,
                    raw: &template[open..end],
                    start: open,
                    param: Some(&template[pattern_start..pattern_start + close]),
                });
                i = end;
                continue;
            }
            // No `]}}` terminator: fall through and scan as a generic body.
        }

        let Some(close) = rest.find("}}") else {
            break;
        };
        let body = &rest[..close];
        if let Some(inner) = body.find("{{") {
            // `{{` reopened before closing: the real placeholder starts there.
            i = body_start + inner;
            continue;
        }
        let end = body_start + close + 2;
        let (kind, param) = match body.split_once(':') {
            Some((ty, params)) => (kind_of(ty), Some(params)),
            None => (kind_of(body), None),
        };
        found.push(Placeholder {
            kind,
            raw: &template[open..end],
            start: open,
            param,
        });
        i = end;
    }

    found
}

/// Check if a string contains any placeholders.
///
/// Pure predicate over the same scan as [`resolve_template`]; never touches a
/// counter.
pub fn has_placeholders(template: &str) -> bool {
    !scan(template).is_empty()
}

/// Resolve every placeholder in `template`, threading `counter` through
/// sequential `{{inc}}` occurrences.
///
/// Templates without placeholders come back unchanged with the counter
/// untouched.
pub fn resolve_template(template: &str, counter: u64) -> Resolved {
    let placeholders = scan(template);
    if placeholders.is_empty() {
        return Resolved {
            value: template.to_string(),
            counter,
        };
    }

    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;
    let mut counter = counter;

    for placeholder in placeholders {
        out.push_str(&template[cursor..placeholder.start]);
        out.push_str(&resolve_one(&placeholder, &mut counter));
        cursor = placeholder.start + placeholder.raw.len();
    }
    out.push_str(&template[cursor..]);

    Resolved { value: out, counter }
}

fn resolve_one(placeholder: &Placeholder<'_>, counter: &mut u64) -> String {
    match placeholder.kind {
        PlaceholderKind::Inc => {
            // The offset is emitted on top of the counter; the counter itself
            // advances by exactly one either way.
            let offset = placeholder
                .param
                .and_then(|p| p.trim().parse::<i64>().ok())
                .unwrap_or(0);
            let emitted = offset + *counter as i64;
            *counter += 1;
            emitted.to_string()
        }
        PlaceholderKind::Random => {
            let len = placeholder
                .param
                .and_then(|p| p.trim().parse::<usize>().ok())
                .unwrap_or(generators::DEFAULT_RANDOM_LEN);
            generators::random_alphanumeric(len)
        }
        PlaceholderKind::Pick => generators::pick(placeholder.param.unwrap_or("")),
        PlaceholderKind::Date => generators::format_date(
            placeholder.param.unwrap_or(generators::DEFAULT_DATE_FORMAT),
            Local::now(),
        ),
        PlaceholderKind::Regex => {
            // The scanner already stripped the bracket delimiters; the param
            // is the pattern verbatim (it may itself start with `[`).
            generate_from_pattern(placeholder.param.unwrap_or_default())
        }
        PlaceholderKind::Title => {
            let (min, max) = parse_bounds(placeholder.param);
            generators::title(min, max)
        }
        PlaceholderKind::Desc => {
            let (min, max) = parse_bounds(placeholder.param);
            generators::desc(min, max)
        }
        PlaceholderKind::Unknown => placeholder.raw.to_string(),
    }
}

fn kind_of(ty: &str) -> PlaceholderKind {
    // Type names are case-insensitive.
    if ty.eq_ignore_ascii_case("inc") {
        PlaceholderKind::Inc
    } else if ty.eq_ignore_ascii_case("random") {
        PlaceholderKind::Random
    } else if ty.eq_ignore_ascii_case("pick") {
        PlaceholderKind::Pick
    } else if ty.eq_ignore_ascii_case("date") {
        PlaceholderKind::Date
    } else if ty.eq_ignore_ascii_case("regex") {
        PlaceholderKind::Regex
    } else if ty.eq_ignore_ascii_case("title") {
        PlaceholderKind::Title
    } else if ty.eq_ignore_ascii_case("desc") {
        PlaceholderKind::Desc
    } else {
        PlaceholderKind::Unknown
    }
}

fn prefix_matches_ci(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

/// Parse `MIN,MAX` bounds; either side may be absent or unparseable.
fn parse_bounds(param: Option<&str>) -> (Option<usize>, Option<usize>) {
    let Some(param) = param else {
        return (None, None);
    };
    let (min, max) = match param.split_once(',') {
        Some((min, max)) => (min, max),
        None => (param, ""),
    };
    (
        min.trim().parse::<usize>().ok(),
        max.trim().parse::<usize>().ok(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_static_string_passes_through() {
        let resolved = resolve_template("just a plain value", 3);
        assert_eq!(resolved.value, "just a plain value");
        assert_eq!(resolved.counter, 3);
    }

    #[test]
    fn test_inc_threads_counter() {
        let resolved = resolve_template("{{inc}}-{{inc}}", 5);
        assert_eq!(resolved.value, "5-6");
        assert_eq!(resolved.counter, 7);
    }

    #[test]
    fn test_inc_with_offset() {
        let resolved = resolve_template("{{inc:100}}", 5);
        assert_eq!(resolved.value, "105");
        assert_eq!(resolved.counter, 6);
    }

    #[test]
    fn test_inc_offset_does_not_compound() {
        let resolved = resolve_template("{{inc:100}}/{{inc}}", 0);
        assert_eq!(resolved.value, "100/1");
        assert_eq!(resolved.counter, 2);
    }

    #[test]
    fn test_type_names_case_insensitive() {
        let resolved = resolve_template("{{INC}}", 9);
        assert_eq!(resolved.value, "9");
        assert_eq!(resolved.counter, 10);
    }

    #[test]
    fn test_random_lengths() {
        let resolved = resolve_template("{{random}}", 0);
        assert_eq!(resolved.value.len(), 8);
        assert!(resolved.value.chars().all(|c| c.is_ascii_alphanumeric()));

        let resolved = resolve_template("{{random:20}}", 0);
        assert_eq!(resolved.value.len(), 20);

        // Non-numeric length falls back to the default.
        let resolved = resolve_template("{{random:lots}}", 0);
        assert_eq!(resolved.value.len(), 8);
    }

    #[test]
    fn test_pick_trims_and_chooses() {
        for _ in 0..20 {
            let resolved = resolve_template("{{pick: red , green ,blue}}", 0);
            assert!(["red", "green", "blue"].contains(&resolved.value.as_str()));
        }
        assert_eq!(resolve_template("{{pick:}}", 0).value, "");
    }

    #[test]
    fn test_unknown_type_left_verbatim() {
        let resolved = resolve_template("x-{{bogus:1}}-y", 2);
        assert_eq!(resolved.value, "x-{{bogus:1}}-y");
        assert_eq!(resolved.counter, 2);
    }

    #[test]
    fn test_regex_placeholder_generates_match() {
        let resolved = resolve_template("{{regex:[[a-c]{3}]}}", 0);
        assert_eq!(resolved.value.len(), 3);
        assert!(resolved.value.chars().all(|c| ('a'..='c').contains(&c)));
    }

    #[test]
    fn test_regex_pattern_may_itself_be_a_class() {
        // The delimiters are the outer brackets; the pattern keeps its own.
        let resolved = resolve_template("{{regex:[[a-c]]}}", 0);
        assert_eq!(resolved.value.len(), 1);
        assert!(('a'..='c').contains(&resolved.value.chars().next().unwrap()));
    }

    #[test]
    fn test_regex_pattern_may_contain_closing_brace() {
        let resolved = resolve_template("{{regex:[x{2}]}}", 0);
        assert_eq!(resolved.value, "xx");
    }

    #[test]
    fn test_invalid_regex_emits_marker() {
        let resolved = resolve_template("{{regex:[[]}}", 0);
        assert!(resolved.value.contains('['), "marker names the pattern: {}", resolved.value);
        assert!(resolved.value.contains("invalid"));
    }

    #[test]
    fn test_mixed_template() {
        let resolved = resolve_template("user-{{inc}}@{{pick:example.com}}", 41);
        assert_eq!(resolved.value, "user-41@example.com");
        assert_eq!(resolved.counter, 42);
    }

    #[test]
    fn test_unterminated_placeholder_is_static() {
        let resolved = resolve_template("{{inc", 1);
        assert_eq!(resolved.value, "{{inc");
        assert_eq!(resolved.counter, 1);
    }

    #[test]
    fn test_reopened_braces_resolve_inner() {
        let resolved = resolve_template("{{a{{inc}}", 7);
        assert_eq!(resolved.value, "{{a7");
        assert_eq!(resolved.counter, 8);
    }

    #[test]
    fn test_has_placeholders() {
        assert!(has_placeholders("{{inc}}"));
        assert!(has_placeholders("x {{date:YYYY}} y"));
        assert!(has_placeholders("{{regex:[a+]}}"));
        // Unknown types still scan as placeholders (they resolve verbatim).
        assert!(has_placeholders("{{whatever}}"));
        assert!(!has_placeholders("no placeholders here"));
        assert!(!has_placeholders("{{unterminated"));
    }

    #[test]
    fn test_title_bounds() {
        let value = resolve_template("{{title:20,40}}", 0).value;
        let len = value.chars().count();
        assert!(len >= 20, "title too short: {len} ({value})");
        // The ellipsis marker may follow a cut at the max.
        assert!(len <= 41, "title too long: {len} ({value})");
        assert!(!value.ends_with('.'));
    }

    #[test]
    fn test_desc_bounds() {
        let value = resolve_template("{{desc:50,120}}", 0).value;
        let len = value.chars().count();
        assert!(len >= 50, "desc too short: {len}");
        assert!(len <= 121, "desc too long: {len}");
    }

    proptest! {
        #[test]
        fn prop_no_placeholders_means_identity(s in "[^{]*") {
            let resolved = resolve_template(&s, 17);
            prop_assert_eq!(resolved.value, s);
            prop_assert_eq!(resolved.counter, 17);
        }

        #[test]
        fn prop_counter_advances_once_per_inc(n in 0u64..1000, occurrences in 1usize..6) {
            let template = vec!["{{inc}}"; occurrences].join(" ");
            let resolved = resolve_template(&template, n);
            prop_assert_eq!(resolved.counter, n + occurrences as u64);
        }
    }
}

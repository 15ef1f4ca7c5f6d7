use crate::rules::types::wrapped_regex;
use regex::{Regex, RegexBuilder};

/// Patterns that match every URL.
pub const MATCH_ALL: &str = "*";
pub const ALL_URLS: &str = "<all_urls>";

/// Regex patterns rank in a band of their own, above any wildcard score.
const REGEX_RANK_BASE: u32 = 10_000;

/// Check whether `url` matches a rule's URL pattern.
///
/// Three pattern forms are supported:
/// - `*` / `<all_urls>` match everything
/// - `/EXPR/` is a raw regular expression tested against the URL; an invalid
///   expression matches nothing
/// - anything else is a wildcard pattern: literal except `*`, which matches
///   any run of characters; anchored and case-insensitive
pub fn matches_url(pattern: &str, url: &str) -> bool {
    if pattern == MATCH_ALL || pattern == ALL_URLS {
        return true;
    }
    if let Some(expr) = wrapped_regex(pattern) {
        return match Regex::new(expr) {
            Ok(re) => re.is_match(url),
            Err(_) => false,
        };
    }
    match RegexBuilder::new(&wildcard_to_regex(pattern))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.is_match(url),
        Err(_) => false,
    }
}

/// Escape a wildcard pattern for regex use, turning each `*` into `.*`.
fn wildcard_to_regex(pattern: &str) -> String {
    let escaped: Vec<String> = pattern.split('*').map(|part| regex::escape(part)).collect();
    format!("^{}$", escaped.join(".*"))
}

/// Rank a pattern for default-rule resolution.
///
/// The score is a monotone ranking used only for relative ordering:
/// regex patterns outrank wildcard patterns (among themselves, longer wins),
/// wildcard patterns accumulate points for literal scheme/host/path parts,
/// and the catch-all patterns rank lowest at 0.
pub fn calculate_pattern_specificity(pattern: &str) -> u32 {
    if pattern == MATCH_ALL || pattern == ALL_URLS {
        return 0;
    }
    if wrapped_regex(pattern).is_some() {
        return REGEX_RANK_BASE + 300 + pattern.len() as u32;
    }

    let (scheme, rest) = match pattern.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, pattern),
    };
    let (host, path) = match rest.split_once('/') {
        Some((host, path)) => (host, path),
        None => (rest, ""),
    };

    let mut score = 0u32;
    if scheme.is_some_and(|s| s != "*") {
        score += 100;
    }
    if !host.starts_with('*') {
        score += 200;
    }
    score += 10 * host.split('.').count().saturating_sub(1) as u32;
    score += 50 * path.split('/').filter(|segment| !segment.is_empty()).count() as u32;
    if !path.contains('*') {
        // Fully literal path.
        score += 500;
    }

    // Wildcard scores stay below the regex band.
    score.min(REGEX_RANK_BASE - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_all_patterns() {
        assert!(matches_url("*", "https://example.com/anything?q=1"));
        assert!(matches_url("<all_urls>", "ftp://weird.example/path"));
        assert!(matches_url("*", ""));
    }

    #[test]
    fn test_wildcard_pattern() {
        assert!(matches_url(
            "https://*.example.com/login",
            "https://app.example.com/login"
        ));
        assert!(!matches_url(
            "https://*.example.com/login",
            "https://app.example.com/login/extra"
        ));
        // Case-insensitive.
        assert!(matches_url("https://example.com/*", "HTTPS://EXAMPLE.COM/x"));
        // Literal characters are escaped, not treated as regex.
        assert!(!matches_url("https://example.com/a.b", "https://example.com/aXb"));
    }

    #[test]
    fn test_regex_pattern() {
        assert!(matches_url("/^foo/", "foobar"));
        assert!(!matches_url("/^foo$/", "foobar"));
        assert!(matches_url("/example\\.(com|org)/", "https://example.org/x"));
    }

    #[test]
    fn test_invalid_regex_matches_nothing() {
        assert!(!matches_url("/[/", "x"));
        assert!(!matches_url("/(unclosed/", "https://example.com/"));
    }

    #[test]
    fn test_specificity_catch_all_is_lowest() {
        assert_eq!(calculate_pattern_specificity("*"), 0);
        assert_eq!(calculate_pattern_specificity("<all_urls>"), 0);
    }

    #[test]
    fn test_specificity_regex_outranks_wildcards() {
        let regex = calculate_pattern_specificity("/^https://example\\.com/login$/");
        let literal = calculate_pattern_specificity("https://example.com/login");
        let starred = calculate_pattern_specificity("https://*.example.com/*");
        assert!(regex > literal);
        assert!(literal > starred);
        assert!(starred > calculate_pattern_specificity("*"));
    }

    #[test]
    fn test_specificity_regex_ranked_by_length() {
        let short = calculate_pattern_specificity("/foo/");
        let long = calculate_pattern_specificity("/^https://example\\.com/accounts/\\d+$/");
        assert!(long > short);
    }

    #[test]
    fn test_specificity_accumulates_literal_parts() {
        // Literal scheme beats wildcard scheme.
        assert!(
            calculate_pattern_specificity("https://example.com/*")
                > calculate_pattern_specificity("*://example.com/*")
        );
        // More path segments rank higher.
        assert!(
            calculate_pattern_specificity("https://example.com/a/b/*")
                > calculate_pattern_specificity("https://example.com/a/*")
        );
        // Fully literal path beats a starred one.
        assert!(
            calculate_pattern_specificity("https://example.com/login")
                > calculate_pattern_specificity("https://example.com/login/*")
        );
        // Extra host labels rank higher.
        assert!(
            calculate_pattern_specificity("https://app.eu.example.com/login")
                > calculate_pattern_specificity("https://example.com/login")
        );
    }
}

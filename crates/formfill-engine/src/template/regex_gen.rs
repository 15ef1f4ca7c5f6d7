//! String generation from regular-expression patterns.
//!
//! The pattern is parsed into regex-syntax's HIR and walked directly, which
//! keeps the repetition ceiling explicit: unbounded quantifiers (`*`, `+`,
//! open-ended `{n,}`) expand to at most [`MAX_REPEAT`] repetitions, bounding
//! worst-case output and execution time.

use rand::seq::SliceRandom;
use rand::Rng;
use regex_syntax::hir::{Class, Hir, HirKind};

/// Ceiling applied to unbounded quantifiers.
const MAX_REPEAT: u32 = 10;

/// Printable ASCII range preferred when sampling character classes.
const ASCII_PRINTABLE: (u32, u32) = (0x20, 0x7e);

/// Generate a string matching `pattern`.
///
/// Invalid patterns produce a visible inline error marker naming the pattern
/// rather than an error; template resolution is fail-soft.
pub fn generate_from_pattern(pattern: &str) -> String {
    let mut parser = regex_syntax::Parser::new();
    match parser.parse(pattern) {
        Ok(hir) => {
            let mut out = String::new();
            walk(&hir, &mut rand::thread_rng(), &mut out);
            out
        }
        Err(_) => format!("[invalid regex: {pattern}]"),
    }
}

fn walk<R: Rng>(hir: &Hir, rng: &mut R, out: &mut String) {
    match hir.kind() {
        // Anchors and boundaries contribute no text.
        HirKind::Empty | HirKind::Look(_) => {}
        HirKind::Literal(literal) => {
            if let Ok(text) = std::str::from_utf8(&literal.0) {
                out.push_str(text);
            }
        }
        HirKind::Class(class) => {
            if let Some(c) = sample_class(class, rng) {
                out.push(c);
            }
        }
        HirKind::Repetition(rep) => {
            let min = rep.min;
            let max = rep.max.unwrap_or(min.max(MAX_REPEAT));
            let count = if max > min { rng.gen_range(min..=max) } else { min };
            for _ in 0..count {
                walk(&rep.sub, rng, out);
            }
        }
        HirKind::Capture(capture) => walk(&capture.sub, rng, out),
        HirKind::Concat(parts) => {
            for part in parts {
                walk(part, rng, out);
            }
        }
        HirKind::Alternation(branches) => {
            if let Some(branch) = branches.choose(rng) {
                walk(branch, rng, out);
            }
        }
    }
}

/// Pick one character from a class, preferring printable ASCII so generated
/// values stay readable when the class allows it.
fn sample_class<R: Rng>(class: &Class, rng: &mut R) -> Option<char> {
    let ranges: Vec<(u32, u32)> = match class {
        Class::Unicode(unicode) => unicode
            .ranges()
            .iter()
            .map(|r| (r.start() as u32, r.end() as u32))
            .collect(),
        Class::Bytes(bytes) => bytes
            .ranges()
            .iter()
            .map(|r| (r.start() as u32, r.end() as u32))
            .collect(),
    };
    if ranges.is_empty() {
        return None;
    }

    let printable: Vec<(u32, u32)> = ranges
        .iter()
        .filter_map(|&(start, end)| {
            let start = start.max(ASCII_PRINTABLE.0);
            let end = end.min(ASCII_PRINTABLE.1);
            (start <= end).then_some((start, end))
        })
        .collect();
    let pool = if printable.is_empty() { ranges } else { printable };

    let total: u32 = pool.iter().map(|(start, end)| end - start + 1).sum();
    let mut index = rng.gen_range(0..total);
    for (start, end) in pool {
        let size = end - start + 1;
        if index < size {
            return char::from_u32(start + index).or_else(|| char::from_u32(start));
        }
        index -= size;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn assert_generates_match(pattern: &str) {
        let re = Regex::new(&format!("^(?:{pattern})$")).unwrap();
        for _ in 0..25 {
            let value = generate_from_pattern(pattern);
            assert!(
                re.is_match(&value),
                "generated {value:?} does not match /{pattern}/"
            );
        }
    }

    #[test]
    fn test_literal() {
        assert_eq!(generate_from_pattern("hello"), "hello");
    }

    #[test]
    fn test_classes_and_bounded_repetition() {
        assert_generates_match("[a-z]{4}");
        assert_generates_match("[A-F0-9]{2,6}");
        assert_generates_match("\\d{3}-\\d{4}");
    }

    #[test]
    fn test_alternation() {
        assert_generates_match("foo|bar|baz");
    }

    #[test]
    fn test_groups() {
        assert_generates_match("(ab){2}(c|d)");
    }

    #[test]
    fn test_unbounded_quantifiers_capped() {
        for _ in 0..25 {
            let value = generate_from_pattern("a*");
            assert!(value.len() <= MAX_REPEAT as usize);

            let value = generate_from_pattern("b+");
            assert!(!value.is_empty() && value.len() <= MAX_REPEAT as usize);
        }
    }

    #[test]
    fn test_anchors_ignored() {
        assert_eq!(generate_from_pattern("^fixed$"), "fixed");
    }

    #[test]
    fn test_invalid_pattern_marker() {
        let value = generate_from_pattern("[unclosed");
        assert_eq!(value, "[invalid regex: [unclosed]");
    }

    #[test]
    fn test_dot_stays_printable() {
        for _ in 0..25 {
            let value = generate_from_pattern(".");
            let c = value.chars().next().unwrap();
            assert!((' '..='~').contains(&c), "unexpected char {c:?}");
        }
    }
}

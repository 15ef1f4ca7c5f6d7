//! Value generators backing the placeholder types.

use chrono::{DateTime, Datelike, Local, Timelike};
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;

/// Length used by `{{random}}` when no length is given (or it is not a number).
pub const DEFAULT_RANDOM_LEN: usize = 8;

/// Format used by `{{date}}` when no format is given.
pub const DEFAULT_DATE_FORMAT: &str = "YYYY-MM-DD";

/// Marker appended when generated text is cut mid-content.
pub const ELLIPSIS: char = '\u{2026}';

/// N pseudo-random characters from `[A-Za-z0-9]`.
pub fn random_alphanumeric(len: usize) -> String {
    let rng = rand::thread_rng();
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// One item chosen uniformly at random from a comma-separated list.
///
/// Items are trimmed; an empty parameter list yields an empty string.
pub fn pick(params: &str) -> String {
    if params.trim().is_empty() {
        return String::new();
    }
    let items: Vec<&str> = params.split(',').map(str::trim).collect();
    items
        .choose(&mut rand::thread_rng())
        .map(|item| (*item).to_string())
        .unwrap_or_default()
}

/// Substitute calendar tokens in `format` with values from `now`.
///
/// Two-letter tokens are zero-padded, one-letter tokens are not. Tokens are
/// substituted longest-first so `YYYY` is not partially consumed by `YY`.
pub fn format_date(format: &str, now: DateTime<Local>) -> String {
    let substitutions = [
        ("YYYY", format!("{:04}", now.year())),
        ("YY", format!("{:02}", now.year() % 100)),
        ("MM", format!("{:02}", now.month())),
        ("DD", format!("{:02}", now.day())),
        ("HH", format!("{:02}", now.hour())),
        ("mm", format!("{:02}", now.minute())),
        ("ss", format!("{:02}", now.second())),
        ("M", now.month().to_string()),
        ("D", now.day().to_string()),
        ("H", now.hour().to_string()),
        ("m", now.minute().to_string()),
        ("s", now.second().to_string()),
    ];

    let mut out = format.to_string();
    for (token, value) in substitutions {
        out = out.replace(token, &value);
    }
    out
}

/// A short sentence-like string with no trailing period, padded/truncated to
/// the given bounds.
pub fn title(min: Option<usize>, max: Option<usize>) -> String {
    constrain(min, max, || {
        let sentence: String = Sentence(3..8).fake();
        sentence.trim_end_matches('.').to_string()
    })
}

/// Paragraph-length filler text, padded/truncated to the given bounds.
pub fn desc(min: Option<usize>, max: Option<usize>) -> String {
    constrain(min, max, || Paragraph(2..5).fake())
}

/// Shared length-constraint algorithm for `title`/`desc`.
///
/// Fragments are appended space-joined until the minimum is met; text over
/// the maximum is cut preferring a word boundary no earlier than 70% of the
/// maximum, with an ellipsis marking a mid-content cut.
fn constrain(min: Option<usize>, max: Option<usize>, fragment: impl Fn() -> String) -> String {
    let mut text = fragment();
    if let Some(min) = min {
        while text.chars().count() < min {
            text.push(' ');
            text.push_str(&fragment());
        }
    }
    if let Some(max) = max {
        if text.chars().count() > max {
            text = truncate_at_word_boundary(&text, max);
        }
    }
    text
}

fn truncate_at_word_boundary(text: &str, max: usize) -> String {
    let floor = max * 7 / 10;
    let chars: Vec<char> = text.chars().collect();

    let mut cut = max;
    for i in (floor..=max).rev() {
        if chars.get(i) == Some(&' ') {
            cut = i;
            break;
        }
    }

    let mut out: String = chars[..cut].iter().collect();
    while out.ends_with(' ') {
        out.pop();
    }
    out.push(ELLIPSIS);
    out
}

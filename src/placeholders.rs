//! Placeholder preservation check for translated ARB entries.
//!
//! ARB messages reference arguments as `{name}` and ICU selectors as
//! `{count, plural, ...}`. A translation that drops or renames one of those
//! breaks the app at runtime, so every translated entry is compared against
//! its source.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

/// Extract placeholder names (`{name}` and `{name, plural, ...}`) from text.
pub fn extract_placeholders(text: &str) -> BTreeSet<String> {
    let regex = PLACEHOLDER_REGEX
        .get_or_init(|| Regex::new(r"\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*[,}]").unwrap());

    regex
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Compare placeholders of a source entry and its translation.
///
/// Returns a warning when they differ, `None` when they match.
pub fn check_placeholders(key: &str, source: &str, translated: &str) -> Option<String> {
    let expected = extract_placeholders(source);
    let actual = extract_placeholders(translated);
    if expected == actual {
        return None;
    }

    let missing: Vec<&String> = expected.difference(&actual).collect();
    let unexpected: Vec<&String> = actual.difference(&expected).collect();
    Some(format!(
        "Placeholder mismatch for key '{}': missing {:?}, unexpected {:?}",
        key, missing, unexpected
    ))
}

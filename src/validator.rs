//! Structural validation of ARB bundles.
//!
//! Validation never fails: malformed input degrades to a report with a single
//! structural issue.

use crate::bundle::{is_metadata_key, LOCALE_KEY};
use serde::Serialize;
use serde_json::Value;

/// Result of validating a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// True iff `issues` is empty
    pub valid: bool,

    /// Human-readable problems, in discovery order
    pub issues: Vec<String>,

    /// Number of translatable (non-metadata) keys
    pub key_count: usize,
}

impl ValidationReport {
    fn from_issues(issues: Vec<String>, key_count: usize) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
            key_count,
        }
    }
}

/// Validator for ARB bundle structure.
pub struct BundleValidator;

impl BundleValidator {
    /// Validate raw JSON content.
    ///
    /// Checks run independently:
    /// - the `@@locale` metadata key must be present
    /// - every translatable key must have a non-empty, non-null value
    pub fn validate(content: &Value) -> ValidationReport {
        let Some(map) = content.as_object() else {
            return ValidationReport::from_issues(
                vec!["Content must be a JSON object".to_string()],
                0,
            );
        };

        let mut issues = Vec::new();

        if !map.contains_key(LOCALE_KEY) {
            issues.push("Missing @@locale metadata".to_string());
        }

        let mut key_count = 0;
        for (key, value) in map {
            if is_metadata_key(key) {
                continue;
            }
            key_count += 1;
            if is_empty_value(value) {
                issues.push(format!("Empty value for key: {}", key));
            }
        }

        ValidationReport::from_issues(issues, key_count)
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

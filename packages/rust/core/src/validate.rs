//! Content Validator: decides whether a normalized record is publishable.
//!
//! Rejections are diagnostics, not errors. A rejected record is dropped and
//! logged; the build carries on.

use std::collections::HashSet;
use std::ops::Deref;

use serde_json::Value;
use tracing::warn;

use sitepipe_shared::{LocaleBucket, NormalizedRecord};

/// Why a record was not published.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("missing title")]
    MissingTitle,
    #[error("missing slug")]
    MissingSlug,
    #[error("missing category")]
    MissingCategory,
    #[error("missing body")]
    MissingBody,
    #[error("body has no content")]
    EmptyBody,
    #[error("body too short ({len} < {min} characters)")]
    BodyTooShort { len: usize, min: usize },
    #[error("slug '{0}' is not a safe path segment")]
    UnsafeSlug(String),
    #[error("category '{0}' is not a safe path segment")]
    UnsafeCategory(String),
    #[error("duplicate slug '{0}' in category")]
    DuplicateSlug(String),
}

/// Thresholds applied to every record.
#[derive(Debug, Clone)]
pub struct ValidationRules {
    /// Minimum length of the compact JSON serialization of the body.
    pub min_body_len: usize,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self { min_body_len: 50 }
    }
}

/// A record that passed validation. Read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRecord(NormalizedRecord);

impl ValidRecord {
    pub fn record(&self) -> &NormalizedRecord {
        &self.0
    }

    pub fn into_inner(self) -> NormalizedRecord {
        self.0
    }
}

impl Deref for ValidRecord {
    type Target = NormalizedRecord;

    fn deref(&self) -> &NormalizedRecord {
        &self.0
    }
}

/// A dropped record and the reason.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedRecord {
    pub entry_id: String,
    pub locale: LocaleBucket,
    pub slug: String,
    pub reason: Rejection,
}

/// Outcome of validating one locale's records.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Accepted records, in input order.
    pub valid: Vec<ValidRecord>,
    pub rejected: Vec<RejectedRecord>,
}

/// Validate a single record.
pub fn validate(
    record: NormalizedRecord,
    rules: &ValidationRules,
) -> std::result::Result<ValidRecord, Rejection> {
    match rejection(&record, rules) {
        Some(reason) => Err(reason),
        None => Ok(ValidRecord(record)),
    }
}

/// Validate a batch, additionally rejecting repeated `(locale, category, slug)`
/// keys. The first occurrence wins, so callers pass records newest first.
pub fn validate_batch(records: Vec<NormalizedRecord>, rules: &ValidationRules) -> ValidationReport {
    let mut report = ValidationReport::default();
    let mut seen: HashSet<(LocaleBucket, String, String)> = HashSet::new();

    for record in records {
        let entry_id = record.id.clone();
        let locale = record.locale;
        let slug = record.slug.clone();

        let outcome = validate(record, rules).and_then(|valid| {
            let key = (valid.locale, valid.category.clone(), valid.slug.clone());
            if seen.insert(key) {
                Ok(valid)
            } else {
                Err(Rejection::DuplicateSlug(valid.slug.clone()))
            }
        });

        match outcome {
            Ok(valid) => report.valid.push(valid),
            Err(reason) => {
                warn!(entry_id = %entry_id, locale = %locale, slug = %slug, %reason, "record rejected");
                report.rejected.push(RejectedRecord {
                    entry_id,
                    locale,
                    slug,
                    reason,
                });
            }
        }
    }

    report
}

fn rejection(record: &NormalizedRecord, rules: &ValidationRules) -> Option<Rejection> {
    if record.title.trim().is_empty() {
        return Some(Rejection::MissingTitle);
    }
    if record.slug.trim().is_empty() {
        return Some(Rejection::MissingSlug);
    }
    if record.category.trim().is_empty() {
        return Some(Rejection::MissingCategory);
    }
    if !is_safe_segment(&record.slug) {
        return Some(Rejection::UnsafeSlug(record.slug.clone()));
    }
    if !is_safe_segment(&record.category) {
        return Some(Rejection::UnsafeCategory(record.category.clone()));
    }
    if record.body.is_null() {
        return Some(Rejection::MissingBody);
    }
    if !has_content(&record.body) {
        return Some(Rejection::EmptyBody);
    }

    let len = body_len(&record.body);
    if len < rules.min_body_len {
        return Some(Rejection::BodyTooShort {
            len,
            min: rules.min_body_len,
        });
    }

    None
}

/// Characters in the compact JSON serialization.
pub fn body_len(body: &Value) -> usize {
    serde_json::to_string(body)
        .map(|s| s.chars().count())
        .unwrap_or(0)
}

/// Rich-text node types that render something without any text inside.
const LEAF_BLOCKS: &[&str] = &[
    "hr",
    "embedded-asset-block",
    "embedded-entry-block",
    "embedded-entry-inline",
    "embedded-resource-block",
];

/// True when the body holds at least one non-blank text node or a leaf
/// block. A document made only of empty paragraphs has nothing to show.
fn has_content(body: &Value) -> bool {
    match body {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => items.iter().any(has_content),
        Value::Object(map) => match map.get("nodeType").and_then(Value::as_str) {
            Some("text") => map
                .get("value")
                .and_then(Value::as_str)
                .is_some_and(|v| !v.trim().is_empty()),
            Some(kind) if LEAF_BLOCKS.contains(&kind) => true,
            Some(_) => map.get("content").is_some_and(has_content),
            None => !map.is_empty(),
        },
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Letters, digits, `-`, `_`, `.`, `~`; not starting with `.`.
fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment.starts_with('.')
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '~'))
}

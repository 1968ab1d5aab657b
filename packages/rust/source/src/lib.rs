//! Bulk content fetch for the build pipeline.
//!
//! The pipeline never talks to a CMS directly. It asks a [`ContentSource`]
//! for every entry of one locale (or of all locales at once) and receives
//! [`RawEntry`] values whose asset links are already resolved.
//!
//! Two sources exist: [`ContentfulSource`] for the Content Delivery API and
//! [`FileSource`] for offline builds from exported JSON.

mod contentful;
mod file;
mod links;

use std::future::Future;

use serde::Deserialize;
use serde_json::Value;

use sitepipe_shared::{RawEntry, Result, SitePipeError};

pub use contentful::{ContentfulOptions, ContentfulSource};
pub use file::FileSource;

/// User-Agent string for content requests.
const USER_AGENT: &str = concat!("sitepipe/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// FetchScope
// ---------------------------------------------------------------------------

/// Which locales a single bulk fetch covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchScope {
    /// Fields come back as scalars for this locale code.
    Locale(String),
    /// Fields come back as maps keyed by locale code.
    AllLocales,
}

impl FetchScope {
    /// Value for the `locale` query parameter.
    pub fn query_value(&self) -> &str {
        match self {
            Self::Locale(code) => code,
            Self::AllLocales => "*",
        }
    }
}

impl std::fmt::Display for FetchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locale(code) => f.write_str(code),
            Self::AllLocales => f.write_str("all locales"),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentSource
// ---------------------------------------------------------------------------

/// A collaborator that returns every raw entry for a scope, newest first.
///
/// Any error is fatal to the build: the caller must not produce a site from
/// partial data.
pub trait ContentSource {
    /// Short identifier for logs (e.g., "contentful").
    fn name(&self) -> &'static str;

    /// Fetch all entries for the scope.
    fn fetch(&self, scope: &FetchScope) -> impl Future<Output = Result<Vec<RawEntry>>> + Send;
}

// ---------------------------------------------------------------------------
// Response decoding (shared by both sources)
// ---------------------------------------------------------------------------

/// One page of an entries collection response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct EntriesPage {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub includes: links::Includes,
    #[serde(default)]
    pub total: Option<u64>,
}

impl EntriesPage {
    /// Decode a response body. A bare JSON array is accepted as `items`.
    pub(crate) fn from_json(body: &str, origin: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| SitePipeError::parse(format!("{origin}: invalid JSON: {e}")))?;

        match value {
            Value::Array(items) => Ok(Self {
                items,
                ..Self::default()
            }),
            other => serde_json::from_value(other).map_err(|e| {
                SitePipeError::parse(format!("{origin}: unexpected response shape: {e}"))
            }),
        }
    }

    /// Resolve links against `includes` and decode the items.
    pub(crate) fn into_entries(self, origin: &str) -> Result<Vec<RawEntry>> {
        let index = links::LinkIndex::new(&self.includes);
        self.items
            .into_iter()
            .map(|mut item| {
                if let Some(fields) = item.get_mut("fields") {
                    index.resolve(fields);
                }
                serde_json::from_value::<RawEntry>(item).map_err(|e| {
                    SitePipeError::parse(format!("{origin}: malformed entry: {e}"))
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_query_values() {
        assert_eq!(FetchScope::Locale("ru".into()).query_value(), "ru");
        assert_eq!(FetchScope::AllLocales.query_value(), "*");
    }

    #[test]
    fn bare_array_is_accepted() {
        let body = r#"[{"sys":{"id":"a","createdAt":"2024-01-01T00:00:00Z"},"fields":{}}]"#;
        let page = EntriesPage::from_json(body, "test").unwrap();
        let entries = page.into_entries("test").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id(), "a");
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = EntriesPage::from_json("{not json", "test").unwrap_err();
        assert!(matches!(err, SitePipeError::Parse { .. }));
    }

    #[test]
    fn entry_without_sys_is_a_parse_error() {
        let body = r#"{"items":[{"fields":{"title":"x"}}]}"#;
        let page = EntriesPage::from_json(body, "test").unwrap();
        let err = page.into_entries("test").unwrap_err();
        assert!(err.to_string().contains("malformed entry"));
    }
}

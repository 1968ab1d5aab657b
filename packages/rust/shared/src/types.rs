//! Core domain types for the sitepipe content pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// BuildId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one build invocation (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildId(pub Uuid);

impl BuildId {
    /// Generate a new time-sortable build identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Locale buckets & policies
// ---------------------------------------------------------------------------

/// One of the two supported content languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocaleBucket {
    Primary,
    Secondary,
}

impl LocaleBucket {
    /// Both buckets, primary first. Build passes run in this order.
    pub const ALL: [LocaleBucket; 2] = [LocaleBucket::Primary, LocaleBucket::Secondary];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl std::fmt::Display for LocaleBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field missing under the target locale is resolved in all-locales mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
    /// A field absent in the target locale is absent.
    #[default]
    Strict,
    /// A field absent in the target locale takes the primary locale's value.
    FallbackToPrimary,
}

impl std::str::FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "fallback-to-primary" => Ok(Self::FallbackToPrimary),
            other => Err(format!(
                "unknown fallback policy '{other}': expected 'strict' or 'fallback-to-primary'"
            )),
        }
    }
}

/// Shape of the raw entries returned by the content source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchMode {
    /// One fetch per locale; every field is a scalar for that locale.
    /// Locale fallback is whatever the content source applies.
    PerLocale,
    /// One fetch for all locales; every field is a map keyed by locale code
    /// and resolved through the configured [`FallbackPolicy`].
    #[default]
    AllLocales,
}

/// Where newly discovered sitemap URLs are placed relative to the prior set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertOrder {
    /// New entries follow the existing ones.
    #[default]
    Append,
    /// New entries precede the existing ones.
    Prepend,
}

// ---------------------------------------------------------------------------
// RawEntry
// ---------------------------------------------------------------------------

/// `sys` envelope of a content-source entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySys {
    /// Stable identifier assigned by the content source.
    pub id: String,
    /// Creation timestamp.
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    /// Content type id (`sys.contentType.sys.id`), when present.
    #[serde(
        rename = "contentType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<Value>,
}

/// An opaque content-source record.
///
/// Each field value is either a scalar (per-locale fetch) or a map from
/// locale code to value (all-locales fetch). Interpretation is left to the
/// normalizer, which knows the active [`FetchMode`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntry {
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RawEntry {
    pub fn id(&self) -> &str {
        &self.sys.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.sys.created_at
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

// ---------------------------------------------------------------------------
// NormalizedRecord
// ---------------------------------------------------------------------------

/// A flat, single-locale record produced by locale resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    /// Source entry id.
    pub id: String,
    /// Source creation timestamp, used as the sequencing key.
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub slug: String,
    /// Trimmed, lowercased category.
    pub category: String,
    /// Opaque rich-content document.
    pub body: Value,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Resolved asset URL, if any level of the asset chain was present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_alt: String,
    pub locale: LocaleBucket,
}

// ---------------------------------------------------------------------------
// NavLink
// ---------------------------------------------------------------------------

/// Adjacent record within a category partition, or the "none" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NavLink {
    None,
    Target { slug: String, title: String },
}

impl NavLink {
    pub fn target(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self::Target {
            slug: slug.into(),
            title: title.into(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    pub fn slug(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Target { slug, .. } => Some(slug),
        }
    }
}

// ---------------------------------------------------------------------------
// IndexEntry
// ---------------------------------------------------------------------------

/// One listing-page record in `data.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub title: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Canonical site-relative URL.
    pub url: String,
    pub img: String,
    pub alt: String,
    pub category: String,
    /// Language key used by UI consumers to filter the combined index.
    pub lang: String,
}

/// Build the canonical site-relative path for a record.
///
/// `prefix` is the bucket's URL prefix (`""` for primary, `"/ru"` by default
/// for secondary). The same path is used for the index URL, the detail page
/// output file and the sitemap `loc`.
pub fn canonical_path(prefix: &str, category: &str, slug: &str) -> String {
    format!("{prefix}/{category}/{slug}.html")
}

/// Rewrite a protocol-relative asset URL (`//host/x`) to `https://host/x`.
/// Other URLs are returned unchanged.
pub fn https_asset_url(url: &str) -> String {
    match url.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => url.to_string(),
    }
}

/// Language subtag of a locale code (`en-US` → `en`).
pub fn lang_key(locale_code: &str) -> String {
    locale_code
        .split(['-', '_'])
        .next()
        .unwrap_or(locale_code)
        .to_ascii_lowercase()
}

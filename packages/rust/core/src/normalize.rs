//! Locale Normalizer: raw content entry → flat single-locale record.
//!
//! In per-locale mode every field is already a scalar for the requested
//! locale. In all-locales mode each field is a map keyed by locale code and is
//! resolved through the configured [`FallbackPolicy`]. Either way the result
//! is a [`NormalizedRecord`] tagged with its [`LocaleBucket`], or `None` when
//! the entry has no title in that locale.

use serde_json::{Map, Value};
use tracing::trace;

use sitepipe_shared::{
    FallbackPolicy, FetchMode, LocaleBucket, LocaleSettings, NormalizedRecord, RawEntry,
};

/// Raw field names in the content model.
mod field {
    pub const TITLE: &str = "title";
    pub const SLUG: &str = "slug";
    pub const CATEGORY: &str = "category";
    pub const BODY: &str = "body";
    pub const SUMMARY: &str = "summary";
    pub const DATE: &str = "datedTime";
    pub const IMAGE: &str = "featuredImage";
    pub const IMAGE_ALT: &str = "imgAlt";
}

/// Inputs to locale resolution other than the entry itself.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub locales: LocaleSettings,
    pub mode: FetchMode,
    pub policy: FallbackPolicy,
    /// Category used when an entry has none.
    pub default_category: String,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            locales: LocaleSettings::default(),
            mode: FetchMode::default(),
            policy: FallbackPolicy::default(),
            default_category: "dynamics".to_string(),
        }
    }
}

/// Partition key for a category: trimmed and lowercased.
pub fn category_key(category: &str) -> String {
    category.trim().to_lowercase()
}

/// Normalize one entry for one locale bucket.
///
/// Returns `None` when the entry is not applicable to the bucket (no
/// non-empty title after resolution). Missing optional data never fails:
/// an unresolvable image yields `image_url: None`.
pub fn normalize(
    entry: &RawEntry,
    bucket: LocaleBucket,
    opts: &NormalizeOptions,
) -> Option<NormalizedRecord> {
    let resolver = Resolver::new(bucket, opts);
    let fields = &entry.fields;

    let Some(title) = resolver.text(fields, field::TITLE) else {
        trace!(entry_id = entry.id(), %bucket, "no title for locale, skipping entry");
        return None;
    };

    let category = resolver
        .text(fields, field::CATEGORY)
        .map(|c| category_key(&c))
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| category_key(&opts.default_category));

    Some(NormalizedRecord {
        id: entry.id().to_string(),
        created_at: entry.created_at(),
        title,
        slug: resolver.text(fields, field::SLUG).unwrap_or_default(),
        category,
        body: resolver
            .field(fields, field::BODY)
            .map(|body| resolver.localize_body(body))
            .unwrap_or(Value::Null),
        summary: resolver.text(fields, field::SUMMARY).unwrap_or_default(),
        date: resolver.text(fields, field::DATE),
        image_url: resolver.image_url(fields),
        image_alt: resolver.text(fields, field::IMAGE_ALT).unwrap_or_default(),
        locale: bucket,
    })
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

struct Resolver<'a> {
    mode: FetchMode,
    target: &'a str,
    /// Second locale to consult, only under fallback-to-primary.
    fallback: Option<&'a str>,
    /// Every configured locale code, to tell locale maps from plain objects.
    known: [&'a str; 2],
}

impl<'a> Resolver<'a> {
    fn new(bucket: LocaleBucket, opts: &'a NormalizeOptions) -> Self {
        let target = opts.locales.code(bucket);
        let fallback = match (opts.policy, bucket) {
            (FallbackPolicy::FallbackToPrimary, LocaleBucket::Secondary) => {
                Some(opts.locales.code(LocaleBucket::Primary))
            }
            _ => None,
        };
        Self {
            mode: opts.mode,
            target,
            fallback,
            known: [
                opts.locales.code(LocaleBucket::Primary),
                opts.locales.code(LocaleBucket::Secondary),
            ],
        }
    }

    /// Resolve a top-level field. In all-locales mode the value must be a
    /// locale map; anything else is malformed and treated as absent.
    fn field<'v>(&self, fields: &'v Map<String, Value>, name: &str) -> Option<&'v Value> {
        let value = fields.get(name)?;
        match self.mode {
            FetchMode::PerLocale => present(value),
            FetchMode::AllLocales => self.pick(value.as_object()?),
        }
    }

    fn text(&self, fields: &Map<String, Value>, name: &str) -> Option<String> {
        self.field(fields, name).and_then(scalar_text)
    }

    fn pick<'v>(&self, map: &'v Map<String, Value>) -> Option<&'v Value> {
        map.get(self.target)
            .and_then(present)
            .or_else(|| self.fallback.and_then(|code| map.get(code)).and_then(present))
    }

    /// Resolve a value nested inside an asset. It may or may not be
    /// locale-keyed, so it is treated as a locale map only when it carries a
    /// configured locale code as a key.
    fn nested<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        if self.mode == FetchMode::AllLocales {
            if let Some(map) = value.as_object() {
                if self.known.iter().any(|code| map.contains_key(*code)) {
                    return self.pick(map);
                }
            }
        }
        present(value)
    }

    /// Assets embedded in a rich-text body keep their own locale maps in
    /// all-locales mode. Collapse each asset field to the target locale so
    /// the renderer sees plain values; unresolvable fields are dropped.
    fn localize_body(&self, body: &Value) -> Value {
        let mut body = body.clone();
        if self.mode == FetchMode::AllLocales {
            self.localize_assets(&mut body);
        }
        body
    }

    fn localize_assets(&self, node: &mut Value) {
        if node.get("nodeType").and_then(Value::as_str) == Some("embedded-asset-block") {
            if let Some(fields) = node
                .pointer_mut("/data/target/fields")
                .and_then(Value::as_object_mut)
            {
                let resolved: Map<String, Value> = fields
                    .iter()
                    .filter_map(|(name, value)| {
                        self.nested(value).map(|v| (name.clone(), v.clone()))
                    })
                    .collect();
                *fields = resolved;
            }
        }
        if let Some(children) = node.get_mut("content").and_then(Value::as_array_mut) {
            for child in children {
                self.localize_assets(child);
            }
        }
    }

    /// `featuredImage` → `fields` → `file` → `url`, each level optional.
    fn image_url(&self, fields: &Map<String, Value>) -> Option<String> {
        let asset = self.field(fields, field::IMAGE)?;
        let asset_fields = asset.get("fields")?;
        let file = asset_fields.get("file").and_then(|f| self.nested(f))?;
        let url = file.get("url").and_then(|u| self.nested(u))?;
        scalar_text(url)
    }
}

/// `null` and blank strings count as absent.
fn present(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        other => Some(other),
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

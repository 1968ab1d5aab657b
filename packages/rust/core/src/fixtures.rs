//! Shared test fixtures.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use sitepipe_shared::{AppConfig, FetchMode, RawEntry, Result, SitePipeError};
use sitepipe_source::{ContentSource, FetchScope};

use crate::pipeline::BuildConfig;

pub(crate) fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sp-{label}-test-{}", uuid::Uuid::now_v7()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

pub(crate) fn raw_entry(id: &str, created_at: &str, fields: Value) -> RawEntry {
    serde_json::from_value(json!({
        "sys": { "id": id, "createdAt": created_at },
        "fields": fields
    }))
    .unwrap()
}

/// A one-paragraph rich-text document.
pub(crate) fn rich_body(text: &str) -> Value {
    json!({
        "nodeType": "document",
        "data": {},
        "content": [{
            "nodeType": "paragraph",
            "data": {},
            "content": [{ "nodeType": "text", "value": text, "marks": [], "data": {} }]
        }]
    })
}

/// Default config with every path under `root`, fetching per locale.
pub(crate) fn test_config(root: &Path) -> BuildConfig {
    let mut app = AppConfig::default();
    app.site.base_url = "https://example.com".into();
    app.site.output_dir = root.join("dist");
    app.site.sitemap_path = root.join("sitemap.xml");
    app.site.template = root.join("template.html");
    app.site.secondary_template = root.join("template_ru.html");
    app.site.static_assets = vec![];
    app.content.fetch_mode = FetchMode::PerLocale;
    BuildConfig::from_app(&app)
}

/// In-memory content source.
pub(crate) enum MemorySource {
    PerLocale(HashMap<String, Vec<RawEntry>>),
    AllLocales(Vec<RawEntry>),
    Failing,
}

impl MemorySource {
    pub(crate) fn per_locale<const N: usize>(locales: [(&str, Vec<RawEntry>); N]) -> Self {
        Self::PerLocale(
            locales
                .into_iter()
                .map(|(code, entries)| (code.to_string(), entries))
                .collect(),
        )
    }

    pub(crate) fn all_locales(entries: Vec<RawEntry>) -> Self {
        Self::AllLocales(entries)
    }

    pub(crate) fn failing() -> Self {
        Self::Failing
    }
}

impl ContentSource for MemorySource {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn fetch(&self, scope: &FetchScope) -> impl Future<Output = Result<Vec<RawEntry>>> + Send {
        let outcome = match (self, scope) {
            (Self::PerLocale(map), FetchScope::Locale(code)) => {
                Ok(map.get(code).cloned().unwrap_or_default())
            }
            (Self::AllLocales(entries), FetchScope::AllLocales) => Ok(entries.clone()),
            (Self::Failing, _) => Err(SitePipeError::Fetch("memory: connection refused".into())),
            (_, scope) => Err(SitePipeError::Fetch(format!("memory: unexpected scope {scope}"))),
        };
        async move { outcome }
    }
}

//! Index Aggregator: valid records → `data.json` listing entries.

use sha2::{Digest, Sha256};

use sitepipe_shared::{IndexEntry, LocaleSettings, https_asset_url};

use crate::normalize::category_key;
use crate::validate::ValidRecord;

// ---------------------------------------------------------------------------
// Placeholder images
// ---------------------------------------------------------------------------

/// A fixed pool of numbered local images (`01.png` .. `NN.png`) used when a
/// record has no resolvable asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderPool {
    dir: String,
    size: u32,
}

impl PlaceholderPool {
    /// `size` of zero is treated as one.
    pub fn new(dir: impl Into<String>, size: u32) -> Self {
        let dir: String = dir.into();
        Self {
            dir: dir.trim_end_matches('/').to_string(),
            size: size.max(1),
        }
    }

    /// Pick an image for `seed`. The same seed always yields the same image.
    pub fn pick(&self, seed: &str) -> String {
        let digest = Sha256::digest(seed.as_bytes());
        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        let n = u64::from_be_bytes(prefix) % u64::from(self.size) + 1;
        format!("{}/{n:02}.png", self.dir)
    }
}

impl Default for PlaceholderPool {
    fn default() -> Self {
        Self::new("/imgs/article_imgs", 43)
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Canonical site-relative URL of a record.
pub fn record_path(record: &ValidRecord, locales: &LocaleSettings) -> String {
    locales.path_for(record.locale, &category_key(&record.category), &record.slug)
}

/// Project one record into its listing entry.
pub fn index_entry(
    record: &ValidRecord,
    locales: &LocaleSettings,
    placeholders: &PlaceholderPool,
) -> IndexEntry {
    let img = match &record.image_url {
        Some(url) => https_asset_url(url),
        None => placeholders.pick(&record.id),
    };
    let alt = if record.image_alt.trim().is_empty() {
        record.title.clone()
    } else {
        record.image_alt.clone()
    };

    IndexEntry {
        title: record.title.clone(),
        summary: record.summary.clone(),
        date: record.date.clone(),
        url: record_path(record, locales),
        img,
        alt,
        category: category_key(&record.category),
        lang: locales.lang(record.locale),
    }
}

/// Index entries for one locale, in record order.
pub fn build_index(
    records: &[ValidRecord],
    locales: &LocaleSettings,
    placeholders: &PlaceholderPool,
) -> Vec<IndexEntry> {
    records
        .iter()
        .map(|r| index_entry(r, locales, placeholders))
        .collect()
}

/// Concatenate per-locale indices into the combined view.
pub fn combine<'a>(indices: impl IntoIterator<Item = &'a [IndexEntry]>) -> Vec<IndexEntry> {
    indices.into_iter().flatten().cloned().collect()
}

/// Join a site-relative path onto the site base URL.
pub fn absolute_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{ValidationRules, validate};
    use chrono::Utc;
    use serde_json::json;
    use sitepipe_shared::{LocaleBucket, NormalizedRecord};

    fn record(locale: LocaleBucket, category: &str, slug: &str) -> ValidRecord {
        let normalized = NormalizedRecord {
            id: format!("{locale}-{slug}"),
            created_at: Utc::now(),
            title: "Foo".into(),
            slug: slug.into(),
            category: category.into(),
            body: json!("body text long enough to pass the default minimum length"),
            summary: "Sum".into(),
            date: Some("2024-05-01".into()),
            image_url: None,
            image_alt: String::new(),
            locale,
        };
        validate(normalized, &ValidationRules::default()).unwrap()
    }

    #[test]
    fn url_applies_locale_prefix() {
        let locales = LocaleSettings::default();
        let pool = PlaceholderPool::default();

        let ru = index_entry(&record(LocaleBucket::Secondary, "News", "foo"), &locales, &pool);
        assert_eq!(ru.url, "/ru/news/foo.html");
        assert_eq!(ru.lang, "ru");
        assert_eq!(ru.category, "news");

        let en = index_entry(&record(LocaleBucket::Primary, "News", "foo"), &locales, &pool);
        assert_eq!(en.url, "/news/foo.html");
        assert_eq!(en.lang, "en");
    }

    #[test]
    fn asset_url_is_made_https() {
        let mut normalized = record(LocaleBucket::Primary, "news", "foo").into_inner();
        normalized.image_url = Some("//images.ctfassets.net/a.png".into());
        normalized.image_alt = "Chart".into();
        let valid = validate(normalized, &ValidationRules::default()).unwrap();

        let entry = index_entry(&valid, &LocaleSettings::default(), &PlaceholderPool::default());
        assert_eq!(entry.img, "https://images.ctfassets.net/a.png");
        assert_eq!(entry.alt, "Chart");
    }

    #[test]
    fn missing_asset_uses_placeholder_and_title_alt() {
        let pool = PlaceholderPool::new("/imgs/article_imgs/", 43);
        let entry = index_entry(
            &record(LocaleBucket::Primary, "news", "foo"),
            &LocaleSettings::default(),
            &pool,
        );
        assert!(entry.img.starts_with("/imgs/article_imgs/"));
        assert!(entry.img.ends_with(".png"));
        assert_eq!(entry.alt, "Foo");
    }

    #[test]
    fn placeholder_pick_is_deterministic_and_in_range() {
        let pool = PlaceholderPool::new("/p", 43);
        assert_eq!(pool.pick("entry-1"), pool.pick("entry-1"));

        for i in 0..200 {
            let img = pool.pick(&format!("seed-{i}"));
            let n: u32 = img
                .trim_start_matches("/p/")
                .trim_end_matches(".png")
                .parse()
                .unwrap();
            assert!((1..=43).contains(&n), "{img}");
        }

        assert_eq!(PlaceholderPool::new("/p", 1).pick("anything"), "/p/01.png");
    }

    #[test]
    fn combine_keeps_locale_order() {
        let locales = LocaleSettings::default();
        let pool = PlaceholderPool::default();
        let en = build_index(&[record(LocaleBucket::Primary, "news", "a")], &locales, &pool);
        let ru = build_index(&[record(LocaleBucket::Secondary, "news", "b")], &locales, &pool);

        let all = combine([en.as_slice(), ru.as_slice()]);
        let urls: Vec<_> = all.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(urls, ["/news/a.html", "/ru/news/b.html"]);
    }

    #[test]
    fn absolute_url_joins_without_double_slash() {
        assert_eq!(
            absolute_url("https://example.com/", "/news/a.html"),
            "https://example.com/news/a.html"
        );
    }
}

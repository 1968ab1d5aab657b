//! Site output assembler.
//!
//! Takes the reconciled locale outputs and writes the deployable site:
//!
//! ```text
//! <output_dir>/
//! ├── data.json            combined index, primary then secondary
//! ├── data.en.json         one index per locale bucket
//! ├── data.ru.json
//! ├── sitemap.xml          merged sitemap (also written to site.sitemap_path)
//! ├── news/
//! │   └── some-slug.html
//! ├── ru/
//! │   └── news/
//! │       └── some-slug.html
//! └── <static assets>
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use sitepipe_render::{PageTemplate, PageVars, render_rich_text};
use sitepipe_shared::{
    AppConfig, IndexEntry, LocaleBucket, NavLink, Result, SitePipeError, SitemapConfig,
};
use sitepipe_sitemap::{MergeOptions, SitemapEntry, load_prior, merge, persist};

use crate::index::{absolute_url, combine, index_entry};
use crate::pipeline::{BuildConfig, LocaleOutput, ProgressReporter};
use crate::sequence::SequencedPage;

/// Output-side settings, resolved from `[site]`, `[locales]` and `[sitemap]`.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub base_url: String,
    pub output_dir: PathBuf,
    /// Source-of-truth sitemap read at the start of every build.
    pub sitemap_path: PathBuf,
    pub template: PathBuf,
    pub secondary_template: PathBuf,
    pub static_assets: Vec<PathBuf>,
    pub clean_output: bool,
    /// Secondary-locale display names keyed by category.
    pub category_labels: BTreeMap<String, String>,
    pub sitemap: SitemapConfig,
}

impl OutputConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            base_url: config.site.base_url.clone(),
            output_dir: config.site.output_dir.clone(),
            sitemap_path: config.site.sitemap_path.clone(),
            template: config.site.template.clone(),
            secondary_template: config.site.secondary_template.clone(),
            static_assets: config.site.static_assets.clone(),
            clean_output: config.site.clean_output,
            category_labels: config.locales.category_labels.clone(),
            sitemap: config.sitemap.clone(),
        }
    }
}

/// Sitemap counts for one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SitemapSummary {
    pub total: usize,
    pub added: usize,
    pub refreshed: usize,
}

/// Output from a successful assembly.
#[derive(Debug, Clone)]
pub struct AssembleResult {
    pub pages_written: usize,
    pub index_entries: usize,
    pub sitemap: SitemapSummary,
}

/// Write the complete site for the reconciled `outputs`.
///
/// The prior sitemap is read before the output directory is cleaned, so a
/// sitemap kept inside the output directory survives the rebuild.
#[instrument(skip_all, fields(out = %config.output.output_dir.display(), locales = outputs.len()))]
pub fn assemble(
    config: &BuildConfig,
    outputs: &[LocaleOutput],
    today: NaiveDate,
    progress: &dyn ProgressReporter,
) -> Result<AssembleResult> {
    let out = &config.output;
    let prior = load_prior(&out.sitemap_path);

    prepare_output_dir(&out.output_dir, out.clean_output)?;
    copy_static_assets(&out.static_assets, &out.output_dir)?;

    let index_entries = write_indices(&out.output_dir, outputs)?;
    let pages_written = write_pages(config, outputs, progress)?;
    let sitemap = write_sitemap(out, prior, outputs, today)?;

    info!(
        pages_written,
        index_entries,
        sitemap_total = sitemap.total,
        "site assembly complete"
    );

    Ok(AssembleResult {
        pages_written,
        index_entries,
        sitemap,
    })
}

// ---------------------------------------------------------------------------
// Output directory
// ---------------------------------------------------------------------------

fn prepare_output_dir(dir: &Path, clean: bool) -> Result<()> {
    if clean && dir.exists() {
        if dir.as_os_str().is_empty() || dir == Path::new("/") || dir == Path::new(".") {
            return Err(SitePipeError::validation(format!(
                "refusing to clean output directory '{}'",
                dir.display()
            )));
        }
        std::fs::remove_dir_all(dir).map_err(|e| SitePipeError::io(dir, e))?;
        debug!(path = %dir.display(), "cleaned output directory");
    }
    std::fs::create_dir_all(dir).map_err(|e| SitePipeError::io(dir, e))?;
    Ok(())
}

/// Copy each asset into the output root under its own name. Missing assets
/// are skipped.
fn copy_static_assets(assets: &[PathBuf], output_dir: &Path) -> Result<()> {
    for asset in assets {
        if !asset.exists() {
            debug!(path = %asset.display(), "static asset not found, skipping");
            continue;
        }
        let Some(name) = asset.file_name() else {
            warn!(path = %asset.display(), "static asset has no file name, skipping");
            continue;
        };
        let target = output_dir.join(name);
        if asset.is_dir() {
            copy_dir(asset, &target)?;
        } else {
            std::fs::copy(asset, &target).map_err(|e| SitePipeError::io(asset, e))?;
        }
        debug!(from = %asset.display(), to = %target.display(), "copied static asset");
    }
    Ok(())
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).map_err(|e| SitePipeError::io(to, e))?;
    let entries = std::fs::read_dir(from).map_err(|e| SitePipeError::io(from, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| SitePipeError::io(from, e))?;
        let src = entry.path();
        let dst = to.join(entry.file_name());
        if src.is_dir() {
            copy_dir(&src, &dst)?;
        } else {
            std::fs::copy(&src, &dst).map_err(|e| SitePipeError::io(&src, e))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Indices
// ---------------------------------------------------------------------------

/// Write `data.json` and one `data.{lang}.json` per bucket. Returns the
/// combined entry count.
fn write_indices(output_dir: &Path, outputs: &[LocaleOutput]) -> Result<usize> {
    let combined = combine(outputs.iter().map(|o| o.index.as_slice()));
    write_json(&output_dir.join("data.json"), &combined)?;

    for output in outputs {
        write_json(
            &output_dir.join(format!("data.{}.json", output.lang)),
            &output.index,
        )?;
    }

    Ok(combined.len())
}

fn write_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(|e| {
        SitePipeError::validation(format!("JSON serialization failed: {e}"))
    })?;
    std::fs::write(path, json).map_err(|e| SitePipeError::io(path, e))?;
    debug!(path = %path.display(), "wrote JSON file");
    Ok(())
}

// ---------------------------------------------------------------------------
// Detail pages
// ---------------------------------------------------------------------------

fn write_pages(
    config: &BuildConfig,
    outputs: &[LocaleOutput],
    progress: &dyn ProgressReporter,
) -> Result<usize> {
    let out = &config.output;
    let primary = PageTemplate::load_first(&[&out.template])?;
    let secondary = PageTemplate::load_first(&[&out.secondary_template, &out.template])?;

    let total: usize = outputs.iter().map(|o| o.pages.len()).sum();
    let mut written = 0;

    for output in outputs {
        let template = match output.bucket {
            LocaleBucket::Primary => &primary,
            LocaleBucket::Secondary => &secondary,
        };

        for page in &output.pages {
            let entry = index_entry(
                &page.record,
                &config.normalize.locales,
                &config.placeholders,
            );
            let html = template.fill(&page_vars(config, page, &entry));

            let file_path = out.output_dir.join(entry.url.trim_start_matches('/'));
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| SitePipeError::io(parent, e))?;
            }
            std::fs::write(&file_path, html).map_err(|e| SitePipeError::io(&file_path, e))?;

            written += 1;
            progress.page_written(&entry.url, written, total);
            debug!(path = %file_path.display(), title = %page.record.title, "wrote page");
        }
    }

    Ok(written)
}

fn page_vars(config: &BuildConfig, page: &SequencedPage, entry: &IndexEntry) -> PageVars {
    let record = &page.record;
    let locales = &config.normalize.locales;

    let nav_url = |link: &NavLink| {
        link.slug()
            .map(|slug| locales.path_for(record.locale, &entry.category, slug))
            .unwrap_or_default()
    };
    let nav_title = |link: &NavLink| match link {
        NavLink::Target { title, .. } => title.clone(),
        NavLink::None => String::new(),
    };

    let label = match record.locale {
        LocaleBucket::Primary => entry.category.clone(),
        LocaleBucket::Secondary => config
            .output
            .category_labels
            .get(&entry.category)
            .cloned()
            .unwrap_or_else(|| entry.category.clone()),
    };

    PageVars::new()
        .text("TITLE", &record.title)
        .html("CONTENT", render_rich_text(&record.body))
        .text("DATE", record.date.as_deref().unwrap_or_default())
        .text("SUMMARY", &record.summary)
        .text("IMAGE", &entry.img)
        .text("ALT", &entry.alt)
        .text("CATEGORY", &entry.category)
        .text("CATEGORY_LABEL", label)
        .text("LANG", &entry.lang)
        .text("URL", absolute_url(&config.output.base_url, &entry.url))
        .text("PREV_URL", nav_url(&page.prev))
        .text("PREV_TITLE", nav_title(&page.prev))
        .text("NEXT_URL", nav_url(&page.next))
        .text("NEXT_TITLE", nav_title(&page.next))
}

// ---------------------------------------------------------------------------
// Sitemap
// ---------------------------------------------------------------------------

/// Merge this build's canonical URLs (primary first) into the prior set and
/// persist to both the output and the source-of-truth location.
fn write_sitemap(
    out: &OutputConfig,
    prior: Vec<SitemapEntry>,
    outputs: &[LocaleOutput],
    today: NaiveDate,
) -> Result<SitemapSummary> {
    let new_urls: Vec<String> = outputs
        .iter()
        .flat_map(|o| o.index.iter())
        .map(|e| absolute_url(&out.base_url, &e.url))
        .collect();

    let opts = MergeOptions {
        today,
        priority: out.sitemap.priority,
        changefreq: out.sitemap.changefreq.clone(),
        order: out.sitemap.insert_order,
    };
    let outcome = merge(prior, &new_urls, &opts);

    persist(
        &outcome.entries,
        &[out.output_dir.join("sitemap.xml"), out.sitemap_path.clone()],
    )?;

    Ok(SitemapSummary {
        total: outcome.entries.len(),
        added: outcome.added,
        refreshed: outcome.refreshed,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{raw_entry, rich_body, temp_dir, test_config};
    use crate::pipeline::{SilentProgress, reconcile_locale};
    use serde_json::json;
    use sitepipe_shared::InsertOrder;
    use sitepipe_sitemap::{parse_sitemap, render_sitemap};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn outputs(config: &BuildConfig) -> Vec<LocaleOutput> {
        let en = vec![
            raw_entry(
                "n2",
                "2024-05-03T09:00:00Z",
                json!({ "title": "Newest", "slug": "newest", "category": "news",
                        "datedTime": "2024-05-03", "body": rich_body("The newest story of the week.") }),
            ),
            raw_entry(
                "n1",
                "2024-05-01T09:00:00Z",
                json!({ "title": "Oldest", "slug": "oldest", "category": "news",
                        "body": rich_body("The oldest story of the week.") }),
            ),
        ];
        let ru = vec![raw_entry(
            "r1",
            "2024-05-02T09:00:00Z",
            json!({ "title": "Курс <рубля>", "slug": "kurs", "category": "news",
                    "body": rich_body("Курс рубля снова изменился.") }),
        )];
        vec![
            reconcile_locale(&en, LocaleBucket::Primary, config),
            reconcile_locale(&ru, LocaleBucket::Secondary, config),
        ]
    }

    #[test]
    fn writes_indices_pages_and_sitemap() {
        let tmp = temp_dir("assembler");
        let config = test_config(&tmp);
        let result = assemble(&config, &outputs(&config), today(), &SilentProgress).unwrap();
        let dist = &config.output.output_dir;

        assert_eq!(result.pages_written, 3);
        assert_eq!(result.index_entries, 3);
        assert!(dist.join("data.json").is_file());
        assert!(dist.join("data.en.json").is_file());
        assert!(dist.join("data.ru.json").is_file());
        assert!(dist.join("news/newest.html").is_file());
        assert!(dist.join("ru/news/kurs.html").is_file());

        let written = std::fs::read_to_string(dist.join("sitemap.xml")).unwrap();
        let source_of_truth = std::fs::read_to_string(&config.output.sitemap_path).unwrap();
        assert_eq!(written, source_of_truth);
        let entries = parse_sitemap(&written).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].lastmod.as_deref(), Some("2024-06-01"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn pages_link_within_category() {
        let tmp = temp_dir("assembler-nav");
        let config = test_config(&tmp);
        std::fs::write(
            &config.output.template,
            "{{TITLE}}|{{PREV_URL}}|{{PREV_TITLE}}|{{NEXT_URL}}|{{NEXT_TITLE}}|{{CATEGORY_LABEL}}|{{CONTENT}}",
        )
        .unwrap();
        assemble(&config, &outputs(&config), today(), &SilentProgress).unwrap();
        let dist = &config.output.output_dir;

        let newest = std::fs::read_to_string(dist.join("news/newest.html")).unwrap();
        assert!(newest.starts_with("Newest|/news/oldest.html|Oldest|||news|<p>"));

        let oldest = std::fs::read_to_string(dist.join("news/oldest.html")).unwrap();
        assert!(oldest.starts_with("Oldest|||/news/newest.html|Newest|news|"));

        // No secondary template: the primary one is used, with the label map.
        let ru = std::fs::read_to_string(dist.join("ru/news/kurs.html")).unwrap();
        assert!(ru.starts_with("Курс &lt;рубля&gt;|||||Новости|"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn secondary_template_is_preferred() {
        let tmp = temp_dir("assembler-tpl");
        let config = test_config(&tmp);
        std::fs::write(&config.output.template, "EN {{CONTENT}}").unwrap();
        std::fs::write(&config.output.secondary_template, "RU {{CONTENT}}").unwrap();

        assemble(&config, &outputs(&config), today(), &SilentProgress).unwrap();
        let dist = &config.output.output_dir;

        let en = std::fs::read_to_string(dist.join("news/newest.html")).unwrap();
        let ru = std::fs::read_to_string(dist.join("ru/news/kurs.html")).unwrap();
        assert!(en.starts_with("EN "));
        assert!(ru.starts_with("RU "));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn prior_sitemap_is_preserved_and_extended() {
        let tmp = temp_dir("assembler-prior");
        let mut config = test_config(&tmp);
        config.output.sitemap.insert_order = InsertOrder::Prepend;

        let mut manual = SitemapEntry::new("https://example.com/about.html");
        manual.lastmod = Some("2023-01-01".into());
        std::fs::write(&config.output.sitemap_path, render_sitemap(&[manual])).unwrap();

        let result = assemble(&config, &outputs(&config), today(), &SilentProgress).unwrap();
        assert_eq!(result.sitemap.total, 4);
        assert_eq!(result.sitemap.added, 3);

        let entries =
            parse_sitemap(&std::fs::read_to_string(&config.output.sitemap_path).unwrap()).unwrap();
        assert_eq!(entries[0].loc, "https://example.com/news/newest.html");
        let about = entries.last().unwrap();
        assert_eq!(about.loc, "https://example.com/about.html");
        assert_eq!(about.lastmod.as_deref(), Some("2023-01-01"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn malformed_prior_sitemap_is_treated_as_empty() {
        let tmp = temp_dir("assembler-malformed");
        let config = test_config(&tmp);
        std::fs::write(&config.output.sitemap_path, "<html>not a sitemap").unwrap();

        let result = assemble(&config, &outputs(&config), today(), &SilentProgress).unwrap();
        assert_eq!(result.sitemap.total, 3);
        assert_eq!(result.sitemap.added, 3);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn cleans_output_and_copies_assets() {
        let tmp = temp_dir("assembler-assets");
        let mut config = test_config(&tmp);

        let stale = config.output.output_dir.join("stale.html");
        std::fs::create_dir_all(&config.output.output_dir).unwrap();
        std::fs::write(&stale, "old").unwrap();

        let imgs = tmp.join("imgs");
        std::fs::create_dir_all(imgs.join("article_imgs")).unwrap();
        std::fs::write(imgs.join("article_imgs/01.png"), b"png").unwrap();
        let robots = tmp.join("robots.txt");
        std::fs::write(&robots, "User-agent: *").unwrap();
        config.output.static_assets = vec![imgs, robots, tmp.join("missing.css")];

        assemble(&config, &outputs(&config), today(), &SilentProgress).unwrap();
        let dist = &config.output.output_dir;

        assert!(!stale.exists());
        assert!(dist.join("imgs/article_imgs/01.png").is_file());
        assert!(dist.join("robots.txt").is_file());
        assert!(!dist.join("missing.css").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}

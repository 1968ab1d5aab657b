//! End-to-end build: fetch → normalize → validate → sequence → index → assemble.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, instrument, warn};

use sitepipe_shared::{
    AppConfig, BuildId, FetchMode, IndexEntry, LocaleBucket, NormalizedRecord, RawEntry, Result,
};
use sitepipe_source::{ContentSource, FetchScope};

use crate::assembler::{self, OutputConfig, SitemapSummary};
use crate::index::{PlaceholderPool, build_index};
use crate::normalize::{NormalizeOptions, normalize};
use crate::sequence::{SequencedPage, partition, sequence};
use crate::validate::{RejectedRecord, ValidationRules, validate_batch};

/// Everything a build needs, resolved from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub normalize: NormalizeOptions,
    pub rules: ValidationRules,
    pub placeholders: PlaceholderPool,
    pub output: OutputConfig,
}

impl BuildConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        if config.content.fetch_mode == FetchMode::PerLocale {
            warn!(
                policy = ?config.locales.fallback,
                "per-locale fetch leaves locale fallback to the content source; \
                 the configured fallback policy only applies with fetch_mode = \"all-locales\""
            );
        }
        Self {
            normalize: NormalizeOptions {
                locales: (&config.locales).into(),
                mode: config.content.fetch_mode,
                policy: config.locales.fallback,
                default_category: config.content.default_category.clone(),
            },
            rules: ValidationRules {
                min_body_len: config.content.min_body_len,
            },
            placeholders: PlaceholderPool::new(
                config.content.placeholder_dir.clone(),
                config.content.placeholder_pool_size,
            ),
            output: OutputConfig::from_app(config),
        }
    }
}

/// Per-locale counts reported after reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSummary {
    pub bucket: LocaleBucket,
    /// Content-source locale code.
    pub locale: String,
    pub fetched: usize,
    /// Entries with no title in this locale.
    pub not_applicable: usize,
    pub published: usize,
    pub rejected: usize,
    pub categories: usize,
}

/// Reconciled content of one locale bucket.
#[derive(Debug, Clone)]
pub struct LocaleOutput {
    pub bucket: LocaleBucket,
    /// `IndexEntry.lang` value for this bucket.
    pub lang: String,
    /// Listing entries, newest first.
    pub index: Vec<IndexEntry>,
    /// Detail pages, grouped by category.
    pub pages: Vec<SequencedPage>,
    pub rejected: Vec<RejectedRecord>,
    pub summary: LocaleSummary,
}

/// Result of [`build_site`].
#[derive(Debug)]
pub struct BuildResult {
    pub build_id: BuildId,
    pub per_locale: Vec<LocaleSummary>,
    pub pages_written: usize,
    pub rejected: Vec<RejectedRecord>,
    pub sitemap: SitemapSummary,
    pub elapsed: Duration,
}

/// Result of [`check_site`].
#[derive(Debug)]
pub struct CheckResult {
    pub build_id: BuildId,
    pub per_locale: Vec<LocaleSummary>,
    pub rejected: Vec<RejectedRecord>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a locale bucket has been reconciled.
    fn locale_done(&self, summary: &LocaleSummary);
    /// Called after each detail page is written.
    fn page_written(&self, path: &str, current: usize, total: usize);
    /// Called when the build completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn locale_done(&self, _summary: &LocaleSummary) {}
    fn page_written(&self, _path: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

/// Raw entries for both buckets.
enum Fetched {
    PerLocale {
        primary: Vec<RawEntry>,
        secondary: Vec<RawEntry>,
    },
    /// One all-locales fetch serves both buckets.
    Shared(Vec<RawEntry>),
}

impl Fetched {
    fn entries(&self, bucket: LocaleBucket) -> &[RawEntry] {
        match (self, bucket) {
            (Self::PerLocale { primary, .. }, LocaleBucket::Primary) => primary,
            (Self::PerLocale { secondary, .. }, LocaleBucket::Secondary) => secondary,
            (Self::Shared(entries), _) => entries,
        }
    }
}

/// Fetch everything up front. Any failure aborts the build before a single
/// file is written.
async fn fetch_all<S: ContentSource>(
    source: &S,
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
) -> Result<Fetched> {
    let locales = &config.normalize.locales;

    match config.normalize.mode {
        FetchMode::PerLocale => {
            let primary = fetch_locale(source, locales.code(LocaleBucket::Primary), progress).await?;
            let secondary =
                fetch_locale(source, locales.code(LocaleBucket::Secondary), progress).await?;
            Ok(Fetched::PerLocale { primary, secondary })
        }
        FetchMode::AllLocales => {
            progress.phase(&format!("Fetching all locales from {}", source.name()));
            let entries = source.fetch(&FetchScope::AllLocales).await?;
            info!(count = entries.len(), "fetched entries for all locales");
            Ok(Fetched::Shared(entries))
        }
    }
}

async fn fetch_locale<S: ContentSource>(
    source: &S,
    code: &str,
    progress: &dyn ProgressReporter,
) -> Result<Vec<RawEntry>> {
    let scope = FetchScope::Locale(code.to_string());
    progress.phase(&format!("Fetching {scope} from {}", source.name()));
    let entries = source.fetch(&scope).await?;
    info!(locale = %scope, count = entries.len(), "fetched entries");
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Reconcile
// ---------------------------------------------------------------------------

/// Normalize, validate, sequence and index one locale bucket.
///
/// Pure: no I/O, and rejected records never fail the call.
#[instrument(skip_all, fields(locale = %bucket, entries = entries.len()))]
pub fn reconcile_locale(
    entries: &[RawEntry],
    bucket: LocaleBucket,
    config: &BuildConfig,
) -> LocaleOutput {
    let locales = &config.normalize.locales;

    let mut records: Vec<NormalizedRecord> = entries
        .iter()
        .filter_map(|entry| normalize(entry, bucket, &config.normalize))
        .collect();
    let not_applicable = entries.len() - records.len();

    // Newest first, so the newest record wins a duplicate slug.
    records.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    let report = validate_batch(records, &config.rules);
    let index = build_index(&report.valid, locales, &config.placeholders);
    let groups = partition(&report.valid);
    let pages: Vec<SequencedPage> = groups.iter().flat_map(sequence).collect();

    let summary = LocaleSummary {
        bucket,
        locale: locales.code(bucket).to_string(),
        fetched: entries.len(),
        not_applicable,
        published: report.valid.len(),
        rejected: report.rejected.len(),
        categories: groups.len(),
    };

    info!(
        published = summary.published,
        rejected = summary.rejected,
        not_applicable,
        categories = summary.categories,
        "locale reconciled"
    );

    LocaleOutput {
        bucket,
        lang: locales.lang(bucket),
        index,
        pages,
        rejected: report.rejected,
        summary,
    }
}

async fn reconcile_all<S: ContentSource>(
    source: &S,
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
) -> Result<Vec<LocaleOutput>> {
    let fetched = fetch_all(source, config, progress).await?;

    progress.phase("Reconciling content");
    let outputs = LocaleBucket::ALL
        .iter()
        .map(|&bucket| {
            let output = reconcile_locale(fetched.entries(bucket), bucket, config);
            progress.locale_done(&output.summary);
            output
        })
        .collect();

    Ok(outputs)
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Run the full build and write the site.
///
/// 1. Fetch every locale (fatal on failure)
/// 2. Reconcile primary, then secondary
/// 3. Write indices, detail pages and the merged sitemap
#[instrument(skip_all, fields(source = source.name(), out = %config.output.output_dir.display()))]
pub async fn build_site<S: ContentSource>(
    source: &S,
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
) -> Result<BuildResult> {
    let start = Instant::now();
    let build_id = BuildId::new();

    info!(%build_id, "starting build");

    let outputs = reconcile_all(source, config, progress).await?;

    progress.phase("Writing site");
    let assembled = assembler::assemble(config, &outputs, Utc::now().date_naive(), progress)?;

    let result = BuildResult {
        build_id,
        per_locale: outputs.iter().map(|o| o.summary.clone()).collect(),
        pages_written: assembled.pages_written,
        rejected: outputs.into_iter().flat_map(|o| o.rejected).collect(),
        sitemap: assembled.sitemap,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        build_id = %result.build_id,
        pages = result.pages_written,
        rejected = result.rejected.len(),
        sitemap_total = result.sitemap.total,
        sitemap_added = result.sitemap.added,
        elapsed_ms = result.elapsed.as_millis(),
        "build complete"
    );

    Ok(result)
}

/// Fetch and reconcile without writing anything.
#[instrument(skip_all, fields(source = source.name()))]
pub async fn check_site<S: ContentSource>(
    source: &S,
    config: &BuildConfig,
    progress: &dyn ProgressReporter,
) -> Result<CheckResult> {
    let start = Instant::now();
    let build_id = BuildId::new();

    let outputs = reconcile_all(source, config, progress).await?;

    Ok(CheckResult {
        build_id,
        per_locale: outputs.iter().map(|o| o.summary.clone()).collect(),
        rejected: outputs.into_iter().flat_map(|o| o.rejected).collect(),
        elapsed: start.elapsed(),
    })
}

//! Application configuration for sitepipe.
//!
//! The build reads `sitepipe.toml` from an explicit path, the working
//! directory, or `~/.sitepipe/`, in that order. CLI flags override config
//! file values, which override defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SitePipeError};
use crate::types::{
    FallbackPolicy, FetchMode, InsertOrder, LocaleBucket, canonical_path, lang_key,
};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "sitepipe.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".sitepipe";

// ---------------------------------------------------------------------------
// Config structs (matching sitepipe.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub site: SiteConfig,

    #[serde(default)]
    pub locales: LocalesConfig,

    #[serde(default)]
    pub content: ContentConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub sitemap: SitemapConfig,
}

/// `[site]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Absolute origin used for sitemap `loc` values.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deployable output directory.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Source-of-truth sitemap read at the start of every build.
    #[serde(default = "default_sitemap_path")]
    pub sitemap_path: PathBuf,

    /// Detail page template for the primary locale.
    #[serde(default = "default_template")]
    pub template: PathBuf,

    /// Detail page template for the secondary locale.
    #[serde(default = "default_secondary_template")]
    pub secondary_template: PathBuf,

    /// Files and directories copied verbatim into the output.
    #[serde(default)]
    pub static_assets: Vec<PathBuf>,

    /// Remove the output directory before writing.
    #[serde(default = "default_true")]
    pub clean_output: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            output_dir: default_output_dir(),
            sitemap_path: default_sitemap_path(),
            template: default_template(),
            secondary_template: default_secondary_template(),
            static_assets: Vec::new(),
            clean_output: true,
        }
    }
}

fn default_base_url() -> String {
    "https://example.com".into()
}
fn default_output_dir() -> PathBuf {
    "dist".into()
}
fn default_sitemap_path() -> PathBuf {
    "sitemap.xml".into()
}
fn default_template() -> PathBuf {
    "template.html".into()
}
fn default_secondary_template() -> PathBuf {
    "template_ru.html".into()
}
fn default_true() -> bool {
    true
}

/// `[locales]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalesConfig {
    #[serde(default = "default_primary_locale")]
    pub primary: String,

    #[serde(default = "default_secondary_locale")]
    pub secondary: String,

    /// URL prefix for secondary-locale pages.
    #[serde(default = "default_secondary_prefix")]
    pub secondary_prefix: String,

    /// Resolution policy for fields missing under the target locale.
    #[serde(default)]
    pub fallback: FallbackPolicy,

    /// Display names for categories on secondary-locale pages.
    #[serde(default = "default_category_labels")]
    pub category_labels: BTreeMap<String, String>,
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            primary: default_primary_locale(),
            secondary: default_secondary_locale(),
            secondary_prefix: default_secondary_prefix(),
            fallback: FallbackPolicy::default(),
            category_labels: default_category_labels(),
        }
    }
}

fn default_primary_locale() -> String {
    "en-US".into()
}
fn default_secondary_locale() -> String {
    "ru".into()
}
fn default_secondary_prefix() -> String {
    "/ru".into()
}
fn default_category_labels() -> BTreeMap<String, String> {
    [
        ("dynamics", "Динамика"),
        ("knowledge", "Знания"),
        ("news", "Новости"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// `[content]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Content type requested from the source.
    #[serde(default = "default_content_type")]
    pub content_type: String,

    #[serde(default)]
    pub fetch_mode: FetchMode,

    /// Category assigned to records without one.
    #[serde(default = "default_category")]
    pub default_category: String,

    /// Minimum serialized body length for a record to be publishable.
    #[serde(default = "default_min_body_len")]
    pub min_body_len: usize,

    /// Site-relative directory holding the numbered placeholder images.
    #[serde(default = "default_placeholder_dir")]
    pub placeholder_dir: String,

    /// Number of placeholder images (`01.png` ..= `NN.png`).
    #[serde(default = "default_placeholder_pool_size")]
    pub placeholder_pool_size: u32,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            content_type: default_content_type(),
            fetch_mode: FetchMode::default(),
            default_category: default_category(),
            min_body_len: default_min_body_len(),
            placeholder_dir: default_placeholder_dir(),
            placeholder_pool_size: default_placeholder_pool_size(),
        }
    }
}

fn default_content_type() -> String {
    "master".into()
}
fn default_category() -> String {
    "dynamics".into()
}
fn default_min_body_len() -> usize {
    50
}
fn default_placeholder_dir() -> String {
    "/imgs/article_imgs".into()
}
fn default_placeholder_pool_size() -> u32 {
    43
}

/// Which content source implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Contentful,
    File,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    /// Name of the env var holding the space id (never store the id itself).
    #[serde(default = "default_space_id_env")]
    pub space_id_env: String,

    /// Name of the env var holding the delivery token.
    #[serde(default = "default_access_token_env")]
    pub access_token_env: String,

    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Upper bound for every HTTP request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Entries requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Directory read by the file source.
    #[serde(default = "default_entries_dir")]
    pub entries_dir: PathBuf,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            space_id_env: default_space_id_env(),
            access_token_env: default_access_token_env(),
            environment: default_environment(),
            api_base: default_api_base(),
            timeout_secs: default_timeout_secs(),
            page_size: default_page_size(),
            entries_dir: default_entries_dir(),
        }
    }
}

fn default_space_id_env() -> String {
    "CONTENTFUL_SPACE_ID".into()
}
fn default_access_token_env() -> String {
    "CONTENTFUL_ACCESS_TOKEN".into()
}
fn default_environment() -> String {
    "master".into()
}
fn default_api_base() -> String {
    "https://cdn.contentful.com".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_page_size() -> u32 {
    1000
}
fn default_entries_dir() -> PathBuf {
    "content".into()
}

/// `[sitemap]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SitemapConfig {
    /// Priority assigned to newly discovered URLs.
    #[serde(default = "default_priority")]
    pub priority: f64,

    /// Optional `<changefreq>` for newly discovered URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changefreq: Option<String>,

    #[serde(default)]
    pub insert_order: InsertOrder,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            changefreq: None,
            insert_order: InsertOrder::default(),
        }
    }
}

fn default_priority() -> f64 {
    0.8
}

// ---------------------------------------------------------------------------
// Locale settings (runtime, derived from [locales])
// ---------------------------------------------------------------------------

/// Runtime view of the two locale buckets and their routing convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleSettings {
    pub primary: String,
    pub secondary: String,
    pub secondary_prefix: String,
}

impl LocaleSettings {
    /// Content-source locale code for a bucket.
    pub fn code(&self, bucket: LocaleBucket) -> &str {
        match bucket {
            LocaleBucket::Primary => &self.primary,
            LocaleBucket::Secondary => &self.secondary,
        }
    }

    /// Value written into `IndexEntry.lang`.
    pub fn lang(&self, bucket: LocaleBucket) -> String {
        lang_key(self.code(bucket))
    }

    /// URL prefix for a bucket (`""` for primary).
    pub fn prefix(&self, bucket: LocaleBucket) -> &str {
        match bucket {
            LocaleBucket::Primary => "",
            LocaleBucket::Secondary => &self.secondary_prefix,
        }
    }

    /// Canonical site-relative path of a record in this bucket.
    pub fn path_for(&self, bucket: LocaleBucket, category: &str, slug: &str) -> String {
        canonical_path(self.prefix(bucket), category, slug)
    }
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self::from(&LocalesConfig::default())
    }
}

impl From<&LocalesConfig> for LocaleSettings {
    fn from(config: &LocalesConfig) -> Self {
        Self {
            primary: config.primary.clone(),
            secondary: config.secondary.clone(),
            secondary_prefix: config.secondary_prefix.trim_end_matches('/').to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Reject configurations the pipeline cannot build with.
    pub fn validate(&self) -> Result<()> {
        let locales = &self.locales;
        if locales.primary.trim().is_empty() || locales.secondary.trim().is_empty() {
            return Err(SitePipeError::config("locale codes must not be empty"));
        }
        if locales.primary == locales.secondary {
            return Err(SitePipeError::config(format!(
                "primary and secondary locale are both '{}'",
                locales.primary
            )));
        }
        if lang_key(&locales.primary) == lang_key(&locales.secondary) {
            return Err(SitePipeError::config(format!(
                "locales '{}' and '{}' share the language '{}'; index files and \
                 IndexEntry.lang are keyed by language",
                locales.primary,
                locales.secondary,
                lang_key(&locales.primary)
            )));
        }
        if !locales.secondary_prefix.starts_with('/') || locales.secondary_prefix.len() < 2 {
            return Err(SitePipeError::config(format!(
                "secondary_prefix '{}' must start with '/' and name a path segment",
                locales.secondary_prefix
            )));
        }
        if self.content.placeholder_pool_size == 0 {
            return Err(SitePipeError::config(
                "placeholder_pool_size must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.sitemap.priority) {
            return Err(SitePipeError::config(format!(
                "sitemap priority {} is outside 0.0..=1.0",
                self.sitemap.priority
            )));
        }
        Url::parse(&self.site.base_url).map_err(|e| {
            SitePipeError::config(format!("invalid base_url '{}': {e}", self.site.base_url))
        })?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the user config directory (`~/.sitepipe/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| SitePipeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user-level config file (`~/.sitepipe/sitepipe.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config.
///
/// An explicit path must exist. Otherwise `./sitepipe.toml` is tried, then
/// the user-level file; defaults are returned when neither exists.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        return load_config_from(path);
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config_from(&local);
    }

    let user = config_file_path()?;
    if user.exists() {
        return load_config_from(&user);
    }

    tracing::debug!("no config file found, using defaults");
    Ok(AppConfig::default())
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| SitePipeError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        SitePipeError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Write a default `sitepipe.toml` into `dir`. Returns the path written.
pub fn init_config(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| SitePipeError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(SitePipeError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| SitePipeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| SitePipeError::io(&path, e))?;
    tracing::info!(path = %path.display(), "created default config file");

    Ok(path)
}

/// Read the content-source credentials from the configured env vars.
///
/// Returns `(space_id, access_token)`.
pub fn source_credentials(config: &SourceConfig) -> Result<(String, String)> {
    let read = |var_name: &str, what: &str| match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(SitePipeError::config(format!(
            "Contentful {what} not found. Set the {var_name} environment variable."
        ))),
    };

    Ok((
        read(&config.space_id_env, "space id")?,
        read(&config.access_token_env, "access token")?,
    ))
}

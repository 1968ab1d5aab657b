//! Shared types, error model, and configuration for sitepipe.
//!
//! This crate is the foundation depended on by all other sitepipe crates.
//! It provides:
//! - [`SitePipeError`] as the unified error type
//! - Domain types ([`RawEntry`], [`NormalizedRecord`], [`IndexEntry`], [`NavLink`])
//! - Configuration ([`AppConfig`], [`LocaleSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ContentConfig, LocaleSettings, LocalesConfig, SitemapConfig, SiteConfig,
    SourceConfig, SourceKind, config_dir, config_file_path, init_config, load_config,
    load_config_from, source_credentials,
};
pub use error::{Result, SitePipeError};
pub use types::{
    BuildId, EntrySys, FallbackPolicy, FetchMode, IndexEntry, InsertOrder, LocaleBucket, NavLink,
    NormalizedRecord, RawEntry, canonical_path, https_asset_url, lang_key,
};

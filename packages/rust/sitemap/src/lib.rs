//! Persistent sitemap reconciliation.
//!
//! Each build reads the previously persisted sitemap, merges the canonical
//! URLs discovered in this run, and writes the complete document back both to
//! the deployable output and to the source-of-truth location.
//!
//! The persisted XML is only ever handled through [`parse_sitemap`] and
//! [`render_sitemap`]; merging works on [`SitemapEntry`] values.

mod merge;
mod store;
mod xml;

pub use merge::{MergeOptions, MergeOutcome, merge};
pub use sitepipe_shared::InsertOrder;
pub use store::{load_prior, persist};
pub use xml::{SITEMAP_NS, parse_sitemap, render_sitemap};

/// One `<url>` element. `loc` is the uniqueness key.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    /// Absolute URL.
    pub loc: String,
    /// `YYYY-MM-DD`.
    pub lastmod: Option<String>,
    pub changefreq: Option<String>,
    pub priority: Option<f64>,
}

impl SitemapEntry {
    pub fn new(loc: impl Into<String>) -> Self {
        Self {
            loc: loc.into(),
            lastmod: None,
            changefreq: None,
            priority: None,
        }
    }
}

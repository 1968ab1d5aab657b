//! Offline source reading exported entries from disk.
//!
//! Layout under the entries directory:
//! - `entries-{locale}.json` for a single-locale fetch
//! - `entries-all.json` for an all-locales fetch
//!
//! Each file holds a Delivery API collection response or a bare array of
//! entries.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use sitepipe_shared::{RawEntry, Result, SitePipeError};

use crate::{ContentSource, EntriesPage, FetchScope};

/// Reads entries from JSON files in a directory.
#[derive(Debug, Clone)]
pub struct FileSource {
    dir: PathBuf,
}

impl FileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a scope.
    pub fn path_for(&self, scope: &FetchScope) -> PathBuf {
        match scope {
            FetchScope::Locale(code) => self.dir.join(format!("entries-{code}.json")),
            FetchScope::AllLocales => self.dir.join("entries-all.json"),
        }
    }
}

impl ContentSource for FileSource {
    fn name(&self) -> &'static str {
        "file"
    }

    #[instrument(skip_all, fields(scope = %scope, dir = %self.dir.display()))]
    async fn fetch(&self, scope: &FetchScope) -> Result<Vec<RawEntry>> {
        let path = self.path_for(scope);
        let body = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| SitePipeError::io(&path, e))?;

        let origin = path.display().to_string();
        let entries = EntriesPage::from_json(&body, &origin)?.into_entries(&origin)?;

        info!(count = entries.len(), path = %origin, "loaded entries");
        Ok(entries)
    }
}

//! Reading and writing the persisted sitemap document.

use std::path::Path;

use tracing::{debug, info, instrument, warn};

use sitepipe_shared::{Result, SitePipeError};

use crate::{SitemapEntry, parse_sitemap, render_sitemap};

/// Load the prior sitemap.
///
/// A missing, unreadable or malformed document is recoverable: it is logged
/// and treated as an empty prior set, so every URL of this build is new.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_prior(path: &Path) -> Vec<SitemapEntry> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("no prior sitemap, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(error = %e, "prior sitemap unreadable, starting empty");
            return Vec::new();
        }
    };

    match parse_sitemap(&content) {
        Ok(entries) => {
            debug!(count = entries.len(), "loaded prior sitemap");
            entries
        }
        Err(e) => {
            warn!(error = %e, "prior sitemap malformed, starting empty");
            Vec::new()
        }
    }
}

/// Render `entries` once and write the document to every target.
///
/// Each write goes to a temp file beside the target and is renamed into
/// place, so a reader never sees a half-written sitemap.
#[instrument(skip_all, fields(entries = entries.len(), targets = targets.len()))]
pub fn persist<P: AsRef<Path>>(entries: &[SitemapEntry], targets: &[P]) -> Result<()> {
    let xml = render_sitemap(entries);

    for target in targets {
        write_atomic(target.as_ref(), &xml)?;
    }

    info!("sitemap persisted");
    Ok(())
}

fn write_atomic(target: &Path, content: &str) -> Result<()> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SitePipeError::io(parent, e))?;
    }

    let file_name = target
        .file_name()
        .ok_or_else(|| SitePipeError::Sitemap(format!("invalid target {}", target.display())))?
        .to_string_lossy();
    let temp = target.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| SitePipeError::io(&temp, e))?;
    std::fs::rename(&temp, target).map_err(|e| SitePipeError::io(target, e))?;

    debug!(path = %target.display(), "wrote sitemap");
    Ok(())
}

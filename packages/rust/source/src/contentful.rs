//! Contentful Content Delivery API client.

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, instrument};

use sitepipe_shared::{RawEntry, Result, SitePipeError, SourceConfig, source_credentials};

use crate::{ContentSource, EntriesPage, FetchScope, USER_AGENT};

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 3;

/// Linked entries/assets are included this many levels deep.
const INCLUDE_DEPTH: u32 = 2;

/// Newest entries first, matching the sequencing order.
const ORDER: &str = "-sys.createdAt";

/// Connection settings for [`ContentfulSource`].
#[derive(Debug, Clone)]
pub struct ContentfulOptions {
    pub api_base: String,
    pub space_id: String,
    pub access_token: String,
    pub environment: String,
    pub content_type: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl ContentfulOptions {
    /// Build options from the `[source]` section, reading credentials from env.
    pub fn from_config(config: &SourceConfig, content_type: &str) -> Result<Self> {
        let (space_id, access_token) = source_credentials(config)?;
        Ok(Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            space_id,
            access_token,
            environment: config.environment.clone(),
            content_type: content_type.to_string(),
            page_size: config.page_size.max(1),
            timeout_secs: config.timeout_secs,
        })
    }
}

/// Fetches entries from the Content Delivery API, paging until exhausted.
pub struct ContentfulSource {
    opts: ContentfulOptions,
    client: Client,
}

impl ContentfulSource {
    pub fn new(opts: ContentfulOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| SitePipeError::Fetch(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { opts, client })
    }

    fn entries_url(&self) -> String {
        format!(
            "{}/spaces/{}/environments/{}/entries",
            self.opts.api_base, self.opts.space_id, self.opts.environment
        )
    }

    async fn fetch_page(&self, scope: &FetchScope, skip: u64) -> Result<EntriesPage> {
        let url = self.entries_url();
        let limit = self.opts.page_size.to_string();
        let skip_param = skip.to_string();
        let include = INCLUDE_DEPTH.to_string();

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.opts.access_token)
            .query(&[
                ("content_type", self.opts.content_type.as_str()),
                ("locale", scope.query_value()),
                ("order", ORDER),
                ("include", include.as_str()),
                ("limit", limit.as_str()),
                ("skip", skip_param.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SitePipeError::Fetch(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(SitePipeError::Fetch(format!(
                "{url}: HTTP {status}: {}",
                detail.trim()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SitePipeError::Fetch(format!("{url}: failed to read body: {e}")))?;

        EntriesPage::from_json(&body, &url)
    }
}

impl ContentSource for ContentfulSource {
    fn name(&self) -> &'static str {
        "contentful"
    }

    #[instrument(skip_all, fields(scope = %scope, content_type = %self.opts.content_type))]
    async fn fetch(&self, scope: &FetchScope) -> Result<Vec<RawEntry>> {
        let mut entries = Vec::new();
        let mut skip = 0u64;

        loop {
            let page = self.fetch_page(scope, skip).await?;
            let received = page.items.len() as u64;
            let total = page.total;

            entries.extend(page.into_entries(&self.entries_url())?);
            skip += received;

            debug!(received, skip, ?total, "fetched entries page");

            match total {
                Some(total) if received > 0 && skip < total => continue,
                _ => break,
            }
        }

        info!(count = entries.len(), "fetched entries");
        Ok(entries)
    }
}

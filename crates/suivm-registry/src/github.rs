use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use tracing::debug;

use crate::listing::parse_release_tags;
use crate::{ReleaseSource, ReleaseSourceConfig};

const PER_PAGE: &str = "100";

/// Release listing served by the GitHub releases API (or anything speaking
/// the same shape).
#[derive(Debug, Clone)]
pub struct GithubReleases {
    client: Client,
    config: ReleaseSourceConfig,
}

impl GithubReleases {
    pub fn new(config: ReleaseSourceConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .context("failed to build http client")?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ReleaseSourceConfig {
        &self.config
    }

    fn fetch_page(&self, page: u32) -> Result<String> {
        let url = &self.config.api_url;
        debug!(%url, page, "fetching release listing page");
        self.client
            .get(url)
            .header(ACCEPT, "application/vnd.github+json")
            .query(&[("per_page", PER_PAGE), ("page", &page.to_string())])
            .send()
            .with_context(|| format!("failed to fetch release listing from {url}"))?
            .error_for_status()
            .with_context(|| format!("release listing request failed: {url} (page {page})"))?
            .text()
            .with_context(|| format!("failed to read release listing body from {url}"))
    }
}

impl ReleaseSource for GithubReleases {
    fn release_tags(&self) -> Result<Vec<String>> {
        let mut tags = Vec::new();
        for page in 1..=self.config.max_pages.max(1) {
            let body = self.fetch_page(page)?;
            let page_tags = parse_release_tags(&body);
            if page_tags.is_empty() {
                break;
            }
            tags.extend(page_tags);
        }
        debug!(count = tags.len(), "release listing fetched");
        Ok(tags)
    }
}

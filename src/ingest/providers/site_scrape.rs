// src/ingest/providers/site_scrape.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use url::Url;

use super::{dedup_last_seen_wins, scan_anchors};
use crate::ingest::http::HttpClient;
use crate::ingest::types::{Fetcher, NewsItem};
use crate::temporal::parse_loose;

static MONTH_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},\s+\d{4}",
    )
    .expect("month date regex")
});

/// Scraper tuned to one trade site's markup: links must point at `host` and
/// carry a real headline (navigation links are short), dates are spelled out.
#[derive(Clone)]
pub struct SiteScrapeFetcher {
    http: HttpClient,
    host: String,
    min_title_len: usize,
}

impl SiteScrapeFetcher {
    pub fn new(http: HttpClient, host: impl Into<String>, min_title_len: usize) -> Self {
        Self {
            http,
            host: host.into(),
            min_title_len,
        }
    }

    pub fn parse_items_from_str(
        &self,
        source_name: &str,
        page_url: &str,
        html: &str,
    ) -> Result<Vec<NewsItem>> {
        let page = Url::parse(page_url).with_context(|| format!("page url {page_url}"))?;

        let mut items = Vec::new();
        for cand in scan_anchors(html, &page) {
            if !cand.url.as_str().contains(&self.host) {
                continue;
            }
            if cand.text.chars().count() < self.min_title_len {
                continue;
            }
            let Some(m) = MONTH_DATE_RE.find(&cand.context) else {
                continue;
            };
            let Some(published) = parse_loose(m.as_str()) else {
                continue;
            };
            items.push(NewsItem {
                source: source_name.to_string(),
                title: cand.text,
                url: cand.url.to_string(),
                published,
                summary: String::new(),
            });
        }

        let out = dedup_last_seen_wins(items);
        debug!(source = source_name, host = %self.host, kept = out.len(), "scraped site page");
        Ok(out)
    }
}

#[async_trait]
impl Fetcher for SiteScrapeFetcher {
    async fn fetch(&self, source_name: &str, url: &str) -> Result<Vec<NewsItem>> {
        let html = self.http.get_text(url).await?;
        self.parse_items_from_str(source_name, url, &html)
    }

    fn name(&self) -> &'static str {
        "site_scrape"
    }
}

// src/ingest/providers/pattern_scrape.rs
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

/// `3/4/2025`, `3/4/25`, `Mar 4, 2025`, `March 4, 2025`, `Sept. 4, 2025`.
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b\d{1,2}/\d{1,2}/\d{2,4}\b|\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]*\.?\s+\d{1,2},\s+\d{4}\b",
    )
    .expect("listing date regex")
});

/// Generic listing-page scraper (investor-relations "news" pages and the like).
#[derive(Clone)]
pub struct PatternScrapeFetcher {
    http: HttpClient,
}

impl PatternScrapeFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Same-host links whose container text holds a readable date.
    pub fn parse_items_from_str(
        source_name: &str,
        page_url: &str,
        html: &str,
    ) -> Result<Vec<NewsItem>> {
        let page = Url::parse(page_url).with_context(|| format!("page url {page_url}"))?;
        let host = page.host_str().unwrap_or_default();

        let mut items = Vec::new();
        for cand in scan_anchors(html, &page) {
            if cand.url.host_str() != Some(host) {
                continue;
            }
            let Some(m) = DATE_RE.find(&cand.context) else {
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
        debug!(source = source_name, kept = out.len(), "scraped listing page");
        Ok(out)
    }
}

#[async_trait]
impl Fetcher for PatternScrapeFetcher {
    async fn fetch(&self, source_name: &str, url: &str) -> Result<Vec<NewsItem>> {
        let html = self.http.get_text(url).await?;
        Self::parse_items_from_str(source_name, url, &html)
    }

    fn name(&self) -> &'static str {
        "pattern_scrape"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn date_pattern_variants() {
        let samples = [
            "posted 3/4/2025 by",
            "Mar 4, 2025",
            "March 4, 2025",
            "Sept. 4, 2025",
            "12/1/24",
        ];
        for s in samples {
            assert!(DATE_RE.is_match(s), "{s}");
        }
        assert!(!DATE_RE.is_match("2025-03-04"));
    }

    #[test]
    fn keeps_dated_same_host_links_only() {
        let html = r#"
        <div class="row"><a href="/news/q4-results">Q4 results announced</a> <span>2/20/2025</span></div>
        <div class="row"><a href="https://other.example.org/x">Offsite link</a> Feb 21, 2025</div>
        <div class="row"><a href="/about">About us</a></div>
        "#;
        let items = PatternScrapeFetcher::parse_items_from_str(
            "Sun Communities News Releases",
            "https://www.suninc.com/news-releases",
            html,
        )
        .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://www.suninc.com/news/q4-results");
        assert_eq!(items[0].published.month(), 2);
        assert_eq!(items[0].published.day(), 20);
    }
}

// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// One article/press release/listing entry, uniform across every source kind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub source: String, // e.g. "Modern Campground", "Search: ELS"
    pub title: String,
    pub url: String, // dedup key
    pub published: DateTime<FixedOffset>,
    #[serde(default)]
    pub summary: String, // plain text
}

impl NewsItem {
    /// `title + " " + summary`, the text every classifier looks at.
    pub fn haystack(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }
}

/// How a configured source is fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchStrategy {
    /// RSS 2.0 or Atom feed.
    Feed,
    /// Any HTML listing page: same-host links with a nearby `M/D/YYYY` or `Mon D, YYYY` date.
    PatternScrape,
    /// One known site: links containing `host`, long link text, `Month D, YYYY` dates.
    SiteScrape {
        host: String,
        #[serde(default = "default_min_title_len")]
        min_title_len: usize,
    },
}

pub(crate) fn default_min_title_len() -> usize {
    12
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceSpec {
    pub name: String,
    pub strategy: FetchStrategy,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchQuery {
    pub name: String,
    pub q: String,
}

/// A source or query that contributed nothing because fetching it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFailure {
    pub source: String,
    pub detail: String,
}

/// Output of one collection run.
#[derive(Debug, Clone, Default)]
pub struct Collection {
    pub items: Vec<NewsItem>,
    pub failures: Vec<SourceFailure>,
    /// Items dropped because they were older than the window.
    pub outside_window: usize,
    /// Items dropped because their URL was already seen.
    pub duplicates: usize,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, source_name: &str, url: &str) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &'static str;
}

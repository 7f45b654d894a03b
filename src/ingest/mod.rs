// src/ingest/mod.rs
pub mod config;
pub mod http;
pub mod providers;
pub mod types;

use anyhow::Context;
use chrono::DateTime;
use chrono_tz::Tz;
use once_cell::sync::OnceCell;
use std::collections::HashSet;
use tracing::{debug, info};

use crate::ingest::http::HttpClient;
use crate::ingest::providers::{
    feed::FeedFetcher, pattern_scrape::PatternScrapeFetcher, site_scrape::SiteScrapeFetcher,
};
use crate::ingest::types::{
    Collection, FetchStrategy, Fetcher, NewsItem, SearchQuery, SourceFailure, SourceSpec,
};
use crate::temporal::{is_within_window, to_canonical};

/// Longest plain-text summary kept per item.
pub const MAX_SUMMARY_CHARS: usize = 1500;

/// Collapse runs of whitespace to one space and trim.
pub fn collapse_ws(s: &str) -> String {
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").expect("ws regex"));
    re_ws.replace_all(s, " ").trim().to_string()
}

/// HTML fragment → plain text: strip tags, decode entities, normalize quotes,
/// collapse whitespace, cap length.
pub fn plain_text(s: &str) -> String {
    // 1) Strip HTML tags (replace with a space so adjacent words don't fuse)
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    let stripped = re_tags.replace_all(s, " ");

    // 2) HTML entity decode
    let mut out = html_escape::decode_html_entities(&stripped).to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace; tag removal leaves a space before punctuation
    static RE_PUNCT: OnceCell<regex::Regex> = OnceCell::new();
    let re_punct =
        RE_PUNCT.get_or_init(|| regex::Regex::new(r"\s+([.,!?;:])").expect("punct regex"));
    out = re_punct.replace_all(&collapse_ws(&out), "$1").to_string();

    // 5) Length cap
    if out.chars().count() > MAX_SUMMARY_CHARS {
        out = out.chars().take(MAX_SUMMARY_CHARS).collect();
    }
    out
}

/// Search-engine feed URL for one query (US English edition).
pub fn search_feed_url(base: &str, query: &str) -> String {
    format!(
        "{}?q={}&hl=en-US&gl=US&ceid=US:en",
        base,
        urlencoding::encode(query)
    )
}

/// Normalize timestamps to the canonical timezone, drop items outside the
/// window, and drop repeated URLs (first one wins).
/// Returns (kept, outside_window_count, duplicate_count).
pub fn normalize_window_dedup(
    now: &DateTime<Tz>,
    raw: Vec<NewsItem>,
    window_days: i64,
) -> (Vec<NewsItem>, usize, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(raw.len());
    let mut outside = 0usize;
    let mut dupes = 0usize;

    for mut it in raw {
        let local = to_canonical(&it.published);
        it.published = local.fixed_offset();
        if !is_within_window(&local, window_days, now) {
            outside += 1;
            continue;
        }
        if !seen.insert(it.url.clone()) {
            dupes += 1;
            continue;
        }
        kept.push(it);
    }
    (kept, outside, dupes)
}

/// One fetcher per strategy. Site scrapers are built per source since they
/// carry the site's host and title threshold.
pub struct FetcherSet {
    http: HttpClient,
    feed: FeedFetcher,
    pattern: PatternScrapeFetcher,
}

impl FetcherSet {
    pub fn new(http: HttpClient) -> Self {
        Self {
            feed: FeedFetcher::new(http.clone()),
            pattern: PatternScrapeFetcher::new(http.clone()),
            http,
        }
    }

    pub fn feed(&self) -> &FeedFetcher {
        &self.feed
    }

    async fn fetch(&self, source: &SourceSpec) -> anyhow::Result<Vec<NewsItem>> {
        match &source.strategy {
            FetchStrategy::Feed => run_fetcher(&self.feed, &source.name, &source.url).await,
            FetchStrategy::PatternScrape => {
                run_fetcher(&self.pattern, &source.name, &source.url).await
            }
            FetchStrategy::SiteScrape {
                host,
                min_title_len,
            } => {
                let site = SiteScrapeFetcher::new(self.http.clone(), host.clone(), *min_title_len);
                run_fetcher(&site, &source.name, &source.url).await
            }
        }
    }
}

/// One fetch, logged and error-tagged with the fetcher's name.
async fn run_fetcher(
    fetcher: &dyn Fetcher,
    source_name: &str,
    url: &str,
) -> anyhow::Result<Vec<NewsItem>> {
    let items = fetcher
        .fetch(source_name, url)
        .await
        .with_context(|| fetcher.name())?;
    debug!(
        source = source_name,
        fetcher = fetcher.name(),
        count = items.len(),
        "source fetched"
    );
    Ok(items)
}

/// What to collect and from where.
#[derive(Debug, Clone)]
pub struct CollectPlan<'a> {
    pub sources: &'a [SourceSpec],
    pub queries: &'a [SearchQuery],
    pub search_base: &'a str,
    pub window_days: i64,
}

/// Fetch every source, then every search query, one at a time. A failing
/// source is recorded in `failures` and contributes nothing.
pub async fn collect_all(
    plan: &CollectPlan<'_>,
    fetchers: &FetcherSet,
    now: &DateTime<Tz>,
) -> Collection {
    let mut raw = Vec::new();
    let mut failures = Vec::new();

    for s in plan.sources {
        match fetchers.fetch(s).await {
            Ok(mut v) => raw.append(&mut v),
            Err(e) => failures.push(SourceFailure {
                source: s.name.clone(),
                detail: format!("{e:#}"),
            }),
        }
    }

    for q in plan.queries {
        let label = format!("Search: {}", q.name);
        let url = search_feed_url(plan.search_base, &q.q);
        match run_fetcher(fetchers.feed(), &label, &url).await {
            Ok(mut v) => raw.append(&mut v),
            Err(e) => failures.push(SourceFailure {
                source: label,
                detail: format!("{e:#}"),
            }),
        }
    }

    let fetched = raw.len();
    let (items, outside_window, duplicates) = normalize_window_dedup(now, raw, plan.window_days);
    info!(
        fetched,
        kept = items.len(),
        outside_window,
        duplicates,
        failed_sources = failures.len(),
        "collection finished"
    );

    Collection {
        items,
        failures,
        outside_window,
        duplicates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::CANONICAL_TZ;
    use chrono::{Duration, TimeZone};

    fn item(url: &str, title: &str, published: DateTime<Tz>) -> NewsItem {
        NewsItem {
            source: "test".into(),
            title: title.into(),
            url: url.into(),
            published: published.fixed_offset(),
            summary: String::new(),
        }
    }

    #[test]
    fn plain_text_strips_markup() {
        let s = "<p>Hello,&nbsp;&nbsp; <b>world</b>!</p> &ldquo;ok&rdquo;";
        assert_eq!(plain_text(s), r#"Hello, world! "ok""#);
    }

    #[test]
    fn search_url_is_encoded_with_locale() {
        let q = r#"(rv park OR "for sale") when:7d"#;
        let u = search_feed_url("https://news.google.com/rss/search", q);
        assert_eq!(
            u,
            "https://news.google.com/rss/search\
             ?q=%28rv%20park%20OR%20%22for%20sale%22%29%20when%3A7d&hl=en-US&gl=US&ceid=US:en"
        );
    }

    #[test]
    fn window_and_first_wins_dedup() {
        let now = CANONICAL_TZ.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let raw = vec![
            item("u1", "first", now - Duration::days(1)),
            item("u1", "second", now - Duration::days(2)),
            item("u2", "old", now - Duration::days(30)),
        ];
        let (kept, outside, dupes) = normalize_window_dedup(&now, raw, 7);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "first");
        assert_eq!((outside, dupes), (1, 1));
    }

    #[test]
    fn published_is_rewritten_in_eastern() {
        let now = CANONICAL_TZ.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap();
        let utc_midnight = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let raw = vec![NewsItem {
            source: "s".into(),
            title: "t".into(),
            url: "u".into(),
            published: utc_midnight.fixed_offset(),
            summary: String::new(),
        }];
        let (kept, _, _) = normalize_window_dedup(&now, raw, 7);
        assert_eq!(kept[0].published.offset().local_minus_utc(), -5 * 3600);
        assert_eq!(kept[0].published.to_rfc3339(), "2023-12-31T19:00:00-05:00");
    }
}

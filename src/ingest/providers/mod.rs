// src/ingest/providers/mod.rs
//! Fetch strategies. `feed` reads structured feeds; the two scrapers share the
//! anchor scan below: find every link, look at the text of its immediate
//! container, and keep it only if a date can be read there.

pub mod feed;
pub mod pattern_scrape;
pub mod site_scrape;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

use crate::ingest::collapse_ws;
use crate::ingest::types::NewsItem;

/// Characters of container text searched for a date.
pub const CONTEXT_WINDOW_CHARS: usize = 300;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("anchor selector"));

/// A link found on a listing page, before any date heuristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorCandidate {
    pub url: Url,
    pub text: String,
    /// Whitespace-collapsed text of the anchor's parent element, truncated.
    pub context: String,
}

/// Enumerate `<a href>` elements with non-empty text, resolving relative links
/// against `page_url`. Non-http(s) links (mailto:, javascript:) are dropped.
pub fn scan_anchors(html: &str, page_url: &Url) -> Vec<AnchorCandidate> {
    let document = Html::parse_document(html);
    let mut out = Vec::new();

    for a in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = a.value().attr("href").map(str::trim) else {
            continue;
        };
        let text = element_text(&a);
        if href.is_empty() || text.is_empty() {
            continue;
        }
        let Ok(resolved) = page_url.join(href) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }
        let context = a
            .parent()
            .and_then(ElementRef::wrap)
            .map(|p| element_text(&p))
            .unwrap_or_default()
            .chars()
            .take(CONTEXT_WINDOW_CHARS)
            .collect();

        out.push(AnchorCandidate {
            url: resolved,
            text,
            context,
        });
    }
    out
}

fn element_text(el: &ElementRef<'_>) -> String {
    collapse_ws(&el.text().collect::<Vec<_>>().join(" "))
}

/// Dedup by URL within one page: an item keeps the slot of the first
/// occurrence but takes the values of the last one.
pub fn dedup_last_seen_wins(items: Vec<NewsItem>) -> Vec<NewsItem> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut out: Vec<NewsItem> = Vec::with_capacity(items.len());
    for it in items {
        match slots.get(&it.url) {
            Some(&idx) => out[idx] = it,
            None => {
                slots.insert(it.url.clone(), out.len());
                out.push(it);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn resolves_relative_links_and_reads_parent_text() {
        let html = r#"<ul>
            <li><span>March 3, 2025</span> <a href="/news/one">First   story</a></li>
            <li><a href="mailto:press@example.com">Email us</a></li>
            <li><a href="">empty</a><a href="/x"></a></li>
        </ul>"#;
        let page = Url::parse("https://example.com/press/").unwrap();
        let found = scan_anchors(html, &page);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url.as_str(), "https://example.com/news/one");
        assert_eq!(found[0].text, "First story");
        assert_eq!(found[0].context, "March 3, 2025 First story");
    }

    #[test]
    fn context_is_bounded() {
        let filler = "word ".repeat(200);
        let html = format!(r#"<div>{filler}<a href="/a">Link</a></div>"#);
        let page = Url::parse("https://example.com/").unwrap();
        let found = scan_anchors(&html, &page);
        assert_eq!(found[0].context.chars().count(), CONTEXT_WINDOW_CHARS);
    }

    #[test]
    fn dedup_keeps_first_slot_last_value() {
        let ts = DateTime::parse_from_rfc3339("2025-03-03T00:00:00Z").unwrap();
        let mk = |url: &str, title: &str| NewsItem {
            source: "s".into(),
            title: title.into(),
            url: url.into(),
            published: ts,
            summary: String::new(),
        };
        let out = dedup_last_seen_wins(vec![mk("u1", "a"), mk("u2", "b"), mk("u1", "c")]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "u1");
        assert_eq!(out[0].title, "c");
        assert_eq!(out[1].title, "b");
    }
}

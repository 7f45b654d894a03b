// src/ingest/providers/feed.rs
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::ingest::http::HttpClient;
use crate::ingest::plain_text;
use crate::ingest::types::{Fetcher, NewsItem};
use crate::temporal::parse_loose;

/// Entries read per feed; older entries fall outside any sane window anyway.
pub const MAX_ENTRIES_PER_FEED: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedKind {
    Rss,
    Atom,
}

/// Entry children whose text is kept.
#[derive(Debug, Clone, Copy)]
enum Field {
    Title,
    Link,
    PubDate,
    Published,
    Updated,
    DcDate,
    Description,
    Summary,
    Content,
}

impl Field {
    /// Matched on the qualified name, so `<atom:link>` in an RSS item is not `<link>`.
    fn from_qname(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"title" => Field::Title,
            b"link" => Field::Link,
            b"pubDate" => Field::PubDate,
            b"published" => Field::Published,
            b"updated" => Field::Updated,
            b"dc:date" => Field::DcDate,
            b"description" => Field::Description,
            b"summary" => Field::Summary,
            b"content" | b"content:encoded" => Field::Content,
            _ => return None,
        })
    }
}

/// Fetches RSS 2.0 / Atom feeds, including search-engine query feeds.
#[derive(Clone)]
pub struct FeedFetcher {
    http: HttpClient,
}

impl FeedFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Parse feed XML into items. Entries lacking a title, link or readable
    /// date are skipped; a document that is neither RSS nor Atom is an error.
    pub fn parse_items_from_str(source_name: &str, xml: &str) -> Result<Vec<NewsItem>> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let (kind, raw) = read_entries(&xml_clean)?;

        let total = raw.len();
        let out: Vec<NewsItem> = raw
            .into_iter()
            .filter_map(|r| r.into_item(source_name))
            .collect();
        debug!(
            source = source_name,
            kind = ?kind,
            entries = total,
            kept = out.len(),
            "parsed feed"
        );
        Ok(out)
    }
}

#[async_trait]
impl Fetcher for FeedFetcher {
    async fn fetch(&self, source_name: &str, url: &str) -> Result<Vec<NewsItem>> {
        let body = self.http.get_text(url).await?;
        Self::parse_items_from_str(source_name, &body)
    }

    fn name(&self) -> &'static str {
        "feed"
    }
}

/// Walk the document event by event. Extension elements, inline markup and
/// stray entities only touch the entry they sit in. A structural error after
/// the root ends the walk and keeps the entries already closed.
fn read_entries(xml: &str) -> Result<(FeedKind, Vec<RawEntry>)> {
    let mut reader = Reader::from_str(xml);
    let mut kind: Option<FeedKind> = None;
    let mut entries: Vec<RawEntry> = Vec::new();
    let mut depth = 0usize;
    // (depth of <item>/<entry>, entry being filled)
    let mut current: Option<(usize, RawEntry)> = None;
    // (depth of the field element, field, text so far)
    let mut field: Option<(usize, Field, String)> = None;

    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) if kind.is_none() => return Err(e).context("parsing feed xml"),
            Err(e) => {
                debug!(
                    error = %e,
                    position = reader.buffer_position(),
                    kept = entries.len(),
                    "feed xml broken, keeping entries read so far"
                );
                break;
            }
        };

        match event {
            Event::Start(e) => {
                depth += 1;
                if kind.is_none() {
                    kind = Some(root_kind(&e)?);
                    continue;
                }
                if let Some((_, _, text)) = field.as_mut() {
                    // inline markup inside a text field
                    text.push(' ');
                    continue;
                }
                match current.as_mut() {
                    None if is_entry(&e) => current = Some((depth, RawEntry::default())),
                    Some((entry_depth, entry)) if depth == *entry_depth + 1 => {
                        let name = e.name();
                        if name.as_ref() == b"link" {
                            entry.push_link_attrs(&e);
                        }
                        if let Some(f) = Field::from_qname(name.as_ref()) {
                            field = Some((depth, f, String::new()));
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if kind.is_none() {
                    kind = Some(root_kind(&e)?);
                    continue;
                }
                if let Some((_, _, text)) = field.as_mut() {
                    text.push(' ');
                    continue;
                }
                if let Some((entry_depth, entry)) = current.as_mut() {
                    if depth == *entry_depth && e.name().as_ref() == b"link" {
                        entry.push_link_attrs(&e);
                    }
                }
            }
            Event::Text(t) => {
                if let Some((_, _, text)) = field.as_mut() {
                    match t.unescape() {
                        Ok(s) => text.push_str(&s),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Event::CData(c) => {
                if let Some((_, _, text)) = field.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                match field.take() {
                    Some((field_depth, f, text)) if field_depth == depth => {
                        if let Some((_, entry)) = current.as_mut() {
                            entry.set(f, text);
                        }
                    }
                    Some((field_depth, f, mut text)) => {
                        text.push(' ');
                        field = Some((field_depth, f, text));
                    }
                    None => {}
                }
                if current.as_ref().is_some_and(|(d, _)| *d == depth) {
                    if let Some((_, entry)) = current.take() {
                        entries.push(entry);
                    }
                    if entries.len() >= MAX_ENTRIES_PER_FEED {
                        break;
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let kind = kind.context("not an RSS or Atom document: no root element")?;
    Ok((kind, entries))
}

fn root_kind(e: &BytesStart<'_>) -> Result<FeedKind> {
    match e.local_name().as_ref() {
        b"rss" | b"RDF" => Ok(FeedKind::Rss),
        b"feed" => Ok(FeedKind::Atom),
        other => bail!(
            "not an RSS or Atom document: root <{}>",
            String::from_utf8_lossy(other)
        ),
    }
}

fn is_entry(e: &BytesStart<'_>) -> bool {
    matches!(e.local_name().as_ref(), b"item" | b"entry")
}

fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    /// First non-empty `<link>` text (RSS).
    link_text: Option<String>,
    /// `(rel, href)` of every `<link href>` (Atom).
    link_hrefs: Vec<(Option<String>, String)>,
    pub_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    dc_date: Option<String>,
    description: Option<String>,
    summary: Option<String>,
    content: Option<String>,
}

impl RawEntry {
    /// First non-empty value per field wins.
    fn set(&mut self, field: Field, text: String) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link_text,
            Field::PubDate => &mut self.pub_date,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::DcDate => &mut self.dc_date,
            Field::Description => &mut self.description,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
        };
        if slot.is_none() {
            *slot = Some(text.to_string());
        }
    }

    fn push_link_attrs(&mut self, e: &BytesStart<'_>) {
        if let Some(href) = attr(e, "href") {
            self.link_hrefs.push((attr(e, "rel"), href));
        }
    }

    /// RSS link text, else `rel="alternate"` (or no rel) over self/edit/enclosure.
    fn best_link(&self) -> Option<String> {
        if let Some(l) = &self.link_text {
            return Some(l.clone());
        }
        self.link_hrefs
            .iter()
            .find(|(rel, _)| matches!(rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.link_hrefs.first())
            .map(|(_, href)| href.clone())
    }

    fn into_item(self, source_name: &str) -> Option<NewsItem> {
        let title = plain_text(self.title.as_deref()?);
        let url = self.best_link()?;
        if title.is_empty() {
            return None;
        }
        // pubDate, then Atom published/updated, then Dublin Core
        let published = [&self.pub_date, &self.published, &self.updated, &self.dc_date]
            .into_iter()
            .flatten()
            .find_map(|d| parse_loose(d))?;
        let summary = self
            .description
            .as_deref()
            .or(self.summary.as_deref())
            .or(self.content.as_deref())
            .map(plain_text)
            .unwrap_or_default();
        Some(NewsItem {
            source: source_name.to_string(),
            title,
            url,
            published,
            summary,
        })
    }
}

/// HTML entities that are not valid XML; feeds leak them constantly.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel>
  <title>Woodall's</title>
  <item>
    <title>Campground owners face rising insurance premiums</title>
    <link>https://woodallscm.com/2025/03/insurance/</link>
    <pubDate>Tue, 04 Mar 2025 14:30:00 +0000</pubDate>
    <description><![CDATA[<p>Owners in <b>Florida</b>&nbsp;report higher costs.</p>]]></description>
  </item>
  <item>
    <title>No date here</title>
    <link>https://woodallscm.com/2025/03/nodate/</link>
  </item>
  <item>
    <title>   </title>
    <link>https://woodallscm.com/2025/03/blank/</link>
    <pubDate>Tue, 04 Mar 2025 14:30:00 +0000</pubDate>
  </item>
</channel></rss>"#;

    #[test]
    fn rss_entries_are_extracted_and_incomplete_ones_dropped() {
        let items = FeedFetcher::parse_items_from_str("Woodall's", RSS).unwrap();
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.source, "Woodall's");
        assert_eq!(it.url, "https://woodallscm.com/2025/03/insurance/");
        assert_eq!(it.summary, "Owners in Florida report higher costs.");
    }

    #[test]
    fn atom_link_and_inline_markup_do_not_sink_the_feed() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom"><channel>
  <atom:link href="https://example.com/feed/" rel="self" type="application/rss+xml"/>
  <item>
    <title>Lakeside RV resort changes hands</title>
    <link>https://example.com/lakeside</link>
    <atom:link href="https://example.com/lakeside/feed" rel="self"/>
    <pubDate>Tue, 04 Mar 2025 14:30:00 +0000</pubDate>
    <description>Owners <b>sold</b> it</description>
  </item>
  <item>
    <title>Second item survives</title>
    <link>https://example.com/second</link>
    <pubDate>Wed, 05 Mar 2025 10:00:00 +0000</pubDate>
  </item>
</channel></rss>"#;
        let items = FeedFetcher::parse_items_from_str("x", xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://example.com/lakeside");
        assert_eq!(items[0].summary, "Owners sold it");
        assert_eq!(items[1].title, "Second item survives");
    }

    #[test]
    fn broken_tail_keeps_closed_entries() {
        let xml = "<rss><channel>\
            <item><title>RV park one</title><link>https://x.test/1</link>\
            <pubDate>2025-03-01T00:00:00Z</pubDate></item>\
            <item><title>RV park two</titel></item>\
            </channel></rss>";
        let items = FeedFetcher::parse_items_from_str("x", xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://x.test/1");
    }

    #[test]
    fn dublin_core_date_is_a_fallback() {
        let xml = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
  xmlns="http://purl.org/rss/1.0/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <item>
    <title>Campground permit approved</title>
    <link>https://x.test/permit</link>
    <dc:date>2025-03-04T10:00:00Z</dc:date>
  </item>
</rdf:RDF>"#;
        let items = FeedFetcher::parse_items_from_str("x", xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].published.to_rfc3339(), "2025-03-04T10:00:00+00:00");
    }

    #[test]
    fn atom_prefers_alternate_link_and_falls_back_to_updated() {
        let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title type="html">KOA campground expansion in Ohio</title>
    <link rel="self" href="https://example.com/self"/>
    <link rel="alternate" href="https://example.com/koa-ohio"/>
    <updated>2025-03-04T09:15:00-05:00</updated>
    <summary>New sites added.</summary>
  </entry>
</feed>"#;
        let items = FeedFetcher::parse_items_from_str("Atom", atom).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://example.com/koa-ohio");
        assert_eq!(items[0].summary, "New sites added.");
    }

    #[test]
    fn empty_channel_is_ok() {
        let xml = r#"<rss version="2.0"><channel><title>x</title></channel></rss>"#;
        assert!(FeedFetcher::parse_items_from_str("x", xml).unwrap().is_empty());
    }

    #[test]
    fn not_a_feed_is_an_error() {
        assert!(FeedFetcher::parse_items_from_str("x", "<html><body>hi</body></html>").is_err());
        assert!(FeedFetcher::parse_items_from_str("x", "").is_err());
    }

    #[test]
    fn entries_are_capped() {
        let mut xml = String::from("<rss><channel>");
        for i in 0..(MAX_ENTRIES_PER_FEED + 20) {
            xml.push_str(&format!(
                "<item><title>RV park {i}</title><link>https://x.test/{i}</link>\
                 <pubDate>2025-03-01T00:00:00Z</pubDate></item>"
            ));
        }
        xml.push_str("</channel></rss>");
        let items = FeedFetcher::parse_items_from_str("x", &xml).unwrap();
        assert_eq!(items.len(), MAX_ENTRIES_PER_FEED);
    }
}

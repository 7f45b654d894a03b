// src/report.rs
//! Report assembly: order buckets and items, attach a synthesis per bucket,
//! render the HTML digest and its subject line.

use chrono::DateTime;
use chrono_tz::Tz;
use html_escape::{encode_double_quoted_attribute, encode_text};
use tracing::debug;

use crate::categorize::{Bucket, Categorizer};
use crate::ingest::types::NewsItem;
use crate::synthesis::{fallback_synthesis, Summarizer};
use crate::temporal::{to_canonical, window_start};

pub const REPORT_TITLE: &str = "RV Park Weekly Digest";
/// Items listed per section.
pub const MAX_ITEMS_PER_SECTION: usize = 15;
/// Items handed to the synthesis provider per section.
pub const MAX_SYNTHESIS_ITEMS: usize = 12;

const DATE_FMT: &str = "%b %d, %Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SynthesisOrigin {
    Provider(&'static str),
    Fallback,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub label: String,
    /// Items in the bucket before truncation.
    pub total: usize,
    /// Newest first, at most [`MAX_ITEMS_PER_SECTION`].
    pub items: Vec<NewsItem>,
    pub synthesis: String,
    pub origin: SynthesisOrigin,
}

#[derive(Debug, Clone)]
pub struct Digest {
    pub generated: DateTime<Tz>,
    /// `None` when the window reaches past the representable calendar.
    pub window_start: Option<DateTime<Tz>>,
    pub sections: Vec<Section>,
}

impl Digest {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Highest importance first, newer first on ties, at most [`MAX_SYNTHESIS_ITEMS`].
pub fn rank_for_synthesis(items: &[NewsItem], categorizer: &Categorizer) -> Vec<NewsItem> {
    let mut scored: Vec<(u32, &NewsItem)> = items
        .iter()
        .map(|it| (categorizer.importance_score(it), it))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.published.cmp(&a.1.published)));
    scored
        .into_iter()
        .take(MAX_SYNTHESIS_ITEMS)
        .map(|(_, it)| it.clone())
        .collect()
}

/// Order sections by descending size (ties keep bucket order), sort and cap
/// each section, and attach a synthesis. A missing synthesis is replaced by
/// the local fallback; the report is always produced.
pub async fn assemble(
    buckets: Vec<Bucket>,
    categorizer: &Categorizer,
    summarizer: &dyn Summarizer,
    now: &DateTime<Tz>,
    window_days: i64,
) -> Digest {
    let mut buckets = buckets;
    buckets.retain(|b| !b.items.is_empty());
    buckets.sort_by(|a, b| b.items.len().cmp(&a.items.len()));

    let mut sections = Vec::with_capacity(buckets.len());
    for b in buckets {
        let ranked = rank_for_synthesis(&b.items, categorizer);
        let (synthesis, origin) = match summarizer.summarize(&b.label, &ranked).await {
            Some(text) => (text, SynthesisOrigin::Provider(summarizer.provider_name())),
            None => {
                debug!(label = %b.label, "using local synthesis");
                (
                    fallback_synthesis(&b.label, &b.items, categorizer),
                    SynthesisOrigin::Fallback,
                )
            }
        };

        let total = b.items.len();
        let mut items = b.items;
        items.sort_by(|x, y| y.published.cmp(&x.published));
        items.truncate(MAX_ITEMS_PER_SECTION);

        sections.push(Section {
            label: b.label,
            total,
            items,
            synthesis,
            origin,
        });
    }

    Digest {
        generated: *now,
        window_start: window_start(now, window_days),
        sections,
    }
}

/// `RV Park Weekly Digest — Mar 08, 2025`, dated in the canonical timezone.
pub fn subject(now: &DateTime<Tz>) -> String {
    format!("{REPORT_TITLE} \u{2014} {}", now.format(DATE_FMT))
}

pub fn render_html(digest: &Digest) -> String {
    let mut parts: Vec<String> = Vec::new();
    parts.push(format!("<h2>{REPORT_TITLE}</h2>"));
    let end = digest.generated.format(DATE_FMT);
    parts.push(match digest.window_start {
        Some(start) => format!("<p><b>Window:</b> {} \u{2013} {end}</p>", start.format(DATE_FMT)),
        None => format!("<p><b>Window:</b> through {end}</p>"),
    });

    if digest.is_empty() {
        parts.push("<p>No relevant items this week.</p>".to_string());
    }

    for s in &digest.sections {
        parts.push(format!("<h3>{} ({})</h3>", encode_text(&s.label), s.total));
        parts.push(format!("<p>{}</p>", encode_text(&s.synthesis)));
        parts.push("<ul>".to_string());
        for it in &s.items {
            let d = to_canonical(&it.published).format(DATE_FMT);
            parts.push(format!(
                "<li><b>{d}</b> \u{2014} <a href=\"{}\">{}</a> <i>({})</i></li>",
                encode_double_quoted_attribute(&it.url),
                encode_text(&it.title),
                encode_text(&it.source)
            ));
        }
        parts.push("</ul>".to_string());
    }

    parts.push(
        "<p style='color:#666;font-size:12px'>Automated weekly digest.</p>".to_string(),
    );
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::{DisabledSummarizer, FixedSummarizer};
    use crate::temporal::CANONICAL_TZ;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Tz> {
        CANONICAL_TZ.with_ymd_and_hms(2025, 3, 8, 9, 0, 0).unwrap()
    }

    fn item(title: &str, days_ago: i64) -> NewsItem {
        NewsItem {
            source: "Feed".into(),
            title: title.into(),
            url: format!("https://x.test/{}", title.replace(' ', "-")),
            published: (now() - Duration::days(days_ago)).fixed_offset(),
            summary: String::new(),
        }
    }

    fn bucket(label: &str, items: Vec<NewsItem>) -> Bucket {
        Bucket {
            label: label.into(),
            items,
        }
    }

    #[tokio::test]
    async fn sections_by_count_items_newest_first() {
        let c = Categorizer::builtin().unwrap();
        let buckets = vec![
            bucket("Legal / Zoning", vec![item("zoning a", 1)]),
            bucket(
                "Acquisitions / For Sale",
                vec![item("deal old", 5), item("deal new", 1)],
            ),
            bucket("Other", vec![item("misc", 2)]),
        ];
        let d = assemble(buckets, &c, &DisabledSummarizer, &now(), 7).await;
        let labels: Vec<&str> = d.sections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Acquisitions / For Sale", "Legal / Zoning", "Other"]);
        assert_eq!(d.sections[0].items[0].title, "deal new");
        assert_eq!(d.sections[0].origin, SynthesisOrigin::Fallback);
    }

    #[tokio::test]
    async fn sections_are_capped() {
        let c = Categorizer::builtin().unwrap();
        let many: Vec<NewsItem> = (0..20).map(|i| item(&format!("item {i}"), i % 7)).collect();
        let buckets = vec![bucket("Other", many)];
        let d = assemble(buckets, &c, &DisabledSummarizer, &now(), 7).await;
        assert_eq!(d.sections[0].total, 20);
        assert_eq!(d.sections[0].items.len(), MAX_ITEMS_PER_SECTION);
    }

    #[tokio::test]
    async fn provider_text_is_used_when_present() {
        let c = Categorizer::builtin().unwrap();
        let fixed = FixedSummarizer {
            text: "Deals dominated.".into(),
        };
        let buckets = vec![bucket("Other", vec![item("a", 1)])];
        let d = assemble(buckets, &c, &fixed, &now(), 7).await;
        assert_eq!(d.sections[0].synthesis, "Deals dominated.");
        assert_eq!(d.sections[0].origin, SynthesisOrigin::Provider("fixed"));
    }

    #[test]
    fn ranking_prefers_score_then_recency() {
        let c = Categorizer::builtin().unwrap();
        let items = vec![item("plain old", 3), item("plain new", 1), item("koa deal", 6)];
        let r = rank_for_synthesis(&items, &c);
        let titles: Vec<&str> = r.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["koa deal", "plain new", "plain old"]);
    }

    #[tokio::test]
    async fn html_escapes_and_shows_window() {
        let c = Categorizer::builtin().unwrap();
        let mut it = item("Parks <sold> & more", 1);
        it.source = "Search: R&D".into();
        let buckets = vec![bucket("Other", vec![it])];
        let d = assemble(buckets, &c, &DisabledSummarizer, &now(), 7).await;
        let html = render_html(&d);
        assert!(html.contains("<b>Window:</b> Mar 01, 2025 \u{2013} Mar 08, 2025"));
        assert!(html.contains("Parks &lt;sold&gt; &amp; more"));
        assert!(html.contains("<i>(Search: R&amp;D)</i>"));
        assert!(html.contains("<h3>Other (1)</h3>"));
        assert!(html.contains("<b>Mar 07, 2025</b>"));
    }

    #[tokio::test]
    async fn empty_digest_still_renders() {
        let c = Categorizer::builtin().unwrap();
        let d = assemble(Vec::new(), &c, &DisabledSummarizer, &now(), 7).await;
        assert!(d.is_empty());
        assert!(render_html(&d).contains("No relevant items"));
    }

    #[tokio::test]
    async fn oversized_window_renders_open_start() {
        let c = Categorizer::builtin().unwrap();
        let d = assemble(
            vec![bucket("Other", vec![item("a", 1)])],
            &c,
            &DisabledSummarizer,
            &now(),
            200_000_000,
        )
        .await;
        assert!(d.window_start.is_none());
        assert!(render_html(&d).contains("<b>Window:</b> through Mar 08, 2025"));
    }

    #[test]
    fn subject_uses_local_date() {
        assert_eq!(subject(&now()), "RV Park Weekly Digest \u{2014} Mar 08, 2025");
    }
}

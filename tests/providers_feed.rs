// tests/providers_feed.rs
use chrono::{Datelike, Timelike};
use rv_park_digest::ingest::providers::feed::FeedFetcher;

const WOODALLS_XML: &str = include_str!("fixtures/woodalls_rss.xml");
const ATOM_XML: &str = include_str!("fixtures/atom.xml");

#[test]
fn rss_fixture_keeps_complete_entries_only() {
    let items =
        FeedFetcher::parse_items_from_str("Woodall's Campground Management", WOODALLS_XML)
            .expect("rss parse ok");
    assert_eq!(items.len(), 2, "entries without title or date are dropped: {items:?}");

    let first = &items[0];
    assert_eq!(first.title, "Sunny Acres RV Park sold in Ocala, Florida");
    assert_eq!(first.url, "https://woodallscm.com/2025/03/sunny-acres-sold/");
    assert_eq!(first.source, "Woodall's Campground Management");
    assert_eq!(
        first.summary,
        "The 120-site RV park changed hands in a deal brokered by a regional firm."
    );
    assert_eq!(first.published.day(), 5);
    assert_eq!(first.published.hour(), 14);

    // GMT named zone reads as UTC
    assert_eq!(items[1].published.offset().local_minus_utc(), 0);
    // item-level <atom:link rel="self"> and inline <b> leave the entry intact
    assert_eq!(items[1].url, "https://woodallscm.com/2025/03/expansion-permit/");
    assert_eq!(
        items[1].summary,
        "Planning commission approval clears 40 new sites in Texas."
    );
}

#[test]
fn atom_fixture_uses_alternate_link_and_updated_fallback() {
    let items =
        FeedFetcher::parse_items_from_str("Modern Campground", ATOM_XML).expect("atom parse ok");
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].url, "https://moderncampground.com/koa-new-franchise/");
    assert_eq!(items[0].summary, "The new location adds 85 sites.");
    // `published` wins over `updated`
    assert_eq!(items[0].published.to_rfc3339(), "2025-03-06T08:15:00-05:00");

    assert_eq!(items[1].url, "https://moderncampground.com/occupancy-report/");
    assert_eq!(items[1].published.to_rfc3339(), "2025-03-04T16:00:00+00:00");
    assert_eq!(items[1].summary, "Occupancy rose across the U.S. in February.");
}

// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod temporal;

// Collection: fetchers, collector, source table
pub mod ingest;

// Filtering & report
pub mod categorize;
pub mod relevance;
pub mod report;
pub mod synthesis;

// Delivery
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::categorize::{Bucket, Categorizer};
pub use crate::ingest::types::{Collection, FetchStrategy, NewsItem, SearchQuery, SourceSpec};
pub use crate::relevance::{RelevanceFilter, Verdict};

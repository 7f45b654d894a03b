// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::{FetchStrategy, SearchQuery, SourceSpec};

const ENV_PATH: &str = "SOURCES_CONFIG_PATH";
const DEFAULT_PATH: &str = "config/sources.toml";
const BUILTIN_SOURCES: &str = include_str!("../../config/sources.toml");

pub const DEFAULT_SEARCH_BASE: &str = "https://news.google.com/rss/search";

/// The human-maintained source table: sources, search queries, search feed base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTable {
    pub sources: Vec<SourceSpec>,
    pub queries: Vec<SearchQuery>,
    pub search_base: String,
}

#[derive(Deserialize)]
struct RawTable {
    #[serde(default)]
    search: Option<RawSearch>,
    #[serde(default)]
    sources: Vec<SourceSpec>,
    #[serde(default)]
    queries: Vec<SearchQuery>,
}

#[derive(Deserialize)]
struct RawSearch {
    base_url: Option<String>,
}

/// Load the table from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<SourceTable> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
        .with_context(|| format!("parsing sources from {}", path.display()))
}

/// Load the table using env var + fallbacks:
/// 1) $SOURCES_CONFIG_PATH
/// 2) config/sources.toml
/// 3) the copy compiled into the binary
pub fn load_sources_default() -> Result<SourceTable> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("SOURCES_CONFIG_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_PATH);
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    builtin_sources()
}

pub fn builtin_sources() -> Result<SourceTable> {
    parse_sources(BUILTIN_SOURCES, "toml").context("parsing built-in sources")
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<SourceTable> {
    let raw: RawTable = if hint_ext == "json" {
        serde_json::from_str(s)?
    } else {
        toml::from_str(s)?
    };
    clean_table(raw)
}

fn clean_table(raw: RawTable) -> Result<SourceTable> {
    let mut sources = Vec::with_capacity(raw.sources.len());
    for mut s in raw.sources {
        s.name = s.name.trim().to_string();
        s.url = s.url.trim().to_string();
        if s.name.is_empty() || s.url.is_empty() {
            return Err(anyhow!("source rows need a name and a url"));
        }
        if let FetchStrategy::SiteScrape { host, .. } = &s.strategy {
            if host.trim().is_empty() {
                return Err(anyhow!("site_scrape source `{}` has an empty host", s.name));
            }
        }
        sources.push(s);
    }

    let queries = raw
        .queries
        .into_iter()
        .map(|q| SearchQuery {
            name: q.name.trim().to_string(),
            q: q.q.trim().to_string(),
        })
        .filter(|q| !q.q.is_empty())
        .collect();

    let search_base = raw
        .search
        .and_then(|s| s.base_url)
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| DEFAULT_SEARCH_BASE.to_string());

    Ok(SourceTable {
        sources,
        queries,
        search_base,
    })
}

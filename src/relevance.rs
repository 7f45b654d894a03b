// src/relevance.rs
//! Relevance gate: is an item about US RV parks / campgrounds?
//!
//! Three stages over `title + " " + summary`, lower-cased and
//! whitespace-collapsed:
//!
//! 1. topic: at least one `include` phrase (substring),
//! 2. exclusion: no `exclude` phrase (substring),
//! 3. geography: an `operators` name, or a country hint, a full state name,
//!    or a standalone two-letter state code.
//!
//! Ambiguous items are rejected. All lists live in `config/relevance.toml`.

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::ingest::collapse_ws;
use crate::ingest::types::NewsItem;

// --- env defaults & names ---
pub const DEFAULT_RELEVANCE_CONFIG_PATH: &str = "config/relevance.toml";
pub const ENV_RELEVANCE_CONFIG_PATH: &str = "RELEVANCE_CONFIG_PATH";
const BUILTIN_RELEVANCE: &str = include_str!("../config/relevance.toml");

// Dev logging gate: RELEVANCE_DEV_LOG=1
pub(crate) fn dev_logging_enabled() -> bool {
    std::env::var("RELEVANCE_DEV_LOG").ok().as_deref() == Some("1")
}

pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Minimal, anonymized dev logger for relevance decisions.
fn dev_log_relevance(text: &str, verdict: &Verdict) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(text);
    // Never log raw text. Only hashed id + short lists.
    debug!(
        target: "relevance",
        %id,
        in_scope = verdict.in_scope,
        matched = ?verdict.matched.iter().take(5).collect::<Vec<_>>(),
        reasons = ?verdict.reasons.iter().take(5).collect::<Vec<_>>()
    );
}

/// Result of relevance evaluation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub in_scope: bool,
    /// Phrases that counted in favour (topic term, geographic evidence).
    pub matched: Vec<String>,
    /// Why the item was rejected or accepted, e.g. `no_topic_term`, `geo:operator`.
    pub reasons: Vec<String>,
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceRoot {
    pub relevance: RelevanceLists,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceLists {
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub operators: Vec<String>,
    #[serde(default)]
    pub country_hints: Vec<String>,
    #[serde(default)]
    pub region_names: Vec<String>,
    #[serde(default)]
    pub region_codes: Vec<String>,
    #[serde(default)]
    pub comma_only_codes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    lists: RelevanceLists,
}

impl RelevanceFilter {
    /// Load from RELEVANCE_CONFIG_PATH, else "config/relevance.toml", else the built-in copy.
    pub fn from_toml() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_RELEVANCE_CONFIG_PATH) {
            let path = PathBuf::from(p);
            let content = fs::read_to_string(&path).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to read relevance config at {}: {}",
                    path.display(),
                    e
                )
            })?;
            return Self::from_toml_str(&content);
        }
        match fs::read_to_string(DEFAULT_RELEVANCE_CONFIG_PATH) {
            Ok(content) => Self::from_toml_str(&content),
            Err(_) => Self::builtin(),
        }
    }

    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml_str(BUILTIN_RELEVANCE)
    }

    /// Load from a TOML string. Phrases are lower-cased; codes are upper-cased.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let root: RelevanceRoot = toml::from_str(toml_str)?;
        let mut lists = root.relevance;
        if lists.include.iter().all(|p| p.trim().is_empty()) {
            anyhow::bail!("relevance config needs at least one include phrase");
        }
        for list in [
            &mut lists.include,
            &mut lists.exclude,
            &mut lists.operators,
            &mut lists.country_hints,
            &mut lists.region_names,
        ] {
            clean_phrases(list, |s| s.to_lowercase());
        }
        for list in [&mut lists.region_codes, &mut lists.comma_only_codes] {
            clean_phrases(list, |s| s.to_uppercase());
        }
        Ok(Self { lists })
    }

    pub fn is_in_scope(&self, item: &NewsItem) -> bool {
        self.evaluate(item).in_scope
    }

    pub fn evaluate(&self, item: &NewsItem) -> Verdict {
        self.evaluate_text(&item.haystack())
    }

    /// Evaluate raw text (the caller joins title and summary).
    pub fn evaluate_text(&self, text: &str) -> Verdict {
        let original = collapse_ws(text);
        let hay = original.to_lowercase();
        let mut v = Verdict::default();

        // 1) Topic
        let topic: Vec<&String> = self
            .lists
            .include
            .iter()
            .filter(|p| hay.contains(p.as_str()))
            .collect();
        if topic.is_empty() {
            v.reasons.push("no_topic_term".into());
            dev_log_relevance(&hay, &v);
            return v;
        }
        v.matched.extend(topic.into_iter().cloned());

        // 2) Exclusions
        if let Some(ex) = self.lists.exclude.iter().find(|p| hay.contains(p.as_str())) {
            v.matched.clear();
            v.reasons.push(format!("excluded:{ex}"));
            dev_log_relevance(&hay, &v);
            return v;
        }

        // 3) Geography
        match self.geo_evidence(&original, &hay) {
            Some((kind, what)) => {
                v.in_scope = true;
                v.matched.push(what);
                v.reasons.push(format!("geo:{kind}"));
            }
            None => v.reasons.push("no_geo_hint".into()),
        }
        dev_log_relevance(&hay, &v);
        v
    }

    /// First piece of evidence that the item is about the US market.
    fn geo_evidence(&self, original: &str, hay: &str) -> Option<(&'static str, String)> {
        if let Some(op) = self.lists.operators.iter().find(|p| contains_bounded(hay, p)) {
            return Some(("operator", op.clone()));
        }
        if let Some(h) = self.lists.country_hints.iter().find(|p| contains_bounded(hay, p)) {
            return Some(("country", h.clone()));
        }
        if let Some(r) = self.lists.region_names.iter().find(|p| contains_bounded(hay, p)) {
            return Some(("region_name", r.clone()));
        }
        self.lists
            .region_codes
            .iter()
            .find(|code| {
                let comma_only = self.lists.comma_only_codes.contains(code);
                contains_region_code(original, code, comma_only)
            })
            .map(|code| ("region_code", code.clone()))
    }
}

fn clean_phrases(list: &mut Vec<String>, norm: impl Fn(&str) -> String) {
    let cleaned: Vec<String> = list
        .iter()
        .map(|s| collapse_ws(&norm(s)))
        .filter(|s| !s.is_empty())
        .collect();
    *list = cleaned;
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

/// `needle` occurs in `hay` with no letter/digit directly before or after it.
/// Works for phrases that start or end with punctuation (`u.s.`).
pub fn contains_bounded(hay: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    hay.match_indices(needle).any(|(start, m)| {
        let before = hay[..start].chars().next_back();
        let after = hay[start + m.len()..].chars().next();
        let left_ok = before.map_or(true, |c| !is_word_char(c) || !starts_with_word_char(needle));
        let right_ok = after.map_or(true, |c| !is_word_char(c) || !ends_with_word_char(needle));
        left_ok && right_ok
    })
}

fn starts_with_word_char(s: &str) -> bool {
    s.chars().next().is_some_and(is_word_char)
}

fn ends_with_word_char(s: &str) -> bool {
    s.chars().next_back().is_some_and(is_word_char)
}

/// Upper-case two-letter code standing alone between spaces/punctuation or
/// the text edges. `comma_only` codes must follow a comma (`Salem, OR`).
pub fn contains_region_code(text: &str, code: &str, comma_only: bool) -> bool {
    text.match_indices(code).any(|(start, m)| {
        let before = text[..start].chars().next_back();
        let after = text[start + m.len()..].chars().next();
        let left_ok = before.map_or(true, |c| !is_word_char(c));
        let right_ok = after.map_or(true, |c| !is_word_char(c));
        if !(left_ok && right_ok) {
            return false;
        }
        if comma_only {
            return text[..start].trim_end().ends_with(',');
        }
        true
    })
}

/* ----------------------------
Tests
---------------------------- */

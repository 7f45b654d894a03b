// src/categorize.rs
//! Multi-label keyword tagging into topical buckets.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::ingest::types::NewsItem;

pub const DEFAULT_CATEGORIES_CONFIG_PATH: &str = "config/categories.toml";
pub const ENV_CATEGORIES_CONFIG_PATH: &str = "CATEGORIES_CONFIG_PATH";
const BUILTIN_CATEGORIES: &str = include_str!("../config/categories.toml");

#[derive(Debug, Clone, Deserialize)]
struct CategoriesRoot {
    #[serde(default = "default_catch_all")]
    catch_all: String,
    categories: Vec<Category>,
    #[serde(default)]
    importance: Importance,
}

fn default_catch_all() -> String {
    "Other".to_string()
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub label: String,
    pub keywords: Vec<String>,
}

/// Ranking knobs for picking the items handed to synthesis.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Importance {
    #[serde(default)]
    pub major_operators: Vec<String>,
    #[serde(default)]
    pub boost: u32,
}

/// Items grouped under one label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub items: Vec<NewsItem>,
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    categories: Vec<Category>,
    catch_all: String,
    importance: Importance,
}

impl Categorizer {
    /// CATEGORIES_CONFIG_PATH, else config/categories.toml, else the built-in table.
    pub fn from_toml() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CATEGORIES_CONFIG_PATH) {
            let path = PathBuf::from(p);
            let content = fs::read_to_string(&path)
                .with_context(|| format!("reading categories from {}", path.display()))?;
            return Self::from_toml_str(&content);
        }
        match fs::read_to_string(DEFAULT_CATEGORIES_CONFIG_PATH) {
            Ok(content) => Self::from_toml_str(&content),
            Err(_) => Self::builtin(),
        }
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_CATEGORIES).context("parsing built-in categories")
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let root: CategoriesRoot = toml::from_str(s)?;
        let catch_all = root.catch_all.trim().to_string();
        if catch_all.is_empty() {
            anyhow::bail!("catch_all label must not be empty");
        }
        let categories = root
            .categories
            .into_iter()
            .map(|c| Category {
                label: c.label.trim().to_string(),
                keywords: lower_nonempty(c.keywords),
            })
            .filter(|c| !c.label.is_empty())
            .collect();
        let importance = Importance {
            major_operators: lower_nonempty(root.importance.major_operators),
            boost: root.importance.boost,
        };
        Ok(Self {
            categories,
            catch_all,
            importance,
        })
    }

    pub fn catch_all(&self) -> &str {
        &self.catch_all
    }

    /// Every label with at least one keyword hit, in table order.
    /// Never empty: no hit yields exactly the catch-all label.
    pub fn categorize(&self, item: &NewsItem) -> Vec<String> {
        let hay = item.haystack().to_lowercase();
        let tags: Vec<String> = self
            .categories
            .iter()
            .filter(|c| c.keywords.iter().any(|k| hay.contains(k.as_str())))
            .map(|c| c.label.clone())
            .collect();
        if tags.is_empty() {
            vec![self.catch_all.clone()]
        } else {
            tags
        }
    }

    /// Distinct keywords (across all categories) found in the item, table order.
    pub fn keyword_hits(&self, item: &NewsItem) -> Vec<String> {
        let hay = item.haystack().to_lowercase();
        let mut hits: Vec<String> = Vec::new();
        for k in self.categories.iter().flat_map(|c| c.keywords.iter()) {
            if hay.contains(k.as_str()) && !hits.contains(k) {
                hits.push(k.clone());
            }
        }
        hits
    }

    pub fn mentions_major_operator(&self, item: &NewsItem) -> bool {
        let hay = item.haystack().to_lowercase();
        self.importance
            .major_operators
            .iter()
            .any(|op| hay.contains(op.as_str()))
    }

    /// Keyword hits plus the operator boost.
    pub fn importance_score(&self, item: &NewsItem) -> u32 {
        let hits = self.keyword_hits(item).len() as u32;
        if self.mentions_major_operator(item) {
            hits + self.importance.boost
        } else {
            hits
        }
    }

    /// Group items per label. Buckets come out in table order with the
    /// catch-all last; empty buckets are omitted. An item lands in every
    /// bucket it was tagged with.
    pub fn bucketize(&self, items: &[NewsItem]) -> Vec<Bucket> {
        let mut buckets: Vec<Bucket> = self
            .categories
            .iter()
            .map(|c| c.label.as_str())
            .chain(std::iter::once(self.catch_all.as_str()))
            .map(|label| Bucket {
                label: label.to_string(),
                items: Vec::new(),
            })
            .collect();

        for it in items {
            for tag in self.categorize(it) {
                if let Some(b) = buckets.iter_mut().find(|b| b.label == tag) {
                    b.items.push(it.clone());
                }
            }
        }
        buckets.retain(|b| !b.items.is_empty());
        buckets
    }
}

fn lower_nonempty(list: Vec<String>) -> Vec<String> {
    list.into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

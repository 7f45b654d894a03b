// src/synthesis.rs
//! Per-bucket synthesis: an optional language-model provider plus the
//! deterministic local fallback used whenever it returns nothing.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::categorize::Categorizer;
use crate::config::AiSettings;
use crate::ingest::types::NewsItem;
use crate::temporal::to_canonical;

/// Longest synthesis kept, in characters.
pub const MAX_SYNTHESIS_CHARS: usize = 600;

/// Capability used by the report: a short paragraph for one bucket, or `None`.
pub trait Summarizer: Send + Sync {
    fn summarize<'a>(
        &'a self,
        label: &'a str,
        items: &'a [NewsItem],
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>>;
    fn provider_name(&self) -> &'static str;
}

pub type DynSummarizer = Arc<dyn Summarizer>;

/// Pick the provider: OpenAI when an API key is configured, disabled otherwise.
pub fn build_summarizer(settings: &AiSettings) -> DynSummarizer {
    let Some(key) = settings.api_key.as_deref() else {
        return Arc::new(DisabledSummarizer);
    };
    match OpenAiSummarizer::new(key, &settings.model, &settings.base_url) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            warn!(error = %e, "synthesis provider unavailable, using local fallback");
            Arc::new(DisabledSummarizer)
        }
    }
}

/// Always `None`.
pub struct DisabledSummarizer;

impl Summarizer for DisabledSummarizer {
    fn summarize<'a>(
        &'a self,
        _label: &'a str,
        _items: &'a [NewsItem],
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(async { None })
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Returns the same text for every bucket. Local runs and tests.
#[derive(Clone)]
pub struct FixedSummarizer {
    pub text: String,
}

impl Summarizer for FixedSummarizer {
    fn summarize<'a>(
        &'a self,
        _label: &'a str,
        _items: &'a [NewsItem],
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        let out = sanitize(&self.text);
        Box::pin(async move { (!out.is_empty()).then_some(out) })
    }
    fn provider_name(&self) -> &'static str {
        "fixed"
    }
}

/// Chat Completions client.
pub struct OpenAiSummarizer {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiSummarizer {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("rv-park-digest/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
        })
    }

    async fn summarize_impl(&self, label: &str, items: &[NewsItem]) -> Option<String> {
        if self.api_key.is_empty() || items.is_empty() {
            return None;
        }

        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: String,
        }

        let sys = "You summarize weekly news for owners and investors of US RV parks \
                   and campgrounds. Write 2-3 plain sentences on the common themes. \
                   No lists, no emojis, no links.";
        let user = prompt_for(label, items);
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: sys,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.2,
            max_tokens: 220,
        };

        let resp = match self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!(error = %e, label, "synthesis request failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            debug!(status = %resp.status(), label, "synthesis request rejected");
            return None;
        }
        let body: Resp = resp.json().await.ok()?;
        let content = body.choices.first().map(|c| c.message.content.as_str())?;
        let cleaned = sanitize(content);
        (!cleaned.is_empty()).then_some(cleaned)
    }
}

impl Summarizer for OpenAiSummarizer {
    fn summarize<'a>(
        &'a self,
        label: &'a str,
        items: &'a [NewsItem],
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + 'a>> {
        Box::pin(self.summarize_impl(label, items))
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

fn prompt_for(label: &str, items: &[NewsItem]) -> String {
    let mut s = format!("Category: {label}\nHeadlines:\n");
    for it in items {
        let date = to_canonical(&it.published).format("%Y-%m-%d");
        s.push_str(&format!("- {date} | {} ({})\n", it.title, it.source));
    }
    s
}

/// Single line, collapsed whitespace, at most [`MAX_SYNTHESIS_CHARS`] characters.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_SYNTHESIS_CHARS));
    let mut prev_space = false;
    for ch in input.chars() {
        let c = if ch.is_whitespace() || ch.is_control() { ' ' } else { ch };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    let trimmed = out.trim_end();
    if trimmed.chars().count() > MAX_SYNTHESIS_CHARS {
        trimmed.chars().take(MAX_SYNTHESIS_CHARS).collect::<String>().trim_end().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Local synthesis: item count plus the three most frequent category keywords.
pub fn fallback_synthesis(label: &str, items: &[NewsItem], categorizer: &Categorizer) -> String {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for it in items {
        for k in categorizer.keyword_hits(it) {
            match counts.iter_mut().find(|(kw, _)| *kw == k) {
                Some((_, n)) => *n += 1,
                None => counts.push((k, 1)),
            }
        }
    }
    // stable: equal counts keep first-seen order
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let noun = if items.len() == 1 { "item" } else { "items" };
    if counts.is_empty() {
        return format!("{} {noun} in {label}. No dominant theme this week.", items.len());
    }
    let top: Vec<&str> = counts.iter().take(3).map(|(k, _)| k.as_str()).collect();
    format!(
        "{} {noun} in {label}. Recurring themes: {}.",
        items.len(),
        top.join(", ")
    )
}

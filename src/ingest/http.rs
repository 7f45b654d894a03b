// src/ingest/http.rs
//! The single HTTP GET primitive every fetcher goes through.

use anyhow::{Context, Result};
use std::time::Duration;

pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; RvParkDigestBot/1.0; +https://github.com/)";
pub const FETCH_TIMEOUT_SECS: u64 = 25;

#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }

    /// GET `url` and return the body. Network errors and non-2xx statuses are errors.
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("GET {url} returned {status}");
        }
        resp.text()
            .await
            .with_context(|| format!("reading body of {url}"))
    }
}

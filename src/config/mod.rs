// src/config/mod.rs
//! Environment settings: SMTP transport, recipient, optional synthesis key.
//!
//! Everything is read through a lookup closure so tests never touch the
//! process environment.

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub to: String,
    /// Defaults to `username`.
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiSettings {
    /// `None` disables synthesis.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub smtp: SmtpSettings,
    pub ai: AiSettings,
}

/// Non-empty, trimmed value for `key`.
fn get<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    get(lookup, key).ok_or_else(|| anyhow!("missing required setting {key}"))
}

impl SmtpSettings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let username = require(&lookup, "SMTP_USERNAME")?;
        let password = require(&lookup, "SMTP_PASSWORD")?;
        let to = require(&lookup, "TO_EMAIL")?;
        let host = get(&lookup, "SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
        let port = match get(&lookup, "SMTP_PORT") {
            Some(p) => p
                .parse::<u16>()
                .with_context(|| format!("SMTP_PORT is not a port number: {p}"))?,
            None => DEFAULT_SMTP_PORT,
        };
        let from = get(&lookup, "FROM_EMAIL").unwrap_or_else(|| username.clone());
        Ok(Self {
            host,
            port,
            username,
            password,
            to,
            from,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }
}

impl AiSettings {
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_key: get(&lookup, "OPENAI_API_KEY"),
            model: get(&lookup, "OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            base_url: get(&lookup, "OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }
}

impl Settings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            smtp: SmtpSettings::from_lookup(&lookup)?,
            ai: AiSettings::from_lookup(&lookup),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply() {
        let s = Settings::from_lookup(lookup(&[
            ("SMTP_USERNAME", "bot@example.com"),
            ("SMTP_PASSWORD", "secret"),
            ("TO_EMAIL", "owner@example.com"),
        ]))
        .unwrap();
        assert_eq!(s.smtp.host, DEFAULT_SMTP_HOST);
        assert_eq!(s.smtp.port, 587);
        assert_eq!(s.smtp.from, "bot@example.com");
        assert_eq!(s.ai.api_key, None);
        assert_eq!(s.ai.model, DEFAULT_OPENAI_MODEL);
    }

    #[test]
    fn missing_recipient_is_fatal() {
        let err = SmtpSettings::from_lookup(lookup(&[
            ("SMTP_USERNAME", "bot@example.com"),
            ("SMTP_PASSWORD", "secret"),
            ("TO_EMAIL", "   "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("TO_EMAIL"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let r = SmtpSettings::from_lookup(lookup(&[
            ("SMTP_USERNAME", "u"),
            ("SMTP_PASSWORD", "p"),
            ("TO_EMAIL", "t@example.com"),
            ("SMTP_PORT", "smtp"),
        ]));
        assert!(r.is_err());
    }
}

use std::env;

use anyhow::{Result, bail};

pub const DEFAULT_FLAG_BASE_URL: &str = "https://app.launchdarkly.com";
pub const DEFAULT_FLAG_ENVIRONMENT: &str = "development";
pub const DEFAULT_PAGE_TITLE: &str = "Feature flag summary";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_USER_AGENT: &str = "flagsum/0.1";

/// Resolved runtime configuration, built once at startup and passed into
/// both the flag fetcher and the page publisher.
#[derive(Debug, Clone)]
pub struct Settings {
    pub flag_project_key: String,
    pub flag_api_key: String,
    pub flag_environment: String,
    pub flag_base_url: String,
    pub wiki_base_url: String,
    pub wiki_space_key: String,
    pub wiki_username: String,
    pub wiki_api_key: String,
    pub page_title: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds settings from an injected variable lookup so tests never read
    /// process globals. Required variables fail with the variable name;
    /// blank values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            flag_project_key: required(&lookup, "LAUNCHDARKLY_PROJECT_KEY")?,
            flag_api_key: required(&lookup, "LAUNCHDARKLY_API_KEY")?,
            flag_environment: optional(
                &lookup,
                "LAUNCHDARKLY_ENVIRONMENT",
                DEFAULT_FLAG_ENVIRONMENT,
            ),
            flag_base_url: trim_base_url(&optional(
                &lookup,
                "LAUNCHDARKLY_BASE_URL",
                DEFAULT_FLAG_BASE_URL,
            )),
            wiki_base_url: trim_base_url(&required(&lookup, "CONFLUENCE_BASE_URL")?),
            wiki_space_key: required(&lookup, "CONFLUENCE_SPACE_KEY")?,
            wiki_username: required(&lookup, "CONFLUENCE_USERNAME")?,
            wiki_api_key: required(&lookup, "CONFLUENCE_API_KEY")?,
            page_title: optional(&lookup, "CONFLUENCE_PAGE_TITLE", DEFAULT_PAGE_TITLE),
            timeout_ms: optional_u64(&lookup, "FLAGSUM_HTTP_TIMEOUT_MS", DEFAULT_TIMEOUT_MS),
            user_agent: optional(&lookup, "FLAGSUM_USER_AGENT", DEFAULT_USER_AGENT),
        })
    }
}

/// Keeps the first four characters of a secret and stars the rest; secrets
/// of eight characters or fewer are fully starred.
pub fn mask_secret(value: &str) -> String {
    let total = value.chars().count();
    if total > 8 {
        let visible: String = value.chars().take(4).collect();
        format!("{visible}{}", "*".repeat(total - 4))
    } else {
        "*".repeat(total)
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => bail!("missing required environment variable {key}"),
    }
}

fn optional<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => value.trim().to_string(),
        _ => default.to_string(),
    }
}

fn optional_u64<F>(lookup: &F, key: &str, default: u64) -> u64
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn trim_base_url(value: &str) -> String {
    value.trim_end_matches('/').to_string()
}

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::config::Settings;

/// One feature flag as reported by the flag service. Field values are kept
/// verbatim; a flag without a description carries an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagRecord {
    pub name: String,
    pub key: String,
    pub description: String,
}

pub trait FlagApi {
    fn list_flags(&mut self, project_key: &str, environment: &str) -> Result<Vec<FlagRecord>>;
    fn request_count(&self) -> usize;
}

/// Blocking flag service client. One GET per listing, no pagination: only
/// the first page upstream returns is used.
pub struct FlagServiceClient {
    client: Client,
    base_url: String,
    api_key: String,
    user_agent: String,
    request_count: usize,
}

impl FlagServiceClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .context("failed to build flag service HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.flag_base_url.clone(),
            api_key: settings.flag_api_key.clone(),
            user_agent: settings.user_agent.clone(),
            request_count: 0,
        })
    }
}

impl FlagApi for FlagServiceClient {
    fn list_flags(&mut self, project_key: &str, environment: &str) -> Result<Vec<FlagRecord>> {
        let url = format!("{}/api/v2/flags/{project_key}", self.base_url);
        self.request_count += 1;
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.api_key.clone())
            .header("User-Agent", self.user_agent.clone())
            .query(&[("filterEnv", environment)])
            .send()
            .with_context(|| format!("failed to fetch feature flags from {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("flag service request failed with HTTP {status}");
        }

        let payload: Value = response
            .json()
            .context("failed to decode flag service JSON response")?;
        parse_flag_list(payload)
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

/// Validates the `{ items: [...] }` listing shape at the boundary. Unknown
/// item fields are dropped; a payload without `items`, or an item without
/// `name`/`key`, is rejected.
pub fn parse_flag_list(payload: Value) -> Result<Vec<FlagRecord>> {
    let parsed: FlagListResponse =
        serde_json::from_value(payload).context("failed to decode flag listing response")?;
    Ok(parsed
        .items
        .into_iter()
        .map(|item| FlagRecord {
            name: item.name,
            key: item.key,
            description: item.description,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct FlagListResponse {
    items: Vec<FlagItem>,
}

#[derive(Debug, Deserialize)]
struct FlagItem {
    name: String,
    key: String,
    #[serde(default)]
    description: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{FlagRecord, parse_flag_list};

    #[test]
    fn parses_items_and_drops_unknown_fields() {
        let payload = json!({
            "items": [
                {
                    "name": "dark-mode",
                    "key": "dm",
                    "description": "toggle dark UI",
                    "kind": "boolean",
                    "temporary": false
                },
                {
                    "name": "beta-banner",
                    "key": "bb",
                    "description": "show the beta banner"
                }
            ],
            "totalCount": 2
        });
        let flags = parse_flag_list(payload).expect("payload should decode");
        assert_eq!(
            flags,
            vec![
                FlagRecord {
                    name: "dark-mode".to_string(),
                    key: "dm".to_string(),
                    description: "toggle dark UI".to_string(),
                },
                FlagRecord {
                    name: "beta-banner".to_string(),
                    key: "bb".to_string(),
                    description: "show the beta banner".to_string(),
                },
            ]
        );
    }

    #[test]
    fn missing_description_defaults_to_empty() {
        let payload = json!({ "items": [{ "name": "audit-log", "key": "al" }] });
        let flags = parse_flag_list(payload).expect("payload should decode");
        assert_eq!(flags[0].description, "");
    }

    #[test]
    fn empty_items_list_decodes_to_no_flags() {
        let payload = json!({ "items": [] });
        let flags = parse_flag_list(payload).expect("payload should decode");
        assert!(flags.is_empty());
    }

    #[test]
    fn payload_without_items_is_rejected() {
        let payload = json!({ "message": "access denied" });
        let error = parse_flag_list(payload).expect_err("missing items should fail");
        assert!(error.to_string().contains("flag listing"));
    }

    #[test]
    fn item_without_key_is_rejected() {
        let payload = json!({ "items": [{ "name": "dark-mode" }] });
        assert!(parse_flag_list(payload).is_err());
    }

    #[test]
    fn item_without_name_is_rejected() {
        let payload = json!({ "items": [{ "key": "dm", "description": "toggle dark UI" }] });
        assert!(parse_flag_list(payload).is_err());
    }
}

use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Settings;
use crate::flags::{FlagApi, FlagRecord, FlagServiceClient};
use crate::table::render_table;

/// Identity and current version of a wiki page, as returned by the content
/// search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRef {
    pub id: String,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SpaceRef {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VersionRef {
    pub number: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StorageBody {
    pub value: String,
    pub representation: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageBody {
    pub storage: StorageBody,
}

/// Update payload for a content PUT. Everything except the body and the
/// version number echoes the page as found.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageUpdate {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub title: String,
    pub space: SpaceRef,
    pub version: VersionRef,
    pub body: PageBody,
}

impl PageUpdate {
    /// Builds the payload that replaces `page`'s body with `table`, bumping
    /// the version number by exactly one.
    pub fn replace_body(page: &PageRef, title: &str, space_key: &str, table: &str) -> Self {
        Self {
            id: page.id.clone(),
            content_type: "page".to_string(),
            title: title.to_string(),
            space: SpaceRef {
                key: space_key.to_string(),
            },
            version: VersionRef {
                number: page.version + 1,
            },
            body: PageBody {
                storage: StorageBody {
                    value: table.to_string(),
                    representation: "wiki".to_string(),
                },
            },
        }
    }
}

pub trait WikiContentApi {
    fn find_pages(&mut self, space_key: &str, title: &str) -> Result<Vec<PageRef>>;
    /// Applies the update and returns the updated page's content URL.
    fn update_page(&mut self, update: &PageUpdate) -> Result<String>;
    fn request_count(&self) -> usize;
}

/// Blocking Confluence REST client using basic auth.
pub struct ConfluenceClient {
    client: Client,
    base_url: String,
    username: String,
    api_key: String,
    user_agent: String,
    request_count: usize,
}

impl ConfluenceClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .context("failed to build wiki HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.wiki_base_url.clone(),
            username: settings.wiki_username.clone(),
            api_key: settings.wiki_api_key.clone(),
            user_agent: settings.user_agent.clone(),
            request_count: 0,
        })
    }

    fn content_url(&self, id: &str) -> String {
        format!("{}/rest/api/content/{id}", self.base_url)
    }
}

impl WikiContentApi for ConfluenceClient {
    fn find_pages(&mut self, space_key: &str, title: &str) -> Result<Vec<PageRef>> {
        let url = format!("{}/rest/api/content", self.base_url);
        self.request_count += 1;
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.username, Some(&self.api_key))
            .header("User-Agent", self.user_agent.clone())
            .query(&[
                ("spaceKey", space_key),
                ("title", title),
                ("expand", "version"),
            ])
            .send()
            .with_context(|| format!("failed to search wiki content at {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("wiki content search failed with HTTP {status}");
        }

        let payload: Value = response
            .json()
            .context("failed to decode wiki search JSON response")?;
        parse_search_results(payload)
    }

    fn update_page(&mut self, update: &PageUpdate) -> Result<String> {
        let url = self.content_url(&update.id);
        self.request_count += 1;
        let response = self
            .client
            .put(&url)
            .basic_auth(&self.username, Some(&self.api_key))
            .header("User-Agent", self.user_agent.clone())
            .json(update)
            .send()
            .with_context(|| format!("failed to update wiki page at {url}"))?;

        let status = response.status();
        if !status.is_success() {
            bail!("wiki page update failed with HTTP {status}");
        }

        Ok(url)
    }

    fn request_count(&self) -> usize {
        self.request_count
    }
}

/// Validates the `{ results: [...] }` search shape at the boundary. Each
/// result must carry an id and a version number.
pub fn parse_search_results(payload: Value) -> Result<Vec<PageRef>> {
    let parsed: SearchResponse =
        serde_json::from_value(payload).context("failed to decode wiki search response")?;
    Ok(parsed
        .results
        .into_iter()
        .map(|result| PageRef {
            id: result.id,
            version: result.version.number,
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: Vec<SearchResultItem>,
}

#[derive(Debug, Deserialize)]
struct SearchResultItem {
    id: String,
    version: VersionItem,
}

#[derive(Debug, Deserialize)]
struct VersionItem {
    number: i64,
}

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Updated,
    PageNotFound,
    SkippedDryRun,
}

impl PublishStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Updated => "updated",
            Self::PageNotFound => "page_not_found",
            Self::SkippedDryRun => "skipped_dry_run",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub status: PublishStatus,
    pub page_title: String,
    pub space_key: String,
    pub flag_count: usize,
    pub page_id: Option<String>,
    pub page_version: Option<i64>,
    pub page_url: Option<String>,
    pub request_count: usize,
}

/// Search-then-update workflow: renders the table, looks the page up by
/// space and title, and overwrites the first match with the next version
/// number. A search with no results is a normal terminal outcome, not an
/// error.
pub fn publish_table_with_api<A: WikiContentApi>(
    api: &mut A,
    settings: &Settings,
    flags: &[FlagRecord],
    options: &PublishOptions,
) -> Result<PublishReport> {
    let table = render_table(flags);
    let pages = api.find_pages(&settings.wiki_space_key, &settings.page_title)?;

    // Upstream response order decides which page wins when titles collide.
    let Some(page) = pages.first() else {
        return Ok(PublishReport {
            status: PublishStatus::PageNotFound,
            page_title: settings.page_title.clone(),
            space_key: settings.wiki_space_key.clone(),
            flag_count: flags.len(),
            page_id: None,
            page_version: None,
            page_url: None,
            request_count: api.request_count(),
        });
    };

    let update =
        PageUpdate::replace_body(page, &settings.page_title, &settings.wiki_space_key, &table);
    if options.dry_run {
        return Ok(PublishReport {
            status: PublishStatus::SkippedDryRun,
            page_title: settings.page_title.clone(),
            space_key: settings.wiki_space_key.clone(),
            flag_count: flags.len(),
            page_id: Some(update.id.clone()),
            page_version: Some(update.version.number),
            page_url: None,
            request_count: api.request_count(),
        });
    }

    let page_url = api.update_page(&update)?;
    Ok(PublishReport {
        status: PublishStatus::Updated,
        page_title: settings.page_title.clone(),
        space_key: settings.wiki_space_key.clone(),
        flag_count: flags.len(),
        page_id: Some(update.id),
        page_version: Some(update.version.number),
        page_url: Some(page_url),
        request_count: api.request_count(),
    })
}

/// Full fetch-render-publish pass over injected APIs.
pub fn publish_summary_with_apis<F, W>(
    flag_api: &mut F,
    wiki_api: &mut W,
    settings: &Settings,
    options: &PublishOptions,
) -> Result<PublishReport>
where
    F: FlagApi,
    W: WikiContentApi,
{
    let flags = flag_api.list_flags(&settings.flag_project_key, &settings.flag_environment)?;
    publish_table_with_api(wiki_api, settings, &flags, options)
}

/// Runs the full workflow against the live services.
pub fn publish_summary(settings: &Settings, options: &PublishOptions) -> Result<PublishReport> {
    let mut flag_api = FlagServiceClient::new(settings)?;
    let mut wiki_api = ConfluenceClient::new(settings)?;
    publish_summary_with_apis(&mut flag_api, &mut wiki_api, settings, options)
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewReport {
    pub flag_count: usize,
    pub table: String,
    pub request_count: usize,
}

/// Fetches flags and renders the table without touching the wiki.
pub fn preview_summary_with_api<F: FlagApi>(
    flag_api: &mut F,
    settings: &Settings,
) -> Result<PreviewReport> {
    let flags = flag_api.list_flags(&settings.flag_project_key, &settings.flag_environment)?;
    Ok(PreviewReport {
        flag_count: flags.len(),
        table: render_table(&flags),
        request_count: flag_api.request_count(),
    })
}

pub fn preview_summary(settings: &Settings) -> Result<PreviewReport> {
    let mut flag_api = FlagServiceClient::new(settings)?;
    preview_summary_with_api(&mut flag_api, settings)
}

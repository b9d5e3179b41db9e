// src/store.rs
//! Storage boundary: the `CandidateStore` trait, the REST-backed
//! implementation, and row validation/normalization. Unvalidated external
//! JSON never crosses into scoring; rows that fail validation are logged and
//! skipped, never abort the batch.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::model::{ContentCandidate, FollowedSource, Source, UserItemAction};
use crate::preferences::UserPreferences;

pub const ENV_STORE_URL: &str = "FEED_STORE_URL";
pub const ENV_STORE_KEY: &str = "FEED_STORE_KEY";

/// Total budget for one storage round-trip.
const STORE_TIMEOUT: Duration = Duration::from_secs(20);

/// Postgres error code for "relation does not exist"; hosted REST layers
/// surface it in the error body.
const UNDEFINED_TABLE: &str = "42P01";

const MAX_TEXT_LEN: usize = 1500;

/// Filters for one candidate fetch.
#[derive(Debug, Clone, Default)]
pub struct CandidateQuery {
    pub days: u32,
    pub types: Vec<Source>,
}

/// Outcome of a candidate fetch. "Backing store not provisioned" is an
/// explicit variant so callers never string-match error messages.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fetched(Vec<ContentCandidate>),
    Unprovisioned(String),
}

#[async_trait::async_trait]
pub trait CandidateStore: Send + Sync {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<FetchOutcome>;
    async fn fetch_preferences(&self, user_id: &str) -> Result<UserPreferences>;
    async fn fetch_actions(&self, user_id: &str) -> Result<Vec<UserItemAction>>;
    async fn fetch_follows(&self, user_id: &str) -> Result<Vec<FollowedSource>>;
}

/* ----------------------------
Row validation & normalization
---------------------------- */

/// Raw row shape as the hosted store returns it. Everything optional except
/// the id; the source arrives as a free string and is validated here.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCandidateRow {
    pub id: String,
    pub source: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub ingested_at: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub follow_marker: Option<String>,
}

pub fn parse_source(s: &str) -> Option<Source> {
    match s.trim().to_ascii_lowercase().as_str() {
        "rss" => Some(Source::Rss),
        "youtube" => Some(Source::Youtube),
        "reddit" => Some(Source::Reddit),
        "podcast" => Some(Source::Podcast),
        "eventbrite" => Some(Source::Eventbrite),
        "spotify" => Some(Source::Spotify),
        _ => None,
    }
}

fn parse_ts(raw: &Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref().and_then(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

/// Normalize display text: decode HTML entities, strip tags, normalize smart
/// quotes, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > MAX_TEXT_LEN {
        out = out.chars().take(MAX_TEXT_LEN).collect();
    }
    out
}

fn norm_opt(s: Option<String>) -> Option<String> {
    s.map(|v| normalize_text(&v)).filter(|v| !v.is_empty())
}

/// Validate one raw row into the internal candidate shape.
pub fn validate_row(row: RawCandidateRow) -> Result<ContentCandidate> {
    let source =
        parse_source(&row.source).ok_or_else(|| anyhow!("unknown source {:?}", row.source))?;
    if row.id.trim().is_empty() {
        return Err(anyhow!("empty candidate id"));
    }
    Ok(ContentCandidate {
        id: row.id,
        source,
        title: norm_opt(row.title),
        summary: norm_opt(row.summary),
        author: norm_opt(row.author),
        url: row.url.filter(|u| !u.trim().is_empty()),
        published_at: parse_ts(&row.published_at),
        ingested_at: parse_ts(&row.ingested_at),
        tags: row.tags,
        topics: row.topics,
        follow_marker: row.follow_marker,
    })
}

/// Validate a batch, dropping (and logging) bad rows instead of failing.
pub fn validate_rows(rows: Vec<RawCandidateRow>) -> Vec<ContentCandidate> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let id = row.id.clone();
        match validate_row(row) {
            Ok(c) => out.push(c),
            Err(e) => warn!(candidate = %id, error = %e, "dropping invalid candidate row"),
        }
    }
    out
}

/* ----------------------------
REST-backed store
---------------------------- */

/// Client for the hosted relational store's REST surface.
pub struct RestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl RestStore {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(STORE_TIMEOUT)
            .build()
            .context("building storage http client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_env() -> Result<Self> {
        let url = std::env::var(ENV_STORE_URL)
            .map_err(|_| anyhow!("{ENV_STORE_URL} is not set"))?;
        let key = std::env::var(ENV_STORE_KEY)
            .map_err(|_| anyhow!("{ENV_STORE_KEY} is not set"))?;
        Self::new(url, key)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path_and_query: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path_and_query);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .with_context(|| format!("storage request to {path_and_query}"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("storage responded {status}: {body}"));
        }
        resp.json::<T>()
            .await
            .with_context(|| format!("decoding storage response from {path_and_query}"))
    }
}

/// True when a storage error means "table/schema missing", the soft condition
/// an empty deployment hits before ingestion ever ran.
pub fn is_unprovisioned(err: &anyhow::Error) -> bool {
    let msg = err.to_string();
    msg.contains(UNDEFINED_TABLE) || msg.to_lowercase().contains("does not exist")
}

#[async_trait::async_trait]
impl CandidateStore for RestStore {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<FetchOutcome> {
        let mut q = format!("/candidates?days={}", query.days);
        if !query.types.is_empty() {
            let types: Vec<&str> = query.types.iter().map(|t| t.as_str()).collect();
            q.push_str(&format!("&types={}", types.join(",")));
        }
        match self.get_json::<Vec<RawCandidateRow>>(&q).await {
            Ok(rows) => Ok(FetchOutcome::Fetched(validate_rows(rows))),
            Err(e) if is_unprovisioned(&e) => Ok(FetchOutcome::Unprovisioned(e.to_string())),
            Err(e) => Err(e),
        }
    }

    async fn fetch_preferences(&self, user_id: &str) -> Result<UserPreferences> {
        let rows: Vec<UserPreferences> = self
            .get_json(&format!("/preferences?user_id={user_id}"))
            .await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn fetch_actions(&self, user_id: &str) -> Result<Vec<UserItemAction>> {
        self.get_json(&format!("/actions?user_id={user_id}")).await
    }

    async fn fetch_follows(&self, user_id: &str) -> Result<Vec<FollowedSource>> {
        self.get_json(&format!("/follows?user_id={user_id}")).await
    }
}

/// Store stand-in used when required configuration is missing at boot. Every
/// call fails with the original reason, which surfaces as HTTP 500.
pub struct MisconfiguredStore {
    pub reason: String,
}

#[async_trait::async_trait]
impl CandidateStore for MisconfiguredStore {
    async fn fetch_candidates(&self, _query: &CandidateQuery) -> Result<FetchOutcome> {
        Err(anyhow!("storage not configured: {}", self.reason))
    }
    async fn fetch_preferences(&self, _user_id: &str) -> Result<UserPreferences> {
        Err(anyhow!("storage not configured: {}", self.reason))
    }
    async fn fetch_actions(&self, _user_id: &str) -> Result<Vec<UserItemAction>> {
        Err(anyhow!("storage not configured: {}", self.reason))
    }
    async fn fetch_follows(&self, _user_id: &str) -> Result<Vec<FollowedSource>> {
        Err(anyhow!("storage not configured: {}", self.reason))
    }
}

/// In-memory store for tests and local development.
#[derive(Default)]
pub struct MemoryStore {
    pub candidates: Vec<ContentCandidate>,
    pub preferences: UserPreferences,
    pub actions: Vec<UserItemAction>,
    pub follows: Vec<FollowedSource>,
    pub unprovisioned: bool,
}

#[async_trait::async_trait]
impl CandidateStore for MemoryStore {
    async fn fetch_candidates(&self, query: &CandidateQuery) -> Result<FetchOutcome> {
        if self.unprovisioned {
            return Ok(FetchOutcome::Unprovisioned(
                "relation \"candidates\" does not exist".into(),
            ));
        }
        let cutoff = Utc::now() - chrono::Duration::days(i64::from(query.days));
        let items = self
            .candidates
            .iter()
            .filter(|c| query.types.is_empty() || query.types.contains(&c.source))
            .filter(|c| {
                c.effective_timestamp()
                    .map(|ts| ts >= cutoff)
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        Ok(FetchOutcome::Fetched(items))
    }

    async fn fetch_preferences(&self, _user_id: &str) -> Result<UserPreferences> {
        Ok(self.preferences.clone())
    }

    async fn fetch_actions(&self, _user_id: &str) -> Result<Vec<UserItemAction>> {
        Ok(self.actions.clone())
    }

    async fn fetch_follows(&self, _user_id: &str) -> Result<Vec<FollowedSource>> {
        Ok(self.follows.clone())
    }
}

// src/sources/mod.rs
//! Source adapters: one per external platform, each mapping native items to [`RawItem`].
//!
//! Polling adapters implement [`SourceAdapter`]; the Discord adapter keeps a
//! gateway connection open and implements [`discord::ChatStream`] instead.

pub mod discord;
pub mod github;
pub mod hackernews;
pub mod reddit;
pub mod stackoverflow;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::config::Settings;
use crate::error::ControlError;
use crate::lead::{LeadSource, RawItem};

pub const USER_AGENT: &str = concat!("lead-scanner/", env!("CARGO_PKG_VERSION"));

#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn source(&self) -> LeadSource;

    /// Configured targets (queries, tags, subreddits) polled each cycle, in order.
    fn targets(&self, settings: &Settings) -> Vec<String>;

    /// Keywords for this source, in configured (priority) order.
    fn keywords(&self, settings: &Settings) -> Vec<String>;

    /// Checked once at start; a failure keeps the loop from starting.
    fn validate(&self, settings: &Settings) -> Result<(), ControlError> {
        require_non_empty(self.source(), "keywords", &self.keywords(settings))?;
        require_non_empty(self.source(), "targets", &self.targets(settings))
    }

    /// One bounded page of the newest items for `target`, newest first.
    async fn fetch(&self, settings: &Settings, target: &str) -> Result<Vec<RawItem>>;
}

pub fn require_non_empty(
    source: LeadSource,
    what: &str,
    list: &[String],
) -> Result<(), ControlError> {
    if list.iter().all(|s| s.trim().is_empty()) {
        return Err(ControlError::missing(source, format!("no {what} configured")));
    }
    Ok(())
}

/// Shared client for polling adapters.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .build()
        .context("building http client")
}

/// All polling adapters sharing one client.
pub fn polling_adapters(client: reqwest::Client) -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(github::GitHubAdapter::new(client.clone())),
        Arc::new(stackoverflow::StackOverflowAdapter::new(client.clone())),
        Arc::new(hackernews::HackerNewsAdapter::new(client.clone())),
        Arc::new(reddit::RedditAdapter::new(client)),
    ]
}

/// Send a prepared request and return the body of a 2xx response.
pub(crate) async fn fetch_body(req: reqwest::RequestBuilder, what: &str) -> Result<String> {
    let resp = req
        .send()
        .await
        .with_context(|| format!("{what}: request failed"))?;
    let resp = resp
        .error_for_status()
        .with_context(|| format!("{what}: non-2xx status"))?;
    resp.text()
        .await
        .with_context(|| format!("{what}: reading body"))
}

/// HTML fragment to plain text: strip tags, decode entities, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();

    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)<!--.*?-->|</?[a-z][^>]*>").expect("tag regex"));
    let stripped = re_tags.replace_all(s, " ");
    let decoded = html_escape::decode_html_entities(&stripped);

    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("whitespace regex"));
    re_ws.replace_all(&decoded, " ").trim().to_string()
}

// src/sources/github.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use serde::Deserialize;

use super::{fetch_body, SourceAdapter};
use crate::config::{sources::page_size, Settings};
use crate::lead::{LeadSource, RawItem};

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<Issue>,
}

#[derive(Debug, Deserialize)]
struct Issue {
    id: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    html_url: String,
    created_at: DateTime<Utc>,
}

/// Issue search (`/search/issues`), newest open issues first.
pub struct GitHubAdapter {
    client: reqwest::Client,
}

impl GitHubAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn parse_search(json: &str) -> Result<Vec<RawItem>> {
        let resp: SearchResponse = serde_json::from_str(json).context("parsing github search json")?;
        Ok(resp
            .items
            .into_iter()
            .map(|it| RawItem {
                source_id: LeadSource::GitHub.source_id(it.id),
                title: it.title,
                content: it.body.unwrap_or_default(),
                url: it.html_url,
                created_at: it.created_at,
            })
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for GitHubAdapter {
    fn source(&self) -> LeadSource {
        LeadSource::GitHub
    }

    fn targets(&self, settings: &Settings) -> Vec<String> {
        settings.github.queries.clone()
    }

    fn keywords(&self, settings: &Settings) -> Vec<String> {
        settings.github.keywords.clone()
    }

    async fn fetch(&self, settings: &Settings, target: &str) -> Result<Vec<RawItem>> {
        let cfg = &settings.github;
        let t0 = std::time::Instant::now();

        let url = format!("{}/search/issues", cfg.api_base.trim_end_matches('/'));
        let mut req = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .query(&[
                ("q", format!("{target} is:issue is:open")),
                ("sort", "created".to_string()),
                ("order", "desc".to_string()),
                ("per_page", page_size(cfg.per_page).to_string()),
            ]);
        if !cfg.token.trim().is_empty() {
            req = req.bearer_auth(cfg.token.trim());
        }

        let body = fetch_body(req, "github search").await?;
        let items = Self::parse_search(&body)?;

        histogram!("scanner_fetch_ms", "source" => "github").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(items)
    }
}

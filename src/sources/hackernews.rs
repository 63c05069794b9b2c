// src/sources/hackernews.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use serde::Deserialize;

use super::{fetch_body, normalize_text, SourceAdapter};
use crate::config::{sources::page_size, Settings};
use crate::lead::{LeadSource, RawItem};

const ITEM_URL: &str = "https://news.ycombinator.com/item?id=";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "objectID")]
    object_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    story_text: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    created_at_i: Option<i64>,
}

/// Story search by date through the Algolia HN API.
pub struct HackerNewsAdapter {
    client: reqwest::Client,
}

impl HackerNewsAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn parse_hits(json: &str) -> Result<Vec<RawItem>> {
        let resp: SearchResponse = serde_json::from_str(json).context("parsing hn search json")?;
        Ok(resp
            .hits
            .into_iter()
            .filter_map(|h| {
                let title = h.title.filter(|t| !t.trim().is_empty())?;
                // link posts carry no text; keep the outbound url searchable
                let content = match h.story_text.as_deref().map(normalize_text) {
                    Some(text) if !text.is_empty() => text,
                    _ => h.url.unwrap_or_default(),
                };
                Some(RawItem {
                    source_id: LeadSource::HackerNews.source_id(&h.object_id),
                    title,
                    content,
                    url: format!("{ITEM_URL}{}", h.object_id),
                    created_at: h
                        .created_at_i
                        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
                        .unwrap_or_else(Utc::now),
                })
            })
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for HackerNewsAdapter {
    fn source(&self) -> LeadSource {
        LeadSource::HackerNews
    }

    fn targets(&self, settings: &Settings) -> Vec<String> {
        settings.hackernews.queries.clone()
    }

    fn keywords(&self, settings: &Settings) -> Vec<String> {
        settings.hackernews.keywords.clone()
    }

    async fn fetch(&self, settings: &Settings, target: &str) -> Result<Vec<RawItem>> {
        let cfg = &settings.hackernews;
        let t0 = std::time::Instant::now();

        let url = format!("{}/search_by_date", cfg.api_base.trim_end_matches('/'));
        let req = self.client.get(url).query(&[
            ("query", target.to_string()),
            ("tags", "story".to_string()),
            ("hitsPerPage", page_size(cfg.hits_per_page).to_string()),
        ]);
        let body = fetch_body(req, "hn search").await?;
        let items = Self::parse_hits(&body)?;

        histogram!("scanner_fetch_ms", "source" => "hackernews")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(items)
    }
}

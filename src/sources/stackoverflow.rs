// src/sources/stackoverflow.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use serde::Deserialize;

use super::{fetch_body, normalize_text, SourceAdapter};
use crate::config::{sources::page_size, Settings};
use crate::lead::{LeadSource, RawItem};

#[derive(Debug, Deserialize)]
struct QuestionsResponse {
    #[serde(default)]
    items: Vec<Question>,
    #[serde(default)]
    backoff: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Question {
    question_id: u64,
    title: String,
    #[serde(default)]
    body: String,
    link: String,
    creation_date: i64,
}

/// Newest questions per tag from the Stack Exchange API (`filter=withbody`).
pub struct StackOverflowAdapter {
    client: reqwest::Client,
}

impl StackOverflowAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn parse_questions(json: &str) -> Result<Vec<RawItem>> {
        let resp: QuestionsResponse =
            serde_json::from_str(json).context("parsing stackexchange questions json")?;
        if let Some(secs) = resp.backoff {
            tracing::debug!(target: "scanner", backoff_secs = secs, "stackexchange asked for backoff");
        }
        Ok(resp
            .items
            .into_iter()
            .map(|q| RawItem {
                source_id: LeadSource::StackOverflow.source_id(q.question_id),
                // titles arrive entity-encoded ("&#39;", "&quot;")
                title: html_escape::decode_html_entities(&q.title).into_owned(),
                content: normalize_text(&q.body),
                url: q.link,
                created_at: DateTime::<Utc>::from_timestamp(q.creation_date, 0)
                    .unwrap_or_else(Utc::now),
            })
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for StackOverflowAdapter {
    fn source(&self) -> LeadSource {
        LeadSource::StackOverflow
    }

    fn targets(&self, settings: &Settings) -> Vec<String> {
        settings.stackoverflow.tags.clone()
    }

    fn keywords(&self, settings: &Settings) -> Vec<String> {
        settings.stackoverflow.keywords.clone()
    }

    async fn fetch(&self, settings: &Settings, target: &str) -> Result<Vec<RawItem>> {
        let cfg = &settings.stackoverflow;
        let t0 = std::time::Instant::now();

        let url = format!("{}/questions", cfg.api_base.trim_end_matches('/'));
        let mut query = vec![
            ("order", "desc".to_string()),
            ("sort", "creation".to_string()),
            ("tagged", target.to_string()),
            ("site", "stackoverflow".to_string()),
            ("filter", "withbody".to_string()),
            ("pagesize", page_size(cfg.page_size).to_string()),
        ];
        if !cfg.key.trim().is_empty() {
            query.push(("key", cfg.key.trim().to_string()));
        }

        let body = fetch_body(self.client.get(url).query(&query), "stackexchange questions").await?;
        let items = Self::parse_questions(&body)?;

        histogram!("scanner_fetch_ms", "source" => "stackoverflow")
            .record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(items)
    }
}

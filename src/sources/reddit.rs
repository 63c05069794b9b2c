use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::{fetch_body, normalize_text, SourceAdapter};
use crate::config::{sources::page_size, Settings};
use crate::lead::{LeadSource, RawItem};

#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(rename = "entry", default)]
    entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    id: String,
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<Link>,
    content: Option<Content>,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Link {
    #[serde(rename = "@href")]
    href: String,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(rename = "$text", default)]
    text: String,
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339)
        .ok()
        .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.unix_timestamp(), 0))
}

/// Subreddit "new" listing read from its public Atom feed.
pub struct RedditAdapter {
    client: reqwest::Client,
}

impl RedditAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn parse_feed(xml: &str) -> Result<Vec<RawItem>> {
        let feed: Feed = from_str(xml).context("parsing reddit atom feed")?;
        let mut out = Vec::with_capacity(feed.entries.len());
        for e in feed.entries {
            let Some(url) = e.links.into_iter().next().map(|l| l.href) else {
                continue;
            };
            let native = e.id.trim().trim_start_matches("t3_").to_string();
            if native.is_empty() {
                continue;
            }
            let created_at = e
                .published
                .as_deref()
                .or(e.updated.as_deref())
                .and_then(parse_rfc3339)
                .unwrap_or_else(Utc::now);
            out.push(RawItem {
                source_id: LeadSource::Reddit.source_id(native),
                title: e.title.unwrap_or_default().trim().to_string(),
                content: e
                    .content
                    .map(|c| normalize_text(&c.text))
                    .unwrap_or_default(),
                url,
                created_at,
            });
        }
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for RedditAdapter {
    fn source(&self) -> LeadSource {
        LeadSource::Reddit
    }

    fn targets(&self, settings: &Settings) -> Vec<String> {
        settings.reddit.subreddits.clone()
    }

    fn keywords(&self, settings: &Settings) -> Vec<String> {
        settings.reddit.keywords.clone()
    }

    async fn fetch(&self, settings: &Settings, target: &str) -> Result<Vec<RawItem>> {
        let cfg = &settings.reddit;
        let t0 = std::time::Instant::now();

        let sub = target.trim().trim_start_matches("r/");
        let url = format!("{}/r/{sub}/new/.rss", cfg.base_url.trim_end_matches('/'));
        let req = self
            .client
            .get(url)
            // reddit throttles generic agents hard
            .header(reqwest::header::USER_AGENT, cfg.user_agent.as_str())
            .query(&[("limit", page_size(cfg.limit).to_string())]);
        let body = fetch_body(req, "reddit feed").await?;
        let items = Self::parse_feed(&body)?;

        histogram!("scanner_fetch_ms", "source" => "reddit").record(t0.elapsed().as_secs_f64() * 1_000.0);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rfc3339_offsets_normalize_to_utc() {
        let dt = parse_rfc3339("2025-09-06T11:00:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-09-06T09:00:00+00:00");
        assert!(parse_rfc3339("yesterday").is_none());
    }

    #[test]
    fn entries_without_link_are_skipped() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>new</title>
  <entry><id>t3_nolink</id><title>x</title></entry>
</feed>"#;
        assert!(RedditAdapter::parse_feed(xml).unwrap().is_empty());
    }
}

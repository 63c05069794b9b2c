// src/lead.rs
//! Lead data model shared by adapters, the store and the control API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Max characters kept from an item's body.
pub const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadSource {
    Discord,
    GitHub,
    HackerNews,
    StackOverflow,
    Reddit,
}

impl LeadSource {
    pub const ALL: [LeadSource; 5] = [
        LeadSource::Discord,
        LeadSource::GitHub,
        LeadSource::HackerNews,
        LeadSource::StackOverflow,
        LeadSource::Reddit,
    ];

    /// Namespace prefix of every `source_id` produced by this source.
    pub fn id_prefix(self) -> &'static str {
        match self {
            LeadSource::Discord => "dc",
            LeadSource::GitHub => "gh",
            LeadSource::HackerNews => "hn",
            LeadSource::StackOverflow => "so",
            LeadSource::Reddit => "rd",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LeadSource::Discord => "discord",
            LeadSource::GitHub => "github",
            LeadSource::HackerNews => "hackernews",
            LeadSource::StackOverflow => "stackoverflow",
            LeadSource::Reddit => "reddit",
        }
    }

    /// Builds a namespaced id, e.g. `gh_12345`.
    pub fn source_id(self, native_id: impl fmt::Display) -> String {
        format!("{}_{}", self.id_prefix(), native_id)
    }
}

impl fmt::Display for LeadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discord" => Ok(LeadSource::Discord),
            "github" | "gh" => Ok(LeadSource::GitHub),
            "hackernews" | "hn" => Ok(LeadSource::HackerNews),
            "stackoverflow" | "so" => Ok(LeadSource::StackOverflow),
            "reddit" => Ok(LeadSource::Reddit),
            other => anyhow::bail!("unknown lead source: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Pitched,
    Fixed,
}

impl FromStr for LeadStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "pitched" => Ok(LeadStatus::Pitched),
            "fixed" => Ok(LeadStatus::Fixed),
            other => anyhow::bail!("unknown lead status: {other}"),
        }
    }
}

/// Adapter output, already mapped to the lead shape but not yet matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub source_id: String,
    pub title: String,
    pub content: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl RawItem {
    /// Text the matcher runs against.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.content)
    }
}

/// A matched item. Only `status` and `generated_pitch` change after creation;
/// fields are private so callers cannot rewrite the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    source_id: String,
    title: String,
    content: String,
    url: String,
    source: LeadSource,
    tag: String,
    status: LeadStatus,
    created_at: DateTime<Utc>,
    generated_pitch: Option<String>,
}

impl Lead {
    /// Builds a `New` lead from a matched item; content is capped at [`MAX_CONTENT_CHARS`].
    pub fn from_match(source: LeadSource, item: RawItem, tag: &str) -> Self {
        Self {
            source_id: item.source_id,
            title: item.title,
            content: truncate_chars(item.content, MAX_CONTENT_CHARS),
            url: item.url,
            source,
            tag: tag.to_string(),
            status: LeadStatus::New,
            created_at: item.created_at,
            generated_pitch: None,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn content(&self) -> &str {
        &self.content
    }
    pub fn url(&self) -> &str {
        &self.url
    }
    pub fn source(&self) -> LeadSource {
        self.source
    }
    pub fn tag(&self) -> &str {
        &self.tag
    }
    pub fn status(&self) -> LeadStatus {
        self.status
    }
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    pub fn generated_pitch(&self) -> Option<&str> {
        self.generated_pitch.as_deref()
    }

    pub(crate) fn set_status(&mut self, status: LeadStatus) {
        self.status = status;
    }

    /// Returns false when a pitch is already attached.
    pub(crate) fn attach_pitch(&mut self, pitch: String) -> bool {
        if self.generated_pitch.is_some() {
            return false;
        }
        self.generated_pitch = Some(pitch);
        true
    }
}

/// Keeps at most `max` chars (not bytes).
pub fn truncate_chars(s: String, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((byte_idx, _)) => s[..byte_idx].to_string(),
        None => s,
    }
}

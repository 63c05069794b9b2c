// src/config/sources.rs
//! Per-source sections: what to poll and which keywords count as a lead.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// "ENV" means: read from GITHUB_TOKEN. Empty means anonymous (lower rate limit).
    pub token: String,
    pub api_base: String,
    /// Issue search queries, e.g. `label:"help wanted" react-native`.
    pub queries: Vec<String>,
    pub keywords: Vec<String>,
    pub per_page: u32,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_base: "https://api.github.com".to_string(),
            queries: Vec::new(),
            keywords: Vec::new(),
            per_page: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackOverflowSettings {
    /// Optional app key ("ENV" means: read from STACKEXCHANGE_KEY).
    pub key: String,
    pub api_base: String,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub page_size: u32,
}

impl Default for StackOverflowSettings {
    fn default() -> Self {
        Self {
            key: String::new(),
            api_base: "https://api.stackexchange.com/2.3".to_string(),
            tags: Vec::new(),
            keywords: Vec::new(),
            page_size: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HackerNewsSettings {
    pub api_base: String,
    pub queries: Vec<String>,
    pub keywords: Vec<String>,
    pub hits_per_page: u32,
}

impl Default for HackerNewsSettings {
    fn default() -> Self {
        Self {
            api_base: "https://hn.algolia.com/api/v1".to_string(),
            queries: Vec::new(),
            keywords: Vec::new(),
            hits_per_page: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditSettings {
    pub base_url: String,
    /// Subreddit names; `a+b+c` combines several into one feed.
    pub subreddits: Vec<String>,
    pub keywords: Vec<String>,
    pub limit: u32,
    pub user_agent: String,
}

impl Default for RedditSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com".to_string(),
            subreddits: Vec::new(),
            keywords: Vec::new(),
            limit: 25,
            user_agent: "lead-scanner/0.1".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordSettings {
    /// "ENV" means: read from DISCORD_BOT_TOKEN.
    pub bot_token: String,
    pub gateway_url: String,
    /// Only messages from these channels are considered; empty means all.
    pub channel_ids: Vec<String>,
    pub keywords: Vec<String>,
}

impl Default for DiscordSettings {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            gateway_url: "wss://gateway.discord.gg/?v=10&encoding=json".to_string(),
            channel_ids: Vec::new(),
            keywords: Vec::new(),
        }
    }
}

/// Clamp a configured page size to `1..=50`.
pub fn page_size(configured: u32) -> u32 {
    configured.clamp(1, 50)
}

// src/config/ai.rs
use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_price() -> String {
    "$100".to_string()
}

/// Chat-completion endpoint used to draft outreach pitches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSettings {
    /// OpenAI-compatible base, e.g. `https://host/v1` (no trailing `/chat/completions`).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from AI_API_KEY. Empty means no auth header.
    #[serde(default)]
    pub api_key: String,
    /// Pre-recorded fix video linked in every pitch.
    #[serde(default)]
    pub loom_link: String,
    #[serde(default = "default_price")]
    pub price: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: String::new(),
            loom_link: String::new(),
            price: default_price(),
        }
    }
}

impl AiSettings {
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn bearer(&self) -> Option<&str> {
        let key = self.api_key.trim();
        (!key.is_empty()).then_some(key)
    }
}

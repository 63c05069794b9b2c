//! Outreach pitch drafting through an OpenAI-compatible chat-completion endpoint.
//!
//! Errors are plain text the dashboard shows as-is. A reply that arrives with
//! an unexpected shape still counts as a draft.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AiSettings;
use crate::lead::LeadSource;

const PROMPT_CONTENT_CHARS: usize = 1500;

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

#[derive(Clone)]
pub struct PitchGenerator {
    http: reqwest::Client,
    timeout: Duration,
}

impl PitchGenerator {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            timeout: Duration::from_secs(60),
        }
    }

    /// Draft a pitch for one lead. `Ok` holds the model text, or the raw body
    /// when the response has another shape. `Err` means no reply was received.
    pub async fn generate(
        &self,
        ai: &AiSettings,
        title: &str,
        content: &str,
        source: LeadSource,
    ) -> Result<String, String> {
        let prompt = build_prompt(ai, title, content, source);
        let req = Req {
            model: &ai.model,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
        };

        let mut call = self
            .http
            .post(ai.endpoint("chat/completions"))
            .timeout(self.timeout)
            .json(&req);
        if let Some(key) = ai.bearer() {
            call = call.bearer_auth(key);
        }

        let body = call
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(target: "outreach", error = %e, "pitch request failed");
                format!("Error generating pitch: {e}")
            })?
            .text()
            .await
            .map_err(|e| format!("Error generating pitch: {e}"))?;
        Ok(extract_content(&body))
    }

    /// True when `GET {base_url}/models` answers 200 within 3s.
    pub async fn probe(&self, ai: &AiSettings) -> bool {
        let mut call = self
            .http
            .get(ai.endpoint("models"))
            .timeout(Duration::from_secs(3));
        if let Some(key) = ai.bearer() {
            call = call.bearer_auth(key);
        }
        matches!(call.send().await, Ok(r) if r.status() == reqwest::StatusCode::OK)
    }
}

/// `choices[0].message.content`, or the body verbatim for any other shape.
pub fn extract_content(body: &str) -> String {
    match serde_json::from_str::<Resp>(body) {
        Ok(resp) => match resp.choices.into_iter().next() {
            Some(c) => c.message.content.trim().to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}

pub fn build_prompt(ai: &AiSettings, title: &str, content: &str, source: LeadSource) -> String {
    let excerpt: String = content.chars().take(PROMPT_CONTENT_CHARS).collect();
    let loom = if ai.loom_link.trim().is_empty() {
        String::new()
    } else {
        format!(
            "\nEnd with: \"Watch how I fixed this exact issue here: {}\"",
            ai.loom_link.trim()
        )
    };
    format!(
        "You write short direct messages offering paid help to developers stuck on native \
         build and runtime errors.\n\
         Post source: {source}\n\
         Title: {title}\n\
         Post: {excerpt}\n\n\
         Write a DM of at most 4 sentences: name the likely root cause in one phrase, \
         offer to fix it in 30 minutes over a call for a {price} bounty, and mention that you \
         handle the Java/Kotlin/Swift/C++ native layers.{loom}\nOutput only the message.",
        price = ai.price.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_is_taken_from_first_choice() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":" Hi there \n"}}]}"#;
        assert_eq!(extract_content(body), "Hi there");
    }

    #[test]
    fn odd_shapes_come_back_verbatim() {
        let err = r#"{"error":{"message":"model not found"}}"#;
        assert_eq!(extract_content(err), err);
        assert_eq!(extract_content(r#"{"choices":[]}"#), r#"{"choices":[]}"#);
        assert_eq!(extract_content("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn prompt_mentions_price_and_link() {
        let ai = AiSettings {
            loom_link: "https://www.loom.com/share/abc".into(),
            price: "$150".into(),
            ..AiSettings::default()
        };
        let p = build_prompt(&ai, "Build fails", "x".repeat(5000).as_str(), LeadSource::Reddit);
        assert!(p.contains("$150"));
        assert!(p.contains("https://www.loom.com/share/abc"));
        assert!(p.contains("Post source: reddit"));
        assert!(p.len() < 5000);
    }
}

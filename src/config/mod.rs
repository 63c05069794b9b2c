// src/config/mod.rs
//! Settings document and the providers that load it.
//!
//! Every scan-loop iteration calls [`SettingsProvider::load`] again, so edits to
//! the file are picked up without restarting a scanner.

pub mod ai;
pub mod sources;

use anyhow::{anyhow, Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::lead::LeadSource;

pub use ai::AiSettings;
pub use sources::{
    DiscordSettings, GitHubSettings, HackerNewsSettings, RedditSettings, StackOverflowSettings,
};

pub const ENV_SETTINGS_PATH: &str = "SCANNER_SETTINGS_PATH";
pub const DEFAULT_SETTINGS_PATH: &str = "config/scanner.toml";

/// Full settings document. Every section falls back to defaults when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub ai: AiSettings,
    pub smtp: SmtpSettings,
    pub github: GitHubSettings,
    pub stackoverflow: StackOverflowSettings,
    pub hackernews: HackerNewsSettings,
    pub reddit: RedditSettings,
    pub discord: DiscordSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Pause between two full scans of one source.
    pub poll_interval_secs: u64,
    /// Pause between two targets of the same source.
    pub throttle_secs: u64,
    /// Wait between store availability checks while degraded.
    pub store_retry_secs: u64,
    pub webhook_url: Option<String>,
    pub store_path: PathBuf,
    pub bind: String,
    pub autostart: Vec<LeadSource>,
    pub log_capacity: usize,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            throttle_secs: 2,
            store_retry_secs: 60,
            webhook_url: None,
            store_path: PathBuf::from("data/leads.json"),
            bind: "127.0.0.1:8080".to_string(),
            autostart: Vec::new(),
            log_capacity: 500,
        }
    }
}

impl GeneralSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn throttle(&self) -> Duration {
        Duration::from_secs(self.throttle_secs)
    }

    pub fn store_retry(&self) -> Duration {
        Duration::from_secs(self.store_retry_secs.max(1))
    }

    /// Configured webhook, `None` when blank.
    pub fn webhook(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub username: String,
    /// "ENV" means: read from SMTP_PASSWORD
    pub password: String,
    pub from: String,
}

impl SmtpSettings {
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty() && !self.from.trim().is_empty()
    }
}

impl Settings {
    /// Parse a settings document. Supports TOML, or JSON when hinted by extension.
    pub fn parse(content: &str, hint_ext: &str) -> Result<Self> {
        let mut settings: Settings = if hint_ext.eq_ignore_ascii_case("json") {
            serde_json::from_str(content).context("parsing settings json")?
        } else {
            toml::from_str(content).context("parsing settings toml")?
        };
        settings.resolve_env();
        Ok(settings)
    }

    /// Replace "ENV" sentinels with environment values; missing vars resolve to "".
    fn resolve_env(&mut self) {
        resolve_secret(&mut self.ai.api_key, "AI_API_KEY");
        resolve_secret(&mut self.smtp.password, "SMTP_PASSWORD");
        resolve_secret(&mut self.discord.bot_token, "DISCORD_BOT_TOKEN");
        resolve_secret(&mut self.github.token, "GITHUB_TOKEN");
        resolve_secret(&mut self.stackoverflow.key, "STACKEXCHANGE_KEY");
    }
}

fn resolve_secret(value: &mut String, env_var: &str) {
    if value.trim().eq_ignore_ascii_case("env") {
        *value = std::env::var(env_var).unwrap_or_default();
    }
}

/// Source of fresh settings for each loop iteration.
pub trait SettingsProvider: Send + Sync {
    fn load(&self) -> Result<Settings>;
}

/// Reads the settings document from disk on every `load`.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// $SCANNER_SETTINGS_PATH, falling back to `config/scanner.toml`.
    pub fn from_env() -> Self {
        let path = std::env::var(ENV_SETTINGS_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SETTINGS_PATH));
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsProvider for FileSettings {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            return Err(anyhow!(
                "settings file {} does not exist",
                self.path.display()
            ));
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("reading settings from {}", self.path.display()))?;
        let ext = self
            .path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        Settings::parse(&content, &ext)
    }
}

/// In-memory settings, swappable at runtime. Used when embedding the engine.
#[derive(Debug, Default)]
pub struct StaticSettings {
    inner: RwLock<Settings>,
    loads: AtomicUsize,
}

impl StaticSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: RwLock::new(settings),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn replace(&self, settings: Settings) {
        *self.inner.write() = settings;
    }

    /// How many times `load` has been called.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl SettingsProvider for StaticSettings {
    fn load(&self) -> Result<Settings> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.inner.read().clone())
    }
}

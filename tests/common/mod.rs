// tests/common/mod.rs
// Shared fakes for the integration tests: scripted adapter, recording notifier,
// a store that can be switched off, and a channel-driven chat stream.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use lead_scanner::config::{Settings, StaticSettings};
use lead_scanner::error::{ControlError, StoreError};
use lead_scanner::lead::{Lead, LeadSource, LeadStatus, RawItem};
use lead_scanner::log_sink::LogSink;
use lead_scanner::notify::Notifier;
use lead_scanner::scanner::ScanContext;
use lead_scanner::sources::discord::{ChatConnection, ChatStream};
use lead_scanner::sources::SourceAdapter;
use lead_scanner::store::{LeadFilter, LeadStore, MemoryStore};

pub const WEBHOOK: &str = "https://hooks.example.test/lead";

pub fn item(id: &str, title: &str) -> RawItem {
    RawItem {
        source_id: id.to_string(),
        title: title.to_string(),
        content: String::new(),
        url: format!("https://example.test/{id}"),
        created_at: Utc::now(),
    }
}

/// GitHub-shaped settings with one query per entry of `queries`.
pub fn github_settings(keywords: &[&str], queries: &[&str]) -> Settings {
    let mut s = Settings::default();
    s.general.webhook_url = Some(WEBHOOK.to_string());
    s.github.keywords = keywords.iter().map(|k| k.to_string()).collect();
    s.github.queries = queries.iter().map(|q| q.to_string()).collect();
    s
}

pub fn context(
    store: Arc<dyn LeadStore>,
    notifier: Arc<dyn Notifier>,
    settings: Settings,
) -> (Arc<ScanContext>, Arc<StaticSettings>) {
    let provider = Arc::new(StaticSettings::new(settings));
    let ctx = Arc::new(ScanContext {
        store,
        notifier,
        settings: provider.clone(),
        logs: Arc::new(LogSink::with_capacity(200)),
    });
    (ctx, provider)
}

/// Polls `cond` on short paused-clock sleeps; false if it never held.
pub async fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

// ---- adapter ----

/// Returns the same page for every target; targets listed in `failing` error out.
#[derive(Default)]
pub struct FakeAdapter {
    pub page: Mutex<Vec<RawItem>>,
    pub failing: Mutex<Vec<String>>,
    pub fetches: AtomicUsize,
    pub seen_targets: Mutex<Vec<String>>,
}

impl FakeAdapter {
    pub fn with_page(items: Vec<RawItem>) -> Arc<Self> {
        Arc::new(Self {
            page: Mutex::new(items),
            ..Self::default()
        })
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for FakeAdapter {
    fn source(&self) -> LeadSource {
        LeadSource::GitHub
    }

    fn targets(&self, settings: &Settings) -> Vec<String> {
        settings.github.queries.clone()
    }

    fn keywords(&self, settings: &Settings) -> Vec<String> {
        settings.github.keywords.clone()
    }

    async fn fetch(&self, _settings: &Settings, target: &str) -> Result<Vec<RawItem>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.seen_targets.lock().push(target.to_string());
        if self.failing.lock().iter().any(|t| t == target) {
            return Err(anyhow!("HTTP 502 from fake for {target}"));
        }
        Ok(self.page.lock().clone())
    }
}

// ---- notifier ----

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Arc<Self> {
        let n = Self::default();
        n.fail.store(true, Ordering::SeqCst);
        Arc::new(n)
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, webhook_url: &str, lead: &Lead) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("webhook returned 500"));
        }
        self.sent
            .lock()
            .push((webhook_url.to_string(), lead_scanner::notify::lead_message(lead)));
        Ok(())
    }
}

// ---- store ----

/// Memory store with an availability switch. While down every call fails with
/// `Unavailable`.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub down: AtomicBool,
    pub pings: AtomicUsize,
    pub inserts: AtomicUsize,
}

impl FlakyStore {
    pub fn down() -> Arc<Self> {
        let s = Self::default();
        s.down.store(true, Ordering::SeqCst);
        Arc::new(s)
    }

    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn ping_count(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("disk detached".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl LeadStore for FlakyStore {
    async fn exists(&self, source_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.exists(source_id).await
    }

    async fn insert(&self, lead: Lead) -> Result<(), StoreError> {
        self.check()?;
        self.inner.insert(lead).await?;
        self.inserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, source_id: &str) -> Result<Option<Lead>, StoreError> {
        self.check()?;
        self.inner.get(source_id).await
    }

    async fn update_status(&self, source_id: &str, status: LeadStatus) -> Result<Lead, StoreError> {
        self.check()?;
        self.inner.update_status(source_id, status).await
    }

    async fn set_pitch(&self, source_id: &str, pitch: String) -> Result<Lead, StoreError> {
        self.check()?;
        self.inner.set_pitch(source_id, pitch).await
    }

    async fn recent(
        &self,
        status: Option<LeadStatus>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Lead>, StoreError> {
        self.check()?;
        self.inner.recent(status, since).await
    }

    async fn archive(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        self.check()?;
        self.inner.archive(filter).await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        self.check()
    }
}

// ---- chat stream ----

pub enum ChatEvent {
    Message(RawItem),
    /// Server-side close; the connection yields `None`.
    Drop,
}

/// Chat stream fed from an unbounded channel shared by every connection.
pub struct FakeChat {
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<ChatEvent>>>,
    pub connects: AtomicUsize,
    pub closes: Arc<AtomicUsize>,
    pub failing_connects: AtomicUsize,
}

impl FakeChat {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let chat = Arc::new(Self {
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            connects: AtomicUsize::new(0),
            closes: Arc::new(AtomicUsize::new(0)),
            failing_connects: AtomicUsize::new(0),
        });
        (chat, tx)
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatStream for FakeChat {
    fn keywords(&self, settings: &Settings) -> Vec<String> {
        settings.discord.keywords.clone()
    }

    fn validate(&self, settings: &Settings) -> Result<(), ControlError> {
        if settings.discord.bot_token.is_empty() {
            return Err(ControlError::missing(LeadSource::Discord, "no bot token configured"));
        }
        Ok(())
    }

    async fn connect(&self, _settings: &Settings) -> Result<Box<dyn ChatConnection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let pending = self.failing_connects.load(Ordering::SeqCst);
        if pending > 0 {
            self.failing_connects.store(pending - 1, Ordering::SeqCst);
            return Err(anyhow!("gateway refused connection"));
        }
        Ok(Box::new(FakeConnection {
            rx: self.rx.clone(),
            closes: self.closes.clone(),
        }))
    }
}

struct FakeConnection {
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<ChatEvent>>>,
    closes: Arc<AtomicUsize>,
}

#[async_trait]
impl ChatConnection for FakeConnection {
    async fn next_item(&mut self) -> Option<Result<RawItem>> {
        match self.rx.lock().await.recv().await? {
            ChatEvent::Message(item) => Some(Ok(item)),
            ChatEvent::Drop => None,
        }
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn discord_settings(keywords: &[&str]) -> Settings {
    let mut s = Settings::default();
    s.general.webhook_url = Some(WEBHOOK.to_string());
    s.general.poll_interval_secs = 30;
    s.discord.bot_token = "test-token".into();
    s.discord.keywords = keywords.iter().map(|k| k.to_string()).collect();
    s
}

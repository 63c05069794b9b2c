// src/scanner/mod.rs
//! Scan engine: per-source background loops and the controller that owns them.
//!
//! Each running source has exactly one detached tokio task. The controller is
//! the only state shared with callers; loops communicate back solely through
//! their [`StateCell`], the store and the log sink.

pub mod controller;
pub mod pipeline;
pub mod poll_loop;
pub mod stream_loop;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::{Settings, SettingsProvider};
use crate::lead::LeadSource;
use crate::log_sink::LogSink;
use crate::notify::Notifier;
use crate::store::LeadStore;

pub use controller::ScannerController;
pub use pipeline::{process_item, Outcome};
pub use poll_loop::{scan_once, CycleStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScannerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl ScannerState {
    pub fn is_active(self) -> bool {
        matches!(self, ScannerState::Starting | ScannerState::Running)
    }
}

/// Collaborators shared by every scan loop.
pub struct ScanContext {
    pub store: Arc<dyn LeadStore>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: Arc<dyn SettingsProvider>,
    pub logs: Arc<LogSink>,
}

impl ScanContext {
    /// Fresh settings, or `last` when the document cannot be read right now.
    pub(crate) fn reload(&self, source: LeadSource, last: Settings) -> Settings {
        match self.settings.load() {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(target: "scanner", %source, error = %format!("{e:#}"), "settings reload failed; keeping last good settings");
                self.logs
                    .warn(source, format!("settings reload failed: {e:#}"));
                last
            }
        }
    }
}

/// Per-source state shared between the controller and one worker.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<Mutex<ScannerState>>);

impl StateCell {
    pub(crate) fn new(state: ScannerState) -> Self {
        Self(Arc::new(Mutex::new(state)))
    }

    pub(crate) fn get(&self) -> ScannerState {
        *self.0.lock()
    }

    /// Worker-side transition; a pending stop always wins.
    pub(crate) fn advance(&self, next: ScannerState) {
        let mut s = self.0.lock();
        if s.is_active() {
            *s = next;
        }
    }

    /// Caller-side stop: active → Stopping. Returns the resulting state.
    pub(crate) fn request_stop(&self) -> ScannerState {
        let mut s = self.0.lock();
        if s.is_active() {
            *s = ScannerState::Stopping;
        }
        *s
    }

    pub(crate) fn mark_stopped(&self) {
        *self.0.lock() = ScannerState::Stopped;
    }
}

/// Sleeps for `dur`; returns false as soon as `token` is cancelled.
pub(crate) async fn sleep_or_cancel(token: &CancellationToken, dur: Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(dur) => true,
    }
}

/// Degraded mode after a store failure: wait `retry`, probe, repeat until the
/// store answers. Returns false if cancelled while waiting.
pub(crate) async fn wait_for_store(
    ctx: &ScanContext,
    source: LeadSource,
    token: &CancellationToken,
    retry: Duration,
) -> bool {
    loop {
        if !sleep_or_cancel(token, retry).await {
            return false;
        }
        match ctx.store.ping().await {
            Ok(()) => {
                tracing::info!(target: "scanner", %source, "store available again");
                ctx.logs.info(source, "store available again; resuming");
                return true;
            }
            Err(e) => {
                tracing::warn!(target: "scanner", %source, error = %e, retry_secs = retry.as_secs(), "store still unavailable");
            }
        }
    }
}

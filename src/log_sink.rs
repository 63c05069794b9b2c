//! Bounded in-memory ring of recent scanner events for the dashboard.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::lead::LeadSource;

const MAX_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub ts: DateTime<Utc>,
    pub level: LogLevel,
    pub source: Option<LeadSource>,
    pub message: String,
}

#[derive(Debug)]
pub struct LogSink {
    inner: Mutex<VecDeque<LogEntry>>,
    cap: usize,
}

impl LogSink {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, MAX_CAPACITY);
        Self {
            inner: Mutex::new(VecDeque::with_capacity(cap)),
            cap,
        }
    }

    pub fn append(&self, level: LogLevel, source: Option<LeadSource>, message: impl Into<String>) {
        let entry = LogEntry {
            ts: Utc::now(),
            level,
            source,
            message: message.into(),
        };
        let mut q = self.inner.lock();
        if q.len() == self.cap {
            q.pop_front();
        }
        q.push_back(entry);
    }

    pub fn info(&self, source: LeadSource, message: impl Into<String>) {
        self.append(LogLevel::Info, Some(source), message);
    }

    pub fn warn(&self, source: LeadSource, message: impl Into<String>) {
        self.append(LogLevel::Warn, Some(source), message);
    }

    pub fn error(&self, source: LeadSource, message: impl Into<String>) {
        self.append(LogLevel::Error, Some(source), message);
    }

    /// Last `n` entries, oldest first.
    pub fn snapshot_last_n(&self, n: usize) -> Vec<LogEntry> {
        let q = self.inner.lock();
        let start = q.len().saturating_sub(n);
        q.iter().skip(start).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::with_capacity(500)
    }
}

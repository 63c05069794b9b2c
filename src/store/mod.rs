// src/store/mod.rs
//! Dedup store: every lead ever matched, keyed by its namespaced `source_id`.
//!
//! Once `insert` returns `Ok` for an id, every later `exists` for that id
//! returns true, whichever task asks. Both backends serialize mutations
//! behind one lock, so `insert` itself also refuses duplicates.

pub mod json_file;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::lead::{Lead, LeadSource, LeadStatus};

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Archive query. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    pub status: Option<LeadStatus>,
    pub source: Option<LeadSource>,
    pub tag: Option<String>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        self.status.map_or(true, |s| lead.status() == s)
            && self.source.map_or(true, |s| lead.source() == s)
            && self
                .tag
                .as_deref()
                .map_or(true, |t| lead.tag().eq_ignore_ascii_case(t))
    }
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn exists(&self, source_id: &str) -> Result<bool, StoreError>;

    /// Fails with [`StoreError::Duplicate`] if the id is already stored.
    async fn insert(&self, lead: Lead) -> Result<(), StoreError>;

    async fn get(&self, source_id: &str) -> Result<Option<Lead>, StoreError>;

    async fn update_status(&self, source_id: &str, status: LeadStatus) -> Result<Lead, StoreError>;

    /// Attaches a pitch; fails with [`StoreError::PitchAlreadySet`] the second time.
    async fn set_pitch(&self, source_id: &str, pitch: String) -> Result<Lead, StoreError>;

    /// Leads created at or after `since`, newest first.
    async fn recent(
        &self,
        status: Option<LeadStatus>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Lead>, StoreError>;

    /// All leads matching `filter`, newest first.
    async fn archive(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError>;

    /// Cheap availability probe used while a scan loop is degraded.
    async fn ping(&self) -> Result<(), StoreError>;
}

pub(crate) fn newest_first(mut leads: Vec<Lead>) -> Vec<Lead> {
    leads.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| a.source_id().cmp(b.source_id()))
    });
    leads
}

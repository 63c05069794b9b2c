// src/store/memory.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use super::{newest_first, LeadFilter, LeadStore};
use crate::error::StoreError;
use crate::lead::{Lead, LeadStatus};

/// Map of leads by id plus the mutation rules shared by both backends.
#[derive(Debug, Default, Clone)]
pub(crate) struct LeadMap {
    leads: HashMap<String, Lead>,
}

impl LeadMap {
    pub(crate) fn from_leads(leads: Vec<Lead>) -> Self {
        let leads = leads
            .into_iter()
            .map(|l| (l.source_id().to_string(), l))
            .collect();
        Self { leads }
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.leads.contains_key(id)
    }

    pub(crate) fn get(&self, id: &str) -> Option<Lead> {
        self.leads.get(id).cloned()
    }

    pub(crate) fn insert(&mut self, lead: Lead) -> Result<(), StoreError> {
        if self.leads.contains_key(lead.source_id()) {
            return Err(StoreError::Duplicate(lead.source_id().to_string()));
        }
        self.leads.insert(lead.source_id().to_string(), lead);
        Ok(())
    }

    pub(crate) fn update_status(&mut self, id: &str, status: LeadStatus) -> Result<Lead, StoreError> {
        let lead = self
            .leads
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        lead.set_status(status);
        Ok(lead.clone())
    }

    pub(crate) fn set_pitch(&mut self, id: &str, pitch: String) -> Result<Lead, StoreError> {
        let lead = self
            .leads
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if !lead.attach_pitch(pitch) {
            return Err(StoreError::PitchAlreadySet(id.to_string()));
        }
        Ok(lead.clone())
    }

    pub(crate) fn recent(&self, status: Option<LeadStatus>, since: DateTime<Utc>) -> Vec<Lead> {
        newest_first(
            self.leads
                .values()
                .filter(|l| l.created_at() >= since)
                .filter(|l| status.map_or(true, |s| l.status() == s))
                .cloned()
                .collect(),
        )
    }

    pub(crate) fn archive(&self, filter: &LeadFilter) -> Vec<Lead> {
        newest_first(
            self.leads
                .values()
                .filter(|l| filter.matches(l))
                .cloned()
                .collect(),
        )
    }

    pub(crate) fn all(&self) -> Vec<Lead> {
        newest_first(self.leads.values().cloned().collect())
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<LeadMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl LeadStore for MemoryStore {
    async fn exists(&self, source_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.read().contains(source_id))
    }

    async fn insert(&self, lead: Lead) -> Result<(), StoreError> {
        self.inner.write().insert(lead)
    }

    async fn get(&self, source_id: &str) -> Result<Option<Lead>, StoreError> {
        Ok(self.inner.read().get(source_id))
    }

    async fn update_status(&self, source_id: &str, status: LeadStatus) -> Result<Lead, StoreError> {
        self.inner.write().update_status(source_id, status)
    }

    async fn set_pitch(&self, source_id: &str, pitch: String) -> Result<Lead, StoreError> {
        self.inner.write().set_pitch(source_id, pitch)
    }

    async fn recent(
        &self,
        status: Option<LeadStatus>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Lead>, StoreError> {
        Ok(self.inner.read().recent(status, since))
    }

    async fn archive(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        Ok(self.inner.read().archive(filter))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// src/store/json_file.rs
//! Lead store persisted as one JSON document.
//!
//! The whole collection lives in memory; each mutation writes a new document
//! to `<path>.tmp` and renames it over `<path>`. A mutation is applied in
//! memory only after the write succeeded.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::{fs, sync::Mutex};

use super::memory::LeadMap;
use super::{LeadFilter, LeadStore};
use crate::error::StoreError;
use crate::lead::{Lead, LeadStatus};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: Mutex<LeadMap>,
}

impl JsonFileStore {
    /// Opens (or creates on first write) the document at `path`.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(dir) = parent_dir(&path) {
            fs::create_dir_all(dir).await?;
        }
        let map = match fs::read_to_string(&path).await {
            Ok(s) if s.trim().is_empty() => LeadMap::default(),
            Ok(s) => {
                let leads: Vec<Lead> = serde_json::from_str(&s).map_err(|e| {
                    StoreError::Unavailable(format!("corrupt lead file {}: {e}", path.display()))
                })?;
                LeadMap::from_leads(leads)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LeadMap::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!(target: "store", path = %path.display(), "lead store opened");
        Ok(Self {
            path,
            inner: Mutex::new(map),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, map: &LeadMap) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(&map.all())
            .map_err(|e| StoreError::Unavailable(format!("serialize leads: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Apply `f` to a copy, persist it, then swap it in.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut LeadMap) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self.inner.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.persist(&next).await?;
        *guard = next;
        Ok(out)
    }
}

fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

#[async_trait]
impl LeadStore for JsonFileStore {
    async fn exists(&self, source_id: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().await.contains(source_id))
    }

    async fn insert(&self, lead: Lead) -> Result<(), StoreError> {
        self.mutate(|m| m.insert(lead)).await
    }

    async fn get(&self, source_id: &str) -> Result<Option<Lead>, StoreError> {
        Ok(self.inner.lock().await.get(source_id))
    }

    async fn update_status(&self, source_id: &str, status: LeadStatus) -> Result<Lead, StoreError> {
        self.mutate(|m| m.update_status(source_id, status)).await
    }

    async fn set_pitch(&self, source_id: &str, pitch: String) -> Result<Lead, StoreError> {
        self.mutate(|m| m.set_pitch(source_id, pitch)).await
    }

    async fn recent(
        &self,
        status: Option<LeadStatus>,
        since: DateTime<Utc>,
    ) -> Result<Vec<Lead>, StoreError> {
        Ok(self.inner.lock().await.recent(status, since))
    }

    async fn archive(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        Ok(self.inner.lock().await.archive(filter))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let dir = parent_dir(&self.path).unwrap_or_else(|| Path::new("."));
        let meta = fs::metadata(dir).await?;
        if !meta.is_dir() || meta.permissions().readonly() {
            return Err(StoreError::Unavailable(format!(
                "{} is not a writable directory",
                dir.display()
            )));
        }
        Ok(())
    }
}

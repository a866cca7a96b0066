use crate::error::StoreError;
use crate::traits::WatchRecordStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use watchlog_models::WatchRecord;

/// Watch records kept as a JSON array on disk
///
/// Listing returns records newest first, see [`sort_newest_first`].
pub struct JsonRecordStore {
    path: PathBuf,
}

impl JsonRecordStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<Vec<WatchRecord>, StoreError> {
        if !tokio::fs::try_exists(&self.path).await? {
            debug!("Record store {:?} does not exist yet", self.path);
            return Ok(Vec::new());
        }
        let content = tokio::fs::read_to_string(&self.path).await?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_all(&self, records: &[WatchRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(records)?;
        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, json).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    /// Add records whose id is not stored yet. Returns how many were new.
    pub async fn insert_missing(&self, records: &[WatchRecord]) -> Result<usize, StoreError> {
        let mut existing = self.read_all().await?;
        let mut known: HashSet<String> = existing.iter().map(|r| r.id.clone()).collect();

        let before = existing.len();
        for record in records {
            if known.insert(record.id.clone()) {
                existing.push(record.clone());
            }
        }
        let added = existing.len() - before;

        if added > 0 {
            self.write_all(&existing).await?;
        }
        info!("Record store: {} new of {} offered records", added, records.len());
        Ok(added)
    }
}

/// Newest first by effective date, the order the grouper reports as latest
///
/// Records without any date count as written today. Same-day records are
/// ordered by creation time, newest first, uncreated ones last.
pub fn sort_newest_first(records: &mut [WatchRecord], now: DateTime<Utc>) {
    records.sort_by(|a, b| {
        a.cmp_newest_first(b, now).then_with(|| match (&a.created_at, &b.created_at) {
            (Some(a), Some(b)) => b.cmp(a),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
    });
}

#[async_trait]
impl WatchRecordStore for JsonRecordStore {
    async fn list(&self) -> Result<Vec<WatchRecord>, StoreError> {
        let mut records = self.read_all().await?;
        sort_newest_first(&mut records, Utc::now());
        debug!("Record store: listed {} records", records.len());
        Ok(records)
    }
}

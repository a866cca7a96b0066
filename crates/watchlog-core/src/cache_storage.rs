use anyhow::{anyhow, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};
use watchlog_models::{ExternalId, MetadataEntry};

/// Persistence behind the metadata cache
///
/// `put_many` is atomic per call: either every entry of the call lands or none does.
pub trait MetadataStore: Send + Sync {
    fn load_all(&self) -> Result<HashMap<ExternalId, MetadataEntry>>;

    fn get(&self, id: ExternalId) -> Result<Option<MetadataEntry>> {
        Ok(self.load_all()?.remove(&id))
    }

    fn put_many(&self, entries: &HashMap<ExternalId, MetadataEntry>) -> Result<()>;
}

/// Metadata cache persisted as a single JSON document, optionally gzip compressed
///
/// Every write rewrites the whole document, so entries decoded from a legacy
/// shape are stored back in the tagged shape on the first write.
pub struct FileMetadataStore {
    cache_path: PathBuf,
    use_compression: bool,
    write_lock: Mutex<()>,
}

impl FileMetadataStore {
    pub fn new(cache_path: PathBuf, use_compression: bool) -> Self {
        Self {
            cache_path,
            use_compression,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.cache_path
    }

    /// Get cache file size
    pub fn size(&self) -> Result<u64> {
        if self.cache_path.exists() {
            Ok(std::fs::metadata(&self.cache_path)?.len())
        } else {
            Ok(0)
        }
    }

    fn read_entries(&self) -> Result<HashMap<ExternalId, MetadataEntry>> {
        if !self.cache_path.exists() {
            debug!("Metadata cache file does not exist, starting empty");
            return Ok(HashMap::new());
        }

        let start = std::time::Instant::now();
        let data = std::fs::read(&self.cache_path)?;

        let decoded = if self.use_compression {
            let mut decoder = GzDecoder::new(&data[..]);
            let mut decompressed = Vec::new();
            decoder.read_to_end(&mut decompressed)?;
            decompressed
        } else {
            data
        };

        let entries: HashMap<ExternalId, MetadataEntry> = match serde_json::from_slice(&decoded) {
            Ok(entries) => entries,
            Err(e) => {
                // Unreadable cache: keep a copy for inspection and refill from the provider
                let backup_path = self.cache_path.with_extension("bak");
                if let Err(backup_err) = std::fs::copy(&self.cache_path, &backup_path) {
                    warn!(
                        "Failed to backup unreadable metadata cache: {}. Starting with empty cache.",
                        backup_err
                    );
                } else {
                    info!(
                        "Metadata cache unreadable (error: {}). Backed up to {:?} and starting with empty cache.",
                        e, backup_path
                    );
                }
                return Ok(HashMap::new());
            }
        };

        info!(
            "Loaded metadata cache: {} entries in {:?}",
            entries.len(),
            start.elapsed()
        );
        Ok(entries)
    }

    fn write_entries(&self, entries: &HashMap<ExternalId, MetadataEntry>) -> Result<()> {
        let serialized = serde_json::to_vec(entries)?;

        let encoded = if self.use_compression {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&serialized)?;
            encoder.finish()?
        } else {
            serialized
        };

        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Atomic write: write to temp file, then rename
        let temp_path = self.cache_path.with_extension("tmp");
        std::fs::write(&temp_path, encoded)?;
        std::fs::rename(&temp_path, &self.cache_path)?;
        Ok(())
    }
}

impl MetadataStore for FileMetadataStore {
    fn load_all(&self) -> Result<HashMap<ExternalId, MetadataEntry>> {
        self.read_entries()
    }

    fn put_many(&self, entries: &HashMap<ExternalId, MetadataEntry>) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("metadata cache write lock poisoned"))?;

        let start = std::time::Instant::now();
        let mut all = self.read_entries()?;
        all.extend(entries.iter().map(|(id, entry)| (*id, entry.clone())));
        self.write_entries(&all)?;

        debug!(
            "Saved metadata cache: {} new/updated, {} total in {:?}",
            entries.len(),
            all.len(),
            start.elapsed()
        );
        Ok(())
    }
}

/// Process-local store, used for tests and one-shot runs
#[derive(Default)]
pub struct MemoryMetadataStore {
    entries: Mutex<HashMap<ExternalId, MetadataEntry>>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: HashMap<ExternalId, MetadataEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn load_all(&self) -> Result<HashMap<ExternalId, MetadataEntry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("metadata store lock poisoned"))?;
        Ok(entries.clone())
    }

    fn get(&self, id: ExternalId) -> Result<Option<MetadataEntry>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("metadata store lock poisoned"))?;
        Ok(entries.get(&id).cloned())
    }

    fn put_many(&self, entries: &HashMap<ExternalId, MetadataEntry>) -> Result<()> {
        let mut stored = self
            .entries
            .lock()
            .map_err(|_| anyhow!("metadata store lock poisoned"))?;
        stored.extend(entries.iter().map(|(id, entry)| (*id, entry.clone())));
        Ok(())
    }
}

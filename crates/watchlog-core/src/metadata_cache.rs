use crate::cache_storage::MetadataStore;
use anyhow::Result;
use futures::future::join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use watchlog_models::{ExternalId, MetadataEntry, WatchRecord};
use watchlog_sources::{MetadataProvider, ProviderError};

pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Whether an entry has to be (re)fetched: absent, or still carrying
/// name-only legacy countries. There is no TTL.
pub fn needs_refresh(entry: Option<&MetadataEntry>) -> bool {
    match entry {
        None => true,
        Some(entry) => entry.countries.is_legacy(),
    }
}

/// Read access to cached metadata, as consumed by statistics and recommendations
pub trait MetadataLookup {
    fn lookup(&self, id: ExternalId) -> Option<&MetadataEntry>;
}

impl MetadataLookup for HashMap<ExternalId, MetadataEntry> {
    fn lookup(&self, id: ExternalId) -> Option<&MetadataEntry> {
        self.get(&id)
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Distinct stale ids found at the start of the pass
    pub requested: usize,
    pub fetched: usize,
    /// Transient, malformed or rate-limited fetches, retried next pass
    pub failed: usize,
    pub not_found: usize,
    /// Ids left untouched because the provider rate limited an earlier batch
    pub skipped: usize,
    pub rate_limited: bool,
    pub persist_failures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub batch: usize,
    pub total_batches: usize,
    pub processed: usize,
    pub total: usize,
}

/// Cache of provider metadata keyed by external id
///
/// Entries live in memory and are mirrored to a [`MetadataStore`]. The only
/// mutation entry point is [`MetadataCache::reconcile`]; every batch it fetches
/// is merged and persisted before the next batch starts.
pub struct MetadataCache {
    entries: HashMap<ExternalId, MetadataEntry>,
    store: Arc<dyn MetadataStore>,
    /// Ids the provider does not know, skipped for the rest of this process
    not_found: HashSet<ExternalId>,
    batch_size: usize,
}

impl MetadataCache {
    pub fn open(store: Arc<dyn MetadataStore>) -> Result<Self> {
        let entries = store.load_all()?;
        let legacy = entries.values().filter(|e| e.countries.is_legacy()).count();
        if legacy > 0 {
            info!("Metadata cache has {} legacy entries awaiting refresh", legacy);
        }
        Ok(Self {
            entries,
            store,
            not_found: HashSet::new(),
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn get(&self, id: ExternalId) -> Option<&MetadataEntry> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct ids referenced by `records` that need a fetch, in first-seen order
    pub fn stale_ids(&self, records: &[WatchRecord]) -> Vec<ExternalId> {
        let mut seen = HashSet::new();
        records
            .iter()
            .filter_map(|r| r.external_id)
            .filter(|id| seen.insert(*id))
            .filter(|id| !self.not_found.contains(id))
            .filter(|id| needs_refresh(self.entries.get(id)))
            .collect()
    }

    pub async fn reconcile(
        &mut self,
        records: &[WatchRecord],
        provider: &dyn MetadataProvider,
    ) -> ReconcileReport {
        self.reconcile_with_progress(records, provider, |_| {}).await
    }

    /// Fill absent and legacy entries in bounded concurrent batches
    ///
    /// Failed fetches leave their entry untouched and are picked up again by the
    /// next pass. A rate limit stops the pass after the batch that hit it.
    pub async fn reconcile_with_progress<F>(
        &mut self,
        records: &[WatchRecord],
        provider: &dyn MetadataProvider,
        mut on_batch: F,
    ) -> ReconcileReport
    where
        F: FnMut(BatchProgress),
    {
        let stale = self.stale_ids(records);
        let mut report = ReconcileReport {
            requested: stale.len(),
            ..Default::default()
        };

        if stale.is_empty() {
            debug!("Metadata cache is up to date ({} entries)", self.entries.len());
            return report;
        }

        let total_batches = stale.len().div_ceil(self.batch_size);
        info!(
            "Reconciling {} stale metadata entries from {} in {} batches",
            stale.len(),
            provider.provider_name(),
            total_batches
        );

        let mut processed = 0;
        for (index, batch) in stale.chunks(self.batch_size).enumerate() {
            let results = join_all(
                batch
                    .iter()
                    .map(|&id| async move { (id, provider.fetch_details(id).await) }),
            )
            .await;

            let mut fetched = HashMap::new();
            let mut rate_limited = false;
            for (id, result) in results {
                match result {
                    Ok(entry) => {
                        fetched.insert(id, entry);
                    }
                    Err(ProviderError::NotFound(_)) => {
                        debug!("Metadata not found for {}, not retrying this run", id);
                        self.not_found.insert(id);
                        report.not_found += 1;
                    }
                    Err(e) => {
                        warn!("Failed to fetch metadata for {}: {}", id, e);
                        rate_limited |= e.is_rate_limited();
                        report.failed += 1;
                    }
                }
            }

            report.fetched += fetched.len();
            if !fetched.is_empty() {
                if let Err(e) = self.store.put_many(&fetched) {
                    warn!("Failed to persist metadata batch {}: {}", index + 1, e);
                    report.persist_failures += 1;
                }
                self.entries.extend(fetched);
            }

            processed += batch.len();
            on_batch(BatchProgress {
                batch: index + 1,
                total_batches,
                processed,
                total: stale.len(),
            });

            if rate_limited {
                report.rate_limited = true;
                report.skipped = stale.len() - processed;
                warn!(
                    "Rate limited by {}, leaving {} entries for the next pass",
                    provider.provider_name(),
                    report.skipped
                );
                break;
            }
        }

        info!(
            "Metadata reconcile: {} fetched, {} failed, {} not found, {} skipped",
            report.fetched, report.failed, report.not_found, report.skipped
        );
        report
    }
}

impl MetadataLookup for MetadataCache {
    fn lookup(&self, id: ExternalId) -> Option<&MetadataEntry> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_storage::MemoryMetadataStore;
    use crate::testing::{date, enriched, FakeProvider};
    use watchlog_models::{Countries, Country};

    fn drama() -> MetadataEntry {
        MetadataEntry::new(vec!["Drama".to_string()], vec![Country::new("FI", "Finland")])
    }

    fn history(ids: &[ExternalId]) -> Vec<WatchRecord> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| enriched(&i.to_string(), *id, date(2024, 1, 1)))
            .collect()
    }

    fn open(store: &Arc<MemoryMetadataStore>) -> MetadataCache {
        MetadataCache::open(store.clone() as Arc<dyn MetadataStore>).unwrap()
    }

    #[test]
    fn test_needs_refresh() {
        let legacy: MetadataEntry =
            serde_json::from_str(r#"{"genres":["Drama"],"countries":["Finland"]}"#).unwrap();
        let resolved: MetadataEntry = serde_json::from_str(
            r#"{"genres":["Drama"],"countries":[{"code":"FI","name":"Finland"}]}"#,
        )
        .unwrap();

        assert!(needs_refresh(None));
        assert!(needs_refresh(Some(&legacy)));
        assert!(!needs_refresh(Some(&resolved)));
        assert!(!needs_refresh(Some(&MetadataEntry::default())));
    }

    #[test]
    fn test_stale_ids_are_distinct_and_skip_fresh_entries() {
        let mut entries = HashMap::new();
        entries.insert(2, drama());
        entries.insert(
            3,
            MetadataEntry {
                genres: vec![],
                countries: Countries::Legacy(vec!["Sweden".to_string()]),
            },
        );
        let store = Arc::new(MemoryMetadataStore::with_entries(entries));
        let cache = open(&store);

        let mut records = history(&[1, 2, 1, 3]);
        records.push(crate::testing::record("x", watchlog_models::Person::Aino, None));
        assert_eq!(cache.stale_ids(&records), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_reconcile_persists_each_batch_and_retries_failures_next_pass() {
        let mut provider = FakeProvider::default();
        for id in 1..=7 {
            provider.details.insert(id, Ok(drama()));
        }
        provider
            .details
            .insert(4, Err(ProviderError::Transient("timeout".to_string())));

        let store = Arc::new(MemoryMetadataStore::new());
        let mut cache = open(&store).with_batch_size(5);
        let records = history(&[1, 2, 3, 4, 5, 6, 7, 1]);

        let mut batches = Vec::new();
        let report = cache
            .reconcile_with_progress(&records, &provider, |p| batches.push(p))
            .await;

        assert_eq!(report.requested, 7);
        assert_eq!(report.fetched, 6);
        assert_eq!(report.failed, 1);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].processed, 7);
        assert!(cache.get(4).is_none());
        assert_eq!(store.load_all().unwrap().len(), 6);

        // The failed id is the only one left, and succeeds once the provider recovers
        provider.details.insert(4, Ok(drama()));
        let report = cache.reconcile(&records, &provider).await;
        assert_eq!(report.requested, 1);
        assert_eq!(report.fetched, 1);
        assert_eq!(cache.get(4), Some(&drama()));
        assert!(cache.stale_ids(&records).is_empty());
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried_by_the_same_cache() {
        let provider = FakeProvider::default();
        let store = Arc::new(MemoryMetadataStore::new());
        let mut cache = open(&store);
        let records = history(&[42]);

        let report = cache.reconcile(&records, &provider).await;
        assert_eq!(report.not_found, 1);
        assert!(cache.get(42).is_none());

        let report = cache.reconcile(&records, &provider).await;
        assert_eq!(report.requested, 0);
        assert_eq!(provider.calls_starting_with("details:").len(), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_keeps_finished_batches_and_skips_the_rest() {
        let mut provider = FakeProvider::default();
        for id in 1..=6 {
            provider.details.insert(id, Ok(drama()));
        }
        provider
            .details
            .insert(3, Err(ProviderError::RateLimited { retry_after: Some(10) }));

        let store = Arc::new(MemoryMetadataStore::new());
        let mut cache = open(&store).with_batch_size(2);
        let report = cache.reconcile(&history(&[1, 2, 3, 4, 5, 6]), &provider).await;

        assert!(report.rate_limited);
        assert_eq!(report.fetched, 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 2);
        assert!(cache.get(4).is_some());
        assert!(cache.get(5).is_none());
        assert_eq!(provider.calls_starting_with("details:").len(), 4);
    }

    #[tokio::test]
    async fn test_legacy_entry_is_replaced_whole() {
        let mut entries = HashMap::new();
        entries.insert(
            9,
            MetadataEntry {
                genres: vec!["Old".to_string()],
                countries: Countries::Legacy(vec!["Finland".to_string()]),
            },
        );
        let store = Arc::new(MemoryMetadataStore::with_entries(entries));
        let mut provider = FakeProvider::default();
        provider.details.insert(9, Ok(drama()));

        let mut cache = open(&store);
        cache.reconcile(&history(&[9]), &provider).await;

        assert_eq!(cache.get(9), Some(&drama()));
        assert_eq!(store.get(9).unwrap(), Some(drama()));
    }
}

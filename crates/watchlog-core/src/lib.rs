pub mod cache_storage;
pub mod grouping;
pub mod import;
pub mod metadata_cache;
pub mod recommend;
pub mod stats;

#[cfg(test)]
pub(crate) mod testing;

pub use cache_storage::{FileMetadataStore, MemoryMetadataStore, MetadataStore};
pub use grouping::{group_by_year_month, latest_record, newest_first, GroupedHistory, MonthGroup, SortDirection, YearGroup};
pub use import::{import_history, import_record_id, slugify};
pub use metadata_cache::{needs_refresh, BatchProgress, MetadataCache, MetadataLookup, ReconcileReport};
pub use recommend::{RecommendationEngine, RecommendationOptions};
pub use stats::{compute_stats, CountryCount, NamedCount, StatsOptions, StatsReport};

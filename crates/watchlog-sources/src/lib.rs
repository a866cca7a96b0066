pub mod error;
pub mod import;
pub mod store;
pub mod tmdb;
pub mod traits;

pub use error::{ProviderError, StoreError};
pub use import::{parse_history_log, LogEntry};
pub use store::{sort_newest_first, JsonRecordStore};
pub use tmdb::TmdbClient;
pub use traits::{MetadataProvider, WatchRecordStore};

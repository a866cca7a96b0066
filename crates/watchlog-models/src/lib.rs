pub mod candidate;
pub mod metadata;
pub mod watch_record;

pub use candidate::RecommendationCandidate;
pub use metadata::{Countries, Country, MetadataEntry};
pub use watch_record::{Person, UnknownPerson, WatchRecord};

/// Identifier of a title in the metadata provider's catalog (a TMDB movie id)
pub type ExternalId = u32;

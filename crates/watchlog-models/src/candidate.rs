use serde::{Deserialize, Serialize};
use crate::ExternalId;

/// A catalog title being considered for suggestion
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecommendationCandidate {
    pub external_id: ExternalId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_year: Option<i32>,
    /// Provider-relative poster path (e.g. "/abc.jpg")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster_ref: Option<String>,
}

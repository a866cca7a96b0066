use thiserror::Error;

/// Failure of a single metadata provider call
///
/// Every variant is recoverable from the caller's point of view: the item or
/// source that failed simply contributes nothing for this pass.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Network failure, timeout or 5xx response
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// The catalog has no such title
    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    /// The provider answered, but the payload could not be understood
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Whether a later reconciliation pass should try this item again
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ProviderError::NotFound(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ProviderError::Malformed(e.to_string())
        } else {
            ProviderError::Transient(e.to_string())
        }
    }
}

/// Failure reading or writing the watch record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record store is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

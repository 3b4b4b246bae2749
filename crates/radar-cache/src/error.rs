//! Cache error types.
//!
//! [`FetchError`] is what an upstream fetcher reports. [`CacheError`] is what a
//! cache hands back to its callers, which only happens when there is no
//! snapshot to fall back on.

/// Errors reported by an upstream [`Fetcher`](crate::Fetcher).
///
/// The type is `Clone` so that every caller collapsed into a single refresh
/// attempt can observe the same failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// A network error occurred while contacting the upstream.
    #[error("Network error: {0}")]
    Network(String),

    /// The upstream returned a non-success status code.
    #[error("HTTP error: status {status}")]
    Http {
        /// The returned status code.
        status: u16,
    },

    /// The upstream response could not be parsed.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The upstream is not available for another reason.
    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Create a network error from any displayable error.
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(err.to_string())
    }

    /// Create a parse error from any displayable error.
    pub fn parse(err: impl std::fmt::Display) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Errors returned by [`RefreshableCache`](crate::RefreshableCache) accessors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// No fetch has ever succeeded and the latest attempt failed.
    ///
    /// Returning an empty map here would be indistinguishable from an upstream
    /// that legitimately has no entities.
    #[error("{cache} cache is unavailable: {source}")]
    Unavailable {
        /// Name of the cache.
        cache: String,
        /// The most recent fetch failure.
        #[source]
        source: FetchError,
    },
}

impl CacheError {
    /// Returns the fetch error behind this cache error.
    pub fn fetch_error(&self) -> &FetchError {
        match self {
            Self::Unavailable { source, .. } => source,
        }
    }
}

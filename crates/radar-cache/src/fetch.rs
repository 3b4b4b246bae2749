//! Upstream fetcher abstraction.

use std::future::Future;

use async_trait::async_trait;

use crate::error::FetchError;

/// Retrieves the full current list of entities from an upstream source.
///
/// Implementations must be safe to call repeatedly. Any timeout belongs to the
/// implementation; the cache only observes success or failure.
///
/// Any `Fn() -> impl Future<Output = Result<Vec<V>, FetchError>>` closure is a
/// fetcher, which is how owners usually supply one:
///
/// ```ignore
/// let http = Arc::clone(&http);
/// let fetcher = move || {
///     let http = Arc::clone(&http);
///     async move { http.fetch_list::<Subject>("api/subjects").await }
/// };
/// ```
#[async_trait]
pub trait Fetcher<V>: Send + Sync {
    /// Fetch every entity currently known to the upstream.
    async fn fetch(&self) -> Result<Vec<V>, FetchError>;
}

#[async_trait]
impl<V, F, Fut> Fetcher<V> for F
where
    V: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<Vec<V>, FetchError>> + Send + 'static,
{
    async fn fetch(&self) -> Result<Vec<V>, FetchError> {
        (self)().await
    }
}

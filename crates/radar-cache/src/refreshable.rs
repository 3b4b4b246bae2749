//! Refreshable keyed cache.
//!
//! This module provides [`RefreshableCache`], an in-memory snapshot of every
//! entity an upstream returned on its last successful fetch.
//!
//! # Example
//!
//! ```ignore
//! use radar_cache::{CacheConfig, RefreshableCache};
//!
//! let projects = RefreshableCache::new(
//!     "projects",
//!     CacheConfig::default(),
//!     move || fetch_projects(),
//!     |project: &Project| project.project_name.clone(),
//! )?;
//!
//! let all = projects.get_all().await?;
//! let radar = projects.get(&"radar".to_string()).await?;
//! ```
//!
//! # Refresh policy
//!
//! Refreshes are lazy. An access triggers one when the snapshot is older than
//! `invalidate_after` (or was invalidated) and no failed attempt happened
//! within the last `retry_after`. Forced accesses skip the age check but still
//! honour the failure backoff.
//!
//! A failed refresh never discards data: the previous snapshot keeps being
//! served. Only a cache that has never completed a fetch reports
//! [`CacheError::Unavailable`].
//!
//! # Concurrency
//!
//! Reads are lock-free: the snapshot and its timestamps live in one immutable
//! state record published through an [`ArcSwap`], so a reader never observes a
//! new timestamp without the matching snapshot.
//!
//! Refresh attempts are serialized by a mutex. Callers that need a refresh
//! wait for the mutex; if another caller finished an attempt while they
//! waited, they adopt that outcome instead of fetching again. Concurrent
//! triggers therefore collapse into a single upstream call, and no caller sees
//! data older than the attempt it waited for.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::CacheResult;
use crate::config::{CacheConfig, ConfigError};
use crate::error::{CacheError, FetchError};
use crate::fetch::Fetcher;

/// Immutable mapping produced by one successful fetch.
pub type Snapshot<K, V> = Arc<HashMap<K, V>>;

type KeyFn<K, V> = Box<dyn Fn(&V) -> K + Send + Sync>;

// =============================================================================
// Cache State
// =============================================================================

/// State published after every refresh attempt. Never mutated once stored.
struct CacheState<K, V> {
    /// Entities from the last successful fetch.
    entries: Snapshot<K, V>,

    /// Monotonic time of the last successful fetch.
    last_success: Option<Instant>,

    /// Monotonic time of the last failed fetch. Cleared on success.
    last_failure: Option<Instant>,

    /// Error of the last failed fetch. Cleared on success.
    last_error: Option<FetchError>,

    /// Wall-clock time of the last successful fetch.
    refreshed_at: Option<OffsetDateTime>,

    /// Wall-clock time of the last failed fetch.
    failed_at: Option<OffsetDateTime>,

    /// Set by `invalidate()`, cleared by the next successful fetch.
    invalidated: bool,

    /// Number of refresh attempts, successful or not.
    attempts: u64,

    /// Number of successful refreshes.
    version: u64,

    consecutive_failures: u32,
}

impl<K, V> CacheState<K, V> {
    fn empty() -> Self {
        Self {
            entries: Arc::new(HashMap::new()),
            last_success: None,
            last_failure: None,
            last_error: None,
            refreshed_at: None,
            failed_at: None,
            invalidated: false,
            attempts: 0,
            version: 0,
            consecutive_failures: 0,
        }
    }
}

// Manual impl: the snapshot is shared, so K and V need not be Clone.
impl<K, V> Clone for CacheState<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            last_success: self.last_success,
            last_failure: self.last_failure,
            last_error: self.last_error.clone(),
            refreshed_at: self.refreshed_at,
            failed_at: self.failed_at,
            invalidated: self.invalidated,
            attempts: self.attempts,
            version: self.version,
            consecutive_failures: self.consecutive_failures,
        }
    }
}

// =============================================================================
// Refreshable Cache
// =============================================================================

/// Keyed cache over the full entity list of an upstream source.
///
/// The cache owns no background task. Every refresh is performed by a caller
/// of [`get_all`](Self::get_all), [`get`](Self::get) or their forced variants.
/// See the [module documentation](self) for the refresh and concurrency
/// policy.
pub struct RefreshableCache<K, V> {
    /// Name used in logs and errors.
    name: String,

    config: CacheConfig,

    /// Upstream source of the full entity list.
    fetcher: Box<dyn Fetcher<V>>,

    /// Derives the lookup key of an entity.
    key_of: KeyFn<K, V>,

    /// Current state, swapped atomically after every attempt.
    state: ArcSwap<CacheState<K, V>>,

    /// Serializes refresh attempts.
    refresh_lock: Mutex<()>,
}

impl<K, V> RefreshableCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Create a new, empty cache.
    ///
    /// Nothing is fetched until the first access.
    ///
    /// # Arguments
    ///
    /// * `name` - Name used in logs and errors
    /// * `config` - Freshness and backoff durations
    /// * `fetcher` - Retrieves the full entity list from the upstream
    /// * `key_of` - Derives the lookup key of an entity
    ///
    /// # Errors
    ///
    /// Returns an error if `config` is invalid.
    pub fn new<F, E>(
        name: impl Into<String>,
        config: CacheConfig,
        fetcher: F,
        key_of: E,
    ) -> Result<Self, ConfigError>
    where
        F: Fetcher<V> + 'static,
        E: Fn(&V) -> K + Send + Sync + 'static,
    {
        config.validate()?;

        Ok(Self {
            name: name.into(),
            config,
            fetcher: Box::new(fetcher),
            key_of: Box::new(key_of),
            state: ArcSwap::from_pointee(CacheState::empty()),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Name of this cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured durations.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Get the full current mapping.
    ///
    /// Refreshes first if the snapshot is stale and no failure backoff is in
    /// effect. A failed refresh falls back to the previous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if no fetch has ever succeeded.
    pub async fn get_all(&self) -> CacheResult<Snapshot<K, V>> {
        self.snapshot(false).await
    }

    /// Get the full mapping after a refresh that ignores the snapshot age.
    ///
    /// Inside the failure backoff window no fetch is made and the current
    /// snapshot is returned, as with [`get_all`](Self::get_all).
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if no fetch has ever succeeded.
    pub async fn get_all_forced(&self) -> CacheResult<Snapshot<K, V>> {
        self.snapshot(true).await
    }

    /// Look up a single entity.
    ///
    /// Returns `Ok(None)` if the key is absent from the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if no fetch has ever succeeded.
    pub async fn get(&self, key: &K) -> CacheResult<Option<V>>
    where
        V: Clone,
    {
        Ok(self.get_all().await?.get(key).cloned())
    }

    /// Look up a single entity after a forced refresh.
    ///
    /// Used to tell an entity that does not exist upstream apart from one the
    /// snapshot has not seen yet. Check [`may_retry`](Self::may_retry) first:
    /// a miss is only authoritative if the refresh was allowed to run.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Unavailable`] if no fetch has ever succeeded.
    pub async fn get_forced(&self, key: &K) -> CacheResult<Option<V>>
    where
        V: Clone,
    {
        Ok(self.get_all_forced().await?.get(key).cloned())
    }

    /// Whether a refresh attempt is currently permitted.
    ///
    /// True if no failure is recorded or the last failure is at least
    /// `retry_after` old.
    pub fn may_retry(&self) -> bool {
        let state = self.state.load();
        self.backoff_elapsed(&state, Instant::now())
    }

    /// Number of successful refreshes so far.
    ///
    /// Comparing values taken before and after an access tells whether that
    /// access, or a concurrent one, published a new snapshot.
    pub fn version(&self) -> u64 {
        self.state.load().version
    }

    /// Mark the snapshot stale so that the next access refreshes.
    ///
    /// The snapshot is kept and still served if that refresh fails.
    pub async fn invalidate(&self) {
        let _guard = self.refresh_lock.lock().await;
        let mut next = CacheState::clone(&self.state.load());
        next.invalidated = true;
        self.state.store(Arc::new(next));
        tracing::debug!(cache = %self.name, "Cache invalidated");
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.load();
        CacheStats {
            name: self.name.clone(),
            entries: state.entries.len(),
            version: state.version,
            attempts: state.attempts,
            consecutive_failures: state.consecutive_failures,
            last_refresh: state.refreshed_at,
            last_failure: state.failed_at,
            stale: self.is_stale(&state, Instant::now()),
            invalidate_after: self.config.invalidate_after,
            retry_after: self.config.retry_after,
        }
    }

    async fn snapshot(&self, force: bool) -> CacheResult<Snapshot<K, V>> {
        let observed = self.state.load_full();
        if !self.should_refresh(&observed, Instant::now(), force) {
            tracing::trace!(cache = %self.name, force, "Serving cached snapshot");
            return self.serve(&observed);
        }

        let _guard = self.refresh_lock.lock().await;

        let current = self.state.load_full();
        if current.attempts != observed.attempts {
            tracing::debug!(cache = %self.name, "Using result of concurrent refresh");
            return self.serve(&current);
        }

        self.refresh(&current).await
    }

    /// Fetch, build and publish a new state. Caller must hold `refresh_lock`.
    async fn refresh(&self, current: &CacheState<K, V>) -> CacheResult<Snapshot<K, V>> {
        tracing::debug!(cache = %self.name, "Refreshing cache from upstream");

        let result = self.fetcher.fetch().await;
        let now = Instant::now();

        let mut next = current.clone();
        next.attempts += 1;

        match result {
            Ok(values) => {
                let fetched = values.len();
                // Later entities win on duplicate keys
                let entries: HashMap<K, V> = values
                    .into_iter()
                    .map(|value| ((self.key_of)(&value), value))
                    .collect();

                if entries.len() < fetched {
                    tracing::debug!(
                        cache = %self.name,
                        duplicates = fetched - entries.len(),
                        "Upstream returned duplicate keys"
                    );
                }

                next.entries = Arc::new(entries);
                next.last_success = Some(now);
                next.refreshed_at = Some(OffsetDateTime::now_utc());
                next.last_failure = None;
                next.last_error = None;
                next.invalidated = false;
                next.consecutive_failures = 0;
                next.version += 1;

                tracing::info!(
                    cache = %self.name,
                    entries = next.entries.len(),
                    version = next.version,
                    "Cache refreshed"
                );
            }
            Err(err) => {
                next.last_failure = Some(now);
                next.failed_at = Some(OffsetDateTime::now_utc());
                next.last_error = Some(err.clone());
                next.consecutive_failures = next.consecutive_failures.saturating_add(1);

                if next.last_success.is_some() {
                    tracing::warn!(
                        cache = %self.name,
                        error = %err,
                        entries = next.entries.len(),
                        failures = next.consecutive_failures,
                        retry_after = ?self.config.retry_after,
                        "Cache refresh failed, serving stale snapshot"
                    );
                } else {
                    tracing::error!(
                        cache = %self.name,
                        error = %err,
                        retry_after = ?self.config.retry_after,
                        "Initial cache fetch failed"
                    );
                }
            }
        }

        let next = Arc::new(next);
        self.state.store(Arc::clone(&next));
        self.serve(&next)
    }

    fn serve(&self, state: &CacheState<K, V>) -> CacheResult<Snapshot<K, V>> {
        match (&state.last_success, &state.last_error) {
            (None, Some(err)) => Err(CacheError::Unavailable {
                cache: self.name.clone(),
                source: err.clone(),
            }),
            _ => Ok(Arc::clone(&state.entries)),
        }
    }

    fn should_refresh(&self, state: &CacheState<K, V>, now: Instant, force: bool) -> bool {
        (force || self.is_stale(state, now)) && self.backoff_elapsed(state, now)
    }

    fn is_stale(&self, state: &CacheState<K, V>, now: Instant) -> bool {
        state.invalidated
            || state.last_success.is_none_or(|at| {
                now.saturating_duration_since(at) >= self.config.invalidate_after
            })
    }

    fn backoff_elapsed(&self, state: &CacheState<K, V>, now: Instant) -> bool {
        state
            .last_failure
            .is_none_or(|at| now.saturating_duration_since(at) >= self.config.retry_after)
    }
}

impl<K, V> fmt::Debug for RefreshableCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.load();
        f.debug_struct("RefreshableCache")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("entries", &state.entries.len())
            .field("version", &state.version)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Cache Statistics
// =============================================================================

/// Statistics about a refreshable cache.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Name of the cache.
    pub name: String,

    /// Number of entities in the current snapshot.
    pub entries: usize,

    /// Number of successful refreshes.
    pub version: u64,

    /// Number of refresh attempts, successful or not.
    pub attempts: u64,

    /// Failed attempts since the last successful refresh.
    pub consecutive_failures: u32,

    /// Timestamp of the last successful refresh.
    pub last_refresh: Option<OffsetDateTime>,

    /// Timestamp of the last failed refresh.
    pub last_failure: Option<OffsetDateTime>,

    /// Whether the next access would attempt a refresh, ignoring backoff.
    pub stale: bool,

    /// Configured freshness TTL.
    pub invalidate_after: Duration,

    /// Configured failure backoff.
    pub retry_after: Duration,
}

// =============================================================================
// Tests
// =============================================================================

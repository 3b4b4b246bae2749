//! # radar-cache
//!
//! Refreshable keyed cache used to front the RADAR Management Portal and other
//! slow, rate-limited directory services.
//!
//! ## Overview
//!
//! A [`RefreshableCache`] holds an immutable snapshot of every entity an
//! upstream returned on its last successful fetch, keyed by a caller supplied
//! extractor. Refreshes are lazy and caller-triggered: the first access after
//! the snapshot has aged past `invalidate_after` fetches again. A failed
//! refresh keeps serving the previous snapshot and blocks further attempts for
//! `retry_after`.
//!
//! ## Modules
//!
//! - [`refreshable`] - The cache engine
//! - [`fetch`] - The upstream fetcher abstraction
//! - [`config`] - Freshness and backoff durations
//! - [`error`] - Fetch and cache error types

pub mod config;
pub mod error;
pub mod fetch;
pub mod refreshable;

pub use config::{CacheConfig, ConfigError};
pub use error::{CacheError, FetchError};
pub use fetch::Fetcher;
pub use refreshable::{CacheStats, RefreshableCache, Snapshot};

/// Type alias for cache results.
pub type CacheResult<T> = Result<T, CacheError>;

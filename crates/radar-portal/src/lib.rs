//! # radar-portal
//!
//! Cached client for the RADAR Management Portal directory.
//!
//! The portal is the registry of projects, enrolled subjects and the
//! source-type catalog. Lookups against it are frequent while its contents
//! change rarely, so every entity list is held in a
//! [`RefreshableCache`](radar_cache::RefreshableCache) and refreshed lazily.
//!
//! ## Modules
//!
//! - [`client`] - Subject, project and source-type lookups
//! - [`domain`] - Portal entity types
//! - [`http`] - Portal list endpoint access
//! - [`config`] - Application and portal configuration
//! - [`error`] - Client error types
//! - [`observability`] - Tracing setup

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod observability;

pub use client::ManagementPortalClient;
pub use config::{AppConfig, LoggingConfig, PortalConfig};
pub use domain::{Project, Source, SourceData, SourceType, SourceTypeIdentifier, Subject};
pub use error::{EntityKind, PortalError, PortalResult};

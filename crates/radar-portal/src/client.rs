//! Cached Management Portal directory client.
//!
//! The client keeps one [`RefreshableCache`] per entity type. Each cache has
//! its own freshness and backoff state, so an outage of one portal endpoint
//! does not affect lookups served by the others.
//!
//! # Example
//!
//! ```ignore
//! use radar_portal::{ManagementPortalClient, PortalConfig};
//!
//! let client = ManagementPortalClient::new(&PortalConfig::default())?;
//!
//! let subject = client.subject("8b2f3a1e").await?;
//! let enrolled = client.subjects_in_project("radar-pilot").await?;
//! ```

use std::hash::Hash;
use std::sync::Arc;

use radar_cache::{CacheResult, CacheStats, Fetcher, RefreshableCache, Snapshot};
use serde::de::DeserializeOwned;

use crate::config::PortalConfig;
use crate::domain::{Project, SourceType, SourceTypeIdentifier, Subject};
use crate::error::{EntityKind, PortalError, PortalResult};
use crate::http::PortalHttp;

/// Directory client for the RADAR Management Portal. Thread-safe.
pub struct ManagementPortalClient {
    subjects: RefreshableCache<String, Subject>,
    projects: RefreshableCache<String, Project>,
    source_types: RefreshableCache<SourceTypeIdentifier, SourceType>,
}

impl ManagementPortalClient {
    /// Create a client fetching from the configured portal.
    ///
    /// Nothing is fetched until the first lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &PortalConfig) -> PortalResult<Self> {
        config.validate()?;

        let http = Arc::new(PortalHttp::new(config)?);

        let subjects = RefreshableCache::new(
            "subjects",
            config.cache,
            list_fetcher::<Subject>(&http, &config.subject_endpoint),
            |s: &Subject| s.login.clone(),
        )?;
        let projects = RefreshableCache::new(
            "projects",
            config.cache,
            list_fetcher::<Project>(&http, &config.project_endpoint),
            |p: &Project| p.project_name.clone(),
        )?;
        let source_types = RefreshableCache::new(
            "source-types",
            config.cache,
            list_fetcher::<SourceType>(&http, &config.source_type_endpoint),
            SourceType::identifier,
        )?;

        tracing::debug!(url = %http.base_url(), "Management Portal client created");

        Ok(Self::from_caches(subjects, projects, source_types))
    }

    /// Create a client over caches supplied by the caller.
    pub fn from_caches(
        subjects: RefreshableCache<String, Subject>,
        projects: RefreshableCache<String, Project>,
        source_types: RefreshableCache<SourceTypeIdentifier, SourceType>,
    ) -> Self {
        Self {
            subjects,
            projects,
            source_types,
        }
    }

    /// All subjects, keyed by login.
    pub async fn subjects(&self) -> PortalResult<Snapshot<String, Subject>> {
        Ok(self.subjects.get_all().await?)
    }

    /// Look up a subject by login.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::NotFound` if the portal does not know the subject.
    pub async fn subject(&self, login: &str) -> PortalResult<Subject> {
        lookup(&self.subjects, &login.to_string())
            .await?
            .ok_or_else(|| PortalError::not_found(EntityKind::Subject, login))
    }

    /// Look up a subject and check that it is enrolled in the given project.
    ///
    /// # Errors
    ///
    /// - `PortalError::NotFound` if the project or subject does not exist
    /// - `PortalError::SubjectNotInProject` if the subject belongs elsewhere
    pub async fn subject_in_project(&self, project_name: &str, login: &str) -> PortalResult<Subject> {
        self.project(project_name).await?;

        let subject = self.subject(login).await?;
        if !subject.is_in_project(project_name) {
            return Err(PortalError::SubjectNotInProject {
                subject: login.to_string(),
                project: project_name.to_string(),
            });
        }
        Ok(subject)
    }

    /// Check that a subject is enrolled in the given project.
    ///
    /// # Errors
    ///
    /// Same as [`subject_in_project`](Self::subject_in_project).
    pub async fn check_subject_in_project(&self, project_name: &str, login: &str) -> PortalResult<()> {
        self.subject_in_project(project_name, login).await.map(|_| ())
    }

    /// All subjects enrolled in a project, ordered by login.
    ///
    /// An empty result is confirmed against a forced refresh when the subject
    /// cache may retry, so a project whose subjects were enrolled after the
    /// last refresh is not reported as empty. No confirming fetch is made if
    /// the subject list was just refreshed.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::NotFound` if the project does not exist.
    pub async fn subjects_in_project(&self, project_name: &str) -> PortalResult<Vec<Subject>> {
        self.project(project_name).await?;

        let version = self.subjects.version();
        let mut result = filter_project(&self.subjects.get_all().await?, project_name);

        if result.is_empty() && self.subjects.version() != version {
            result = filter_project(&self.subjects.get_all().await?, project_name);
        } else if result.is_empty() && self.subjects.may_retry() {
            tracing::debug!(project = project_name, "No subjects cached for project, refreshing");
            result = filter_project(&self.subjects.get_all_forced().await?, project_name);
        }

        result.sort_by(|a, b| a.login.cmp(&b.login));
        Ok(result)
    }

    /// All projects, keyed by project name.
    pub async fn projects(&self) -> PortalResult<Snapshot<String, Project>> {
        Ok(self.projects.get_all().await?)
    }

    /// Look up a project by name.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::NotFound` if the portal does not know the project.
    pub async fn project(&self, project_name: &str) -> PortalResult<Project> {
        lookup(&self.projects, &project_name.to_string())
            .await?
            .ok_or_else(|| PortalError::not_found(EntityKind::Project, project_name))
    }

    /// The full source-type catalog.
    pub async fn source_types(&self) -> PortalResult<Snapshot<SourceTypeIdentifier, SourceType>> {
        Ok(self.source_types.get_all().await?)
    }

    /// Look up a source type.
    ///
    /// # Errors
    ///
    /// Returns `PortalError::NotFound` if the catalog has no such source type.
    pub async fn source_type(
        &self,
        producer: &str,
        model: &str,
        catalog_version: &str,
    ) -> PortalResult<SourceType> {
        let id = SourceTypeIdentifier::new(producer, model, catalog_version);
        lookup(&self.source_types, &id)
            .await?
            .ok_or_else(|| PortalError::not_found(EntityKind::SourceType, id.to_string()))
    }

    /// Statistics of the subject, project and source-type caches.
    pub fn cache_stats(&self) -> Vec<CacheStats> {
        vec![
            self.subjects.stats(),
            self.projects.stats(),
            self.source_types.stats(),
        ]
    }
}

/// Look up a key, confirming a miss against a forced refresh when allowed.
///
/// A miss right after the snapshot was replaced is already authoritative, so
/// no second fetch is made.
async fn lookup<K, V>(cache: &RefreshableCache<K, V>, key: &K) -> CacheResult<Option<V>>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let version = cache.version();
    if let Some(value) = cache.get(key).await? {
        return Ok(Some(value));
    }

    if cache.version() != version {
        // Re-read in case a concurrent refresh landed after our read
        return cache.get(key).await;
    }

    if cache.may_retry() {
        tracing::debug!(cache = cache.name(), "Key not cached, refreshing");
        return cache.get_forced(key).await;
    }

    Ok(None)
}

fn filter_project(subjects: &Snapshot<String, Subject>, project_name: &str) -> Vec<Subject> {
    subjects
        .values()
        .filter(|s| s.is_in_project(project_name))
        .cloned()
        .collect()
}

fn list_fetcher<T>(http: &Arc<PortalHttp>, endpoint: &str) -> impl Fetcher<T> + 'static
where
    T: DeserializeOwned + Send + 'static,
{
    let http = Arc::clone(http);
    let endpoint: Arc<str> = Arc::from(endpoint);
    move || {
        let http = Arc::clone(&http);
        let endpoint = Arc::clone(&endpoint);
        async move { http.fetch_list::<T>(&endpoint).await }
    }
}

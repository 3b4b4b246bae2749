//! Directory client error types.

use std::fmt;

use radar_cache::{CacheError, ConfigError};

/// Kind of portal entity, used in not-found errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Subject,
    Project,
    SourceType,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject => f.write_str("Subject"),
            Self::Project => f.write_str("Project"),
            Self::SourceType => f.write_str("Source-type"),
        }
    }
}

/// Errors returned by the Management Portal client.
#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    /// The entity is not known to the portal.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Kind of entity looked up.
        kind: EntityKind,
        /// Identifier that was looked up.
        id: String,
    },

    /// The subject exists but is enrolled in another project.
    #[error("Subject {subject} is not part of project {project}")]
    SubjectNotInProject {
        /// Subject login.
        subject: String,
        /// Project that was checked.
        project: String,
    },

    /// The portal has never been reachable.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// The client configuration is invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl PortalError {
    pub(crate) fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns `true` for errors that mean "no such entity" rather than a
    /// system failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::SubjectNotInProject { .. }
        )
    }
}

/// Type alias for directory client results.
pub type PortalResult<T> = Result<T, PortalError>;

//! Projection error types.

use domain::ErrorKind;
use thiserror::Error;

/// Errors raised while feeding or querying read models.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Event store error: {0}")]
    EventStore(#[from] event_store::EventStoreError),

    /// An event payload did not match its declared type.
    #[error("Event deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// Unknown, or not visible to the caller.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl ProjectionError {
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        ProjectionError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProjectionError::EventStore(err) if err.is_timeout() => ErrorKind::Timeout,
            ProjectionError::EventStore(_) | ProjectionError::Deserialization(_) => {
                ErrorKind::Internal
            }
            ProjectionError::NotFound { .. } => ErrorKind::NotFound,
            ProjectionError::Forbidden(_) => ErrorKind::Forbidden,
        }
    }
}

/// Result type for projection operations.
pub type Result<T> = std::result::Result<T, ProjectionError>;

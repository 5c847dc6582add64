//! Error types for `kc-core`.

use thiserror::Error;

use crate::id::Id;

#[derive(Debug, Error)]
pub enum Error {
  #[error("project not found: {0}")]
  ProjectNotFound(Id),

  #[error("knowledge source {source_id} not found in project {project_id}")]
  SourceNotFound { project_id: Id, source_id: Id },

  #[error("invalid request: {0}")]
  Validation(String),

  #[error("requested {requested} identifiers but only {available} are available")]
  AllocationShortfall { requested: usize, available: usize },

  /// The parent chain through this project loops back on itself, or the
  /// requested change would make it do so.
  #[error("project hierarchy cycle through {0}")]
  CycleDetected(Id),

  #[error("persistence failure: {0}")]
  Persistence(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend error (store or identifier source) as a
  /// [`Error::Persistence`].
  pub fn persistence<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Persistence(Box::new(err))
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation(message.into())
  }

  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::ProjectNotFound(_) | Self::SourceNotFound { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

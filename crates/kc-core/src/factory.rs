//! The knowledge-source factory contract.
//!
//! Turning a raw link or file into a populated source (metadata extraction,
//! favicon fetch) happens outside the core; the repository only needs the
//! resulting [`KnowledgeSource`].

use std::{future::Future, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::source::{IngestType, KnowledgeSource};

/// The raw input a source is made from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceTarget {
  Link { url: String },
  File { path: PathBuf },
  Search { query: String, url: String },
  Note { title: String },
}

pub trait SourceFactory: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Build a new, unowned knowledge source. Failures are returned, never
  /// raised.
  fn make(
    &self,
    ingest_type: IngestType,
    target: SourceTarget,
  ) -> impl Future<Output = Result<KnowledgeSource, Self::Error>> + Send + '_;
}

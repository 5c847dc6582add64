//! Knowledge sources: the imported artifacts a project collects.
//!
//! A knowledge source is owned by exactly one project's source list at a
//! time. Its access and modification history is an append-only audit trail:
//! every access or edit pushes a timestamp, nothing is ever overwritten.

use std::{
  collections::{BTreeMap, BTreeSet},
  fmt,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::Id;

// ─── Ingest type ─────────────────────────────────────────────────────────────

/// How a knowledge source entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestType {
  File,
  Website,
  Search,
  Note,
  Topic,
  Generic,
}

impl IngestType {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::File => "file",
      Self::Website => "website",
      Self::Search => "search",
      Self::Note => "note",
      Self::Topic => "topic",
      Self::Generic => "generic",
    }
  }

  /// Whether `reference` is a valid payload for this ingest type.
  /// `Generic` accepts any reference.
  pub fn accepts(self, reference: &SourceReference) -> bool {
    match (self, reference) {
      (Self::Generic, _) => true,
      (Self::File, SourceReference::File(_)) => true,
      (Self::Website, SourceReference::Website(_)) => true,
      (Self::Search, SourceReference::Search(_)) => true,
      (Self::Note | Self::Topic, SourceReference::None) => true,
      _ => false,
    }
  }
}

impl fmt::Display for IngestType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ─── Reference payloads ──────────────────────────────────────────────────────

/// Metadata for a source imported from the local filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
  pub filename:  String,
  pub path:      String,
  pub size:      Option<u64>,
  pub mime_type: Option<String>,
}

/// Metadata for a source imported from a web page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteMetadata {
  pub url:      String,
  /// Free-form key/value pairs scraped from the page (`og:title`, etc.).
  #[serde(default)]
  pub metadata: BTreeMap<String, String>,
}

/// A single hit from a search provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
  pub query:   String,
  pub url:     String,
  pub snippet: Option<String>,
}

/// Typed payload matching the source's [`IngestType`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceReference {
  File(FileMetadata),
  Website(WebsiteMetadata),
  Search(SearchResult),
  #[default]
  None,
}

// ─── Notes ───────────────────────────────────────────────────────────────────

/// A user note attached to a knowledge source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceNote {
  pub title:      String,
  pub content:    String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── KnowledgeSource ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeSource {
  pub id:                    Id,
  pub title:                 String,
  #[serde(default)]
  pub description:           String,
  pub ingest_type:           IngestType,
  #[serde(default)]
  pub reference:             SourceReference,
  /// URL or filesystem path used to open the source.
  #[serde(default)]
  pub access_link:           String,
  #[serde(default)]
  pub topics:                BTreeSet<String>,
  /// Filled in late by the icon pipeline; may be a URL or a data URI.
  #[serde(default)]
  pub icon:                  Option<String>,
  #[serde(default)]
  pub flagged:               bool,
  #[serde(default)]
  pub notes:                 Vec<SourceNote>,
  pub date_created:          DateTime<Utc>,
  #[serde(default)]
  pub date_modified:         Vec<DateTime<Utc>>,
  #[serde(default)]
  pub date_accessed:         Vec<DateTime<Utc>>,
  /// The project whose source list currently owns this entry.
  #[serde(default)]
  pub associated_project_id: Option<Id>,
}

impl KnowledgeSource {
  /// A new, unowned source stamped with the current time.
  pub fn new(
    id: Id,
    title: impl Into<String>,
    ingest_type: IngestType,
    reference: SourceReference,
    access_link: impl Into<String>,
  ) -> Self {
    Self {
      id,
      title: title.into(),
      description: String::new(),
      ingest_type,
      reference,
      access_link: access_link.into(),
      topics: BTreeSet::new(),
      icon: None,
      flagged: false,
      notes: Vec::new(),
      date_created: Utc::now(),
      date_modified: Vec::new(),
      date_accessed: Vec::new(),
      associated_project_id: None,
    }
  }

  /// Append an access to the audit trail.
  pub fn record_access(&mut self, at: DateTime<Utc>) {
    self.date_accessed.push(at);
  }

  /// Append a modification to the audit trail.
  pub fn record_modification(&mut self, at: DateTime<Utc>) {
    self.date_modified.push(at);
  }

  pub fn last_accessed(&self) -> Option<DateTime<Utc>> {
    self.date_accessed.iter().max().copied()
  }

  pub fn last_modified(&self) -> Option<DateTime<Utc>> {
    self.date_modified.iter().max().copied()
  }
}

// ─── Enrichment ──────────────────────────────────────────────────────────────

/// Late field updates delivered by the icon/metadata pipeline after a source
/// has already been stored. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceEnrichment {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub icon:        Option<String>,
}

impl SourceEnrichment {
  /// Apply to `source`, returning whether any field changed.
  pub fn apply(&self, source: &mut KnowledgeSource) -> bool {
    let mut changed = false;
    if let Some(title) = &self.title
      && *title != source.title
    {
      source.title = title.clone();
      changed = true;
    }
    if let Some(description) = &self.description
      && *description != source.description
    {
      source.description = description.clone();
      changed = true;
    }
    if self.icon.is_some() && self.icon != source.icon {
      source.icon = self.icon.clone();
      changed = true;
    }
    changed
  }
}

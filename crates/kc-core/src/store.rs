//! The `KvStore` trait and the persisted key layout.
//!
//! The repository only ever talks to this abstraction, so the backing store
//! (SQLite file, in-memory map, IPC bridge) can be swapped freely.

use std::future::Future;

use crate::id::Id;

// ─── Key layout ──────────────────────────────────────────────────────────────

/// Well-known keys of the persisted layout.
pub mod keys {
  use super::Id;

  /// Ordered JSON array of every project id.
  pub const PROJECT_INDEX: &str = "kc-projects";
  /// Raw id of the selected project; empty when nothing is selected.
  pub const CURRENT_PROJECT: &str = "current-project";
  /// Decimal index of the active source-list sort key.
  pub const SORT_INDEX: &str = "ks-sort-index";
  /// Prefix of the per-project manual source ordering keys.
  pub const CUSTOM_SORT_PREFIX: &str = "ks-custom-sort-index";

  /// A project's full record is stored under its bare id.
  pub fn project(id: &Id) -> String { id.to_string() }

  pub fn custom_sort(id: &Id) -> String { format!("{CUSTOM_SORT_PREFIX}-{id}") }
}

// ─── Batches ─────────────────────────────────────────────────────────────────

/// One step of a [`KvStore::write_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
  Set { key: String, value: Vec<u8> },
  Delete { key: String },
}

impl WriteOp {
  pub fn set(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
    Self::Set { key: key.into(), value: value.into() }
  }

  pub fn delete(key: impl Into<String>) -> Self { Self::Delete { key: key.into() } }

  pub fn key(&self) -> &str {
    match self {
      Self::Set { key, .. } | Self::Delete { key } => key,
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an opaque key/value backend.
///
/// Single-key operations carry no transactional guarantee. Multi-key writes
/// go through [`KvStore::write_batch`], which backends override when they can
/// apply a batch atomically.
pub trait KvStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Read the value stored under `key`. Returns `None` if absent.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send + 'a;

  /// Store `value` under `key`, replacing any previous value.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: Vec<u8>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Remove `key`. Removing an absent key succeeds.
  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Every key currently stored, in ascending order.
  fn list_keys(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Apply `ops` in order.
  ///
  /// The default applies them one at a time: a failure part-way leaves the
  /// earlier ops applied.
  fn write_batch(
    &self,
    ops: Vec<WriteOp>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_ {
    async move {
      for op in ops {
        match op {
          WriteOp::Set { key, value } => self.set(&key, value).await?,
          WriteOp::Delete { key } => self.delete(&key).await?,
        }
      }
      Ok(())
    }
  }
}

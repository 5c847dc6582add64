//! In-process [`KvStore`] backed by a `BTreeMap`.

use std::{
  collections::BTreeMap,
  convert::Infallible,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use kc_core::store::{KvStore, WriteOp};

/// A shared in-memory store. Clones see the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  entries: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn entries(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Number of stored keys.
  pub fn len(&self) -> usize { self.entries().len() }

  pub fn is_empty(&self) -> bool { self.entries().is_empty() }
}

impl KvStore for MemoryStore {
  type Error = Infallible;

  async fn get<'a>(&'a self, key: &'a str) -> Result<Option<Vec<u8>>, Infallible> {
    Ok(self.entries().get(key).cloned())
  }

  async fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> Result<(), Infallible> {
    self.entries().insert(key.to_owned(), value);
    Ok(())
  }

  async fn delete<'a>(&'a self, key: &'a str) -> Result<(), Infallible> {
    self.entries().remove(key);
    Ok(())
  }

  async fn list_keys(&self) -> Result<Vec<String>, Infallible> {
    Ok(self.entries().keys().cloned().collect())
  }

  /// Applied under a single lock: readers never see a partial batch.
  async fn write_batch(&self, ops: Vec<WriteOp>) -> Result<(), Infallible> {
    let mut entries = self.entries();
    for op in ops {
      match op {
        WriteOp::Set { key, value } => {
          entries.insert(key, value);
        }
        WriteOp::Delete { key } => {
          entries.remove(&key);
        }
      }
    }
    Ok(())
  }
}

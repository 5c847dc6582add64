//! [`SqliteStore`]: the SQLite implementation of [`KvStore`].

use std::path::Path;

use kc_core::store::{KvStore, WriteOp};
use rusqlite::OptionalExtension as _;

use crate::{Error, Result, schema::SCHEMA};

const UPSERT: &str = "
INSERT INTO entries (key, value) VALUES (?1, ?2)
ON CONFLICT(key) DO UPDATE SET
    value      = excluded.value,
    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
";

const DELETE: &str = "DELETE FROM entries WHERE key = ?1";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A key/value store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  /// Missing parent directories are created.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
      tokio::fs::create_dir_all(dir).await?;
    }
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "sqlite store opened");
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── KvStore impl ────────────────────────────────────────────────────────────

impl KvStore for SqliteStore {
  type Error = Error;

  async fn get<'a>(&'a self, key: &'a str) -> Result<Option<Vec<u8>>> {
    let key = key.to_owned();
    let value: Option<Vec<u8>> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM entries WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> Result<()> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(UPSERT, rusqlite::params![key, value])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn delete<'a>(&'a self, key: &'a str) -> Result<()> {
    let key = key.to_owned();
    self
      .conn
      .call(move |conn| {
        conn.execute(DELETE, rusqlite::params![key])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_keys(&self) -> Result<Vec<String>> {
    let keys = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT key FROM entries ORDER BY key")?;
        let keys = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
      })
      .await?;
    Ok(keys)
  }

  /// All ops run in one transaction: either every op lands or none does.
  async fn write_batch(&self, ops: Vec<WriteOp>) -> Result<()> {
    if ops.is_empty() {
      return Ok(());
    }
    let count = ops.len();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut upsert = tx.prepare_cached(UPSERT)?;
          let mut delete = tx.prepare_cached(DELETE)?;
          for op in &ops {
            match op {
              WriteOp::Set { key, value } => {
                upsert.execute(rusqlite::params![key, value])?;
              }
              WriteOp::Delete { key } => {
                delete.execute(rusqlite::params![key])?;
              }
            }
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    tracing::trace!(ops = count, "batch committed");
    Ok(())
  }
}

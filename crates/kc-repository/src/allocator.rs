//! [`IdAllocator`]: a pre-fetched buffer of identifiers, refilled in the
//! background from an [`IdSource`].
//!
//! Requests are served from the buffer. When a request leaves the buffer at
//! or below the low-water mark a refill is started; its batch replaces the
//! buffer contents when it lands. A request the buffer cannot satisfy waits
//! for the in-flight refill instead of returning a short slice, and fails
//! with [`Error::AllocationShortfall`] once `max_refill_attempts` refills
//! have not produced enough ids.

use std::{convert::Infallible, sync::Arc};

use kc_core::{Error, Id, IdSource, Result};
use serde::Deserialize;
use tokio::sync::{Mutex, Notify};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
  /// Size of each refill batch.
  pub capacity:            usize,
  /// Start a refill once the buffer holds this many ids or fewer.
  pub low_water:           usize,
  /// Refills a single request may trigger before giving up.
  pub max_refill_attempts: usize,
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self { capacity: 128, low_water: 32, max_refill_attempts: 3 }
  }
}

impl AllocatorConfig {
  pub fn validate(&self) -> Result<()> {
    if self.capacity == 0 {
      return Err(Error::validation("allocator capacity must be positive"));
    }
    if self.low_water >= self.capacity {
      return Err(Error::validation(
        "allocator low-water mark must be below its capacity",
      ));
    }
    if self.max_refill_attempts == 0 {
      return Err(Error::validation(
        "allocator must allow at least one refill attempt",
      ));
    }
    Ok(())
  }
}

// ─── Random source ───────────────────────────────────────────────────────────

/// Mints random v4 UUIDs locally. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdSource;

impl IdSource for RandomIdSource {
  type Error = Infallible;

  async fn request_ids(&self, quantity: usize) -> Result<Vec<Id>, Infallible> {
    Ok((0..quantity).map(|_| Id::random()).collect())
  }
}

// ─── Allocator ───────────────────────────────────────────────────────────────

struct Buffer {
  ids:       Vec<Id>,
  refilling: bool,
  /// Largest request currently waiting; sizes the next batch.
  demand:    usize,
}

struct Inner<S> {
  source:   S,
  config:   AllocatorConfig,
  buffer:   Mutex<Buffer>,
  refilled: Notify,
}

/// Buffered identifier allocator. Cloning is cheap and shares the buffer.
pub struct IdAllocator<S> {
  inner: Arc<Inner<S>>,
}

impl<S> Clone for IdAllocator<S> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<S: IdSource + 'static> IdAllocator<S> {
  /// Build an allocator over `source`.
  ///
  /// When called inside a Tokio runtime the first refill starts
  /// immediately; otherwise the first [`generate`](Self::generate) call
  /// starts it.
  pub fn new(source: S, config: AllocatorConfig) -> Result<Self> {
    config.validate()?;
    let prefetch = tokio::runtime::Handle::try_current().is_ok();
    let allocator = Self {
      inner: Arc::new(Inner {
        source,
        config,
        buffer: Mutex::new(Buffer { ids: Vec::new(), refilling: prefetch, demand: 0 }),
        refilled: Notify::new(),
      }),
    };
    if prefetch {
      allocator.spawn_refill(config.capacity);
    }
    Ok(allocator)
  }

  pub fn config(&self) -> AllocatorConfig { self.inner.config }

  /// Number of ids currently buffered.
  pub async fn buffered(&self) -> usize { self.inner.buffer.lock().await.ids.len() }

  /// Take exactly `quantity` ids from the buffer.
  ///
  /// Ids handed out by concurrent calls are always disjoint: the
  /// slice-and-shrink happens under the buffer lock.
  pub async fn generate(&self, quantity: usize) -> Result<Vec<Id>> {
    if quantity == 0 {
      return Err(Error::validation("must request at least one identifier"));
    }

    let mut attempts = 0;
    loop {
      let notified = self.inner.refilled.notified();
      tokio::pin!(notified);

      {
        let mut buffer = self.inner.buffer.lock().await;

        if buffer.ids.len() >= quantity {
          let ids: Vec<Id> = buffer.ids.drain(..quantity).collect();
          if buffer.ids.len() <= self.inner.config.low_water && !buffer.refilling {
            self.start_refill(&mut buffer);
          }
          return Ok(ids);
        }

        buffer.demand = buffer.demand.max(quantity);
        if !buffer.refilling {
          if attempts >= self.inner.config.max_refill_attempts {
            return Err(Error::AllocationShortfall {
              requested: quantity,
              available: buffer.ids.len(),
            });
          }
          attempts += 1;
          self.start_refill(&mut buffer);
        }

        // Register before releasing the lock so the wake-up cannot be missed.
        notified.as_mut().enable();
      }

      notified.await;
    }
  }

  fn start_refill(&self, buffer: &mut Buffer) {
    buffer.refilling = true;
    let batch = self.inner.config.capacity.max(buffer.demand);
    self.spawn_refill(batch);
  }

  fn spawn_refill(&self, batch: usize) {
    let inner = Arc::clone(&self.inner);
    tokio::spawn(async move { inner.refill(batch).await });
  }
}

impl<S: IdSource> Inner<S> {
  async fn refill(&self, batch: usize) {
    let result = self.source.request_ids(batch).await;

    let mut buffer = self.buffer.lock().await;
    buffer.refilling = false;
    match result {
      Ok(ids) => {
        tracing::debug!(requested = batch, received = ids.len(), "identifier buffer refilled");
        buffer.ids = ids;
        buffer.demand = 0;
      }
      Err(error) => {
        tracing::error!(%error, "identifier refill failed");
      }
    }
    drop(buffer);

    self.refilled.notify_waiters();
  }
}

#[cfg(test)]
mod tests {
  use std::{
    collections::HashSet,
    sync::atomic::{AtomicUsize, Ordering},
  };

  use super::*;

  /// Hands out `id-0`, `id-1`, … and counts batches.
  #[derive(Default)]
  struct CountingSource {
    next:    AtomicUsize,
    batches: AtomicUsize,
  }

  impl IdSource for CountingSource {
    type Error = Infallible;

    async fn request_ids(&self, quantity: usize) -> Result<Vec<Id>, Infallible> {
      self.batches.fetch_add(1, Ordering::SeqCst);
      let start = self.next.fetch_add(quantity, Ordering::SeqCst);
      Ok((start..start + quantity).map(|n| Id::new(format!("id-{n}"))).collect())
    }
  }

  #[derive(Debug)]
  struct SourceDown;

  impl std::fmt::Display for SourceDown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.write_str("identifier service unavailable")
    }
  }

  impl std::error::Error for SourceDown {}

  struct FailingSource;

  impl IdSource for FailingSource {
    type Error = SourceDown;

    async fn request_ids(&self, _quantity: usize) -> Result<Vec<Id>, SourceDown> {
      Err(SourceDown)
    }
  }

  fn small() -> AllocatorConfig {
    AllocatorConfig { capacity: 8, low_water: 4, max_refill_attempts: 3 }
  }

  #[tokio::test]
  async fn second_request_waits_for_refill() {
    let allocator = IdAllocator::new(CountingSource::default(), small()).unwrap();

    let first = allocator.generate(5).await.unwrap();
    assert_eq!(first.len(), 5);

    // Only 3 left: this call must wait for the refill, not return 3.
    let second = allocator.generate(5).await.unwrap();
    assert_eq!(second.len(), 5);

    let all: HashSet<_> = first.iter().chain(second.iter()).collect();
    assert_eq!(all.len(), 10);
  }

  #[tokio::test]
  async fn request_larger_than_capacity_is_served() {
    let allocator = IdAllocator::new(CountingSource::default(), small()).unwrap();
    let ids = allocator.generate(20).await.unwrap();
    assert_eq!(ids.len(), 20);
  }

  #[tokio::test]
  async fn concurrent_requests_are_disjoint() {
    let allocator = IdAllocator::new(CountingSource::default(), small()).unwrap();

    let mut handles = Vec::new();
    for n in 1..=12 {
      let allocator = allocator.clone();
      handles.push(tokio::spawn(async move { allocator.generate(n % 5 + 1).await }));
    }

    let mut seen = HashSet::new();
    let mut total = 0;
    for handle in handles {
      let ids = handle.await.unwrap().unwrap();
      total += ids.len();
      seen.extend(ids);
    }
    assert_eq!(seen.len(), total);
  }

  #[tokio::test]
  async fn failing_source_reports_shortfall() {
    let allocator = IdAllocator::new(FailingSource, small()).unwrap();
    let err = allocator.generate(1).await.unwrap_err();
    assert!(matches!(
      err,
      Error::AllocationShortfall { requested: 1, available: 0 }
    ));
  }

  #[tokio::test]
  async fn zero_quantity_is_rejected() {
    let allocator = IdAllocator::new(RandomIdSource, AllocatorConfig::default()).unwrap();
    assert!(matches!(allocator.generate(0).await, Err(Error::Validation(_))));
  }

  #[test]
  fn config_is_validated() {
    let bad = AllocatorConfig { capacity: 4, low_water: 4, max_refill_attempts: 1 };
    assert!(bad.validate().is_err());
    assert!(AllocatorConfig::default().validate().is_ok());
  }

  #[test]
  fn construction_outside_runtime_defers_refill() {
    let allocator = IdAllocator::new(CountingSource::default(), small()).unwrap();
    assert_eq!(allocator.inner.source.batches.load(Ordering::SeqCst), 0);
  }
}

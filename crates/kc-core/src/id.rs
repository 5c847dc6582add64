//! Identifiers and the external source that mints them.

use std::{fmt, future::Future, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Id ──────────────────────────────────────────────────────────────────────

/// An opaque, globally-unique identifier shared by projects and knowledge
/// sources. Equality is by wrapped value.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
  pub fn new(value: impl Into<String>) -> Self { Self(value.into()) }

  /// A fresh random (v4) identifier, hyphenated lowercase.
  pub fn random() -> Self { Self::from(Uuid::new_v4()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl fmt::Display for Id {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<Uuid> for Id {
  fn from(value: Uuid) -> Self { Self(value.hyphenated().to_string()) }
}

impl From<&str> for Id {
  fn from(value: &str) -> Self { Self(value.to_owned()) }
}

impl From<String> for Id {
  fn from(value: String) -> Self { Self(value) }
}

impl FromStr for Id {
  type Err = crate::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
      return Err(crate::Error::validation("identifier must not be empty"));
    }
    Ok(Self(trimmed.to_owned()))
  }
}

// ─── IdSource ────────────────────────────────────────────────────────────────

/// The external service that hands out batches of fresh identifiers.
///
/// Backs the repository's buffered allocator. Implementations must never
/// return the same identifier twice across calls.
pub trait IdSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Produce `quantity` fresh identifiers. A source may return fewer than
  /// requested; the allocator treats a short batch as what is available.
  fn request_ids(
    &self,
    quantity: usize,
  ) -> impl Future<Output = Result<Vec<Id>, Self::Error>> + Send + '_;
}

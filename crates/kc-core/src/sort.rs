//! Sort keys for a project's knowledge-source list.

use std::{cmp::Ordering, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, id::Id, source::KnowledgeSource};

/// The list orderings a user can cycle through. The position in
/// [`SortKey::ALL`] is the persisted index.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
  #[default]
  TitleAscending,
  TitleDescending,
  RecentlyModified,
  LeastRecentlyAccessed,
  RecentlyCreated,
}

impl SortKey {
  pub const ALL: [SortKey; 5] = [
    Self::TitleAscending,
    Self::TitleDescending,
    Self::RecentlyModified,
    Self::LeastRecentlyAccessed,
    Self::RecentlyCreated,
  ];

  pub fn index(self) -> usize {
    Self::ALL.iter().position(|k| *k == self).unwrap_or_default()
  }

  pub fn from_index(index: usize) -> Option<Self> { Self::ALL.get(index).copied() }

  /// Short code accepted on the command line.
  pub fn code(self) -> &'static str {
    match self {
      Self::TitleAscending => "az",
      Self::TitleDescending => "za",
      Self::RecentlyModified => "modified",
      Self::LeastRecentlyAccessed => "accessed",
      Self::RecentlyCreated => "created",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::TitleAscending => "A-Z",
      Self::TitleDescending => "Z-A",
      Self::RecentlyModified => "Changed (most recent first)",
      Self::LeastRecentlyAccessed => "Review (least recent first)",
      Self::RecentlyCreated => "Created (most recent first)",
    }
  }

  /// The next key in the cycle, wrapping around.
  pub fn next(self) -> Self {
    Self::ALL[(self.index() + 1) % Self::ALL.len()]
  }

  /// Compare two sources under this key. Ties fall back to a
  /// case-insensitive title comparison.
  ///
  /// Sources that were never modified or accessed use their creation time
  /// in place of the missing trail entry.
  pub fn compare(self, a: &KnowledgeSource, b: &KnowledgeSource) -> Ordering {
    let primary = match self {
      Self::TitleAscending => Ordering::Equal,
      Self::TitleDescending => folded(b).cmp(&folded(a)),
      Self::RecentlyModified => modified(b).cmp(&modified(a)),
      Self::LeastRecentlyAccessed => accessed(a).cmp(&accessed(b)),
      Self::RecentlyCreated => b.date_created.cmp(&a.date_created),
    };
    primary.then_with(|| folded(a).cmp(&folded(b)))
  }
}

impl fmt::Display for SortKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.pad(self.code())
  }
}

impl FromStr for SortKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim().to_lowercase();
    Self::ALL
      .into_iter()
      .find(|k| k.code() == wanted || serde_name(*k) == wanted)
      .ok_or_else(|| Error::validation(format!("unknown sort key: {s:?}")))
  }
}

fn serde_name(key: SortKey) -> String {
  serde_json::to_value(key)
    .ok()
    .and_then(|v| v.as_str().map(str::to_owned))
    .unwrap_or_default()
}

fn folded(ks: &KnowledgeSource) -> String { ks.title.to_lowercase() }

fn modified(ks: &KnowledgeSource) -> DateTime<Utc> {
  ks.last_modified().unwrap_or(ks.date_created)
}

fn accessed(ks: &KnowledgeSource) -> DateTime<Utc> {
  ks.last_accessed().unwrap_or(ks.date_created)
}

/// Stable sort of `sources` by `key`.
pub fn sort_sources(sources: &mut [KnowledgeSource], key: SortKey) {
  sources.sort_by(|a, b| key.compare(a, b));
}

/// Reorder `sources` by a manual ordering. Sources not listed in `order`
/// keep their relative order after the listed ones.
pub fn apply_custom_order(sources: &mut [KnowledgeSource], order: &[Id]) {
  sources.sort_by_key(|ks| {
    order.iter().position(|id| *id == ks.id).unwrap_or(usize::MAX)
  });
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;
  use crate::source::{IngestType, SourceReference};

  fn ks(id: &str, title: &str, created: i64) -> KnowledgeSource {
    let mut ks = KnowledgeSource::new(
      Id::new(id),
      title,
      IngestType::Note,
      SourceReference::None,
      "",
    );
    ks.date_created = Utc.timestamp_opt(created, 0).unwrap();
    ks
  }

  fn ids(sources: &[KnowledgeSource]) -> Vec<&str> {
    sources.iter().map(|k| k.id.as_str()).collect()
  }

  #[test]
  fn title_sorts_ignore_case() {
    let mut list = vec![ks("1", "banana", 0), ks("2", "Apple", 0), ks("3", "cherry", 0)];
    sort_sources(&mut list, SortKey::TitleAscending);
    assert_eq!(ids(&list), vec!["2", "1", "3"]);
    sort_sources(&mut list, SortKey::TitleDescending);
    assert_eq!(ids(&list), vec!["3", "1", "2"]);
  }

  #[test]
  fn recently_modified_first_with_title_tiebreak() {
    let t = Utc.timestamp_opt(1_000, 0).unwrap();
    let mut a = ks("a", "Beta", 0);
    let mut b = ks("b", "alpha", 0);
    let mut c = ks("c", "gamma", 0);
    a.record_modification(t);
    b.record_modification(t);
    c.record_modification(t - Duration::seconds(10));
    let mut list = vec![c, a, b];
    sort_sources(&mut list, SortKey::RecentlyModified);
    assert_eq!(ids(&list), vec!["b", "a", "c"]);
  }

  #[test]
  fn least_recently_accessed_first() {
    let mut a = ks("a", "a", 0);
    let b = ks("b", "b", 50);
    a.record_access(Utc.timestamp_opt(100, 0).unwrap());
    let mut list = vec![a, b];
    sort_sources(&mut list, SortKey::LeastRecentlyAccessed);
    assert_eq!(ids(&list), vec!["b", "a"]);
  }

  #[test]
  fn recently_created_first() {
    let mut list = vec![ks("old", "x", 1), ks("new", "y", 2)];
    sort_sources(&mut list, SortKey::RecentlyCreated);
    assert_eq!(ids(&list), vec!["new", "old"]);
  }

  #[test]
  fn index_round_trips_and_cycles() {
    for key in SortKey::ALL {
      assert_eq!(SortKey::from_index(key.index()), Some(key));
    }
    assert_eq!(SortKey::from_index(5), None);
    assert_eq!(SortKey::RecentlyCreated.next(), SortKey::TitleAscending);
  }

  #[test]
  fn parses_codes_and_names() {
    assert_eq!("za".parse::<SortKey>().unwrap(), SortKey::TitleDescending);
    assert_eq!(
      "least_recently_accessed".parse::<SortKey>().unwrap(),
      SortKey::LeastRecentlyAccessed
    );
    assert!("rating".parse::<SortKey>().is_err());
  }

  #[test]
  fn custom_order_puts_unlisted_last() {
    let mut list = vec![ks("a", "a", 0), ks("b", "b", 0), ks("c", "c", 0)];
    apply_custom_order(&mut list, &[Id::new("c"), Id::new("a")]);
    assert_eq!(ids(&list), vec!["c", "a", "b"]);
  }
}

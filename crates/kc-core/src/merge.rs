//! Merge semantics for knowledge-source lists and partial project updates.
//!
//! These functions mutate a [`Project`] value in place and report what they
//! did; persisting the result (and logging the skipped items) is the
//! repository's job.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result,
  id::Id,
  project::{Project, ProjectUpdate},
  source::KnowledgeSource,
};

/// What a list operation applied and what it skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Merged {
  pub applied: Vec<Id>,
  pub skipped: Vec<Id>,
}

impl Merged {
  pub fn is_noop(&self) -> bool { self.applied.is_empty() }
}

// ─── List operations ─────────────────────────────────────────────────────────

/// Append `sources` to the project's list and take ownership of them.
///
/// A source whose id is already present is skipped, so the list never holds
/// two entries with the same id.
pub fn add_sources(project: &mut Project, sources: Vec<KnowledgeSource>) -> Merged {
  let mut merged = Merged::default();
  for mut ks in sources {
    if project.source(&ks.id).is_some() {
      merged.skipped.push(ks.id);
      continue;
    }
    ks.associated_project_id = Some(project.id.clone());
    merged.applied.push(ks.id.clone());
    project.knowledge_sources.push(ks);
  }
  merged
}

/// Remove every source whose id appears in `ids`. Ids that are not present
/// are reported as skipped.
pub fn remove_sources(project: &mut Project, ids: &[Id]) -> Merged {
  let mut merged = Merged::default();
  for id in ids {
    let before = project.knowledge_sources.len();
    project.knowledge_sources.retain(|ks| ks.id != *id);
    if project.knowledge_sources.len() < before {
      merged.applied.push(id.clone());
    } else {
      merged.skipped.push(id.clone());
    }
  }
  merged
}

/// Replace existing entries wholesale, matched by id. Items with no match
/// are skipped, never inserted.
///
/// Each replacement is stamped with a modification at `now` on top of
/// whatever trail the caller supplied.
pub fn update_sources(
  project: &mut Project,
  sources: Vec<KnowledgeSource>,
  now: DateTime<Utc>,
) -> Merged {
  let mut merged = Merged::default();
  for mut ks in sources {
    match project.knowledge_sources.iter().position(|k| k.id == ks.id) {
      Some(idx) => {
        ks.associated_project_id = Some(project.id.clone());
        ks.record_modification(now);
        merged.applied.push(ks.id.clone());
        project.knowledge_sources[idx] = ks;
      }
      None => merged.skipped.push(ks.id),
    }
  }
  merged
}

/// Move a source from `from` to `to`: remove followed by add.
///
/// Fails with [`Error::SourceNotFound`] if `from` does not hold the source.
/// If `to` already holds an entry with the same id it is kept as is, so the
/// destination ends up with exactly one entry either way.
pub fn move_source(
  from: &mut Project,
  to: &mut Project,
  source_id: &Id,
) -> Result<KnowledgeSource> {
  let idx = from
    .knowledge_sources
    .iter()
    .position(|ks| ks.id == *source_id)
    .ok_or_else(|| Error::SourceNotFound {
      project_id: from.id.clone(),
      source_id:  source_id.clone(),
    })?;
  let ks = from.knowledge_sources.remove(idx);
  add_sources(to, vec![ks]);
  to.source(source_id).cloned().ok_or_else(|| Error::SourceNotFound {
    project_id: to.id.clone(),
    source_id:  source_id.clone(),
  })
}

// ─── Partial update ──────────────────────────────────────────────────────────

/// Outcome of [`apply_update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
  /// Whether any persisted field of the project changed.
  pub changed:            bool,
  pub duplicate_sources:  Vec<Id>,
  pub missing_removals:   Vec<Id>,
  pub unmatched_updates:  Vec<Id>,
}

/// Apply the fields present in `update` to `project`.
///
/// Order: name and scalar fields, then source removal, addition and
/// replacement, then topics (a non-empty overwrite wins; otherwise add then
/// remove). Only if something changed is `date_modified` bumped to `now`
/// and the update appended to the project's calendar.
pub fn apply_update(
  project: &mut Project,
  update: ProjectUpdate,
  now: DateTime<Utc>,
) -> Result<UpdateOutcome> {
  let mut outcome = UpdateOutcome::default();
  let record = update.clone();

  if let Some(name) = update.name {
    let name = name.trim();
    if name.is_empty() {
      return Err(Error::validation("project name must not be empty"));
    }
    if name != project.name {
      project.name = name.to_owned();
      outcome.changed = true;
    }
  }

  if let Some(description) = update.description
    && description != project.description
  {
    project.description = description;
    outcome.changed = true;
  }

  if let Some(expanded) = update.expanded
    && expanded != project.expanded
  {
    project.expanded = expanded;
    outcome.changed = true;
  }

  if let Some(range) = update.calendar {
    range.validate()?;
    if project.calendar.range() != range {
      project.calendar.set_range(range);
      outcome.changed = true;
    }
  }

  if let Some(authors) = update.authors
    && authors != project.authors
  {
    project.authors = authors;
    outcome.changed = true;
  }

  let removed = remove_sources(project, &update.remove_knowledge_source);
  outcome.changed |= !removed.is_noop();
  outcome.missing_removals = removed.skipped;

  let added = add_sources(project, update.add_knowledge_source);
  outcome.changed |= !added.is_noop();
  outcome.duplicate_sources = added.skipped;

  let updated = update_sources(project, update.update_knowledge_source, now);
  outcome.changed |= !updated.is_noop();
  outcome.unmatched_updates = updated.skipped;

  let topics_before = project.topics.clone();
  if let Some(topics) = update.over_write_topics.filter(|t| !t.is_empty()) {
    project.topics = topics.into_iter().collect();
  } else {
    project.topics.extend(update.add_topic);
    for topic in &update.remove_topic {
      project.topics.remove(topic);
    }
  }
  outcome.changed |= project.topics != topics_before;

  if outcome.changed {
    project.date_modified = now;
    project.calendar.record(record, now);
  }
  Ok(outcome)
}

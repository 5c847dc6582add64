//! Projects: named hierarchical containers for sub-projects and sources.
//!
//! The hierarchy is stored flat: every project names its parent and lists
//! its children. The repository keeps both directions in sync; the tree view
//! is materialised on demand (see [`crate::tree`]).

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, id::Id, source::KnowledgeSource};

// ─── Classification ──────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
  #[default]
  Default,
  School,
  Work,
  Hobby,
  Research,
}

/// An inclusive date range. Either end may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
  pub start: Option<NaiveDate>,
  pub end:   Option<NaiveDate>,
}

impl DateRange {
  pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
    Self { start: Some(start), end: Some(end) }
  }

  pub fn validate(&self) -> Result<()> {
    if let (Some(start), Some(end)) = (self.start, self.end)
      && start > end
    {
      return Err(Error::validation(format!(
        "calendar start {start} is after end {end}"
      )));
    }
    Ok(())
  }
}

/// One applied update, as recorded in a project's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEvent {
  pub event:     ProjectUpdate,
  pub timestamp: DateTime<Utc>,
}

/// A project's date range plus its activity log. Every update that changes
/// the project appends one [`ProjectEvent`]; entries are never rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectCalendar {
  pub start:  Option<NaiveDate>,
  pub end:    Option<NaiveDate>,
  pub events: Vec<ProjectEvent>,
}

impl ProjectCalendar {
  pub fn range(&self) -> DateRange {
    DateRange { start: self.start, end: self.end }
  }

  pub fn set_range(&mut self, range: DateRange) {
    self.start = range.start;
    self.end = range.end;
  }

  pub fn record(&mut self, event: ProjectUpdate, timestamp: DateTime<Utc>) {
    self.events.push(ProjectEvent { event, timestamp });
  }

  pub fn last_event(&self) -> Option<&ProjectEvent> { self.events.last() }
}

// ─── Project ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub id:                Id,
  pub name:              String,
  #[serde(default)]
  pub description:       String,
  #[serde(default)]
  pub project_type:      ProjectType,
  #[serde(default)]
  pub authors:           Vec<String>,
  /// `None` for a root project.
  #[serde(default)]
  pub parent_id:         Option<Id>,
  #[serde(default)]
  pub subproject_ids:    Vec<Id>,
  #[serde(default)]
  pub knowledge_sources: Vec<KnowledgeSource>,
  #[serde(default)]
  pub topics:            BTreeSet<String>,
  pub date_created:      DateTime<Utc>,
  pub date_modified:     DateTime<Utc>,
  pub date_accessed:     DateTime<Utc>,
  /// Tree-view state, persisted for convenience.
  #[serde(default)]
  pub expanded:          bool,
  #[serde(default)]
  pub calendar:          ProjectCalendar,
}

impl Project {
  /// A fresh project with every timestamp set to `now`.
  pub fn new(id: Id, name: impl Into<String>, now: DateTime<Utc>) -> Self {
    Self {
      id,
      name: name.into(),
      description: String::new(),
      project_type: ProjectType::default(),
      authors: Vec::new(),
      parent_id: None,
      subproject_ids: Vec::new(),
      knowledge_sources: Vec::new(),
      topics: BTreeSet::new(),
      date_created: now,
      date_modified: now,
      date_accessed: now,
      expanded: false,
      calendar: ProjectCalendar::default(),
    }
  }

  pub fn is_root(&self) -> bool { self.parent_id.is_none() }

  pub fn source(&self, id: &Id) -> Option<&KnowledgeSource> {
    self.knowledge_sources.iter().find(|ks| ks.id == *id)
  }

  pub fn source_mut(&mut self, id: &Id) -> Option<&mut KnowledgeSource> {
    self.knowledge_sources.iter_mut().find(|ks| ks.id == *id)
  }

  pub fn identifier(&self) -> ProjectIdentifier {
    ProjectIdentifier { id: self.id.clone(), name: self.name.clone() }
  }
}

/// The `(id, name)` pair used by breadcrumbs and sub-tree listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIdentifier {
  pub id:   Id,
  pub name: String,
}

// ─── NewProject ──────────────────────────────────────────────────────────────

/// Input to project creation. The id and timestamps are always assigned by
/// the repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewProject {
  pub name:              String,
  pub parent_id:         Option<Id>,
  pub description:       String,
  pub project_type:      ProjectType,
  pub authors:           Vec<String>,
  pub topics:            Vec<String>,
  pub knowledge_sources: Vec<KnowledgeSource>,
  pub calendar:          Option<DateRange>,
  /// Children created in the same call. Only one level is supported.
  pub sub_projects:      Vec<NewProject>,
}

impl NewProject {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), ..Default::default() }
  }

  pub fn with_parent(mut self, parent_id: Id) -> Self {
    self.parent_id = Some(parent_id);
    self
  }

  pub fn with_sub_project(mut self, sub: NewProject) -> Self {
    self.sub_projects.push(sub);
    self
  }

  pub fn validate(&self) -> Result<()> {
    if self.name.trim().is_empty() {
      return Err(Error::validation("project name must not be empty"));
    }
    if let Some(calendar) = &self.calendar {
      calendar.validate()?;
    }
    for sub in &self.sub_projects {
      if !sub.sub_projects.is_empty() {
        return Err(Error::validation(
          "nested sub-project requests are not supported",
        ));
      }
      if sub.parent_id.is_some() {
        return Err(Error::validation(
          "sub-project requests must not name their own parent",
        ));
      }
      sub.validate()?;
    }
    Ok(())
  }

  /// Materialise this request as a project with the given id.
  pub fn into_project(
    self,
    id: Id,
    parent_id: Option<Id>,
    now: DateTime<Utc>,
  ) -> Project {
    let mut project = Project::new(id, self.name.trim(), now);
    project.parent_id = parent_id;
    project.description = self.description;
    project.project_type = self.project_type;
    project.authors = self.authors;
    project.topics = self.topics.into_iter().collect();
    if let Some(range) = self.calendar {
      project.calendar.set_range(range);
    }
    project.knowledge_sources = self.knowledge_sources;
    for ks in &mut project.knowledge_sources {
      ks.associated_project_id = Some(project.id.clone());
    }
    project
  }
}

// ─── ProjectUpdate ───────────────────────────────────────────────────────────

/// A partial update. Absent fields are left untouched; an update carrying
/// only the id changes nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectUpdate {
  pub id:                      Option<Id>,
  pub name:                    Option<String>,
  pub description:             Option<String>,
  pub expanded:                Option<bool>,
  pub calendar:                Option<DateRange>,
  pub authors:                 Option<Vec<String>>,
  pub add_knowledge_source:    Vec<KnowledgeSource>,
  /// Ids of sources to drop from the project's list.
  pub remove_knowledge_source: Vec<Id>,
  pub update_knowledge_source: Vec<KnowledgeSource>,
  pub add_topic:               Vec<String>,
  pub remove_topic:            Vec<String>,
  /// When present and non-empty, replaces the topic set and
  /// `add_topic`/`remove_topic` are ignored. An empty list counts as absent.
  pub over_write_topics:       Option<Vec<String>>,
}

impl ProjectUpdate {
  pub fn new(id: Id) -> Self { Self { id: Some(id), ..Default::default() } }

  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn add_sources(mut self, sources: Vec<KnowledgeSource>) -> Self {
    self.add_knowledge_source.extend(sources);
    self
  }

  pub fn remove_sources(mut self, ids: Vec<Id>) -> Self {
    self.remove_knowledge_source.extend(ids);
    self
  }

  pub fn update_sources(mut self, sources: Vec<KnowledgeSource>) -> Self {
    self.update_knowledge_source.extend(sources);
    self
  }
}

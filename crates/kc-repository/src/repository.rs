//! [`ProjectRepository`]: the single owner of the in-memory project
//! collection.
//!
//! Every operation runs under one async mutex, held across the store write,
//! so multi-step mutations (allocate ids, touch the parent, persist) appear
//! atomic to concurrent callers. A mutation is computed on a working copy of
//! the state, written to the store as one batch, and only committed to memory
//! once the batch succeeds. Snapshots handed out are owned clones.

use std::collections::HashSet;

use chrono::Utc;
use kc_core::{
  Error, Id, IdSource, Result,
  merge::{self, UpdateOutcome},
  project::{NewProject, Project, ProjectIdentifier, ProjectUpdate},
  sort::{self, SortKey},
  source::{KnowledgeSource, SourceEnrichment},
  store::{KvStore, WriteOp, keys},
  tree::{self, FlatNode, TreeNode},
};
use tokio::sync::Mutex;

use crate::{
  allocator::IdAllocator,
  bus::{CurrentReceiver, SelectionBus, TreeReceiver},
};

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct State {
  projects: Vec<Project>,
  current:  Option<Id>,
  sort_key: SortKey,
}

impl State {
  fn get(&self, id: &Id) -> Option<&Project> {
    self.projects.iter().find(|p| p.id == *id)
  }

  fn get_mut(&mut self, id: &Id) -> Option<&mut Project> {
    self.projects.iter_mut().find(|p| p.id == *id)
  }

  fn require(&self, id: &Id) -> Result<&Project> {
    self.get(id).ok_or_else(|| Error::ProjectNotFound(id.clone()))
  }

  fn require_mut(&mut self, id: &Id) -> Result<&mut Project> {
    self.get_mut(id).ok_or_else(|| Error::ProjectNotFound(id.clone()))
  }

  fn position(&self, id: &Id) -> Result<usize> {
    self
      .projects
      .iter()
      .position(|p| p.id == *id)
      .ok_or_else(|| Error::ProjectNotFound(id.clone()))
  }

  fn first_id(&self) -> Option<Id> { self.projects.first().map(|p| p.id.clone()) }

  fn current_project(&self) -> Option<&Project> {
    self.current.as_ref().and_then(|id| self.get(id))
  }

  /// Children listed in `subproject_ids` first, then any project naming
  /// `id` as its parent that the list is missing.
  fn children_of<'a>(&'a self, id: &Id) -> Vec<&'a Id> {
    let mut children: Vec<&Id> = self
      .get(id)
      .map(|p| {
        p.subproject_ids.iter().filter(|c| self.get(c).is_some()).collect()
      })
      .unwrap_or_default();
    for project in &self.projects {
      if project.parent_id.as_ref() == Some(id) && !children.contains(&&project.id) {
        children.push(&project.id);
      }
    }
    children
  }

  /// `id` and all of its descendants, pre-order. Fails closed on a cycle.
  fn subtree(&self, id: &Id) -> Result<Vec<Id>> {
    self.require(id)?;
    let mut order = Vec::new();
    self.visit(id, &mut Vec::new(), &mut HashSet::new(), &mut order)?;
    Ok(order)
  }

  fn visit<'a>(
    &'a self,
    id: &'a Id,
    path: &mut Vec<&'a Id>,
    seen: &mut HashSet<&'a Id>,
    order: &mut Vec<Id>,
  ) -> Result<()> {
    if path.contains(&id) {
      return Err(Error::CycleDetected(id.clone()));
    }
    if !seen.insert(id) {
      return Ok(());
    }
    order.push(id.clone());
    path.push(id);
    for child in self.children_of(id) {
      self.visit(child, path, seen, order)?;
    }
    path.pop();
    Ok(())
  }

  /// Root-to-self chain. A parent id pointing at a missing project ends the
  /// walk, matching how the tree surfaces orphans as roots.
  fn ancestors(&self, id: &Id) -> Result<Vec<&Project>> {
    let mut cursor = self.require(id)?;
    let mut chain = vec![cursor];
    let mut seen: HashSet<&Id> = HashSet::from([&cursor.id]);
    while let Some(parent_id) = &cursor.parent_id {
      let Some(parent) = self.get(parent_id) else {
        tracing::debug!(project = %cursor.id, parent = %parent_id, "parent missing; treating as root");
        break;
      };
      if !seen.insert(&parent.id) {
        return Err(Error::CycleDetected(parent.id.clone()));
      }
      chain.push(parent);
      cursor = parent;
    }
    chain.reverse();
    Ok(chain)
  }

  fn source(&self, project_id: &Id, source_id: &Id) -> Result<&KnowledgeSource> {
    self
      .require(project_id)?
      .source(source_id)
      .ok_or_else(|| source_not_found(project_id, source_id))
  }
}

fn source_not_found(project_id: &Id, source_id: &Id) -> Error {
  Error::SourceNotFound {
    project_id: project_id.clone(),
    source_id:  source_id.clone(),
  }
}

fn publish(bus: &SelectionBus, state: &State) {
  bus.publish(tree::build_tree(&state.projects), state.current_project().cloned());
}

// ─── Encoding ────────────────────────────────────────────────────────────────

fn record_op(project: &Project) -> Result<WriteOp> {
  Ok(WriteOp::set(keys::project(&project.id), serde_json::to_vec(project)?))
}

fn index_op(projects: &[Project]) -> Result<WriteOp> {
  let ids: Vec<&Id> = projects.iter().map(|p| &p.id).collect();
  Ok(WriteOp::set(keys::PROJECT_INDEX, serde_json::to_vec(&ids)?))
}

fn current_op(current: Option<&Id>) -> WriteOp {
  let raw = current.map(Id::as_str).unwrap_or_default();
  WriteOp::set(keys::CURRENT_PROJECT, raw.as_bytes().to_vec())
}

/// Read the index, then every record it lists. Missing or malformed records
/// are skipped; a malformed index is an error so a later write cannot
/// clobber the records it still references.
async fn read_projects<S: KvStore>(store: &S) -> Result<Vec<Project>> {
  let Some(raw) = store.get(keys::PROJECT_INDEX).await.map_err(Error::persistence)? else {
    return Ok(Vec::new());
  };
  let index: Vec<Id> = serde_json::from_slice(&raw)?;

  let mut seen = HashSet::new();
  let mut projects = Vec::with_capacity(index.len());
  for id in index {
    if !seen.insert(id.clone()) {
      tracing::warn!(%id, "duplicate id in project index; skipping");
      continue;
    }
    let key = keys::project(&id);
    let Some(raw) = store.get(&key).await.map_err(Error::persistence)? else {
      tracing::warn!(%id, "project record missing; skipping");
      continue;
    };
    match serde_json::from_slice::<Project>(&raw) {
      Ok(mut project) if project.id == id => {
        for ks in &mut project.knowledge_sources {
          ks.associated_project_id = Some(project.id.clone());
        }
        projects.push(project);
      }
      Ok(project) => {
        tracing::warn!(%id, found = %project.id, "project record id mismatch; skipping");
      }
      Err(error) => {
        tracing::warn!(%id, %error, "malformed project record; skipping");
      }
    }
  }
  Ok(projects)
}

async fn read_current<S: KvStore>(store: &S) -> Result<Option<Id>> {
  let raw = store.get(keys::CURRENT_PROJECT).await.map_err(Error::persistence)?;
  Ok(raw.and_then(|bytes| {
    let id = String::from_utf8_lossy(&bytes).trim().to_owned();
    (!id.is_empty()).then(|| Id::new(id))
  }))
}

async fn read_sort_key<S: KvStore>(store: &S) -> Result<SortKey> {
  let Some(raw) = store.get(keys::SORT_INDEX).await.map_err(Error::persistence)? else {
    return Ok(SortKey::default());
  };
  let text = String::from_utf8_lossy(&raw);
  match text.trim().parse::<usize>().ok().and_then(SortKey::from_index) {
    Some(key) => Ok(key),
    None => {
      tracing::warn!(value = %text, "unrecognised sort index; using default");
      Ok(SortKey::default())
    }
  }
}

fn log_outcome(id: &Id, outcome: &UpdateOutcome) {
  for source in &outcome.duplicate_sources {
    tracing::warn!(project = %id, %source, "knowledge source already present; not added");
  }
  for source in &outcome.missing_removals {
    tracing::debug!(project = %id, %source, "knowledge source to remove was not present");
  }
  for source in &outcome.unmatched_updates {
    tracing::warn!(project = %id, %source, "no knowledge source to update; skipped");
  }
}

/// Two distinct elements of `projects` borrowed mutably at once.
fn pair_mut(projects: &mut [Project], a: usize, b: usize) -> (&mut Project, &mut Project) {
  if a < b {
    let (left, right) = projects.split_at_mut(b);
    (&mut left[a], &mut right[0])
  } else {
    let (left, right) = projects.split_at_mut(a);
    (&mut right[0], &mut left[b])
  }
}

// ─── Repository ──────────────────────────────────────────────────────────────

pub struct ProjectRepository<S, I> {
  store: S,
  ids:   IdAllocator<I>,
  state: Mutex<State>,
  bus:   SelectionBus,
}

impl<S: KvStore, I: IdSource + 'static> ProjectRepository<S, I> {
  /// Load every project from `store`, restore the persisted selection and
  /// sort preference, and publish the initial snapshots.
  ///
  /// A saved selection that no longer exists falls back to the first
  /// project, or to none when the store is empty.
  pub async fn open(store: S, ids: IdAllocator<I>) -> Result<Self> {
    let projects = read_projects(&store).await?;
    let saved = read_current(&store).await?;
    let sort_key = read_sort_key(&store).await?;

    let mut state = State { projects, current: None, sort_key };
    let current = saved.filter(|id| state.get(id).is_some()).or_else(|| state.first_id());
    state.current = current;

    let bus = SelectionBus::new();
    publish(&bus, &state);
    tracing::debug!(projects = state.projects.len(), current = ?state.current, "repository opened");

    Ok(Self { store, ids, state: Mutex::new(state), bus })
  }

  pub fn ids(&self) -> &IdAllocator<I> { &self.ids }

  async fn commit(&self, state: &mut State, next: State, ops: Vec<WriteOp>) -> Result<()> {
    if !ops.is_empty() {
      self.store.write_batch(ops).await.map_err(Error::persistence)?;
    }
    *state = next;
    publish(&self.bus, state);
    Ok(())
  }

  // ── Loading ────────────────────────────────────────────────────────────────

  /// Re-read the whole collection and the sort preference from the store,
  /// replacing the in-memory copy. The state lock is held across the reads,
  /// so no mutation can commit in between and be lost.
  pub async fn load_all(&self) -> Result<Vec<Project>> {
    let mut state = self.state.lock().await;
    let projects = read_projects(&self.store).await?;
    let sort_key = read_sort_key(&self.store).await?;

    state.projects = projects;
    state.sort_key = sort_key;
    if state.current_project().is_none() {
      state.current = state.first_id();
    }
    publish(&self.bus, &state);
    tracing::debug!(projects = state.projects.len(), "projects reloaded");
    Ok(state.projects.clone())
  }

  // ── Queries ────────────────────────────────────────────────────────────────

  pub async fn projects(&self) -> Vec<Project> { self.state.lock().await.projects.clone() }

  pub async fn get_project(&self, id: &Id) -> Option<Project> {
    self.state.lock().await.get(id).cloned()
  }

  /// The chain from the root down to `id`, inclusive.
  pub async fn get_ancestors(&self, id: &Id) -> Result<Vec<Project>> {
    let state = self.state.lock().await;
    Ok(state.ancestors(id)?.into_iter().cloned().collect())
  }

  /// `id` and all of its descendants as `(id, name)` pairs, pre-order.
  pub async fn subtree(&self, id: &Id) -> Result<Vec<ProjectIdentifier>> {
    let state = self.state.lock().await;
    let ids = state.subtree(id)?;
    Ok(ids.iter().filter_map(|id| state.get(id)).map(Project::identifier).collect())
  }

  pub async fn current(&self) -> Option<Project> {
    self.state.lock().await.current_project().cloned()
  }

  pub async fn tree(&self) -> Vec<TreeNode> {
    tree::build_tree(&self.state.lock().await.projects)
  }

  pub async fn flat_tree(&self) -> Vec<FlatNode> { tree::flatten(&self.tree().await) }

  pub fn subscribe_tree(&self) -> TreeReceiver { self.bus.subscribe_tree() }

  pub fn subscribe_current(&self) -> CurrentReceiver { self.bus.subscribe_current() }

  // ── Mutations ──────────────────────────────────────────────────────────────

  /// Create a project, and optionally one level of sub-projects, in a single
  /// batch. The new project becomes the current selection.
  pub async fn create(&self, mut request: NewProject) -> Result<Project> {
    request.validate()?;
    let mut state = self.state.lock().await;
    if let Some(parent_id) = &request.parent_id {
      state.require(parent_id)?;
    }

    let subs = std::mem::take(&mut request.sub_projects);
    let requested = 1 + subs.len();
    let ids = self.ids.generate(requested).await?;
    let Some((id, sub_ids)) = ids.split_first() else {
      return Err(Error::AllocationShortfall { requested, available: 0 });
    };

    let now = Utc::now();
    let parent_id = request.parent_id.clone();
    let mut project = request.into_project(id.clone(), parent_id.clone(), now);
    let children: Vec<Project> = subs
      .into_iter()
      .zip(sub_ids)
      .map(|(sub, sub_id)| sub.into_project(sub_id.clone(), Some(id.clone()), now))
      .collect();
    project.subproject_ids = children.iter().map(|c| c.id.clone()).collect();

    let mut next = state.clone();
    let mut ops = vec![record_op(&project)?];
    for child in &children {
      ops.push(record_op(child)?);
    }
    if let Some(parent_id) = &parent_id {
      let parent = next.require_mut(parent_id)?;
      parent.subproject_ids.push(id.clone());
      parent.date_modified = now;
      ops.push(record_op(parent)?);
    }
    next.projects.push(project.clone());
    next.projects.extend(children);
    next.current = Some(id.clone());
    ops.push(index_op(&next.projects)?);
    ops.push(current_op(next.current.as_ref()));

    self.commit(&mut state, next, ops).await?;
    tracing::debug!(%id, name = %project.name, parent = ?parent_id, "project created");
    Ok(project)
  }

  /// Apply a partial update and re-select the project.
  ///
  /// The record is only rewritten, and `date_modified` only bumped, when a
  /// field actually changed; an update carrying just the id is idempotent.
  pub async fn update(&self, update: ProjectUpdate) -> Result<Project> {
    let mut updated = self.update_many(vec![update]).await?;
    updated
      .pop()
      .ok_or_else(|| Error::validation("update requires a project id"))
  }

  /// Apply a batch of partial updates in order and persist them as one
  /// store batch. Any missing or invalid update fails the whole batch and
  /// leaves both the store and memory untouched.
  ///
  /// Returns each target's final state, in request order. The last target
  /// becomes the current selection.
  pub async fn update_many(&self, updates: Vec<ProjectUpdate>) -> Result<Vec<Project>> {
    if updates.is_empty() {
      return Ok(Vec::new());
    }

    let mut state = self.state.lock().await;
    let mut next = state.clone();
    let now = Utc::now();
    let mut targets = Vec::with_capacity(updates.len());
    let mut changed: Vec<Id> = Vec::new();

    for update in updates {
      let id = update
        .id
        .clone()
        .ok_or_else(|| Error::validation("update requires a project id"))?;
      let project = next.require_mut(&id)?;
      let outcome = merge::apply_update(project, update, now)?;
      log_outcome(&id, &outcome);
      if outcome.changed && !changed.contains(&id) {
        changed.push(id.clone());
      }
      targets.push(id);
    }

    let mut ops = Vec::with_capacity(changed.len() + 1);
    for id in &changed {
      ops.push(record_op(next.require(id)?)?);
    }
    let last = targets.last().cloned();
    if last.is_some() && next.current != last {
      next.current = last;
      ops.push(current_op(next.current.as_ref()));
    }
    let updated = targets
      .iter()
      .filter_map(|id| next.get(id).cloned())
      .collect::<Vec<_>>();

    self.commit(&mut state, next, ops).await?;
    tracing::debug!(updates = targets.len(), changed = changed.len(), "projects updated");
    Ok(updated)
  }

  /// Delete `id` and every descendant. Returns the deleted ids in pre-order.
  ///
  /// The id is dropped from every surviving `subproject_ids` list. If the
  /// selection was inside the deleted subtree it falls back to the first
  /// remaining project.
  pub async fn delete(&self, id: &Id) -> Result<Vec<Id>> {
    let mut state = self.state.lock().await;
    let doomed = state.subtree(id)?;
    let gone: HashSet<&Id> = doomed.iter().collect();

    let now = Utc::now();
    let mut next = state.clone();
    let mut ops = Vec::new();

    next.projects.retain(|p| !gone.contains(&p.id));
    for project in &mut next.projects {
      let before = project.subproject_ids.len();
      project.subproject_ids.retain(|c| !gone.contains(c));
      if project.subproject_ids.len() != before {
        project.date_modified = now;
        ops.push(record_op(project)?);
      }
    }
    for gone_id in &doomed {
      ops.push(WriteOp::delete(keys::project(gone_id)));
      ops.push(WriteOp::delete(keys::custom_sort(gone_id)));
    }
    ops.push(index_op(&next.projects)?);
    if next.current.as_ref().is_some_and(|c| gone.contains(c)) {
      next.current = next.first_id();
      ops.push(current_op(next.current.as_ref()));
    }

    self.commit(&mut state, next, ops).await?;
    tracing::debug!(%id, deleted = doomed.len(), "project subtree deleted");
    Ok(doomed)
  }

  /// Select `id`, or the first project when `None`, stamping its
  /// `date_accessed`. Returns the new selection.
  pub async fn set_current(&self, id: Option<&Id>) -> Result<Option<Project>> {
    let mut state = self.state.lock().await;
    let target = match id {
      Some(id) => Some(state.require(id)?.id.clone()),
      None => state.first_id(),
    };

    let mut next = state.clone();
    let mut ops = vec![current_op(target.as_ref())];
    let selected = match &target {
      Some(target) => {
        let project = next.require_mut(target)?;
        project.date_accessed = Utc::now();
        ops.push(record_op(project)?);
        Some(project.clone())
      }
      None => None,
    };
    next.current = target;

    self.commit(&mut state, next, ops).await?;
    Ok(selected)
  }

  /// Move `id` under `new_parent`, or to the root when `None`.
  pub async fn reparent(&self, id: &Id, new_parent: Option<&Id>) -> Result<Project> {
    let mut state = self.state.lock().await;
    let old_parent = state.require(id)?.parent_id.clone();

    if let Some(parent_id) = new_parent
      && state.ancestors(parent_id)?.iter().any(|p| p.id == *id)
    {
      return Err(Error::CycleDetected(id.clone()));
    }
    if old_parent.as_ref() == new_parent {
      return state.require(id).cloned();
    }

    let now = Utc::now();
    let mut next = state.clone();
    let mut ops = Vec::new();

    if let Some(old) = &old_parent
      && let Some(parent) = next.get_mut(old)
    {
      parent.subproject_ids.retain(|c| c != id);
      parent.date_modified = now;
      ops.push(record_op(parent)?);
    }
    if let Some(new) = new_parent {
      let parent = next.require_mut(new)?;
      if !parent.subproject_ids.contains(id) {
        parent.subproject_ids.push(id.clone());
      }
      parent.date_modified = now;
      ops.push(record_op(parent)?);
    }
    let project = next.require_mut(id)?;
    project.parent_id = new_parent.cloned();
    project.date_modified = now;
    ops.push(record_op(project)?);
    let moved = project.clone();

    self.commit(&mut state, next, ops).await?;
    tracing::debug!(%id, from = ?old_parent, to = ?new_parent, "project reparented");
    Ok(moved)
  }

  /// Expand or collapse every project in the tree.
  pub async fn set_all_expanded(&self, expanded: bool) -> Result<()> {
    let mut state = self.state.lock().await;
    let mut next = state.clone();
    let mut ops = Vec::new();
    for project in next.projects.iter_mut().filter(|p| p.expanded != expanded) {
      project.expanded = expanded;
      ops.push(record_op(project)?);
    }
    self.commit(&mut state, next, ops).await
  }

  /// Expand every ancestor of `id` so it is visible in the tree.
  pub async fn expand_ancestor_path(&self, id: &Id) -> Result<()> {
    let mut state = self.state.lock().await;
    let mut chain: Vec<Id> = state.ancestors(id)?.into_iter().map(|p| p.id.clone()).collect();
    chain.pop();

    let mut next = state.clone();
    let mut ops = Vec::new();
    for ancestor in &chain {
      let project = next.require_mut(ancestor)?;
      if !project.expanded {
        project.expanded = true;
        ops.push(record_op(project)?);
      }
    }
    self.commit(&mut state, next, ops).await
  }

  // ── Knowledge sources ──────────────────────────────────────────────────────

  /// Append an access to a source's audit trail.
  pub async fn record_source_access(
    &self,
    project_id: &Id,
    source_id: &Id,
  ) -> Result<KnowledgeSource> {
    let mut state = self.state.lock().await;
    let mut next = state.clone();
    let project = next.require_mut(project_id)?;
    let source = project
      .source_mut(source_id)
      .ok_or_else(|| source_not_found(project_id, source_id))?;
    source.record_access(Utc::now());
    let touched = source.clone();
    let ops = vec![record_op(project)?];

    self.commit(&mut state, next, ops).await?;
    Ok(touched)
  }

  /// Late field update from the icon/metadata pipeline, applied to the
  /// stored entry in place.
  pub async fn enrich_source(
    &self,
    project_id: &Id,
    source_id: &Id,
    enrichment: &SourceEnrichment,
  ) -> Result<KnowledgeSource> {
    let mut state = self.state.lock().await;
    let mut next = state.clone();
    let project = next.require_mut(project_id)?;
    let source = project
      .source_mut(source_id)
      .ok_or_else(|| source_not_found(project_id, source_id))?;
    let changed = enrichment.apply(source);
    let enriched = source.clone();
    let ops = if changed { vec![record_op(project)?] } else { Vec::new() };

    self.commit(&mut state, next, ops).await?;
    Ok(enriched)
  }

  /// Move a source between projects. Both records are written in one batch,
  /// so a store with atomic batches never leaves the source duplicated or
  /// missing. The destination is written first; a store that applies the
  /// batch op by op can duplicate the source on failure but never lose it.
  pub async fn move_source(&self, from: &Id, to: &Id, source_id: &Id) -> Result<KnowledgeSource> {
    let mut state = self.state.lock().await;
    if from == to {
      return state.source(from, source_id).cloned();
    }
    let from_idx = state.position(from)?;
    let to_idx = state.position(to)?;

    let mut next = state.clone();
    let (source_project, dest_project) = pair_mut(&mut next.projects, from_idx, to_idx);
    let moved = merge::move_source(source_project, dest_project, source_id)?;
    let now = Utc::now();
    source_project.date_modified = now;
    dest_project.date_modified = now;
    let ops = vec![record_op(dest_project)?, record_op(source_project)?];

    self.commit(&mut state, next, ops).await?;
    tracing::debug!(source = %source_id, %from, %to, "knowledge source moved");
    Ok(moved)
  }

  // ── Sorting ────────────────────────────────────────────────────────────────

  pub async fn sort_key(&self) -> SortKey { self.state.lock().await.sort_key }

  pub async fn set_sort_key(&self, key: SortKey) -> Result<()> {
    let mut state = self.state.lock().await;
    self
      .store
      .set(keys::SORT_INDEX, key.index().to_string().into_bytes())
      .await
      .map_err(Error::persistence)?;
    state.sort_key = key;
    Ok(())
  }

  /// A project's sources ordered by the active sort key.
  pub async fn sorted_sources(&self, project_id: &Id) -> Result<Vec<KnowledgeSource>> {
    let state = self.state.lock().await;
    let mut sources = state.require(project_id)?.knowledge_sources.clone();
    sort::sort_sources(&mut sources, state.sort_key);
    Ok(sources)
  }

  /// A project's sources in its manual order; sources missing from the
  /// manual order follow, ordered by the active sort key.
  pub async fn ordered_sources(&self, project_id: &Id) -> Result<Vec<KnowledgeSource>> {
    let order = self.custom_order(project_id).await?;
    let mut sources = self.sorted_sources(project_id).await?;
    sort::apply_custom_order(&mut sources, &order);
    Ok(sources)
  }

  pub async fn custom_order(&self, project_id: &Id) -> Result<Vec<Id>> {
    let state = self.state.lock().await;
    state.require(project_id)?;
    let raw = self
      .store
      .get(&keys::custom_sort(project_id))
      .await
      .map_err(Error::persistence)?;
    drop(state);

    let Some(raw) = raw else { return Ok(Vec::new()) };
    match serde_json::from_slice(&raw) {
      Ok(order) => Ok(order),
      Err(error) => {
        tracing::warn!(project = %project_id, %error, "malformed custom sort order; ignoring");
        Ok(Vec::new())
      }
    }
  }

  /// Persist a manual ordering. Ids the project does not hold are dropped,
  /// as are repeats.
  pub async fn set_custom_order(&self, project_id: &Id, order: Vec<Id>) -> Result<Vec<Id>> {
    let state = self.state.lock().await;
    let project = state.require(project_id)?;
    let mut seen = HashSet::new();
    let order: Vec<Id> = order
      .into_iter()
      .filter(|id| project.source(id).is_some() && seen.insert(id.clone()))
      .collect();
    self
      .store
      .set(&keys::custom_sort(project_id), serde_json::to_vec(&order)?)
      .await
      .map_err(Error::persistence)?;
    Ok(order)
  }
}

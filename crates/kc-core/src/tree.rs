//! Tree materialisation: flat, parent-referencing projects in, a nested
//! read-only forest out.
//!
//! The materialiser never touches the projects themselves; it builds a
//! separate node structure that is safe to hand to views.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{id::Id, project::Project};

/// A read-only node of the materialised project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
  pub id:         Id,
  pub name:       String,
  /// Whether the node has children to expand.
  pub expandable: bool,
  /// Persisted UI state of the underlying project.
  pub expanded:   bool,
  pub children:   Vec<TreeNode>,
}

/// One row of a flattened tree, in pre-order, for list-style tree widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatNode {
  pub id:         Id,
  pub name:       String,
  pub level:      usize,
  pub expandable: bool,
  pub expanded:   bool,
}

/// Build the project forest.
///
/// - Projects without a parent are roots, in collection order.
/// - A child is attached under its parent; children listed in the parent's
///   `subproject_ids` come first in that order, unlisted ones follow in
///   collection order.
/// - A project whose parent is missing from `projects` is surfaced as a root
///   rather than dropped.
/// - Projects caught in a parent cycle are unreachable and never emitted.
pub fn build_tree(projects: &[Project]) -> Vec<TreeNode> {
  let lookup: HashMap<&Id, &Project> =
    projects.iter().map(|p| (&p.id, p)).collect();

  let mut roots: Vec<&Project> = Vec::new();
  let mut children: HashMap<&Id, Vec<&Project>> = HashMap::new();
  for project in projects {
    match project.parent_id.as_ref().filter(|pid| lookup.contains_key(pid)) {
      Some(parent_id) => children.entry(parent_id).or_default().push(project),
      None => roots.push(project),
    }
  }

  for (parent_id, kids) in children.iter_mut() {
    if let Some(parent) = lookup.get(parent_id) {
      let order = &parent.subproject_ids;
      // Stable sort: unlisted children keep their collection order.
      kids.sort_by_key(|kid| {
        order.iter().position(|id| *id == kid.id).unwrap_or(usize::MAX)
      });
    }
  }

  let mut visited = HashSet::new();
  roots
    .into_iter()
    .filter_map(|root| materialize(root, &children, &mut visited))
    .collect()
}

fn materialize<'a>(
  project: &'a Project,
  children: &HashMap<&'a Id, Vec<&'a Project>>,
  visited: &mut HashSet<&'a Id>,
) -> Option<TreeNode> {
  if !visited.insert(&project.id) {
    return None;
  }

  let child_nodes: Vec<TreeNode> = children
    .get(&project.id)
    .into_iter()
    .flatten()
    .copied()
    .filter_map(|child| materialize(child, children, visited))
    .collect();

  Some(TreeNode {
    id:         project.id.clone(),
    name:       project.name.clone(),
    expandable: !child_nodes.is_empty(),
    expanded:   project.expanded,
    children:   child_nodes,
  })
}

/// Flatten a forest in pre-order, recording each node's depth.
pub fn flatten(forest: &[TreeNode]) -> Vec<FlatNode> {
  fn walk(node: &TreeNode, level: usize, out: &mut Vec<FlatNode>) {
    out.push(FlatNode {
      id: node.id.clone(),
      name: node.name.clone(),
      level,
      expandable: node.expandable,
      expanded: node.expanded,
    });
    for child in &node.children {
      walk(child, level + 1, out);
    }
  }

  let mut out = Vec::new();
  for node in forest {
    walk(node, 0, &mut out);
  }
  out
}

/// Depth-first search for the node with `id`.
pub fn find<'a>(forest: &'a [TreeNode], id: &Id) -> Option<&'a TreeNode> {
  forest.iter().find_map(|node| {
    if node.id == *id {
      Some(node)
    } else {
      find(&node.children, id)
    }
  })
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;

  fn project(id: &str, parent: Option<&str>, subs: &[&str]) -> Project {
    let mut p = Project::new(Id::new(id), id.to_uppercase(), Utc.timestamp_opt(0, 0).unwrap());
    p.parent_id = parent.map(Id::new);
    p.subproject_ids = subs.iter().copied().map(Id::new).collect();
    p
  }

  fn count(forest: &[TreeNode]) -> usize {
    forest.iter().map(|n| 1 + count(&n.children)).sum()
  }

  #[test]
  fn roots_match_projects_without_parent() {
    let projects = vec![
      project("leaf", Some("mid"), &[]),
      project("root", None, &["mid"]),
      project("mid", Some("root"), &["leaf"]),
      project("other", None, &[]),
    ];
    let forest = build_tree(&projects);

    assert_eq!(forest.len(), 2);
    assert_eq!(forest[0].id, Id::new("root"));
    assert_eq!(forest[1].id, Id::new("other"));
    assert_eq!(count(&forest), projects.len());
    assert!(forest[0].expandable);
    assert!(!forest[1].expandable);

    let leaf = find(&forest, &Id::new("leaf")).unwrap();
    assert!(leaf.children.is_empty());
  }

  #[test]
  fn children_follow_subproject_order() {
    let projects = vec![
      project("root", None, &["b", "a"]),
      project("a", Some("root"), &[]),
      project("c", Some("root"), &[]),
      project("b", Some("root"), &[]),
    ];
    let forest = build_tree(&projects);
    let order: Vec<&str> =
      forest[0].children.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(order, vec!["b", "a", "c"]);
  }

  #[test]
  fn orphan_is_surfaced_as_root() {
    let projects = vec![project("lost", Some("gone"), &[])];
    let forest = build_tree(&projects);
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].id, Id::new("lost"));
  }

  #[test]
  fn cyclic_projects_are_not_emitted() {
    let projects = vec![
      project("root", None, &[]),
      project("x", Some("y"), &["y"]),
      project("y", Some("x"), &["x"]),
    ];
    let forest = build_tree(&projects);
    assert_eq!(count(&forest), 1);
  }

  #[test]
  fn materialising_leaves_projects_untouched() {
    let projects = vec![project("root", None, &["a"]), project("a", Some("root"), &[])];
    let before = projects.clone();
    let _ = build_tree(&projects);
    assert_eq!(projects, before);
  }

  #[test]
  fn flatten_is_preorder_with_levels() {
    let projects = vec![
      project("root", None, &["mid"]),
      project("mid", Some("root"), &["leaf"]),
      project("leaf", Some("mid"), &[]),
      project("second", None, &[]),
    ];
    let flat = flatten(&build_tree(&projects));
    let rows: Vec<(&str, usize)> =
      flat.iter().map(|n| (n.id.as_str(), n.level)).collect();
    assert_eq!(
      rows,
      vec![("root", 0), ("mid", 1), ("leaf", 2), ("second", 0)]
    );
  }
}

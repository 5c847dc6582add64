//! Handlers for the selection and the materialised tree.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET` | `/current` | `null` when nothing is selected |
//! | `PUT` | `/current` | Body: `{"id": "..." \| null}`; `null` selects the first project |
//! | `GET` | `/tree` | Nested forest |
//! | `GET` | `/tree/flat` | Pre-order rows with depth |
//! | `PUT` | `/tree/expanded` | Body: `{"expanded": true}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
};
use kc_core::{
  Id, IdSource,
  project::Project,
  store::KvStore,
  tree::{FlatNode, TreeNode},
};
use kc_repository::ProjectRepository;
use serde::Deserialize;

use crate::error::ApiError;

type Repo<S, I> = State<Arc<ProjectRepository<S, I>>>;

/// `GET /current`
pub async fn current<S, I>(State(repo): Repo<S, I>) -> Json<Option<Project>>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Json(repo.current().await)
}

#[derive(Debug, Deserialize)]
pub struct SelectBody {
  #[serde(default)]
  pub id: Option<Id>,
}

/// `PUT /current`
pub async fn select<S, I>(
  State(repo): Repo<S, I>,
  Json(body): Json<SelectBody>,
) -> Result<Json<Option<Project>>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Ok(Json(repo.set_current(body.id.as_ref()).await?))
}

/// `GET /tree`
pub async fn tree<S, I>(State(repo): Repo<S, I>) -> Json<Vec<TreeNode>>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Json(repo.tree().await)
}

/// `GET /tree/flat`
pub async fn flat<S, I>(State(repo): Repo<S, I>) -> Json<Vec<FlatNode>>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Json(repo.flat_tree().await)
}

#[derive(Debug, Deserialize)]
pub struct ExpandBody {
  pub expanded: bool,
}

/// `PUT /tree/expanded`
pub async fn expand_all<S, I>(
  State(repo): Repo<S, I>,
  Json(body): Json<ExpandBody>,
) -> Result<StatusCode, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  repo.set_all_expanded(body.expanded).await?;
  Ok(StatusCode::NO_CONTENT)
}

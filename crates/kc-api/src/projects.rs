//! Handlers for `/projects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/projects` | Every project, collection order |
//! | `POST`   | `/projects` | Body: [`NewProject`]; returns 201 |
//! | `PATCH`  | `/projects` | Body: list of [`ProjectUpdate`]; all or nothing |
//! | `GET`    | `/projects/{id}` | 404 if not found |
//! | `PATCH`  | `/projects/{id}` | Body: [`ProjectUpdate`]; the path id wins |
//! | `DELETE` | `/projects/{id}` | Cascades; returns the deleted ids |
//! | `GET`    | `/projects/{id}/ancestors` | Root first |
//! | `GET`    | `/projects/{id}/subtree` | `(id, name)` pairs, pre-order |
//! | `POST`   | `/projects/{id}/parent` | Body: `{"parent_id": "..." \| null}` |
//! | `POST`   | `/projects/{id}/reveal` | Expands every ancestor |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use kc_core::{
  Id, IdSource,
  project::{NewProject, Project, ProjectIdentifier, ProjectUpdate},
  store::KvStore,
};
use kc_repository::ProjectRepository;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

type Repo<S, I> = State<Arc<ProjectRepository<S, I>>>;

// ─── Collection ──────────────────────────────────────────────────────────────

/// `GET /projects`
pub async fn list<S, I>(State(repo): Repo<S, I>) -> Json<Vec<Project>>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Json(repo.projects().await)
}

/// `POST /projects`
pub async fn create<S, I>(
  State(repo): Repo<S, I>,
  Json(body): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  let project = repo.create(body).await?;
  Ok((StatusCode::CREATED, Json(project)))
}

/// `PATCH /projects`
pub async fn update_many<S, I>(
  State(repo): Repo<S, I>,
  Json(body): Json<Vec<ProjectUpdate>>,
) -> Result<Json<Vec<Project>>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Ok(Json(repo.update_many(body).await?))
}

// ─── Single project ──────────────────────────────────────────────────────────

/// `GET /projects/{id}`
pub async fn get_one<S, I>(
  State(repo): Repo<S, I>,
  Path(id): Path<Id>,
) -> Result<Json<Project>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  let project = repo
    .get_project(&id)
    .await
    .ok_or_else(|| ApiError::NotFound(format!("project {id} not found")))?;
  Ok(Json(project))
}

/// `PATCH /projects/{id}`
pub async fn update<S, I>(
  State(repo): Repo<S, I>,
  Path(id): Path<Id>,
  Json(mut body): Json<ProjectUpdate>,
) -> Result<Json<Project>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  if body.id.as_ref().is_some_and(|body_id| *body_id != id) {
    return Err(ApiError::BadRequest("body id does not match path".into()));
  }
  body.id = Some(id);
  Ok(Json(repo.update(body).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Deleted {
  pub deleted: Vec<Id>,
}

/// `DELETE /projects/{id}`
pub async fn delete_one<S, I>(
  State(repo): Repo<S, I>,
  Path(id): Path<Id>,
) -> Result<Json<Deleted>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  let deleted = repo.delete(&id).await?;
  Ok(Json(Deleted { deleted }))
}

// ─── Hierarchy ───────────────────────────────────────────────────────────────

/// `GET /projects/{id}/ancestors`
pub async fn ancestors<S, I>(
  State(repo): Repo<S, I>,
  Path(id): Path<Id>,
) -> Result<Json<Vec<Project>>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Ok(Json(repo.get_ancestors(&id).await?))
}

/// `GET /projects/{id}/subtree`
pub async fn subtree<S, I>(
  State(repo): Repo<S, I>,
  Path(id): Path<Id>,
) -> Result<Json<Vec<ProjectIdentifier>>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Ok(Json(repo.subtree(&id).await?))
}

#[derive(Debug, Deserialize)]
pub struct ParentBody {
  /// `null` moves the project to the root.
  pub parent_id: Option<Id>,
}

/// `POST /projects/{id}/parent`
pub async fn reparent<S, I>(
  State(repo): Repo<S, I>,
  Path(id): Path<Id>,
  Json(body): Json<ParentBody>,
) -> Result<Json<Project>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Ok(Json(repo.reparent(&id, body.parent_id.as_ref()).await?))
}

/// `POST /projects/{id}/reveal`
pub async fn reveal<S, I>(
  State(repo): Repo<S, I>,
  Path(id): Path<Id>,
) -> Result<StatusCode, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  repo.expand_ancestor_path(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

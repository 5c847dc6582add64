//! Handlers for knowledge-source endpoints and the sort preference.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`   | `/projects/{id}/sources` | `?order=custom` applies the manual order |
//! | `PUT`   | `/projects/{id}/sources/order` | Body: `{"order": [...]}` |
//! | `PATCH` | `/projects/{id}/sources/{source_id}` | Body: [`SourceEnrichment`] |
//! | `POST`  | `/projects/{id}/sources/{source_id}/access` | Appends an access |
//! | `POST`  | `/sources/move` | Body: [`MoveBody`] |
//! | `GET`   | `/sort` | Active sort key |
//! | `PUT`   | `/sort` | Body: `{"key": "title_descending"}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use kc_core::{
  Id, IdSource,
  sort::SortKey,
  source::{KnowledgeSource, SourceEnrichment},
  store::KvStore,
};
use kc_repository::ProjectRepository;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

type Repo<S, I> = State<Arc<ProjectRepository<S, I>>>;

// ─── Listing ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
  /// The active sort key.
  #[default]
  Sorted,
  /// The project's manual order, then the active sort key.
  Custom,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub order: Order,
}

/// `GET /projects/{id}/sources[?order=sorted|custom]`
pub async fn list<S, I>(
  State(repo): Repo<S, I>,
  Path(id): Path<Id>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<KnowledgeSource>>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  let sources = match params.order {
    Order::Sorted => repo.sorted_sources(&id).await?,
    Order::Custom => repo.ordered_sources(&id).await?,
  };
  Ok(Json(sources))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderBody {
  pub order: Vec<Id>,
}

/// `PUT /projects/{id}/sources/order`: returns the order actually stored.
pub async fn set_order<S, I>(
  State(repo): Repo<S, I>,
  Path(id): Path<Id>,
  Json(body): Json<OrderBody>,
) -> Result<Json<OrderBody>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  let order = repo.set_custom_order(&id, body.order).await?;
  Ok(Json(OrderBody { order }))
}

// ─── Single source ───────────────────────────────────────────────────────────

/// `PATCH /projects/{id}/sources/{source_id}`
pub async fn enrich<S, I>(
  State(repo): Repo<S, I>,
  Path((id, source_id)): Path<(Id, Id)>,
  Json(body): Json<SourceEnrichment>,
) -> Result<Json<KnowledgeSource>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Ok(Json(repo.enrich_source(&id, &source_id, &body).await?))
}

/// `POST /projects/{id}/sources/{source_id}/access`
pub async fn access<S, I>(
  State(repo): Repo<S, I>,
  Path((id, source_id)): Path<(Id, Id)>,
) -> Result<Json<KnowledgeSource>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Ok(Json(repo.record_source_access(&id, &source_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct MoveBody {
  pub from:      Id,
  pub to:        Id,
  pub source_id: Id,
}

/// `POST /sources/move`
pub async fn move_one<S, I>(
  State(repo): Repo<S, I>,
  Json(body): Json<MoveBody>,
) -> Result<Json<KnowledgeSource>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  let moved = repo.move_source(&body.from, &body.to, &body.source_id).await?;
  Ok(Json(moved))
}

// ─── Sort preference ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SortBody {
  pub key:   SortKey,
  #[serde(default, skip_deserializing)]
  pub label: String,
}

impl From<SortKey> for SortBody {
  fn from(key: SortKey) -> Self { Self { key, label: key.label().to_owned() } }
}

/// `GET /sort`
pub async fn get_sort<S, I>(State(repo): Repo<S, I>) -> Json<SortBody>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Json(repo.sort_key().await.into())
}

/// `PUT /sort`
pub async fn set_sort<S, I>(
  State(repo): Repo<S, I>,
  Json(body): Json<SortBody>,
) -> Result<Json<SortBody>, ApiError>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  repo.set_sort_key(body.key).await?;
  Ok(Json(body.key.into()))
}

//! JSON REST API for Knowledge Canvas.
//!
//! Exposes an axum [`Router`] backed by a shared [`ProjectRepository`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", kc_api::api_router(repo.clone()))
//! ```

pub mod error;
pub mod navigation;
pub mod projects;
pub mod sources;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use kc_core::{IdSource, store::KvStore};
use kc_repository::ProjectRepository;

pub use error::ApiError;

/// Build a fully-materialised API router for `repo`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, I>(repo: Arc<ProjectRepository<S, I>>) -> Router<()>
where
  S: KvStore + 'static,
  I: IdSource + 'static,
{
  Router::new()
    // Projects
    .route(
      "/projects",
      get(projects::list::<S, I>)
        .post(projects::create::<S, I>)
        .patch(projects::update_many::<S, I>),
    )
    .route(
      "/projects/{id}",
      get(projects::get_one::<S, I>)
        .patch(projects::update::<S, I>)
        .delete(projects::delete_one::<S, I>),
    )
    .route("/projects/{id}/ancestors", get(projects::ancestors::<S, I>))
    .route("/projects/{id}/subtree", get(projects::subtree::<S, I>))
    .route("/projects/{id}/parent", post(projects::reparent::<S, I>))
    .route("/projects/{id}/reveal", post(projects::reveal::<S, I>))
    // Knowledge sources
    .route("/projects/{id}/sources", get(sources::list::<S, I>))
    .route("/projects/{id}/sources/order", put(sources::set_order::<S, I>))
    .route(
      "/projects/{id}/sources/{source_id}",
      axum::routing::patch(sources::enrich::<S, I>),
    )
    .route(
      "/projects/{id}/sources/{source_id}/access",
      post(sources::access::<S, I>),
    )
    .route("/sources/move", post(sources::move_one::<S, I>))
    .route("/sort", get(sources::get_sort::<S, I>).put(sources::set_sort::<S, I>))
    // Selection and tree
    .route(
      "/current",
      get(navigation::current::<S, I>).put(navigation::select::<S, I>),
    )
    .route("/tree", get(navigation::tree::<S, I>))
    .route("/tree/flat", get(navigation::flat::<S, I>))
    .route("/tree/expanded", put(navigation::expand_all::<S, I>))
    .with_state(repo)
}

#[cfg(test)]
mod tests;

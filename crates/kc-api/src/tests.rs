use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use kc_core::{Id, project::Project, tree::FlatNode};
use kc_repository::{
  AllocatorConfig, IdAllocator, MemoryStore, ProjectRepository, RandomIdSource,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::api_router;

async fn app() -> Router {
  let ids = IdAllocator::new(RandomIdSource, AllocatorConfig::default()).unwrap();
  let repo = ProjectRepository::open(MemoryStore::new(), ids).await.unwrap();
  api_router(Arc::new(repo))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(json) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
  (status, value)
}

async fn create(app: &Router, body: Value) -> Project {
  let (status, value) = call(app, "POST", "/projects", Some(body)).await;
  assert_eq!(status, StatusCode::CREATED);
  serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn create_then_fetch() {
  let app = app().await;
  let research = create(&app, json!({ "name": "Research" })).await;

  let (status, value) = call(&app, "GET", &format!("/projects/{}", research.id), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(value["name"], "Research");

  let (_, current) = call(&app, "GET", "/current", None).await;
  assert_eq!(current["id"], research.id.as_str());
}

#[tokio::test]
async fn unknown_project_is_404() {
  let app = app().await;
  let (status, value) = call(&app, "GET", "/projects/missing", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert!(value["error"].as_str().unwrap().contains("missing"));

  let (status, _) = call(&app, "PATCH", "/projects/missing", Some(json!({ "name": "x" }))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_name_is_400() {
  let app = app().await;
  let (status, _) = call(&app, "POST", "/projects", Some(json!({ "name": "  " }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn hierarchy_endpoints() {
  let app = app().await;
  let root = create(&app, json!({ "name": "root" })).await;
  let child = create(&app, json!({ "name": "child", "parent_id": root.id })).await;

  let (_, chain) =
    call(&app, "GET", &format!("/projects/{}/ancestors", child.id), None).await;
  let names: Vec<&str> =
    chain.as_array().unwrap().iter().map(|p| p["name"].as_str().unwrap()).collect();
  assert_eq!(names, vec!["root", "child"]);

  let (_, flat) = call(&app, "GET", "/tree/flat", None).await;
  let flat: Vec<FlatNode> = serde_json::from_value(flat).unwrap();
  assert_eq!(flat.len(), 2);
  assert_eq!(flat[1].level, 1);

  let (status, _) = call(
    &app,
    "POST",
    &format!("/projects/{}/parent", root.id),
    Some(json!({ "parent_id": child.id })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, deleted) = call(&app, "DELETE", &format!("/projects/{}", root.id), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(deleted["deleted"].as_array().unwrap().len(), 2);

  let (_, tree) = call(&app, "GET", "/tree", None).await;
  assert_eq!(tree, json!([]));
}

#[tokio::test]
async fn sources_move_and_sort() {
  let app = app().await;
  let a = create(&app, json!({ "name": "A" })).await;
  let b = create(&app, json!({ "name": "B" })).await;
  let source_id = Id::random();

  let note = json!({
    "id": source_id,
    "title": "Reading list",
    "ingest_type": "note",
    "reference": { "kind": "none" },
    "access_link": "",
    "date_created": "2024-01-01T00:00:00Z",
  });
  let (status, _) = call(
    &app,
    "PATCH",
    &format!("/projects/{}", a.id),
    Some(json!({ "add_knowledge_source": [note] })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, moved) = call(
    &app,
    "POST",
    "/sources/move",
    Some(json!({ "from": a.id, "to": b.id, "source_id": source_id })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(moved["associated_project_id"], b.id.as_str());

  let (_, listed) = call(&app, "GET", &format!("/projects/{}/sources", b.id), None).await;
  assert_eq!(listed.as_array().unwrap().len(), 1);

  let (status, sort) = call(&app, "PUT", "/sort", Some(json!({ "key": "recently_created" }))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(sort["key"], "recently_created");
  let (_, sort) = call(&app, "GET", "/sort", None).await;
  assert_eq!(sort["key"], "recently_created");
}

#[tokio::test]
async fn batch_update_is_all_or_nothing() {
  let app = app().await;
  let a = create(&app, json!({ "name": "A" })).await;
  let b = create(&app, json!({ "name": "B" })).await;

  let (status, _) = call(
    &app,
    "PATCH",
    "/projects",
    Some(json!([{ "id": a.id, "name": "Alpha" }, { "id": "ghost" }])),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  let (_, unchanged) = call(&app, "GET", &format!("/projects/{}", a.id), None).await;
  assert_eq!(unchanged["name"], "A");

  let (status, updated) = call(
    &app,
    "PATCH",
    "/projects",
    Some(json!([{ "id": a.id, "name": "Alpha" }, { "id": b.id, "add_topic": ["rust"] }])),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated[0]["name"], "Alpha");
  assert_eq!(updated[1]["topics"], json!(["rust"]));
  assert_eq!(updated[0]["calendar"]["events"].as_array().unwrap().len(), 1);
}

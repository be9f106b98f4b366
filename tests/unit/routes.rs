use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use super::Fixture;
use workflow_schemes::AppState;
use workflow_schemes::cache::broadcast::DEFAULT_CLEAR_CACHE_CHANNEL;
use workflow_schemes::routes::create_router;
use workflow_schemes::services::context::ACTOR_HEADER;

fn app(fx: &Fixture) -> axum::Router {
    let state = AppState::new(
        fx.manager.clone(),
        fx.migrations.clone(),
        None,
        DEFAULT_CLEAR_CACHE_CHANNEL,
    );
    create_router(Arc::new(state))
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(ACTOR_HEADER, "admin");
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn create_resolve_and_list_schemes() {
    let fx = Fixture::new();
    let body = json!({
        "name": "Dev",
        "description": "main",
        "mappings": { "default_workflow": "wf-default", "issue_type_mappings": { "bug": "wf-bug" } }
    });
    let (status, created) = send(app(&fx), "POST", "/workflowschemes", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["data"]["id"].as_i64().unwrap();

    let (status, resolved) = send(app(&fx), "GET", &format!("/workflowschemes/{}/workflow?issue_type=bug", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["data"]["workflow"], "wf-bug");

    let (_, resolved) = send(app(&fx), "GET", &format!("/workflowschemes/{}/workflow", id), None).await;
    assert_eq!(resolved["data"]["workflow"], "wf-default");

    let (status, listed) = send(app(&fx), "GET", "/workflowschemes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["meta"]["total_count"], 1);
}

#[tokio::test]
async fn invalid_bodies_are_bad_requests() {
    let fx = Fixture::new();
    let (status, _) = send(app(&fx), "POST", "/workflowschemes", Some(json!({ "name": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let blank_workflow = json!({ "name": "Dev", "mappings": { "issue_type_mappings": { "bug": " " } } });
    let (status, body) = send(app(&fx), "POST", "/workflowschemes", Some(blank_workflow)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn missing_scheme_is_not_found() {
    let fx = Fixture::new();
    let (status, _) = send(app(&fx), "GET", "/workflowschemes/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(app(&fx), "GET", "/projects/999/workflowscheme", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn draft_edit_and_publish_over_http() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(None, "wf-old")]);
    let id = scheme.id.unwrap();

    let (status, draft) = send(app(&fx), "POST", &format!("/workflowschemes/{}/createdraft", id), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(draft["data"]["draft"], true);
    assert_eq!(draft["data"]["last_modified_user"], "admin");

    let (status, _) = send(app(&fx), "POST", &format!("/workflowschemes/{}/createdraft", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let edit = json!({ "mappings": { "default_workflow": "wf-new" } });
    let (status, _) = send(app(&fx), "PUT", &format!("/workflowschemes/{}/draft", id), Some(edit)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, published) = send(app(&fx), "POST", &format!("/workflowschemes/{}/draft/publish", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(published["data"]["mappings"]["default_workflow"], "wf-new");

    let (status, _) = send(app(&fx), "GET", &format!("/workflowschemes/{}/draft", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn migrating_scheme_is_a_conflict() {
    let fx = Fixture::new();
    let scheme = fx.create("Dev", &[(None, "wf")]);
    let id = scheme.id.unwrap();
    fx.migrations
        .start(workflow_schemes::migration::MigrationKind::Scheme, Some(id), Vec::new());

    let body = json!({ "name": "Dev", "mappings": { "default_workflow": "wf-2" } });
    let (status, response) = send(app(&fx), "PUT", &format!("/workflowschemes/{}", id), Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(response["errors"][0]["code"], "SCHEME_IS_BEING_MIGRATED");

    let (_, state) = send(app(&fx), "GET", &format!("/workflowschemes/{}/state", id), None).await;
    assert_eq!(state["data"]["state"], "migrating");
}

#[tokio::test]
async fn project_assignment_and_cleanup() {
    let fx = Fixture::new();
    fx.add_project(1);
    let scheme = fx.create("Dev", &[(None, "wf")]);
    let id = scheme.id.unwrap();

    let (status, _) = send(app(&fx), "PUT", "/projects/1/workflowscheme", Some(json!({ "scheme_id": id }))).await;
    assert_eq!(status, StatusCode::OK);
    let (_, current) = send(app(&fx), "GET", "/projects/1/workflowscheme", None).await;
    assert_eq!(current["data"]["id"], id);

    let (status, _) = send(app(&fx), "DELETE", &format!("/workflowschemes/{}", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(app(&fx), "POST", &format!("/workflowschemes/{}/createdraft", id), None).await;
    let (status, cleaned) = send(app(&fx), "POST", "/projects/1/workflowscheme/cleanup-draft", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleaned["data"]["name"], "Copy of Dev");

    let (_, current) = send(app(&fx), "PUT", "/projects/1/workflowscheme", Some(json!({ "scheme_id": null }))).await;
    assert_eq!(current["data"]["default_scheme"], true);
}

#[tokio::test]
async fn clear_cache_without_redis_stays_local() {
    let fx = Fixture::new();
    let mut events = fx.events.subscribe();
    let (status, body) = send(app(&fx), "POST", "/admin/workflowschemes/clear-cache", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["receivers"].is_null());
    assert_eq!(events.try_recv().unwrap(), workflow_schemes::events::SchemeEvent::ClearCache);
}

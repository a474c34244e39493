#![allow(clippy::unwrap_used)] // Integration tests use unwrap for brevity

//! HTTP API tests: the router driven with `oneshot` over an in-memory store
//! and a stub provisioner on a local port.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::post;
use serde_json::{Value, json};
use tower::ServiceExt;

use hive_provisioning::{Database, Orchestrator, ProvisionerClient};
use hive_server::{AppState, build_router};

async fn stub_provisioner(status: StatusCode, body: Value) -> SocketAddr {
    let app = Router::new()
        .route(
            "/environment",
            post(move || {
                let body = body.clone();
                async move { (status, axum::Json(body)) }
            }),
        )
        .route("/environment/delete", post(|| async { StatusCode::OK }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

async fn app_with(provisioner: SocketAddr) -> Router {
    let db = Database::open_in_memory().await.unwrap();
    db.create_course("CPSC490", "Senior Project", "Capstone")
        .await
        .unwrap();
    let client = ProvisionerClient::new(&format!("http://{provisioner}/environment")).unwrap();
    build_router(AppState::new(Orchestrator::new(
        db,
        client,
        Duration::from_secs(5),
    )))
}

async fn app() -> Router {
    let addr = stub_provisioner(StatusCode::OK, json!({ "baseURL": "http://10.0.0.5:9000" })).await;
    app_with(addr).await
}

/// Send a request to the app and return (status, JSON body).
async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn hw1() -> Value {
    json!({
        "title": "HW1",
        "imageURL": "registry.local/hw1:latest",
        "netIDs": ["abc123", "def456"],
        "description": "First homework",
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn create_and_list_assignment() {
    let app = app().await;

    let (status, created) = send(
        &app,
        "POST",
        "/api/course/CPSC490/assignments",
        Some(hw1()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["assignment"]["title"], "HW1");
    assert_eq!(created["environment"]["baseUrl"], "http://10.0.0.5:9000");
    assert_eq!(
        created["environment"]["assignmentId"],
        created["assignment"]["id"]
    );

    let (status, listed) = send(&app, "GET", "/api/course/CPSC490/assignments", None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "HW1");
    assert_eq!(listed[0]["environment"]["baseUrl"], "http://10.0.0.5:9000");
}

#[tokio::test]
async fn provisioner_failure_returns_502_and_leaves_no_assignment() {
    let addr = stub_provisioner(StatusCode::INTERNAL_SERVER_ERROR, json!({})).await;
    let app = app_with(addr).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/course/CPSC490/assignments",
        Some(hw1()),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "provisioning_failed");
    assert!(body["error"].as_str().unwrap().contains("HW1"));

    let (_, listed) = send(&app, "GET", "/api/course/CPSC490/assignments", None).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn unknown_course_returns_404() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/api/course/NOPE101/assignments", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "course_not_found");

    let (status, _) = send(&app, "POST", "/api/course/NOPE101/assignments", Some(hw1())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_title_returns_400() {
    let app = app().await;
    let mut body = hw1();
    body["title"] = json!("  ");
    let (status, resp) = send(&app, "POST", "/api/course/CPSC490/assignments", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["kind"], "invalid_request");
}

#[tokio::test]
async fn missing_image_is_a_json_400() {
    let app = app().await;
    let (status, resp) = send(
        &app,
        "POST",
        "/api/course/CPSC490/assignments",
        Some(json!({ "title": "HW1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(resp["kind"], "invalid_request");
}

#[tokio::test]
async fn delete_assignment_removes_it() {
    let app = app().await;
    let (_, created) = send(
        &app,
        "POST",
        "/api/course/CPSC490/assignments",
        Some(hw1()),
    )
    .await;
    let id = created["assignment"]["id"].as_str().unwrap().to_string();

    let (status, deleted) = send(&app, "DELETE", &format!("/api/assignment/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], id.as_str());

    let (status, body) = send(&app, "DELETE", &format!("/api/assignment/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "assignment_not_found");
}

#[tokio::test]
async fn create_course_and_reject_duplicate() {
    let app = app().await;
    let course = json!({ "courseCode": "CPSC323", "name": "Systems", "description": "" });

    let (status, created) = send(&app, "POST", "/api/course", Some(course.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["courseCode"], "CPSC323");

    let (status, body) = send(&app, "POST", "/api/course", Some(course)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "conflict");
}

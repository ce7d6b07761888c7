//! End-to-end tests for the HTTP API over an in-memory database.

#[path = "test_utils/mod.rs"]
mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use test_utils::setup_test_db;
use tower::ServiceExt;
use user_service::config::AppConfig;
use user_service::server::{AppState, create_app};

async fn app() -> Router {
    let db = setup_test_db().await.unwrap();
    create_app(AppState::new(Arc::new(AppConfig::default()), db))
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    tenant: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(tenant) = tenant {
        builder = builder.header("X-Tenant-ID", tenant);
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, json)
}

async fn create(app: &Router, tenant: &str, email: &str, first: &str, last: &str) -> Value {
    let (status, _, body) = send(
        app,
        "POST",
        "/api/v1/users",
        Some(tenant),
        Some(json!({ "email": email, "first_name": first, "last_name": last })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {body}");
    body["data"].clone()
}

#[tokio::test]
async fn health_and_ready_report_ok() {
    let app = app().await;

    let (status, _, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _, body) = send(&app, "GET", "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn openapi_document_lists_user_routes() {
    let app = app().await;

    let (status, _, body) = send(&app, "GET", "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/users"].is_object());
    assert!(body["paths"]["/api/v1/users/{id}"]["delete"].is_object());
}

#[tokio::test]
async fn user_routes_require_tenant_header() {
    let app = app().await;

    let (status, headers, body) = send(&app, "GET", "/api/v1/users", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "TENANT_ID_REQUIRED");
    assert_eq!(
        headers.get(header::CONTENT_TYPE).unwrap(),
        "application/problem+json"
    );
    // Error body and response header carry the same correlation id
    let trace_id = headers.get("x-trace-id").unwrap().to_str().unwrap();
    assert_eq!(body["trace_id"], trace_id);

    let (status, _, body) = send(&app, "GET", "/api/v1/users", Some("ab"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_TENANT_ID");
}

#[tokio::test]
async fn inbound_request_id_is_echoed() {
    let app = app().await;

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers().get("x-trace-id").unwrap(), "req-42");
}

#[tokio::test]
async fn create_get_update_delete_round_trip() {
    let app = app().await;

    let user = create(&app, "acme", "ada@example.com", "Ada", "Lovelace").await;
    let id = user["id"].as_str().unwrap().to_string();
    assert_eq!(user["tenant_id"], "acme");
    assert_eq!(user["roles"], json!(["user"]));
    assert_eq!(user["membership_active"], true);

    let (status, _, body) = send(&app, "GET", &format!("/api/v1/users/{id}"), Some("acme"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "ada@example.com");

    let (status, _, body) = send(
        &app,
        "PUT",
        &format!("/api/v1/users/{id}"),
        Some("acme"),
        Some(json!({ "last_name": "King", "roles": ["admin", "user"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {body}");
    assert_eq!(body["data"]["last_name"], "King");
    assert_eq!(body["data"]["roles"], json!(["admin", "user"]));

    let (status, _, body) =
        send(&app, "DELETE", &format!("/api/v1/users/{id}"), Some("acme"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].is_string());

    let (status, _, body) = send(&app, "GET", &format!("/api/v1/users/{id}"), Some("acme"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn duplicate_create_is_conflict() {
    let app = app().await;
    create(&app, "acme", "ada@example.com", "Ada", "Lovelace").await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/v1/users",
        Some("acme"),
        Some(json!({ "email": "ada@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_MEMBER");
}

#[tokio::test]
async fn create_after_delete_is_conflict() {
    let app = app().await;
    let user = create(&app, "acme", "ada@example.com", "Ada", "Lovelace").await;
    let id = user["id"].as_str().unwrap().to_string();

    let (status, _, _) =
        send(&app, "DELETE", &format!("/api/v1/users/{id}"), Some("acme"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/v1/users",
        Some("acme"),
        Some(json!({ "email": "ada@example.com", "first_name": "Augusta" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_MEMBER");
}

#[tokio::test]
async fn invalid_input_is_validation_failed_with_field() {
    let app = app().await;

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/v1/users",
        Some("acme"),
        Some(json!({ "email": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"]["field"], "email");

    let (status, _, body) = send(
        &app,
        "GET",
        "/api/v1/users/not-an-id",
        Some("acme"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "id");

    let (status, _, body) = send(
        &app,
        "POST",
        "/api/v1/users",
        Some("acme"),
        Some(json!({ "first_name": "Ada" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn list_and_search_are_paginated_per_tenant() {
    let app = app().await;
    create(&app, "acme", "ada@example.com", "Ada", "Lovelace").await;
    create(&app, "acme", "grace@example.com", "Grace", "Hopper").await;
    create(&app, "globex", "alan@example.com", "Alan", "Turing").await;

    let (status, _, body) = send(
        &app,
        "GET",
        "/api/v1/users?page=1&page_size=1",
        Some("acme"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["page_size"], 1);
    assert_eq!(body["data"]["users"].as_array().unwrap().len(), 1);

    let (status, _, body) = send(
        &app,
        "GET",
        "/api/v1/users/search?q=hop",
        Some("acme"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["users"][0]["first_name"], "Grace");
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["page_size"], 20);

    let (status, _, body) = send(&app, "GET", "/api/v1/users/search?q=a", Some("acme"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["field"], "query");

    let (status, _, body) = send(&app, "GET", "/api/v1/users/search?q=alan", Some("acme"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);
}

#[tokio::test]
async fn largest_page_number_returns_empty_page() {
    let app = app().await;
    create(&app, "acme", "ada@example.com", "Ada", "Lovelace").await;

    for uri in [
        format!("/api/v1/users?page={}&page_size=100", i64::MAX),
        format!("/api/v1/users/search?q=ada&page={}", i64::MAX),
    ] {
        let (status, _, body) = send(&app, "GET", &uri, Some("acme"), None).await;
        assert_eq!(status, StatusCode::OK, "uri {uri}");
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["page"], json!(i64::MAX));
        assert!(body["data"]["users"].as_array().unwrap().is_empty());
    }
}

#[tokio::test]
async fn search_matches_accented_names() {
    let app = app().await;
    create(&app, "acme", "emile@example.com", "Émile", "Zola").await;

    let (status, _, body) = send(
        &app,
        "GET",
        "/api/v1/users/search?q=%C3%89mile",
        Some("acme"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["users"][0]["first_name"], "Émile");
}

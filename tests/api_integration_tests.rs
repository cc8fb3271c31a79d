//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint against a memory-only cache.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use shop_cache::cache::{Cache, EntityTtls};
use shop_cache::{api::create_router, AppState};
use std::time::Duration;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_router(AppState::new(Cache::memory_only(EntityTtls::default())))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/set")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"key":"product:42","value":{"name":"pen"}}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("product:42"));
    assert_eq!(json["ttl"], 3600);
}

#[tokio::test]
async fn test_set_endpoint_with_ttl() {
    let app = create_test_app();

    let (status, json) = send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"cart:7","value":[1,2],"ttl":60}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ttl"], 60);
}

#[tokio::test]
async fn test_invalid_json_request() {
    let app = create_test_app();

    let (status, _) = send(&app, "PUT", "/set", Some(r#"{"key":"#)).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_empty_key_request() {
    let app = create_test_app();

    let (status, json) = send(&app, "PUT", "/set", Some(r#"{"key":"","value":1}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());
}

// == GET / DELETE Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let app = create_test_app();
    send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"product:42","value":{"name":"pen"}}"#),
    )
    .await;

    let (status, json) = send(&app, "GET", "/get/product:42", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "product:42");
    assert_eq!(json["value"]["name"], "pen");
    assert_eq!(json["tier"], "fallback");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/get/product:404", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("product:404"));
}

#[tokio::test]
async fn test_delete_endpoint() {
    let app = create_test_app();
    send(&app, "PUT", "/set", Some(r#"{"key":"cart:1","value":[]}"#)).await;

    let (status, _) = send(&app, "DELETE", "/del/cart:1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "GET", "/get/cart:1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/del/cart:1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == Invalidation Tests ==

#[tokio::test]
async fn test_pattern_invalidation_endpoint() {
    let app = create_test_app();
    for key in ["product:1", "product:2", "session:9"] {
        let body = format!(r#"{{"key":"{}","value":true}}"#, key);
        send(&app, "PUT", "/set", Some(&body)).await;
    }

    let (status, json) = send(&app, "DELETE", "/pattern/product:*", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 2);

    let (status, _) = send(&app, "GET", "/get/session:9", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, "GET", "/keys/*", None).await;
    assert_eq!(json["keys"], serde_json::json!(["session:9"]));
}

#[tokio::test]
async fn test_flush_endpoint() {
    let app = create_test_app();
    send(&app, "PUT", "/set", Some(r#"{"key":"product:1","value":1}"#)).await;

    let (status, _) = send(&app, "POST", "/flush", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(&app, "GET", "/keys/*", None).await;
    assert_eq!(json["keys"], serde_json::json!([]));
}

// == Stats / Health Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let app = create_test_app();
    send(&app, "PUT", "/set", Some(r#"{"key":"product:1","value":1}"#)).await;
    send(&app, "GET", "/get/product:1", None).await;
    send(&app, "GET", "/get/product:2", None).await;

    let (status, json) = send(&app, "GET", "/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["sets"], 1);
    assert_eq!(json["hit_rate"], 0.5);
    assert_eq!(json["tier"], "fallback");
    assert_eq!(json["mode"], "FALLBACK");
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["mode"], "FALLBACK");
}

// == TTL Tests ==

#[tokio::test]
async fn test_ttl_expiration_via_api() {
    let app = create_test_app();
    send(
        &app,
        "PUT",
        "/set",
        Some(r#"{"key":"session:short","value":"x","ttl":1}"#),
    )
    .await;

    let (status, _) = send(&app, "GET", "/get/session:short", None).await;
    assert_eq!(status, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let (status, _) = send(&app, "GET", "/get/session:short", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, json) = send(&app, "GET", "/stats", None).await;
    assert_eq!(json["sets"], 1);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
}

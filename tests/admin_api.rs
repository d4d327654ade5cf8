//! Admin surface and public routes driven in-process.

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use booking_resilience::admin::setup_admin_router;
use booking_resilience::http::{AppState, HttpServer};

mod common;

const KEY: &str = "test-admin-key";

fn state() -> AppState {
    // Nothing listens here; every fetch fails fast
    let mut config = common::test_config("http://127.0.0.1:9");
    config.admin.enabled = true;
    config.admin.api_key = KEY.to_string();
    let (service, _, _) = common::http_service(&config);
    AppState::new(Arc::new(config), Arc::new(service))
}

fn admin(method: Method, uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = key {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", key));
    }
    builder.body(Body::empty()).unwrap()
}

async fn call(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_admin_requires_api_key() {
    let router = setup_admin_router(state());

    let (status, _) = call(&router, admin(Method::GET, "/admin/status", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = call(&router, admin(Method::GET, "/admin/status", Some("wrong"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(&router, admin(Method::GET, "/admin/status", Some(KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "operational");
}

#[tokio::test]
async fn test_trip_and_reset_breaker() {
    let state = state();
    let router = setup_admin_router(state.clone());

    let (status, body) = call(
        &router,
        admin(Method::POST, "/admin/breakers/booking-site/trip", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["position"], "open");

    let (_, body) = call(&router, admin(Method::GET, "/admin/status", Some(KEY))).await;
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["breakers_open"], 1);

    let outcome = state.service.services().await;
    assert!(outcome.circuit_breaker_active);

    let (_, body) = call(
        &router,
        admin(Method::POST, "/admin/breakers/booking-site/reset", Some(KEY)),
    )
    .await;
    assert_eq!(body["position"], "closed");
    assert_eq!(body["consecutive_failures"], 0);

    let (status, _) = call(
        &router,
        admin(Method::POST, "/admin/breakers/nope/reset", Some(KEY)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_breakers_and_cache_inspection() {
    let router = setup_admin_router(state());

    let (_, body) = call(&router, admin(Method::GET, "/admin/breakers", Some(KEY))).await;
    let breakers = body.as_array().unwrap();
    assert_eq!(breakers.len(), 1);
    assert_eq!(breakers[0]["name"], "booking-site");

    let (status, body) = call(&router, admin(Method::GET, "/admin/cache/catalog/all", Some(KEY))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["present"], false);

    let (status, _) = call(&router, admin(Method::GET, "/admin/cache/weather/all", Some(KEY))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_public_routes_degrade_with_headers() {
    let router = HttpServer::new(state()).router();

    let request = Request::builder()
        .uri("/v1/services")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-data-provenance"], "static_fallback");
    assert!(response.headers().contains_key("x-request-id"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["provenance"], "static_fallback");
    assert_eq!(body["data"].as_array().unwrap().len(), 6);

    let request = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
    let (status, body) = call(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

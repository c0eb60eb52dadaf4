//! HTTP-level tests for the health endpoints and the router shape (spec §6).
//!
//! Grounded on the teacher's crate-level `tests/*.rs` integration style
//! (e.g. `gglib-axum/tests/*.rs`), using `tower::ServiceExt::oneshot` against
//! the router directly rather than binding a real socket.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use relay_web::bootstrap::{bootstrap, RelayConfig};
use relay_web::routes::create_router;
use tower::ServiceExt;

mod support;
use support::FakeBackendTransportFactory;

fn config() -> RelayConfig {
    RelayConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        region: "us-east-1".to_string(),
        model_id: "demo-model".to_string(),
        default_voice_id: "matthew".to_string(),
    }
}

#[tokio::test]
async fn ping_returns_ok_status() {
    let ctx = bootstrap(config(), Arc::new(FakeBackendTransportFactory::default())).await;
    let app = create_router(ctx);

    let response = app
        .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn health_returns_healthy_status() {
    let ctx = bootstrap(config(), Arc::new(FakeBackendTransportFactory::default())).await;
    let app = create_router(ctx);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "healthy");
}

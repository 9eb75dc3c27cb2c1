use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use tower::util::ServiceExt;

use super::common::*;
use crate::health::router::health_router;
use crate::health::service::ScanServiceConfig;

fn router() -> axum::Router {
    let service = service_with(
        Arc::new(StaticSnapshotProvider::new(snapshot_with_orphans(5))),
        ScanServiceConfig::default(),
    );
    health_router(service)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body reads");
    serde_json::from_slice(&bytes).expect("body is JSON")
}

#[tokio::test]
async fn score_requires_a_tenant_header() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/health/score")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "missing_tenant");
}

#[tokio::test]
async fn score_returns_the_scan_payload() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/health/score")
                .header("x-tenant-id", "acme-holdings")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["tenant_id"], "acme-holdings");
    assert_eq!(body["version"], "v2");
    assert_eq!(body["is_capped"], true);
    assert_eq!(body["final_score"], 60.0);
    assert_eq!(body["stale"], false);
    assert!(body["findings"].as_array().expect("findings list").len() >= 1);
    assert_eq!(body["readiness"], Value::Null);
}

#[tokio::test]
async fn version_query_selects_the_legacy_scanner() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/health/score?version=v1")
                .header("x-tenant-id", "acme-holdings")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["version"], "v1");
    assert_eq!(body["is_capped"], false);
}

#[tokio::test]
async fn unknown_version_is_rejected() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/health/score?version=v3")
                .header("x-tenant-id", "acme-holdings")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "invalid_version");
}

#[tokio::test]
async fn invalid_ruleset_write_is_rejected_with_a_stable_code() {
    let app = router();

    let current = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health/v2/ruleset")
                .header("x-tenant-id", "acme-holdings")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let mut config = body_json(current).await;
    config["weights"]["data_integrity"] = Value::from(19.0); // sums to 99

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/health/v2/ruleset")
                .header("x-tenant-id", "acme-holdings")
                .header("content-type", "application/json")
                .body(Body::from(config.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["code"], "invalid_config");
}

#[tokio::test]
async fn ruleset_reset_restores_defaults_and_bumps_the_revision() {
    let app = router();

    let current = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health/v2/ruleset")
                .header("x-tenant-id", "acme-holdings")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let mut config = body_json(current).await;
    config["mode"] = Value::from("audit");

    let updated = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/health/v2/ruleset")
                .header("x-tenant-id", "acme-holdings")
                .header("content-type", "application/json")
                .body(Body::from(config.to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(updated.status(), StatusCode::OK);
    let updated = body_json(updated).await;
    assert_eq!(updated["mode"], "audit");
    assert_eq!(updated["revision"], 1);

    let reset = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/health/v2/ruleset/reset")
                .header("x-tenant-id", "acme-holdings")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(reset.status(), StatusCode::OK);
    let reset = body_json(reset).await;
    assert_eq!(reset["mode"], "normal");
    assert_eq!(reset["revision"], 2);
}

#[tokio::test]
async fn version_selection_endpoint_round_trips() {
    let app = router();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/health/version")
                .header("x-tenant-id", "acme-holdings")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"version":"v1"}"#))
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);

    let score = app
        .oneshot(
            Request::builder()
                .uri("/health/score")
                .header("x-tenant-id", "acme-holdings")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");
    let body = body_json(score).await;
    assert_eq!(body["version"], "v1");
}

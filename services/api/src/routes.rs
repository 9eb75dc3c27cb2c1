use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use govhealth::health::{health_router, HealthScanService, RulesetStore, SnapshotProvider};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_health_routes<P, R>(service: Arc<HealthScanService<P, R>>) -> axum::Router
where
    P: SnapshotProvider + 'static,
    R: RulesetStore + 'static,
{
    health_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": "govhealth-api" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "starting" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::SeededSnapshotProvider;
    use axum::body::Body;
    use axum::http::Request;
    use axum_prometheus::PrometheusMetricLayer;
    use govhealth::health::{CheckRegistry, InMemoryRulesetStore, ScanServiceConfig};
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::util::ServiceExt;

    fn demo_router() -> (axum::Router, Arc<AtomicBool>) {
        let registry = Arc::new(CheckRegistry::standard().expect("standard catalog builds"));
        let service = Arc::new(HealthScanService::new(
            registry.clone(),
            Arc::new(SeededSnapshotProvider::default()),
            Arc::new(InMemoryRulesetStore::new(registry)),
            ScanServiceConfig::default(),
        ));
        let (layer, handle) = PrometheusMetricLayer::pair();
        let readiness = Arc::new(AtomicBool::new(false));
        let state = AppState {
            readiness: readiness.clone(),
            metrics: Arc::new(handle),
        };
        let router = with_health_routes(service)
            .layer(Extension(state))
            .layer(layer);
        (router, readiness)
    }

    #[tokio::test]
    async fn operational_endpoints_report_service_state() {
        let (router, readiness) = demo_router();

        let health = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(health.status(), StatusCode::OK);

        let not_ready = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(not_ready.status(), StatusCode::SERVICE_UNAVAILABLE);

        readiness.store(true, Ordering::Release);
        let ready = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/ready")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(ready.status(), StatusCode::OK);

        let score = router
            .oneshot(
                Request::builder()
                    .uri("/health/score")
                    .header("x-tenant-id", "demo-tenant")
                    .body(Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        assert_eq!(score.status(), StatusCode::OK);
    }
}

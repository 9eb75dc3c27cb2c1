use crate::cli::ServeArgs;
use crate::infra::{AppState, SeededSnapshotProvider};
use crate::routes::with_health_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use govhealth::config::AppConfig;
use govhealth::error::AppError;
use govhealth::health::{
    CheckRegistry, HealthScanService, InMemoryRulesetStore, ScanServiceConfig,
};
use govhealth::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let registry = Arc::new(CheckRegistry::standard()?);
    let rulesets = Arc::new(InMemoryRulesetStore::new(registry.clone()));
    let provider = Arc::new(SeededSnapshotProvider::default());
    let scan_service = Arc::new(HealthScanService::new(
        registry,
        provider,
        rulesets,
        ScanServiceConfig {
            cache_ttl: config.scan.cache_ttl,
            snapshot_timeout: config.scan.snapshot_timeout,
            check_concurrency: config.scan.check_concurrency,
        },
    ));

    let app = with_health_routes(scan_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "governance health scanner ready");

    axum::serve(listener, app).await?;
    Ok(())
}

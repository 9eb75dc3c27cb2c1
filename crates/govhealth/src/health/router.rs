use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{ScannerVersion, TenantId};
use super::result::ScanResult;
use super::ruleset::{RulesetConfig, RulesetStore};
use super::service::{HealthScanService, ScanOutcome, ScanServiceError};
use super::snapshot::SnapshotProvider;

const TENANT_HEADER: &str = "x-tenant-id";

/// Router builder exposing the scoring and configuration endpoints.
pub fn health_router<P, R>(service: Arc<HealthScanService<P, R>>) -> Router
where
    P: SnapshotProvider + 'static,
    R: RulesetStore + 'static,
{
    Router::new()
        .route("/health/score", get(score_handler::<P, R>))
        .route("/health/scan", post(rescan_handler::<P, R>))
        .route(
            "/health/v2/ruleset",
            get(get_ruleset_handler::<P, R>).put(put_ruleset_handler::<P, R>),
        )
        .route(
            "/health/v2/ruleset/reset",
            post(reset_ruleset_handler::<P, R>),
        )
        .route("/health/version", put(select_version_handler::<P, R>))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScanQuery {
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionSelection {
    version: String,
}

/// Scan payload plus how it was served. `stale` marks a cached result handed
/// out because the record repository was unavailable.
#[derive(Debug, Serialize)]
pub(crate) struct ScanResponse {
    #[serde(flatten)]
    result: ScanResult,
    stale: bool,
    cache_hit: bool,
}

impl From<ScanOutcome> for ScanResponse {
    fn from(outcome: ScanOutcome) -> Self {
        Self {
            result: (*outcome.result).clone(),
            stale: outcome.stale,
            cache_hit: outcome.cache_hit,
        }
    }
}

fn tenant_from_headers(headers: &HeaderMap) -> Result<TenantId, Response> {
    let value = headers
        .get(TENANT_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    match value {
        Some(tenant) => Ok(TenantId(tenant.to_string())),
        None => Err(error_response(
            StatusCode::BAD_REQUEST,
            "missing_tenant",
            format!("request must carry a non-empty {TENANT_HEADER} header"),
        )),
    }
}

fn version_override(query: &ScanQuery) -> Result<Option<ScannerVersion>, Response> {
    match query.version.as_deref() {
        None | Some("") => Ok(None),
        Some(raw) => ScannerVersion::parse(raw).map(Some).ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "invalid_version",
                format!("unknown scanner version '{raw}', expected v1 or v2"),
            )
        }),
    }
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    (status, Json(json!({ "code": code, "error": message }))).into_response()
}

fn service_error_response(error: ScanServiceError) -> Response {
    match error {
        ScanServiceError::Config(inner) => error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_config",
            inner.to_string(),
        ),
        ScanServiceError::Snapshot(inner) => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "snapshot_unavailable",
            inner.to_string(),
        ),
        ScanServiceError::Store(inner) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", inner.to_string())
        }
    }
}

pub(crate) async fn score_handler<P, R>(
    State(service): State<Arc<HealthScanService<P, R>>>,
    Query(query): Query<ScanQuery>,
    headers: HeaderMap,
) -> Response
where
    P: SnapshotProvider + 'static,
    R: RulesetStore + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    let version = match version_override(&query) {
        Ok(version) => version,
        Err(response) => return response,
    };
    match service.score(&tenant, version).await {
        Ok(outcome) => (StatusCode::OK, Json(ScanResponse::from(outcome))).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn rescan_handler<P, R>(
    State(service): State<Arc<HealthScanService<P, R>>>,
    Query(query): Query<ScanQuery>,
    headers: HeaderMap,
) -> Response
where
    P: SnapshotProvider + 'static,
    R: RulesetStore + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    let version = match version_override(&query) {
        Ok(version) => version,
        Err(response) => return response,
    };
    match service.rescan(&tenant, version).await {
        Ok(outcome) => (StatusCode::OK, Json(ScanResponse::from(outcome))).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn get_ruleset_handler<P, R>(
    State(service): State<Arc<HealthScanService<P, R>>>,
    headers: HeaderMap,
) -> Response
where
    P: SnapshotProvider + 'static,
    R: RulesetStore + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    match service.ruleset(&tenant) {
        Ok(config) => (StatusCode::OK, Json(config)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn put_ruleset_handler<P, R>(
    State(service): State<Arc<HealthScanService<P, R>>>,
    headers: HeaderMap,
    Json(config): Json<RulesetConfig>,
) -> Response
where
    P: SnapshotProvider + 'static,
    R: RulesetStore + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    match service.update_ruleset(&tenant, config) {
        Ok(stored) => (StatusCode::OK, Json(stored)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn reset_ruleset_handler<P, R>(
    State(service): State<Arc<HealthScanService<P, R>>>,
    headers: HeaderMap,
) -> Response
where
    P: SnapshotProvider + 'static,
    R: RulesetStore + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    match service.reset_ruleset(&tenant) {
        Ok(stored) => (StatusCode::OK, Json(stored)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn select_version_handler<P, R>(
    State(service): State<Arc<HealthScanService<P, R>>>,
    headers: HeaderMap,
    Json(selection): Json<VersionSelection>,
) -> Response
where
    P: SnapshotProvider + 'static,
    R: RulesetStore + 'static,
{
    let tenant = match tenant_from_headers(&headers) {
        Ok(tenant) => tenant,
        Err(response) => return response,
    };
    match ScannerVersion::parse(&selection.version) {
        Some(version) => {
            service.select_version(&tenant, version);
            (StatusCode::OK, Json(json!({ "version": version }))).into_response()
        }
        None => error_response(
            StatusCode::BAD_REQUEST,
            "invalid_version",
            format!(
                "unknown scanner version '{}', expected v1 or v2",
                selection.version
            ),
        ),
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::catalog::CheckRegistry;
use super::domain::{ScannerVersion, TenantId};
use super::result::ScanResult;
use super::ruleset::{ConfigValidationError, RulesetConfig, RulesetStore, RulesetStoreError};
use super::scan;
use super::snapshot::{SnapshotError, SnapshotProvider};

/// Tunables for the scan path. Defaults match the documented contract: one
/// hour of result reuse, a ten second snapshot deadline, eight checks in
/// flight.
#[derive(Debug, Clone)]
pub struct ScanServiceConfig {
    pub cache_ttl: Duration,
    pub snapshot_timeout: Duration,
    pub check_concurrency: usize,
}

impl Default for ScanServiceConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(3600),
            snapshot_timeout: Duration::from_secs(10),
            check_concurrency: 8,
        }
    }
}

/// What the service hands back for a score request: the immutable result plus
/// how it was obtained.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub result: Arc<ScanResult>,
    pub stale: bool,
    pub cache_hit: bool,
}

/// Error raised by the scan service facade.
#[derive(Debug, thiserror::Error)]
pub enum ScanServiceError {
    #[error(transparent)]
    Config(#[from] ConfigValidationError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Store(#[from] RulesetStoreError),
}

struct CachedScan {
    result: Arc<ScanResult>,
    cached_at: Instant,
    ruleset_revision: u64,
}

/// Facade composing the registry, snapshot provider, ruleset store, cache,
/// and orchestrator. One instance serves every tenant.
pub struct HealthScanService<P, R> {
    registry: Arc<CheckRegistry>,
    provider: Arc<P>,
    rulesets: Arc<R>,
    config: ScanServiceConfig,
    cache: Mutex<HashMap<TenantId, CachedScan>>,
    versions: Mutex<HashMap<TenantId, ScannerVersion>>,
    // One logical scan per tenant: overlapping callers queue here and observe
    // the first caller's cached result instead of computing a second one.
    // Entries in the cache, version, and lock maps live for the process
    // lifetime; they grow with distinct tenants seen, not with scan volume.
    scan_locks: Mutex<HashMap<TenantId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<P, R> HealthScanService<P, R>
where
    P: SnapshotProvider + 'static,
    R: RulesetStore + 'static,
{
    pub fn new(
        registry: Arc<CheckRegistry>,
        provider: Arc<P>,
        rulesets: Arc<R>,
        config: ScanServiceConfig,
    ) -> Self {
        Self {
            registry,
            provider,
            rulesets,
            config,
            cache: Mutex::new(HashMap::new()),
            versions: Mutex::new(HashMap::new()),
            scan_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Scanner version used for the tenant when the request carries no
    /// override.
    pub fn scanner_version(&self, tenant: &TenantId) -> ScannerVersion {
        self.versions
            .lock()
            .expect("version map mutex poisoned")
            .get(tenant)
            .copied()
            .unwrap_or_default()
    }

    pub fn select_version(&self, tenant: &TenantId, version: ScannerVersion) {
        info!(%tenant, ?version, "scanner version selected");
        self.versions
            .lock()
            .expect("version map mutex poisoned")
            .insert(tenant.clone(), version);
    }

    /// Latest cached-or-fresh score. Serves the cache when the entry is
    /// younger than the TTL and belongs to the current ruleset revision.
    pub async fn score(
        &self,
        tenant: &TenantId,
        version_override: Option<ScannerVersion>,
    ) -> Result<ScanOutcome, ScanServiceError> {
        self.scan_inner(tenant, version_override, false).await
    }

    /// Force a fresh scan, bypassing the cache unconditionally.
    pub async fn rescan(
        &self,
        tenant: &TenantId,
        version_override: Option<ScannerVersion>,
    ) -> Result<ScanOutcome, ScanServiceError> {
        self.scan_inner(tenant, version_override, true).await
    }

    async fn scan_inner(
        &self,
        tenant: &TenantId,
        version_override: Option<ScannerVersion>,
        force: bool,
    ) -> Result<ScanOutcome, ScanServiceError> {
        let version = version_override.unwrap_or_else(|| self.scanner_version(tenant));
        let ruleset = self.rulesets.load(tenant)?;

        if !force {
            if let Some(outcome) = self.cached(tenant, &ruleset, version) {
                return Ok(outcome);
            }
        }

        let lock = self.scan_lock(tenant);
        let _guard = lock.lock().await;

        // A queued caller lands here after the in-flight scan finished; its
        // result is the one logical result for this window.
        if !force {
            if let Some(outcome) = self.cached(tenant, &ruleset, version) {
                return Ok(outcome);
            }
        }

        let snapshot = match self.fetch_snapshot(tenant).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                // Never fabricate an empty score; fall back to the last known
                // result when one exists, marked stale.
                if let Some(previous) = self.last_cached(tenant) {
                    warn!(%tenant, %error, "snapshot unavailable, serving stale result");
                    return Ok(ScanOutcome {
                        result: previous,
                        stale: true,
                        cache_hit: true,
                    });
                }
                return Err(error.into());
            }
        };

        let result = Arc::new(
            scan::run_scan(
                &self.registry,
                Arc::new(snapshot),
                ruleset.clone(),
                version,
                self.config.check_concurrency,
            )
            .await,
        );

        self.cache.lock().expect("scan cache mutex poisoned").insert(
            tenant.clone(),
            CachedScan {
                result: Arc::clone(&result),
                cached_at: Instant::now(),
                ruleset_revision: ruleset.revision,
            },
        );

        Ok(ScanOutcome {
            result,
            stale: false,
            cache_hit: false,
        })
    }

    async fn fetch_snapshot(
        &self,
        tenant: &TenantId,
    ) -> Result<super::domain::RecordSnapshot, SnapshotError> {
        let deadline = self.config.snapshot_timeout;
        match tokio::time::timeout(deadline, self.provider.fetch(tenant)).await {
            Ok(result) => result,
            Err(_) => Err(SnapshotError::Timeout(deadline.as_millis() as u64)),
        }
    }

    fn cached(
        &self,
        tenant: &TenantId,
        ruleset: &RulesetConfig,
        version: ScannerVersion,
    ) -> Option<ScanOutcome> {
        let cache = self.cache.lock().expect("scan cache mutex poisoned");
        let entry = cache.get(tenant)?;
        let fresh = entry.cached_at.elapsed() < self.config.cache_ttl
            && entry.ruleset_revision == ruleset.revision
            && entry.result.version == version;
        fresh.then(|| ScanOutcome {
            result: Arc::clone(&entry.result),
            stale: false,
            cache_hit: true,
        })
    }

    fn last_cached(&self, tenant: &TenantId) -> Option<Arc<ScanResult>> {
        self.cache
            .lock()
            .expect("scan cache mutex poisoned")
            .get(tenant)
            .map(|entry| Arc::clone(&entry.result))
    }

    fn scan_lock(&self, tenant: &TenantId) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.scan_locks.lock().expect("scan lock mutex poisoned");
        Arc::clone(
            locks
                .entry(tenant.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Current persisted ruleset, or the documented defaults for a tenant
    /// that never wrote one.
    pub fn ruleset(&self, tenant: &TenantId) -> Result<RulesetConfig, ScanServiceError> {
        Ok(self.rulesets.load(tenant)?)
    }

    /// Validate and persist a ruleset write. The stored revision is bumped so
    /// cached scans from older configs stop matching.
    pub fn update_ruleset(
        &self,
        tenant: &TenantId,
        mut config: RulesetConfig,
    ) -> Result<RulesetConfig, ScanServiceError> {
        config.validate(&self.registry)?;
        let current = self.rulesets.load(tenant)?;
        config.revision = current.revision + 1;
        let stored = self.rulesets.save(tenant, config)?;
        info!(%tenant, revision = stored.revision, "ruleset updated");
        Ok(stored)
    }

    /// Restore the documented defaults, keeping the revision monotonic.
    pub fn reset_ruleset(&self, tenant: &TenantId) -> Result<RulesetConfig, ScanServiceError> {
        let current = self.rulesets.load(tenant)?;
        let mut defaults = RulesetConfig::defaults(&self.registry);
        defaults.revision = current.revision + 1;
        let stored = self.rulesets.save(tenant, defaults)?;
        info!(%tenant, revision = stored.revision, "ruleset reset to defaults");
        Ok(stored)
    }
}

/// In-memory ruleset store backed by a mutex-guarded map. Unknown tenants
/// read the documented defaults.
pub struct InMemoryRulesetStore {
    registry: Arc<CheckRegistry>,
    configs: Mutex<HashMap<TenantId, RulesetConfig>>,
}

impl InMemoryRulesetStore {
    pub fn new(registry: Arc<CheckRegistry>) -> Self {
        Self {
            registry,
            configs: Mutex::new(HashMap::new()),
        }
    }
}

impl RulesetStore for InMemoryRulesetStore {
    fn load(&self, tenant: &TenantId) -> Result<RulesetConfig, RulesetStoreError> {
        let configs = self.configs.lock().expect("ruleset store mutex poisoned");
        Ok(configs
            .get(tenant)
            .cloned()
            .unwrap_or_else(|| RulesetConfig::defaults(&self.registry)))
    }

    fn save(
        &self,
        tenant: &TenantId,
        config: RulesetConfig,
    ) -> Result<RulesetConfig, RulesetStoreError> {
        let mut configs = self.configs.lock().expect("ruleset store mutex poisoned");
        configs.insert(tenant.clone(), config.clone());
        Ok(config)
    }
}

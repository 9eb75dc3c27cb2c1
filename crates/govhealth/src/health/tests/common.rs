use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};

use crate::health::catalog::CheckRegistry;
use crate::health::domain::{
    Approval, FiscalDetails, GovernanceRecord, RecordId, RecordKind, RecordSnapshot, RecordStatus,
    TenantId,
};
use crate::health::service::{HealthScanService, InMemoryRulesetStore, ScanServiceConfig};
use crate::health::snapshot::{SnapshotError, SnapshotProvider};

pub(super) fn tenant() -> TenantId {
    TenantId("acme-holdings".to_string())
}

pub(super) fn record(id: &str, kind: RecordKind) -> GovernanceRecord {
    let stamp = Utc.with_ymd_and_hms(2026, 5, 15, 9, 0, 0).unwrap();
    GovernanceRecord {
        id: RecordId(id.to_string()),
        title: format!("Record {id}"),
        kind,
        status: RecordStatus::Finalized,
        owner: Some("clerk".to_string()),
        created_at: stamp,
        updated_at: stamp,
        approvals: vec![
            Approval {
                approver: "chair".to_string(),
                approved_at: stamp,
            },
            Approval {
                approver: "secretary".to_string(),
                approved_at: stamp,
            },
        ],
        revisions: Vec::new(),
        parent_id: None,
        expires_at: None,
        last_reviewed_at: Some(stamp),
        retention_policy: Some("7y".to_string()),
        fiscal: None,
        tags: vec!["board".to_string()],
    }
}

pub(super) fn healthy_snapshot() -> RecordSnapshot {
    let mut statement = record("fs-q1", RecordKind::FinancialStatement);
    statement.fiscal = Some(FiscalDetails {
        period_end: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
        reconciled: true,
    });
    RecordSnapshot {
        tenant_id: tenant(),
        taken_at: Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap(),
        records: vec![
            record("minutes-q2", RecordKind::MeetingMinutes),
            record("policy-privacy", RecordKind::Policy),
            record("risk-annual", RecordKind::RiskAssessment),
            statement,
        ],
    }
}

pub(super) fn snapshot_with_orphans(count: usize) -> RecordSnapshot {
    let mut snapshot = healthy_snapshot();
    for index in 0..count {
        let mut orphan = record(&format!("orphan-{index}"), RecordKind::Resolution);
        orphan.parent_id = Some(RecordId("gone".to_string()));
        snapshot.records.push(orphan);
    }
    snapshot
}

/// Provider returning a fixed snapshot, counting fetches and optionally
/// pausing so tests can overlap callers.
pub(super) struct StaticSnapshotProvider {
    snapshot: RecordSnapshot,
    delay: Option<Duration>,
    fetches: AtomicUsize,
}

impl StaticSnapshotProvider {
    pub(super) fn new(snapshot: RecordSnapshot) -> Self {
        Self {
            snapshot,
            delay: None,
            fetches: AtomicUsize::new(0),
        }
    }

    pub(super) fn with_delay(snapshot: RecordSnapshot, delay: Duration) -> Self {
        Self {
            snapshot,
            delay: Some(delay),
            fetches: AtomicUsize::new(0),
        }
    }

    pub(super) fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotProvider for StaticSnapshotProvider {
    async fn fetch(&self, _tenant: &TenantId) -> Result<RecordSnapshot, SnapshotError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.snapshot.clone())
    }
}

/// Provider that fails every fetch, standing in for an unreachable record
/// repository.
pub(super) struct UnavailableSnapshotProvider;

#[async_trait]
impl SnapshotProvider for UnavailableSnapshotProvider {
    async fn fetch(&self, _tenant: &TenantId) -> Result<RecordSnapshot, SnapshotError> {
        Err(SnapshotError::Unreachable("connection refused".to_string()))
    }
}

/// Provider whose repository can be taken offline mid-test.
pub(super) struct FlakySnapshotProvider {
    snapshot: RecordSnapshot,
    offline: std::sync::atomic::AtomicBool,
}

impl FlakySnapshotProvider {
    pub(super) fn new(snapshot: RecordSnapshot) -> Self {
        Self {
            snapshot,
            offline: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub(super) fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotProvider for FlakySnapshotProvider {
    async fn fetch(&self, _tenant: &TenantId) -> Result<RecordSnapshot, SnapshotError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SnapshotError::Unreachable("repository offline".to_string()));
        }
        Ok(self.snapshot.clone())
    }
}

pub(super) fn service_with<P: SnapshotProvider + 'static>(
    provider: Arc<P>,
    config: ScanServiceConfig,
) -> Arc<HealthScanService<P, InMemoryRulesetStore>> {
    let registry = Arc::new(CheckRegistry::standard().expect("catalog builds"));
    let rulesets = Arc::new(InMemoryRulesetStore::new(Arc::clone(&registry)));
    Arc::new(HealthScanService::new(registry, provider, rulesets, config))
}

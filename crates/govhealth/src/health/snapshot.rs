use async_trait::async_trait;

use super::domain::{RecordSnapshot, TenantId};

/// Failure to obtain a corpus snapshot. The scan aborts on these; a fabricated
/// empty score is never reported in their place.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("record repository unreachable: {0}")]
    Unreachable(String),
    #[error("snapshot fetch timed out after {0} ms")]
    Timeout(u64),
    #[error("unknown tenant '{0}'")]
    UnknownTenant(String),
}

/// Read-only access to the external record repository. Fetching is the only
/// suspending step in a scan and is wrapped in a deadline by the caller.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn fetch(&self, tenant: &TenantId) -> Result<RecordSnapshot, SnapshotError>;
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engagement_core::{IntegrationKind, Result, TenantId};
use engagement_core::model::SyncState;

/// Returned by `try_begin` when a sync is already running for this
/// `(tenant, integration_kind)` — the caller must coalesce rather than
/// dispatch a second job (spec §4.2 per-tenant concurrency).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyRunning;

/// Outcome recorded by `complete`, applied atomically to the row that
/// `try_begin` put into `Running`.
#[derive(Debug, Clone)]
pub struct SyncCompletion {
    pub new_cursor: Option<String>,
    pub succeeded: bool,
    /// A transient failure must never advance `last_successful_sync` or
    /// the cursor (invariant I7).
    pub terminated_transiently: bool,
    pub completed_at: DateTime<Utc>,
}

/// §6.3 "Sync States" table, also the mutex Sync Orchestrator
/// serializes on: `try_begin` is the compare-and-set described in spec
/// §4.2 ("Sync State acts as the mutex via a compare-and-set on its mode
/// field").
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    async fn get(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
    ) -> Result<Option<SyncState>>;

    /// Fetches the row for `(tenant, integration_kind)`, creating an idle
    /// one lazily if it doesn't exist yet (spec §3: "Sync State is
    /// created lazily on first sync").
    async fn get_or_create(&self, tenant: &TenantId, integration: IntegrationKind) -> Result<SyncState>;

    /// Atomically transitions `idle -> running`. Returns `Err(AlreadyRunning)`
    /// without mutating state if the row is already `running`.
    async fn try_begin(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
    ) -> Result<std::result::Result<SyncState, AlreadyRunning>>;

    /// Transitions `running -> idle`, applying `outcome`. A transient
    /// termination leaves cursor and `last_successful_sync` untouched but
    /// still clears the mutex and bumps `consecutive_errors`.
    async fn complete(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
        outcome: SyncCompletion,
    ) -> Result<()>;
}

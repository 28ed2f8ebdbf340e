use async_trait::async_trait;
use chrono::Duration;
use engagement_core::TenantId;

use crate::mode::SelectedMode;

/// The per-integration worker spec §1 treats as an external collaborator
/// ("specific third-party REST APIs ... out of scope"). C2 dispatches a
/// job to one of these; it never talks to a provider directly.
#[async_trait]
pub trait SyncExecutor: Send + Sync {
    async fn run(&self, ctx: SyncJobContext) -> std::result::Result<SyncSummary, SyncJobError>;
}

#[derive(Debug, Clone)]
pub struct SyncJobContext {
    pub tenant: TenantId,
    pub mode: SelectedMode,
    pub access_secret: String,
    /// Outbound deadline; 30s default for REST (spec §5).
    pub deadline: Duration,
}

/// Spec §4.2's result contract: "`{ mode, items_considered,
/// items_upserted, items_skipped, errors: [{external_id, reason}] }`".
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SyncSummary {
    pub items_considered: u32,
    pub items_upserted: u32,
    pub items_skipped: u32,
    pub errors: Vec<SyncItemError>,
    /// Opaque cursor to persist for the next incremental run, if the job
    /// advanced one.
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncItemError {
    pub external_id: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub enum SyncJobError {
    /// Timeout, 5xx, rate limit — spec §5: "exceeding deadline MUST NOT
    /// advance Sync State cursor", handled by the orchestrator refusing
    /// to persist `next_cursor` on this variant.
    Transient(String),
    /// Schema violation or other non-retryable failure.
    Permanent(String),
}

impl SyncJobError {
    pub fn message(&self) -> &str {
        match self {
            Self::Transient(m) | Self::Permanent(m) => m,
        }
    }
}

use async_trait::async_trait;
use engagement_core::{Result, TenantId, WorkQueueItemId};
use engagement_core::model::WorkQueueItem;

/// §6.3 "Work Queue" table: `pending -> processing -> completed|failed`,
/// transitions monotonic except `failed -> pending` on retry (spec §3).
/// C5 drains this in `incremental` mode; C2's `enqueue_retry` pushes
/// soft-failure retries onto it.
#[async_trait]
pub trait WorkQueueStore: Send + Sync {
    async fn enqueue(&self, item: WorkQueueItem) -> Result<()>;

    /// Atomically claims up to `limit` `pending` items for `tenant`
    /// (or any tenant if `None`), transitioning them to `processing`, and
    /// returns them in FIFO (`created_at`) order.
    async fn claim_batch(&self, tenant: Option<&TenantId>, limit: usize) -> Result<Vec<WorkQueueItem>>;

    async fn complete(&self, id: &WorkQueueItemId) -> Result<()>;

    /// Records failure without automatic retry (spec §4.5: "no automatic
    /// retry is performed by C5; retries are a separate concern").
    async fn fail(&self, id: &WorkQueueItemId, error: &str) -> Result<()>;

    /// `failed -> pending` for a caller-driven retry (used by C2's
    /// `enqueue_retry` backoff path).
    async fn retry(&self, id: &WorkQueueItemId) -> Result<()>;

    async fn get(&self, id: &WorkQueueItemId) -> Result<Option<WorkQueueItem>>;
}

use async_trait::async_trait;
use engagement_core::model::{GlobalTopic, TopicSource};
use engagement_core::{GlobalTopicId, Result, TenantId};

/// §6.3 "Global Topics + Sources". `add_source` is the unique-constraint
/// seam spec §5 calls out ("concurrent inserts ... for the same
/// `(meeting_id, topic_index)` must serialize via a unique constraint"):
/// it returns `false` instead of appending when that pair already
/// contributed a source row, giving C5 its idempotency (spec §4.5).
#[async_trait]
pub trait TopicStore: Send + Sync {
    /// Non-archived, non-deleted topics for the tenant (the clustering
    /// candidate set).
    async fn list_active(&self, tenant: &TenantId) -> Result<Vec<GlobalTopic>>;

    async fn get(&self, id: &GlobalTopicId) -> Result<Option<GlobalTopic>>;

    async fn create(&self, topic: GlobalTopic) -> Result<GlobalTopicId>;

    /// Appends `source` to `topic_id`'s source set and bumps
    /// `source_count`/`last_seen`. Returns `false` (no-op) if
    /// `(meeting_id, topic_index)` was already recorded.
    async fn add_source(
        &self,
        topic_id: &GlobalTopicId,
        source: TopicSource,
        seen_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<bool>;

    async fn update_scores(
        &self,
        topic_id: &GlobalTopicId,
        frequency_score: f64,
        recency_score: f64,
        relevance_score: f64,
    ) -> Result<()>;

    /// The largest `source_count` across the tenant's active topics,
    /// used as the frequency-score denominator (spec §4.5); `0` if there
    /// are none.
    async fn max_source_count(&self, tenant: &TenantId) -> Result<u32>;
}

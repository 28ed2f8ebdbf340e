//! C5 — clustering incoming topic records into canonical Global Topics,
//! scoring relevance, and draining the queue-driven `incremental` mode
//! idempotently (spec §4.5).

use std::sync::Arc;

use engagement_core::model::{GlobalTopic, TopicSource, WorkQueueItem};
use engagement_core::{Clock, CoreConfig, CoreError, GlobalTopicId, Result, TenantId, WorkQueueItemId};
use engagement_store::{TopicStore, WorkQueueStore};

use crate::incoming::IncomingTopic;
use crate::similarity::similarity;

#[derive(Debug, Clone, PartialEq)]
pub enum AggregationOutcome {
    /// Appended as a new source on an existing Global Topic.
    Merged { topic_id: GlobalTopicId, similarity: f64 },
    /// No existing Global Topic cleared the threshold; a new one was created.
    Created { topic_id: GlobalTopicId },
    /// `(meeting_id, topic_index)` was already present on some active
    /// Global Topic — a no-op re-run (spec §4.5 idempotency clause).
    AlreadyProcessed { topic_id: GlobalTopicId },
}

impl AggregationOutcome {
    pub fn topic_id(&self) -> &GlobalTopicId {
        match self {
            Self::Merged { topic_id, .. } => topic_id,
            Self::Created { topic_id } => topic_id,
            Self::AlreadyProcessed { topic_id } => topic_id,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub claimed: usize,
    pub completed: usize,
    pub failed: usize,
    pub tenants_rescored: usize,
}

/// Drives clustering and relevance scoring for one tenant's Global
/// Topics, backed by any `TopicStore` + `WorkQueueStore` implementation.
pub struct TopicAggregator {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub config: CoreConfig,
}

/// The two tables C5 touches, bundled so callers only need to hand the
/// aggregator one `Arc` (mirrors `engagement_store::Store`'s blanket
/// supertrait pattern at a narrower scope).
pub trait Store: TopicStore + WorkQueueStore + Send + Sync {}
impl<T> Store for T where T: TopicStore + WorkQueueStore + Send + Sync {}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

impl TopicAggregator {
    /// Enqueues one incoming topic record for later `run_incremental`
    /// draining.
    pub async fn enqueue(&self, topic: IncomingTopic) -> Result<WorkQueueItemId> {
        let subject_ref = serde_json::to_string(&topic)
            .map_err(|e| CoreError::validation(format!("cannot serialize incoming topic: {e}")))?;
        let item = WorkQueueItem::new(topic.tenant.clone(), subject_ref, self.clock.now());
        let id = item.id.clone();
        self.store.enqueue(item).await?;
        Ok(id)
    }

    /// `single` mode: process every topic of one meeting directly,
    /// skipping the queue, then rescore the tenant once.
    pub async fn run_single(&self, topics: Vec<IncomingTopic>) -> Result<Vec<AggregationOutcome>> {
        let mut outcomes = Vec::with_capacity(topics.len());
        let mut tenant: Option<TenantId> = None;
        for topic in topics {
            tenant = Some(topic.tenant.clone());
            outcomes.push(self.ingest_one(&topic).await?);
        }
        if let Some(tenant) = tenant {
            self.rescore_tenant(&tenant).await?;
        }
        Ok(outcomes)
    }

    /// `incremental` mode: claims up to `batch_size_topics` pending work
    /// queue items (spanning all tenants), ingests each, then rescores
    /// every tenant touched by the batch exactly once.
    pub async fn run_incremental(&self) -> Result<BatchReport> {
        let items = self
            .store
            .claim_batch(None, self.config.batch_size_topics)
            .await?;
        let mut report = BatchReport {
            claimed: items.len(),
            ..Default::default()
        };
        let mut touched_tenants: Vec<TenantId> = Vec::new();

        for item in items {
            match self.process_queue_item(&item).await {
                Ok(_outcome) => {
                    self.store.complete(&item.id).await?;
                    report.completed += 1;
                    if !touched_tenants.contains(&item.tenant) {
                        touched_tenants.push(item.tenant.clone());
                    }
                }
                Err(err) => {
                    tracing::warn!(item = %item.id, error = %err, "topic aggregation item failed");
                    self.store.fail(&item.id, &err.to_string()).await?;
                    report.failed += 1;
                }
            }
        }

        for tenant in &touched_tenants {
            self.rescore_tenant(tenant).await?;
        }
        report.tenants_rescored = touched_tenants.len();
        Ok(report)
    }

    /// `full` mode: no new topics are ingested, every active Global
    /// Topic for the tenant is simply rescored (spec §4.5: "re-scan all
    /// topics for a tenant").
    pub async fn run_full(&self, tenant: &TenantId) -> Result<usize> {
        self.rescore_tenant(tenant).await
    }

    async fn process_queue_item(&self, item: &WorkQueueItem) -> Result<AggregationOutcome> {
        let topic: IncomingTopic = serde_json::from_str(&item.subject_ref)
            .map_err(|e| CoreError::validation(format!("malformed queue item payload: {e}")))?;
        self.ingest_one(&topic).await
    }

    /// The clustering step itself: find the best-matching active Global
    /// Topic, merge into it if similarity clears the threshold, otherwise
    /// create a new one (spec §4.5 "Clustering").
    pub async fn ingest_one(&self, topic: &IncomingTopic) -> Result<AggregationOutcome> {
        let active = self.store.list_active(&topic.tenant).await?;

        if let Some(existing) = active
            .iter()
            .find(|g| g.already_has_source(&topic.meeting_id, topic.topic_index))
        {
            return Ok(AggregationOutcome::AlreadyProcessed {
                topic_id: existing.id.clone(),
            });
        }

        let incoming_text = topic.blended_text();
        let best = active
            .iter()
            .map(|g| (g.id.clone(), similarity(&incoming_text, &g.blended_text())))
            .fold(None, |best: Option<(GlobalTopicId, f64)>, candidate| {
                match &best {
                    Some((_, best_sim)) if *best_sim >= candidate.1 => best,
                    _ => Some(candidate),
                }
            });

        if let Some((topic_id, sim)) = best {
            if sim >= self.config.similarity_threshold {
                let source = TopicSource {
                    meeting_id: topic.meeting_id.clone(),
                    topic_index: topic.topic_index,
                    similarity_score: sim,
                };
                let appended = self
                    .store
                    .add_source(&topic_id, source, topic.meeting_date)
                    .await?;
                return Ok(if appended {
                    AggregationOutcome::Merged {
                        topic_id,
                        similarity: sim,
                    }
                } else {
                    AggregationOutcome::AlreadyProcessed { topic_id }
                });
            }
        }

        let mut new_topic = GlobalTopic::new(
            topic.tenant.clone(),
            topic.title.clone(),
            topic.description.clone(),
            topic.meeting_date,
        );
        new_topic.sources.push(TopicSource {
            meeting_id: topic.meeting_id.clone(),
            topic_index: topic.topic_index,
            similarity_score: 1.0,
        });
        new_topic.source_count = 1;
        new_topic.last_seen = topic.meeting_date;
        let topic_id = self.store.create(new_topic).await?;
        Ok(AggregationOutcome::Created { topic_id })
    }

    /// Relevance scoring (spec §4.5 "Relevance scoring"): recomputes
    /// frequency/recency/relevance for every active Global Topic of
    /// `tenant`, rounded to 4 decimals (invariants I8/I9).
    async fn rescore_tenant(&self, tenant: &TenantId) -> Result<usize> {
        let active = self.store.list_active(tenant).await?;
        let max_source_count = self.store.max_source_count(tenant).await?;
        let now = self.clock.now();

        for topic in &active {
            let frequency = if max_source_count == 0 {
                0.0
            } else {
                topic.source_count as f64 / max_source_count as f64
            };
            let days = (now - topic.last_seen).num_seconds() as f64 / 86_400.0;
            let recency = (1.0 - days / 90.0).max(0.0);
            let relevance = 0.4 * frequency + 0.6 * recency;

            self.store
                .update_scores(&topic.id, round4(frequency), round4(recency), round4(relevance))
                .await?;
        }
        Ok(active.len())
    }
}

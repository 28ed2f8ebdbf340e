//! Reference implementation of every logical table in §6.3, backed by
//! `std::sync::RwLock<HashMap<..>>`. No operation here awaits anything,
//! so locks are always released before a `.await` point; the trait
//! methods are `async fn` purely so a future database-backed
//! implementation (sqlx/postgres) can be swapped in without touching
//! call sites.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engagement_core::model::{
    AiFeedback, AiSuggestion, ConnectionStatus, EntityMapping, EventLedgerEntry, GlobalTopic,
    IntegrationCredential, OAuthState, OrgAiPreferences, OutcomeMeasurement, ProcessingResult,
    SyncMode, SyncState, TopicSource, UserAiPreferences, WorkQueueItem, WorkQueueStatus,
};
use engagement_core::{
    CoreError, FeedbackId, GlobalTopicId, IntegrationKind, Result, SuggestionId, TenantId, UserId,
    WorkQueueItemId,
};

use crate::ai::{AiFeedbackStore, AiSuggestionStore};
use crate::credentials::CredentialStore;
use crate::internal_record::{InternalRecord, InternalRecordStore};
use crate::ledger::{EventLedgerStore, InsertOutcome};
use crate::mapping::EntityMappingStore;
use crate::oauth_state::OAuthStateStore;
use crate::preferences::{OrgPreferencesStore, UserPreferencesStore};
use crate::queue::WorkQueueStore;
use crate::sync_state::{AlreadyRunning, SyncCompletion, SyncStateStore};
use crate::topics::TopicStore;

type CredKey = (TenantId, IntegrationKind);
type MappingKey = (String, String, String, String);
type LedgerKey = (String, String);
type RecordKey = (String, String, String);

#[derive(Default)]
pub struct InMemoryStore {
    credentials: RwLock<HashMap<CredKey, IntegrationCredential>>,
    oauth_states: RwLock<HashMap<String, OAuthState>>,
    sync_states: RwLock<HashMap<CredKey, SyncState>>,
    mappings: RwLock<HashMap<MappingKey, EntityMapping>>,
    internal_records: RwLock<HashMap<RecordKey, InternalRecord>>,
    ledger: RwLock<HashMap<LedgerKey, EventLedgerEntry>>,
    queue: RwLock<HashMap<WorkQueueItemId, WorkQueueItem>>,
    topics: RwLock<HashMap<GlobalTopicId, GlobalTopic>>,
    suggestions: RwLock<HashMap<SuggestionId, AiSuggestion>>,
    feedback: RwLock<HashMap<FeedbackId, AiFeedback>>,
    user_prefs: RwLock<HashMap<(TenantId, UserId), UserAiPreferences>>,
    org_prefs: RwLock<HashMap<TenantId, OrgAiPreferences>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn mapping_key(tenant: &str, system: &str, kind: &str, external_id: &str) -> MappingKey {
    (
        tenant.to_string(),
        system.to_string(),
        kind.to_string(),
        external_id.to_string(),
    )
}

// ---------------------------------------------------------------- C1

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn get(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
    ) -> Result<Option<IntegrationCredential>> {
        Ok(self
            .credentials
            .read()
            .unwrap()
            .get(&(tenant.clone(), integration))
            .cloned())
    }

    async fn upsert(&self, credential: IntegrationCredential) -> Result<()> {
        let key = (credential.tenant.clone(), credential.integration_kind);
        self.credentials.write().unwrap().insert(key, credential);
        Ok(())
    }

    async fn list_active(&self, integration: IntegrationKind) -> Result<Vec<IntegrationCredential>> {
        Ok(self
            .credentials
            .read()
            .unwrap()
            .values()
            .filter(|c| c.integration_kind == integration && c.status == ConnectionStatus::Active)
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------- OAuth

#[async_trait]
impl OAuthStateStore for InMemoryStore {
    async fn create(&self, state: OAuthState) -> Result<()> {
        self.oauth_states
            .write()
            .unwrap()
            .insert(state.token.clone(), state);
        Ok(())
    }

    async fn consume(&self, token: &str) -> Result<Option<OAuthState>> {
        Ok(self.oauth_states.write().unwrap().remove(token))
    }
}

// ---------------------------------------------------------------- C2

#[async_trait]
impl SyncStateStore for InMemoryStore {
    async fn get(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
    ) -> Result<Option<SyncState>> {
        Ok(self
            .sync_states
            .read()
            .unwrap()
            .get(&(tenant.clone(), integration))
            .cloned())
    }

    async fn get_or_create(&self, tenant: &TenantId, integration: IntegrationKind) -> Result<SyncState> {
        let key = (tenant.clone(), integration);
        let mut states = self.sync_states.write().unwrap();
        Ok(states
            .entry(key)
            .or_insert_with(|| SyncState::new(tenant.clone(), integration))
            .clone())
    }

    async fn try_begin(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
    ) -> Result<std::result::Result<SyncState, AlreadyRunning>> {
        let key = (tenant.clone(), integration);
        let mut states = self.sync_states.write().unwrap();
        let entry = states
            .entry(key)
            .or_insert_with(|| SyncState::new(tenant.clone(), integration));
        if entry.mode == SyncMode::Running {
            return Ok(Err(AlreadyRunning));
        }
        entry.mode = SyncMode::Running;
        Ok(Ok(entry.clone()))
    }

    async fn complete(
        &self,
        tenant: &TenantId,
        integration: IntegrationKind,
        outcome: SyncCompletion,
    ) -> Result<()> {
        let key = (tenant.clone(), integration);
        let mut states = self.sync_states.write().unwrap();
        let entry = states
            .entry(key)
            .or_insert_with(|| SyncState::new(tenant.clone(), integration));
        entry.mode = SyncMode::Idle;
        if outcome.succeeded {
            entry.consecutive_errors = 0;
            if !outcome.terminated_transiently {
                entry.last_successful_sync = Some(outcome.completed_at);
                if outcome.new_cursor.is_some() {
                    entry.cursor = outcome.new_cursor;
                }
            }
        } else {
            entry.consecutive_errors += 1;
            // invariant I7: transient (or any non-success) termination
            // never advances the cursor or last_successful_sync.
        }
        Ok(())
    }
}

// ---------------------------------------------------------------- C3

#[async_trait]
impl EntityMappingStore for InMemoryStore {
    async fn find_by_external_id(
        &self,
        tenant: &str,
        external_system: &str,
        external_entity_kind: &str,
        external_id: &str,
    ) -> Result<Option<EntityMapping>> {
        let key = mapping_key(tenant, external_system, external_entity_kind, external_id);
        Ok(self.mappings.read().unwrap().get(&key).cloned())
    }

    async fn upsert(&self, mapping: EntityMapping) -> Result<()> {
        let key = mapping_key(
            mapping.tenant.as_ref(),
            &mapping.external_system,
            &mapping.external_entity_kind,
            &mapping.external_id,
        );
        self.mappings.write().unwrap().insert(key, mapping);
        Ok(())
    }

    async fn mark_soft_deleted(
        &self,
        tenant: &str,
        external_system: &str,
        external_entity_kind: &str,
        external_id: &str,
    ) -> Result<Option<EntityMapping>> {
        let key = mapping_key(tenant, external_system, external_entity_kind, external_id);
        let mut mappings = self.mappings.write().unwrap();
        if let Some(m) = mappings.get_mut(&key) {
            m.soft_deleted = true;
            Ok(Some(m.clone()))
        } else {
            Ok(None)
        }
    }
}

#[async_trait]
impl InternalRecordStore for InMemoryStore {
    async fn get(&self, tenant: &str, table: &str, id: &str) -> Result<Option<InternalRecord>> {
        let key = (tenant.to_string(), table.to_string(), id.to_string());
        Ok(self.internal_records.read().unwrap().get(&key).cloned())
    }

    async fn upsert(&self, record: InternalRecord) -> Result<()> {
        let key = (record.tenant.clone(), record.table.clone(), record.id.clone());
        self.internal_records.write().unwrap().insert(key, record);
        Ok(())
    }

    async fn find_by_natural_key(
        &self,
        tenant: &str,
        table: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<InternalRecord>> {
        let needle = value.to_lowercase();
        Ok(self
            .internal_records
            .read()
            .unwrap()
            .values()
            .find(|r| {
                r.tenant == tenant
                    && r.table == table
                    && r.data
                        .get(field)
                        .and_then(|v| v.as_str())
                        .map(|v| v.to_lowercase() == needle)
                        .unwrap_or(false)
            })
            .cloned())
    }
}

#[async_trait]
impl EventLedgerStore for InMemoryStore {
    async fn get(
        &self,
        external_system: &str,
        external_event_id: &str,
    ) -> Result<Option<EventLedgerEntry>> {
        let key = (external_system.to_string(), external_event_id.to_string());
        Ok(self.ledger.read().unwrap().get(&key).cloned())
    }

    async fn insert_if_absent(&self, entry: EventLedgerEntry) -> Result<InsertOutcome> {
        let key = (entry.external_system.clone(), entry.external_event_id.clone());
        let mut ledger = self.ledger.write().unwrap();
        if ledger.contains_key(&key) {
            Ok(InsertOutcome::Duplicate)
        } else {
            ledger.insert(key, entry);
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn update_result(
        &self,
        external_system: &str,
        external_event_id: &str,
        result: ProcessingResult,
    ) -> Result<()> {
        let key = (external_system.to_string(), external_event_id.to_string());
        if let Some(entry) = self.ledger.write().unwrap().get_mut(&key) {
            entry.processing_result = result;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------- queue

#[async_trait]
impl WorkQueueStore for InMemoryStore {
    async fn enqueue(&self, item: WorkQueueItem) -> Result<()> {
        self.queue.write().unwrap().insert(item.id.clone(), item);
        Ok(())
    }

    async fn claim_batch(&self, tenant: Option<&TenantId>, limit: usize) -> Result<Vec<WorkQueueItem>> {
        let mut queue = self.queue.write().unwrap();
        let mut candidates: Vec<_> = queue
            .values()
            .filter(|i| i.status == WorkQueueStatus::Pending)
            .filter(|i| tenant.map(|t| &i.tenant == t).unwrap_or(true))
            .map(|i| (i.id.clone(), i.created_at))
            .collect();
        candidates.sort_by_key(|(_, created_at)| *created_at);
        candidates.truncate(limit);

        let mut claimed = Vec::with_capacity(candidates.len());
        for (id, _) in candidates {
            if let Some(item) = queue.get_mut(&id) {
                item.status = WorkQueueStatus::Processing;
                claimed.push(item.clone());
            }
        }
        Ok(claimed)
    }

    async fn complete(&self, id: &WorkQueueItemId) -> Result<()> {
        let mut queue = self.queue.write().unwrap();
        let item = queue
            .get_mut(id)
            .ok_or_else(|| CoreError::validation("unknown work queue item"))?;
        item.status = WorkQueueStatus::Completed;
        item.processed_at = Some(Utc::now());
        Ok(())
    }

    async fn fail(&self, id: &WorkQueueItemId, error: &str) -> Result<()> {
        let mut queue = self.queue.write().unwrap();
        let item = queue
            .get_mut(id)
            .ok_or_else(|| CoreError::validation("unknown work queue item"))?;
        item.status = WorkQueueStatus::Failed;
        item.attempts += 1;
        item.last_error = Some(error.to_string());
        Ok(())
    }

    async fn retry(&self, id: &WorkQueueItemId) -> Result<()> {
        let mut queue = self.queue.write().unwrap();
        let item = queue
            .get_mut(id)
            .ok_or_else(|| CoreError::validation("unknown work queue item"))?;
        if item.status == WorkQueueStatus::Failed {
            item.status = WorkQueueStatus::Pending;
        }
        Ok(())
    }

    async fn get(&self, id: &WorkQueueItemId) -> Result<Option<WorkQueueItem>> {
        Ok(self.queue.read().unwrap().get(id).cloned())
    }
}

// ---------------------------------------------------------------- C5

#[async_trait]
impl TopicStore for InMemoryStore {
    async fn list_active(&self, tenant: &TenantId) -> Result<Vec<GlobalTopic>> {
        Ok(self
            .topics
            .read()
            .unwrap()
            .values()
            .filter(|t| &t.tenant == tenant && t.is_active())
            .cloned()
            .collect())
    }

    async fn get(&self, id: &GlobalTopicId) -> Result<Option<GlobalTopic>> {
        Ok(self.topics.read().unwrap().get(id).cloned())
    }

    async fn create(&self, topic: GlobalTopic) -> Result<GlobalTopicId> {
        let id = topic.id.clone();
        self.topics.write().unwrap().insert(id.clone(), topic);
        Ok(id)
    }

    async fn add_source(
        &self,
        topic_id: &GlobalTopicId,
        source: TopicSource,
        seen_at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut topics = self.topics.write().unwrap();
        let topic = topics
            .get_mut(topic_id)
            .ok_or_else(|| CoreError::validation("unknown global topic"))?;
        if topic.already_has_source(&source.meeting_id, source.topic_index) {
            return Ok(false);
        }
        topic.sources.push(source);
        topic.source_count = topic.sources.len() as u32;
        if seen_at > topic.last_seen {
            topic.last_seen = seen_at;
        }
        Ok(true)
    }

    async fn update_scores(
        &self,
        topic_id: &GlobalTopicId,
        frequency_score: f64,
        recency_score: f64,
        relevance_score: f64,
    ) -> Result<()> {
        let mut topics = self.topics.write().unwrap();
        let topic = topics
            .get_mut(topic_id)
            .ok_or_else(|| CoreError::validation("unknown global topic"))?;
        topic.frequency_score = frequency_score;
        topic.recency_score = recency_score;
        topic.relevance_score = relevance_score;
        Ok(())
    }

    async fn max_source_count(&self, tenant: &TenantId) -> Result<u32> {
        Ok(self
            .topics
            .read()
            .unwrap()
            .values()
            .filter(|t| &t.tenant == tenant && t.is_active())
            .map(|t| t.source_count)
            .max()
            .unwrap_or(0))
    }
}

// ---------------------------------------------------------------- C4

#[async_trait]
impl AiSuggestionStore for InMemoryStore {
    async fn insert(&self, suggestion: AiSuggestion) -> Result<()> {
        self.suggestions
            .write()
            .unwrap()
            .insert(suggestion.id.clone(), suggestion);
        Ok(())
    }

    async fn get(&self, id: &SuggestionId) -> Result<Option<AiSuggestion>> {
        Ok(self.suggestions.read().unwrap().get(id).cloned())
    }
}

#[async_trait]
impl AiFeedbackStore for InMemoryStore {
    async fn insert(&self, feedback: AiFeedback) -> Result<()> {
        self.feedback
            .write()
            .unwrap()
            .insert(feedback.id.clone(), feedback);
        Ok(())
    }

    async fn get(&self, id: &FeedbackId) -> Result<Option<AiFeedback>> {
        Ok(self.feedback.read().unwrap().get(id).cloned())
    }

    async fn set_outcome(&self, id: &FeedbackId, outcome: OutcomeMeasurement) -> Result<()> {
        let mut feedback = self.feedback.write().unwrap();
        let row = feedback
            .get_mut(id)
            .ok_or_else(|| CoreError::validation("unknown feedback row"))?;
        if row.outcome.measured {
            // idempotent: outcome may be set exactly once (spec §4.4.4).
            return Ok(());
        }
        row.outcome = outcome;
        Ok(())
    }
}

#[async_trait]
impl UserPreferencesStore for InMemoryStore {
    async fn get(&self, tenant: &TenantId, user: &UserId) -> Result<Option<UserAiPreferences>> {
        Ok(self
            .user_prefs
            .read()
            .unwrap()
            .get(&(tenant.clone(), user.clone()))
            .cloned())
    }

    async fn save(&self, prefs: UserAiPreferences) -> Result<()> {
        let key = (prefs.tenant.clone(), prefs.user.clone());
        self.user_prefs.write().unwrap().insert(key, prefs);
        Ok(())
    }
}

#[async_trait]
impl OrgPreferencesStore for InMemoryStore {
    async fn get(&self, tenant: &TenantId) -> Result<Option<OrgAiPreferences>> {
        Ok(self.org_prefs.read().unwrap().get(tenant).cloned())
    }

    async fn save(&self, prefs: OrgAiPreferences) -> Result<()> {
        self.org_prefs
            .write()
            .unwrap()
            .insert(prefs.tenant.clone(), prefs);
        Ok(())
    }
}

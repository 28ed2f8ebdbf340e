//! §6.3 persisted state layout: one trait per logical table plus an
//! in-memory reference implementation. Every `engagement-*` component
//! crate depends on this crate's traits, never on `InMemoryStore`
//! directly, so a future sqlx-backed implementation is a drop-in swap.

pub mod ai;
pub mod credentials;
pub mod inmemory;
pub mod internal_record;
pub mod ledger;
pub mod mapping;
pub mod oauth_state;
pub mod preferences;
pub mod queue;
pub mod sync_state;
pub mod topics;

pub use ai::{AiFeedbackStore, AiSuggestionStore};
pub use credentials::CredentialStore;
pub use inmemory::InMemoryStore;
pub use internal_record::{InternalRecord, InternalRecordStore};
pub use ledger::{EventLedgerStore, InsertOutcome};
pub use mapping::EntityMappingStore;
pub use oauth_state::OAuthStateStore;
pub use preferences::{OrgPreferencesStore, UserPreferencesStore};
pub use queue::WorkQueueStore;
pub use sync_state::{AlreadyRunning, SyncCompletion, SyncStateStore};
pub use topics::TopicStore;

/// Every logical table bundled behind one object, the way
/// `engagement-server` wires up a single composition root (spec §2:
/// "`engagement-server` is the composition root: it owns one instance of
/// each component"). Blanket-implemented for anything implementing all
/// the individual table traits — `InMemoryStore` included.
pub trait Store:
    CredentialStore
    + OAuthStateStore
    + SyncStateStore
    + EntityMappingStore
    + InternalRecordStore
    + EventLedgerStore
    + WorkQueueStore
    + TopicStore
    + AiSuggestionStore
    + AiFeedbackStore
    + UserPreferencesStore
    + OrgPreferencesStore
{
}

impl<T> Store for T where
    T: CredentialStore
        + OAuthStateStore
        + SyncStateStore
        + EntityMappingStore
        + InternalRecordStore
        + EventLedgerStore
        + WorkQueueStore
        + TopicStore
        + AiSuggestionStore
        + AiFeedbackStore
        + UserPreferencesStore
        + OrgPreferencesStore
{
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use engagement_core::model::{ConnectionStatus, IntegrationCredential};
    use engagement_core::{IntegrationKind, TenantId};

    fn credential(tenant: &TenantId) -> IntegrationCredential {
        IntegrationCredential {
            tenant: tenant.clone(),
            integration_kind: IntegrationKind::Fathom,
            access_secret: "at".into(),
            refresh_secret: Some("rt".into()),
            expires_at: Utc::now() + chrono::Duration::hours(1),
            status: ConnectionStatus::Active,
            last_refresh: None,
            endpoint_hint: None,
            session_token: None,
            metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new("org1");
        CredentialStore::upsert(&store, credential(&tenant)).await.unwrap();
        let fetched = CredentialStore::get(&store, &tenant, IntegrationKind::Fathom)
            .await
            .unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().access_secret, "at");
    }

    #[tokio::test]
    async fn try_begin_coalesces_concurrent_sync() {
        let store = InMemoryStore::new();
        let tenant = TenantId::new("org1");
        let first = store.try_begin(&tenant, IntegrationKind::HubSpot).await.unwrap();
        assert!(first.is_ok());
        let second = store.try_begin(&tenant, IntegrationKind::HubSpot).await.unwrap();
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn ledger_dedups_on_external_event_id() {
        use engagement_core::model::{EventLedgerEntry, ProcessingResult};

        let store = InMemoryStore::new();
        let entry = EventLedgerEntry {
            external_system: "fathom".into(),
            external_event_id: "evt-123".into(),
            payload: serde_json::json!({}),
            payload_hash: "abc".into(),
            received_at: Utc::now(),
            external_occurred_at: Utc::now(),
            processing_result: ProcessingResult::Pending,
        };
        let first = store.insert_if_absent(entry.clone()).await.unwrap();
        let second = store.insert_if_absent(entry).await.unwrap();
        assert_eq!(first, InsertOutcome::Inserted);
        assert_eq!(second, InsertOutcome::Duplicate);
    }

    #[tokio::test]
    async fn feedback_outcome_set_once() {
        use engagement_core::model::{AiFeedback, FeedbackAction, OutcomeKind, OutcomeMeasurement};
        use engagement_core::FeedbackId;

        let store = InMemoryStore::new();
        let tenant = TenantId::new("org1");
        let id = FeedbackId::generate();
        AiFeedbackStore::insert(
            &store,
            AiFeedback {
                id: id.clone(),
                tenant,
                suggestion_ref: engagement_core::SuggestionId::generate(),
                action: FeedbackAction::Approved,
                original_content: None,
                edited_content: None,
                edit_delta: None,
                confidence_at_generation: 90.0,
                context_quality_at_generation: 80,
                decision_latency_ms: 1000,
                outcome: OutcomeMeasurement::default(),
                recorded_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        store
            .set_outcome(
                &id,
                OutcomeMeasurement {
                    measured: true,
                    positive: true,
                    kind: Some(OutcomeKind::ReplyReceived),
                },
            )
            .await
            .unwrap();
        store
            .set_outcome(
                &id,
                OutcomeMeasurement {
                    measured: true,
                    positive: false,
                    kind: Some(OutcomeKind::Other),
                },
            )
            .await
            .unwrap();

        let row = AiFeedbackStore::get(&store, &id).await.unwrap().unwrap();
        assert!(row.outcome.positive, "first recorded outcome must stick");
    }
}

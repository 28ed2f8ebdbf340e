use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use engagement_core::model::{EntityMapping, EventLedgerEntry, MappingDirection, ProcessingResult};
use engagement_core::{Clock, Result, TenantId};
use engagement_store::internal_record::InternalRecord;
use engagement_store::{EntityMappingStore, EventLedgerStore, InsertOutcome, InternalRecordStore};
use serde_json::Value;

use crate::adapter::EntityReconciliationPolicy;
use crate::event::{EventKind, InboundEvent};

/// Outcome of `EventReconciler::ingest`, carried back to the HTTP layer
/// for the §6.1 response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    Duplicate,
    Created { internal_id: String },
    Updated { internal_id: String },
    SkippedConflict { internal_id: String },
    Deleted { internal_id: String },
}

impl IngestOutcome {
    pub fn processing_result(&self) -> ProcessingResult {
        match self {
            Self::Duplicate => ProcessingResult::SkippedDuplicate,
            Self::Created { .. } | Self::Updated { .. } | Self::Deleted { .. } => {
                ProcessingResult::Applied
            }
            Self::SkippedConflict { .. } => ProcessingResult::SkippedConflict,
        }
    }
}

/// C3 — turns provider-originated events into idempotent mutations of
/// internal entities (spec §4.3). Signature verification happens one
/// layer up (`engagement_core::webhook`, shared with C2); by the time an
/// event reaches `ingest` it is already attributed to a tenant.
pub struct EventReconciler {
    ledger: Arc<dyn EventLedgerStore>,
    mappings: Arc<dyn EntityMappingStore>,
    records: Arc<dyn InternalRecordStore>,
    clock: Arc<dyn Clock>,
    policies: HashMap<&'static str, EntityReconciliationPolicy>,
}

impl EventReconciler {
    pub fn new(
        ledger: Arc<dyn EventLedgerStore>,
        mappings: Arc<dyn EntityMappingStore>,
        records: Arc<dyn InternalRecordStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            mappings,
            records,
            clock,
            policies: HashMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: EntityReconciliationPolicy) -> Self {
        self.policies.insert(policy.external_entity_kind, policy);
        self
    }

    fn natural_keys_for(&self, entity_kind: &str) -> &[&'static str] {
        self.policies
            .get(entity_kind)
            .map(|p| p.natural_key_fields.as_slice())
            .unwrap_or(&[])
    }

    /// Writes the ledger entry (the idempotency precondition, spec §3),
    /// then applies the create/update/delete reconciliation protocol. A
    /// dedup hit short-circuits before any side effect runs (invariant
    /// I5).
    pub async fn ingest(&self, event: InboundEvent) -> Result<IngestOutcome> {
        let now = self.clock.now();
        let event_id = event.resolved_event_id();
        let ledger_entry = EventLedgerEntry {
            external_system: event.external_system.clone(),
            external_event_id: event_id.clone(),
            payload: event.payload.clone(),
            payload_hash: event.payload_hash(),
            received_at: now,
            external_occurred_at: event.external_occurred_at,
            processing_result: ProcessingResult::Pending,
        };

        if self.ledger.insert_if_absent(ledger_entry).await? == InsertOutcome::Duplicate {
            tracing::debug!(external_system = %event.external_system, event_id, "duplicate event acknowledged");
            return Ok(IngestOutcome::Duplicate);
        }

        let outcome = self.reconcile(&event, now).await;
        let result = match &outcome {
            Ok(o) => o.processing_result(),
            Err(_) => ProcessingResult::Failed,
        };
        self.ledger
            .update_result(&event.external_system, &event_id, result)
            .await?;
        outcome
    }

    async fn reconcile(
        &self,
        event: &InboundEvent,
        now: chrono::DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        match event.kind {
            EventKind::Create => self.reconcile_create(event, now).await,
            EventKind::Update => self.reconcile_update(event, now).await,
            EventKind::Delete => self.reconcile_delete(event, now).await,
        }
    }

    async fn reconcile_create(
        &self,
        event: &InboundEvent,
        now: chrono::DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        if let Some(existing) = self
            .mappings
            .find_by_external_id(
                event.tenant.as_ref(),
                &event.external_system,
                &event.external_entity_kind,
                &event.external_id,
            )
            .await?
        {
            if !existing.soft_deleted {
                // spec §4.3: present and not soft-deleted -> treat as update.
                return self.apply_update(event, existing, now).await;
            }
        }

        // Natural-key match against the existing domain, tried in the
        // policy's declared order; first hit wins (spec §4.3).
        for field in self.natural_keys_for(&event.external_entity_kind) {
            let Some(value) = event.payload.get(*field).and_then(Value::as_str) else {
                continue;
            };
            if let Some(matched) = self
                .records
                .find_by_natural_key(event.tenant.as_ref(), &event.internal_table, field, value)
                .await?
            {
                let mapping = EntityMapping {
                    tenant: event.tenant.clone(),
                    external_system: event.external_system.clone(),
                    external_entity_kind: event.external_entity_kind.clone(),
                    external_id: event.external_id.clone(),
                    internal_table: event.internal_table.clone(),
                    internal_id: matched.id.clone(),
                    direction: MappingDirection::Inbound,
                    external_last_modified: event.external_last_modified,
                    internal_last_modified: matched.last_modified,
                    soft_deleted: false,
                };
                self.mappings.upsert(mapping).await?;
                tracing::info!(
                    tenant = %event.tenant,
                    natural_key = field,
                    internal_id = %matched.id,
                    "matched inbound create to existing row via natural key"
                );
                return Ok(IngestOutcome::Updated {
                    internal_id: matched.id,
                });
            }
        }

        // No natural-key match: genuinely new row.
        let internal_id = uuid::Uuid::new_v4().to_string();
        let record = InternalRecord {
            tenant: event.tenant.to_string(),
            table: event.internal_table.clone(),
            id: internal_id.clone(),
            data: event.payload.clone(),
            last_modified: event.external_last_modified,
            deleted_externally: false,
        };
        self.records.upsert(record).await?;

        let mapping = EntityMapping {
            tenant: event.tenant.clone(),
            external_system: event.external_system.clone(),
            external_entity_kind: event.external_entity_kind.clone(),
            external_id: event.external_id.clone(),
            internal_table: event.internal_table.clone(),
            internal_id: internal_id.clone(),
            direction: MappingDirection::Inbound,
            external_last_modified: event.external_last_modified,
            internal_last_modified: event.external_last_modified,
            soft_deleted: false,
        };
        self.mappings.upsert(mapping).await?;
        let _ = now;
        Ok(IngestOutcome::Created { internal_id })
    }

    async fn reconcile_update(
        &self,
        event: &InboundEvent,
        now: chrono::DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        let Some(mapping) = self
            .mappings
            .find_by_external_id(
                event.tenant.as_ref(),
                &event.external_system,
                &event.external_entity_kind,
                &event.external_id,
            )
            .await?
        else {
            // spec §4.3: "update: locate by Mapping; if missing, escalate to create."
            return self.reconcile_create(event, now).await;
        };
        self.apply_update(event, mapping, now).await
    }

    async fn apply_update(
        &self,
        event: &InboundEvent,
        mapping: EntityMapping,
        _now: chrono::DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        let current = self
            .records
            .get(event.tenant.as_ref(), &mapping.internal_table, &mapping.internal_id)
            .await?;

        let internal_last_modified = current
            .as_ref()
            .map(|r| r.last_modified)
            .unwrap_or(mapping.internal_last_modified);

        // Last-writer-wins by timestamp, deliberately no CRDT semantics
        // (spec §4.3 normative block).
        if internal_last_modified > event.external_last_modified {
            tracing::info!(
                tenant = %event.tenant,
                internal_id = %mapping.internal_id,
                "external update skipped: internal row is newer"
            );
            return Ok(IngestOutcome::SkippedConflict {
                internal_id: mapping.internal_id,
            });
        }

        let record = InternalRecord {
            tenant: event.tenant.to_string(),
            table: mapping.internal_table.clone(),
            id: mapping.internal_id.clone(),
            data: event.payload.clone(),
            last_modified: event.external_last_modified,
            deleted_externally: current.map(|r| r.deleted_externally).unwrap_or(false),
        };
        self.records.upsert(record).await?;

        let mut updated_mapping = mapping.clone();
        updated_mapping.external_last_modified = event.external_last_modified;
        updated_mapping.internal_last_modified = event.external_last_modified;
        self.mappings.upsert(updated_mapping).await?;

        Ok(IngestOutcome::Updated {
            internal_id: mapping.internal_id,
        })
    }

    async fn reconcile_delete(
        &self,
        event: &InboundEvent,
        now: chrono::DateTime<Utc>,
    ) -> Result<IngestOutcome> {
        let Some(mapping) = self
            .mappings
            .mark_soft_deleted(
                event.tenant.as_ref(),
                &event.external_system,
                &event.external_entity_kind,
                &event.external_id,
            )
            .await?
        else {
            return Ok(IngestOutcome::Deleted {
                internal_id: String::new(),
            });
        };

        // Never physically delete the internal row: preserves
        // user-authored data (spec §4.3).
        if let Some(mut record) = self
            .records
            .get(event.tenant.as_ref(), &mapping.internal_table, &mapping.internal_id)
            .await?
        {
            record.deleted_externally = true;
            record.last_modified = now;
            self.records.upsert(record).await?;
        }

        Ok(IngestOutcome::Deleted {
            internal_id: mapping.internal_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engagement_core::FixedClock;
    use engagement_store::InMemoryStore;
    use serde_json::json;

    fn reconciler(store: Arc<InMemoryStore>, clock: Arc<FixedClock>) -> EventReconciler {
        EventReconciler::new(store.clone(), store.clone(), store, clock).with_policy(
            EntityReconciliationPolicy::new("contact", "contacts").with_natural_keys(vec!["email"]),
        )
    }

    fn create_event(tenant: &TenantId, external_id: &str, email: &str, occurred_at: chrono::DateTime<Utc>) -> InboundEvent {
        InboundEvent {
            tenant: tenant.clone(),
            external_system: "hubspot".into(),
            external_event_id: Some(format!("evt-{external_id}")),
            external_entity_kind: "contact".into(),
            external_id: external_id.into(),
            internal_table: "contacts".into(),
            kind: EventKind::Create,
            external_occurred_at: occurred_at,
            external_last_modified: occurred_at,
            payload: json!({"kind": "CREATE", "entity": "contact", "id": external_id, "email": email}),
        }
    }

    #[tokio::test]
    async fn dedup_webhook_produces_exactly_one_mutation() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let clock = Arc::new(FixedClock::new(now));
        let reconciler = reconciler(store.clone(), clock);
        let tenant = TenantId::new("org1");

        let event = InboundEvent {
            external_event_id: Some("evt-123".into()),
            ..create_event(&tenant, "42", "a@b.com", now)
        };

        let first = reconciler.ingest(event.clone()).await.unwrap();
        assert!(matches!(first, IngestOutcome::Created { .. }));

        let second = reconciler.ingest(event).await.unwrap();
        assert_eq!(second, IngestOutcome::Duplicate);

        let all_contacts = store
            .find_by_natural_key(tenant.as_ref(), "contacts", "email", "a@b.com")
            .await
            .unwrap();
        assert!(all_contacts.is_some());
    }

    #[tokio::test]
    async fn conflict_skip_leaves_internal_row_unchanged() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let clock = Arc::new(FixedClock::new(now));
        let reconciler = reconciler(store.clone(), clock);
        let tenant = TenantId::new("org1");

        let internal_newer = now;
        let created = reconciler
            .ingest(create_event(&tenant, "42", "a@b.com", internal_newer))
            .await
            .unwrap();
        let IngestOutcome::Created { internal_id } = created else {
            panic!("expected created");
        };

        let stale_update = InboundEvent {
            external_event_id: Some("evt-update-stale".into()),
            kind: EventKind::Update,
            external_last_modified: internal_newer - chrono::Duration::hours(1),
            payload: json!({"email": "a@b.com", "name": "stale name"}),
            ..create_event(&tenant, "42", "a@b.com", internal_newer)
        };

        let outcome = reconciler.ingest(stale_update).await.unwrap();
        assert_eq!(
            outcome,
            IngestOutcome::SkippedConflict {
                internal_id: internal_id.clone()
            }
        );

        let record = store
            .get(tenant.as_ref(), "contacts", &internal_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.data["name"], Value::Null);
    }

    #[tokio::test]
    async fn delete_soft_deletes_mapping_and_preserves_internal_row() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let clock = Arc::new(FixedClock::new(now));
        let reconciler = reconciler(store.clone(), clock);
        let tenant = TenantId::new("org1");

        let created = reconciler
            .ingest(create_event(&tenant, "42", "a@b.com", now))
            .await
            .unwrap();
        let IngestOutcome::Created { internal_id } = created else {
            panic!("expected created");
        };

        let delete_event = InboundEvent {
            external_event_id: Some("evt-delete".into()),
            kind: EventKind::Delete,
            ..create_event(&tenant, "42", "a@b.com", now)
        };
        let outcome = reconciler.ingest(delete_event).await.unwrap();
        assert_eq!(outcome, IngestOutcome::Deleted { internal_id: internal_id.clone() });

        let record = store
            .get(tenant.as_ref(), "contacts", &internal_id)
            .await
            .unwrap()
            .unwrap();
        assert!(record.deleted_externally);

        let mapping = store
            .find_by_external_id(tenant.as_ref(), "hubspot", "contact", "42")
            .await
            .unwrap()
            .unwrap();
        assert!(mapping.soft_deleted);
    }

    #[tokio::test]
    async fn natural_key_match_links_existing_row_instead_of_duplicating() {
        let store = Arc::new(InMemoryStore::new());
        let now = Utc::now();
        let clock = Arc::new(FixedClock::new(now));
        let reconciler = reconciler(store.clone(), clock);
        let tenant = TenantId::new("org1");

        store
            .upsert(InternalRecord {
                tenant: tenant.to_string(),
                table: "contacts".into(),
                id: "manual-1".into(),
                data: json!({"email": "a@b.com"}),
                last_modified: now - chrono::Duration::days(1),
                deleted_externally: false,
            })
            .await
            .unwrap();

        let created = reconciler
            .ingest(create_event(&tenant, "42", "a@b.com", now))
            .await
            .unwrap();
        assert_eq!(
            created,
            IngestOutcome::Updated {
                internal_id: "manual-1".into()
            }
        );
    }
}

use async_trait::async_trait;
use engagement_core::Result;
use engagement_core::model::{EventLedgerEntry, ProcessingResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// §6.3 "Event Ledger" table: append-only, deduplicated on
/// `(external_system, external_event_id)` (invariant I5). Writing the
/// ledger is a precondition for any side effect derived from the event
/// (spec §3), so `insert_if_absent` must run before reconciliation.
#[async_trait]
pub trait EventLedgerStore: Send + Sync {
    async fn get(
        &self,
        external_system: &str,
        external_event_id: &str,
    ) -> Result<Option<EventLedgerEntry>>;

    /// Inserts the entry unless `(external_system, external_event_id)`
    /// already exists, in which case it is left untouched and
    /// `Duplicate` is returned.
    async fn insert_if_absent(&self, entry: EventLedgerEntry) -> Result<InsertOutcome>;

    async fn update_result(
        &self,
        external_system: &str,
        external_event_id: &str,
        result: ProcessingResult,
    ) -> Result<()>;
}
